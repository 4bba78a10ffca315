//! World map of every event in the snapshot.
//!
//! Markers are circles in degree space drawn on a ratatui canvas. Sizes follow
//! the web-map convention of a pixel radius of `2^mag / 2` at the current zoom
//! level, converted to degrees with the 256 px tile scale.

use ratatui::layout::Rect;
use ratatui::style::Color;
use tokio::sync::watch;

use crate::models::Feature;

/// Events at or above this magnitude get the "major" marker colours.
pub const MAP_COLOR_CUTOFF: f64 = 5.0;

/// Zoom used when the map recentres on a selected event.
pub const FOCUS_ZOOM: u8 = 6;

/// Initial viewport.
pub const DEFAULT_CENTER: (f64, f64) = (20.0, 0.0);
pub const DEFAULT_ZOOM: u8 = 2;

const MIN_ZOOM: u8 = 2;
const MAX_ZOOM: u8 = 10;

/// Pixels spanned by the whole world at zoom 0.
const TILE_SIZE_PX: f64 = 256.0;

/// Attribution shown under the map.
pub const ATTRIBUTION: &str = "Coastlines: ratatui world map | Events: USGS";

/// Marker colours and stroke weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerStyle {
    pub fill: Color,
    pub stroke: Color,
    /// Number of concentric outlines drawn.
    pub weight: u8,
}

const SELECTED_STYLE: MarkerStyle = MarkerStyle {
    fill: Color::Rgb(0x4a, 0xde, 0x80),
    stroke: Color::Rgb(0x22, 0xc5, 0x5e),
    weight: 3,
};

const MAJOR_STYLE: MarkerStyle = MarkerStyle {
    fill: Color::Rgb(0xff, 0x44, 0x44),
    stroke: Color::Rgb(0xff, 0x00, 0x00),
    weight: 1,
};

const DEFAULT_STYLE: MarkerStyle = MarkerStyle {
    fill: Color::Rgb(0x63, 0x66, 0xf1),
    stroke: Color::Rgb(0x4f, 0x46, 0xe5),
    weight: 1,
};

/// Selected beats major beats default.
#[must_use]
pub fn marker_style(selected: bool, magnitude: f64) -> MarkerStyle {
    if selected {
        SELECTED_STYLE
    } else if magnitude >= MAP_COLOR_CUTOFF {
        MAJOR_STYLE
    } else {
        DEFAULT_STYLE
    }
}

/// Screen radius of a marker, in pixels.
#[must_use]
pub fn marker_radius_px(magnitude: f64) -> f64 {
    magnitude.exp2() / 2.0
}

/// Visible window of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            lat: DEFAULT_CENTER.0,
            lon: DEFAULT_CENTER.1,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Viewport {
    /// Degrees of longitude covered by one screen pixel.
    #[must_use]
    pub fn degrees_per_pixel(&self) -> f64 {
        360.0 / (TILE_SIZE_PX * f64::from(self.zoom).exp2())
    }

    /// Longitude span of the window. Zoom 2 shows the whole world.
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        360.0 / f64::from(self.zoom.saturating_sub(MIN_ZOOM)).exp2()
    }

    /// Canvas `(x_bounds, y_bounds)`, kept inside the world where possible.
    #[must_use]
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let lon_span = self.lon_span();
        let lat_span = lon_span / 2.0;
        (
            clamp_window(self.lon, lon_span, 180.0),
            clamp_window(self.lat, lat_span, 90.0),
        )
    }

    pub fn focus(&mut self, lat: f64, lon: f64) {
        self.lat = lat;
        self.lon = lon;
        self.zoom = FOCUS_ZOOM;
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A `span`-wide window around `center`, shifted to stay within
/// `[-limit, limit]` when it fits.
fn clamp_window(center: f64, span: f64, limit: f64) -> [f64; 2] {
    if span >= 2.0 * limit {
        return [-span / 2.0, span / 2.0];
    }
    let low = (center - span / 2.0).clamp(-limit, limit - span);
    [low, low + span]
}

/// One drawable marker.
#[derive(Debug, Clone)]
pub struct Marker<'a> {
    pub event: &'a Feature,
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
    /// Radius in degrees.
    pub radius: f64,
    pub style: MarkerStyle,
}

/// Map state: the viewport and a subscription to the selection.
#[derive(Debug)]
pub struct MapView {
    viewport: Viewport,
    selection: watch::Receiver<Option<String>>,
    /// Selected ID the viewport has not been centred on yet.
    pending_focus: Option<String>,
}

impl MapView {
    #[must_use]
    pub fn new(selection: watch::Receiver<Option<String>>) -> Self {
        Self {
            viewport: Viewport::default(),
            selection,
            pending_focus: None,
        }
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Recentre once on each newly selected event. A selection that names no
    /// event in `events` stays pending and is centred on as soon as a later
    /// call finds it; clearing the selection drops it.
    ///
    /// Returns whether the viewport moved.
    pub fn follow_selection(&mut self, events: &[Feature]) -> bool {
        if self.selection.has_changed().unwrap_or(false) {
            self.pending_focus = self.selection.borrow_and_update().clone();
        }
        let Some(id) = self.pending_focus.as_deref() else {
            return false;
        };
        let Some(event) = events.iter().find(|e| e.id == id) else {
            return false;
        };
        self.viewport.focus(event.latitude(), event.longitude());
        tracing::debug!(event = %event.id, "map recentred");
        self.pending_focus = None;
        true
    }

    /// One marker per event, in feed order (later events draw on top).
    #[must_use]
    pub fn markers<'a>(&self, events: &'a [Feature], selected: Option<&str>) -> Vec<Marker<'a>> {
        let scale = self.viewport.degrees_per_pixel();
        events
            .iter()
            .map(|event| Marker {
                event,
                x: event.longitude(),
                y: event.latitude(),
                radius: marker_radius_px(event.magnitude()) * scale,
                style: marker_style(selected == Some(event.id.as_str()), event.magnitude()),
            })
            .collect()
    }

    /// Map coordinates `(lon, lat)` under a terminal cell, given the canvas
    /// area the map was drawn in.
    #[must_use]
    pub fn cell_to_coords(&self, area: Rect, column: u16, row: u16) -> Option<(f64, f64)> {
        if area.width == 0
            || area.height == 0
            || column < area.x
            || row < area.y
            || column >= area.x + area.width
            || row >= area.y + area.height
        {
            return None;
        }
        let ([x0, x1], [y0, y1]) = self.viewport.bounds();
        let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
        let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
        Some((x0 + fx * (x1 - x0), y1 - fy * (y1 - y0)))
    }

    /// The marker under `(lon, lat)`: the nearest one whose circle, padded by
    /// `tolerance` degrees, contains the point. Later markers win ties.
    #[must_use]
    pub fn pick<'a>(markers: &[Marker<'a>], lon: f64, lat: f64, tolerance: f64) -> Option<&'a Feature> {
        let mut best: Option<(f64, &'a Feature)> = None;
        for marker in markers {
            let distance = (marker.x - lon).hypot(marker.y - lat);
            if distance > marker.radius + tolerance {
                continue;
            }
            if best.is_none_or(|(d, _)| distance <= d) {
                best = Some((distance, marker.event));
            }
        }
        best.map(|(_, event)| event)
    }

    /// Degrees covered by one terminal cell horizontally; used as the click
    /// tolerance so tiny markers stay clickable.
    #[must_use]
    pub fn cell_width_degrees(&self, area: Rect) -> f64 {
        let ([x0, x1], _) = self.viewport.bounds();
        (x1 - x0) / f64::from(area.width.max(1))
    }
}

/// Popup lines for a marker.
#[must_use]
pub fn popup_lines(event: &Feature) -> [String; 4] {
    [
        event.properties.title.clone(),
        format!("Magnitude: {}", event.magnitude()),
        format!("Depth: {} km", event.depth_km()),
        format!("More info: {}", event.properties.url),
    ]
}
