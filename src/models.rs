//! Data models for the USGS GeoJSON summary feed.
//!
//! Parsing is strict: an event missing any field the dashboard renders
//! rejects the whole collection, so a snapshot is accepted or refused as a
//! unit.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FeedError;

/// Top-level GeoJSON response from USGS feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Earthquake events, in feed order
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure and every event in it.
    ///
    /// # Errors
    ///
    /// Returns an error on a wrong document type, an invalid event, or a
    /// repeated event ID.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.type_ != "FeatureCollection" {
            return Err(FeedError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }

        let mut ids = HashSet::with_capacity(self.features.len());
        for feature in &self.features {
            feature.validate()?;
            if !ids.insert(feature.id.as_str()) {
                return Err(FeedError::InvalidResponse(format!(
                    "duplicate event ID '{}'",
                    feature.id
                )));
            }
        }
        Ok(())
    }
}

/// A single earthquake event.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// Unique event ID
    pub id: String,

    /// Geographic location
    pub geometry: Geometry,

    /// Event properties
    pub properties: Properties,
}

impl Feature {
    /// Validate the event structure.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty ID, a coordinate list that is not a
    /// `[lon, lat, depth]` triple, or a non-finite magnitude.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.id.is_empty() {
            return Err(FeedError::Validation("empty event ID".into()));
        }
        if self.geometry.coordinates.len() != 3 {
            return Err(FeedError::Validation(format!(
                "event {}: expected 3 coordinates, got {}",
                self.id,
                self.geometry.coordinates.len()
            )));
        }
        if !self.properties.mag.is_finite() {
            return Err(FeedError::Validation(format!(
                "event {}: magnitude is not a finite number",
                self.id
            )));
        }
        Ok(())
    }

    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.properties.time).single()
    }

    /// Magnitude shorthand.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.properties.mag
    }

    /// Get longitude (degrees).
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.geometry.coordinates.first().copied().unwrap_or(0.0)
    }

    /// Get latitude (degrees).
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.geometry.coordinates.get(1).copied().unwrap_or(0.0)
    }

    /// Get depth in kilometers (positive down).
    #[must_use]
    pub fn depth_km(&self) -> f64 {
        self.geometry.coordinates.get(2).copied().unwrap_or(0.0)
    }

    /// Whether the feed flags this event for tsunami risk.
    #[must_use]
    pub fn is_tsunami(&self) -> bool {
        self.properties.tsunami == 1
    }
}

/// Geographic geometry for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    pub coordinates: Vec<f64>,
}

/// Event properties the dashboard relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct Properties {
    /// Magnitude value
    pub mag: f64,

    /// Magnitude type (mb, Ml, Mw, etc.)
    #[serde(rename = "magType", default)]
    pub mag_type: Option<String>,

    /// Human-readable place description
    pub place: String,

    /// Event time (ms since epoch)
    pub time: i64,

    /// Event page URL
    pub url: String,

    /// Human-readable title
    pub title: String,

    /// PAGER alert level: null, "green", "yellow", "orange", "red"
    pub alert: Option<String>,

    /// Tsunami flag: 0 or 1
    pub tsunami: i32,
}

/// One accepted fetch result.
///
/// Snapshots are never merged; each successful fetch replaces the previous
/// one wholesale and bumps `version`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// 1 for the first accepted fetch, incremented on every replacement.
    pub version: u64,
    /// When this snapshot was accepted.
    pub received_at: Instant,
    /// Events in feed order.
    pub events: Vec<Feature>,
}

impl Snapshot {
    #[must_use]
    pub fn new(version: u64, events: Vec<Feature>) -> Self {
        Self {
            version,
            received_at: Instant::now(),
            events,
        }
    }

    /// Look up an event by ID.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Feature> {
        self.events.iter().find(|e| e.id == id)
    }
}

/// Format an event time the way the list view shows it, e.g.
/// `Oct 18, 2026, 1:43 PM`, in the local time zone.
#[must_use]
pub fn format_local_time(time_ms: i64) -> String {
    Local
        .timestamp_millis_opt(time_ms)
        .single()
        .map_or_else(|| "unknown".into(), |t| t.format("%b %-d, %Y, %-I:%M %p").to_string())
}

/// Simplified event for output.
///
/// This is the normalized structure we emit in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent {
    pub id: String,
    pub time: String,
    pub magnitude: f64,
    pub magnitude_type: Option<String>,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub place: String,
    pub title: String,
    pub alert: Option<String>,
    pub tsunami: bool,
    pub url: String,
}

impl From<&Feature> for OutputEvent {
    fn from(f: &Feature) -> Self {
        Self {
            id: f.id.clone(),
            time: f
                .time()
                .map_or_else(|| "unknown".into(), |t| t.to_rfc3339()),
            magnitude: f.properties.mag,
            magnitude_type: f.properties.mag_type.clone(),
            depth_km: f.depth_km(),
            latitude: f.latitude(),
            longitude: f.longitude(),
            place: f.properties.place.clone(),
            title: f.properties.title.clone(),
            alert: f.properties.alert.clone(),
            tsunami: f.is_tsunami(),
            url: f.properties.url.clone(),
        }
    }
}
