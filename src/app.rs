//! Dashboard state, owned exclusively by the UI task.
//!
//! Feed outcomes enter through [`Dashboard::apply`] and user input through
//! [`Dashboard::handle`]; nothing else mutates the state.

use std::time::Duration;

use ratatui::layout::Rect;
use tokio::time::Instant;

use crate::alerts::{AlertBoard, AlertKind};
use crate::list::{ListView, SortKey, minor_events};
use crate::map::MapView;
use crate::models::{Feature, Snapshot};
use crate::refresh::{FeedUpdate, REFRESH_PERIOD};
use crate::selection::Selection;

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first fetch.
    Loading,
    /// A snapshot is on screen. Later failures are shown inline.
    Ready,
    /// The last fetch failed and no snapshot has ever been accepted.
    Error,
}

/// A user intent, already decoded from the terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    SortBy(SortKey),
    CursorUp,
    CursorDown,
    CursorTop,
    CursorBottom,
    /// Select the row under the cursor, or deselect it if already selected.
    ToggleAtCursor,
    ClearSelection,
    Dismiss(AlertKind),
    TogglePopup,
    ZoomIn,
    ZoomOut,
    ResetView,
    /// Left click at a terminal cell.
    Click { column: u16, row: u16 },
}

/// Where things were drawn last frame; used to resolve mouse clicks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    pub major_banner: Option<Rect>,
    pub tsunami_banner: Option<Rect>,
    /// Inner area of the map canvas.
    pub map: Rect,
    /// Inner area of the list table (header included).
    pub table: Rect,
}

/// The root coordinator.
pub struct Dashboard {
    pub(crate) phase: Phase,
    pub(crate) snapshot: Option<Snapshot>,
    pub(crate) last_error: Option<String>,
    /// When the last feed outcome (success or failure) arrived.
    pub(crate) last_attempt: Option<Instant>,
    pub(crate) alerts: AlertBoard,
    pub(crate) selection: Selection,
    pub(crate) list: ListView,
    pub(crate) map: MapView,
    pub(crate) show_popup: bool,
    pub(crate) layout: ScreenLayout,
    pub(crate) feed_label: String,
    should_quit: bool,
}

impl Dashboard {
    /// A dashboard in the loading phase. `feed_label` is shown in the header.
    #[must_use]
    pub fn new(feed_label: impl Into<String>) -> Self {
        let selection = Selection::new();
        let map = MapView::new(selection.subscribe());
        Self {
            phase: Phase::Loading,
            snapshot: None,
            last_error: None,
            last_attempt: None,
            alerts: AlertBoard::new(),
            selection,
            list: ListView::new(),
            map,
            show_popup: false,
            layout: ScreenLayout::default(),
            feed_label: feed_label.into(),
            should_quit: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Events of the current snapshot, or none yet.
    #[must_use]
    pub fn events(&self) -> &[Feature] {
        self.snapshot.as_ref().map_or(&[], |s| s.events.as_slice())
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Time left until the refresh loop fetches again, counted from the last
    /// outcome whether it succeeded or not.
    #[must_use]
    pub fn next_refresh_in(&self) -> Option<Duration> {
        self.last_attempt
            .map(|at| REFRESH_PERIOD.saturating_sub(at.elapsed()))
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Rows of the minor-event list under the current sort.
    #[must_use]
    pub fn minor_rows(&self) -> Vec<&Feature> {
        minor_events(self.events(), self.list.sort())
    }

    /// The selected event, if the selection names one in the snapshot.
    #[must_use]
    pub fn selected_event(&self) -> Option<&Feature> {
        let id = self.selection.current()?;
        self.snapshot.as_ref()?.find(&id)
    }

    /// Banner event for `kind`, if raised and not dismissed.
    #[must_use]
    pub fn visible_alert(&self, kind: AlertKind) -> Option<&Feature> {
        self.alerts.visible(kind, self.snapshot.as_ref()?)
    }

    /// Record where the last frame put each region.
    pub fn set_layout(&mut self, layout: ScreenLayout) {
        self.layout = layout;
    }

    /// Apply one feed outcome.
    pub fn apply(&mut self, update: FeedUpdate) {
        self.last_attempt = Some(Instant::now());
        match update {
            FeedUpdate::Snapshot(feed) => {
                let version = self.snapshot.as_ref().map_or(1, |s| s.version + 1);
                let snapshot = Snapshot::new(version, feed.features);
                self.alerts.refresh(&snapshot);
                tracing::info!(version, events = snapshot.events.len(), "snapshot replaced");
                self.snapshot = Some(snapshot);
                self.last_error = None;
                self.set_phase(Phase::Ready);

                let rows = self.minor_rows().len();
                self.list.clamp_cursor(rows);
                self.sync_map();
            }
            FeedUpdate::Failed(message) => {
                tracing::warn!(keeping_snapshot = self.snapshot.is_some(), "feed update failed: {message}");
                self.last_error = Some(message);
                let phase = if self.snapshot.is_some() {
                    Phase::Ready
                } else {
                    Phase::Error
                };
                self.set_phase(phase);
            }
        }
    }

    /// Apply one user action.
    pub fn handle(&mut self, action: Action) {
        if action == Action::Quit {
            self.should_quit = true;
            return;
        }
        if self.phase != Phase::Ready {
            return;
        }

        let rows = self.minor_rows().len();
        match action {
            Action::Quit => {}
            Action::SortBy(key) => {
                self.list.sort_by(key);
                self.list.clamp_cursor(rows);
            }
            Action::CursorUp => self.list.cursor_up(rows),
            Action::CursorDown => self.list.cursor_down(rows),
            Action::CursorTop => self.list.cursor_top(rows),
            Action::CursorBottom => self.list.cursor_bottom(rows),
            Action::ToggleAtCursor => {
                if let Some(index) = self.list.cursor() {
                    self.toggle_row(index);
                }
            }
            Action::ClearSelection => {
                self.selection.clear();
                self.show_popup = false;
            }
            Action::Dismiss(kind) => {
                self.alerts.dismiss(kind);
            }
            Action::TogglePopup => {
                self.show_popup = !self.show_popup && self.selected_event().is_some();
            }
            Action::ZoomIn => self.map.viewport_mut().zoom_in(),
            Action::ZoomOut => self.map.viewport_mut().zoom_out(),
            Action::ResetView => self.map.viewport_mut().reset(),
            Action::Click { column, row } => self.click(column, row),
        }

        self.sync_map();
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!(from = ?self.phase, to = ?phase, "phase changed");
            self.phase = phase;
        }
    }

    /// Toggle the selection on list row `index`.
    fn toggle_row(&mut self, index: usize) {
        let id = self.minor_rows().get(index).map(|e| e.id.clone());
        if let Some(id) = id {
            self.selection.toggle(&id);
            self.list.table_state.select(Some(index));
            if self.selection.current().is_none() {
                self.show_popup = false;
            }
        }
    }

    fn click(&mut self, column: u16, row: u16) {
        let layout = self.layout;
        let inside = |area: Rect| {
            column >= area.x
                && column < area.x + area.width
                && row >= area.y
                && row < area.y + area.height
        };

        if layout.major_banner.is_some_and(inside) {
            self.alerts.dismiss(AlertKind::Major);
        } else if layout.tsunami_banner.is_some_and(inside) {
            self.alerts.dismiss(AlertKind::Tsunami);
        } else if inside(layout.table) {
            if row == layout.table.y {
                if let Some(key) = ListView::header_at(layout.table, column) {
                    self.list.sort_by(key);
                }
            } else {
                let rows = self.minor_rows().len();
                if let Some(index) = self.list.row_at(layout.table, row, rows) {
                    self.toggle_row(index);
                }
            }
        } else if inside(layout.map) {
            self.click_map(column, row);
        }
    }

    fn click_map(&mut self, column: u16, row: u16) {
        let area = self.layout.map;
        let Some((lon, lat)) = self.map.cell_to_coords(area, column, row) else {
            return;
        };
        let selected = self.selection.current();
        let markers = self.map.markers(self.events(), selected.as_deref());
        let tolerance = self.map.cell_width_degrees(area);
        let hit = MapView::pick(&markers, lon, lat, tolerance).map(|e| e.id.clone());

        if let Some(id) = hit {
            self.selection.select(&id);
            self.show_popup = true;
        }
    }

    fn sync_map(&mut self) {
        let Self { map, snapshot, .. } = self;
        let events = snapshot.as_ref().map_or(&[][..], |s| s.events.as_slice());
        map.follow_selection(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::SortDirection;
    use crate::map::FOCUS_ZOOM;
    use crate::test_helpers::{EventBuilder, collection, major_and_tsunami};

    fn ready(events: Vec<Feature>) -> Dashboard {
        let mut dashboard = Dashboard::new("2.5_day");
        dashboard.apply(FeedUpdate::Snapshot(collection(events)));
        dashboard
    }

    #[test]
    fn test_starts_loading() {
        let dashboard = Dashboard::new("2.5_day");
        assert_eq!(dashboard.phase(), Phase::Loading);
        assert!(dashboard.events().is_empty());
        assert!(dashboard.snapshot().is_none());
    }

    #[test]
    fn test_first_success_goes_ready() {
        let dashboard = ready(major_and_tsunami());
        assert_eq!(dashboard.phase(), Phase::Ready);
        assert_eq!(dashboard.snapshot().map(|s| s.version), Some(1));
    }

    #[test]
    fn test_first_failure_goes_error_then_recovers() {
        let mut dashboard = Dashboard::new("2.5_day");
        dashboard.apply(FeedUpdate::Failed("Failed to fetch earthquake data".into()));
        assert_eq!(dashboard.phase(), Phase::Error);
        assert_eq!(dashboard.last_error(), Some("Failed to fetch earthquake data"));

        dashboard.apply(FeedUpdate::Snapshot(collection(major_and_tsunami())));
        assert_eq!(dashboard.phase(), Phase::Ready);
        assert_eq!(dashboard.last_error(), None);
    }

    #[test]
    fn test_example_snapshot_wiring() {
        let dashboard = ready(major_and_tsunami());

        assert_eq!(dashboard.visible_alert(AlertKind::Major).map(|e| e.id.as_str()), Some("a"));
        assert_eq!(dashboard.visible_alert(AlertKind::Tsunami).map(|e| e.id.as_str()), Some("b"));

        let rows: Vec<&str> = dashboard.minor_rows().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(rows, vec!["b"]);

        let markers = dashboard.map.markers(dashboard.events(), None);
        assert_eq!(markers.len(), 2);
    }

    #[test]
    fn test_failure_after_success_keeps_snapshot_and_stays_ready() {
        let mut dashboard = ready(major_and_tsunami());
        dashboard.apply(FeedUpdate::Failed("HTTP request failed: timeout".into()));

        assert_eq!(dashboard.phase(), Phase::Ready);
        assert_eq!(dashboard.last_error(), Some("HTTP request failed: timeout"));
        assert_eq!(dashboard.snapshot().map(|s| s.version), Some(1));
        assert_eq!(dashboard.events().len(), 2);

        dashboard.apply(FeedUpdate::Snapshot(collection(vec![EventBuilder::new("c").build()])));
        assert_eq!(dashboard.last_error(), None);
        assert_eq!(dashboard.snapshot().map(|s| s.version), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_restarts_after_failed_fetch() {
        let mut dashboard = Dashboard::new("2.5_day");
        assert_eq!(dashboard.next_refresh_in(), None);

        dashboard.apply(FeedUpdate::Snapshot(collection(major_and_tsunami())));
        assert_eq!(dashboard.next_refresh_in(), Some(REFRESH_PERIOD));

        tokio::time::advance(REFRESH_PERIOD).await;
        assert_eq!(dashboard.next_refresh_in(), Some(Duration::ZERO));

        dashboard.apply(FeedUpdate::Failed("HTTP request failed: timeout".into()));
        assert_eq!(dashboard.next_refresh_in(), Some(REFRESH_PERIOD));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(dashboard.next_refresh_in(), Some(REFRESH_PERIOD - Duration::from_secs(60)));
    }

    #[test]
    fn test_selection_missing_from_snapshot_recentres_when_it_arrives() {
        let mut dashboard = ready(major_and_tsunami());
        dashboard.selection.select("late");
        dashboard.handle(Action::CursorDown);
        assert_eq!(dashboard.map.viewport().zoom, crate::map::DEFAULT_ZOOM);

        dashboard.apply(FeedUpdate::Snapshot(collection(vec![
            EventBuilder::new("late").mag(3.2).at(-155.3, 19.4).build(),
        ])));

        assert_eq!(dashboard.selected_event().map(|e| e.id.as_str()), Some("late"));
        assert_eq!(dashboard.map.viewport().zoom, FOCUS_ZOOM);
        assert!((dashboard.map.viewport().lon + 155.3).abs() < 1e-9);
    }

    #[test]
    fn test_dismissed_alert_returns_with_next_snapshot() {
        let mut dashboard = ready(major_and_tsunami());
        dashboard.handle(Action::Dismiss(AlertKind::Major));
        assert!(dashboard.visible_alert(AlertKind::Major).is_none());
        assert!(dashboard.visible_alert(AlertKind::Tsunami).is_some());

        dashboard.apply(FeedUpdate::Snapshot(collection(major_and_tsunami())));
        assert!(dashboard.visible_alert(AlertKind::Major).is_some());
    }

    #[test]
    fn test_toggle_at_cursor_selects_and_deselects() {
        let mut dashboard = ready(major_and_tsunami());
        dashboard.handle(Action::CursorDown);
        dashboard.handle(Action::ToggleAtCursor);
        assert_eq!(dashboard.selected_event().map(|e| e.id.as_str()), Some("b"));
        // Selecting recentres the map.
        assert_eq!(dashboard.map.viewport().zoom, FOCUS_ZOOM);

        dashboard.handle(Action::ToggleAtCursor);
        assert!(dashboard.selected_event().is_none());
    }

    #[test]
    fn test_stale_selection_after_refresh_is_inert() {
        let mut dashboard = ready(major_and_tsunami());
        dashboard.handle(Action::CursorDown);
        dashboard.handle(Action::ToggleAtCursor);

        dashboard.apply(FeedUpdate::Snapshot(collection(vec![EventBuilder::new("c").build()])));

        // Not cleared, just not found.
        assert_eq!(dashboard.selection.current().as_deref(), Some("b"));
        assert!(dashboard.selected_event().is_none());
        let markers = dashboard.map.markers(dashboard.events(), Some("b"));
        assert!(markers.iter().all(|m| m.style.weight == 1));
    }

    #[test]
    fn test_sort_action_switches_key() {
        let mut dashboard = ready(major_and_tsunami());
        dashboard.handle(Action::SortBy(SortKey::Time));
        assert_eq!(dashboard.list.sort().direction, SortDirection::Ascending);
        dashboard.handle(Action::SortBy(SortKey::Place));
        assert_eq!(dashboard.list.sort().key, SortKey::Place);
        assert_eq!(dashboard.list.sort().direction, SortDirection::Descending);
    }

    #[test]
    fn test_actions_ignored_until_ready_except_quit() {
        let mut dashboard = Dashboard::new("2.5_day");
        dashboard.handle(Action::SortBy(SortKey::Place));
        assert_eq!(dashboard.list.sort().key, SortKey::Time);

        dashboard.handle(Action::Quit);
        assert!(dashboard.should_quit());
    }

    #[test]
    fn test_clicks_resolve_against_layout() {
        let events = vec![
            EventBuilder::new("minor-1").mag(3.0).time(2).at(-120.0, 40.0).build(),
            EventBuilder::new("minor-2").mag(2.0).time(1).build(),
            EventBuilder::new("major").mag(7.5).at(142.0, 38.0).build(),
        ];
        let mut dashboard = ready(events);
        dashboard.set_layout(ScreenLayout {
            major_banner: Some(Rect::new(0, 0, 100, 1)),
            tsunami_banner: None,
            map: Rect::new(0, 2, 360, 180),
            table: Rect::new(400, 2, 60, 20),
        });

        // Second body row of the table.
        dashboard.handle(Action::Click { column: 420, row: 4 });
        assert_eq!(dashboard.selection.current().as_deref(), Some("minor-2"));

        // Header click on the magnitude column.
        dashboard.handle(Action::Click { column: 455, row: 2 });
        assert_eq!(dashboard.list.sort().key, SortKey::Magnitude);

        // Banner click dismisses.
        dashboard.handle(Action::Click { column: 5, row: 0 });
        assert!(dashboard.visible_alert(AlertKind::Major).is_none());
    }

    #[test]
    fn test_map_click_selects_marker_and_opens_popup() {
        let events = vec![EventBuilder::new("major").mag(7.5).at(142.0, 38.0).build()];
        let mut dashboard = ready(events);
        dashboard.set_layout(ScreenLayout {
            map: Rect::new(0, 0, 360, 180),
            ..ScreenLayout::default()
        });

        // Cell (322, 51) is roughly lon 142.5, lat 38.5 on the world view.
        dashboard.handle(Action::Click { column: 322, row: 51 });

        assert_eq!(dashboard.selected_event().map(|e| e.id.as_str()), Some("major"));
        assert!(dashboard.show_popup);

        dashboard.handle(Action::ClearSelection);
        assert!(!dashboard.show_popup);
        assert!(dashboard.selected_event().is_none());
    }
}
