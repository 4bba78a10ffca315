//! Minor-event list: filtering, sorting and the table cursor.

use std::cmp::Ordering;

use feruca::Collator;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::widgets::TableState;

use crate::models::Feature;

/// Events at or above this magnitude are left to the map.
pub const LIST_MAGNITUDE_CUTOFF: f64 = 5.0;

/// Maximum rows shown after filtering and sorting.
pub const MAX_ROWS: usize = 100;

/// Column headers, in display order.
pub const COLUMN_HEADERS: [&str; 3] = ["Time", "Location", "Magnitude"];

/// Column widths shared by the renderer and mouse hit-testing.
pub const COLUMN_WIDTHS: [Constraint; 3] = [
    Constraint::Length(22),
    Constraint::Fill(1),
    Constraint::Length(11),
];

/// Space between table columns.
pub const COLUMN_SPACING: u16 = 1;

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Time,
    Place,
    Magnitude,
}

impl SortKey {
    /// Column order matches [`COLUMN_HEADERS`].
    pub const ALL: [Self; 3] = [Self::Time, Self::Place, Self::Magnitude];

    /// Compare two events on this key, ascending. Places go through
    /// `collator`; the other keys ignore it.
    pub fn compare(self, a: &Feature, b: &Feature, collator: &mut Collator) -> Ordering {
        match self {
            Self::Time => a.properties.time.cmp(&b.properties.time),
            Self::Place => collator.collate(a.properties.place.as_str(), b.properties.place.as_str()),
            Self::Magnitude => a.magnitude().total_cmp(&b.magnitude()),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "time" => Ok(Self::Time),
            "place" | "location" => Ok(Self::Place),
            "mag" | "magnitude" => Ok(Self::Magnitude),
            _ => Err(format!("unknown sort key: {s} (expected: time, place, mag)")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }

    #[must_use]
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }
}

/// Active sort key and direction. Starts at newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Time,
            direction: SortDirection::Descending,
        }
    }
}

impl SortState {
    /// Header click: the active key flips direction, any other key becomes
    /// active with descending order.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Descending;
        }
    }
}

/// The rows of the list: events below the cutoff, sorted, capped.
#[must_use]
pub fn minor_events(events: &[Feature], sort: SortState) -> Vec<&Feature> {
    let mut rows: Vec<&Feature> = events
        .iter()
        .filter(|e| e.magnitude() < LIST_MAGNITUDE_CUTOFF)
        .collect();

    // Root-locale UCA: accents and case only break ties after the base letters.
    let mut collator = Collator::default();
    // Stable, so equal keys keep feed order in both directions.
    rows.sort_by(|a, b| sort.direction.apply(sort.key.compare(a, b, &mut collator)));
    rows.truncate(MAX_ROWS);
    rows
}

/// Magnitude as the table shows it.
#[must_use]
pub fn format_magnitude(mag: f64) -> String {
    format!("{mag:.1}")
}

/// List view state: sort order and keyboard cursor.
#[derive(Debug, Default)]
pub struct ListView {
    sort: SortState,
    /// Cursor row; also remembers the scroll offset of the last render.
    pub table_state: TableState,
}

impl ListView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn sort_by(&mut self, key: SortKey) {
        self.sort.toggle(key);
        tracing::debug!(key = ?self.sort.key, direction = ?self.sort.direction, "list sort changed");
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.table_state.selected()
    }

    pub fn cursor_down(&mut self, row_count: usize) {
        if row_count == 0 {
            self.table_state.select(None);
            return;
        }
        let next = self.cursor().map_or(0, |i| (i + 1).min(row_count - 1));
        self.table_state.select(Some(next));
    }

    pub fn cursor_up(&mut self, row_count: usize) {
        if row_count == 0 {
            self.table_state.select(None);
            return;
        }
        let prev = self.cursor().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(prev));
    }

    pub fn cursor_top(&mut self, row_count: usize) {
        self.table_state.select((row_count > 0).then_some(0));
    }

    pub fn cursor_bottom(&mut self, row_count: usize) {
        self.table_state.select(row_count.checked_sub(1));
    }

    /// Keep the cursor inside the current rows after a refresh or re-sort.
    pub fn clamp_cursor(&mut self, row_count: usize) {
        if let Some(i) = self.cursor() {
            self.table_state.select(if row_count == 0 {
                None
            } else {
                Some(i.min(row_count - 1))
            });
        }
    }

    /// Which header was clicked, given the table's inner area.
    #[must_use]
    pub fn header_at(area: Rect, column: u16) -> Option<SortKey> {
        let cells = Layout::horizontal(COLUMN_WIDTHS)
            .spacing(COLUMN_SPACING)
            .split(area);
        cells
            .iter()
            .position(|cell| column >= cell.x && column < cell.x + cell.width)
            .map(|i| SortKey::ALL[i])
    }

    /// Index of the row drawn at terminal row `row`, given the inner area the
    /// table was drawn in (header on the first line).
    #[must_use]
    pub fn row_at(&self, area: Rect, row: u16, row_count: usize) -> Option<usize> {
        let body_top = area.y + 1;
        if row < body_top || row >= area.y + area.height {
            return None;
        }
        let index = self.table_state.offset() + usize::from(row - body_top);
        (index < row_count).then_some(index)
    }
}
