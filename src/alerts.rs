//! Banner alerts derived from a snapshot.
//!
//! Derivation is a pure scan in feed order. Whether a banner is on screen is
//! tracked separately per category, keyed by the snapshot version it was
//! derived from, so a dismissal only lasts until the next snapshot.

use crate::models::{Feature, Snapshot};

/// Magnitude at or above which an event raises the major alert.
pub const MAJOR_MAGNITUDE: f64 = 7.0;

/// Alert categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Major,
    Tsunami,
}

impl AlertKind {
    /// Text shown on the banner for `event`.
    #[must_use]
    pub fn banner_text(self, event: &Feature) -> String {
        let mag = event.magnitude();
        let place = &event.properties.place;
        match self {
            Self::Major => format!("Major Earthquake Alert: Magnitude {mag:.1} near {place}"),
            Self::Tsunami => format!(
                "Tsunami Alert: Potential tsunami threat from M{mag:.1} earthquake near {place}"
            ),
        }
    }
}

/// The first qualifying event of each category, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedAlerts<'a> {
    pub major: Option<&'a Feature>,
    pub tsunami: Option<&'a Feature>,
}

impl<'a> DerivedAlerts<'a> {
    #[must_use]
    pub fn get(&self, kind: AlertKind) -> Option<&'a Feature> {
        match kind {
            AlertKind::Major => self.major,
            AlertKind::Tsunami => self.tsunami,
        }
    }
}

/// Find the first major event and the first tsunami-flagged event, in the
/// order the feed returned them.
#[must_use]
pub fn derive(events: &[Feature]) -> DerivedAlerts<'_> {
    DerivedAlerts {
        major: events.iter().find(|e| e.magnitude() >= MAJOR_MAGNITUDE),
        tsunami: events.iter().find(|e| e.is_tsunami()),
    }
}

/// Visibility of one alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Dismissed,
}

#[derive(Debug, Clone, Default)]
struct AlertSlot {
    /// Qualifying event of the snapshot at `version`, if any.
    event_id: Option<String>,
    version: u64,
    dismissed: bool,
}

impl AlertSlot {
    fn visibility(&self) -> Option<Visibility> {
        self.event_id.as_ref().map(|_| {
            if self.dismissed {
                Visibility::Dismissed
            } else {
                Visibility::Shown
            }
        })
    }
}

/// Per-category alert state for the current snapshot.
#[derive(Debug, Clone, Default)]
pub struct AlertBoard {
    major: AlertSlot,
    tsunami: AlertSlot,
}

impl AlertBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive both categories from a new snapshot. Earlier dismissals do
    /// not carry over.
    pub fn refresh(&mut self, snapshot: &Snapshot) {
        let derived = derive(&snapshot.events);
        for kind in [AlertKind::Major, AlertKind::Tsunami] {
            let event_id = derived.get(kind).map(|e| e.id.clone());
            if let Some(id) = &event_id {
                tracing::info!(?kind, event = %id, version = snapshot.version, "alert raised");
            }
            *self.slot_mut(kind) = AlertSlot {
                event_id,
                version: snapshot.version,
                dismissed: false,
            };
        }
    }

    /// Hide the banner of `kind` until the next snapshot.
    ///
    /// Returns `false` when there was nothing shown to dismiss.
    pub fn dismiss(&mut self, kind: AlertKind) -> bool {
        let slot = self.slot_mut(kind);
        if slot.visibility() != Some(Visibility::Shown) {
            return false;
        }
        slot.dismissed = true;
        tracing::debug!(?kind, version = slot.version, "alert dismissed");
        true
    }

    /// The event whose banner should be on screen for `snapshot`.
    ///
    /// Returns `None` if dismissed, or if the board was derived from another
    /// snapshot version.
    #[must_use]
    pub fn visible<'a>(&self, kind: AlertKind, snapshot: &'a Snapshot) -> Option<&'a Feature> {
        let slot = self.slot(kind);
        if slot.version != snapshot.version || slot.visibility() != Some(Visibility::Shown) {
            return None;
        }
        slot.event_id.as_deref().and_then(|id| snapshot.find(id))
    }

    fn slot(&self, kind: AlertKind) -> &AlertSlot {
        match kind {
            AlertKind::Major => &self.major,
            AlertKind::Tsunami => &self.tsunami,
        }
    }

    fn slot_mut(&mut self, kind: AlertKind) -> &mut AlertSlot {
        match kind {
            AlertKind::Major => &mut self.major,
            AlertKind::Tsunami => &mut self.tsunami,
        }
    }
}
