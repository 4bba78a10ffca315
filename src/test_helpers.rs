//! A set of helpers for testing

use crate::models::{Feature, FeatureCollection, Geometry, Properties, Snapshot};

/// A builder for creating `Feature` instances for testing.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    id: String,
    mag: f64,
    place: String,
    time: i64,
    tsunami: i32,
    coordinates: Vec<f64>,
}

impl EventBuilder {
    /// Creates a new `EventBuilder` with the given ID and sensible defaults.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            mag: 2.5,
            place: format!("near {id}"),
            time: 1_700_000_000_000,
            tsunami: 0,
            coordinates: vec![0.0, 0.0, 10.0],
        }
    }

    pub fn mag(mut self, mag: f64) -> Self {
        self.mag = mag;
        self
    }

    pub fn place(mut self, place: &str) -> Self {
        self.place = place.to_string();
        self
    }

    pub fn time(mut self, time: i64) -> Self {
        self.time = time;
        self
    }

    pub fn tsunami(mut self, tsunami: i32) -> Self {
        self.tsunami = tsunami;
        self
    }

    /// Sets longitude and latitude, keeping the depth.
    pub fn at(mut self, lon: f64, lat: f64) -> Self {
        self.coordinates[0] = lon;
        self.coordinates[1] = lat;
        self
    }

    pub fn depth(mut self, depth_km: f64) -> Self {
        self.coordinates[2] = depth_km;
        self
    }

    /// Builds the `Feature` with the provided or default values.
    pub fn build(self) -> Feature {
        Feature {
            properties: Properties {
                mag: self.mag,
                mag_type: Some("ml".into()),
                title: format!("M {:.1} - {}", self.mag, self.place),
                url: format!("https://earthquake.usgs.gov/earthquakes/eventpage/{}", self.id),
                place: self.place,
                time: self.time,
                alert: None,
                tsunami: self.tsunami,
            },
            geometry: Geometry {
                coordinates: self.coordinates,
            },
            id: self.id,
        }
    }
}

/// Wraps events in a feed document as the client would return it.
pub fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        type_: "FeatureCollection".into(),
        features,
    }
}

/// Builds a snapshot at the given version.
pub fn snapshot(version: u64, features: Vec<Feature>) -> Snapshot {
    Snapshot::new(version, features)
}

/// The two-event example used throughout the tests: a major quake with no
/// tsunami flag, followed by a minor quake that carries one.
pub fn major_and_tsunami() -> Vec<Feature> {
    vec![
        EventBuilder::new("a").mag(7.2).place("X").at(140.0, 35.0).build(),
        EventBuilder::new("b").mag(4.0).tsunami(1).place("Y").at(-70.0, -20.0).build(),
    ]
}
