//! Airport coordinate resolution
//!
//! Provider payloads expose endpoint coordinates under several different
//! schemas, and sometimes not at all. [`resolve_coordinates`] walks the known
//! schemas in order and falls back to a [`CoordinateLookup`] keyed by display code.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A resolved latitude/longitude pair. Never partially populated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Fallback source of coordinates for a display code
pub trait CoordinateLookup: Send + Sync {
    fn lookup(&self, display_code: &str) -> Option<Coordinates>;
}

/// In-memory code → coordinates table
#[derive(Debug, Clone, Default)]
pub struct StaticAirportCoordinates {
    table: HashMap<String, Coordinates>,
}

impl StaticAirportCoordinates {
    /// An empty table; every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table of airports the provider commonly returns without coordinates
    pub fn builtin() -> Self {
        Self::empty()
            .with_airport("LHR", 51.4700, -0.4543)
            .with_airport("ESB", 40.1281, 32.9951)
            .with_airport("IST", 41.2818, 28.7388)
            .with_airport("SAW", 40.8985, 29.3092)
            .with_airport("ADB", 38.2924, 27.1570)
    }

    pub fn with_airport(mut self, code: &str, lat: f64, lng: f64) -> Self {
        self.table
            .insert(code.to_ascii_uppercase(), Coordinates::new(lat, lng));
        self
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl CoordinateLookup for StaticAirportCoordinates {
    fn lookup(&self, display_code: &str) -> Option<Coordinates> {
        self.table.get(&display_code.to_ascii_uppercase()).copied()
    }
}

/// Embedded coordinate schemas, in priority order: (object key, latitude key, longitude key)
const COORDINATE_SCHEMAS: &[(&str, &str, &str)] = &[
    ("coordinates", "lat", "lon"),
    ("location", "latitude", "longitude"),
    ("position", "latitude", "longitude"),
];

/// Resolve coordinates for one leg endpoint.
///
/// The first schema with both values present wins; zero and non-numeric
/// values count as absent. `location` is the raw origin/destination object.
pub fn resolve_coordinates(
    location: &Value,
    display_code: Option<&str>,
    fallback: &dyn CoordinateLookup,
) -> Option<Coordinates> {
    COORDINATE_SCHEMAS
        .iter()
        .find_map(|(object, lat_key, lng_key)| {
            let nested = location.get(*object)?;
            let lat = coordinate_value(nested.get(*lat_key)?)?;
            let lng = coordinate_value(nested.get(*lng_key)?)?;
            Some(Coordinates::new(lat, lng))
        })
        .or_else(|| display_code.and_then(|code| fallback.lookup(code)))
}

fn coordinate_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (number != 0.0 && number.is_finite()).then_some(number)
}
