//! Raw itinerary → [`Flight`] normalization
//!
//! Itineraries arrive as untyped JSON. Each one is first validated into a
//! typed intermediate form, with failures reported as
//! [`FlightError::InvalidItinerary`] naming the offending path, and only then
//! mapped to the canonical record.

use crate::coordinates::{resolve_coordinates, CoordinateLookup, StaticAirportCoordinates};
use crate::{Airline, Flight, FlightEndpoint, FlightError, Price};
use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) const UNKNOWN_AIRLINE: &str = "Unknown Airline";

#[derive(Debug, Deserialize)]
pub(crate) struct RawPrice {
    pub formatted: String,
    pub raw: f64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCarriers {
    #[serde(default, deserialize_with = "null_as_default")]
    pub marketing: Vec<RawCarrier>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCarrier {
    pub name: Option<String>,
    pub code: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPlace {
    pub name: String,
    pub display_code: String,
    pub city: Option<String>,
    pub terminal: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeg {
    origin: Value,
    destination: Value,
    departure: String,
    arrival: String,
    duration_in_minutes: u32,
    stop_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    carriers: RawCarriers,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSegmentSummary {
    flight_number: String,
}

/// Validated first-leg view of one itinerary
struct ValidatedItinerary {
    id: String,
    price: RawPrice,
    leg: RawLeg,
    origin: RawPlace,
    destination: RawPlace,
    flight_number: String,
    tags: Vec<String>,
}

/// Treat an explicit `null` like a missing key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize `value` as `T`, attributing any failure to `path`
pub(crate) fn parse_at<T: DeserializeOwned>(value: Option<&Value>, path: &str) -> Result<T, FlightError> {
    let value = value.filter(|v| !v.is_null()).ok_or_else(|| FlightError::InvalidItinerary {
        path: path.to_string(),
        reason: "missing".to_string(),
    })?;
    T::deserialize(value).map_err(|e| FlightError::InvalidItinerary {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// `125` → `"2h 5m"`
pub fn format_duration(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Provider timestamps are local wall-clock times, usually without an offset
pub(crate) fn parse_timestamp(raw: &str, path: &str) -> Result<NaiveDateTime, FlightError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_local()))
        .map_err(|e| FlightError::InvalidItinerary {
            path: path.to_string(),
            reason: format!("invalid timestamp {:?}: {}", raw, e),
        })
}

/// en-US two-digit clock time, e.g. `"08:30 AM"`
pub(crate) fn format_time(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%I:%M %p").to_string()
}

/// en-US short date, e.g. `"6/1/2024"`
pub(crate) fn format_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%-m/%-d/%Y").to_string()
}

/// Maps raw provider itineraries to [`Flight`] records
pub struct ItineraryNormalizer {
    coordinates: Arc<dyn CoordinateLookup>,
    currency: String,
}

impl Default for ItineraryNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(StaticAirportCoordinates::builtin()), "USD")
    }
}

impl ItineraryNormalizer {
    pub fn new(coordinates: Arc<dyn CoordinateLookup>, currency: impl Into<String>) -> Self {
        Self {
            coordinates,
            currency: currency.into(),
        }
    }

    fn validate(raw: &Value) -> Result<ValidatedItinerary, FlightError> {
        let id = match raw.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(FlightError::InvalidItinerary {
                    path: "id".to_string(),
                    reason: "missing".to_string(),
                })
            }
        };

        let price: RawPrice = parse_at(raw.get("price"), "price")?;
        let leg_value = raw.get("legs").and_then(|legs| legs.get(0));
        let leg: RawLeg = parse_at(leg_value, "legs[0]")?;
        let origin: RawPlace = parse_at(Some(&leg.origin), "legs[0].origin")?;
        let destination: RawPlace = parse_at(Some(&leg.destination), "legs[0].destination")?;

        let segment_value = leg_value
            .and_then(|leg| leg.get("segments"))
            .and_then(|segments| segments.get(0));
        let segment: RawSegmentSummary = parse_at(segment_value, "legs[0].segments[0]")?;

        let tags = match raw.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            tags => parse_at(tags, "tags")?,
        };

        Ok(ValidatedItinerary {
            id,
            price,
            leg,
            origin,
            destination,
            flight_number: segment.flight_number,
            tags,
        })
    }

    fn endpoint(
        &self,
        place: RawPlace,
        location: &Value,
        timestamp: &str,
        path: &str,
    ) -> Result<FlightEndpoint, FlightError> {
        let at = parse_timestamp(timestamp, path)?;
        let coordinates =
            resolve_coordinates(location, Some(&place.display_code), self.coordinates.as_ref());
        if coordinates.is_none() {
            debug!(code = %place.display_code, "No coordinates resolved for airport");
        }

        Ok(FlightEndpoint {
            airport: place.name,
            code: place.display_code,
            city: place.city,
            time: format_time(&at),
            date: format_date(&at),
            coordinates,
        })
    }

    /// Normalize one raw itinerary, stamping it with `session_token`
    pub fn normalize(&self, raw: &Value, session_token: Option<&str>) -> Result<Flight, FlightError> {
        let itinerary = Self::validate(raw)?;
        let leg = itinerary.leg;

        let departure = self.endpoint(
            itinerary.origin,
            &leg.origin,
            &leg.departure,
            "legs[0].departure",
        )?;
        let arrival = self.endpoint(
            itinerary.destination,
            &leg.destination,
            &leg.arrival,
            "legs[0].arrival",
        )?;

        let carrier = leg.carriers.marketing.first();
        let airline = Airline {
            name: carrier
                .and_then(|c| c.name.clone())
                .unwrap_or_else(|| UNKNOWN_AIRLINE.to_string()),
            logo_url: carrier.and_then(|c| c.logo_url.clone()),
        };

        Ok(Flight {
            id: itinerary.id,
            session_token: session_token.map(str::to_string),
            airline,
            price: Price {
                total: itinerary.price.formatted,
                raw: itinerary.price.raw,
                currency: self.currency.clone(),
            },
            departure,
            arrival,
            duration: format_duration(leg.duration_in_minutes),
            stops: leg.stop_count,
            flight_number: itinerary.flight_number,
            tags: itinerary.tags,
        })
    }

    /// Normalize a batch, skipping itineraries that fail validation
    pub fn normalize_all(&self, raw: &[Value], session_token: Option<&str>) -> Vec<Flight> {
        raw.iter()
            .enumerate()
            .filter_map(|(index, item)| match self.normalize(item, session_token) {
                Ok(flight) => Some(flight),
                Err(e) => {
                    warn!(index = index, error = %e, "Skipping itinerary that failed validation");
                    None
                }
            })
            .collect()
    }
}
