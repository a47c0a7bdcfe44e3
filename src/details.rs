//! Segment-level detail for one selected itinerary

use crate::client::{with_timeout, DetailQuery, ProviderApi};
use crate::config::SearchDefaults;
use crate::normalizer::{
    format_date, format_duration, format_time, null_as_default, parse_at, parse_timestamp,
    RawCarrier, RawCarriers, RawPlace, RawPrice, UNKNOWN_AIRLINE,
};
use crate::{is_truthy, FlightError, Price};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const NO_DETAILS: &str = "No flight details available";
const INVALID_FORMAT: &str = "Invalid response format";

/// Full detail of one itinerary's first leg, including every segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetail {
    pub id: String,
    pub session_token: String,
    pub airline: DetailAirline,
    pub departure: DetailEndpoint,
    pub arrival: DetailEndpoint,
    pub duration: String,
    pub stops: u32,
    /// Flight number of the first segment
    pub flight_number: Option<String>,
    pub segments: Vec<Segment>,
    pub price: Option<Price>,
    pub baggage: Baggage,
    pub amenities: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailAirline {
    pub name: String,
    pub code: Option<String>,
    pub logo: Option<String>,
}

/// Leg or segment endpoint; carries the terminal but no coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailEndpoint {
    pub airport: String,
    pub code: String,
    pub city: Option<String>,
    pub terminal: Option<String>,
    pub time: String,
    pub date: String,
}

/// One flight within a leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: Option<String>,
    pub flight_number: Option<String>,
    pub aircraft: Aircraft,
    pub departure: DetailEndpoint,
    pub arrival: DetailEndpoint,
    pub duration: String,
    pub carrier: Carrier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub name: Option<String>,
    pub code: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baggage {
    pub cabin: Option<Value>,
    pub checked: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetailLeg {
    origin: RawPlace,
    destination: RawPlace,
    departure: String,
    arrival: String,
    duration_in_minutes: u32,
    stop_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    carriers: RawCarriers,
    #[serde(default, deserialize_with = "null_as_default")]
    segments: Vec<Value>,
    baggage_types: Option<Baggage>,
    #[serde(default, deserialize_with = "null_as_default")]
    amenities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSegment {
    id: Option<String>,
    flight_number: Option<String>,
    #[serde(default)]
    aircraft: Aircraft,
    origin: RawPlace,
    destination: RawPlace,
    departure: String,
    arrival: String,
    duration_in_minutes: u32,
    marketing_carrier: Option<RawCarrier>,
}

fn endpoint(place: RawPlace, timestamp: &str, path: &str) -> Result<DetailEndpoint, FlightError> {
    let timestamp = parse_timestamp(timestamp, path)?;
    Ok(DetailEndpoint {
        airport: place.name,
        code: place.display_code,
        city: place.city,
        terminal: place.terminal,
        time: format_time(&timestamp),
        date: format_date(&timestamp),
    })
}

fn segment(raw: &Value, path: &str) -> Result<Segment, FlightError> {
    let segment: RawSegment = parse_at(Some(raw), path)?;
    let carrier = segment
        .marketing_carrier
        .map(|c| Carrier {
            name: c.name,
            code: c.code,
            logo: c.logo_url,
        })
        .unwrap_or_default();

    Ok(Segment {
        id: segment.id,
        flight_number: segment.flight_number,
        aircraft: segment.aircraft,
        departure: endpoint(segment.origin, &segment.departure, &format!("{}.departure", path))?,
        arrival: endpoint(segment.destination, &segment.arrival, &format!("{}.arrival", path))?,
        duration: format_duration(segment.duration_in_minutes),
        carrier,
    })
}

/// Fetches and maps itinerary detail for a flight from an earlier search
pub struct DetailFetcher {
    provider: Arc<dyn ProviderApi>,
    defaults: SearchDefaults,
    timeout: Duration,
}

impl DetailFetcher {
    pub fn new(provider: Arc<dyn ProviderApi>, defaults: SearchDefaults, timeout: Duration) -> Self {
        Self {
            provider,
            defaults,
            timeout,
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn fetch_detail(&self, flight_id: &str, session_token: &str) -> Result<FlightDetail, FlightError> {
        let query = DetailQuery {
            itinerary_id: flight_id.to_string(),
            session_id: session_token.to_string(),
            defaults: self.defaults.clone(),
        };

        let response = with_timeout(self.timeout, self.provider.get_flight_details(&query)).await?;

        if !response.is_success() {
            warn!(status = response.status, "Flight details request failed");
            return Err(FlightError::Provider {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: Value = serde_json::from_str(&response.body).map_err(|e| {
            warn!(error = %e, "Flight details response is not valid JSON");
            FlightError::DetailsUnavailable(INVALID_FORMAT.to_string())
        })?;

        let itinerary = parsed
            .get("data")
            .and_then(|data| data.get("itinerary"))
            .filter(|itinerary| !itinerary.is_null());

        let itinerary = match itinerary {
            Some(itinerary) if is_truthy(parsed.get("status")) => itinerary,
            _ => {
                let message = parsed
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(NO_DETAILS);
                warn!(message = message, "Provider returned no flight details");
                return Err(FlightError::DetailsUnavailable(message.to_string()));
            }
        };

        let detail = self.map_detail(itinerary, flight_id, session_token)?;
        info!(segments = detail.segments.len(), "Fetched flight details");
        Ok(detail)
    }

    fn map_detail(&self, itinerary: &Value, flight_id: &str, session_token: &str) -> Result<FlightDetail, FlightError> {
        let leg_value = itinerary.get("legs").and_then(|legs| legs.get(0));
        let leg: RawDetailLeg = parse_at(leg_value, "legs[0]")?;

        let price = match itinerary.get("price").filter(|p| !p.is_null()) {
            Some(raw) => {
                let raw: RawPrice = parse_at(Some(raw), "price")?;
                Some(Price {
                    total: raw.formatted,
                    raw: raw.raw,
                    currency: self.defaults.currency.clone(),
                })
            }
            None => None,
        };

        let tags: Vec<String> = match itinerary.get("tags") {
            Some(tags) if !tags.is_null() => parse_at(Some(tags), "tags")?,
            _ => Vec::new(),
        };

        let segments = leg
            .segments
            .iter()
            .enumerate()
            .map(|(i, raw)| segment(raw, &format!("legs[0].segments[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(segments = segments.len(), "Mapped detail segments");

        let carrier = leg.carriers.marketing.into_iter().next();
        let airline = DetailAirline {
            name: carrier
                .as_ref()
                .and_then(|c| c.name.clone())
                .unwrap_or_else(|| UNKNOWN_AIRLINE.to_string()),
            code: carrier.as_ref().and_then(|c| c.code.clone()),
            logo: carrier.and_then(|c| c.logo_url),
        };

        Ok(FlightDetail {
            id: flight_id.to_string(),
            session_token: session_token.to_string(),
            airline,
            departure: endpoint(leg.origin, &leg.departure, "legs[0].departure")?,
            arrival: endpoint(leg.destination, &leg.arrival, "legs[0].arrival")?,
            duration: format_duration(leg.duration_in_minutes),
            stops: leg.stop_count,
            flight_number: segments.first().and_then(|s| s.flight_number.clone()),
            segments,
            price,
            baggage: leg.baggage_types.unwrap_or_default(),
            amenities: leg.amenities,
            tags,
        })
    }
}
