//! # Sky Flights Library
//!
//! Aggregates flight offers from the Sky Scrapper API. A free-text city pair is
//! resolved into candidate airports, every candidate pair is searched, and the
//! heterogeneous itinerary payloads are normalized into [`Flight`] records.
//! Full segment-level detail for a selected flight is available through
//! [`FlightService::flight_details`].

pub mod airports;
pub mod client;
pub mod config;
pub mod coordinates;
pub mod details;
pub mod normalizer;
pub mod orchestrator;
pub mod routes;

#[cfg(test)]
mod test_support;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// Re-export main types for convenience
pub use airports::{Airport, AirportCandidate, AirportResolver, AirportSuggestion};
pub use client::{DetailQuery, ProviderApi, ProviderResponse, RouteQuery, SkyScrapperClient};
pub use config::{ProviderConfig, SearchDefaults};
pub use coordinates::{CoordinateLookup, Coordinates, StaticAirportCoordinates};
pub use details::{DetailFetcher, FlightDetail, Segment};
pub use normalizer::ItineraryNormalizer;
pub use orchestrator::{
    plan_route_tasks, PairOutcome, RouteExecutor, RouteTask, SearchOrchestrator,
    SequentialExecutor, SessionTokenPolicy,
};
pub use routes::{RouteResult, RouteSearcher};

/// Error types for the flights library
#[derive(Error, Debug)]
pub enum FlightError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No airports found for the selected cities (origin: {origin}, destination: {destination})")]
    NoAirportsFound { origin: String, destination: String },

    #[error("Provider request failed with status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Flight details unavailable: {0}")]
    DetailsUnavailable(String),

    #[error("Invalid itinerary at {path}: {reason}")]
    InvalidItinerary { path: String, reason: String },

    #[error("Invalid date format: {0}")]
    DateParseError(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Search was cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Free-text search input for one-way or round-trip searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub return_date: Option<String>,
}

impl SearchRequest {
    pub fn one_way(origin: &str, destination: &str, date: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            date: date.to_string(),
            return_date: None,
        }
    }

    pub fn round_trip(origin: &str, destination: &str, date: &str, return_date: &str) -> Self {
        Self {
            return_date: Some(return_date.to_string()),
            ..Self::one_way(origin, destination, date)
        }
    }
}

/// Aggregated, normalized flights for both directions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub outbound: Vec<Flight>,
    #[serde(rename = "return")]
    pub return_flights: Vec<Flight>,
}

/// Canonical summary of one itinerary, built from its first leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub session_token: Option<String>,
    pub airline: Airline,
    pub price: Price,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    pub duration: String,
    pub stops: u32,
    pub flight_number: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airline {
    pub name: String,
    pub logo_url: Option<String>,
}

/// Price with the provider's display string, numeric amount and the search currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub total: String,
    pub raw: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightEndpoint {
    pub airport: String,
    pub code: String,
    pub city: Option<String>,
    pub time: String,
    pub date: String,
    pub coordinates: Option<Coordinates>,
}

/// One end of a map polyline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub airport: String,
    pub code: String,
}

/// Map-layer projection of a flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRoute {
    pub departure: MapPoint,
    pub arrival: MapPoint,
}

impl FlightEndpoint {
    fn map_point(&self) -> Option<MapPoint> {
        let coordinates = self.coordinates?;
        Some(MapPoint {
            latitude: coordinates.lat,
            longitude: coordinates.lng,
            airport: self.airport.clone(),
            code: self.code.clone(),
        })
    }
}

impl Flight {
    /// `None` unless both endpoints have coordinates
    pub fn map_route(&self) -> Option<MapRoute> {
        Some(MapRoute {
            departure: self.departure.map_point()?,
            arrival: self.arrival.map_point()?,
        })
    }
}

/// Map routes for every flight with resolved coordinates; the rest are skipped
pub fn map_routes(flights: &[Flight]) -> Vec<MapRoute> {
    flights.iter().filter_map(Flight::map_route).collect()
}

/// JavaScript-style truthiness of an optional JSON value
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Wires resolver, searcher, normalizer and detail fetcher around one provider
pub struct FlightService {
    airports: AirportResolver,
    orchestrator: SearchOrchestrator,
    details: DetailFetcher,
}

impl FlightService {
    /// Build a service backed by the HTTP client
    pub fn new(config: ProviderConfig) -> Result<Self, FlightError> {
        let client = SkyScrapperClient::new(&config)?;
        Ok(Self::with_provider(Arc::new(client), &config))
    }

    /// Build a service around any provider implementation
    pub fn with_provider(provider: Arc<dyn ProviderApi>, config: &ProviderConfig) -> Self {
        let timeout = config.request_timeout();
        let coordinates: Arc<dyn CoordinateLookup> = Arc::new(StaticAirportCoordinates::builtin());

        let orchestrator = SearchOrchestrator::new(
            AirportResolver::new(provider.clone(), timeout),
            RouteSearcher::new(provider.clone(), config.defaults.clone(), timeout),
            ItineraryNormalizer::new(coordinates, &config.defaults.currency),
        );

        Self {
            airports: AirportResolver::new(provider.clone(), timeout),
            orchestrator,
            details: DetailFetcher::new(provider, config.defaults.clone(), timeout),
        }
    }

    /// Replace the orchestrator, e.g. to change the session token policy
    pub fn with_orchestrator(mut self, orchestrator: SearchOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult, FlightError> {
        self.search_with_cancel(request, &CancellationToken::new()).await
    }

    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, FlightError> {
        self.orchestrator
            .orchestrate_with_cancel(
                &request.origin,
                &request.destination,
                &request.date,
                request.return_date.as_deref(),
                cancel,
            )
            .await
    }

    pub async fn flight_details(
        &self,
        flight_id: &str,
        session_token: &str,
    ) -> Result<FlightDetail, FlightError> {
        self.details.fetch_detail(flight_id, session_token).await
    }

    pub async fn suggest_airports(&self, query: &str) -> Result<Vec<AirportSuggestion>, FlightError> {
        self.airports.suggest(query).await
    }
}

/// One-shot search using a fresh HTTP client
///
/// # Example
/// ```no_run
/// use sky_flights::{search_flights, ProviderConfig, SearchRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ProviderConfig::from_env()?;
/// let request = SearchRequest::round_trip("Istanbul", "Ankara", "2025-08-15", "2025-08-22");
/// let result = search_flights(config, request).await?;
/// println!("{} outbound, {} return", result.outbound.len(), result.return_flights.len());
/// # Ok(())
/// # }
/// ```
pub async fn search_flights(
    config: ProviderConfig,
    request: SearchRequest,
) -> Result<SearchResult, FlightError> {
    let service = FlightService::new(config)?;
    service.search(&request).await
}

/// One-shot detail lookup for a flight returned by [`search_flights`]
pub async fn get_flight_details(
    config: ProviderConfig,
    flight_id: &str,
    session_token: &str,
) -> Result<FlightDetail, FlightError> {
    let service = FlightService::new(config)?;
    service.flight_details(flight_id, session_token).await
}
