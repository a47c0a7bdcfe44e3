//! HTTP client for the Sky Scrapper flight API

use crate::config::{ProviderConfig, SearchDefaults};
use crate::FlightError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Raw status and body of one provider call. Interpretation is left to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Parameters of one origin/destination/date flight search
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub origin_sky_id: String,
    pub origin_entity_id: String,
    pub destination_sky_id: String,
    pub destination_entity_id: String,
    pub date: String,
    pub defaults: SearchDefaults,
}

/// Parameters of one itinerary detail lookup
#[derive(Debug, Clone, PartialEq)]
pub struct DetailQuery {
    pub itinerary_id: String,
    pub session_id: String,
    pub defaults: SearchDefaults,
}

impl DetailQuery {
    /// JSON-encoded `legs` parameter, e.g. `[{"itineraryId":"…","source":"GDS"}]`
    pub fn legs_param(&self) -> String {
        serde_json::json!([{ "itineraryId": self.itinerary_id, "source": "GDS" }]).to_string()
    }
}

/// The three provider calls the engine depends on.
///
/// Transport failures are returned as errors; HTTP error statuses are not.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    async fn search_airport(&self, query: &str) -> Result<ProviderResponse, FlightError>;

    async fn search_flights(&self, query: &RouteQuery) -> Result<ProviderResponse, FlightError>;

    async fn get_flight_details(&self, query: &DetailQuery) -> Result<ProviderResponse, FlightError>;
}

/// Bound a provider call by `duration`, mapping expiry to [`FlightError::Timeout`]
pub async fn with_timeout<T, F>(duration: Duration, call: F) -> Result<T, FlightError>
where
    F: Future<Output = Result<T, FlightError>>,
{
    tokio::time::timeout(duration, call)
        .await
        .map_err(|_| FlightError::Timeout(duration))?
}

/// reqwest-backed [`ProviderApi`] talking to RapidAPI
pub struct SkyScrapperClient {
    http_client: Client,
    base_url: String,
    locale: String,
}

impl SkyScrapperClient {
    /// Create a new client. Fails before any request if the config has no API key.
    pub fn new(config: &ProviderConfig) -> Result<Self, FlightError> {
        debug!("Creating new Sky Scrapper client");
        config.validate()?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| FlightError::Configuration(format!("Invalid API key header: {}", e)))?;
        let host = HeaderValue::from_str(&config.api_host)
            .map_err(|e| FlightError::Configuration(format!("Invalid API host header: {}", e)))?;
        headers.insert("x-rapidapi-key", key);
        headers.insert("x-rapidapi-host", host);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        debug!("Sky Scrapper client created successfully");
        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            locale: config.defaults.locale.clone(),
        })
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<ProviderResponse, FlightError> {
        let url = format!("{}{}", self.base_url, path);
        info!(url = %url, "Making HTTP request to provider");

        let start_time = std::time::Instant::now();
        let response = self.http_client.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let request_duration = start_time.elapsed();

        info!(
            status = %status,
            duration_ms = request_duration.as_millis(),
            body_length = body.len(),
            "HTTP request completed"
        );

        if !status.is_success() {
            error!(status = %status, "Provider returned an error status");
        }

        Ok(ProviderResponse::new(status.as_u16(), body))
    }
}

#[async_trait]
impl ProviderApi for SkyScrapperClient {
    #[instrument(level = "info", skip(self))]
    async fn search_airport(&self, query: &str) -> Result<ProviderResponse, FlightError> {
        self.get(
            "/v1/flights/searchAirport",
            &[("query", query), ("locale", self.locale.as_str())],
        )
        .await
    }

    #[instrument(level = "info", skip(self, query), fields(origin = %query.origin_sky_id, destination = %query.destination_sky_id, date = %query.date))]
    async fn search_flights(&self, query: &RouteQuery) -> Result<ProviderResponse, FlightError> {
        let adults = query.defaults.adults.to_string();
        self.get(
            "/v1/flights/searchFlights",
            &[
                ("originSkyId", query.origin_sky_id.as_str()),
                ("destinationSkyId", query.destination_sky_id.as_str()),
                ("originEntityId", query.origin_entity_id.as_str()),
                ("destinationEntityId", query.destination_entity_id.as_str()),
                ("date", query.date.as_str()),
                ("adults", adults.as_str()),
                ("currency", query.defaults.currency.as_str()),
                ("market", query.defaults.market.as_str()),
                ("countryCode", query.defaults.country_code.as_str()),
                ("cabinClass", query.defaults.cabin_class.as_str()),
            ],
        )
        .await
    }

    #[instrument(level = "info", skip(self, query), fields(itinerary_id = %query.itinerary_id))]
    async fn get_flight_details(&self, query: &DetailQuery) -> Result<ProviderResponse, FlightError> {
        let legs = query.legs_param();
        let adults = query.defaults.adults.to_string();
        self.get(
            "/v1/flights/getFlightDetails",
            &[
                ("legs", legs.as_str()),
                ("sessionId", query.session_id.as_str()),
                ("adults", adults.as_str()),
                ("currency", query.defaults.currency.as_str()),
                ("locale", query.defaults.locale.as_str()),
                ("market", query.defaults.market.as_str()),
                ("cabinClass", query.defaults.cabin_class.as_str()),
                ("countryCode", query.defaults.country_code.as_str()),
            ],
        )
        .await
    }
}
