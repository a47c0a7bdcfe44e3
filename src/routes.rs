//! Single origin/destination/date route queries

use crate::airports::AirportCandidate;
use crate::client::{with_timeout, ProviderApi, RouteQuery};
use crate::config::SearchDefaults;
use crate::{is_truthy, FlightError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Raw itineraries and session token from one route query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteResult {
    pub itineraries: Vec<Value>,
    pub session_token: Option<String>,
}

impl RouteResult {
    /// No flights on this pair
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.itineraries.is_empty()
    }
}

pub struct RouteSearcher {
    provider: Arc<dyn ProviderApi>,
    defaults: SearchDefaults,
    timeout: Duration,
}

impl RouteSearcher {
    pub fn new(provider: Arc<dyn ProviderApi>, defaults: SearchDefaults, timeout: Duration) -> Self {
        Self {
            provider,
            defaults,
            timeout,
        }
    }

    /// Search one airport pair for one date.
    ///
    /// An error status or a falsy `status` flag is an empty result, not an
    /// error. Transport failures, timeouts and unparseable bodies are errors.
    pub async fn query(
        &self,
        origin: &AirportCandidate,
        destination: &AirportCandidate,
        date: &str,
    ) -> Result<RouteResult, FlightError> {
        info!(
            origin = %origin.name,
            destination = %destination.name,
            date = date,
            "Searching flights for route"
        );

        let query = RouteQuery {
            origin_sky_id: origin.iata.clone(),
            origin_entity_id: origin.entity_id.clone(),
            destination_sky_id: destination.iata.clone(),
            destination_entity_id: destination.entity_id.clone(),
            date: date.to_string(),
            defaults: self.defaults.clone(),
        };

        let response = with_timeout(self.timeout, self.provider.search_flights(&query)).await?;

        if !response.is_success() {
            info!(
                origin = %origin.name,
                destination = %destination.name,
                status = response.status,
                "No flights found for route"
            );
            return Ok(RouteResult::empty());
        }

        let parsed: Value = serde_json::from_str(&response.body).map_err(|_| FlightError::Provider {
            status: response.status,
            body: response.body.clone(),
        })?;

        if !is_truthy(parsed.get("status")) {
            info!(
                origin = %origin.name,
                destination = %destination.name,
                "No flights found for route"
            );
            return Ok(RouteResult::empty());
        }

        let itineraries = parsed
            .get("data")
            .and_then(|data| data.get("itineraries"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let session_token = parsed
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string);

        debug!(
            itineraries = itineraries.len(),
            has_session = session_token.is_some(),
            "Route query completed"
        );

        Ok(RouteResult {
            itineraries,
            session_token,
        })
    }
}
