//! Airport search and candidate resolution

use crate::client::{with_timeout, ProviderApi};
use crate::FlightError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const AIRPORT_ENTITY: &str = "AIRPORT";

/// An airport a route search can be issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportCandidate {
    pub iata: String,
    pub entity_id: String,
    pub name: String,
}

/// One place returned by the airport search, not yet filtered to airports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub iata: String,
    pub name: String,
    pub city: String,
    pub subtitle: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub full_name: Option<String>,
    pub navigation: AirportNavigation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportNavigation {
    pub entity_id: String,
    pub entity_type: Option<String>,
    pub relevant_flight_params: Option<Value>,
}

/// Autocomplete entry, e.g. `{code: "IST", name: "Istanbul Airport (IST)"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportSuggestion {
    pub code: String,
    pub name: String,
}

impl Airport {
    pub fn is_airport(&self) -> bool {
        self.entity_type.as_deref() == Some(AIRPORT_ENTITY)
            || self.navigation.entity_type.as_deref() == Some(AIRPORT_ENTITY)
    }

    pub fn candidate(&self) -> AirportCandidate {
        AirportCandidate {
            iata: self.iata.clone(),
            entity_id: self.navigation.entity_id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn suggestion(&self) -> AirportSuggestion {
        AirportSuggestion {
            code: self.iata.clone(),
            name: format!("{} ({})", self.name, self.iata),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAirportEntry {
    sky_id: String,
    presentation: RawPresentation,
    navigation: RawNavigation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPresentation {
    title: String,
    subtitle: Option<String>,
    suggestion_title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNavigation {
    entity_id: String,
    entity_type: Option<String>,
    relevant_flight_params: Option<Value>,
}

impl From<RawAirportEntry> for Airport {
    fn from(entry: RawAirportEntry) -> Self {
        Self {
            iata: entry.sky_id,
            name: entry.presentation.title.clone(),
            city: entry.presentation.title,
            subtitle: entry.presentation.subtitle,
            entity_type: entry.navigation.entity_type.clone(),
            full_name: entry.presentation.suggestion_title,
            navigation: AirportNavigation {
                entity_id: entry.navigation.entity_id,
                entity_type: entry.navigation.entity_type,
                relevant_flight_params: entry.navigation.relevant_flight_params,
            },
        }
    }
}

/// Resolves free-text city or airport queries against the provider
pub struct AirportResolver {
    provider: Arc<dyn ProviderApi>,
    timeout: Duration,
}

impl AirportResolver {
    pub fn new(provider: Arc<dyn ProviderApi>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Raw airport search. Provider failures propagate.
    pub async fn search_airports(&self, query: &str) -> Result<Vec<Airport>, FlightError> {
        debug!(query = query, "Searching airports");
        let response = with_timeout(self.timeout, self.provider.search_airport(query)).await?;

        if !response.is_success() {
            return Err(FlightError::Provider {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: Value = match serde_json::from_str(&response.body) {
            Ok(value) => value,
            Err(_) => {
                return Err(FlightError::Provider {
                    status: response.status,
                    body: response.body,
                })
            }
        };

        let entries = match parsed.get("data").and_then(Value::as_array) {
            Some(entries) => entries,
            None => {
                debug!(query = query, "Airport search returned no data array");
                return Ok(Vec::new());
            }
        };

        let airports: Vec<Airport> = entries
            .iter()
            .filter_map(|entry| match RawAirportEntry::deserialize(entry) {
                Ok(raw) => Some(Airport::from(raw)),
                Err(e) => {
                    warn!(query = query, error = %e, "Skipping malformed airport entry");
                    None
                }
            })
            .collect();

        debug!(query = query, results = airports.len(), "Airport search completed");
        Ok(airports)
    }

    /// Candidate airports for a city query. Any failure yields an empty list.
    pub async fn resolve(&self, query: &str) -> Vec<AirportCandidate> {
        match self.search_airports(query).await {
            Ok(airports) => {
                let candidates: Vec<AirportCandidate> = airports
                    .iter()
                    .filter(|airport| airport.is_airport())
                    .map(Airport::candidate)
                    .collect();
                info!(
                    query = query,
                    candidates = ?candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "Resolved airport candidates"
                );
                candidates
            }
            Err(e) => {
                warn!(query = query, error = %e, "Airport resolution failed");
                Vec::new()
            }
        }
    }

    /// Autocomplete suggestions; queries shorter than two characters are not sent
    pub async fn suggest(&self, query: &str) -> Result<Vec<AirportSuggestion>, FlightError> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Ok(Vec::new());
        }

        let airports = self.search_airports(query).await?;
        Ok(airports.iter().map(Airport::suggestion).collect())
    }
}
