//! Cross-product fan-out over candidate airports
//!
//! A search resolves both cities once, plans one [`RouteTask`] per candidate
//! pair, runs the plan through a [`RouteExecutor`] and reduces the per-pair
//! outcomes into normalized flights. The executor is sequential by default,
//! and the session token attached to the flights is chosen by an explicit
//! [`SessionTokenPolicy`] over the ordered outcomes.

use crate::airports::{AirportCandidate, AirportResolver};
use crate::normalizer::ItineraryNormalizer;
use crate::routes::{RouteResult, RouteSearcher};
use crate::{Flight, FlightError, SearchResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// One airport pair to query for one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTask {
    pub origin: AirportCandidate,
    pub destination: AirportCandidate,
    pub date: String,
}

/// The result of running one [`RouteTask`]
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub task: RouteTask,
    pub result: RouteResult,
}

/// Every origin × destination pair, origin-major
pub fn plan_route_tasks(
    origins: &[AirportCandidate],
    destinations: &[AirportCandidate],
    date: &str,
) -> Vec<RouteTask> {
    origins
        .iter()
        .flat_map(|origin| {
            destinations.iter().map(move |destination| RouteTask {
                origin: origin.clone(),
                destination: destination.clone(),
                date: date.to_string(),
            })
        })
        .collect()
}

/// Runs a planned task list.
///
/// Implementations must return outcomes in task order; the token policy
/// depends on it.
#[async_trait]
pub trait RouteExecutor: Send + Sync {
    async fn execute(
        &self,
        searcher: &RouteSearcher,
        tasks: Vec<RouteTask>,
        cancel: &CancellationToken,
    ) -> Result<Vec<PairOutcome>, FlightError>;
}

/// One request at a time; request N+1 is issued after N's response is consumed
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

#[async_trait]
impl RouteExecutor for SequentialExecutor {
    async fn execute(
        &self,
        searcher: &RouteSearcher,
        tasks: Vec<RouteTask>,
        cancel: &CancellationToken,
    ) -> Result<Vec<PairOutcome>, FlightError> {
        let mut outcomes = Vec::with_capacity(tasks.len());

        for task in tasks {
            let query = searcher.query(&task.origin, &task.destination, &task.date);
            let result = match cancellable(cancel, query).await? {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        origin = %task.origin.name,
                        destination = %task.destination.name,
                        error = %e,
                        "Route query failed, treating as empty"
                    );
                    RouteResult::empty()
                }
            };
            outcomes.push(PairOutcome { task, result });
        }

        Ok(outcomes)
    }
}

/// Which session token the flights of one direction carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionTokenPolicy {
    /// Token of the last pair that returned itineraries
    #[default]
    LastWins,
    /// Token of the first pair that returned itineraries
    FirstWins,
    /// Each flight keeps the token of the pair that produced it
    PerPair,
}

impl SessionTokenPolicy {
    /// The single direction-wide token, or `None` for [`SessionTokenPolicy::PerPair`]
    pub fn choose(&self, outcomes: &[PairOutcome]) -> Option<String> {
        let mut productive = outcomes.iter().filter(|outcome| !outcome.result.is_empty());
        let chosen = match self {
            SessionTokenPolicy::LastWins => productive.last(),
            SessionTokenPolicy::FirstWins => productive.next(),
            SessionTokenPolicy::PerPair => None,
        };
        chosen.and_then(|outcome| outcome.result.session_token.clone())
    }

    fn token_for<'a>(&self, chosen: Option<&'a str>, outcome: &'a PairOutcome) -> Option<&'a str> {
        match self {
            SessionTokenPolicy::PerPair => outcome.result.session_token.as_deref(),
            _ => chosen,
        }
    }
}

/// Race `future` against cancellation
async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = T>,
) -> Result<T, FlightError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FlightError::Cancelled),
        value = future => Ok(value),
    }
}

fn validate_date(date: &str) -> Result<(), FlightError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| FlightError::DateParseError(format!("expected YYYY-MM-DD, got {}", date)))
}

pub struct SearchOrchestrator {
    resolver: AirportResolver,
    searcher: RouteSearcher,
    normalizer: ItineraryNormalizer,
    executor: Arc<dyn RouteExecutor>,
    token_policy: SessionTokenPolicy,
}

impl SearchOrchestrator {
    pub fn new(resolver: AirportResolver, searcher: RouteSearcher, normalizer: ItineraryNormalizer) -> Self {
        Self {
            resolver,
            searcher,
            normalizer,
            executor: Arc::new(SequentialExecutor),
            token_policy: SessionTokenPolicy::default(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn RouteExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_token_policy(mut self, token_policy: SessionTokenPolicy) -> Self {
        self.token_policy = token_policy;
        self
    }

    pub async fn orchestrate(
        &self,
        origin: &str,
        destination: &str,
        date: &str,
        return_date: Option<&str>,
    ) -> Result<SearchResult, FlightError> {
        self.orchestrate_with_cancel(origin, destination, date, return_date, &CancellationToken::new())
            .await
    }

    #[instrument(level = "info", skip(self, cancel))]
    pub async fn orchestrate_with_cancel(
        &self,
        origin: &str,
        destination: &str,
        date: &str,
        return_date: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, FlightError> {
        validate_date(date)?;
        if let Some(return_date) = return_date {
            validate_date(return_date)?;
        }

        let origin_airports = cancellable(cancel, self.resolver.resolve(origin)).await?;
        let destination_airports = cancellable(cancel, self.resolver.resolve(destination)).await?;

        if origin_airports.is_empty() || destination_airports.is_empty() {
            warn!(
                origin = origin,
                destination = destination,
                origin_airports = origin_airports.len(),
                destination_airports = destination_airports.len(),
                "No airports found for the selected cities"
            );
            return Err(FlightError::NoAirportsFound {
                origin: origin.to_string(),
                destination: destination.to_string(),
            });
        }

        let outbound = self
            .search_direction(&origin_airports, &destination_airports, date, cancel)
            .await?;

        let return_flights = match return_date {
            Some(return_date) => {
                self.search_direction(&destination_airports, &origin_airports, return_date, cancel)
                    .await?
            }
            None => Vec::new(),
        };

        info!(
            outbound = outbound.len(),
            return_flights = return_flights.len(),
            "Flight search completed"
        );

        Ok(SearchResult {
            outbound,
            return_flights,
        })
    }

    async fn search_direction(
        &self,
        origins: &[AirportCandidate],
        destinations: &[AirportCandidate],
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Flight>, FlightError> {
        let tasks = plan_route_tasks(origins, destinations, date);
        info!(pairs = tasks.len(), date = date, "Searching candidate airport pairs");

        let outcomes = self.executor.execute(&self.searcher, tasks, cancel).await?;
        Ok(self.normalize_outcomes(&outcomes))
    }

    fn normalize_outcomes(&self, outcomes: &[PairOutcome]) -> Vec<Flight> {
        let chosen = self.token_policy.choose(outcomes);

        outcomes
            .iter()
            .filter(|outcome| !outcome.result.is_empty())
            .flat_map(|outcome| {
                let token = self.token_policy.token_for(chosen.as_deref(), outcome);
                self.normalizer
                    .normalize_all(&outcome.result.itineraries, token)
            })
            .collect()
    }
}
