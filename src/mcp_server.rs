// src/mcp_server.rs

use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use sky_flights::{map_routes, Flight, FlightService, MapRoute, ProviderConfig, SearchRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flight search MCP server
#[derive(Clone)]
pub struct FlightServer {
    service: Arc<FlightService>,
}

impl FlightServer {
    pub fn new(service: FlightService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Initialize logging to file; stdout carries the protocol
    fn init_logging() -> Result<()> {
        let log_dir = PathBuf::from("logs");
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "sky-flights-mcp.log");

        tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info"))
                    .add_directive("sky_flights=debug".parse()?),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .init();

        info!("Logging initialized - logs will be written to logs/sky-flights-mcp.log.*");
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct FlightSearchParams {
    #[schemars(description = "Origin city or airport name (e.g., Istanbul)")]
    pub origin: String,
    #[schemars(description = "Destination city or airport name (e.g., Ankara)")]
    pub destination: String,
    #[schemars(description = "Departure date in YYYY-MM-DD format")]
    pub departure_date: String,
    #[schemars(description = "Return date in YYYY-MM-DD format for round trips")]
    pub return_date: Option<String>,
    #[schemars(description = "Maximum number of flights to return per direction (default: 30)")]
    pub max_flights: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct FlightDetailsParams {
    #[schemars(description = "Flight id from a search_flights result")]
    pub flight_id: String,
    #[schemars(description = "sessionToken from the same search_flights result")]
    pub session_token: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct AirportSearchParams {
    #[schemars(description = "City or airport text, at least two characters")]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct FlightSearchResult {
    pub total_flights: usize,
    pub outbound: Vec<Flight>,
    #[serde(rename = "return")]
    pub return_flights: Vec<Flight>,
    pub map_routes: Vec<MapRoute>,
}

fn error_json(message: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| error_json(format!("Failed to serialize results: {}", e)))
}

#[tool(tool_box)]
impl FlightServer {
    #[tool(description = "Search flights between two cities. Every airport of the origin city is searched against every airport of the destination city; pass return_date for a round trip.")]
    async fn search_flights(&self, #[tool(aggr)] params: FlightSearchParams) -> String {
        info!(
            origin = params.origin,
            destination = params.destination,
            departure_date = params.departure_date,
            return_date = params.return_date.as_deref(),
            "Flight search request received"
        );

        let request = SearchRequest {
            origin: params.origin,
            destination: params.destination,
            date: params.departure_date,
            return_date: params.return_date,
        };

        match self.service.search(&request).await {
            Ok(result) => {
                let limit = params.max_flights.unwrap_or(30);
                let outbound: Vec<Flight> = result.outbound.into_iter().take(limit).collect();
                let return_flights: Vec<Flight> = result.return_flights.into_iter().take(limit).collect();
                let map_routes = map_routes(&outbound);

                info!(
                    outbound = outbound.len(),
                    return_flights = return_flights.len(),
                    "Flight search completed successfully"
                );

                to_json(&FlightSearchResult {
                    total_flights: outbound.len() + return_flights.len(),
                    outbound,
                    return_flights,
                    map_routes,
                })
            }
            Err(e) => {
                error!("Flight search failed: {}", e);
                error_json(format!("Flight search failed: {}", e))
            }
        }
    }

    #[tool(description = "Get segment-level details, baggage and amenities for a flight returned by search_flights.")]
    async fn get_flight_details(&self, #[tool(aggr)] params: FlightDetailsParams) -> String {
        info!(flight_id = params.flight_id, "Flight details request received");

        match self
            .service
            .flight_details(&params.flight_id, &params.session_token)
            .await
        {
            Ok(detail) => {
                debug!(segments = detail.segments.len(), "Flight details fetched");
                to_json(&detail)
            }
            Err(e) => {
                error!("Flight details failed: {}", e);
                error_json(e)
            }
        }
    }

    #[tool(description = "Autocomplete airports for a city or airport name. Returns code and display name pairs.")]
    async fn search_airports(&self, #[tool(aggr)] params: AirportSearchParams) -> String {
        if params.query.trim().chars().count() < 2 {
            warn!(query = params.query, "Airport query too short");
        }

        match self.service.suggest_airports(&params.query).await {
            Ok(suggestions) => to_json(&suggestions),
            Err(e) => {
                error!("Airport search failed: {}", e);
                error_json(format!("Airport search failed: {}", e))
            }
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for FlightServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("A flight search server over the Sky Scrapper API. search_flights aggregates every airport pair between two cities and returns normalized flights with a session token; pass that token to get_flight_details. search_airports autocompletes airport names.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = FlightServer::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting MCP Flight Server");

    let config = ProviderConfig::from_env().map_err(|e| {
        error!("Invalid provider configuration: {}", e);
        e
    })?;
    debug!(config = ?config, "Loaded provider configuration");

    let server = FlightServer::new(FlightService::new(config)?);
    let transport = stdio();

    let service = server.serve(transport).await?;
    info!("MCP service started, waiting for requests");

    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}
