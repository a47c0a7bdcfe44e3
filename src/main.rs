//! CLI interface for sky-flights

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sky_flights::{map_routes, FlightService, ProviderConfig, SearchRequest};
use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sky-flights")]
#[command(about = "Aggregated flight search over the Sky Scrapper API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search flights between two cities
    Search {
        /// Origin city or airport
        #[arg(short, long)]
        from: String,
        /// Destination city or airport
        #[arg(short, long)]
        to: String,
        /// Departure date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Return date for round trips (YYYY-MM-DD)
        #[arg(short, long)]
        return_date: Option<String>,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Fetch segment-level details for a flight from a previous search
    Details {
        /// Itinerary id of the flight
        #[arg(short, long)]
        id: String,
        /// Session token returned with the flight
        #[arg(short, long)]
        session: String,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Autocomplete airports for a query
    Airports {
        /// City or airport text, at least two characters
        #[arg(short, long)]
        query: String,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn emit<T: Serialize>(value: &T, output: Option<String>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(output_file) = output {
        fs::write(&output_file, &json).with_context(|| format!("failed to write {}", output_file))?;
        println!("Results saved to {}", output_file);
    } else {
        println!("{}", json);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ProviderConfig::from_env()?;
    let service = FlightService::new(config)?;

    match cli.command {
        Commands::Search {
            from,
            to,
            date,
            return_date,
            output,
        } => {
            let request = SearchRequest {
                origin: from,
                destination: to,
                date,
                return_date,
            };

            eprintln!("Searching for flights...");
            let result = service.search(&request).await?;
            emit(&result, output)?;

            eprintln!("\nSummary:");
            eprintln!("Found {} outbound flights", result.outbound.len());
            if request.return_date.is_some() {
                eprintln!("Found {} return flights", result.return_flights.len());
            }
            if let Some(first) = result.outbound.first() {
                eprintln!("First outbound: {} - {}", first.airline.name, first.price.total);
            }
            eprintln!("{} flights can be drawn on a map", map_routes(&result.outbound).len());
        }
        Commands::Details { id, session, output } => {
            let detail = service.flight_details(&id, &session).await?;
            emit(&detail, output)?;
        }
        Commands::Airports { query } => {
            let suggestions = service.suggest_airports(&query).await?;
            emit(&suggestions, None)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
