//! Basic flight search example
//!
//! Run with `RAPIDAPI_KEY=... cargo run --example basic_search`.

use sky_flights::{FlightService, ProviderConfig, SearchRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let service = FlightService::new(ProviderConfig::from_env()?)?;

    for suggestion in service.suggest_airports("Istanbul").await? {
        println!("{} - {}", suggestion.code, suggestion.name);
    }

    let request = SearchRequest::round_trip("Istanbul", "Ankara", "2025-08-15", "2025-08-22");
    println!("Searching for flights from Istanbul to Ankara...");

    match service.search(&request).await {
        Ok(result) => {
            println!("✅ Search completed successfully!");
            println!("Found {} outbound and {} return flights", result.outbound.len(), result.return_flights.len());

            for (i, flight) in result.outbound.iter().take(3).enumerate() {
                println!("\n--- Flight {} ---", i + 1);
                println!("Airline: {}", flight.airline.name);
                println!("Departure: {} {} ({})", flight.departure.date, flight.departure.time, flight.departure.code);
                println!("Arrival: {} {} ({})", flight.arrival.date, flight.arrival.time, flight.arrival.code);
                println!("Duration: {}", flight.duration);
                println!("Stops: {}", flight.stops);
                println!("Price: {}", flight.price.total);
            }

            if let Some(first) = result.outbound.first() {
                if let Some(token) = &first.session_token {
                    let detail = service.flight_details(&first.id, token).await?;
                    println!("\nFirst flight has {} segment(s)", detail.segments.len());
                    for segment in &detail.segments {
                        println!(
                            "  {} {} -> {} ({})",
                            segment.flight_number.as_deref().unwrap_or("?"),
                            segment.departure.code,
                            segment.arrival.code,
                            segment.duration
                        );
                    }
                }
            }
        }
        Err(e) => {
            println!("❌ Search failed: {}", e);
        }
    }

    Ok(())
}
