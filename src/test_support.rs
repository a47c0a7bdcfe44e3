//! In-memory provider used by the unit tests

use crate::client::{DetailQuery, ProviderApi, ProviderResponse, RouteQuery};
use crate::FlightError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct ScriptedProvider {
    pub airports: HashMap<String, ProviderResponse>,
    pub routes: HashMap<(String, String, String), ProviderResponse>,
    pub details: Option<ProviderResponse>,
    pub route_delay: Option<Duration>,
    pub airport_calls: Mutex<Vec<String>>,
    pub route_calls: Mutex<Vec<RouteQuery>>,
    pub detail_calls: Mutex<Vec<DetailQuery>>,
}

impl ScriptedProvider {
    pub fn with_airports(mut self, query: &str, entries: Value) -> Self {
        let body = json!({ "status": true, "data": entries }).to_string();
        self.airports
            .insert(query.to_string(), ProviderResponse::new(200, body));
        self
    }

    pub fn with_route(mut self, origin: &str, destination: &str, date: &str, response: ProviderResponse) -> Self {
        self.routes.insert(
            (origin.to_string(), destination.to_string(), date.to_string()),
            response,
        );
        self
    }

    pub fn with_details(mut self, response: ProviderResponse) -> Self {
        self.details = Some(response);
        self
    }

    pub fn route_call_count(&self) -> usize {
        self.route_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderApi for ScriptedProvider {
    async fn search_airport(&self, query: &str) -> Result<ProviderResponse, FlightError> {
        self.airport_calls.lock().unwrap().push(query.to_string());
        Ok(self
            .airports
            .get(query)
            .cloned()
            .unwrap_or_else(|| ProviderResponse::new(200, json!({ "data": [] }).to_string())))
    }

    async fn search_flights(&self, query: &RouteQuery) -> Result<ProviderResponse, FlightError> {
        self.route_calls.lock().unwrap().push(query.clone());
        if let Some(delay) = self.route_delay {
            tokio::time::sleep(delay).await;
        }
        let key = (
            query.origin_sky_id.clone(),
            query.destination_sky_id.clone(),
            query.date.clone(),
        );
        Ok(self
            .routes
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ProviderResponse::new(200, json!({ "status": false }).to_string())))
    }

    async fn get_flight_details(&self, query: &DetailQuery) -> Result<ProviderResponse, FlightError> {
        self.detail_calls.lock().unwrap().push(query.clone());
        self.details
            .clone()
            .ok_or_else(|| FlightError::Provider {
                status: 404,
                body: "no details scripted".to_string(),
            })
    }
}

pub fn airport_entry(sky_id: &str, entity_id: &str, title: &str, entity_type: &str) -> Value {
    json!({
        "skyId": sky_id,
        "presentation": {
            "title": title,
            "subtitle": "Turkey",
            "suggestionTitle": format!("{} ({})", title, sky_id)
        },
        "navigation": {
            "entityId": entity_id,
            "entityType": entity_type,
            "relevantFlightParams": { "skyId": sky_id, "entityId": entity_id }
        }
    })
}

/// A minimal valid itinerary whose endpoints carry no coordinate fields
pub fn itinerary(id: &str, origin: &str, destination: &str, minutes: u32) -> Value {
    json!({
        "id": id,
        "price": { "formatted": "$120", "raw": 120 },
        "legs": [{
            "origin": { "name": format!("{} Airport", origin), "displayCode": origin, "city": origin },
            "destination": { "name": format!("{} Airport", destination), "displayCode": destination, "city": destination },
            "departure": "2024-06-01T08:30:00",
            "arrival": "2024-06-01T10:05:00",
            "durationInMinutes": minutes,
            "stopCount": 0,
            "carriers": { "marketing": [{ "name": "Turkish Airlines", "logoUrl": "https://logos/tk.png" }] },
            "segments": [{ "flightNumber": "2124" }]
        }],
        "tags": ["cheapest"]
    })
}

pub fn route_response(itineraries: Vec<Value>, session_id: &str) -> ProviderResponse {
    let body = json!({
        "status": true,
        "sessionId": session_id,
        "data": { "itineraries": itineraries }
    });
    ProviderResponse::new(200, body.to_string())
}
