use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::engine::matcher::match_field;
use crate::error::AppError;
use crate::models::itinerary::FlightItinerary;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/itineraries", post(create_itinerary).get(list_itineraries))
        .route("/itineraries/match", get(match_itineraries))
}

#[derive(Deserialize)]
pub struct CreateItineraryRequest {
    pub user_id: Uuid,
    pub flight_number: String,
    pub departure_city: String,
    pub arrival_airport: String,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct MatchQuery {
    pub field: String,
    pub value: String,
}

async fn create_itinerary(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateItineraryRequest>,
) -> Result<Json<FlightItinerary>, AppError> {
    if payload.arrival_airport.trim().is_empty() {
        return Err(AppError::BadRequest("arrival_airport cannot be empty".to_string()));
    }

    let user_name = state
        .profiles
        .get(&payload.user_id)
        .ok_or_else(|| AppError::NotFound(format!("profile {} not found", payload.user_id)))?
        .display_name
        .clone();

    let itinerary = FlightItinerary {
        id: Uuid::new_v4(),
        user_id: payload.user_id,
        user_name,
        flight_number: payload.flight_number,
        departure_city: payload.departure_city,
        arrival_airport: payload.arrival_airport,
        arrival_time: payload.arrival_time,
        created_at: Utc::now(),
    };

    state.itineraries.insert(itinerary.id, itinerary.clone());

    Ok(Json(itinerary))
}

async fn list_itineraries(State(state): State<Arc<AppState>>) -> Json<Vec<FlightItinerary>> {
    let itineraries = state
        .itineraries
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(itineraries)
}

/// "People arriving at X": exact-match filter over itinerary documents on
/// the named field, e.g. `?field=arrival_airport&value=JFK`.
async fn match_itineraries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    if query.field.trim().is_empty() {
        return Err(AppError::BadRequest("field cannot be empty".to_string()));
    }

    let records: Vec<Value> = state
        .itineraries
        .iter()
        .map(|entry| {
            serde_json::to_value(entry.value())
                .map_err(|err| AppError::Internal(format!("failed to serialize itinerary: {err}")))
        })
        .collect::<Result<_, _>>()?;

    let matched = match_field(&records, &query.field, &Value::String(query.value));

    Ok(Json(matched))
}
