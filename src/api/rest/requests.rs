use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{delete, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::profile::Coordinate;
use crate::models::request::HitchhikeRequest;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/:id", delete(withdraw_request))
}

#[derive(Deserialize)]
pub struct CreateRequestRequest {
    pub rider_id: Uuid,
    pub current_location: Coordinate,
    pub destination: String,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRequestRequest>,
) -> Result<Json<HitchhikeRequest>, AppError> {
    if payload.destination.trim().is_empty() {
        return Err(AppError::BadRequest("destination cannot be empty".to_string()));
    }

    payload.current_location.validate()?;

    let rider_name = state
        .profiles
        .get(&payload.rider_id)
        .ok_or_else(|| AppError::NotFound(format!("profile {} not found", payload.rider_id)))?
        .display_name
        .clone();

    let request = HitchhikeRequest {
        id: Uuid::new_v4(),
        rider_id: payload.rider_id,
        rider_name,
        current_location: payload.current_location,
        destination: payload.destination,
        created_at: Utc::now(),
    };

    state.open_request(request.clone());

    Ok(Json(request))
}

async fn list_requests(State(state): State<Arc<AppState>>) -> Json<Vec<HitchhikeRequest>> {
    let requests = state
        .requests
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(requests)
}

async fn withdraw_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HitchhikeRequest>, AppError> {
    let request = state.withdraw_request(id)?;
    Ok(Json(request))
}
