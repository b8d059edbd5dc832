use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::profile::{Coordinate, UserProfile};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/:id", get(get_profile))
        .route("/profiles/:id/location", patch(update_location))
        .route("/profiles/:id/hitchhiker", patch(update_hitchhiker_flag))
}

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub display_name: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub is_hitchhiker: bool,
    pub location: Option<Coordinate>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: Coordinate,
}

#[derive(Deserialize)]
pub struct UpdateHitchhikerRequest {
    pub is_hitchhiker: bool,
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    if payload.display_name.trim().is_empty() {
        return Err(AppError::BadRequest("display_name cannot be empty".to_string()));
    }

    if let Some(location) = &payload.location {
        location.validate()?;
    }

    let profile = UserProfile {
        id: Uuid::new_v4(),
        display_name: payload.display_name,
        bio: payload.bio,
        is_hitchhiker: payload.is_hitchhiker,
        location: payload.location,
        updated_at: Utc::now(),
    };

    state.profiles.insert(profile.id, profile.clone());
    state.profile_changed(profile.id);

    Ok(Json(profile))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .profiles
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("profile {id} not found")))?;

    Ok(Json(profile.clone()))
}

/// Where the device reports its position. The profile-backed sensor reads
/// this back on the next evaluation cycle.
async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<UserProfile>, AppError> {
    payload.location.validate()?;

    let mut profile = state
        .profiles
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("profile {id} not found")))?;

    profile.location = Some(payload.location);
    profile.updated_at = Utc::now();

    let updated = profile.clone();
    drop(profile);
    state.profile_changed(id);

    Ok(Json(updated))
}

async fn update_hitchhiker_flag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateHitchhikerRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let mut profile = state
        .profiles
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("profile {id} not found")))?;

    profile.is_hitchhiker = payload.is_hitchhiker;
    profile.updated_at = Utc::now();

    let updated = profile.clone();
    drop(profile);
    state.profile_changed(id);

    Ok(Json(updated))
}
