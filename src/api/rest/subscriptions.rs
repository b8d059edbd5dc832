use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::post;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::subscription::ProximitySubscription;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/subscriptions/:watcher_id",
        post(start_subscription).delete(stop_subscription),
    )
}

#[derive(Serialize)]
pub struct SubscriptionResponse {
    pub watcher_id: Uuid,
    pub running: bool,
}

/// Re-posting for an already-subscribed watcher is a no-op, matching the
/// idempotent `start` of the subscription itself.
async fn start_subscription(
    State(state): State<Arc<AppState>>,
    Path(watcher_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    if !state.profiles.contains_key(&watcher_id) {
        return Err(AppError::NotFound(format!("profile {watcher_id} not found")));
    }

    let subscription = state
        .subscriptions
        .entry(watcher_id)
        .or_insert_with(|| ProximitySubscription::new(watcher_id, state.metrics.clone()));
    subscription.start(state.clone())?;
    let running = subscription.is_running();
    drop(subscription);

    Ok(Json(SubscriptionResponse { watcher_id, running }))
}

async fn stop_subscription(
    State(state): State<Arc<AppState>>,
    Path(watcher_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let (_, subscription) = state
        .subscriptions
        .remove(&watcher_id)
        .ok_or_else(|| AppError::NotFound(format!("no subscription for watcher {watcher_id}")))?;

    subscription.stop();

    Ok(Json(SubscriptionResponse {
        watcher_id,
        running: false,
    }))
}
