use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::profile::Coordinate;

/// An open request for a ride. Never mutated after creation; it either
/// stays open or is withdrawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitchhikeRequest {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub rider_name: String,
    pub current_location: Coordinate,
    pub destination: String,
    pub created_at: DateTime<Utc>,
}

/// Change observed on the open-requests collection. Subscriptions only use
/// these as evaluation triggers; each cycle works on a fresh snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestEvent {
    Opened(Uuid),
    Withdrawn(Uuid),
}
