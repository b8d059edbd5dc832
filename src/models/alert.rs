use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ephemeral alert event. Not persisted; flows to the notification sink
/// and out over the websocket stream, then is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityAlert {
    pub watcher_id: Uuid,
    pub request_id: Uuid,
    pub rider_name: String,
    pub destination: String,
    pub distance_km: f64,
    pub emitted_at: DateTime<Utc>,
}
