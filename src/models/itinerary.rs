use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A filed flight itinerary, matched against by arrival airport or
/// departure city on the "people arriving at X" read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightItinerary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub flight_number: String,
    pub departure_city: String,
    pub arrival_airport: String,
    pub arrival_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
