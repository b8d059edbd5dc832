use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Geographic position in degrees. Latitude [-90, 90], longitude [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(AppError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            });
        }

        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(AppError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub bio: Option<String>,
    /// Opt-in flag for proximity alerts. Gates the whole subscription.
    pub is_hitchhiker: bool,
    /// Last position reported by the device, if any.
    pub location: Option<Coordinate>,
    pub updated_at: DateTime<Utc>,
}
