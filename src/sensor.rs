use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::profile::{Coordinate, UserProfile};

/// Parameters for a one-shot position read. Defaults mirror the device
/// settings the app ships with: high accuracy, 20 s timeout, positions
/// cached for up to 1 s are acceptable.
#[derive(Debug, Clone, Copy)]
pub struct GeoOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub max_age: Duration,
}

impl Default for GeoOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(20),
            max_age: Duration::from_secs(1),
        }
    }
}

/// One-shot position source for a watcher. The engine never streams
/// positions; it reads once per evaluation cycle.
#[async_trait]
pub trait LocationSensor: Send + Sync {
    async fn current_position(
        &self,
        watcher_id: Uuid,
        options: &GeoOptions,
    ) -> Result<Coordinate, AppError>;
}

/// Sensor backed by the position the device last reported onto the
/// watcher's profile document.
pub struct ProfileLocationSensor {
    profiles: Arc<DashMap<Uuid, UserProfile>>,
    cache: DashMap<Uuid, (Instant, Coordinate)>,
}

impl ProfileLocationSensor {
    pub fn new(profiles: Arc<DashMap<Uuid, UserProfile>>) -> Self {
        Self {
            profiles,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl LocationSensor for ProfileLocationSensor {
    async fn current_position(
        &self,
        watcher_id: Uuid,
        options: &GeoOptions,
    ) -> Result<Coordinate, AppError> {
        if let Some(cached) = self.cache.get(&watcher_id) {
            let (read_at, position) = *cached;
            if read_at.elapsed() <= options.max_age {
                return Ok(position);
            }
        }

        let position = self
            .profiles
            .get(&watcher_id)
            .ok_or_else(|| {
                AppError::GeolocationUnavailable(format!("no profile for watcher {watcher_id}"))
            })?
            .location
            .ok_or_else(|| {
                AppError::GeolocationUnavailable(format!(
                    "watcher {watcher_id} has not reported a position"
                ))
            })?;

        position.validate()?;
        self.cache.insert(watcher_id, (Instant::now(), position));

        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn profile(id: Uuid, location: Option<Coordinate>) -> UserProfile {
        UserProfile {
            id,
            display_name: "test".to_string(),
            bio: None,
            is_hitchhiker: true,
            location,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reads_position_from_profile() {
        let profiles = Arc::new(DashMap::new());
        let id = Uuid::new_v4();
        let berlin = Coordinate {
            lat: 52.52,
            lon: 13.405,
        };
        profiles.insert(id, profile(id, Some(berlin)));

        let sensor = ProfileLocationSensor::new(profiles);
        let position = sensor
            .current_position(id, &GeoOptions::default())
            .await
            .unwrap();
        assert_eq!(position, berlin);
    }

    #[tokio::test]
    async fn missing_position_is_geolocation_unavailable() {
        let profiles = Arc::new(DashMap::new());
        let id = Uuid::new_v4();
        profiles.insert(id, profile(id, None));

        let sensor = ProfileLocationSensor::new(profiles);
        let err = sensor
            .current_position(id, &GeoOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GeolocationUnavailable(_)));
    }

    #[tokio::test]
    async fn cached_position_survives_profile_update_within_max_age() {
        let profiles = Arc::new(DashMap::new());
        let id = Uuid::new_v4();
        let berlin = Coordinate {
            lat: 52.52,
            lon: 13.405,
        };
        profiles.insert(id, profile(id, Some(berlin)));

        let sensor = ProfileLocationSensor::new(profiles.clone());
        let options = GeoOptions {
            max_age: Duration::from_secs(60),
            ..GeoOptions::default()
        };

        let first = sensor.current_position(id, &options).await.unwrap();
        profiles.get_mut(&id).unwrap().location = Some(Coordinate {
            lat: 48.8566,
            lon: 2.3522,
        });
        let second = sensor.current_position(id, &options).await.unwrap();

        assert_eq!(first, second);
    }
}
