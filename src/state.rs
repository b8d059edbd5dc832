use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::subscription::ProximitySubscription;
use crate::error::AppError;
use crate::models::alert::ProximityAlert;
use crate::models::itinerary::FlightItinerary;
use crate::models::profile::UserProfile;
use crate::models::request::{HitchhikeRequest, RequestEvent};
use crate::notify::NotificationSink;
use crate::observability::metrics::Metrics;
use crate::sensor::{GeoOptions, LocationSensor, ProfileLocationSensor};

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub threshold_km: f64,
    pub geo: GeoOptions,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threshold_km: config.threshold_km,
            geo: GeoOptions {
                high_accuracy: true,
                timeout: config.geo_timeout,
                max_age: config.geo_max_age,
            },
        }
    }
}

/// In-memory stand-in for the backing document store, plus the live-watch
/// channels subscriptions attach to. Documents are owned here; the engine
/// only borrows snapshots for the duration of one evaluation cycle.
pub struct AppState {
    pub profiles: Arc<DashMap<Uuid, UserProfile>>,
    pub requests: DashMap<Uuid, HitchhikeRequest>,
    pub itineraries: DashMap<Uuid, FlightItinerary>,
    pub subscriptions: DashMap<Uuid, ProximitySubscription>,
    pub request_events_tx: broadcast::Sender<RequestEvent>,
    pub profile_events_tx: broadcast::Sender<Uuid>,
    pub alert_events_tx: broadcast::Sender<ProximityAlert>,
    pub sensor: Arc<dyn LocationSensor>,
    pub sink: Arc<dyn NotificationSink>,
    pub settings: EngineSettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        settings: EngineSettings,
        event_buffer_size: usize,
        profiles: Arc<DashMap<Uuid, UserProfile>>,
        sensor: Arc<dyn LocationSensor>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (request_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let (profile_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let (alert_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            profiles,
            requests: DashMap::new(),
            itineraries: DashMap::new(),
            subscriptions: DashMap::new(),
            request_events_tx,
            profile_events_tx,
            alert_events_tx,
            sensor,
            sink,
            settings,
            metrics: Metrics::new(),
        }
    }

    /// Wires the default profile-backed sensor over a fresh profile map.
    pub fn with_profile_sensor(
        settings: EngineSettings,
        event_buffer_size: usize,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let profiles = Arc::new(DashMap::new());
        let sensor = Arc::new(ProfileLocationSensor::new(profiles.clone()));
        Self::new(settings, event_buffer_size, profiles, sensor, sink)
    }

    pub fn open_request(&self, request: HitchhikeRequest) {
        self.requests.insert(request.id, request.clone());
        self.metrics.open_requests.set(self.requests.len() as i64);
        let _ = self.request_events_tx.send(RequestEvent::Opened(request.id));
    }

    pub fn withdraw_request(&self, id: Uuid) -> Result<HitchhikeRequest, AppError> {
        let (_, request) = self
            .requests
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

        self.metrics.open_requests.set(self.requests.len() as i64);
        let _ = self.request_events_tx.send(RequestEvent::Withdrawn(id));
        Ok(request)
    }

    pub fn profile_changed(&self, id: Uuid) {
        let _ = self.profile_events_tx.send(id);
    }
}
