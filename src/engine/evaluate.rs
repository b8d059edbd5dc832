use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::distance_km;
use crate::models::alert::ProximityAlert;
use crate::models::request::HitchhikeRequest;
use crate::state::AppState;

/// One evaluation cycle: a single position read, then a pass over the full
/// current request snapshot. Returns the number of alerts emitted.
///
/// `alerted` is the per-session set of request ids already notified; a
/// request alerts at most once per subscription session. Ids are pruned
/// once the request leaves the store, so the set stays bounded by the
/// number of open requests.
pub async fn run_cycle(
    state: &AppState,
    watcher_id: Uuid,
    alerted: &mut HashSet<Uuid>,
    cancelled: &AtomicBool,
) -> Result<usize, AppError> {
    let position = timeout(
        state.settings.geo.timeout,
        state.sensor.current_position(watcher_id, &state.settings.geo),
    )
    .await
    .map_err(|_| {
        AppError::GeolocationUnavailable(format!(
            "position read timed out after {:?}",
            state.settings.geo.timeout
        ))
    })??;

    // a read that completes after cancellation must not produce alerts
    if cancelled.load(Ordering::SeqCst) {
        return Ok(0);
    }

    let snapshot: Vec<HitchhikeRequest> = state
        .requests
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    let mut emitted = 0;

    for request in &snapshot {
        let distance = match distance_km(&position, &request.current_location) {
            Ok(distance) => distance,
            Err(err) => {
                warn!(request_id = %request.id, error = %err, "skipping request with invalid location");
                continue;
            }
        };

        if distance < state.settings.threshold_km && alerted.insert(request.id) {
            let alert = ProximityAlert {
                watcher_id,
                request_id: request.id,
                rider_name: request.rider_name.clone(),
                destination: request.destination.clone(),
                distance_km: distance,
                emitted_at: Utc::now(),
            };

            state.sink.notify(
                "Hitchhike Request",
                &format!("{} needs a ride to {}", request.rider_name, request.destination),
            );
            let _ = state.alert_events_tx.send(alert);
            state.metrics.alerts_emitted_total.inc();
            emitted += 1;
        }
    }

    alerted.retain(|id| state.requests.contains_key(id));

    Ok(emitted)
}
