use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::evaluate::run_cycle;
use crate::error::AppError;
use crate::observability::metrics::Metrics;
use crate::state::AppState;

/// A watcher's live proximity subscription. Owns the watch on the open
/// request collection and the watch on the watcher's own profile; both are
/// torn down together on `stop`.
pub struct ProximitySubscription {
    watcher_id: Uuid,
    cancelled: Arc<AtomicBool>,
    metrics: Metrics,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ProximitySubscription {
    pub fn new(watcher_id: Uuid, metrics: Metrics) -> Self {
        Self {
            watcher_id,
            cancelled: Arc::new(AtomicBool::new(false)),
            metrics,
            task: Mutex::new(None),
        }
    }

    pub fn watcher_id(&self) -> Uuid {
        self.watcher_id
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .expect("subscription task lock poisoned")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Idempotent: calling `start` on a running subscription is a no-op,
    /// never a second set of watches.
    pub fn start(&self, state: Arc<AppState>) -> Result<(), AppError> {
        let mut task = self.task.lock().expect("subscription task lock poisoned");

        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        let opted_in = state
            .profiles
            .get(&self.watcher_id)
            .ok_or_else(|| AppError::NotFound(format!("profile {} not found", self.watcher_id)))?
            .is_hitchhiker;

        self.cancelled.store(false, Ordering::SeqCst);
        let handle = tokio::spawn(run_subscription(
            state,
            self.watcher_id,
            opted_in,
            self.cancelled.clone(),
        ));
        *task = Some(handle);
        self.metrics.active_subscriptions.inc();

        Ok(())
    }

    /// Synchronously stops further callbacks. An in-flight position or
    /// store read that completes afterwards is discarded by the cycle.
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);

        let mut task = self.task.lock().expect("subscription task lock poisoned");
        if let Some(handle) = task.take() {
            handle.abort();
            self.metrics.active_subscriptions.dec();
        }
    }
}

impl Drop for ProximitySubscription {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
                self.metrics.active_subscriptions.dec();
            }
        }
    }
}

async fn run_subscription(
    state: Arc<AppState>,
    watcher_id: Uuid,
    mut opted_in: bool,
    cancelled: Arc<AtomicBool>,
) {
    let mut request_events = state.request_events_tx.subscribe();
    let mut profile_events = state.profile_events_tx.subscribe();
    let mut alerted: HashSet<Uuid> = HashSet::new();

    info!(%watcher_id, opted_in, "proximity subscription started");

    // the live watch delivers the current snapshot on attach
    if opted_in {
        guarded_cycle(&state, watcher_id, &mut alerted, &cancelled).await;
    }

    loop {
        tokio::select! {
            event = request_events.recv() => match event {
                Ok(_) => {
                    // coalesce bursts of store events into one cycle
                    while request_events.try_recv().is_ok() {}

                    if opted_in {
                        guarded_cycle(&state, watcher_id, &mut alerted, &cancelled).await;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%watcher_id, skipped, "request watch lagged; evaluating current snapshot");
                    if opted_in {
                        guarded_cycle(&state, watcher_id, &mut alerted, &cancelled).await;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            event = profile_events.recv() => match event {
                Ok(id) if id == watcher_id => {
                    let now_opted_in = state
                        .profiles
                        .get(&watcher_id)
                        .map(|profile| profile.is_hitchhiker)
                        .unwrap_or(false);

                    if now_opted_in && !opted_in {
                        info!(%watcher_id, "watcher opted in; evaluating current snapshot");
                        opted_in = true;
                        guarded_cycle(&state, watcher_id, &mut alerted, &cancelled).await;
                    } else {
                        opted_in = now_opted_in;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {
                    opted_in = state
                        .profiles
                        .get(&watcher_id)
                        .map(|profile| profile.is_hitchhiker)
                        .unwrap_or(false);
                }
                Err(RecvError::Closed) => break,
            },
        }

        if cancelled.load(Ordering::SeqCst) {
            break;
        }
    }

    info!(%watcher_id, "proximity subscription stopped");
}

/// Runs one cycle under the failure policy: a geolocation error is logged
/// and the cycle skipped; the next store event triggers another attempt.
async fn guarded_cycle(
    state: &AppState,
    watcher_id: Uuid,
    alerted: &mut HashSet<Uuid>,
    cancelled: &AtomicBool,
) {
    let start = Instant::now();

    match run_cycle(state, watcher_id, alerted, cancelled).await {
        Ok(emitted) => {
            let elapsed = start.elapsed().as_secs_f64();
            state
                .metrics
                .evaluation_latency_seconds
                .with_label_values(&["success"])
                .observe(elapsed);
            state
                .metrics
                .evaluation_cycles_total
                .with_label_values(&["success"])
                .inc();

            if emitted > 0 {
                info!(%watcher_id, emitted, "evaluation cycle emitted alerts");
            }
        }
        Err(err) => {
            let elapsed = start.elapsed().as_secs_f64();
            state
                .metrics
                .evaluation_latency_seconds
                .with_label_values(&["skipped"])
                .observe(elapsed);
            state
                .metrics
                .evaluation_cycles_total
                .with_label_values(&["skipped"])
                .inc();
            warn!(%watcher_id, error = %err, "evaluation cycle skipped");
        }
    }
}
