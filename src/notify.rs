use tracing::info;

/// Outbound local-notification boundary. The engine hands over a
/// (title, message) pair and never inspects delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Default sink: structured log line per notification. A host application
/// wires in its own transport by implementing `NotificationSink`.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(title, message, "notification delivered");
    }
}
