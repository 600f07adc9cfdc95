use tokio::sync::mpsc;

use super::event::NotificationEvent;
use crate::metrics::NOTIFICATIONS_PUBLISHED_TOTAL;

/// Fire-and-forget sink for notification events.
///
/// `publish` never fails the caller and never waits for the event to be
/// handled.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, event: NotificationEvent);
}

/// Publishes JSON-encoded events onto an in-process queue
pub struct QueuePublisher {
    sender: mpsc::UnboundedSender<String>,
}

impl QueuePublisher {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl NotificationPublisher for QueuePublisher {
    fn publish(&self, event: NotificationEvent) {
        let label = event.kind.as_str();

        let message = match serde_json::to_string(&event) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, event = label, id = %event.id, "failed to encode notification");
                NOTIFICATIONS_PUBLISHED_TOTAL
                    .with_label_values(&[label, "error"])
                    .inc();
                return;
            }
        };

        match self.sender.send(message) {
            Ok(()) => {
                tracing::debug!(event = label, id = %event.id, "notification queued");
                NOTIFICATIONS_PUBLISHED_TOTAL
                    .with_label_values(&[label, "queued"])
                    .inc();
            }
            Err(_) => {
                tracing::warn!(event = label, id = %event.id, "notification queue closed, dropping event");
                NOTIFICATIONS_PUBLISHED_TOTAL
                    .with_label_values(&[label, "dropped"])
                    .inc();
            }
        }
    }
}

/// Discards every event. Used when notifications are turned off.
pub struct DisabledPublisher;

impl NotificationPublisher for DisabledPublisher {
    fn publish(&self, event: NotificationEvent) {
        tracing::trace!(event = event.kind.as_str(), id = %event.id, "notifications disabled");
    }
}
