//! Asynchronous notification fan-out
//!
//! Writers publish an event and move on. A single background consumer
//! resolves who should be told and hands each notification to a sink.
//! Delivery is best effort: lost or failed events are logged, never retried.

mod consumer;
mod event;
mod publisher;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use consumer::{LogSink, NotificationConsumer, NotificationSink};
pub use event::{NotificationEvent, NotificationType};
#[cfg(test)]
pub use publisher::MockNotificationPublisher;
pub use publisher::{DisabledPublisher, NotificationPublisher, QueuePublisher};

use crate::data::RecipientRepository;

/// Wire a queue publisher to a freshly spawned consumer task.
///
/// The task ends once the returned publisher and all its clones are dropped.
pub fn spawn_notification_consumer(
    recipients: Arc<dyn RecipientRepository>,
    sink: Arc<dyn NotificationSink>,
) -> (Arc<QueuePublisher>, JoinHandle<()>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let consumer = NotificationConsumer::new(recipients, sink);
    let handle = tokio::spawn(consumer.run(receiver));
    (Arc::new(QueuePublisher::new(sender)), handle)
}
