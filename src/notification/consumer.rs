use std::sync::Arc;

use tokio::sync::mpsc;

use super::event::{NotificationEvent, NotificationType};
use crate::data::RecipientRepository;
use crate::error::Result;
use crate::metrics::NOTIFICATIONS_HANDLED_TOTAL;

/// Final destination of a resolved notification
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, recipient: &str, event: &NotificationEvent);
}

/// Writes each notification to the log
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, recipient: &str, event: &NotificationEvent) {
        tracing::info!(
            recipient,
            event = event.kind.as_str(),
            id = %event.id,
            "notification delivered"
        );
    }
}

/// Drains the notification queue one message at a time.
///
/// Malformed messages and lookup failures are logged and dropped; nothing is
/// retried and nothing flows back to the writer that published the event.
pub struct NotificationConsumer {
    recipients: Arc<dyn RecipientRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationConsumer {
    pub fn new(recipients: Arc<dyn RecipientRepository>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { recipients, sink }
    }

    /// Process messages in arrival order until every sender is dropped
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<String>) {
        tracing::info!("Notification consumer started");
        while let Some(message) = receiver.recv().await {
            self.handle_message(&message).await;
        }
        tracing::info!("Notification consumer stopped");
    }

    pub async fn handle_message(&self, raw: &str) {
        match serde_json::from_str::<NotificationEvent>(raw) {
            Ok(event) => self.handle_event(&event).await,
            Err(error) => {
                tracing::warn!(%error, message = raw, "dropping malformed notification");
                NOTIFICATIONS_HANDLED_TOTAL
                    .with_label_values(&["unknown", "malformed"])
                    .inc();
            }
        }
    }

    pub async fn handle_event(&self, event: &NotificationEvent) {
        let label = event.kind.as_str();

        let recipients = match self.resolve_recipients(event).await {
            Ok(recipients) => recipients,
            Err(error) => {
                tracing::warn!(%error, event = label, id = %event.id, "failed to resolve notification recipients");
                NOTIFICATIONS_HANDLED_TOTAL
                    .with_label_values(&[label, "failed"])
                    .inc();
                return;
            }
        };

        if recipients.is_empty() {
            tracing::debug!(event = label, id = %event.id, "notification has no recipients");
        }
        for recipient in &recipients {
            self.sink.deliver(recipient, event);
        }

        NOTIFICATIONS_HANDLED_TOTAL
            .with_label_values(&[label, "delivered"])
            .inc();
    }

    /// Emails of the active accounts that should hear about `event`
    pub async fn resolve_recipients(&self, event: &NotificationEvent) -> Result<Vec<String>> {
        let id = event.id.as_str();
        match event.kind {
            NotificationType::Post => self.recipients.post_author_follower_emails(id).await,
            NotificationType::Comment => self.recipients.comment_recipient_emails(id).await,
            NotificationType::Interaction => Ok(self
                .recipients
                .interaction_recipient_email(id)
                .await?
                .into_iter()
                .collect()),
            NotificationType::FollowAccount => {
                Ok(self.recipients.account_email(id).await?.into_iter().collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::data::MockRecipientRepository;
    use crate::error::AppError;

    /// Records deliveries for assertions
    #[derive(Default)]
    struct CollectingSink {
        delivered: Mutex<Vec<(String, NotificationEvent)>>,
    }

    impl CollectingSink {
        fn recipients(&self) -> Vec<String> {
            self.delivered
                .lock()
                .unwrap()
                .iter()
                .map(|(recipient, _)| recipient.clone())
                .collect()
        }
    }

    impl NotificationSink for CollectingSink {
        fn deliver(&self, recipient: &str, event: &NotificationEvent) {
            self.delivered
                .lock()
                .unwrap()
                .push((recipient.to_string(), event.clone()));
        }
    }

    fn consumer_with(repo: MockRecipientRepository) -> (NotificationConsumer, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        let consumer = NotificationConsumer::new(Arc::new(repo), sink.clone());
        (consumer, sink)
    }

    #[tokio::test]
    async fn interaction_resolves_target_owner() {
        let mut repo = MockRecipientRepository::new();
        repo.expect_interaction_recipient_email()
            .withf(|id| id == "i1")
            .times(1)
            .returning(|_| Ok(Some("u2@example.com".to_string())));
        let (consumer, sink) = consumer_with(repo);

        consumer
            .handle_message(r#"{"type":"Interaction","id":"i1"}"#)
            .await;

        assert_eq!(sink.recipients(), vec!["u2@example.com"]);
    }

    #[tokio::test]
    async fn post_fans_out_to_followers() {
        let mut repo = MockRecipientRepository::new();
        repo.expect_post_author_follower_emails()
            .returning(|_| Ok(vec!["a@example.com".to_string(), "b@example.com".to_string()]));
        let (consumer, sink) = consumer_with(repo);

        consumer.handle_event(&NotificationEvent::post("p1")).await;

        assert_eq!(sink.recipients(), vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn follow_of_deleted_account_delivers_nothing() {
        let mut repo = MockRecipientRepository::new();
        repo.expect_account_email().returning(|_| Ok(None));
        let (consumer, sink) = consumer_with(repo);

        consumer
            .handle_event(&NotificationEvent::follow_account("gone"))
            .await;

        assert!(sink.recipients().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_is_swallowed() {
        let mut repo = MockRecipientRepository::new();
        repo.expect_comment_recipient_emails()
            .returning(|_| Err(AppError::Internal(anyhow::anyhow!("database unavailable"))));
        let (consumer, sink) = consumer_with(repo);

        consumer.handle_event(&NotificationEvent::comment("c1")).await;

        assert!(sink.recipients().is_empty());
    }

    #[tokio::test]
    async fn malformed_message_is_dropped() {
        // No expectations: any repository call would panic
        let (consumer, sink) = consumer_with(MockRecipientRepository::new());

        consumer.handle_message("not json").await;
        consumer.handle_message(r#"{"type":"Unknown","id":"x"}"#).await;

        assert!(sink.recipients().is_empty());
    }

    #[tokio::test]
    async fn run_stops_when_senders_drop() {
        let mut repo = MockRecipientRepository::new();
        repo.expect_account_email()
            .returning(|id| Ok(Some(format!("{id}@example.com"))));
        let (consumer, sink) = consumer_with(repo);

        let (sender, receiver) = mpsc::unbounded_channel();
        sender
            .send(r#"{"type":"FollowAccount","id":"first"}"#.to_string())
            .unwrap();
        sender
            .send(r#"{"type":"FollowAccount","id":"second"}"#.to_string())
            .unwrap();
        drop(sender);

        consumer.run(receiver).await;

        assert_eq!(
            sink.recipients(),
            vec!["first@example.com", "second@example.com"]
        );
    }
}
