//! Notification sinks
//!
//! Notifications are sent after a transfer has committed. A failing sink never
//! affects the money movement that triggered it.

use crate::core::traits::NotificationSink;
use crate::types::ClientId;
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

/// Message for a client's inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: ClientId,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification to {recipient} failed: {reason}")]
pub struct NotificationError {
    pub recipient: ClientId,
    pub reason: String,
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Keeps notifications per recipient in memory
#[derive(Debug, Default)]
pub struct InboxNotifier {
    inboxes: DashMap<ClientId, Vec<Notification>>,
}

impl InboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received by a client, oldest first
    pub fn inbox(&self, recipient: &ClientId) -> Vec<Notification> {
        self.inboxes
            .get(recipient)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for InboxNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        self.inboxes
            .entry(notification.recipient.clone())
            .or_default()
            .push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_collects_per_recipient() {
        let inbox = InboxNotifier::new();
        let alice = ClientId::new("1111222233334444");
        inbox
            .notify(Notification {
                recipient: alice.clone(),
                subject: "Money Received".to_string(),
                body: "first".to_string(),
            })
            .unwrap();
        inbox
            .notify(Notification {
                recipient: alice.clone(),
                subject: "Money Received".to_string(),
                body: "second".to_string(),
            })
            .unwrap();

        let messages = inbox.inbox(&alice);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].body, "second");
        assert!(inbox.inbox(&ClientId::new("0")).is_empty());
    }

    #[test]
    fn test_tracing_notifier_accepts_everything() {
        let result = TracingNotifier.notify(Notification {
            recipient: ClientId::new("1"),
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        assert!(result.is_ok());
    }
}
