use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

/// Rendered document attached to a notification, e.g. the approval letter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    pub fn new(
        recipients: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self { recipients, subject: subject.into(), body: body.into(), attachment: None }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),
    #[error("invalid recipient address `{0}`")]
    Address(String),
}

/// Delivery is all-or-nothing per call and an empty recipient list is a
/// successful no-op. Callers treat failures as best-effort: they log and
/// report them, never propagate them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Outcome of a best-effort side effect, reported alongside (never inside)
/// the primary operation's result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SideEffectStatus {
    Skipped,
    Delivered,
    Failed(String),
}

impl SideEffectStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, SideEffectStatus::Failed(_))
    }
}

/// Test double that records every delivery.
#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if notification.recipients.is_empty() {
            return Ok(());
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}

/// Test double whose every delivery fails, for exercising the
/// swallow-and-log path.
#[derive(Clone, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay unreachable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Attachment, FailingNotifier, InMemoryNotifier, Notification, Notifier};

    #[tokio::test]
    async fn in_memory_notifier_records_deliveries() {
        let notifier = InMemoryNotifier::default();
        notifier
            .send(
                Notification::new(
                    vec!["principal@example.edu".to_string()],
                    "New request",
                    "A new maintenance request was submitted.",
                )
                .with_attachment(Attachment {
                    filename: "RequestLetter.pdf".to_string(),
                    bytes: vec![0x25, 0x50, 0x44, 0x46],
                    mime: "application/pdf".to_string(),
                }),
            )
            .await
            .expect("send");

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec!["principal@example.edu".to_string()]);
        assert!(sent[0].attachment.is_some());
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_no_op() {
        let notifier = InMemoryNotifier::default();
        notifier
            .send(Notification::new(Vec::new(), "subject", "body"))
            .await
            .expect("empty recipients should succeed");

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn failing_notifier_always_errors() {
        let notifier = FailingNotifier;
        let result = notifier
            .send(Notification::new(vec!["hod@example.edu".to_string()], "subject", "body"))
            .await;
        assert!(result.is_err());
    }
}
