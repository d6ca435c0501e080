//! Email notification delivery via SMTP.
//!
//! Wraps the `lettre` async SMTP transport. When `mail.enabled` is false the
//! notifier accepts every send as a silent no-op, so the workflow can stay
//! oblivious to whether a relay is configured.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use upkeep_core::config::MailConfig;
use upkeep_core::notify::{Notification, Notifier, NotifyError};

pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|_| NotifyError::Address(self.config.from_address.clone()))?;

        let mut builder = Message::builder().from(from).subject(notification.subject.clone());
        for recipient in &notification.recipients {
            let mailbox: Mailbox =
                recipient.parse().map_err(|_| NotifyError::Address(recipient.clone()))?;
            builder = builder.to(mailbox);
        }

        let body_part = if notification.body.trim_start().starts_with('<') {
            SinglePart::html(notification.body.clone())
        } else {
            SinglePart::plain(notification.body.clone())
        };

        match &notification.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.mime)
                    .map_err(|e| NotifyError::Transport(e.to_string()))?;
                builder
                    .multipart(
                        MultiPart::mixed().singlepart(body_part).singlepart(
                            MimeAttachment::new(attachment.filename.clone())
                                .body(attachment.bytes.clone(), content_type),
                        ),
                    )
                    .map_err(|e| NotifyError::Transport(e.to_string()))
            }
            None => builder
                .singlepart(body_part)
                .map_err(|e| NotifyError::Transport(e.to_string())),
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if notification.recipients.is_empty() {
            return Ok(());
        }
        if !self.config.enabled {
            debug!(
                subject = %notification.subject,
                recipients = notification.recipients.len(),
                "mail disabled, dropping notification"
            );
            return Ok(());
        }

        let smtp_host = self
            .config
            .smtp_host
            .as_deref()
            .ok_or_else(|| NotifyError::Transport("mail.smtp_host is not configured".to_string()))?;

        let message = self.build_message(&notification)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
                .port(self.config.smtp_port);

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            transport_builder = transport_builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        let mailer = transport_builder.build();
        mailer.send(message).await.map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(
            event_name = "mail.sent",
            recipients = notification.recipients.len(),
            subject = %notification.subject,
            has_attachment = notification.attachment.is_some(),
            "notification email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use upkeep_core::config::MailConfig;
    use upkeep_core::notify::{Attachment, Notification, Notifier, NotifyError};

    use super::SmtpNotifier;

    fn disabled_config() -> MailConfig {
        MailConfig {
            enabled: false,
            smtp_host: None,
            smtp_port: 587,
            from_address: "no-reply@upkeep.local".to_string(),
            username: None,
            password: None,
        }
    }

    fn enabled_config() -> MailConfig {
        MailConfig {
            enabled: true,
            smtp_host: Some("smtp.example.edu".to_string()),
            smtp_port: 587,
            from_address: "no-reply@upkeep.local".to_string(),
            username: None,
            password: None,
        }
    }

    #[tokio::test]
    async fn disabled_mail_accepts_sends_as_a_no_op() {
        let notifier = SmtpNotifier::new(disabled_config());
        notifier
            .send(Notification::new(
                vec!["principal@example.edu".to_string()],
                "subject",
                "body",
            ))
            .await
            .expect("disabled mail should swallow the send");
    }

    #[tokio::test]
    async fn empty_recipients_are_a_no_op_even_when_enabled() {
        let notifier = SmtpNotifier::new(enabled_config());
        notifier
            .send(Notification::new(Vec::new(), "subject", "body"))
            .await
            .expect("empty recipient list is a no-op");
    }

    #[tokio::test]
    async fn invalid_recipient_fails_before_any_transport_work() {
        let notifier = SmtpNotifier::new(enabled_config());
        let result = notifier
            .send(Notification::new(vec!["not-an-email".to_string()], "subject", "body"))
            .await;

        assert!(matches!(result, Err(NotifyError::Address(_))));
    }

    #[test]
    fn attachments_build_into_a_multipart_message() {
        let notifier = SmtpNotifier::new(enabled_config());
        let notification = Notification::new(
            vec!["hod@example.edu".to_string()],
            "Maintenance Request Approved: Lab 2 PC repairs",
            "<html><body>approved</body></html>",
        )
        .with_attachment(Attachment {
            filename: "RequestLetter.pdf".to_string(),
            bytes: vec![0x25, 0x50, 0x44, 0x46],
            mime: "application/pdf".to_string(),
        });

        let message = notifier.build_message(&notification).expect("message builds");
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(formatted.contains("RequestLetter.pdf"));
        assert!(formatted.contains("multipart/mixed"));
    }
}
