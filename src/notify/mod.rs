//! Outbound email with the rendered report attached.

pub mod error;
pub mod failure_log;
pub mod transport;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AppConfig;

pub use error::EmailError;
pub use failure_log::FailureLog;
pub use transport::{MailTransport, SmtpMailer};

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl EmailAttachment {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/pdf".to_string(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(skip)]
    pub attachment: Option<EmailAttachment>,
}

#[derive(Clone)]
pub struct Notifier {
    transport: Option<Arc<dyn MailTransport>>,
    from: Option<String>,
    failures: FailureLog,
}

impl Notifier {
    pub fn new(
        transport: Option<Arc<dyn MailTransport>>,
        from: Option<String>,
        failures: FailureLog,
    ) -> Self {
        Self {
            transport,
            from,
            failures,
        }
    }

    /// SMTP notifier from configuration. Without a relay every send fails
    /// with `NotConfigured` instead of refusing to start.
    pub fn from_config(config: &AppConfig) -> Self {
        let failures = FailureLog::new(config.email_failure_log.clone());
        if !config.smtp.is_configured() {
            info!("SMTP not configured; report email is disabled");
            return Self::new(None, None, failures);
        }

        match SmtpMailer::from_config(&config.smtp) {
            Ok(mailer) => Self::new(
                Some(Arc::new(mailer) as Arc<dyn MailTransport>),
                config.smtp.from.clone(),
                failures,
            ),
            Err(e) => {
                warn!("SMTP setup failed, report email is disabled: {}", e);
                Self::new(None, None, failures)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some() && self.from.is_some()
    }

    /// Send `email`. Every failure is logged and appended to the failure log.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        match self.try_send(email).await {
            Ok(()) => {
                info!("Sent '{}' to {}", email.subject, email.to.join(", "));
                Ok(())
            }
            Err(err) => {
                error!(
                    "Email '{}' to {} failed ({}): {}",
                    email.subject,
                    email.to.join(", "),
                    err.kind(),
                    err
                );
                self.failures.record(&email.to, &email.subject, &err).await;
                Err(err)
            }
        }
    }

    async fn try_send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            return Err(EmailError::NotConfigured);
        };
        let message = build_message(from, email)?;
        transport.deliver(message).await
    }
}

pub fn build_message(from: &str, email: &OutgoingEmail) -> Result<Message, EmailError> {
    if email.to.is_empty() {
        return Err(EmailError::InvalidAddress("no recipients".to_string()));
    }

    let from: Mailbox = from
        .parse()
        .map_err(|_| EmailError::InvalidAddress(from.to_string()))?;
    let mut builder = Message::builder().from(from).subject(email.subject.as_str());
    for to in &email.to {
        let mailbox: Mailbox = to
            .trim()
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to.clone()))?;
        builder = builder.to(mailbox);
    }

    let text = SinglePart::plain(email.body.clone());
    let message = match &email.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| EmailError::Message(e.to_string()))?;
            let part = Attachment::new(attachment.file_name.clone())
                .body(attachment.bytes.clone(), content_type);
            builder.multipart(MultiPart::mixed().singlepart(text).singlepart(part))
        }
        None => builder.singlepart(text),
    };
    message.map_err(|e| EmailError::Message(e.to_string()))
}
