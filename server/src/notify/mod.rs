//! Fire-and-forget buyer notifications drained by a background task.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod receipt;
pub mod smtp;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{0}'")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), MailError>;
}

/// Writes mail to the log instead of sending it. Used when no SMTP relay
/// is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            bytes = notification.html_body.len(),
            "Mail delivery disabled, logging message instead"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// A notifier plus the receiving end of its queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Starts the delivery task on the current runtime.
    pub fn spawn(mailer: Arc<dyn Mailer>) -> Self {
        let (notifier, rx) = Self::channel();
        tokio::spawn(deliver(rx, mailer));
        notifier
    }

    pub fn notify(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(dropped)) = self.tx.send(notification) {
            warn!(to = %dropped.to, "Delivery task stopped, notification dropped");
        }
    }
}

/// Drains the queue until every [`Notifier`] handle is gone.
pub async fn deliver(mut rx: mpsc::UnboundedReceiver<Notification>, mailer: Arc<dyn Mailer>) {
    while let Some(notification) = rx.recv().await {
        match mailer.send(&notification).await {
            Ok(()) => info!(to = %notification.to, "Notification sent"),
            Err(e) => warn!(to = %notification.to, error = %e, "Notification failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FlakyMailer {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, notification: &Notification) -> Result<(), MailError> {
            self.attempts.lock().await.push(notification.to.clone());
            if notification.to.starts_with("bounce") {
                return Err(MailError::Address(notification.to.clone()));
            }
            Ok(())
        }
    }

    fn message(to: &str) -> Notification {
        Notification {
            to: to.to_string(),
            subject: "Here is your ticket".to_string(),
            html_body: "<p>hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_delivery() {
        let mailer = Arc::new(FlakyMailer::default());
        let (notifier, rx) = Notifier::channel();

        notifier.notify(message("bounce@example.com"));
        notifier.notify(message("buyer@example.com"));
        drop(notifier);

        deliver(rx, mailer.clone()).await;

        let attempts = mailer.attempts.lock().await.clone();
        assert_eq!(attempts, vec!["bounce@example.com", "buyer@example.com"]);
    }

    #[tokio::test]
    async fn test_notify_after_worker_stops_does_not_panic() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.notify(message("buyer@example.com"));
    }
}
