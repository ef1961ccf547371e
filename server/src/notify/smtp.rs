use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, Mailer, Notification};
use crate::config::SmtpConfig;

/// Sends notifications through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(config.from.clone()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

fn build_message(from: &Mailbox, notification: &Notification) -> Result<Message, MailError> {
    let to = notification
        .to
        .parse::<Mailbox>()
        .map_err(|_| MailError::Address(notification.to.clone()))?;

    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(notification.html_body.clone())?;
    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let message = build_message(&self.from, notification)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from() -> Mailbox {
        "Tickets <tickets@example.com>".parse().unwrap()
    }

    #[test]
    fn test_builds_html_message() {
        let notification = Notification {
            to: "buyer@example.com".into(),
            subject: "Here is your ticket".into(),
            html_body: "<p>See you there</p>".into(),
        };
        let message = build_message(&from(), &notification).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: buyer@example.com"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn test_rejects_bad_recipient() {
        let notification = Notification {
            to: "not an address".into(),
            subject: "x".into(),
            html_body: String::new(),
        };
        let err = build_message(&from(), &notification).unwrap_err();
        assert!(matches!(err, MailError::Address(a) if a == "not an address"));
    }
}
