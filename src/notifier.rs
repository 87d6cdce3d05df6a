use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::classifier::Classification;
use crate::config::MailConfig;

/// A rendered alert, ready to hand to a [`Mailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid recipient address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build alert message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP relay failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// What a mailer did with an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
}

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: AlertEmail) -> Result<Delivery, NotifyError>;
}

/// Sends through an SMTP relay
pub struct SmtpMailer {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, username: &str) -> anyhow::Result<Self> {
        let sender = config
            .sender()
            .unwrap_or(username)
            .parse::<Mailbox>()
            .context("invalid sender address")?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .with_context(|| format!("invalid SMTP relay {}", config.server))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                username.to_string(),
                config.password.clone().unwrap_or_default(),
            ))
            .build();

        Ok(Self { sender, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: AlertEmail) -> Result<Delivery, NotifyError> {
        let recipient = email
            .recipient
            .parse::<Mailbox>()
            .map_err(|source| NotifyError::InvalidAddress {
                address: email.recipient.clone(),
                source,
            })?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;

        self.transport.send(message).await?;
        Ok(Delivery::Sent)
    }
}

/// Used when no mail credentials are configured
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: AlertEmail) -> Result<Delivery, NotifyError> {
        warn!(
            to = %email.recipient,
            subject = %email.subject,
            "Skipping alert email (mail disabled)"
        );
        Ok(Delivery::Skipped)
    }
}

/// Pick the mailer for this configuration.
pub fn mailer_from_config(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.username.as_deref() {
        Some(username) => Ok(Arc::new(SmtpMailer::new(config, username)?)),
        None => {
            warn!("MAIL_USERNAME is not set, alert emails are disabled");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

/// Composes and dispatches air quality alerts
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub fn compose(
        recipient: &str,
        classification: &Classification,
        latitude: &str,
        longitude: &str,
    ) -> AlertEmail {
        let subject = format!(
            "ALERTA: Qualidade do Ar Ruim na sua região ({})",
            classification.label()
        );
        let body = format!(
            "Olá!\n\n\
             Detectamos uma piora na qualidade do ar na sua região monitorada ({latitude}, {longitude}).\n\n\
             Nível de Risco Atual: {} (Índice {})\n\
             Recomendação: {}\n\n\
             Por favor, tome as precauções necessárias.\n\n\
             - Seu Sistema de Alerta Climático Pessoal\n",
            classification.label(),
            classification.aqi,
            classification.recommendation(),
        );

        AlertEmail {
            recipient: recipient.to_string(),
            subject,
            body,
        }
    }

    /// Best-effort delivery: callers log the error and carry on.
    pub async fn send_alert(
        &self,
        recipient: &str,
        classification: &Classification,
        latitude: &str,
        longitude: &str,
    ) -> Result<Delivery, NotifyError> {
        let email = Self::compose(recipient, classification, latitude, longitude);
        let delivery = self.mailer.send(email).await?;

        if delivery == Delivery::Sent {
            info!(to = %recipient, risk = classification.label(), "Alert email sent");
        }
        Ok(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingMailer;

    #[test]
    fn compose_fills_template() {
        let email = Notifier::compose("a@example.com", &Classification::new(4), "-23.5", "-46.6");
        assert_eq!(email.recipient, "a@example.com");
        assert_eq!(email.subject, "ALERTA: Qualidade do Ar Ruim na sua região (Ruim)");
        assert!(email.body.contains("(-23.5, -46.6)"));
        assert!(email.body.contains("Nível de Risco Atual: Ruim (Índice 4)"));
        assert!(email
            .body
            .contains("Recomendação: Qualquer pessoa pode começar a sentir efeitos na saúde."));
        assert!(email.body.ends_with("- Seu Sistema de Alerta Climático Pessoal\n"));
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_not_raised() {
        let mailer = RecordingMailer::failing();
        let notifier = Notifier::new(Arc::new(mailer.clone()));

        let result = notifier
            .send_alert("a@example.com", &Classification::new(2), "1", "2")
            .await;
        assert!(result.is_err());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn recording_mailer_reports_sent() {
        let mailer = RecordingMailer::new();
        let notifier = Notifier::new(Arc::new(mailer.clone()));

        let delivery = notifier
            .send_alert("a@example.com", &Classification::new(3), "1", "2")
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn disabled_mailer_skips() {
        let notifier = Notifier::new(Arc::new(DisabledMailer));
        let delivery = notifier
            .send_alert("a@example.com", &Classification::new(5), "1", "2")
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Skipped);
    }

    #[test]
    fn mail_disabled_without_username() {
        assert!(mailer_from_config(&MailConfig::default()).is_ok());
    }

    /// Plain relay on a local port nothing listens on.
    fn unreachable_relay() -> SmtpMailer {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = MailConfig {
            server: "127.0.0.1".to_string(),
            port,
            use_tls: false,
            username: Some("alerts@example.com".to_string()),
            password: Some("secret".to_string()),
            sender: None,
        };
        SmtpMailer::new(&config, "alerts@example.com").unwrap()
    }

    fn email_to(recipient: &str) -> AlertEmail {
        Notifier::compose(recipient, &Classification::new(4), "1", "2")
    }

    #[tokio::test]
    async fn bad_recipient_is_an_address_error() {
        let err = unreachable_relay()
            .send(email_to("not an address"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, NotifyError::InvalidAddress { ref address, .. } if address == "not an address")
        );
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_transport_error() {
        let err = unreachable_relay()
            .send(email_to("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }

    #[test]
    fn incomplete_message_is_a_build_error() {
        let err: NotifyError = Message::builder()
            .subject("no envelope")
            .body(String::new())
            .unwrap_err()
            .into();
        assert!(matches!(err, NotifyError::Message(_)));
    }
}
