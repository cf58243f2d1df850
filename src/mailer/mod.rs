use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::SmtpConfig,
    error::{AppError, Result},
};

/// One rendered message, ready for the transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Returns None when mail is disabled or incompletely configured;
    /// callers treat a missing mailer as "skip delivery".
    pub fn new(config: &SmtpConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let (Some(host), Some(from_address)) = (&config.host, &config.from_address) else {
            tracing::warn!("SMTP enabled but missing host or from_address");
            return Ok(None);
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        if let Some(port) = config.port {
            builder = builder.port(port);
        }

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = from_address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(e.to_string()))?;

        Ok(Some(Self {
            transport: builder.build(),
            from,
        }))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email
                .to
                .parse::<Mailbox>()
                .map_err(|e| AppError::Mail(e.to_string()))?)
            .subject(email.subject)
            .body(email.body)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        Ok(())
    }
}

/// Collects messages instead of delivering them, and can be told to
/// fail for specific addresses to exercise the skip-on-failure path.
#[cfg(any(test, feature = "test-utils"))]
pub struct RecordingMailer {
    pub sent: tokio::sync::Mutex<Vec<OutgoingEmail>>,
    pub fail_for: Vec<String>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: tokio::sync::Mutex::new(Vec::new()),
            fail_for: Vec::new(),
        }
    }

    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: tokio::sync::Mutex::new(Vec::new()),
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        if self.fail_for.contains(&email.to) {
            return Err(AppError::Mail(format!("refused delivery to {}", email.to)));
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}
