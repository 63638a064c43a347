use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One outbound email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("send timed out: {0}")]
    Timeout(String),

    #[error("email API rejected the message: HTTP {status}: {body}")]
    Api { status: u16, body: String },
}

/// The email transport as this core sees it: one send, success or failure.
/// No retry here - a failed tier send is retried by the next scheduler tick.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP API MAILER
// ═══════════════════════════════════════════════════════════════════════════

/// Transactional-email API transport
pub struct HttpApiMailer {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpApiMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MailerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl Mailer for HttpApiMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        debug!(to = %message.to, subject = %message.subject, "sending email");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MailerError::Timeout(e.to_string())
                } else {
                    MailerError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api { status, body });
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RECORDING MAILER (for testing)
// ═══════════════════════════════════════════════════════════════════════════

/// Captures sends instead of delivering them; can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        if *self.should_fail.lock().unwrap() {
            return Err(MailerError::Transport("simulated failure".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
