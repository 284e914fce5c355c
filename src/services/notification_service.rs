use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::token_prefix;
use crate::config::settings::MailConfig;
use crate::error::{IdentityError, Result};

const VERIFICATION_SUBJECT: &str = "Confirm your registration";

/// Mail delivery failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),

    #[error("Mail relay rejected message with status {0}: {1}")]
    Rejected(u16, String),
}

/// Outbound message handed to a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outbound email delivery
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> std::result::Result<(), MailError>;

    fn transport_type(&self) -> &'static str;
}

/// Posts messages as JSON to an HTTP mail relay
pub struct HttpMailTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpMailTransport {
    pub fn new(api_url: &str, api_key: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| IdentityError::config(format!("Failed to build mail client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &MailMessage) -> std::result::Result<(), MailError> {
        let mut request = self.client.post(&self.api_url).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(status.as_u16(), body));
        }

        debug!("Mail relay accepted message to {}", message.to);
        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "http"
    }
}

/// Writes messages to the log instead of delivering them
#[derive(Default)]
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, message: &MailMessage) -> std::result::Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Mail not delivered (log transport): {}",
            message.text
        );
        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "log"
    }
}

/// Keeps sent messages in memory; can be switched to fail every send
#[derive(Default)]
pub struct MemoryMailTransport {
    outbox: Mutex<Vec<MailMessage>>,
    failing: bool,
}

impl MemoryMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose every send fails
    pub fn failing() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub async fn outbox(&self) -> Vec<MailMessage> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for MemoryMailTransport {
    async fn send(&self, message: &MailMessage) -> std::result::Result<(), MailError> {
        if self.failing {
            return Err(MailError::Delivery("relay unreachable".to_string()));
        }
        self.outbox.lock().await.push(message.clone());
        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "memory"
    }
}

/// Result of a best-effort email dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    Failed(String),
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }
}

/// Composes and sends verification emails
pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
    app_base_url: String,
    from: String,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, config: &MailConfig) -> Self {
        Self {
            transport,
            app_base_url: config.app_base_url.trim_end_matches('/').to_string(),
            from: config.from.clone(),
        }
    }

    /// HTTP relay when `MAIL_API_URL` is set, log-only otherwise
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let transport: Arc<dyn MailTransport> = match &config.api_url {
            Some(url) => {
                info!("Using HTTP mail relay at {}", url);
                Arc::new(HttpMailTransport::new(
                    url,
                    config.api_key.clone(),
                    config.timeout_seconds,
                )?)
            }
            None => {
                warn!("⚠️ MAIL_API_URL not set, verification emails are only logged");
                Arc::new(LogMailTransport)
            }
        };
        Ok(Self::new(transport, config))
    }

    pub fn transport_type(&self) -> &'static str {
        self.transport.transport_type()
    }

    /// Public link that confirms the given token
    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/api/users/verify/{}", self.app_base_url, token)
    }

    fn verification_message(&self, token: &str, email: &str, name: &str) -> MailMessage {
        let link = self.verification_link(token);
        MailMessage {
            from: self.from.clone(),
            to: email.to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            text: format!(
                "Hello {}, please confirm your registration by opening {}",
                name, link
            ),
            html: format!(
                "<p>Hello {},</p><p>Please confirm your registration.</p>\
                 <p><a target=\"_blank\" href=\"{}\">Confirm email</a></p>",
                html_escape::encode_text(name),
                html_escape::encode_double_quoted_attribute(&link)
            ),
        }
    }

    /// Send the verification link. Never fails; a delivery problem is
    /// logged and reported in the outcome.
    pub async fn send_verification_email(
        &self,
        token: &str,
        email: &str,
        name: &str,
    ) -> NotificationOutcome {
        let message = self.verification_message(token, email, name);
        match self.transport.send(&message).await {
            Ok(()) => {
                info!(
                    "Verification email sent to {} (token {}...)",
                    email,
                    token_prefix(token)
                );
                NotificationOutcome::Sent
            }
            Err(e) => {
                warn!("Failed to send verification email to {}: {}", email, e);
                NotificationOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            app_base_url: "https://id.example.com/".to_string(),
            ..MailConfig::default()
        }
    }

    #[tokio::test]
    async fn verification_email_carries_link_and_name() {
        let transport = Arc::new(MemoryMailTransport::new());
        let dispatcher = NotificationDispatcher::new(transport.clone(), &mail_config());

        let outcome = dispatcher
            .send_verification_email("abc123", "a@x.com", "Ann")
            .await;
        assert!(outcome.is_sent());

        let outbox = transport.outbox().await;
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, "a@x.com");
        assert_eq!(outbox[0].subject, "Confirm your registration");
        assert!(outbox[0]
            .html
            .contains("https://id.example.com/api/users/verify/abc123"));
        assert!(outbox[0].text.contains("Ann"));
    }

    #[tokio::test]
    async fn display_name_is_escaped_in_html_body() {
        let transport = Arc::new(MemoryMailTransport::new());
        let dispatcher = NotificationDispatcher::new(transport.clone(), &mail_config());

        dispatcher
            .send_verification_email("abc123", "a@x.com", "<a href=\"https://evil\">click</a>")
            .await;

        let html = &transport.outbox().await[0].html;
        assert!(!html.contains("https://evil\">"));
        assert!(html.contains("<p>Hello &lt;a href=\"https://evil\"&gt;click&lt;/a&gt;,</p>"));
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[tokio::test]
    async fn transport_failure_becomes_failed_outcome() {
        let dispatcher =
            NotificationDispatcher::new(Arc::new(MemoryMailTransport::failing()), &mail_config());

        let outcome = dispatcher
            .send_verification_email("abc123", "a@x.com", "Ann")
            .await;
        assert!(matches!(outcome, NotificationOutcome::Failed(_)));
    }

    #[test]
    fn without_relay_url_the_log_transport_is_used() {
        let dispatcher = NotificationDispatcher::from_config(&MailConfig::default()).unwrap();
        assert_eq!(dispatcher.transport_type(), "log");
    }
}
