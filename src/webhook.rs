//! Discord webhook delivery.
//!
//! One POST per relayed item, no batching and no retry. A non-2xx answer is an
//! error so the caller never marks the item as seen.
use crate::config::{RelaySettings, TITLE_LIMIT};
use crate::util::truncate_chars;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Webhook rejected the message: status {status}")]
    HttpStatus { status: u16, body: String },
    #[error("Webhook request timed out after {0:?}")]
    Timeout(Duration),
}

/// A single item ready to be sent: title already trimmed and truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub title: String,
    pub link: String,
}

impl RelayMessage {
    /// Builds a message, cutting `title` to [`TITLE_LIMIT`] characters.
    pub fn new(title: &str, link: impl Into<String>) -> Self {
        Self {
            title: truncate_chars(title, TITLE_LIMIT).into_owned(),
            link: link.into(),
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub username: &'a str,
    pub embeds: [Embed<'a>; 1],
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Serialize)]
pub struct Embed<'a> {
    pub title: &'a str,
    pub url: &'a str,
}

/// `{"parse": []}` disables every implicit mention.
#[derive(Debug, Default, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(username: &'a str, message: &'a RelayMessage) -> Self {
        Self {
            username,
            embeds: [Embed {
                title: &message.title,
                url: &message.link,
            }],
            allowed_mentions: AllowedMentions::default(),
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for relayed items.
#[allow(async_fn_in_trait)]
pub trait RelaySink {
    async fn relay(&mut self, message: &RelayMessage) -> Result<(), WebhookError>;
}

/// Posts messages to a Discord-compatible webhook.
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: SecretString,
    username: String,
    timeout: Duration,
}

impl std::fmt::Debug for DiscordWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordWebhook")
            .field("url", &"[REDACTED]")
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DiscordWebhook {
    pub fn new(
        client: reqwest::Client,
        url: SecretString,
        username: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            url,
            username: username.into(),
            timeout,
        }
    }

    pub fn from_settings(client: reqwest::Client, settings: &RelaySettings) -> Self {
        Self::new(
            client,
            SecretString::from(settings.webhook_url().to_string()),
            settings.username.clone(),
            settings.relay_timeout,
        )
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(self.url.expose_secret())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl RelaySink for DiscordWebhook {
    async fn relay(&mut self, message: &RelayMessage) -> Result<(), WebhookError> {
        let payload = WebhookPayload::new(&self.username, message);
        tokio::time::timeout(self.timeout, self.post(&payload))
            .await
            .map_err(|_| WebhookError::Timeout(self.timeout))?
    }
}
