//! Configuration for a relay run.
//!
//! The TOML file is optional: a missing file yields `Config::default()`, whose
//! values are the fixed parameters the relay has always used. The webhook URL
//! is the one required setting; `DISCORD_WEBHOOK_URL` takes precedence over the
//! `webhook_url` key in the file.
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the destination webhook URL.
pub const WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";

/// Embed titles longer than this are cut (Discord's embed title limit).
pub const TITLE_LIMIT: usize = 256;

const DEFAULT_FEED_URL: &str = "https://feeds.a.dj.com/rss/RSSMarketsMain.xml";
const DEFAULT_USERNAME: &str = "WSJ News";
const DEFAULT_TITLE: &str = "WSJ Headline";
const DEFAULT_MAX_POSTS_PER_RUN: usize = 6;
const DEFAULT_MAX_SEEN: usize = 2000;
const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 15;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Webhook URL not configured: set DISCORD_WEBHOOK_URL or webhook_url in the config file")]
    MissingWebhookUrl,

    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Raw configuration as read from the TOML file.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The webhook URL is masked in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RSS/Atom feed to poll.
    pub feed_url: String,

    /// Webhook URL (the env var takes precedence).
    pub webhook_url: Option<String>,

    /// Display name of the posting identity.
    pub username: String,

    /// Title used when an entry has no usable title.
    pub default_title: String,

    /// Maximum number of items relayed in one run.
    pub max_posts_per_run: usize,

    /// Maximum number of identifiers kept in the state file.
    pub max_seen: usize,

    /// Bounded wait for each webhook call, in seconds.
    pub relay_timeout_secs: u64,

    /// Bounded wait for the feed download, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            webhook_url: None,
            username: DEFAULT_USERNAME.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            max_posts_per_run: DEFAULT_MAX_POSTS_PER_RUN,
            max_seen: DEFAULT_MAX_SEEN,
            relay_timeout_secs: DEFAULT_RELAY_TIMEOUT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed_url", &self.feed_url)
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("username", &self.username)
            .field("default_title", &self.default_title)
            .field("max_posts_per_run", &self.max_posts_per_run)
            .field("max_seen", &self.max_seen)
            .field("relay_timeout_secs", &self.relay_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "feed_url",
        "webhook_url",
        "username",
        "default_title",
        "max_posts_per_run",
        "max_seen",
        "relay_timeout_secs",
        "fetch_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), feed = %config.feed_url, "Loaded configuration");
        Ok(config)
    }

    /// Validate the configuration and resolve the webhook URL.
    ///
    /// `env_webhook_url` is the value of [`WEBHOOK_URL_ENV`], if set. A blank
    /// value counts as unset.
    pub fn into_settings(
        self,
        env_webhook_url: Option<String>,
    ) -> Result<RelaySettings, ConfigError> {
        let webhook_url = env_webhook_url
            .filter(|v| !v.trim().is_empty())
            .or(self.webhook_url.filter(|v| !v.trim().is_empty()))
            .ok_or(ConfigError::MissingWebhookUrl)?;
        let webhook_url = webhook_url.trim().to_string();

        check_http_url("webhook_url", &webhook_url)?;
        check_http_url("feed_url", &self.feed_url)?;
        require_nonzero("max_posts_per_run", self.max_posts_per_run as u64)?;
        require_nonzero("max_seen", self.max_seen as u64)?;
        require_nonzero("relay_timeout_secs", self.relay_timeout_secs)?;
        require_nonzero("fetch_timeout_secs", self.fetch_timeout_secs)?;

        let default_title = if self.default_title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            self.default_title.trim().to_string()
        };

        Ok(RelaySettings {
            feed_url: self.feed_url,
            webhook_url: SecretString::from(webhook_url),
            username: self.username,
            default_title,
            max_posts_per_run: self.max_posts_per_run,
            max_seen: self.max_seen,
            relay_timeout: Duration::from_secs(self.relay_timeout_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        })
    }
}

fn check_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn require_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Validated Settings
// ============================================================================

/// Validated settings passed into the relay workflow.
pub struct RelaySettings {
    pub feed_url: String,
    pub webhook_url: SecretString,
    pub username: String,
    pub default_title: String,
    pub max_posts_per_run: usize,
    pub max_seen: usize,
    pub relay_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl std::fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySettings")
            .field("feed_url", &self.feed_url)
            .field("webhook_url", &"[REDACTED]")
            .field("username", &self.username)
            .field("default_title", &self.default_title)
            .field("max_posts_per_run", &self.max_posts_per_run)
            .field("max_seen", &self.max_seen)
            .field("relay_timeout", &self.relay_timeout)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

impl RelaySettings {
    pub fn webhook_url(&self) -> &str {
        self.webhook_url.expose_secret()
    }
}

// ============================================================================
// Tests
// ============================================================================
