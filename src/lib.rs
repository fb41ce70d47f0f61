//! Relays new headlines from an RSS feed to a Discord webhook.
//!
//! Each invocation is one pass: load the seen set, fetch the feed, post unseen
//! items oldest-first up to a per-run cap, then persist the (capped) seen set.
//! Scheduling is left to whatever runs the binary.

pub mod config;
pub mod feed;
pub mod logging;
pub mod relay;
pub mod state;
pub mod util;
pub mod webhook;

pub use config::{Config, ConfigError, RelaySettings};
pub use relay::{relay_entries, run_once, RelayLimits, RunError, RunSummary};
pub use state::{SeenState, StateStore};
pub use webhook::{DiscordWebhook, RelayMessage, RelaySink};
