//! The relay run: load state, fetch, post new items oldest-first, save.
use crate::config::RelaySettings;
use crate::feed::{fetch_feed, FeedEntry, FetchError};
use crate::state::{SeenState, StateError, StateStore};
use crate::util::non_blank;
use crate::webhook::{RelayMessage, RelaySink, WebhookError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to relay item: {0}")]
    Relay(#[from] WebhookError),
    #[error("Failed to save state: {0}")]
    State(#[from] StateError),
}

/// Per-run limits for [`relay_entries`].
#[derive(Debug, Clone)]
pub struct RelayLimits {
    pub max_posts_per_run: usize,
    pub default_title: String,
}

impl From<&RelaySettings> for RelayLimits {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            max_posts_per_run: settings.max_posts_per_run,
            default_title: settings.default_title.clone(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub posted: usize,
    pub persisted: usize,
}

/// Relays entries not yet in `seen`, oldest first.
///
/// `entries` is in feed order (newest first). Entries with a blank link are
/// skipped without counting. A link is added to `seen` only after the sink
/// accepted it. Stops after `limits.max_posts_per_run` posts; the first sink
/// error is returned immediately and leaves the remaining entries untouched.
pub async fn relay_entries<S: RelaySink>(
    seen: &mut SeenState,
    entries: Vec<FeedEntry>,
    sink: &mut S,
    limits: &RelayLimits,
) -> Result<usize, WebhookError> {
    let mut posted = 0;

    for entry in entries.into_iter().rev() {
        if posted >= limits.max_posts_per_run {
            break;
        }

        let Some(link) = non_blank(entry.link.as_deref()) else {
            continue;
        };
        if seen.contains(link) {
            continue;
        }

        let title = non_blank(entry.title.as_deref()).unwrap_or(limits.default_title.as_str());
        let message = RelayMessage::new(title, link);

        sink.relay(&message).await?;
        tracing::info!(link = %message.link, "Posted: {}", message.title);

        seen.insert(link);
        posted += 1;
    }

    Ok(posted)
}

/// Runs the whole workflow once.
///
/// The state file is written only when fetching and relaying both succeed,
/// even if nothing new was posted.
pub async fn run_once<S: RelaySink>(
    settings: &RelaySettings,
    client: &reqwest::Client,
    store: &StateStore,
    sink: &mut S,
) -> Result<RunSummary, RunError> {
    let mut seen = store.load_or_default();
    let entries = fetch_feed(client, &settings.feed_url, settings.fetch_timeout).await?;

    let posted = relay_entries(&mut seen, entries, sink, &RelayLimits::from(settings)).await?;

    store.save(&seen)?;
    let persisted = seen.len().min(store.max_seen());
    tracing::info!(persisted, "Run complete. Posted {} items.", posted);

    Ok(RunSummary { posted, persisted })
}
