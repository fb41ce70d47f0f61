use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use wsj_relay::config::{Config, WEBHOOK_URL_ENV};
use wsj_relay::{run_once, DiscordWebhook, StateStore};

#[derive(Parser, Debug)]
#[command(
    name = "wsj-relay",
    about = "Post new WSJ Markets headlines to a Discord webhook"
)]
struct Args {
    /// Optional TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// State file (defaults to state.json next to the executable)
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    wsj_relay::logging::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => Config::default(),
    };
    let settings = config
        .into_settings(std::env::var(WEBHOOK_URL_ENV).ok())
        .context("Invalid configuration")?;

    let state_path = match args.state {
        Some(path) => path,
        None => StateStore::default_path().context("Failed to locate the executable directory")?,
    };
    let store = StateStore::new(state_path, settings.max_seen);

    let client = reqwest::Client::builder()
        .user_agent(concat!("wsj-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let mut webhook = DiscordWebhook::from_settings(client.clone(), &settings);

    tracing::debug!(?settings, state = %store.path().display(), "Starting run");
    run_once(&settings, &client, &store, &mut webhook).await?;
    Ok(())
}
