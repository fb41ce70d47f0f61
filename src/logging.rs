//! Stdout logging: one line per event, each starting with an RFC 3339 UTC
//! timestamp.

use std::io::IsTerminal;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Builds the subscriber used by the binary.
///
/// Level comes from `RUST_LOG`, defaulting to `info`. ANSI styling is only
/// emitted when `ansi` is set, so redirected output stays plain text.
pub fn subscriber<W>(make_writer: W, ansi: bool) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(make_writer)
        .finish()
}

/// Installs the global subscriber writing to stdout, styled only on a terminal.
pub fn init() {
    subscriber(std::io::stdout, std::io::stdout().is_terminal()).init();
}
