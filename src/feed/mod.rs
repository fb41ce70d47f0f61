//! Feed retrieval and decoding.
//!
//! - [`parser`] - defensive decoding of RSS/Atom bytes using `feed-rs`
//! - [`fetcher`] - single HTTP download with a bounded wait and size limit
//!
//! Neither layer retries; a failure here ends the run and the next scheduled
//! invocation starts over.

mod fetcher;
mod parser;

pub use fetcher::{fetch_feed, FetchError};
pub use parser::{parse_feed, FeedEntry, ParseError};
