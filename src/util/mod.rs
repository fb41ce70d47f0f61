//! Small text helpers shared by the relay workflow.

mod text;

pub use text::{non_blank, truncate_chars};
