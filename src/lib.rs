//! Tracks how long you spend on each website domain and nags you when a
//! configured daily limit is crossed. The daemon speaks a line-based JSON
//! protocol with the browser side (events in, notification requests out),
//! while the cli reads and edits the persistent usage store directly.
//!

pub mod cli;
pub mod daemon;
pub mod utils;
