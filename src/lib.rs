//! spent - foreground activity tracker.
//!
//! Samples the focused window title, idle time and screensaver state on a
//! fixed poll cycle and turns the observations into timed activity
//! segments, written as CSV or JSONL or exported as counters over HTTP.

pub mod classify;
pub mod config;
pub mod error;
pub mod monitor;
pub mod reporter;
pub mod sample;
pub mod server;
pub mod sink;

pub use classify::{classify, AppFields};
pub use reporter::{Report, Reporter};
