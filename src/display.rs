//! Two-line character display seam
//!
//! The display driver is an external collaborator; everything in this
//! crate talks to it through [`DisplaySink`], which accepts two text
//! lines. `show_message` is transient feedback that the hardware
//! implementation holds on screen for the given duration (a deliberate,
//! bounded wait in the single-threaded model); the log-backed sink just
//! records it.

use std::time::Duration;
use tracing::info;

pub trait DisplaySink {
    /// Replace both display lines.
    fn show(&mut self, line1: &str, line2: &str);

    /// Show a transient message, holding it for `hold` before the next
    /// `show` overwrites it.
    fn show_message(&mut self, line1: &str, line2: &str, hold: Duration);
}

/// Log-backed display for running without hardware.
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, line1: &str, line2: &str) {
        info!("display: [{line1}] [{line2}]");
    }

    fn show_message(&mut self, line1: &str, line2: &str, hold: Duration) {
        info!(hold_ms = hold.as_millis() as u64, "display: [{line1}] [{line2}]");
    }
}
