//! Log-backed sink implementations.
//!
//! The watcher publishes status lines and alerts through the domain sink
//! traits. These defaults route everything through `tracing`; a desktop
//! shell would swap in tray/notification implementations at the same seam.

use crate::domain::{AlertSink, StatusSink};
use tracing::{info, warn};

/// Status sink that logs each published line.
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn publish(&self, status: &str) {
        info!(target: "chainwatch::status", "{}", status);
    }
}

/// Alert sink that logs each alert at warn level.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self, title: &str, body: &str) {
        warn!(target: "chainwatch::alert", "{}: {}", title, body);
    }
}
