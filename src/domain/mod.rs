//! Domain layer - core entities and collaborator traits.
//!
//! This module defines the domain model for the chain watcher:
//! - The chain state the poller maintains and the countdown consumes
//! - Sampled-target types produced during a below-threshold episode
//! - Traits that seam out external collaborators: the game API, the
//!   status surface (tray tooltip or equivalent), and the alert channel

pub mod error;
pub mod torn_models;

pub use error::WatchError;
pub use torn_models::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Host allowed for outbound profile links.
pub const PROFILE_HOST: &str = "www.torn.com";

/// Current state of the monitored chain.
///
/// `end` is the authoritative unix-seconds deadline. Consumers must
/// recompute remaining time from it on every tick rather than keeping a
/// decrementing counter, so missed ticks never accumulate drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainState {
    /// Current hit count of the chain.
    pub current: u32,
    /// Unix-seconds timestamp at which the chain expires, if one is active.
    pub end: Option<i64>,
}

impl ChainState {
    /// State reported while no chain is active.
    pub fn idle() -> Self {
        ChainState {
            current: 0,
            end: None,
        }
    }

    /// Seconds left on the chain timer at `now` (unix seconds).
    ///
    /// Negative once the deadline has passed; zero when no deadline is set.
    pub fn remaining_at(&self, now: i64) -> i64 {
        match self.end {
            Some(end) => end - now,
            None => 0,
        }
    }

    /// Whether the chain is worth counting down at `now`.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.current > 0 && self.remaining_at(now) > 0
    }
}

/// One entry of the static candidate pool.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(rename = "XID")]
    pub xid: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Availability classification of a sampled player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TargetStatus {
    /// Actionable right now.
    Okay,
    /// In hospital until the given unix-seconds timestamp.
    Hospital { until: i64 },
    /// Any other state the API reported, passed through verbatim.
    Other(String),
    /// Missing or malformed status block.
    Unknown,
}

impl TargetStatus {
    /// Human-readable label, computing remaining hospital time against `now`.
    pub fn label(&self, now: i64) -> String {
        match self {
            TargetStatus::Okay => "Okay".to_string(),
            TargetStatus::Hospital { until } => {
                let remaining = (until - now).max(0);
                format!("Hospitalized ({}m {}s)", remaining / 60, remaining % 60)
            }
            TargetStatus::Other(state) => state.clone(),
            TargetStatus::Unknown => "Unknown".to_string(),
        }
    }
}

/// A candidate that has been queried during a sampling episode.
///
/// Produced transiently for display; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SampledTarget {
    pub xid: u64,
    pub name: String,
    pub status: TargetStatus,
    /// Status rendered at sample time (hospital labels embed remaining time).
    pub label: String,
    /// Allow-listed profile link for opening in a browser.
    pub profile_url: String,
}

/// Build the outbound profile link for a player id.
pub fn profile_url(xid: u64) -> String {
    format!("https://{}/profiles.php?XID={}", PROFILE_HOST, xid)
}

/// Allow-list check applied before any profile link is handed out.
///
/// Only https links to the game's own host pass.
pub fn is_allowed_link(url: &str) -> bool {
    url.strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .map(|host| host == PROFILE_HOST)
        .unwrap_or(false)
}

/// Read-only game API used by the poller and the sampler.
///
/// Implementations must be thread-safe (`Send + Sync`) for use across
/// spawned tasks. See `infrastructure::torn_client::TornClient`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Fetch the monitored faction's current chain state.
    ///
    /// # Errors
    ///
    /// - `WatchError::Network` on transport failure or non-success status
    /// - `WatchError::Api` on an application-level error payload
    async fn fetch_chain(&self, faction_id: u32) -> Result<ChainState, WatchError>;

    /// Fetch a player's basic profile for availability classification.
    async fn fetch_basic_profile(&self, xid: u64) -> Result<BasicProfile, WatchError>;
}

/// Write-only sink for short status strings (tray tooltip or equivalent).
#[cfg_attr(test, mockall::automock)]
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: &str);
}

/// Out-of-band alert channel (native notification, push, or log fallback).
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send + Sync {
    fn alert(&self, title: &str, body: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_at_recomputes_from_deadline() {
        let chain = ChainState {
            current: 3,
            end: Some(1_700_000_125),
        };
        assert_eq!(chain.remaining_at(1_700_000_115), 10);
        assert_eq!(chain.remaining_at(1_700_000_125), 0);
        assert_eq!(chain.remaining_at(1_700_000_130), -5);
    }

    #[test]
    fn test_is_active_at() {
        let chain = ChainState {
            current: 3,
            end: Some(1_000),
        };
        assert!(chain.is_active_at(999));
        assert!(!chain.is_active_at(1_000));

        let dead = ChainState {
            current: 0,
            end: Some(2_000),
        };
        assert!(!dead.is_active_at(999));
        assert!(!ChainState::idle().is_active_at(0));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(TargetStatus::Okay.label(0), "Okay");
        assert_eq!(
            TargetStatus::Hospital { until: 1_190 }.label(1_000),
            "Hospitalized (3m 10s)"
        );
        // Release time already passed - clamp instead of going negative
        assert_eq!(
            TargetStatus::Hospital { until: 900 }.label(1_000),
            "Hospitalized (0m 0s)"
        );
        assert_eq!(
            TargetStatus::Other("Traveling".to_string()).label(0),
            "Traveling"
        );
        assert_eq!(TargetStatus::Unknown.label(0), "Unknown");
    }

    #[test]
    fn test_profile_link_allow_list() {
        let url = profile_url(2_383_326);
        assert_eq!(url, "https://www.torn.com/profiles.php?XID=2383326");
        assert!(is_allowed_link(&url));

        assert!(!is_allowed_link("http://www.torn.com/profiles.php?XID=1"));
        assert!(!is_allowed_link("https://evil.example/profiles.php?XID=1"));
        assert!(!is_allowed_link("https://www.torn.com.evil.example/x"));
        assert!(!is_allowed_link("torn.com"));
    }

    #[test]
    fn test_candidate_pool_entry_format() {
        let json = r#"[{ "XID": 2383326, "name": "Duke" }, { "XID": 148747 }]"#;
        let pool: Vec<Candidate> = serde_json::from_str(json).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].xid, 2_383_326);
        assert_eq!(pool[0].name.as_deref(), Some("Duke"));
        assert!(pool[1].name.is_none());
    }
}
