//! Wire models for Torn API responses.
//!
//! These models cover the two read-only selections the watcher uses:
//! the faction `chain` selection and the user `basic` selection. Both
//! endpoints signal application-level failures with an `error` object in
//! the payload, independent of HTTP status.

use super::{ChainState, TargetStatus};
use serde::{Deserialize, Serialize};

/// Application-level error body: `{ "error": { "code": 2, "error": "Incorrect key" } }`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    pub error: String,
}

/// Response envelope for `/faction/{id}?selections=chain`
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSelection {
    pub chain: ChainPayload,
}

/// The chain object inside a chain selection.
///
/// An idle faction reports `current: 0` and `end: 0`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ChainPayload {
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub end: i64,
}

impl ChainPayload {
    /// Convert the wire payload into the domain state, mapping the API's
    /// zero end-timestamp to "no deadline".
    pub fn into_state(self) -> ChainState {
        ChainState {
            current: self.current,
            end: if self.end > 0 { Some(self.end) } else { None },
        }
    }
}

/// Response for `/user/{xid}?selections=basic`
#[derive(Debug, Clone, Deserialize)]
pub struct BasicProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<PlayerStatus>,
}

/// Player status block inside a basic profile.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStatus {
    #[serde(default)]
    pub state: Option<String>,
    /// Release timestamp (unix seconds) for hospital/jail states; 0 otherwise.
    #[serde(default)]
    pub until: i64,
}

impl BasicProfile {
    /// Classify the profile's availability.
    ///
    /// "Okay" is the only eligible state. A hospitalized player carries the
    /// release timestamp so callers can render remaining time. Any other
    /// reported state passes through verbatim; a missing or malformed status
    /// block is `Unknown`.
    pub fn classify(&self) -> TargetStatus {
        let Some(status) = &self.status else {
            return TargetStatus::Unknown;
        };
        match status.state.as_deref() {
            Some("Okay") => TargetStatus::Okay,
            Some("Hospital") => TargetStatus::Hospital {
                until: status.until,
            },
            Some(other) => TargetStatus::Other(other.to_string()),
            None => TargetStatus::Unknown,
        }
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "Unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_payload_into_state() {
        let active = ChainPayload {
            current: 15,
            end: 1_700_000_000,
        };
        assert_eq!(
            active.into_state(),
            ChainState {
                current: 15,
                end: Some(1_700_000_000)
            }
        );

        let idle = ChainPayload { current: 0, end: 0 };
        assert_eq!(idle.into_state(), ChainState { current: 0, end: None });
    }

    #[test]
    fn test_chain_selection_deserializes_with_missing_fields() {
        let json = r#"{ "chain": {} }"#;
        let sel: ChainSelection = serde_json::from_str(json).unwrap();
        assert_eq!(sel.chain.current, 0);
        assert_eq!(sel.chain.end, 0);
    }

    #[test]
    fn test_classify_okay() {
        let json = r#"{ "name": "Duke", "status": { "state": "Okay", "until": 0 } }"#;
        let profile: BasicProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.classify(), TargetStatus::Okay);
        assert_eq!(profile.display_name(), "Duke");
    }

    #[test]
    fn test_classify_hospital_carries_release_time() {
        let json = r#"{ "name": "Duke", "status": { "state": "Hospital", "until": 1700000300 } }"#;
        let profile: BasicProfile = serde_json::from_str(json).unwrap();
        assert_eq!(
            profile.classify(),
            TargetStatus::Hospital { until: 1_700_000_300 }
        );
    }

    #[test]
    fn test_classify_other_and_unknown() {
        let travelling = r#"{ "status": { "state": "Traveling", "until": 0 } }"#;
        let profile: BasicProfile = serde_json::from_str(travelling).unwrap();
        assert_eq!(
            profile.classify(),
            TargetStatus::Other("Traveling".to_string())
        );

        let missing = r#"{ "name": "Ghost" }"#;
        let profile: BasicProfile = serde_json::from_str(missing).unwrap();
        assert_eq!(profile.classify(), TargetStatus::Unknown);
        assert_eq!(profile.display_name(), "Ghost");
    }

    #[test]
    fn test_error_body_deserializes() {
        let json = r#"{ "code": 2, "error": "Incorrect key" }"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.code, 2);
        assert_eq!(body.error, "Incorrect key");
    }
}
