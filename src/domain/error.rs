//! Error taxonomy for watcher operations.
//!
//! Every variant is non-fatal: operations catch these at their boundary,
//! log them, and let the periodic schedules keep running.

use thiserror::Error;

/// Failures that can occur while polling or sampling.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Transport failure or non-success HTTP status from the remote API.
    #[error("network error: {0}")]
    Network(String),

    /// Application-level error payload returned inside a 200 response.
    #[error("api error: {0}")]
    Api(String),

    /// Missing or invalid credential or candidate pool.
    #[error("config error: {0}")]
    Config(String),
}

impl WatchError {
    /// Wrap a reqwest transport error.
    pub fn network(err: impl std::fmt::Display) -> Self {
        WatchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatchError::Api("Incorrect key".to_string());
        assert_eq!(err.to_string(), "api error: Incorrect key");

        let err = WatchError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "network error: connection refused");
    }
}
