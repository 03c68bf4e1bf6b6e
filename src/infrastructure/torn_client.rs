//! HTTP client for the Torn public API.
//!
//! Covers the two read-only selections the watcher needs: the faction
//! `chain` selection and the user `basic` selection. The API signals
//! application-level failures with an `error` object in an otherwise
//! successful response, so both layers are checked here.

use crate::domain::{ApiErrorBody, BasicProfile, ChainSelection, ChainState, GameApi, WatchError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Base URL for the Torn API
const BASE_URL: &str = "https://api.torn.com";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Torn API client.
///
/// Holds the query credential; request paths are logged without it.
pub struct TornClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TornClient {
    /// Create a new client with default configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(BASE_URL, api_key)
    }

    /// Create a new client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("chainwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.into(),
        }
    }

    /// GET a selection path, check both failure layers, and deserialize.
    ///
    /// `path` must already carry its query string; the key is appended last
    /// and never logged.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, WatchError> {
        debug!("Fetching from Torn API: {}", path);
        let url = format!("{}{}&key={}", self.base_url, path, self.api_key);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(WatchError::network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Network(format!(
                "API returned status {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(WatchError::network)?;

        if let Some(message) = app_error_message(&body) {
            return Err(WatchError::Api(message));
        }

        serde_json::from_value(body)
            .map_err(|e| WatchError::Api(format!("malformed payload: {}", e)))
    }
}

/// Extract the message from an application-level error payload, if present.
fn app_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    match serde_json::from_value::<ApiErrorBody>(error.clone()) {
        Ok(parsed) => Some(parsed.error),
        Err(_) => Some(error.to_string()),
    }
}

#[async_trait]
impl GameApi for TornClient {
    async fn fetch_chain(&self, faction_id: u32) -> Result<ChainState, WatchError> {
        let path = format!("/faction/{}?selections=chain", faction_id);
        let selection: ChainSelection = self.get(&path).await?;
        Ok(selection.chain.into_state())
    }

    async fn fetch_basic_profile(&self, xid: u64) -> Result<BasicProfile, WatchError> {
        let path = format!("/user/{}?selections=basic", xid);
        self.get(&path).await
    }
}
