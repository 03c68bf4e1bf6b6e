use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::json;

use crate::api::state::AppState;
use crate::application::WatchSnapshot;
use crate::domain::is_allowed_link;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub watcher: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        watcher: if state.watcher.is_some() {
            "running".to_string()
        } else {
            "unconfigured".to_string()
        },
    })
}

fn unconfigured() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "no API key configured" })),
    )
}

/// Full watcher snapshot: chain state, countdown, targets, rate-gate stats.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<WatchSnapshot>, (StatusCode, Json<serde_json::Value>)> {
    match &state.watcher {
        Some(watcher) => Ok(Json(watcher.snapshot())),
        None => Err(unconfigured()),
    }
}

/// The currently displayed target list.
pub async fn targets_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match &state.watcher {
        Some(watcher) => {
            let snapshot = watcher.snapshot();
            // Outbound links must pass the host allow-list before being
            // handed to anything that opens them
            let targets: Vec<_> = snapshot
                .targets
                .into_iter()
                .filter(|t| is_allowed_link(&t.profile_url))
                .collect();
            Ok(Json(json!({
                "count": targets.len(),
                "targets": targets,
            })))
        }
        None => Err(unconfigured()),
    }
}

/// Manual poll trigger; returns the refreshed snapshot.
pub async fn refresh_handler(
    State(state): State<AppState>,
) -> Result<Json<WatchSnapshot>, (StatusCode, Json<serde_json::Value>)> {
    match &state.watcher {
        Some(watcher) => {
            tracing::info!("Manual refresh triggered");
            watcher.poll_once().await;
            Ok(Json(watcher.snapshot()))
        }
        None => Err(unconfigured()),
    }
}

/// Start a fresh sampling episode ("pull next targets").
pub async fn pull_targets_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    match &state.watcher {
        Some(watcher) => {
            tracing::info!("Pull next targets triggered");
            watcher.pull_targets();
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({ "status": "sampling started" })),
            ))
        }
        None => Err(unconfigured()),
    }
}
