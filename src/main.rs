//! chainwatch - headless chain watcher for Torn
//!
//! Polls the public Torn API for the monitored faction's chain state,
//! counts down to chain expiry without drift, samples attackable targets
//! from a static candidate pool when the chain is about to drop, and
//! raises throttled warnings. A small HTTP surface exposes the live
//! snapshot for any front end to render.
//!
//! # Architecture
//!
//! The service follows clean/onion architecture with clear separation of
//! concerns:
//! - **Domain**: chain/target entities and collaborator traits
//! - **Application**: watcher state machine, sampler, notifier
//! - **Infrastructure**: Torn API client, rate gate, candidate pool, sinks
//! - **API**: HTTP handlers and routing for the status surface
//!
//! # Configuration
//!
//! Configured via `config.yaml` and environment variables:
//! - `TORN_API_KEY`: query credential for the Torn API (required for the
//!   watcher; without it only the HTTP surface runs)
//! - `RUST_LOG`: logging level (default: info)
//! - `LOG_FORMAT`: `text` (default) or `json`
//! - `PORT`: overrides the configured listen port
//!
//! # Quick Start
//!
//! ```bash
//! export TORN_API_KEY="your_key_here"
//!
//! cargo run --release
//!
//! curl http://localhost:3020/health
//! curl http://localhost:3020/v1/status
//! ```

use anyhow::Context;
use chainwatch::api::{create_router, AppState};
use chainwatch::application::{ChainWatcher, TargetSampler, WarningNotifier, WatcherConfig};
use chainwatch::domain::GameApi;
use chainwatch::infrastructure::{
    CandidatePool, LogAlertSink, LogStatusSink, RateGate, TornClient,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Top-level application configuration loaded from `config.yaml`.
#[derive(Deserialize, Debug, Clone, Default)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    watcher: WatcherSettings,
    #[serde(default)]
    rate_limit: RateLimitConfig,
}

/// Server configuration settings.
#[derive(Deserialize, Debug, Clone)]
struct ServerConfig {
    /// Host address to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    host: String,
    /// Port number to listen on (default: 3020)
    #[serde(default = "default_port")]
    port: u16,
    /// Comma-separated list of allowed CORS origins (default: "*")
    #[serde(default = "default_allowed_origins")]
    allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3020
}
fn default_allowed_origins() -> String {
    "*".to_string()
}

/// Watcher tuning.
#[derive(Deserialize, Debug, Clone)]
struct WatcherSettings {
    /// Faction whose chain is monitored
    #[serde(default = "default_faction_id")]
    faction_id: u32,
    /// Seconds between chain polls
    #[serde(default = "default_refresh_interval")]
    refresh_interval_secs: u64,
    /// Remaining seconds at which the expiring warning starts
    #[serde(default = "default_warning_threshold")]
    warning_threshold_secs: i64,
    /// Eligible targets collected per sampling episode
    #[serde(default = "default_target_count")]
    target_count: usize,
    /// Attempt budget per sampling episode
    #[serde(default = "default_max_target_attempts")]
    max_target_attempts: u32,
    /// Milliseconds between successive target status queries
    #[serde(default = "default_request_delay")]
    request_delay_ms: u64,
    /// Seconds between out-of-band expiry alerts
    #[serde(default = "default_notification_cooldown")]
    notification_cooldown_secs: u64,
    /// Path to the candidate pool JSON file
    #[serde(default = "default_candidate_pool")]
    candidate_pool: String,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            faction_id: default_faction_id(),
            refresh_interval_secs: default_refresh_interval(),
            warning_threshold_secs: default_warning_threshold(),
            target_count: default_target_count(),
            max_target_attempts: default_max_target_attempts(),
            request_delay_ms: default_request_delay(),
            notification_cooldown_secs: default_notification_cooldown(),
            candidate_pool: default_candidate_pool(),
        }
    }
}

fn default_faction_id() -> u32 {
    19
}
fn default_refresh_interval() -> u64 {
    10
}
fn default_warning_threshold() -> i64 {
    150
}
fn default_target_count() -> usize {
    10
}
fn default_max_target_attempts() -> u32 {
    50
}
fn default_request_delay() -> u64 {
    100
}
fn default_notification_cooldown() -> u64 {
    10
}
fn default_candidate_pool() -> String {
    "data.json".to_string()
}

/// Rate limiting configuration for the Torn API.
#[derive(Deserialize, Debug, Clone)]
struct RateLimitConfig {
    /// Maximum calls per window
    #[serde(default = "default_api_call_limit")]
    api_call_limit: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_call_limit: default_api_call_limit(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_api_call_limit() -> u32 {
    90
}
fn default_window_secs() -> u64 {
    60
}

fn load_config() -> Config {
    let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    match fs::read_to_string(&path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}, using defaults", path, e);
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read {}: {}, using defaults", path, e);
            Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = load_config();

    let api_key = env::var("TORN_API_KEY").ok().filter(|k| !k.trim().is_empty());
    if api_key.is_none() {
        tracing::warn!(
            "TORN_API_KEY not found in env - watcher disabled until a key is supplied. \
             The HTTP surface stays up and reports the unconfigured state."
        );
    }

    // Candidate pool: a load failure is logged and degrades sampling to
    // empty results rather than stopping the watcher
    let pool = match CandidatePool::load(&config.watcher.candidate_pool) {
        Ok(pool) => {
            tracing::info!(
                "Loaded {} candidates from {}",
                pool.len(),
                config.watcher.candidate_pool
            );
            Arc::new(pool)
        }
        Err(e) => {
            tracing::error!("Failed to load candidate pool: {}", e);
            Arc::new(CandidatePool::empty())
        }
    };

    let rate_gate = Arc::new(RateGate::new(
        config.rate_limit.api_call_limit,
        Duration::from_secs(config.rate_limit.window_secs),
    ));
    tracing::info!(
        "Rate gate initialized: {} calls per {}s window",
        config.rate_limit.api_call_limit,
        config.rate_limit.window_secs
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let watcher = api_key.map(|key| {
        let client: Arc<dyn GameApi> = Arc::new(TornClient::new(key));
        let sampler = Arc::new(TargetSampler::new(
            Arc::clone(&client),
            pool,
            Arc::clone(&rate_gate),
            Duration::from_millis(config.watcher.request_delay_ms),
        ));
        let notifier = Arc::new(WarningNotifier::new(
            Arc::new(LogAlertSink),
            Duration::from_secs(config.watcher.notification_cooldown_secs),
            config.watcher.warning_threshold_secs,
        ));
        Arc::new(ChainWatcher::new(
            client,
            rate_gate,
            sampler,
            notifier,
            Arc::new(LogStatusSink),
            WatcherConfig {
                faction_id: config.watcher.faction_id,
                refresh_interval: Duration::from_secs(config.watcher.refresh_interval_secs),
                warning_threshold: config.watcher.warning_threshold_secs,
                target_count: config.watcher.target_count,
                max_target_attempts: config.watcher.max_target_attempts,
            },
        ))
    });

    let watcher_handles = match &watcher {
        Some(watcher) => {
            tracing::info!(
                "Watching faction {} (poll every {}s, warning at {}s)",
                config.watcher.faction_id,
                config.watcher.refresh_interval_secs,
                config.watcher.warning_threshold_secs
            );
            Arc::clone(watcher).spawn_loops(shutdown_rx)
        }
        None => Vec::new(),
    };

    let state = AppState { watcher };
    let app = create_router(state, config.server.allowed_origins.clone());

    // Allow PORT env var override
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("chainwatch status surface running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error during operation")?;

    // Stop both watcher loops together; an in-flight poll is abandoned
    // rather than awaited
    let _ = shutdown_tx.send(true);
    for handle in watcher_handles {
        handle.abort();
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) to initiate graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
