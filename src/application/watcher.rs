//! Chain watching service.
//!
//! Owns the shared chain state and drives the two periodic loops: the
//! fetch poll (fixed wall-clock interval plus manual triggers) and the
//! one-second countdown tick. The countdown never keeps its own counter;
//! every tick recomputes remaining time from the authoritative end
//! timestamp, so event-loop jitter and missed ticks cannot drift it.

use crate::application::{TargetSampler, WarningNotifier};
use crate::domain::{ChainState, GameApi, SampledTarget, StatusSink};
use crate::infrastructure::{RateGate, RateGateSnapshot};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Watcher tuning, loaded from configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Faction whose chain is monitored.
    pub faction_id: u32,
    /// Period of the chain poll.
    pub refresh_interval: Duration,
    /// Remaining seconds at which the warning condition starts.
    pub warning_threshold: i64,
    /// Eligible targets collected per sampling episode.
    pub target_count: usize,
    /// Attempt budget per sampling episode.
    pub max_target_attempts: u32,
}

struct WatchState {
    chain: ChainState,
    countdown_active: bool,
    /// Edge-trigger latch: true while remaining time sits at or below the
    /// warning threshold. Sampling fires only on the false -> true edge.
    below_threshold: bool,
    targets: Vec<SampledTarget>,
    last_error: Option<String>,
    last_poll: Option<Instant>,
    episodes_started: u32,
}

/// Full point-in-time view for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct WatchSnapshot {
    pub active: bool,
    pub chain: ChainState,
    /// Seconds until chain expiry; 0 while no chain is active.
    pub remaining_secs: i64,
    pub status_line: String,
    /// Whether the expiring-chain banner is showing.
    pub warning: bool,
    pub targets: Vec<SampledTarget>,
    pub api: RateGateSnapshot,
    /// Seconds until the next scheduled poll.
    pub next_poll_in_secs: u64,
    pub last_error: Option<String>,
    pub sampling_episodes: u32,
}

/// The watcher service: poller, countdown clock, and episode trigger.
pub struct ChainWatcher {
    api: Arc<dyn GameApi>,
    gate: Arc<RateGate>,
    sampler: Arc<TargetSampler>,
    notifier: Arc<WarningNotifier>,
    status: Arc<dyn StatusSink>,
    config: WatcherConfig,
    state: Arc<Mutex<WatchState>>,
    /// Serializes scheduled and manual polls; a poll in flight is never
    /// started again, a waiting trigger runs after it.
    poll_lock: tokio::sync::Mutex<()>,
}

impl ChainWatcher {
    pub fn new(
        api: Arc<dyn GameApi>,
        gate: Arc<RateGate>,
        sampler: Arc<TargetSampler>,
        notifier: Arc<WarningNotifier>,
        status: Arc<dyn StatusSink>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            api,
            gate,
            sampler,
            notifier,
            status,
            config,
            state: Arc::new(Mutex::new(WatchState {
                chain: ChainState::idle(),
                countdown_active: false,
                below_threshold: false,
                targets: Vec::new(),
                last_error: None,
                last_poll: None,
                episodes_started: 0,
            })),
            poll_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the poll and countdown loops. Both stop when `shutdown`
    /// observes `true`.
    pub fn spawn_loops(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let poll = tokio::spawn(Self::poll_loop(Arc::clone(&self), shutdown.clone()));
        let tick = tokio::spawn(Self::tick_loop(self, shutdown));
        vec![poll, tick]
    }

    async fn poll_loop(watcher: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        // Initial fetch at startup, then the fixed-period schedule
        watcher.poll_once().await;

        let mut ticker = interval(watcher.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // the immediate first tick is covered above

        loop {
            tokio::select! {
                _ = ticker.tick() => watcher.poll_once().await,
                _ = shutdown.changed() => {
                    debug!("Poll loop stopping");
                    break;
                }
            }
        }
    }

    async fn tick_loop(watcher: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => watcher.tick(chrono::Utc::now().timestamp()),
                _ = shutdown.changed() => {
                    debug!("Countdown loop stopping");
                    break;
                }
            }
        }
    }

    /// Perform one chain poll.
    ///
    /// Skipped entirely while the gate is paused. Failures are logged and
    /// surfaced in the snapshot; prior chain state and the running
    /// countdown are left untouched.
    pub async fn poll_once(&self) {
        let _guard = self.poll_lock.lock().await;

        if self.gate.is_paused() {
            debug!("Skipping chain poll - API calls paused");
            return;
        }

        match self.api.fetch_chain(self.config.faction_id).await {
            Ok(chain) => {
                self.gate.register_call();
                debug!(current = chain.current, "Chain state refreshed");
                self.apply_chain(chain, chrono::Utc::now().timestamp());
            }
            Err(e) => {
                warn!("Error fetching chain data: {}", e);
                self.lock().last_error = Some(e.to_string());
            }
        }
    }

    /// Apply a freshly polled chain state.
    fn apply_chain(&self, chain: ChainState, now: i64) {
        let mut state = self.lock();
        state.chain = chain;
        state.last_error = None;
        state.last_poll = Some(Instant::now());

        if chain.is_active_at(now) {
            if !state.countdown_active {
                info!(
                    "Chain active: {} hits, {}s remaining",
                    chain.current,
                    chain.remaining_at(now)
                );
            }
            state.countdown_active = true;
            self.evaluate_threshold(&mut state, chain.remaining_at(now));
        } else {
            self.expire(&mut state);
        }
    }

    /// One countdown tick. Recomputes remaining time from the end
    /// timestamp; publishes the status line or, once the deadline has
    /// passed, stops the countdown.
    pub fn tick(&self, now: i64) {
        // Pause countdown surface: while the gate is paused the status
        // sink carries the resume counter instead of the chain line.
        let gate_snap = self.gate.snapshot();
        if gate_snap.paused {
            self.status.publish(&format!(
                "API calls paused. Resuming in {} seconds...",
                gate_snap.resume_in_secs
            ));
        }

        let mut state = self.lock();
        if !state.countdown_active {
            return;
        }

        let remaining = state.chain.remaining_at(now);
        if remaining > 0 {
            let line = format!(
                "Chain: {} ({}m {}s)",
                state.chain.current,
                remaining / 60,
                remaining % 60
            );
            self.status.publish(&line);
            self.evaluate_threshold(&mut state, remaining);
        } else {
            info!("Chain expired");
            self.expire(&mut state);
        }
    }

    /// Threshold handling, shared by tick and poll paths.
    ///
    /// Entering the below-threshold condition starts exactly one sampling
    /// episode and arms the warning; while it holds, repeated raises are
    /// throttled by the notifier's cooldown; leaving it (a fresh poll
    /// extended the chain) disarms everything for the next entry.
    fn evaluate_threshold(&self, state: &mut WatchState, remaining: i64) {
        if remaining <= self.config.warning_threshold {
            if !state.below_threshold {
                state.below_threshold = true;
                self.start_episode(state);
            }
            self.notifier.raise();
        } else if state.below_threshold {
            state.below_threshold = false;
            state.targets.clear();
            self.notifier.clear();
        }
    }

    /// Transition to the no-active-chain state.
    fn expire(&self, state: &mut WatchState) {
        state.countdown_active = false;
        state.below_threshold = false;
        state.targets.clear();
        self.notifier.clear();
        self.status.publish("No active chain");
    }

    /// Start a sampling episode in the background.
    fn start_episode(&self, state: &mut WatchState) {
        state.episodes_started += 1;
        info!("Starting target sampling episode #{}", state.episodes_started);

        let sampler = Arc::clone(&self.sampler);
        let shared = Arc::clone(&self.state);
        let (max_targets, max_attempts) =
            (self.config.target_count, self.config.max_target_attempts);
        tokio::spawn(async move {
            let targets = sampler.sample(max_targets, max_attempts).await;
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .targets = targets;
        });
    }

    /// Manually request a fresh batch of targets.
    pub fn pull_targets(&self) {
        let mut state = self.lock();
        self.start_episode(&mut state);
    }

    /// Current view for the status surface.
    pub fn snapshot(&self) -> WatchSnapshot {
        let now = chrono::Utc::now().timestamp();
        let state = self.lock();

        let remaining = if state.countdown_active {
            state.chain.remaining_at(now).max(0)
        } else {
            0
        };
        let status_line = if state.countdown_active && remaining > 0 {
            format!(
                "Chain: {} ({}m {}s)",
                state.chain.current,
                remaining / 60,
                remaining % 60
            )
        } else {
            "No active chain".to_string()
        };

        let next_poll_in_secs = state
            .last_poll
            .map(|at| {
                self.config
                    .refresh_interval
                    .saturating_sub(at.elapsed())
                    .as_secs()
            })
            .unwrap_or(0);

        WatchSnapshot {
            active: state.countdown_active,
            chain: state.chain,
            remaining_secs: remaining,
            status_line,
            warning: self.notifier.banner_active(),
            targets: state.targets.clone(),
            api: self.gate.snapshot(),
            next_poll_in_secs,
            last_error: state.last_error.clone(),
            sampling_episodes: state.episodes_started,
        }
    }
}
