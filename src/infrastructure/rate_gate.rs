//! Rate gate for Torn API requests.
//!
//! Tracks call volume in a sliding window and exposes a paused/active flag
//! with automatic resumption. Callers consult `is_paused()` before issuing
//! any request and skip the call entirely (not queue it) while paused.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct GateState {
    call_count: u32,
    window_start: Option<Instant>,
    paused_until: Option<Instant>,
}

impl GateState {
    fn reset(now: Instant) -> Self {
        GateState {
            call_count: 0,
            window_start: Some(now),
            paused_until: None,
        }
    }
}

/// Sliding-window call accounting with pause/auto-resume.
///
/// Pure local bookkeeping; never fails. Window boundary semantics are
/// strict: the window resets only once it has fully elapsed, and the gate
/// pauses only when the limit-th call lands before it elapses.
pub struct RateGate {
    limit: u32,
    window: Duration,
    state: Mutex<GateState>,
}

/// Point-in-time gate statistics for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct RateGateSnapshot {
    pub calls: u32,
    pub limit: u32,
    pub paused: bool,
    /// Seconds until calls resume; 0 while active.
    pub resume_in_secs: u64,
}

impl RateGate {
    /// Create a gate allowing `limit` calls per `window`.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(GateState {
                call_count: 0,
                window_start: None,
                paused_until: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear a pause whose deadline has passed, starting a clean window.
    fn clear_elapsed_pause(state: &mut GateState, now: Instant) {
        if let Some(until) = state.paused_until {
            if now >= until {
                *state = GateState::reset(now);
            }
        }
    }

    /// Account for one outbound API call that just completed.
    ///
    /// The first call after a reset opens the window. Once the window has
    /// fully elapsed the counters reset; otherwise the limit-th call inside
    /// the window pauses the gate for the remainder of the window, rounded
    /// up to whole seconds.
    pub fn register_call(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        Self::clear_elapsed_pause(&mut state, now);

        state.call_count += 1;
        let start = *state.window_start.get_or_insert(now);
        let elapsed = now.duration_since(start);

        if elapsed > self.window {
            *state = GateState::reset(now);
        } else if state.call_count >= self.limit {
            let remaining = self.window - elapsed;
            let pause_secs = (remaining.as_millis() as u64).div_ceil(1_000);
            state.paused_until = Some(now + Duration::from_secs(pause_secs));
            tracing::warn!(
                "API call limit reached ({} calls) - pausing for {}s",
                state.call_count,
                pause_secs
            );
        }
    }

    /// Whether outbound calls are currently suppressed.
    ///
    /// Self-clears once the pause deadline passes, so no separate resume
    /// timer is needed.
    pub fn is_paused(&self) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        Self::clear_elapsed_pause(&mut state, now);
        state.paused_until.is_some()
    }

    /// Current gate statistics.
    pub fn snapshot(&self) -> RateGateSnapshot {
        let now = Instant::now();
        let mut state = self.lock();
        Self::clear_elapsed_pause(&mut state, now);

        let resume_in_secs = state
            .paused_until
            .map(|until| {
                let remaining = until.saturating_duration_since(now);
                (remaining.as_millis() as u64).div_ceil(1_000)
            })
            .unwrap_or(0);

        RateGateSnapshot {
            calls: state.call_count,
            limit: self.limit,
            paused: state.paused_until.is_some(),
            resume_in_secs,
        }
    }
}
