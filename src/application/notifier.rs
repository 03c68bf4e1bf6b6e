//! Throttled chain-expiry warnings.
//!
//! A persistent banner flag tracks whether the warning condition currently
//! holds; the out-of-band alert is throttled by a cooldown so repeated
//! raises while the chain stays below threshold do not spam the channel.

use crate::domain::AlertSink;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{Duration, Instant};

struct NotifierState {
    last_fired: Option<Instant>,
    banner: bool,
}

/// Cooldown-gated warning dispatch.
pub struct WarningNotifier {
    sink: Arc<dyn AlertSink>,
    cooldown: Duration,
    title: String,
    body: String,
    state: Mutex<NotifierState>,
}

impl WarningNotifier {
    /// Create a notifier announcing that the chain timer has reached
    /// `threshold_secs`.
    pub fn new(sink: Arc<dyn AlertSink>, cooldown: Duration, threshold_secs: i64) -> Self {
        Self {
            sink,
            cooldown,
            title: "CHAIN EXPIRING!".to_string(),
            body: format!(
                "The chain timer has reached {:.1} minutes!",
                threshold_secs as f64 / 60.0
            ),
            state: Mutex::new(NotifierState {
                last_fired: None,
                banner: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise the warning. Idempotent within the cooldown window: the banner
    /// flag is always set, the out-of-band alert fires at most once per
    /// cooldown.
    pub fn raise(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        state.banner = true;

        let due = state
            .last_fired
            .map_or(true, |last| now.duration_since(last) >= self.cooldown);
        if due {
            self.sink.alert(&self.title, &self.body);
            state.last_fired = Some(now);
        }
    }

    /// Drop the banner. Cooldown bookkeeping is untouched, so a re-raise
    /// shortly after still respects the window.
    pub fn clear(&self) {
        self.lock().banner = false;
    }

    /// Whether the warning banner is currently showing.
    pub fn banner_active(&self) -> bool {
        self.lock().banner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockAlertSink;
    use tokio::time::advance;

    const COOLDOWN: Duration = Duration::from_secs(10);

    fn notifier_expecting(alerts: usize) -> WarningNotifier {
        let mut sink = MockAlertSink::new();
        sink.expect_alert()
            .withf(|title, body| title == "CHAIN EXPIRING!" && body.contains("2.5 minutes"))
            .times(alerts)
            .return_const(());
        WarningNotifier::new(Arc::new(sink), COOLDOWN, 150)
    }

    #[tokio::test(start_paused = true)]
    async fn test_raises_inside_cooldown_dispatch_once() {
        let notifier = notifier_expecting(1);

        notifier.raise();
        advance(Duration::from_secs(5)).await;
        notifier.raise();

        assert!(notifier.banner_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_raises_past_cooldown_dispatch_twice() {
        let notifier = notifier_expecting(2);

        notifier.raise();
        advance(Duration::from_secs(11)).await;
        notifier.raise();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_banner_but_keeps_cooldown() {
        let notifier = notifier_expecting(1);

        notifier.raise();
        notifier.clear();
        assert!(!notifier.banner_active());

        // Still inside the cooldown: banner returns, no second alert
        advance(Duration::from_secs(3)).await;
        notifier.raise();
        assert!(notifier.banner_active());
    }
}
