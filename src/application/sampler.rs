//! Target sampling for below-threshold episodes.
//!
//! Draws candidates without replacement from the static pool, queries each
//! one's availability, and collects the eligible ones until the target
//! count is reached or the attempt budget runs out.

use crate::domain::{profile_url, GameApi, SampledTarget, TargetStatus};
use crate::infrastructure::{CandidatePool, RateGate};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Consecutive seen-id draws tolerated before concluding the pool is
/// exhausted for this episode.
const MAX_DRAW_RETRIES: u32 = 100;

/// Bounded random sampler over the candidate pool.
pub struct TargetSampler {
    api: Arc<dyn GameApi>,
    pool: Arc<CandidatePool>,
    gate: Arc<RateGate>,
    /// Delay between successive status queries, independent of the gate.
    request_delay: Duration,
}

impl TargetSampler {
    pub fn new(
        api: Arc<dyn GameApi>,
        pool: Arc<CandidatePool>,
        gate: Arc<RateGate>,
        request_delay: Duration,
    ) -> Self {
        Self {
            api,
            pool,
            gate,
            request_delay,
        }
    }

    /// Run one sampling episode.
    ///
    /// Collects up to `max_targets` eligible targets, spending at most
    /// `max_attempts` loop iterations; a query error still consumes its
    /// attempt. Each episode starts with a fresh seen-set, so ids checked
    /// in earlier episodes come back into play. Stops early when the rate
    /// gate pauses or the pool runs dry, returning whatever was collected
    /// in discovery order.
    pub async fn sample(&self, max_targets: usize, max_attempts: u32) -> Vec<SampledTarget> {
        let mut seen: HashSet<u64> = HashSet::new();
        let mut found: Vec<SampledTarget> = Vec::new();
        let mut attempts = 0;

        while found.len() < max_targets && attempts < max_attempts {
            attempts += 1;

            if self.gate.is_paused() {
                info!("API calls paused - stopping target sampling early");
                break;
            }

            let Some(candidate) = self.pool.draw(&seen, MAX_DRAW_RETRIES) else {
                debug!("Candidate pool exhausted after {} attempts", attempts);
                break;
            };
            seen.insert(candidate.xid);
            let xid = candidate.xid;

            let profile = match self.api.fetch_basic_profile(xid).await {
                Ok(profile) => {
                    self.gate.register_call();
                    profile
                }
                Err(e) => {
                    warn!("Error fetching target {}: {}", xid, e);
                    continue;
                }
            };

            let now = chrono::Utc::now().timestamp();
            let status = profile.classify();
            let label = status.label(now);

            if status == TargetStatus::Okay {
                debug!("Found available target: {} ({})", xid, profile.display_name());
                found.push(SampledTarget {
                    xid,
                    name: profile.display_name(),
                    status,
                    label,
                    profile_url: profile_url(xid),
                });
            } else {
                debug!("Target {} not available: {}", xid, label);
            }

            tokio::time::sleep(self.request_delay).await;
        }

        info!(
            "Found {} available targets after {} attempts",
            found.len(),
            attempts
        );
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BasicProfile, Candidate, MockGameApi, PlayerStatus, WatchError};
    use tokio::time::Duration;

    const DELAY: Duration = Duration::from_millis(100);

    fn pool_of(ids: &[u64]) -> Arc<CandidatePool> {
        Arc::new(CandidatePool::from_candidates(
            ids.iter()
                .map(|&xid| Candidate { xid, name: None })
                .collect(),
        ))
    }

    fn profile(state: &str) -> BasicProfile {
        BasicProfile {
            name: Some("Player".to_string()),
            status: Some(PlayerStatus {
                state: Some(state.to_string()),
                until: 0,
            }),
        }
    }

    fn gate() -> Arc<RateGate> {
        Arc::new(RateGate::new(90, Duration::from_secs(60)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_exhaustion_bounds_the_result() {
        let mut api = MockGameApi::new();
        api.expect_fetch_basic_profile()
            .times(5)
            .returning(|_| Ok(profile("Okay")));

        let sampler = TargetSampler::new(Arc::new(api), pool_of(&[1, 2, 3, 4, 5]), gate(), DELAY);
        let targets = sampler.sample(10, 50).await;

        // All five pool members eligible; the episode terminates at exhaustion
        assert_eq!(targets.len(), 5);
        let mut ids: Vec<u64> = targets.iter().map(|t| t.xid).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_eligible_targets_collected() {
        let mut api = MockGameApi::new();
        api.expect_fetch_basic_profile()
            .returning(|xid| match xid {
                1 | 3 => Ok(profile("Okay")),
                2 => Ok(profile("Hospital")),
                _ => Ok(profile("Traveling")),
            });

        let sampler = TargetSampler::new(Arc::new(api), pool_of(&[1, 2, 3, 4]), gate(), DELAY);
        let targets = sampler.sample(10, 50).await;

        let mut ids: Vec<u64> = targets.iter().map(|t| t.xid).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
        assert!(targets.iter().all(|t| t.status == TargetStatus::Okay));
        assert!(targets
            .iter()
            .all(|t| t.profile_url.starts_with("https://www.torn.com/")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_max_targets() {
        let mut api = MockGameApi::new();
        api.expect_fetch_basic_profile()
            .times(2)
            .returning(|_| Ok(profile("Okay")));

        let sampler = TargetSampler::new(Arc::new(api), pool_of(&[1, 2, 3, 4, 5]), gate(), DELAY);
        let targets = sampler.sample(2, 50).await;
        assert_eq!(targets.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_consume_attempts() {
        let mut api = MockGameApi::new();
        api.expect_fetch_basic_profile()
            .times(3)
            .returning(|_| Err(WatchError::Network("boom".to_string())));

        let sampler = TargetSampler::new(Arc::new(api), pool_of(&[1, 2, 3, 4, 5]), gate(), DELAY);
        let targets = sampler.sample(10, 3).await;
        assert!(targets.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_gate_stops_sampling_immediately() {
        let api = MockGameApi::new(); // no calls expected
        let gate = Arc::new(RateGate::new(1, Duration::from_secs(60)));
        gate.register_call(); // limit hit - gate paused

        let sampler = TargetSampler::new(Arc::new(api), pool_of(&[1, 2, 3]), gate, DELAY);
        let targets = sampler.sample(10, 50).await;
        assert!(targets.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pool_yields_empty_result() {
        let api = MockGameApi::new();
        let sampler =
            TargetSampler::new(Arc::new(api), Arc::new(CandidatePool::empty()), gate(), DELAY);
        let targets = sampler.sample(10, 50).await;
        assert!(targets.is_empty());
    }
}
