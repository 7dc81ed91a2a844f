//! Cached AI-service health state, shared by every `ScoreClient` caller so
//! concurrent requests do not stampede the probe endpoint.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::ai_client::RemoteScoring;

/// Escalating per-attempt timeout budgets for a cold probe. The service
/// gets progressively more patience before being declared unhealthy.
const PROBE_TIMEOUTS: [Duration; 3] = [
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
];

#[derive(Debug, Clone, Copy)]
struct HealthSample {
    healthy: bool,
    checked_at: Instant,
}

/// Process-wide health cache with a freshness window. Constructed once and
/// handed to every `ScoreClient` by reference — no module-level globals.
pub struct HealthMonitor {
    window: Duration,
    sample: RwLock<Option<HealthSample>>,
    /// Serializes the cold path so simultaneous misses run one probe
    /// ladder, not one per caller.
    probe_gate: tokio::sync::Mutex<()>,
}

impl HealthMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            sample: RwLock::new(None),
            probe_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the cached result while it is fresh, unless `force` is set.
    /// On a miss, probes with increasing timeout budgets and caches the
    /// outcome (healthy or not) for subsequent callers.
    pub async fn probe(&self, remote: &dyn RemoteScoring, force: bool) -> bool {
        if !force {
            if let Some(fresh) = self.cached() {
                return fresh;
            }
        }

        let _gate = self.probe_gate.lock().await;
        // A caller that held the gate may have refreshed the sample while
        // we waited for it.
        if !force {
            if let Some(fresh) = self.cached() {
                return fresh;
            }
        }

        let healthy = self.probe_uncached(remote).await;
        let mut guard = self.sample.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(HealthSample {
            healthy,
            checked_at: Instant::now(),
        });
        healthy
    }

    /// Cached value if still inside the freshness window.
    pub fn cached(&self) -> Option<bool> {
        let guard = self.sample.read().unwrap_or_else(|e| e.into_inner());
        (*guard)
            .filter(|s| s.checked_at.elapsed() < self.window)
            .map(|s| s.healthy)
    }

    async fn probe_uncached(&self, remote: &dyn RemoteScoring) -> bool {
        for (attempt, timeout) in PROBE_TIMEOUTS.iter().enumerate() {
            if remote.health(*timeout).await {
                info!(attempt, "AI service healthy");
                return true;
            }
            warn!(attempt, timeout_s = timeout.as_secs(), "AI service probe attempt failed");
        }
        warn!("AI service declared unhealthy after {} probe attempts", PROBE_TIMEOUTS.len());
        false
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::ai_client::{AiError, ScorePayload};
    use crate::models::job::JobPosting;
    use crate::models::resume::ResumeProfile;

    struct CountingRemote {
        healthy: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteScoring for CountingRemote {
        async fn batch_score(
            &self,
            _resume: &ResumeProfile,
            _jobs: &[JobPosting],
        ) -> Result<Vec<ScorePayload>, AiError> {
            unimplemented!()
        }

        async fn single_score(
            &self,
            _resume: &ResumeProfile,
            _job: &JobPosting,
        ) -> Result<ScorePayload, AiError> {
            unimplemented!()
        }

        async fn rag_query(&self, _index_id: &str, _prompt: &str) -> Result<String, AiError> {
            unimplemented!()
        }

        async fn health(&self, _timeout: Duration) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.healthy
        }
    }

    #[tokio::test]
    async fn test_fresh_result_is_cached() {
        let remote = CountingRemote {
            healthy: true,
            calls: AtomicUsize::new(0),
        };
        let monitor = HealthMonitor::new(Duration::from_secs(60));

        assert!(monitor.probe(&remote, false).await);
        assert!(monitor.probe(&remote, false).await);
        // Second probe served from cache: only the first hit the remote.
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_bypasses_cache() {
        let remote = CountingRemote {
            healthy: true,
            calls: AtomicUsize::new(0),
        };
        let monitor = HealthMonitor::new(Duration::from_secs(60));

        monitor.probe(&remote, false).await;
        monitor.probe(&remote, true).await;
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unhealthy_exhausts_attempt_ladder_then_caches() {
        let remote = CountingRemote {
            healthy: false,
            calls: AtomicUsize::new(0),
        };
        let monitor = HealthMonitor::new(Duration::from_secs(60));

        assert!(!monitor.probe(&remote, false).await);
        assert_eq!(remote.calls.load(Ordering::SeqCst), PROBE_TIMEOUTS.len());

        // Negative results are cached too.
        assert!(!monitor.probe(&remote, false).await);
        assert_eq!(remote.calls.load(Ordering::SeqCst), PROBE_TIMEOUTS.len());
    }

    #[tokio::test]
    async fn test_concurrent_cold_misses_share_one_probe() {
        let remote = CountingRemote {
            healthy: true,
            calls: AtomicUsize::new(0),
        };
        let monitor = HealthMonitor::new(Duration::from_secs(60));

        let (a, b) = tokio::join!(
            monitor.probe(&remote, false),
            monitor.probe(&remote, false)
        );
        assert!(a && b);
        // The loser of the gate reads the winner's fresh sample.
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_window_reprobes() {
        let remote = CountingRemote {
            healthy: true,
            calls: AtomicUsize::new(0),
        };
        let monitor = HealthMonitor::new(Duration::from_millis(0));

        monitor.probe(&remote, false).await;
        monitor.probe(&remote, false).await;
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
    }
}
