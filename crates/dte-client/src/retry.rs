//! Wake loop for the signing service.
//!
//! The signing service sleeps when idle. Before signing, the pipeline
//! probes its health endpoint a bounded number of times with a linearly
//! growing delay (`base × attempt`). The loop never fails: if the service
//! stays silent the caller proceeds and lets the sign call decide.

use std::future::Future;
use std::time::Duration;

/// Default number of health probes.
pub const DEFAULT_WAKE_ATTEMPTS: u32 = 3;

/// Default base delay between probes.
pub const DEFAULT_WAKE_BASE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakePolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for WakePolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_WAKE_ATTEMPTS,
            base_delay: DEFAULT_WAKE_BASE_DELAY,
        }
    }
}

/// Probe until `probe` answers `true` or attempts run out. Returns whether
/// the service answered.
pub async fn wake<F, Fut>(policy: WakePolicy, probe: F) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=policy.attempts {
        if probe().await {
            tracing::info!(attempt, "signing service is awake");
            return true;
        }
        tracing::warn!(
            attempt,
            max_attempts = policy.attempts,
            "signing service health probe failed"
        );
        if attempt < policy.attempts {
            tokio::time::sleep(policy.base_delay * attempt).await;
        }
    }
    tracing::warn!("signing service did not answer health probes, continuing");
    false
}
