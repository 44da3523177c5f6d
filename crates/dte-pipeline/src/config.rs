//! Orchestrator settings.

use std::time::Duration;

use dte_client::{ConfigError, WakePolicy};
use dte_state::MAX_TRANSMIT_RETRIES;

/// Default bound on any single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// In-place transmission retries before contingency. Never above
    /// [`MAX_TRANSMIT_RETRIES`].
    pub max_transmit_retries: u32,
    /// Health probes sent to the signing service before signing.
    pub wake: WakePolicy,
    /// Timeout wrapped around every collaborator call.
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_transmit_retries: MAX_TRANSMIT_RETRIES,
            wake: WakePolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Load from environment variables, falling back to the defaults.
    ///
    /// Variables:
    /// - `DTE_TRANSMIT_RETRIES` (0 to 2, default: 2)
    /// - `DTE_WAKE_ATTEMPTS` (default: 3)
    /// - `DTE_WAKE_BASE_DELAY_MS` (default: 2000)
    /// - `DTE_CALL_TIMEOUT_SECS` (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let retries = env_number("DTE_TRANSMIT_RETRIES", u64::from(MAX_TRANSMIT_RETRIES))?;
        if retries > u64::from(MAX_TRANSMIT_RETRIES) {
            return Err(ConfigError::InvalidValue {
                var: "DTE_TRANSMIT_RETRIES",
                value: retries.to_string(),
            });
        }
        Ok(Self {
            max_transmit_retries: retries as u32,
            wake: WakePolicy {
                attempts: env_number("DTE_WAKE_ATTEMPTS", u64::from(defaults.wake.attempts))?
                    as u32,
                base_delay: Duration::from_millis(env_number(
                    "DTE_WAKE_BASE_DELAY_MS",
                    defaults.wake.base_delay.as_millis() as u64,
                )?),
            },
            call_timeout: Duration::from_secs(env_number(
                "DTE_CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )?),
        })
    }

    /// The retry cap actually enforced.
    pub fn retry_cap(&self) -> u32 {
        self.max_transmit_retries.min(MAX_TRANSMIT_RETRIES)
    }
}

fn env_number(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_processing_policy() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.retry_cap(), 2);
        assert_eq!(cfg.wake.attempts, 3);
        assert_eq!(cfg.wake.base_delay, Duration::from_millis(2000));
        assert_eq!(cfg.call_timeout, Duration::from_secs(60));
    }

    #[test]
    fn retry_cap_never_exceeds_hard_limit() {
        let cfg = PipelineConfig {
            max_transmit_retries: 9,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.retry_cap(), MAX_TRANSMIT_RETRIES);
    }

    #[test]
    fn env_number_rejects_garbage() {
        std::env::set_var("DTE_TEST_PIPELINE_NUMBER", "soon");
        assert!(matches!(
            env_number("DTE_TEST_PIPELINE_NUMBER", 1),
            Err(ConfigError::InvalidValue { .. })
        ));
        std::env::remove_var("DTE_TEST_PIPELINE_NUMBER");
        assert_eq!(env_number("DTE_TEST_PIPELINE_NUMBER", 7).unwrap(), 7);
    }
}
