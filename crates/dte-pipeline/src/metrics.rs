//! Process-wide counters for the orchestrator.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use dte_state::RunOutcome;

/// Counters shared by every run of one orchestrator.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_contingency: AtomicU64,
    runs_failed: AtomicU64,
    transmit_attempts: AtomicU64,
    transmit_retries: AtomicU64,
    bookkeeping_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_contingency: u64,
    pub runs_failed: u64,
    pub transmit_attempts: u64,
    pub transmit_retries: u64,
    pub bookkeeping_failures: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn run_finished(&self, outcome: RunOutcome) {
        let counter = match outcome {
            RunOutcome::Completed => &self.runs_completed,
            RunOutcome::Contingency => &self.runs_contingency,
            RunOutcome::Failed => &self.runs_failed,
            RunOutcome::InProgress => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn transmit_attempt(&self) {
        self.transmit_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn transmit_retry(&self) {
        self.transmit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bookkeeping_failure(&self) {
        self.bookkeeping_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_contingency: self.runs_contingency.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            transmit_attempts: self.transmit_attempts.load(Ordering::Relaxed),
            transmit_retries: self.transmit_retries.load(Ordering::Relaxed),
            bookkeeping_failures: self.bookkeeping_failures.load(Ordering::Relaxed),
        }
    }
}
