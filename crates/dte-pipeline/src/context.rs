//! What stages get to work with.

use std::future::Future;
use std::sync::Arc;

use tokio::time::error::Elapsed;

use dte_client::{Signer, Transmitter};
use dte_core::{Clock, SystemClock};
use dte_schema::DocumentValidator;
use dte_store::{AccumulatorStore, CredentialStore, DocumentStore};

use crate::config::PipelineConfig;
use crate::metrics::PipelineMetrics;

/// External collaborators, held as trait objects.
#[derive(Clone)]
pub struct Collaborators {
    pub signer: Arc<dyn Signer>,
    pub transmitter: Arc<dyn Transmitter>,
    pub credentials: Arc<dyn CredentialStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub accumulators: Arc<dyn AccumulatorStore>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Collaborators reading the wall clock.
    pub fn new(
        signer: Arc<dyn Signer>,
        transmitter: Arc<dyn Transmitter>,
        credentials: Arc<dyn CredentialStore>,
        documents: Arc<dyn DocumentStore>,
        accumulators: Arc<dyn AccumulatorStore>,
    ) -> Self {
        Self {
            signer,
            transmitter,
            credentials,
            documents,
            accumulators,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Borrowed view handed to each stage.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub collaborators: &'a Collaborators,
    pub validator: &'a DocumentValidator,
    pub config: &'a PipelineConfig,
    pub metrics: &'a PipelineMetrics,
}

impl StageContext<'_> {
    /// Run a collaborator call under the configured timeout.
    pub async fn bounded<F: Future>(&self, call: F) -> Result<F::Output, Elapsed> {
        tokio::time::timeout(self.config.call_timeout, call).await
    }
}
