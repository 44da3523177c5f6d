//! # dte-store — Persistence Contracts
//!
//! The pipeline talks to persistence through three traits:
//!
//! - [`CredentialStore`]: signing credentials by business and environment.
//! - [`DocumentStore`]: document records and fiscal response records, both
//!   keyed by generation code.
//! - [`AccumulatorStore`]: monthly accumulators, one row per
//!   (business, period, scope).
//!
//! Every write is an upsert keyed by an idempotency key, so replaying a
//! run overwrites rather than duplicates.
//!
//! Implementations: [`memory`] for tests and embedding, [`dir`] for a
//! JSON-file-per-record layout on local disk.

pub mod dir;
pub mod error;
pub mod memory;
pub mod records;

use async_trait::async_trait;

use dte_core::{BusinessId, Environment, GenerationCode, PeriodKey};
use dte_tax::MonthlyAccumulator;

pub use dir::JsonDirStore;
pub use error::StoreError;
pub use memory::{InMemoryAccumulatorStore, InMemoryCredentialStore, InMemoryDocumentStore, Store};
pub use records::{CredentialRecord, DocumentClass, DocumentRecord, DocumentState, ResponseRecord};

/// Signing credential lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn resolve(
        &self,
        business_id: &BusinessId,
        environment: Environment,
    ) -> Result<Option<CredentialRecord>, StoreError>;
}

/// Document and fiscal response records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the record for `record.generation_code`.
    async fn upsert(&self, record: DocumentRecord) -> Result<(), StoreError>;

    async fn get(&self, code: &GenerationCode) -> Result<Option<DocumentRecord>, StoreError>;

    /// Insert or replace the fiscal response record for
    /// `record.generation_code`.
    async fn upsert_response(&self, record: ResponseRecord) -> Result<(), StoreError>;

    async fn get_response(
        &self,
        code: &GenerationCode,
    ) -> Result<Option<ResponseRecord>, StoreError>;
}

/// Monthly accumulator rows.
#[async_trait]
pub trait AccumulatorStore: Send + Sync {
    async fn get(
        &self,
        business_id: &BusinessId,
        period: PeriodKey,
        scope: &str,
    ) -> Result<Option<MonthlyAccumulator>, StoreError>;

    /// Insert or replace the row for the accumulator's key.
    async fn upsert(&self, accumulator: MonthlyAccumulator) -> Result<(), StoreError>;

    /// All rows for a business in a calendar year, ordered by period.
    async fn list(
        &self,
        business_id: &BusinessId,
        year: i32,
    ) -> Result<Vec<MonthlyAccumulator>, StoreError>;

    /// Remove a row. Returns whether it existed.
    async fn delete(
        &self,
        business_id: &BusinessId,
        period: PeriodKey,
        scope: &str,
    ) -> Result<bool, StoreError>;
}

/// Unique key of an accumulator row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccumulatorKey {
    pub business_id: BusinessId,
    pub period: PeriodKey,
    pub scope: String,
}

impl AccumulatorKey {
    pub fn new(business_id: &BusinessId, period: PeriodKey, scope: &str) -> Self {
        Self {
            business_id: business_id.clone(),
            period,
            scope: scope.to_string(),
        }
    }

    pub fn of(accumulator: &MonthlyAccumulator) -> Self {
        Self::new(&accumulator.business_id, accumulator.period, &accumulator.scope)
    }
}
