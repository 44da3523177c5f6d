//! # In-Memory Stores
//!
//! Backed by `Arc<parking_lot::RwLock<HashMap>>`. Locks are never held
//! across an `.await`, so the synchronous lock is safe inside the async
//! trait methods. Clones share the same data.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use dte_core::{BusinessId, Environment, GenerationCode, PeriodKey};
use dte_tax::MonthlyAccumulator;

use crate::error::StoreError;
use crate::records::{CredentialRecord, DocumentRecord, ResponseRecord};
use crate::{AccumulatorKey, AccumulatorStore, CredentialStore, DocumentStore};

// -- Generic Store ------------------------------------------------------------

/// Thread-safe keyed map.
pub struct Store<K, V> {
    data: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash, V: Clone> Store<K, V> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.data.write().remove(key)
    }

    /// Records matching a predicate.
    pub fn filter(&self, f: impl Fn(&K, &V) -> bool) -> Vec<V> {
        self.data
            .read()
            .iter()
            .filter(|(k, v)| f(k, v))
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, V: Clone> Default for Store<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Credentials --------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Store<(BusinessId, Environment), CredentialRecord>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: CredentialRecord) {
        self.records
            .insert((record.business_id.clone(), record.environment), record);
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn resolve(
        &self,
        business_id: &BusinessId,
        environment: Environment,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.get(&(business_id.clone(), environment)))
    }
}

// -- Documents ----------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Store<GenerationCode, DocumentRecord>,
    responses: Store<GenerationCode, ResponseRecord>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upsert(&self, record: DocumentRecord) -> Result<(), StoreError> {
        self.documents.insert(record.generation_code.clone(), record);
        Ok(())
    }

    async fn get(&self, code: &GenerationCode) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self.documents.get(code))
    }

    async fn upsert_response(&self, record: ResponseRecord) -> Result<(), StoreError> {
        self.responses.insert(record.generation_code.clone(), record);
        Ok(())
    }

    async fn get_response(
        &self,
        code: &GenerationCode,
    ) -> Result<Option<ResponseRecord>, StoreError> {
        Ok(self.responses.get(code))
    }
}

// -- Accumulators -------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryAccumulatorStore {
    accumulators: Store<AccumulatorKey, MonthlyAccumulator>,
}

impl InMemoryAccumulatorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccumulatorStore for InMemoryAccumulatorStore {
    async fn get(
        &self,
        business_id: &BusinessId,
        period: PeriodKey,
        scope: &str,
    ) -> Result<Option<MonthlyAccumulator>, StoreError> {
        Ok(self
            .accumulators
            .get(&AccumulatorKey::new(business_id, period, scope)))
    }

    async fn upsert(&self, accumulator: MonthlyAccumulator) -> Result<(), StoreError> {
        self.accumulators
            .insert(AccumulatorKey::of(&accumulator), accumulator);
        Ok(())
    }

    async fn list(
        &self,
        business_id: &BusinessId,
        year: i32,
    ) -> Result<Vec<MonthlyAccumulator>, StoreError> {
        let mut found = self
            .accumulators
            .filter(|k, _| &k.business_id == business_id && k.period.year() == year);
        found.sort_by(|a, b| (a.period, &a.scope).cmp(&(b.period, &b.scope)));
        Ok(found)
    }

    async fn delete(
        &self,
        business_id: &BusinessId,
        period: PeriodKey,
        scope: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .accumulators
            .remove(&AccumulatorKey::new(business_id, period, scope))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dte_core::Secret;

    fn business() -> BusinessId {
        BusinessId::new("06140101901013").unwrap()
    }

    fn acc(month: u32) -> MonthlyAccumulator {
        MonthlyAccumulator::empty(
            business(),
            PeriodKey::new(2024, month).unwrap(),
            Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap(),
        )
    }

    // -- Store tests ----------------------------------------------------------

    #[test]
    fn store_clones_share_data() {
        let a: Store<u32, String> = Store::new();
        let b = a.clone();
        a.insert(1, "x".into());
        assert_eq!(b.get(&1).as_deref(), Some("x"));
        assert_eq!(b.len(), 1);
        assert!(b.remove(&1).is_some());
        assert!(a.is_empty());
    }

    // -- Credential tests -----------------------------------------------------

    #[tokio::test]
    async fn credentials_are_keyed_by_environment() {
        let store = InMemoryCredentialStore::new();
        store.insert(CredentialRecord {
            business_id: business(),
            environment: Environment::Sandbox,
            password: Some(Secret::new("pw")),
            api_token: None,
            active: true,
        });
        assert!(store
            .resolve(&business(), Environment::Sandbox)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .resolve(&business(), Environment::Production)
            .await
            .unwrap()
            .is_none());
    }

    // -- Accumulator tests ----------------------------------------------------

    #[tokio::test]
    async fn accumulator_upsert_keeps_one_row_per_key() {
        let store = InMemoryAccumulatorStore::new();
        let mut a = acc(1);
        store.upsert(a.clone()).await.unwrap();
        a.document_count = 3;
        store.upsert(a.clone()).await.unwrap();
        let got = store
            .get(&business(), a.period, "ALL")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.document_count, 3);
        assert_eq!(store.list(&business(), 2024).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accumulator_list_is_sorted_by_period() {
        let store = InMemoryAccumulatorStore::new();
        for m in [3, 1, 2] {
            store.upsert(acc(m)).await.unwrap();
        }
        let months: Vec<u32> = store
            .list(&business(), 2024)
            .await
            .unwrap()
            .iter()
            .map(|a| a.period.month())
            .collect();
        assert_eq!(months, vec![1, 2, 3]);
        assert!(store.list(&business(), 2023).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accumulator_delete() {
        let store = InMemoryAccumulatorStore::new();
        store.upsert(acc(5)).await.unwrap();
        let period = PeriodKey::new(2024, 5).unwrap();
        assert!(store.delete(&business(), period, "ALL").await.unwrap());
        assert!(!store.delete(&business(), period, "ALL").await.unwrap());
    }
}
