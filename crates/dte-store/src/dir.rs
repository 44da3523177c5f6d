//! # JSON Directory Store
//!
//! One pretty-printed JSON file per record under a root directory:
//!
//! ```text
//! <root>/documents/<generation-code>.json
//! <root>/responses/<generation-code>.json
//! <root>/accumulators/<business>_<YYYY-MM>_<scope>.json
//! ```
//!
//! Writes go to a sibling temporary file and are renamed into place, so a
//! reader never sees a half-written record. Suitable for the CLI and for
//! single-process deployments; there is no cross-process locking.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use dte_core::{BusinessId, GenerationCode, PeriodKey};
use dte_tax::MonthlyAccumulator;

use crate::error::StoreError;
use crate::records::{DocumentRecord, ResponseRecord};
use crate::{AccumulatorKey, AccumulatorStore, DocumentStore};

const DOCUMENTS: &str = "documents";
const RESPONSES: &str = "responses";
const ACCUMULATORS: &str = "accumulators";

/// Directory-backed document and accumulator store.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for sub in [DOCUMENTS, RESPONSES, ACCUMULATORS] {
            tokio::fs::create_dir_all(root.join(sub)).await?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, sub: &str, name: &str) -> PathBuf {
        self.root.join(sub).join(format!("{name}.json"))
    }

    fn accumulator_name(key: &AccumulatorKey) -> String {
        format!("{}_{}_{}", key.business_id, key.period, key.scope)
    }

    async fn write<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(path = %path.display(), "record written");
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, path: PathBuf) -> Result<Option<T>, StoreError> {
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DocumentStore for JsonDirStore {
    async fn upsert(&self, record: DocumentRecord) -> Result<(), StoreError> {
        let path = self.path(DOCUMENTS, record.generation_code.as_str());
        self.write(path, &record).await
    }

    async fn get(&self, code: &GenerationCode) -> Result<Option<DocumentRecord>, StoreError> {
        self.read(self.path(DOCUMENTS, code.as_str())).await
    }

    async fn upsert_response(&self, record: ResponseRecord) -> Result<(), StoreError> {
        let path = self.path(RESPONSES, record.generation_code.as_str());
        self.write(path, &record).await
    }

    async fn get_response(
        &self,
        code: &GenerationCode,
    ) -> Result<Option<ResponseRecord>, StoreError> {
        self.read(self.path(RESPONSES, code.as_str())).await
    }
}

#[async_trait]
impl AccumulatorStore for JsonDirStore {
    async fn get(
        &self,
        business_id: &BusinessId,
        period: PeriodKey,
        scope: &str,
    ) -> Result<Option<MonthlyAccumulator>, StoreError> {
        let name = Self::accumulator_name(&AccumulatorKey::new(business_id, period, scope));
        self.read(self.path(ACCUMULATORS, &name)).await
    }

    async fn upsert(&self, accumulator: MonthlyAccumulator) -> Result<(), StoreError> {
        let name = Self::accumulator_name(&AccumulatorKey::of(&accumulator));
        self.write(self.path(ACCUMULATORS, &name), &accumulator).await
    }

    async fn list(
        &self,
        business_id: &BusinessId,
        year: i32,
    ) -> Result<Vec<MonthlyAccumulator>, StoreError> {
        let prefix = format!("{business_id}_{year:04}-");
        let mut entries = tokio::fs::read_dir(self.root.join(ACCUMULATORS)).await?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".json") {
                if let Some(acc) = self.read::<MonthlyAccumulator>(entry.path()).await? {
                    found.push(acc);
                }
            }
        }
        found.sort_by(|a, b| (a.period, &a.scope).cmp(&(b.period, &b.scope)));
        Ok(found)
    }

    async fn delete(
        &self,
        business_id: &BusinessId,
        period: PeriodKey,
        scope: &str,
    ) -> Result<bool, StoreError> {
        let name = Self::accumulator_name(&AccumulatorKey::new(business_id, period, scope));
        match tokio::fs::remove_file(self.path(ACCUMULATORS, &name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
