//! Key-value configuration storage and recommendation log.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{RecommendationKind, RecommendationRecord};

/// Opaque blob storage used for engine configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// In-memory config store.
#[derive(Default)]
pub struct MemoryConfigStore {
    values: DashMap<String, Vec<u8>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Filter for reading back stored recommendations.
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub kind: Option<RecommendationKind>,
    pub trader_id: Option<String>,
    pub limit: Option<u32>,
}

impl RecommendationFilter {
    pub const DEFAULT_LIMIT: u32 = 20;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: RecommendationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn trader(mut self, trader_id: impl Into<String>) -> Self {
        self.trader_id = Some(trader_id.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &RecommendationRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(ref trader) = self.trader_id {
            if record.trader_id.as_ref() != Some(trader) {
                return false;
            }
        }
        true
    }
}

/// Append-only log of advisor recommendations.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Store a record and return its assigned id.
    async fn save(&self, record: &RecommendationRecord) -> Result<i64>;

    /// Matching records, newest first.
    async fn latest(&self, filter: &RecommendationFilter) -> Result<Vec<RecommendationRecord>>;
}

/// In-memory recommendation log.
pub struct MemoryRecommendationStore {
    records: Arc<RwLock<Vec<RecommendationRecord>>>,
    next_id: AtomicI64,
}

impl MemoryRecommendationStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryRecommendationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecommendationStore for MemoryRecommendationStore {
    async fn save(&self, record: &RecommendationRecord) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = record.clone();
        stored.id = id;

        self.records.write().await.push(stored);
        Ok(id)
    }

    async fn latest(&self, filter: &RecommendationFilter) -> Result<Vec<RecommendationRecord>> {
        let records = self.records.read().await;
        let limit = filter.limit.unwrap_or(RecommendationFilter::DEFAULT_LIMIT) as usize;

        let mut matching: Vec<RecommendationRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matching.truncate(limit);

        Ok(matching)
    }
}
