//! Run-scoped metadata cache
//!
//! Memoizes fetch outcomes by normalized identifier for the lifetime of one
//! run. Entries are write-once: if two workers race on the same key, the
//! first insert wins and the duplicate result is discarded (lookups are
//! read-only, so this is never a correctness issue). No eviction.

use crate::types::FetchOutcome;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Shared identifier -> outcome cache.
#[derive(Default)]
pub struct MetadataCache {
    inner: RwLock<HashMap<String, FetchOutcome>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, identifier: &str) -> Option<FetchOutcome> {
        self.inner.read().await.get(identifier).cloned()
    }

    /// Insert unless the key is already present; returns the winning entry.
    pub async fn insert_if_absent(&self, identifier: &str, outcome: FetchOutcome) -> FetchOutcome {
        let mut map = self.inner.write().await;
        map.entry(identifier.to_string())
            .or_insert(outcome)
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Freeze the cache into a plain map for the sequential rewrite pass.
    pub async fn snapshot(&self) -> HashMap<String, FetchOutcome> {
        self.inner.read().await.clone()
    }
}
