//! Subscription and digest storage.
//!
//! The watcher reads subscriptions from a [`SubscriptionStore`] and keeps the
//! last observed digest of every watched tag in a [`DigestStore`]. Both are
//! trait seams so the poll cycle can run against the in-memory store in tests
//! and against the file-backed store in production.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tagwatch_core::{DigestKey, DigestPatch, DigestRecord, Subscription};

use crate::error::StoreError;

/// Source of subscription records.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Returns every subscription.
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;
}

/// Durable map from a tag's storage key to its last observed digest.
#[async_trait]
pub trait DigestStore: Send + Sync {
    /// Looks up the record stored under `key`.
    async fn get(&self, key: &DigestKey) -> Result<Option<DigestRecord>, StoreError>;

    /// Inserts a record; fails with [`StoreError::AlreadyExists`] if its key
    /// is taken.
    async fn insert(&self, record: &DigestRecord) -> Result<(), StoreError>;

    /// Applies `patch` to the record under `key`, leaving its other fields
    /// untouched; fails with [`StoreError::NotFound`] if there is none.
    async fn merge(&self, key: &DigestKey, patch: &DigestPatch) -> Result<(), StoreError>;
}

/// In-memory store implementing both storage traits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
    digests: Arc<RwLock<HashMap<DigestKey, DigestRecord>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given subscriptions.
    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(subscriptions)),
            digests: Arc::default(),
        }
    }

    /// Adds a subscription.
    pub async fn add_subscription(&self, subscription: Subscription) {
        self.subscriptions.write().await.push(subscription);
    }

    /// Returns the number of digest records.
    pub async fn digest_count(&self) -> usize {
        self.digests.read().await.len()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self.subscriptions.read().await.clone())
    }
}

#[async_trait]
impl DigestStore for MemoryStore {
    async fn get(&self, key: &DigestKey) -> Result<Option<DigestRecord>, StoreError> {
        Ok(self.digests.read().await.get(key).cloned())
    }

    async fn insert(&self, record: &DigestRecord) -> Result<(), StoreError> {
        let key = record.key();
        let mut digests = self.digests.write().await;
        if digests.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        digests.insert(key, record.clone());
        Ok(())
    }

    async fn merge(&self, key: &DigestKey, patch: &DigestPatch) -> Result<(), StoreError> {
        let mut digests = self.digests.write().await;
        let record = digests.get_mut(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;
        record.apply(patch);
        Ok(())
    }
}

/// Digest store that reads through to a backing store and keeps every
/// write in memory.
///
/// Used for dry runs: detection sees the real baseline, but nothing is
/// persisted.
pub struct OverlayStore {
    base: Arc<dyn DigestStore>,
    overlay: MemoryStore,
}

impl OverlayStore {
    /// Creates an overlay over `base`.
    pub fn new(base: Arc<dyn DigestStore>) -> Self {
        Self {
            base,
            overlay: MemoryStore::new(),
        }
    }

    /// Returns the number of records written to the overlay.
    pub async fn pending_count(&self) -> usize {
        self.overlay.digest_count().await
    }
}

#[async_trait]
impl DigestStore for OverlayStore {
    async fn get(&self, key: &DigestKey) -> Result<Option<DigestRecord>, StoreError> {
        match self.overlay.get(key).await? {
            Some(record) => Ok(Some(record)),
            None => self.base.get(key).await,
        }
    }

    async fn insert(&self, record: &DigestRecord) -> Result<(), StoreError> {
        if self.base.get(&record.key()).await?.is_some() {
            return Err(StoreError::AlreadyExists {
                key: record.key().to_string(),
            });
        }
        self.overlay.insert(record).await
    }

    async fn merge(&self, key: &DigestKey, patch: &DigestPatch) -> Result<(), StoreError> {
        if self.overlay.get(key).await?.is_none() {
            let record = self.base.get(key).await?.ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;
            // a concurrent merge may have copied it first
            match self.overlay.insert(&record).await {
                Ok(()) | Err(StoreError::AlreadyExists { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        self.overlay.merge(key, patch).await
    }
}
