//! File-backed store.
//!
//! A store directory holds two JSON documents:
//!
//! - `subscriptions.json`: array of subscription records
//! - `digests.json`: `{ partition_key: { row_key: record } }`
//!
//! Every write replaces the whole document through a temporary file and a
//! rename, so readers never observe a half-written file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use tagwatch_core::{DigestKey, DigestPatch, DigestRecord, Subscription};

use crate::error::StoreError;
use crate::store::{DigestStore, SubscriptionStore};

/// Subscriptions document name.
pub const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";

/// Digests document name.
pub const DIGESTS_FILE: &str = "digests.json";

type DigestTable = BTreeMap<String, BTreeMap<String, DigestRecord>>;

/// Durable store rooted at a directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) the store directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                path: root.clone(),
                source,
            })?;

        tracing::debug!(path = %root.display(), "opened file store");

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Adds a subscription record.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the id is taken.
    pub async fn add_subscription(&self, subscription: Subscription) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut subscriptions: Vec<Subscription> = self.read_document(SUBSCRIPTIONS_FILE).await?;
        if subscriptions.iter().any(|s| s.id == subscription.id) {
            return Err(StoreError::AlreadyExists {
                key: subscription.id,
            });
        }

        tracing::info!(
            subscription_id = %subscription.id,
            registry = %subscription.registry.host,
            repository = %subscription.repository,
            tag = %subscription.tag,
            "subscription added"
        );

        subscriptions.push(subscription);
        self.write_document(SUBSCRIPTIONS_FILE, &subscriptions).await
    }

    /// Removes a subscription by id. Returns whether it existed.
    pub async fn remove_subscription(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut subscriptions: Vec<Subscription> = self.read_document(SUBSCRIPTIONS_FILE).await?;
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        if subscriptions.len() == before {
            return Ok(false);
        }

        self.write_document(SUBSCRIPTIONS_FILE, &subscriptions)
            .await?;
        tracing::info!(subscription_id = %id, "subscription removed");
        Ok(true)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    async fn read_document<T>(&self, name: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Ok(T::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn write_document<T: Serialize + Sync>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let path = self.path(name);
        let tmp = self.path(&format!("{name}.tmp"));
        let bytes = serde_json::to_vec_pretty(value)?;

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }
}

#[async_trait]
impl SubscriptionStore for FileStore {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        self.read_document(SUBSCRIPTIONS_FILE).await
    }
}

#[async_trait]
impl DigestStore for FileStore {
    async fn get(&self, key: &DigestKey) -> Result<Option<DigestRecord>, StoreError> {
        let mut table: DigestTable = self.read_document(DIGESTS_FILE).await?;
        Ok(table
            .get_mut(&key.partition_key)
            .and_then(|rows| rows.remove(&key.row_key)))
    }

    async fn insert(&self, record: &DigestRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let key = record.key();
        let mut table: DigestTable = self.read_document(DIGESTS_FILE).await?;
        let rows = table.entry(key.partition_key.clone()).or_default();
        if rows.contains_key(&key.row_key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        rows.insert(key.row_key, record.clone());

        self.write_document(DIGESTS_FILE, &table).await
    }

    async fn merge(&self, key: &DigestKey, patch: &DigestPatch) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut table: DigestTable = self.read_document(DIGESTS_FILE).await?;
        let record = table
            .get_mut(&key.partition_key)
            .and_then(|rows| rows.get_mut(&key.row_key))
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;
        record.apply(patch);

        self.write_document(DIGESTS_FILE, &table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwatch_core::RegistryIdentity;
    use tempfile::TempDir;

    fn subscription(id: &str, repository: &str) -> Subscription {
        Subscription::new(
            id,
            RegistryIdentity::docker_hub(),
            repository,
            "latest",
            "https://hooks.example.com/a",
        )
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.list_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("store");
        let store = FileStore::open(&root).await.unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_add_and_remove_subscription() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.add_subscription(subscription("a", "library/nginx")).await.unwrap();
        store.add_subscription(subscription("b", "library/redis")).await.unwrap();

        let err = store
            .add_subscription(subscription("a", "library/other"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        assert!(store.remove_subscription("a").await.unwrap());
        assert!(!store.remove_subscription("a").await.unwrap());

        let remaining = store.list_subscriptions().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b");
    }

    #[tokio::test]
    async fn test_digests_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let record = DigestRecord::new("docker.io", "library/nginx", "latest", "sha256:a");

        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.insert(&record).await.unwrap();
        }

        let store = FileStore::open(dir.path()).await.unwrap();
        let stored = store.get(&record.key()).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_digest_document_layout() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store
            .insert(&DigestRecord::new("docker.io", "library/nginx", "latest", "sha256:a"))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join(DIGESTS_FILE)).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            doc["docker.io+library%2Fnginx"]["latest"]["digest"],
            "sha256:a"
        );
        assert!(!dir.path().join(format!("{DIGESTS_FILE}.tmp")).exists());
    }

    #[tokio::test]
    async fn test_insert_twice_fails() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let record = DigestRecord::new("docker.io", "library/nginx", "latest", "sha256:a");

        store.insert(&record).await.unwrap();
        let err = store.insert(&record).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_merge_preserves_first_seen() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let record = DigestRecord::new("docker.io", "library/nginx", "latest", "sha256:a");
        store.insert(&record).await.unwrap();

        store
            .merge(&record.key(), &DigestPatch::new("sha256:b"))
            .await
            .unwrap();

        let stored = store.get(&record.key()).await.unwrap().unwrap();
        assert_eq!(stored.digest, "sha256:b");
        assert_eq!(stored.first_seen_at, record.first_seen_at);
    }

    #[tokio::test]
    async fn test_merge_missing_fails() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let key = DigestKey::new("docker.io", "library/nginx", "latest");

        let err = store.merge(&key, &DigestPatch::new("sha256:b")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUBSCRIPTIONS_FILE), "{not json").unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let err = store.list_subscriptions().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
