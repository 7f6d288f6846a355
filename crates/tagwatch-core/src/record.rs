//! Digest records: the persisted change-detection baseline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::DigestKey;

/// Last observed content digest for one `(registry, repository, tag)` triple.
///
/// Created on first observation, patched in place when the digest changes,
/// never deleted by the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRecord {
    /// Registry host.
    pub registry: String,

    /// Repository path.
    pub repository: String,

    /// Tag.
    pub tag: String,

    /// Last observed digest (e.g. `sha256:...`).
    pub digest: String,

    /// When the tag was first observed.
    pub first_seen_at: DateTime<Utc>,

    /// When the digest last changed (equal to `first_seen_at` until then).
    pub updated_at: DateTime<Utc>,
}

impl DigestRecord {
    /// Creates a record for a first observation.
    #[must_use]
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            registry: registry.into(),
            repository: repository.into(),
            tag: tag.into(),
            digest: digest.into(),
            first_seen_at: now,
            updated_at: now,
        }
    }

    /// Returns the storage key for this record.
    #[must_use]
    pub fn key(&self) -> DigestKey {
        DigestKey::new(&self.registry, &self.repository, &self.tag)
    }

    /// Applies a partial update, leaving every unpatched field untouched.
    pub fn apply(&mut self, patch: &DigestPatch) {
        self.digest.clone_from(&patch.digest);
        self.updated_at = patch.updated_at;
    }
}

/// Partial update for an existing [`DigestRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestPatch {
    /// New digest.
    pub digest: String,

    /// Time of the change.
    pub updated_at: DateTime<Utc>,
}

impl DigestPatch {
    /// Creates a patch stamped with the current time.
    #[must_use]
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            updated_at: Utc::now(),
        }
    }
}
