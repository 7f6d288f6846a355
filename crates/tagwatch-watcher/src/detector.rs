//! Per-subscription change detection.
//!
//! For one subscription the detector resolves the current digest, compares
//! it with the stored baseline and classifies the result:
//!
//! ```text
//!   resolve ──► load record ──┬─ absent ─────────► insert  ──► New
//!                             ├─ digest differs ─► merge   ──► Updated
//!                             └─ digest equal ─────────────► Unchanged
//! ```
//!
//! An event is published only after the store write succeeded. An insert
//! that loses a race with another writer of the same key is re-read and
//! classified against the winning record, so writing the same digest twice
//! is harmless.

use std::sync::Arc;

use serde::Serialize;

use tagwatch_core::{ChangeEvent, ChangeKind, DigestKey, DigestPatch, DigestRecord, Subscription};
use tagwatch_registry::DigestResolver;

use crate::error::{Result, StoreError};
use crate::notification::NotificationPublisher;
use crate::store::DigestStore;

/// Outcome of one successful check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Detection {
    /// First observation of the tag.
    New {
        /// Resolved digest.
        digest: String,
    },

    /// The tag moved to a new digest.
    Updated {
        /// Previously stored digest.
        previous: String,
        /// Resolved digest.
        digest: String,
    },

    /// The tag still points at the stored digest.
    Unchanged {
        /// Resolved digest.
        digest: String,
    },
}

impl Detection {
    /// Returns the resolved digest.
    pub fn digest(&self) -> &str {
        match self {
            Self::New { digest } | Self::Updated { digest, .. } | Self::Unchanged { digest } => {
                digest
            }
        }
    }

    /// Returns the change kind, or `None` when unchanged.
    pub const fn change_kind(&self) -> Option<ChangeKind> {
        match self {
            Self::New { .. } => Some(ChangeKind::New),
            Self::Updated { .. } => Some(ChangeKind::Updated),
            Self::Unchanged { .. } => None,
        }
    }

    /// Returns a string representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New { .. } => "new",
            Self::Updated { .. } => "updated",
            Self::Unchanged { .. } => "unchanged",
        }
    }
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compares resolved digests against the stored baseline.
#[derive(Clone)]
pub struct ChangeDetector {
    digests: Arc<dyn DigestStore>,
    publisher: Arc<dyn NotificationPublisher>,
}

impl ChangeDetector {
    /// Creates a detector writing to `digests` and publishing to `publisher`.
    pub fn new(digests: Arc<dyn DigestStore>, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self { digests, publisher }
    }

    /// Classifies `digest` against an existing record, merging when it moved.
    async fn compare(
        &self,
        key: &DigestKey,
        existing: DigestRecord,
        digest: String,
    ) -> Result<Detection> {
        if existing.digest == digest {
            return Ok(Detection::Unchanged { digest });
        }
        self.digests.merge(key, &DigestPatch::new(&digest)).await?;
        Ok(Detection::Updated {
            previous: existing.digest,
            digest,
        })
    }

    /// Checks one subscription using its group's resolver.
    ///
    /// Any failure aborts only this subscription. A resolution failure
    /// leaves the store untouched; a failed store write suppresses the
    /// event.
    pub async fn check(
        &self,
        subscription: &Subscription,
        resolver: &dyn DigestResolver,
    ) -> Result<Detection> {
        let digest = resolver
            .resolve_digest(&subscription.repository, &subscription.tag)
            .await?;

        let key = DigestKey::new(
            &subscription.registry.host,
            &subscription.repository,
            &subscription.tag,
        );

        let detection = match self.digests.get(&key).await? {
            None => {
                let record = DigestRecord::new(
                    &subscription.registry.host,
                    &subscription.repository,
                    &subscription.tag,
                    &digest,
                );
                match self.digests.insert(&record).await {
                    Ok(()) => Detection::New { digest },
                    Err(StoreError::AlreadyExists { .. }) => {
                        // another check wrote this key between our read and insert
                        tracing::debug!(
                            subscription_id = %subscription.id,
                            key = %key,
                            "baseline written concurrently, re-reading"
                        );
                        let existing = self
                            .digests
                            .get(&key)
                            .await?
                            .ok_or_else(|| StoreError::NotFound {
                                key: key.to_string(),
                            })?;
                        self.compare(&key, existing, digest).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Some(existing) => self.compare(&key, existing, digest).await?,
        };

        tracing::debug!(
            subscription_id = %subscription.id,
            registry = %subscription.registry.host,
            repository = %subscription.repository,
            tag = %subscription.tag,
            digest = %detection.digest(),
            state = %detection,
            "checked tag"
        );

        if let Some(kind) = detection.change_kind() {
            let event = ChangeEvent::for_subscription(subscription, detection.digest(), kind);
            self.publisher.publish(&event).await?;

            tracing::info!(
                subscription_id = %subscription.id,
                registry = %subscription.registry.host,
                repository = %subscription.repository,
                tag = %subscription.tag,
                digest = %detection.digest(),
                change_kind = %kind,
                "tag change detected"
            );
        }

        Ok(detection)
    }
}
