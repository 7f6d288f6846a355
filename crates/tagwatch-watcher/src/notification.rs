//! Change notification delivery.
//!
//! Detected changes are wrapped in an Event Grid schema envelope and handed
//! to a [`NotificationPublisher`]. Delivery is fire-and-forget: a failed
//! send is reported to the caller and never retried here.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tagwatch_core::{ChangeEvent, ChangeKind};

use crate::error::{PublishError, Result, WatcherError};

/// Schema version stamped on every envelope.
pub const DATA_VERSION: &str = "1.0";

/// Header carrying the topic access key.
pub const ACCESS_KEY_HEADER: &str = "aeg-sas-key";

/// Event Grid schema envelope for one change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Unique event id.
    pub id: String,

    /// `repository:tag`.
    pub subject: String,

    /// `New` or `Updated`.
    pub event_type: ChangeKind,

    /// When the envelope was built.
    pub event_time: DateTime<Utc>,

    /// Payload schema version.
    pub data_version: String,

    /// Change payload.
    pub data: TagChangeData,
}

/// Payload of an [`EventEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagChangeData {
    /// Registry host.
    pub registry: String,

    /// Repository path.
    pub repo: String,

    /// Tag.
    pub tag: String,

    /// New digest.
    pub digest: String,

    /// `New` or `Updated`.
    pub change_type: ChangeKind,

    /// Subscription that observed the change.
    pub subscription_id: String,
}

impl EventEnvelope {
    /// Wraps a change event, assigning a fresh id and timestamp.
    pub fn from_event(event: &ChangeEvent) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            subject: event.subject(),
            event_type: event.kind,
            event_time: Utc::now(),
            data_version: DATA_VERSION.to_string(),
            data: TagChangeData {
                registry: event.registry.clone(),
                repo: event.repository.clone(),
                tag: event.tag.clone(),
                digest: event.digest.clone(),
                change_type: event.kind,
                subscription_id: event.subscription_id.clone(),
            },
        }
    }
}

/// Delivery target for change events.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Delivers one change event.
    async fn publish(&self, event: &ChangeEvent) -> std::result::Result<(), PublishError>;
}

/// Publishes envelopes to an Event Grid topic endpoint.
pub struct EventGridPublisher {
    http: reqwest::Client,
    endpoint: String,
    access_key: String,
}

impl std::fmt::Debug for EventGridPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventGridPublisher")
            .field("endpoint", &self.endpoint)
            .field("access_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl EventGridPublisher {
    /// Creates a publisher for `endpoint`.
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint).map_err(|e| WatcherError::InvalidConfig {
            reason: format!("topic endpoint '{endpoint}' is not a valid URL: {e}"),
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WatcherError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            endpoint,
            access_key: access_key.into(),
        })
    }

    /// Returns the topic endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NotificationPublisher for EventGridPublisher {
    async fn publish(&self, event: &ChangeEvent) -> std::result::Result<(), PublishError> {
        let envelope = EventEnvelope::from_event(event);
        let body = serde_json::to_vec(&[&envelope])?;

        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Transport {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(
            event_id = %envelope.id,
            subject = %envelope.subject,
            event_type = %envelope.event_type,
            "event published"
        );
        Ok(())
    }
}

/// Logs envelopes instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait]
impl NotificationPublisher for LogPublisher {
    async fn publish(&self, event: &ChangeEvent) -> std::result::Result<(), PublishError> {
        let envelope = EventEnvelope::from_event(event);
        tracing::info!(
            event_id = %envelope.id,
            subject = %envelope.subject,
            event_type = %envelope.event_type,
            registry = %envelope.data.registry,
            digest = %envelope.data.digest,
            subscription_id = %envelope.data.subscription_id,
            "tag change"
        );
        Ok(())
    }
}

/// Records envelopes in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    envelopes: Mutex<Vec<EventEnvelope>>,
}

impl MemoryPublisher {
    /// Creates an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every envelope published so far.
    pub fn envelopes(&self) -> Vec<EventEnvelope> {
        self.envelopes.lock().clone()
    }

    /// Returns the number of envelopes published so far.
    pub fn len(&self) -> usize {
        self.envelopes.lock().len()
    }

    /// Returns true if nothing was published.
    pub fn is_empty(&self) -> bool {
        self.envelopes.lock().is_empty()
    }
}

#[async_trait]
impl NotificationPublisher for MemoryPublisher {
    async fn publish(&self, event: &ChangeEvent) -> std::result::Result<(), PublishError> {
        self.envelopes.lock().push(EventEnvelope::from_event(event));
        Ok(())
    }
}
