//! Poll cycle orchestration.
//!
//! One cycle loads every subscription, groups them by registry identity,
//! builds one registry client per group and checks every subscription
//! concurrently, each on its own task. Failures stay scoped to their
//! subscription (or group, for client construction) and never cancel
//! siblings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use tagwatch_core::Subscription;
use tagwatch_registry::{DigestResolver, RegistryClientFactory};

use crate::detector::{ChangeDetector, Detection};
use crate::error::{FailureKind, Result, WatcherError};
use crate::grouping::{group_by_registry, RegistryGroup};
use crate::notification::NotificationPublisher;
use crate::store::{DigestStore, SubscriptionStore};

/// Result of checking one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The check completed.
    Checked(Detection),

    /// The check failed.
    Failed {
        /// Failure classification.
        kind: FailureKind,
        /// Error message.
        message: String,
    },
}

/// Outcome of one subscription within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionOutcome {
    /// Subscription id.
    pub subscription_id: String,

    /// Registry host.
    pub registry: String,

    /// `repository:tag`.
    pub reference: String,

    /// What happened.
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl SubscriptionOutcome {
    fn checked(subscription: &Subscription, detection: Detection) -> Self {
        Self::with_status(subscription, OutcomeStatus::Checked(detection))
    }

    fn failed(subscription: &Subscription, error: &WatcherError) -> Self {
        Self::with_status(
            subscription,
            OutcomeStatus::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        )
    }

    fn with_status(subscription: &Subscription, status: OutcomeStatus) -> Self {
        Self {
            subscription_id: subscription.id.clone(),
            registry: subscription.registry.host.clone(),
            reference: subscription.reference(),
            status,
        }
    }

    /// Returns the detection, if the check completed.
    pub const fn detection(&self) -> Option<&Detection> {
        match &self.status {
            OutcomeStatus::Checked(detection) => Some(detection),
            OutcomeStatus::Failed { .. } => None,
        }
    }

    /// Returns the failure kind, if the check failed.
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            OutcomeStatus::Checked(_) => None,
            OutcomeStatus::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Unique cycle id.
    pub cycle_id: String,

    /// When the cycle started.
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration.
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,

    /// Per-subscription outcomes.
    pub outcomes: Vec<SubscriptionOutcome>,
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

impl CycleReport {
    /// Number of first observations.
    pub fn new_count(&self) -> usize {
        self.count(|o| matches!(o.detection(), Some(Detection::New { .. })))
    }

    /// Number of moved tags.
    pub fn updated_count(&self) -> usize {
        self.count(|o| matches!(o.detection(), Some(Detection::Updated { .. })))
    }

    /// Number of unchanged tags.
    pub fn unchanged_count(&self) -> usize {
        self.count(|o| matches!(o.detection(), Some(Detection::Unchanged { .. })))
    }

    /// Number of failed checks.
    pub fn failed_count(&self) -> usize {
        self.count(|o| o.failure_kind().is_some())
    }

    /// Returns the outcome for a subscription id.
    pub fn outcome(&self, subscription_id: &str) -> Option<&SubscriptionOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.subscription_id == subscription_id)
    }

    fn count(&self, predicate: impl Fn(&SubscriptionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

/// Runs poll cycles over a subscription source.
pub struct PollCycle {
    subscriptions: Arc<dyn SubscriptionStore>,
    factory: RegistryClientFactory,
    detector: ChangeDetector,
    running: Mutex<()>,
}

impl PollCycle {
    /// Creates a poll cycle.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        digests: Arc<dyn DigestStore>,
        publisher: Arc<dyn NotificationPublisher>,
        factory: RegistryClientFactory,
    ) -> Self {
        Self {
            subscriptions,
            factory,
            detector: ChangeDetector::new(digests, publisher),
            running: Mutex::new(()),
        }
    }

    /// Runs one cycle to completion.
    ///
    /// Returns [`WatcherError::CycleInProgress`] if another cycle is running
    /// on this instance, or [`WatcherError::Storage`] if subscriptions could
    /// not be loaded. Every other failure is recorded in the report.
    pub async fn run(&self) -> Result<CycleReport> {
        let Ok(_running) = self.running.try_lock() else {
            tracing::warn!("poll cycle skipped, previous cycle still running");
            return Err(WatcherError::CycleInProgress);
        };

        let cycle_id = Uuid::now_v7().to_string();
        let started_at = Utc::now();
        let start = Instant::now();

        let subscriptions = self.subscriptions.list_subscriptions().await?;
        let groups = group_by_registry(subscriptions);

        tracing::info!(
            cycle_id = %cycle_id,
            groups = groups.len(),
            subscriptions = groups.iter().map(RegistryGroup::len).sum::<usize>(),
            "poll cycle started"
        );

        let outcomes: Vec<SubscriptionOutcome> =
            join_all(groups.iter().map(|group| self.check_group(group)))
                .await
                .into_iter()
                .flatten()
                .collect();

        let report = CycleReport {
            cycle_id,
            started_at,
            duration: start.elapsed(),
            outcomes,
        };

        tracing::info!(
            cycle_id = %report.cycle_id,
            new = report.new_count(),
            updated = report.updated_count(),
            unchanged = report.unchanged_count(),
            failed = report.failed_count(),
            duration_ms = %report.duration.as_millis(),
            "poll cycle completed"
        );

        Ok(report)
    }

    async fn check_group(&self, group: &RegistryGroup) -> Vec<SubscriptionOutcome> {
        let client: Arc<dyn DigestResolver> =
            match self.factory.create(&group.identity, group.repositories()) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    let error = WatcherError::from(e);
                    tracing::warn!(
                        registry = %group.identity,
                        subscriptions = group.len(),
                        kind = %error.kind(),
                        error = %error,
                        "registry group skipped"
                    );
                    return group
                        .subscriptions
                        .iter()
                        .map(|s| SubscriptionOutcome::failed(s, &error))
                        .collect();
                }
            };

        self.check_all(client, &group.subscriptions).await
    }

    /// Checks every subscription on its own task, so a panicking check
    /// fails only its own outcome.
    async fn check_all(
        &self,
        resolver: Arc<dyn DigestResolver>,
        subscriptions: &[Subscription],
    ) -> Vec<SubscriptionOutcome> {
        let handles: Vec<_> = subscriptions
            .iter()
            .cloned()
            .map(|subscription| {
                let detector = self.detector.clone();
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    check_subscription(&detector, &subscription, resolver.as_ref()).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(subscriptions)
            .map(|(joined, subscription)| {
                joined.unwrap_or_else(|e| {
                    let error = WatcherError::CheckAborted {
                        reason: e.to_string(),
                    };
                    tracing::error!(
                        subscription_id = %subscription.id,
                        registry = %subscription.registry.host,
                        repository = %subscription.repository,
                        tag = %subscription.tag,
                        error = %error,
                        "subscription check aborted"
                    );
                    SubscriptionOutcome::failed(subscription, &error)
                })
            })
            .collect()
    }
}

async fn check_subscription(
    detector: &ChangeDetector,
    subscription: &Subscription,
    resolver: &dyn DigestResolver,
) -> SubscriptionOutcome {
    let result = match subscription.validate() {
        Ok(()) => detector.check(subscription, resolver).await,
        Err(e) => Err(WatcherError::from(e)),
    };

    match result {
        Ok(detection) => SubscriptionOutcome::checked(subscription, detection),
        Err(error) => {
            tracing::warn!(
                subscription_id = %subscription.id,
                registry = %subscription.registry.host,
                repository = %subscription.repository,
                tag = %subscription.tag,
                kind = %error.kind(),
                error = %error,
                "subscription check failed"
            );
            SubscriptionOutcome::failed(subscription, &error)
        }
    }
}
