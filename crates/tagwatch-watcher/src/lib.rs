//! Tagwatch Watcher
//!
//! This crate provides the change detection engine for tagwatch: it polls
//! container registries for the digest each watched tag points at and
//! publishes an event whenever a tag is first seen or moves.
//!
//! # Overview
//!
//! The watcher handles:
//! - **Grouping**: Subscriptions sharing a registry identity share one client
//!   and one bearer token per cycle
//! - **Change Detection**: New / Updated / Unchanged classification against a
//!   durable digest baseline
//! - **Notification**: Event Grid schema envelopes for every detected change
//! - **Scheduling**: Fixed-cadence, non-overlapping poll cycles
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────┐
//!                    │    PollScheduler    │
//!                    └──────────┬──────────┘
//!                               │ tick
//!                    ┌──────────▼──────────┐
//!                    │      PollCycle      │◄──── SubscriptionStore
//!                    └──────────┬──────────┘
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//! ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//! │  Registry   │       │  Registry   │       │  Registry   │
//! │  group 1    │       │  group 2    │       │  group N    │
//! └──────┬──────┘       └──────┬──────┘       └──────┬──────┘
//!        └───────── ChangeDetector per subscription ──┘
//!                    DigestStore ──► NotificationPublisher
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use tagwatch_watcher::{Watcher, WatcherConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WatcherConfig::from_file("tagwatch.yaml")?;
//!     let watcher = Watcher::open(config).await?;
//!
//!     let report = watcher.check_once().await?;
//!     println!("{} new, {} updated", report.new_count(), report.updated_count());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::significant_drop_tightening)]

pub mod config;
pub mod cycle;
pub mod detector;
pub mod error;
pub mod file_store;
pub mod grouping;
pub mod notification;
pub mod scheduler;
pub mod store;


use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tagwatch_registry::RegistryClientFactory;

// Re-export main types at crate root
pub use config::{NotificationConfig, StoreConfig, WatcherConfig};
pub use cycle::{CycleReport, OutcomeStatus, PollCycle, SubscriptionOutcome};
pub use detector::{ChangeDetector, Detection};
pub use error::{FailureKind, PublishError, Result, StoreError, WatcherError};
pub use file_store::FileStore;
pub use grouping::{group_by_registry, RegistryGroup};
pub use notification::{
    EventEnvelope, EventGridPublisher, LogPublisher, MemoryPublisher, NotificationPublisher,
    TagChangeData,
};
pub use scheduler::{PollScheduler, SchedulerConfig, SchedulerStats};
pub use store::{DigestStore, MemoryStore, OverlayStore, SubscriptionStore};

/// A configured watcher backed by the file store.
pub struct Watcher {
    config: WatcherConfig,
    store: Arc<FileStore>,
    cycle: Arc<PollCycle>,
}

impl Watcher {
    /// Opens the store and builds the publisher described by `config`.
    pub async fn open(config: WatcherConfig) -> Result<Self> {
        let publisher = build_publisher(&config.notification)?;
        Self::with_publisher(config, publisher).await
    }

    /// Opens the store, delivering events through `publisher`.
    pub async fn with_publisher(
        config: WatcherConfig,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Result<Self> {
        Self::build(config, publisher, false).await
    }

    /// Opens the store for a dry run.
    ///
    /// Detection reads the persisted baseline, but digest writes stay in
    /// memory and change events are only logged.
    pub async fn dry_run(config: WatcherConfig) -> Result<Self> {
        Self::build(config, Arc::new(LogPublisher), true).await
    }

    async fn build(
        config: WatcherConfig,
        publisher: Arc<dyn NotificationPublisher>,
        dry_run: bool,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(FileStore::open(&config.store.path).await?);
        let digests: Arc<dyn DigestStore> = if dry_run {
            Arc::new(OverlayStore::new(store.clone()))
        } else {
            store.clone()
        };
        let factory = RegistryClientFactory::new(config.registry.clone())?;
        let cycle = Arc::new(PollCycle::new(store.clone(), digests, publisher, factory));

        tracing::info!(
            store = %config.store.path.display(),
            poll_interval_secs = config.poll_interval,
            dry_run,
            "watcher initialized"
        );

        Ok(Self {
            config,
            store,
            cycle,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    /// Runs a single poll cycle.
    pub async fn check_once(&self) -> Result<CycleReport> {
        self.cycle.run().await
    }

    /// Runs poll cycles on the configured cadence until `shutdown`
    /// completes.
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        PollScheduler::new(self.cycle.clone(), self.config.scheduler_config())
            .run_until(shutdown)
            .await
    }
}

/// Builds the publisher described by `config`.
pub fn build_publisher(config: &NotificationConfig) -> Result<Arc<dyn NotificationPublisher>> {
    match config {
        NotificationConfig::Log => Ok(Arc::new(LogPublisher)),
        NotificationConfig::EventGrid {
            endpoint,
            access_key,
            timeout_secs,
        } => Ok(Arc::new(EventGridPublisher::new(
            endpoint.clone(),
            access_key.clone(),
            Duration::from_secs(*timeout_secs),
        )?)),
    }
}
