//! Error types for the watcher crate.
//!
//! This module defines all errors that can occur while polling registries,
//! persisting digests and delivering change notifications.

use std::path::PathBuf;

use serde::Serialize;
use tagwatch_registry::RegistryError;
use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Coarse failure classification used in logs and cycle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Token endpoint rejected the request or returned garbage.
    Authentication,

    /// Manifest endpoint failed or returned no digest.
    Resolution,

    /// The durable store could not be read or written.
    Storage,

    /// The notification transport rejected the event.
    Delivery,

    /// No registry client exists for the provider.
    UnsupportedProvider,

    /// Invalid configuration or subscription record.
    Configuration,

    /// Another poll cycle is still running.
    CycleInProgress,

    /// A check panicked or was cancelled.
    Internal,
}

impl FailureKind {
    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Resolution => "resolution",
            Self::Storage => "storage",
            Self::Delivery => "delivery",
            Self::UnsupportedProvider => "unsupported_provider",
            Self::Configuration => "configuration",
            Self::CycleInProgress => "cycle_in_progress",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur in the watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Registry client error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Durable store error.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Notification delivery error.
    #[error("delivery error: {0}")]
    Delivery(#[from] PublishError),

    /// Subscription record is unusable.
    #[error("invalid subscription: {0}")]
    InvalidSubscription(#[from] tagwatch_core::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for invalidity.
        reason: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad {
        /// Configuration file path.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// A poll cycle is already running on this instance.
    #[error("a poll cycle is already in progress")]
    CycleInProgress,

    /// A subscription check task did not run to completion.
    #[error("check aborted: {reason}")]
    CheckAborted {
        /// Why the task stopped.
        reason: String,
    },
}

impl WatcherError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Registry(err) => match err {
                RegistryError::Authentication(_) => FailureKind::Authentication,
                RegistryError::ResolutionFailed { .. } | RegistryError::MissingDigest { .. } => {
                    FailureKind::Resolution
                }
                RegistryError::UnsupportedProvider { .. } => FailureKind::UnsupportedProvider,
                RegistryError::InvalidConfig { .. } => FailureKind::Configuration,
            },
            Self::Storage(_) => FailureKind::Storage,
            Self::Delivery(_) => FailureKind::Delivery,
            Self::InvalidSubscription(_) | Self::InvalidConfig { .. } | Self::ConfigLoad { .. } => {
                FailureKind::Configuration
            }
            Self::CycleInProgress => FailureKind::CycleInProgress,
            Self::CheckAborted { .. } => FailureKind::Internal,
        }
    }
}

/// Durable store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// File I/O failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Insert hit an existing record.
    #[error("record already exists: {key}")]
    AlreadyExists {
        /// Storage key.
        key: String,
    },

    /// Merge targeted a missing record.
    #[error("record not found: {key}")]
    NotFound {
        /// Storage key.
        key: String,
    },

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The endpoint could not be reached.
    #[error("failed to reach {endpoint}: {message}")]
    Transport {
        /// Topic endpoint.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// The endpoint answered with a non-success status.
    #[error("endpoint rejected event with status {status}: {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Event could not be serialized.
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}
