//! Configuration types for the watcher.
//!
//! The watcher is configured from a YAML document:
//!
//! ```yaml
//! poll_interval: 60
//! late_tolerance: 5
//! store:
//!   path: /var/lib/tagwatch
//! registry:
//!   timeout_secs: 30
//!   docker_hub:
//!     username: robot
//!     password: hunter2
//! notification:
//!   type: event_grid
//!   endpoint: https://my-topic.westeurope-1.eventgrid.azure.net/api/events
//!   access_key: "..."
//! ```
//!
//! Every section is optional; missing values fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tagwatch_registry::RegistryConfig;

use crate::error::{Result, WatcherError};
use crate::scheduler::SchedulerConfig;

/// Default poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default late tolerance in seconds.
pub const DEFAULT_LATE_TOLERANCE_SECS: u64 = 5;

/// Default notification request timeout in seconds.
pub const DEFAULT_NOTIFICATION_TIMEOUT_SECS: u64 = 30;

/// Configuration for the watcher service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Seconds between poll cycle starts.
    pub poll_interval: u64,

    /// Seconds a tick may start late before it is reported.
    pub late_tolerance: u64,

    /// Store settings.
    pub store: StoreConfig,

    /// Registry client settings.
    pub registry: RegistryConfig,

    /// Notification delivery settings.
    pub notification: NotificationConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            late_tolerance: DEFAULT_LATE_TOLERANCE_SECS,
            store: StoreConfig::default(),
            registry: RegistryConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl WatcherConfig {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| WatcherError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    /// Loads and parses a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| WatcherError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_yaml::from_str(&contents).map_err(|e| WatcherError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval == 0 {
            return Err(WatcherError::InvalidConfig {
                reason: "poll_interval must be greater than 0".to_string(),
            });
        }

        if self.registry.timeout_secs == 0 {
            return Err(WatcherError::InvalidConfig {
                reason: "registry.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(WatcherError::InvalidConfig {
                reason: "store.path must not be empty".to_string(),
            });
        }

        if let NotificationConfig::EventGrid {
            endpoint,
            access_key,
            ..
        } = &self.notification
        {
            if endpoint.trim().is_empty() {
                return Err(WatcherError::InvalidConfig {
                    reason: "notification.endpoint must not be empty".to_string(),
                });
            }
            if access_key.is_empty() {
                return Err(WatcherError::InvalidConfig {
                    reason: "notification.access_key must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Returns the scheduler settings.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::builder()
            .interval(Duration::from_secs(self.poll_interval))
            .late_tolerance(Duration::from_secs(self.late_tolerance))
            .build()
    }
}

/// Store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Returns the platform data directory joined with `tagwatch`.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tagwatch")
}

/// Notification delivery settings.
#[derive(Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationConfig {
    /// Log events instead of delivering them.
    #[default]
    Log,

    /// Deliver events to an Event Grid topic.
    EventGrid {
        /// Topic endpoint URL.
        endpoint: String,

        /// Topic access key.
        access_key: String,

        /// Request timeout in seconds.
        #[serde(default = "default_notification_timeout")]
        timeout_secs: u64,
    },
}

const fn default_notification_timeout() -> u64 {
    DEFAULT_NOTIFICATION_TIMEOUT_SECS
}

impl NotificationConfig {
    /// Creates an Event Grid configuration with the default timeout.
    pub fn event_grid(endpoint: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self::EventGrid {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            timeout_secs: DEFAULT_NOTIFICATION_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Log => f.write_str("Log"),
            Self::EventGrid {
                endpoint,
                timeout_secs,
                ..
            } => f
                .debug_struct("EventGrid")
                .field("endpoint", endpoint)
                .field("access_key", &"<redacted>")
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}
