//! Change events raised by the detector.

use serde::{Deserialize, Serialize};

use crate::subscription::Subscription;

/// Kind of tag change.
///
/// Unchanged tags never produce an event, so there is no `Unchanged` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// First observation of the tag.
    New,

    /// The tag now resolves to a different digest.
    Updated,
}

impl ChangeKind {
    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Updated => "Updated",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected change for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Subscription that observed the change.
    pub subscription_id: String,

    /// Registry host.
    pub registry: String,

    /// Repository path.
    pub repository: String,

    /// Tag.
    pub tag: String,

    /// Newly resolved digest.
    pub digest: String,

    /// New or Updated.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Builds an event for `subscription` resolving to `digest`.
    #[must_use]
    pub fn for_subscription(
        subscription: &Subscription,
        digest: impl Into<String>,
        kind: ChangeKind,
    ) -> Self {
        Self {
            subscription_id: subscription.id.clone(),
            registry: subscription.registry.host.clone(),
            repository: subscription.repository.clone(),
            tag: subscription.tag.clone(),
            digest: digest.into(),
            kind,
        }
    }

    /// Returns the event subject, `repository:tag`.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}
