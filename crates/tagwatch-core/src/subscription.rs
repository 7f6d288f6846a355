//! Subscription records.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::RegistryIdentity;

/// A client's interest in one `(registry, repository, tag)` triple.
///
/// Subscriptions are created by the registration flow and are read-only to
/// the watcher engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription id.
    pub id: String,

    /// Registry the watched repository lives in.
    #[serde(flatten)]
    pub registry: RegistryIdentity,

    /// Repository path (may contain `/`, e.g. `library/nginx`).
    pub repository: String,

    /// Watched tag.
    pub tag: String,

    /// Delivery target for change notifications.
    pub webhook_url: String,
}

impl Subscription {
    /// Creates a new subscription.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        registry: RegistryIdentity,
        repository: impl Into<String>,
        tag: impl Into<String>,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            registry,
            repository: repository.into(),
            tag: tag.into(),
            webhook_url: webhook_url.into(),
        }
    }

    /// Returns the registry identity used to group this subscription.
    #[must_use]
    pub const fn identity(&self) -> &RegistryIdentity {
        &self.registry
    }

    /// Returns `repository:tag`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    /// Checks that the record carries every field its provider needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSubscription`] if the repository or tag is
    /// empty, or an AAD-backed provider is missing any AAD field.
    pub fn validate(&self) -> Result<()> {
        if self.repository.is_empty() || self.tag.is_empty() {
            return Err(Error::InvalidSubscription {
                id: self.id.clone(),
                reason: "repository and tag must not be empty".to_string(),
            });
        }

        if self.registry.provider.requires_aad() && self.registry.aad_credentials().is_none() {
            return Err(Error::InvalidSubscription {
                id: self.id.clone(),
                reason: format!(
                    "provider {} requires AAD tenant, client id and client secret",
                    self.registry.provider
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ProviderType;

    #[test]
    fn test_reference() {
        let sub = Subscription::new(
            "sub-1",
            RegistryIdentity::docker_hub(),
            "library/nginx",
            "latest",
            "https://hooks.example.com",
        );
        assert_eq!(sub.reference(), "library/nginx:latest");
    }

    #[test]
    fn test_serde_flattens_identity() {
        let sub = Subscription::new(
            "sub-1",
            RegistryIdentity::acr("r.azurecr.io", "tenant", "client", "secret"),
            "team/api",
            "v1",
            "https://hooks.example.com",
        );

        let value = serde_json::to_value(&sub).unwrap();
        assert_eq!(value["provider"], "AzureContainerRegistry");
        assert_eq!(value["host"], "r.azurecr.io");
        assert_eq!(value["aad_tenant"], "tenant");

        let back: Subscription = serde_json::from_value(value).unwrap();
        assert_eq!(back, sub);
    }

    #[test]
    fn test_docker_hub_omits_aad_fields() {
        let sub = Subscription::new(
            "sub-1",
            RegistryIdentity::docker_hub(),
            "library/redis",
            "7",
            "https://hooks.example.com",
        );
        let value = serde_json::to_value(&sub).unwrap();
        assert!(value.get("aad_tenant").is_none());
        assert_eq!(value["provider"], "DockerHub");
    }

    #[test]
    fn test_validate_acr_requires_aad() {
        let mut identity = RegistryIdentity::acr("r.azurecr.io", "t", "c", "s");
        identity.aad_tenant = None;
        let sub = Subscription::new("sub-2", identity, "app", "latest", "https://h");

        let err = sub.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidSubscription { ref id, .. } if id == "sub-2"));
    }

    #[test]
    fn test_validate_rejects_empty_tag() {
        let sub = Subscription::new(
            "sub-3",
            RegistryIdentity::new(ProviderType::DockerHub, "docker.io"),
            "library/nginx",
            "",
            "https://h",
        );
        assert!(sub.validate().is_err());
    }
}
