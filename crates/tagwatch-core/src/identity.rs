//! Registry identity types.
//!
//! A [`RegistryIdentity`] is the minimal field set that determines a distinct
//! authentication context: the provider type, the registry host, and the
//! provider-specific credential fields. Two identities that are structurally
//! equal describe the same registry context and share one client per poll
//! cycle.

use serde::{Deserialize, Serialize};

/// Default host recorded for Docker Hub subscriptions.
pub const DOCKER_HUB_HOST: &str = "docker.io";

/// Container registry provider.
///
/// Unknown provider names are preserved rather than rejected at
/// deserialization time so that a single misconfigured record only fails its
/// own registry group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderType {
    /// Docker Hub (static username/password credentials).
    DockerHub,

    /// Azure Container Registry (AAD service principal credentials).
    AzureContainerRegistry,

    /// A provider name with no known client.
    Unknown(String),
}

impl ProviderType {
    /// Wire name for Docker Hub.
    pub const DOCKER_HUB: &'static str = "DockerHub";

    /// Wire name for Azure Container Registry.
    pub const AZURE_CONTAINER_REGISTRY: &'static str = "AzureContainerRegistry";

    /// Parses a provider name, keeping unrecognised names as [`ProviderType::Unknown`].
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_core::ProviderType;
    ///
    /// assert_eq!(ProviderType::parse("DockerHub"), ProviderType::DockerHub);
    /// assert_eq!(ProviderType::parse("acr"), ProviderType::AzureContainerRegistry);
    /// assert!(matches!(ProviderType::parse("quay"), ProviderType::Unknown(_)));
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            Self::DOCKER_HUB | "dockerhub" | "docker-hub" => Self::DockerHub,
            Self::AZURE_CONTAINER_REGISTRY | "acr" | "azure" => Self::AzureContainerRegistry,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the provider's wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::DockerHub => Self::DOCKER_HUB,
            Self::AzureContainerRegistry => Self::AZURE_CONTAINER_REGISTRY,
            Self::Unknown(name) => name,
        }
    }

    /// Returns true if the provider authenticates with AAD service principal fields.
    #[must_use]
    pub const fn requires_aad(&self) -> bool {
        matches!(self, Self::AzureContainerRegistry)
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ProviderType {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for ProviderType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Structural identity of one registry authentication context.
///
/// Equality and hashing cover every field, so grouping by identity never
/// depends on object identity. AAD fields are empty for providers that use
/// static credentials.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistryIdentity {
    /// Registry provider.
    pub provider: ProviderType,

    /// Registry host (e.g. `docker.io`, `myregistry.azurecr.io`).
    pub host: String,

    /// AAD tenant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_tenant: Option<String>,

    /// AAD application (client) id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_client_id: Option<String>,

    /// AAD client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_client_secret: Option<String>,
}

impl RegistryIdentity {
    /// Creates an identity with no provider-specific auth fields.
    #[must_use]
    pub fn new(provider: ProviderType, host: impl Into<String>) -> Self {
        Self {
            provider,
            host: host.into(),
            aad_tenant: None,
            aad_client_id: None,
            aad_client_secret: None,
        }
    }

    /// Creates the Docker Hub identity.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_core::{ProviderType, RegistryIdentity};
    ///
    /// let identity = RegistryIdentity::docker_hub();
    /// assert_eq!(identity.provider, ProviderType::DockerHub);
    /// assert_eq!(identity.host, "docker.io");
    /// ```
    #[must_use]
    pub fn docker_hub() -> Self {
        Self::new(ProviderType::DockerHub, DOCKER_HUB_HOST)
    }

    /// Creates an Azure Container Registry identity.
    #[must_use]
    pub fn acr(
        host: impl Into<String>,
        tenant: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            provider: ProviderType::AzureContainerRegistry,
            host: host.into(),
            aad_tenant: Some(tenant.into()),
            aad_client_id: Some(client_id.into()),
            aad_client_secret: Some(client_secret.into()),
        }
    }

    /// Returns the AAD `(tenant, client_id, client_secret)` triple if all three are set.
    #[must_use]
    pub fn aad_credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.aad_tenant, &self.aad_client_id, &self.aad_client_secret) {
            (Some(tenant), Some(client_id), Some(secret)) => {
                Some((tenant.as_str(), client_id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for RegistryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryIdentity")
            .field("provider", &self.provider)
            .field("host", &self.host)
            .field("aad_tenant", &self.aad_tenant)
            .field("aad_client_id", &self.aad_client_id)
            .field(
                "aad_client_secret",
                &self.aad_client_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl std::fmt::Display for RegistryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.host)
    }
}
