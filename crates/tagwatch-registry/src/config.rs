//! Configuration types for registry clients.

use serde::Deserialize;
use std::time::Duration;

/// Default Docker Hub token endpoint.
pub const DEFAULT_DOCKER_HUB_AUTH_URL: &str = "https://auth.docker.io/token";

/// Default Docker Hub token service name.
pub const DEFAULT_DOCKER_HUB_SERVICE: &str = "registry.docker.io";

/// Default Docker Hub registry API base URL.
pub const DEFAULT_DOCKER_HUB_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// Default Azure AD authority.
pub const DEFAULT_AAD_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// Default AAD resource requested for the ACR token exchange.
pub const DEFAULT_AAD_RESOURCE: &str = "https://management.azure.com/";

/// Configuration shared by every registry client built by a
/// [`RegistryClientFactory`](crate::RegistryClientFactory).
///
/// Provider credentials that are not part of a
/// [`RegistryIdentity`](tagwatch_core::RegistryIdentity) live here and are
/// handed to clients explicitly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent string.
    pub user_agent: String,

    /// Docker Hub token endpoint.
    pub docker_hub_auth_url: String,

    /// Docker Hub token `service` parameter.
    pub docker_hub_service: String,

    /// Docker Hub registry API base URL.
    pub docker_hub_registry_url: String,

    /// Azure AD authority base URL (tenant is appended).
    pub aad_authority_url: String,

    /// AAD resource requested with the client credential grant.
    pub aad_resource: String,

    /// URL scheme used to reach ACR hosts.
    pub acr_scheme: String,

    /// Docker Hub account; anonymous tokens are requested when absent.
    pub docker_hub: Option<DockerHubCredentials>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("tagwatch/{}", env!("CARGO_PKG_VERSION")),
            docker_hub_auth_url: DEFAULT_DOCKER_HUB_AUTH_URL.to_string(),
            docker_hub_service: DEFAULT_DOCKER_HUB_SERVICE.to_string(),
            docker_hub_registry_url: DEFAULT_DOCKER_HUB_REGISTRY_URL.to_string(),
            aad_authority_url: DEFAULT_AAD_AUTHORITY_URL.to_string(),
            aad_resource: DEFAULT_AAD_RESOURCE.to_string(),
            acr_scheme: "https".to_string(),
            docker_hub: None,
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration with public endpoints and no credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_registry::RegistryConfig;
    ///
    /// let config = RegistryConfig::new();
    /// assert_eq!(config.docker_hub_auth_url, "https://auth.docker.io/token");
    /// assert!(config.docker_hub.is_none());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the Docker Hub account.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_registry::{DockerHubCredentials, RegistryConfig};
    ///
    /// let config = RegistryConfig::new()
    ///     .with_docker_hub_credentials(DockerHubCredentials::new("user", "pass"));
    /// assert_eq!(config.docker_hub.unwrap().username, "user");
    /// ```
    #[must_use]
    pub fn with_docker_hub_credentials(mut self, credentials: DockerHubCredentials) -> Self {
        self.docker_hub = Some(credentials);
        self
    }

    /// Points the Docker Hub client at different token and registry endpoints.
    #[must_use]
    pub fn with_docker_hub_endpoints(
        mut self,
        auth_url: impl Into<String>,
        registry_url: impl Into<String>,
    ) -> Self {
        self.docker_hub_auth_url = auth_url.into();
        self.docker_hub_registry_url = registry_url.into();
        self
    }

    /// Sets the Azure AD authority base URL.
    #[must_use]
    pub fn with_aad_authority(mut self, url: impl Into<String>) -> Self {
        self.aad_authority_url = url.into();
        self
    }

    /// Sets the scheme used for ACR hosts (`https` or `http`).
    #[must_use]
    pub fn with_acr_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.acr_scheme = scheme.into();
        self
    }
}

/// Docker Hub account used for the token request's Basic credentials.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DockerHubCredentials {
    /// Username.
    pub username: String,

    /// Password or access token.
    pub password: String,
}

impl DockerHubCredentials {
    /// Creates Docker Hub credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for DockerHubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerHubCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
