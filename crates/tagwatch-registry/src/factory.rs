//! Registry client construction.

use tagwatch_core::{ProviderType, RegistryIdentity};

use crate::acr::{AadCredentials, AcrClient};
use crate::client::{RegistryClient, Session};
use crate::config::RegistryConfig;
use crate::docker_hub::DockerHubClient;
use crate::error::RegistryError;

/// Builds the [`RegistryClient`] variant matching a registry identity.
///
/// The factory owns one HTTP connection pool that every client it builds
/// shares; token state is per client.
#[derive(Debug, Clone)]
pub struct RegistryClientFactory {
    config: RegistryConfig,
    http: reqwest::Client,
}

impl RegistryClientFactory {
    /// Creates a factory with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or an endpoint
    /// URL is invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tagwatch_registry::{RegistryClientFactory, RegistryConfig};
    ///
    /// let factory = RegistryClientFactory::new(RegistryConfig::new())?;
    /// # Ok::<(), tagwatch_registry::RegistryError>(())
    /// ```
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        for (name, value) in [
            ("docker_hub_auth_url", &config.docker_hub_auth_url),
            ("docker_hub_registry_url", &config.docker_hub_registry_url),
            ("aad_authority_url", &config.aad_authority_url),
        ] {
            url::Url::parse(value).map_err(|e| RegistryError::InvalidConfig {
                reason: format!("{name} '{value}' is not a valid URL: {e}"),
            })?;
        }

        if !matches!(config.acr_scheme.as_str(), "http" | "https") {
            return Err(RegistryError::InvalidConfig {
                reason: format!("unsupported acr_scheme '{}'", config.acr_scheme),
            });
        }

        let http = Self::build_http_client(&config)?;
        Ok(Self { config, http })
    }

    /// Returns the factory configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates a client for `identity` whose token covers `repositories`.
    ///
    /// Repositories are deduplicated; several subscriptions may watch
    /// different tags of the same repository.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedProvider`] for providers without a
    /// client variant, or [`RegistryError::InvalidConfig`] if the identity
    /// lacks fields its provider needs.
    pub fn create<I, S>(
        &self,
        identity: &RegistryIdentity,
        repositories: I,
    ) -> Result<RegistryClient, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut repositories: Vec<String> = repositories.into_iter().map(Into::into).collect();
        repositories.sort();
        repositories.dedup();

        match &identity.provider {
            ProviderType::DockerHub => {
                let session = Session::new(
                    self.http.clone(),
                    identity.clone(),
                    &self.config.docker_hub_registry_url,
                    repositories,
                );
                Ok(RegistryClient::DockerHub(DockerHubClient::new(
                    session,
                    self.config.docker_hub_auth_url.clone(),
                    self.config.docker_hub_service.clone(),
                    self.config.docker_hub.clone(),
                )))
            }
            ProviderType::AzureContainerRegistry => {
                let (tenant, client_id, client_secret) =
                    identity
                        .aad_credentials()
                        .ok_or_else(|| RegistryError::InvalidConfig {
                            reason: format!(
                                "registry {} is missing AAD tenant, client id or client secret",
                                identity.host
                            ),
                        })?;
                let aad = AadCredentials {
                    tenant: tenant.to_string(),
                    client_id: client_id.to_string(),
                    client_secret: client_secret.to_string(),
                };
                let base_url = format!("{}://{}", self.config.acr_scheme, identity.host);
                let session = Session::new(self.http.clone(), identity.clone(), base_url, repositories);
                Ok(RegistryClient::Acr(AcrClient::new(
                    session,
                    &self.config.aad_authority_url,
                    self.config.aad_resource.clone(),
                    aad,
                )))
            }
            ProviderType::Unknown(name) => Err(RegistryError::UnsupportedProvider {
                provider: name.clone(),
            }),
        }
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(config: &RegistryConfig) -> Result<reqwest::Client, RegistryError> {
        reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| RegistryError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })
    }
}
