//! Registry client abstraction.
//!
//! [`RegistryClient`] is a closed set of provider variants behind a single
//! capability, [`RegistryClient::resolve_digest`]. Variants differ only in
//! how they obtain a bearer token; manifest resolution is shared.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tagwatch_core::{ProviderType, RegistryIdentity};

use crate::acr::AcrClient;
use crate::credential::CredentialCache;
use crate::docker_hub::DockerHubClient;
use crate::error::{AuthError, RegistryError};

/// Docker Registry v2 manifest media type.
pub const MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Response header carrying the manifest digest.
pub const DIGEST_HEADER: &str = "Docker-Content-Digest";

/// Anything that can resolve `repository:tag` to a content digest.
#[async_trait]
pub trait DigestResolver: Send + Sync {
    /// Resolves the digest `repository:tag` currently points at.
    async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<String, RegistryError>;
}

/// Client for one registry group within one poll cycle.
#[derive(Debug)]
pub enum RegistryClient {
    /// Docker Hub.
    DockerHub(DockerHubClient),

    /// Azure Container Registry.
    Acr(AcrClient),
}

impl RegistryClient {
    /// Returns the identity this client was built for.
    #[must_use]
    pub const fn identity(&self) -> &RegistryIdentity {
        &self.session().identity
    }

    /// Returns the provider of this client.
    #[must_use]
    pub const fn provider(&self) -> &ProviderType {
        &self.session().identity.provider
    }

    /// Returns the repositories included in this client's token scope.
    #[must_use]
    pub fn repositories(&self) -> &[String] {
        &self.session().repositories
    }

    /// Returns true once a token acquisition has completed.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.session().token.is_resolved()
    }

    /// Resolves the digest `repository:tag` currently points at.
    ///
    /// The first call acquires a bearer token for every repository in the
    /// group; concurrent and later calls reuse it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Authentication`] if the token cannot be
    /// obtained, [`RegistryError::ResolutionFailed`] if the manifest
    /// endpoint fails, or [`RegistryError::MissingDigest`] if the response
    /// carries no digest.
    pub async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<String, RegistryError> {
        let token = match self {
            Self::DockerHub(client) => client.bearer_token().await?,
            Self::Acr(client) => client.bearer_token().await?,
        };
        self.session().fetch_digest(&token, repository, tag).await
    }

    const fn session(&self) -> &Session {
        match self {
            Self::DockerHub(client) => &client.session,
            Self::Acr(client) => &client.session,
        }
    }
}

#[async_trait]
impl DigestResolver for RegistryClient {
    async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<String, RegistryError> {
        Self::resolve_digest(self, repository, tag).await
    }
}

/// State shared by every provider variant.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) http: reqwest::Client,
    pub(crate) identity: RegistryIdentity,
    pub(crate) base_url: String,
    pub(crate) repositories: Vec<String>,
    pub(crate) token: CredentialCache<String, AuthError>,
}

impl Session {
    pub(crate) fn new(
        http: reqwest::Client,
        identity: RegistryIdentity,
        base_url: impl Into<String>,
        repositories: Vec<String>,
    ) -> Self {
        Self {
            http,
            identity,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repositories,
            token: CredentialCache::new(),
        }
    }

    /// Fetches the manifest for `repository:tag` and reads its digest header.
    async fn fetch_digest(
        &self,
        token: &str,
        repository: &str,
        tag: &str,
    ) -> Result<String, RegistryError> {
        let reference = format!("{repository}:{tag}");
        let url = format!("{}/v2/{repository}/manifests/{tag}", self.base_url);

        tracing::debug!(registry = %self.identity.host, reference = %reference, "querying digest");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, MANIFEST_V2)
            .send()
            .await
            .map_err(|e| RegistryError::ResolutionFailed {
                reference: reference.clone(),
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::ResolutionFailed {
                reference,
                status: Some(status.as_u16()),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let digest = response
            .headers()
            .get(DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| RegistryError::MissingDigest {
                reference: reference.clone(),
            })?;

        tracing::debug!(registry = %self.identity.host, reference = %reference, digest = %digest, "digest resolved");

        Ok(digest)
    }

    /// Builds the pull scopes for every repository in the group.
    pub(crate) fn pull_scopes(&self) -> impl Iterator<Item = String> + '_ {
        self.repositories
            .iter()
            .map(|repo| format!("repository:{repo}:pull"))
    }
}

/// Reads a successful JSON token response or turns the failure into an [`AuthError`].
pub(crate) async fn read_token_response<T>(
    registry: &str,
    step: &str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, AuthError>
where
    T: serde::de::DeserializeOwned,
{
    let response = response.map_err(|e| AuthError::other(registry, step, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::status(registry, step, status.as_u16(), body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AuthError::other(registry, step, format!("malformed token response: {e}")))
}
