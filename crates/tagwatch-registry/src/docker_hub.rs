//! Docker Hub client.
//!
//! Tokens come from the public token endpoint with HTTP Basic credentials
//! and one pull scope per repository in the group.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::Deserialize;

use crate::client::{read_token_response, Session};
use crate::config::DockerHubCredentials;
use crate::error::AuthError;

const STEP: &str = "docker hub token";

/// Docker Hub variant of [`RegistryClient`](crate::RegistryClient).
#[derive(Debug)]
pub struct DockerHubClient {
    pub(crate) session: Session,
    auth_url: String,
    service: String,
    credentials: Option<DockerHubCredentials>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl DockerHubClient {
    pub(crate) const fn new(
        session: Session,
        auth_url: String,
        service: String,
        credentials: Option<DockerHubCredentials>,
    ) -> Self {
        Self {
            session,
            auth_url,
            service,
            credentials,
        }
    }

    /// Returns the bearer token, acquiring it on first use.
    pub(crate) async fn bearer_token(&self) -> Result<String, AuthError> {
        self.session
            .token
            .get_or_acquire(|| self.acquire_token())
            .await
    }

    async fn acquire_token(&self) -> Result<String, AuthError> {
        let registry = self.session.identity.host.as_str();

        let mut query = vec![("service", self.service.clone())];
        query.extend(self.session.pull_scopes().map(|scope| ("scope", scope)));

        tracing::info!(
            registry = %registry,
            repositories = self.session.repositories.len(),
            "requesting docker hub bearer token"
        );

        let mut request = self.session.http.get(&self.auth_url).query(&query);
        if let Some(header) = self.basic_auth_header()? {
            request = request.header(AUTHORIZATION, header);
        }

        let body: TokenResponse = read_token_response(registry, STEP, request.send().await).await?;
        body.token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::other(registry, STEP, "token response has no token"))
    }

    fn basic_auth_header(&self) -> Result<Option<HeaderValue>, AuthError> {
        let Some(DockerHubCredentials { username, password }) = &self.credentials else {
            return Ok(None);
        };

        let credentials = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            format!("{username}:{password}"),
        );
        let mut value = HeaderValue::from_str(&format!("Basic {credentials}")).map_err(|_| {
            AuthError::other(&self.session.identity.host, STEP, "invalid credentials")
        })?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}
