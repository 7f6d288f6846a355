//! Azure Container Registry client.
//!
//! Token acquisition is a three-step exchange:
//!
//! 1. client credential grant against the tenant's AAD endpoint;
//! 2. `POST /oauth2/exchange` trading the AAD access token for an ACR
//!    refresh token;
//! 3. `POST /oauth2/token` trading the refresh token plus one pull scope
//!    per repository for the bearer token.

use serde::Deserialize;

use crate::client::{read_token_response, Session};
use crate::error::AuthError;

/// AAD service principal used for the client credential grant.
#[derive(Clone)]
pub(crate) struct AadCredentials {
    pub(crate) tenant: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
}

impl std::fmt::Debug for AadCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AadCredentials")
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Azure Container Registry variant of [`RegistryClient`](crate::RegistryClient).
#[derive(Debug)]
pub struct AcrClient {
    pub(crate) session: Session,
    authority_url: String,
    resource: String,
    aad: AadCredentials,
}

#[derive(Debug, Deserialize)]
struct AadTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct AcrTokenResponse {
    access_token: String,
}

impl AcrClient {
    pub(crate) fn new(
        session: Session,
        authority_url: &str,
        resource: String,
        aad: AadCredentials,
    ) -> Self {
        Self {
            session,
            authority_url: authority_url.trim_end_matches('/').to_string(),
            resource,
            aad,
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
        tracing::info!(
            registry = %self.session.identity.host,
            repositories = self.session.repositories.len(),
            "requesting acr bearer token"
        );

        let aad_token = self.aad_access_token().await?;
        let refresh_token = self.exchange_refresh_token(&aad_token).await?;
        self.registry_access_token(&refresh_token).await
    }

    async fn aad_access_token(&self) -> Result<String, AuthError> {
        let url = format!("{}/{}/oauth2/token", self.authority_url, self.aad.tenant);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.aad.client_id.as_str()),
            ("client_secret", self.aad.client_secret.as_str()),
            ("resource", self.resource.as_str()),
        ];

        let response = self.session.http.post(&url).form(&form).send().await;
        let body: AadTokenResponse =
            read_token_response(&self.session.identity.host, "aad token", response).await?;
        Ok(body.access_token)
    }

    async fn exchange_refresh_token(&self, aad_token: &str) -> Result<String, AuthError> {
        let host = self.session.identity.host.as_str();
        let url = format!("{}/oauth2/exchange", self.session.base_url);
        let form = [
            ("grant_type", "access_token"),
            ("service", host),
            ("tenant", self.aad.tenant.as_str()),
            ("access_token", aad_token),
        ];

        let response = self.session.http.post(&url).form(&form).send().await;
        let body: ExchangeResponse = read_token_response(host, "oauth2 exchange", response).await?;
        Ok(body.refresh_token)
    }

    async fn registry_access_token(&self, refresh_token: &str) -> Result<String, AuthError> {
        let host = self.session.identity.host.as_str();
        let url = format!("{}/oauth2/token", self.session.base_url);

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("service", host.to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        form.extend(self.session.pull_scopes().map(|scope| ("scope", scope)));

        let response = self.session.http.post(&url).form(&form).send().await;
        let body: AcrTokenResponse = read_token_response(host, "oauth2 token", response).await?;
        Ok(body.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwatch_core::RegistryIdentity;

    #[test]
    fn test_debug_redacts_client_secret() {
        let aad = AadCredentials {
            tenant: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: "hunter2".to_string(),
        };
        let client = AcrClient::new(
            Session::new(
                reqwest::Client::new(),
                RegistryIdentity::acr("r.azurecr.io", "tenant", "client", "hunter2"),
                "https://r.azurecr.io",
                vec!["app".to_string()],
            ),
            "https://login.microsoftonline.com/",
            "https://management.azure.com/".to_string(),
            aad,
        );

        let debug = format!("{client:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(client.authority_url, "https://login.microsoftonline.com");
    }
}
