//! Integration tests for registry clients against mock registries.
//!
//! These tests verify:
//! - Docker Hub token requests (Basic credentials, one scope per repository)
//! - The ACR three-step token exchange
//! - Manifest digest resolution and its failure modes
//! - Single-flight token acquisition under concurrent resolutions

use std::time::Duration;

use tagwatch_core::RegistryIdentity;
use tagwatch_registry::{
    DockerHubCredentials, RegistryClientFactory, RegistryConfig, RegistryError, MANIFEST_V2,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NGINX_DIGEST: &str =
    "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const APP_DIGEST: &str =
    "sha256:cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";

/// Factory pointing Docker Hub and AAD endpoints at the mock server.
fn factory_for(server: &MockServer) -> RegistryClientFactory {
    let config = RegistryConfig::new()
        .with_timeout(Duration::from_secs(5))
        .with_docker_hub_endpoints(format!("{}/token", server.uri()), server.uri())
        .with_docker_hub_credentials(DockerHubCredentials::new("user", "pass"))
        .with_aad_authority(server.uri())
        .with_acr_scheme("http");
    RegistryClientFactory::new(config).unwrap()
}

/// ACR identity whose host is the mock server.
fn acr_identity(server: &MockServer) -> RegistryIdentity {
    RegistryIdentity::acr(
        server.address().to_string(),
        "tenant-1",
        "client-1",
        "secret-1",
    )
}

fn digest_response(digest: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Docker-Content-Digest", digest)
        .set_body_json(serde_json::json!({ "schemaVersion": 2 }))
}

async fn mount_docker_hub_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("service", "registry.docker.io"))
        .and(query_param("scope", "repository:library/nginx:pull"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "token": "hub-token" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_acr_exchange(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "aad-token" })),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/exchange"))
        .and(body_string_contains("grant_type=access_token"))
        .and(body_string_contains("access_token=aad-token"))
        .and(body_string_contains("tenant=tenant-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "refresh_token": "acr-refresh" })),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=acr-refresh"))
        .and(body_string_contains("scope=repository%3Aapp%3Apull"))
        .and(body_string_contains("scope=repository%3Ateam%2Fapi%3Apull"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "acr-token" })),
        )
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Docker Hub
// ============================================================================

#[tokio::test]
async fn test_docker_hub_resolves_digest() {
    let server = MockServer::start().await;
    mount_docker_hub_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/latest"))
        .and(header("authorization", "Bearer hub-token"))
        .and(header("accept", MANIFEST_V2))
        .respond_with(digest_response(NGINX_DIGEST))
        .expect(1)
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&RegistryIdentity::docker_hub(), ["library/nginx"])
        .unwrap();

    let digest = client.resolve_digest("library/nginx", "latest").await.unwrap();
    assert_eq!(digest, NGINX_DIGEST);
    assert!(client.has_token());
}

#[tokio::test]
async fn test_docker_hub_requests_one_scope_per_repository() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("scope", "repository:library/nginx:pull"))
        .and(query_param("scope", "repository:library/redis:pull"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "t" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/library/redis/manifests/7"))
        .respond_with(digest_response(APP_DIGEST))
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&RegistryIdentity::docker_hub(), ["library/nginx", "library/redis"])
        .unwrap();

    assert_eq!(
        client.resolve_digest("library/redis", "7").await.unwrap(),
        APP_DIGEST
    );
}

#[tokio::test]
async fn test_concurrent_resolutions_acquire_token_once() {
    let server = MockServer::start().await;
    mount_docker_hub_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/latest"))
        .respond_with(digest_response(NGINX_DIGEST))
        .expect(10)
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&RegistryIdentity::docker_hub(), ["library/nginx"])
        .unwrap();

    let resolutions = (0..10).map(|_| client.resolve_digest("library/nginx", "latest"));
    let results = futures::future::join_all(resolutions).await;

    for result in results {
        assert_eq!(result.unwrap(), NGINX_DIGEST);
    }
}

#[tokio::test]
async fn test_docker_hub_token_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/latest"))
        .respond_with(digest_response(NGINX_DIGEST))
        .expect(0)
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&RegistryIdentity::docker_hub(), ["library/nginx"])
        .unwrap();

    let err = client.resolve_digest("library/nginx", "latest").await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_malformed_token_response_is_authentication_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&RegistryIdentity::docker_hub(), ["library/nginx"])
        .unwrap();

    let err = client.resolve_digest("library/nginx", "latest").await.unwrap_err();
    assert!(matches!(err, RegistryError::Authentication(ref e) if e.status.is_none()));
}

// ============================================================================
// Manifest resolution failures
// ============================================================================

#[tokio::test]
async fn test_manifest_not_found_is_resolution_failure() {
    let server = MockServer::start().await;
    mount_docker_hub_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("manifest unknown"))
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&RegistryIdentity::docker_hub(), ["library/nginx"])
        .unwrap();

    let err = client.resolve_digest("library/nginx", "missing").await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::ResolutionFailed { status: Some(404), ref reference, .. }
            if reference == "library/nginx:missing"
    ));
}

#[tokio::test]
async fn test_missing_digest_header() {
    let server = MockServer::start().await;
    mount_docker_hub_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&RegistryIdentity::docker_hub(), ["library/nginx"])
        .unwrap();

    let err = client.resolve_digest("library/nginx", "latest").await.unwrap_err();
    assert!(matches!(err, RegistryError::MissingDigest { .. }));
}

// ============================================================================
// Azure Container Registry
// ============================================================================

#[tokio::test]
async fn test_acr_three_step_exchange() {
    let server = MockServer::start().await;
    mount_acr_exchange(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/app/manifests/v1"))
        .and(header("authorization", "Bearer acr-token"))
        .and(header("accept", MANIFEST_V2))
        .respond_with(digest_response(APP_DIGEST))
        .expect(2)
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&acr_identity(&server), ["app", "team/api"])
        .unwrap();

    // second resolution reuses the cached token
    for _ in 0..2 {
        let digest = client.resolve_digest("app", "v1").await.unwrap();
        assert_eq!(digest, APP_DIGEST);
    }
}

#[tokio::test]
async fn test_acr_aad_unauthorized_stops_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/exchange"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/manifests/v1"))
        .respond_with(digest_response(APP_DIGEST))
        .expect(0)
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&acr_identity(&server), ["app"])
        .unwrap();

    // the failed acquisition is shared, not retried
    for _ in 0..2 {
        let err = client.resolve_digest("app", "v1").await.unwrap_err();
        match err {
            RegistryError::Authentication(auth) => {
                assert_eq!(auth.status, Some(401));
                assert_eq!(auth.step, "aad token");
            }
            other => panic!("expected authentication failure, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_acr_exchange_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "aad-token" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/exchange"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = factory_for(&server)
        .create(&acr_identity(&server), ["app"])
        .unwrap();

    let err = client.resolve_digest("app", "v1").await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Authentication(ref e) if e.step == "oauth2 exchange" && e.status == Some(500)
    ));
}
