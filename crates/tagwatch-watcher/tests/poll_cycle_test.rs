//! End-to-end poll cycle tests against mock registries.
//!
//! These tests verify:
//! - First observation persists a baseline and emits `New`
//! - A moved tag is merged in place and emits `Updated`
//! - An unchanged tag writes nothing and emits nothing
//! - An ACR authentication failure is scoped to its group while Docker Hub
//!   subscriptions in the same cycle still complete

use std::sync::Arc;
use std::time::Duration;

use tagwatch_core::{ChangeKind, DigestKey, DigestRecord, RegistryIdentity, Subscription};
use tagwatch_registry::{DockerHubCredentials, RegistryClientFactory, RegistryConfig};
use tagwatch_watcher::{
    Detection, DigestStore, FailureKind, MemoryPublisher, MemoryStore, PollCycle,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIGEST_A: &str = "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const DIGEST_B: &str = "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    store: MemoryStore,
    publisher: Arc<MemoryPublisher>,
    cycle: PollCycle,
}

fn harness(hub: &MockServer, acr: Option<&MockServer>, subscriptions: Vec<Subscription>) -> Harness {
    let mut config = RegistryConfig::new()
        .with_timeout(Duration::from_secs(5))
        .with_docker_hub_endpoints(format!("{}/token", hub.uri()), hub.uri())
        .with_docker_hub_credentials(DockerHubCredentials::new("user", "pass"))
        .with_acr_scheme("http");
    if let Some(acr) = acr {
        config = config.with_aad_authority(acr.uri());
    }

    let store = MemoryStore::with_subscriptions(subscriptions);
    let publisher = Arc::new(MemoryPublisher::new());
    let cycle = PollCycle::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        publisher.clone(),
        RegistryClientFactory::new(config).unwrap(),
    );

    Harness {
        store,
        publisher,
        cycle,
    }
}

fn nginx_subscription() -> Subscription {
    Subscription::new(
        "nginx-latest",
        RegistryIdentity::docker_hub(),
        "library/nginx",
        "latest",
        "https://hooks.example.com/nginx",
    )
}

fn nginx_key() -> DigestKey {
    DigestKey::new("docker.io", "library/nginx", "latest")
}

async fn mount_docker_hub(server: &MockServer, digest: &str) {
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "t" })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/latest"))
        .respond_with(ResponseTemplate::new(200).insert_header("Docker-Content-Digest", digest))
        .mount(server)
        .await;
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_first_observation_emits_new() {
    let hub = MockServer::start().await;
    mount_docker_hub(&hub, DIGEST_A).await;
    let h = harness(&hub, None, vec![nginx_subscription()]);

    let report = h.cycle.run().await.unwrap();

    assert_eq!(report.new_count(), 1);
    assert_eq!(report.failed_count(), 0);

    let record = h.store.get(&nginx_key()).await.unwrap().unwrap();
    assert_eq!(record.digest, DIGEST_A);

    let envelopes = h.publisher.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].event_type, ChangeKind::New);
    assert_eq!(envelopes[0].subject, "library/nginx:latest");
    assert_eq!(envelopes[0].data.digest, DIGEST_A);
    assert_eq!(envelopes[0].data.subscription_id, "nginx-latest");
}

#[tokio::test]
async fn test_moved_tag_emits_updated() {
    let hub = MockServer::start().await;
    mount_docker_hub(&hub, DIGEST_B).await;
    let h = harness(&hub, None, vec![nginx_subscription()]);

    let baseline = DigestRecord::new("docker.io", "library/nginx", "latest", DIGEST_A);
    h.store.insert(&baseline).await.unwrap();

    let report = h.cycle.run().await.unwrap();

    assert_eq!(report.updated_count(), 1);
    assert_eq!(
        report.outcome("nginx-latest").and_then(|o| o.detection().cloned()),
        Some(Detection::Updated {
            previous: DIGEST_A.to_string(),
            digest: DIGEST_B.to_string(),
        })
    );

    let record = h.store.get(&nginx_key()).await.unwrap().unwrap();
    assert_eq!(record.digest, DIGEST_B);
    assert_eq!(record.first_seen_at, baseline.first_seen_at);

    let envelopes = h.publisher.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].event_type, ChangeKind::Updated);
    assert_eq!(envelopes[0].data.digest, DIGEST_B);
}

#[tokio::test]
async fn test_unchanged_tag_is_silent() {
    let hub = MockServer::start().await;
    mount_docker_hub(&hub, DIGEST_A).await;
    let h = harness(&hub, None, vec![nginx_subscription()]);

    let baseline = DigestRecord::new("docker.io", "library/nginx", "latest", DIGEST_A);
    h.store.insert(&baseline).await.unwrap();

    let report = h.cycle.run().await.unwrap();

    assert_eq!(report.unchanged_count(), 1);
    assert!(h.publisher.is_empty());

    let record = h.store.get(&nginx_key()).await.unwrap().unwrap();
    assert_eq!(record, baseline);
}

#[tokio::test]
async fn test_acr_auth_failure_is_scoped_to_its_group() {
    let hub = MockServer::start().await;
    let acr = MockServer::start().await;
    mount_docker_hub(&hub, DIGEST_A).await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .expect(1)
        .mount(&acr)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/app/manifests/v1"))
        .respond_with(ResponseTemplate::new(200).insert_header("Docker-Content-Digest", DIGEST_B))
        .expect(0)
        .mount(&acr)
        .await;

    let acr_identity = RegistryIdentity::acr(acr.address().to_string(), "tenant-1", "client-1", "secret-1");
    let subscriptions = vec![
        nginx_subscription(),
        Subscription::new("app-v1", acr_identity.clone(), "app", "v1", "https://hooks.example.com/app"),
        Subscription::new("api-v1", acr_identity, "team/api", "v1", "https://hooks.example.com/api"),
    ];
    let h = harness(&hub, Some(&acr), subscriptions);

    let report = h.cycle.run().await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.new_count(), 1);
    assert_eq!(report.failed_count(), 2);
    for id in ["app-v1", "api-v1"] {
        assert_eq!(
            report.outcome(id).and_then(|o| o.failure_kind()),
            Some(FailureKind::Authentication),
            "{id}"
        );
    }

    // only the Docker Hub subscription was persisted and announced
    assert_eq!(h.store.digest_count().await, 1);
    let envelopes = h.publisher.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].data.subscription_id, "nginx-latest");
}

#[tokio::test]
async fn test_token_is_acquired_once_per_group() {
    let hub = MockServer::start().await;
    mount_docker_hub(&hub, DIGEST_A).await;

    Mock::given(method("GET"))
        .and(path("/v2/library/redis/manifests/7"))
        .respond_with(ResponseTemplate::new(200).insert_header("Docker-Content-Digest", DIGEST_B))
        .mount(&hub)
        .await;

    let subscriptions = vec![
        nginx_subscription(),
        Subscription::new(
            "redis-7",
            RegistryIdentity::docker_hub(),
            "library/redis",
            "7",
            "https://hooks.example.com/redis",
        ),
    ];
    let h = harness(&hub, None, subscriptions);

    // the token mock expects exactly one call
    let report = h.cycle.run().await.unwrap();
    assert_eq!(report.new_count(), 2);
}

#[tokio::test]
async fn test_next_cycle_builds_fresh_client() {
    let hub = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "t" })))
        .expect(2)
        .mount(&hub)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/latest"))
        .respond_with(ResponseTemplate::new(200).insert_header("Docker-Content-Digest", DIGEST_A))
        .mount(&hub)
        .await;

    let h = harness(&hub, None, vec![nginx_subscription()]);

    let first = h.cycle.run().await.unwrap();
    let second = h.cycle.run().await.unwrap();

    assert_eq!(first.new_count(), 1);
    assert_eq!(second.unchanged_count(), 1);
    assert_eq!(h.publisher.len(), 1);
    assert_ne!(first.cycle_id, second.cycle_id);
}
