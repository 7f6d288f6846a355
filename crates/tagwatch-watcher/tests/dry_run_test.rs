//! Dry-run tests against a file store and a mock Docker Hub.
//!
//! A dry run classifies changes against the persisted baseline but must
//! leave `digests.json` exactly as it found it, so the next real cycle still
//! sees (and announces) the change.

use std::time::Duration;

use tagwatch_core::{DigestRecord, RegistryIdentity, Subscription};
use tagwatch_registry::RegistryConfig;
use tagwatch_watcher::file_store::DIGESTS_FILE;
use tagwatch_watcher::{DigestStore, StoreConfig, Watcher, WatcherConfig};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIGEST_A: &str = "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const DIGEST_B: &str = "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

async fn mock_hub() -> MockServer {
    let hub = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "t" })))
        .mount(&hub)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/manifests/latest"))
        .respond_with(ResponseTemplate::new(200).insert_header("Docker-Content-Digest", DIGEST_B))
        .mount(&hub)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/library/redis/manifests/7"))
        .respond_with(ResponseTemplate::new(200).insert_header("Docker-Content-Digest", DIGEST_A))
        .mount(&hub)
        .await;

    hub
}

fn config(dir: &TempDir, hub: &MockServer) -> WatcherConfig {
    WatcherConfig {
        store: StoreConfig {
            path: dir.path().to_path_buf(),
        },
        registry: RegistryConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_docker_hub_endpoints(format!("{}/token", hub.uri()), hub.uri()),
        ..WatcherConfig::default()
    }
}

async fn seed(watcher: &Watcher) {
    let store = watcher.store();
    for (id, repository, tag) in [("nginx", "library/nginx", "latest"), ("redis", "library/redis", "7")] {
        store
            .add_subscription(Subscription::new(
                id,
                RegistryIdentity::docker_hub(),
                repository,
                tag,
                "https://hooks.example.com",
            ))
            .await
            .unwrap();
    }
    store
        .insert(&DigestRecord::new("docker.io", "library/nginx", "latest", DIGEST_A))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dry_run_leaves_digests_untouched() {
    let hub = mock_hub().await;
    let dir = TempDir::new().unwrap();

    seed(&Watcher::open(config(&dir, &hub)).await.unwrap()).await;
    let before = std::fs::read(dir.path().join(DIGESTS_FILE)).unwrap();

    let dry = Watcher::dry_run(config(&dir, &hub)).await.unwrap();
    let report = dry.check_once().await.unwrap();

    assert_eq!(report.updated_count(), 1);
    assert_eq!(report.new_count(), 1);
    assert_eq!(report.failed_count(), 0);
    assert_eq!(std::fs::read(dir.path().join(DIGESTS_FILE)).unwrap(), before);
}

#[tokio::test]
async fn test_real_cycle_after_dry_run_still_sees_changes() {
    let hub = mock_hub().await;
    let dir = TempDir::new().unwrap();

    seed(&Watcher::open(config(&dir, &hub)).await.unwrap()).await;

    let dry = Watcher::dry_run(config(&dir, &hub)).await.unwrap();
    dry.check_once().await.unwrap();

    let watcher = Watcher::open(config(&dir, &hub)).await.unwrap();
    let report = watcher.check_once().await.unwrap();

    assert_eq!(report.updated_count(), 1);
    assert_eq!(report.new_count(), 1);

    let key = DigestRecord::new("docker.io", "library/nginx", "latest", DIGEST_B).key();
    let stored = watcher.store().get(&key).await.unwrap().unwrap();
    assert_eq!(stored.digest, DIGEST_B);
}
