//! Redis integration tests
//!
//! Run with:
//!
//! ```bash
//! cargo test -p cache --test redis_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use cache::{Cache, CacheExt, RedisCache};
use serial_test::serial;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Redis>,
    url: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Redis::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(6379).await.unwrap();

            Arc::new(ContainerInfo {
                container,
                url: format!("redis://{}:{}", host, port),
            })
        })
        .await
        .clone()
}

async fn get_test_cache() -> RedisCache {
    let info = get_container_info().await;
    RedisCache::connect(&info.url).await.unwrap()
}

#[tokio::test]
#[serial]
async fn set_get_remove() {
    let cache = get_test_cache().await;

    cache
        .set("order:test:1", "payload".to_string(), Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(
        cache.get("order:test:1").await.unwrap().as_deref(),
        Some("payload")
    );

    cache.remove("order:test:1").await.unwrap();
    assert!(cache.get("order:test:1").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn remove_missing_key_is_ok() {
    let cache = get_test_cache().await;

    cache.remove("order:test:missing").await.unwrap();
}

#[tokio::test]
#[serial]
async fn entries_expire() {
    let cache = get_test_cache().await;

    cache
        .set("order:test:ttl", "payload".to_string(), Duration::from_secs(1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(cache.get("order:test:ttl").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn json_round_trip() {
    let cache = get_test_cache().await;
    let value = serde_json::json!({"clientName": "Ana", "totalCents": 4000});

    cache
        .set_json("order:test:json", &value, Duration::from_secs(60))
        .await
        .unwrap();
    let read: Option<serde_json::Value> = cache.get_json("order:test:json").await.unwrap();

    assert_eq!(read, Some(value));
}
