//! Resource cache behaviour against the in-memory store.

use docsink_app::{ResourceCache, ResourceSettings};
use docsink_config::{CappedConfig, CollectionConfig, SinkConfig, TimeSeriesConfig};
use docsink_ports::{IndexDefinition, StoreConnector};
use docsink_shared::{ErrorCode, RequestContext, SecretString};
use docsink_testkit::errors::{connection_error, write_error};
use docsink_testkit::{InMemoryStore, StoreOp};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

type TestResult = Result<(), Box<dyn Error>>;

fn cache(store: &InMemoryStore, config: SinkConfig) -> Result<Arc<ResourceCache>, Box<dyn Error>> {
    let config = config.validate_and_normalize()?;
    let connector: Arc<dyn StoreConnector> = Arc::new(store.clone());
    Ok(Arc::new(ResourceCache::from_config(connector, &config)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_sets_up_once() -> TestResult {
    let store = InMemoryStore::new().with_delay(Duration::from_millis(5));
    let cache = cache(&store, SinkConfig::default())?;

    let mut racers = JoinSet::new();
    for _ in 0..16 {
        let cache = Arc::clone(&cache);
        racers.spawn(async move {
            let ctx = RequestContext::new_batch();
            cache.collection(&ctx, None).await
        });
    }

    let mut collections = Vec::new();
    while let Some(joined) = racers.join_next().await {
        collections.push(joined??);
    }
    let first = collections.first().ok_or("no racer finished")?;
    assert!(collections.iter().all(|other| Arc::ptr_eq(first, other)));

    assert_eq!(store.calls(StoreOp::Connect), 1);
    assert_eq!(store.calls(StoreOp::Database), 1);
    assert_eq!(store.calls(StoreOp::Collection), 1);
    assert_eq!(store.calls(StoreOp::ListCollectionNames), 1);
    assert_eq!(store.calls(StoreOp::CreateCollection), 1);
    assert_eq!(store.calls(StoreOp::CreateIndexes), 1);
    assert!(cache.is_initialized());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connection_calls_share_one_instance() -> TestResult {
    let store = InMemoryStore::new().with_delay(Duration::from_millis(5));
    let cache = cache(&store, SinkConfig::default())?;

    let mut racers = JoinSet::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        racers.spawn(async move { cache.connection(&RequestContext::new_batch()).await });
    }
    let mut connections = Vec::new();
    while let Some(joined) = racers.join_next().await {
        connections.push(joined??);
    }

    let first = connections.first().ok_or("no racer finished")?;
    assert!(connections.iter().all(|other| Arc::ptr_eq(first, other)));
    assert_eq!(store.calls(StoreOp::Connect), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_database_calls_share_one_instance() -> TestResult {
    let store = InMemoryStore::new().with_delay(Duration::from_millis(5));
    let cache = cache(&store, SinkConfig::default())?;

    let mut racers = JoinSet::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        racers.spawn(async move { cache.database(&RequestContext::new_batch(), None).await });
    }
    let mut databases = Vec::new();
    while let Some(joined) = racers.join_next().await {
        databases.push(joined??);
    }

    let first = databases.first().ok_or("no racer finished")?;
    assert!(databases.iter().all(|other| Arc::ptr_eq(first, other)));
    assert_eq!(store.calls(StoreOp::Connect), 1);
    assert_eq!(store.calls(StoreOp::Database), 1);
    assert!(!cache.is_initialized());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_store_calls_hit_the_configured_timeout() -> TestResult {
    let store = InMemoryStore::new().with_delay(Duration::from_secs(5));
    let config = SinkConfig {
        timeout_ms: 1_000,
        ..SinkConfig::default()
    };
    let cache = cache(&store, config)?;

    let error = cache
        .connection(&RequestContext::new_batch())
        .await
        .err()
        .ok_or("expected timeout")?;

    assert_eq!(error.code, ErrorCode::timeout());
    assert_eq!(
        error.metadata.get("operation").map(String::as_str),
        Some("store.connect")
    );
    assert_eq!(
        error.metadata.get("timeout_ms").map(String::as_str),
        Some("1000")
    );
    Ok(())
}

#[tokio::test]
async fn existing_collection_is_not_recreated() -> TestResult {
    let store = InMemoryStore::new();
    store.seed_collection("logs", "log").await;
    let cache = cache(&store, SinkConfig::default())?;

    cache.collection(&RequestContext::new_batch(), None).await?;

    assert_eq!(store.calls(StoreOp::ListCollectionNames), 1);
    assert_eq!(store.calls(StoreOp::CreateCollection), 0);
    assert_eq!(store.calls(StoreOp::CreateIndexes), 1);
    Ok(())
}

#[tokio::test]
async fn configured_names_and_options_are_used() -> TestResult {
    let store = InMemoryStore::new();
    let config = SinkConfig {
        database_name: Some("audit".into()),
        collection_name: Some("events".into()),
        expire_after_secs: Some(600),
        collection: CollectionConfig {
            capped: Some(CappedConfig {
                max_size_mb: 16,
                max_documents: None,
            }),
            time_series: None,
        },
        ..SinkConfig::default()
    };
    let cache = cache(&store, config)?;

    cache.collection(&RequestContext::new_batch(), None).await?;

    assert_eq!(store.collection_names("audit").await, ["events"]);
    let options = store
        .collection_options("audit", "events")
        .await
        .ok_or("collection was not created")?;
    assert!(options.is_capped());
    let indexes = store.indexes("audit", "events").await;
    assert_eq!(indexes, cache.settings().index_set());
    assert!(indexes.iter().all(|index| index.expire_after.is_none()));
    Ok(())
}

#[tokio::test]
async fn time_series_collection_has_no_text_index() -> TestResult {
    let store = InMemoryStore::new();
    let config = SinkConfig {
        collection: CollectionConfig {
            capped: None,
            time_series: Some(TimeSeriesConfig::default()),
        },
        ..SinkConfig::default()
    };
    let cache = cache(&store, config)?;

    cache.collection(&RequestContext::new_batch(), None).await?;

    let indexes = store.indexes("logs", "log").await;
    assert!(!indexes.contains(&IndexDefinition::text("Message")));
    assert_eq!(indexes.len(), 4);
    assert!(
        store
            .collection_options("logs", "log")
            .await
            .is_some_and(|options| options.is_time_series())
    );
    Ok(())
}

#[tokio::test]
async fn explicit_connection_wins_over_uri() -> TestResult {
    let store = InMemoryStore::new().with_explicit_connection();
    let config = SinkConfig {
        connection_uri: Some(SecretString::new("mongodb://db.internal:27017")),
        ..SinkConfig::default()
    };
    let cache = cache(&store, config)?;

    cache.connection(&RequestContext::new_batch()).await?;

    assert_eq!(store.calls(StoreOp::ConnectExplicit), 1);
    assert_eq!(store.calls(StoreOp::Connect), 0);
    Ok(())
}

#[tokio::test]
async fn configured_uri_wins_over_default() -> TestResult {
    let store = InMemoryStore::new();
    let config = SinkConfig {
        connection_uri: Some(SecretString::new("mongodb://db.internal:27017")),
        ..SinkConfig::default()
    };
    cache(&store, config)?
        .connection(&RequestContext::new_batch())
        .await?;

    assert_eq!(store.connection_uris().await, ["mongodb://db.internal:27017"]);
    Ok(())
}

#[tokio::test]
async fn default_uri_is_used_last() -> TestResult {
    let store = InMemoryStore::new();
    cache(&store, SinkConfig::default())?
        .connection(&RequestContext::new_batch())
        .await?;

    assert_eq!(store.connection_uris().await, ["mongodb://localhost:27017"]);
    Ok(())
}

#[tokio::test]
async fn supplied_database_skips_connection() -> TestResult {
    let store = InMemoryStore::new();
    let cache = cache(&store, SinkConfig::default())?;
    let other = ResourceCache::new(Arc::new(store.clone()), ResourceSettings::default());
    let ctx = RequestContext::new_batch();
    let database = other.database(&ctx, None).await?;
    let connects = store.calls(StoreOp::Connect);

    cache.collection(&ctx, Some(database)).await?;

    assert_eq!(store.calls(StoreOp::Connect), connects);
    assert!(cache.is_initialized());
    Ok(())
}

#[tokio::test]
async fn connection_failure_propagates_and_is_retried() -> TestResult {
    let store = InMemoryStore::new();
    store.fail_on(StoreOp::Connect, connection_error()).await;
    let cache = cache(&store, SinkConfig::default())?;
    let ctx = RequestContext::new_batch();

    let error = cache.collection(&ctx, None).await.err().ok_or("expected failure")?;
    assert_eq!(error.code, connection_error().code);
    assert!(!cache.is_initialized());

    store.clear_failure(StoreOp::Connect).await;
    cache.collection(&ctx, None).await?;
    assert_eq!(store.calls(StoreOp::Connect), 2);
    assert_eq!(store.calls(StoreOp::CreateIndexes), 1);
    Ok(())
}

#[tokio::test]
async fn setup_failure_propagates_once_and_is_not_repeated() -> TestResult {
    let store = InMemoryStore::new();
    store.fail_on(StoreOp::CreateIndexes, write_error()).await;
    let cache = cache(&store, SinkConfig::default())?;
    let ctx = RequestContext::new_batch();

    let error = cache.collection(&ctx, None).await.err().ok_or("expected failure")?;
    assert_eq!(error.code, write_error().code);
    assert!(cache.is_initialized());

    cache.collection(&ctx, None).await?;
    assert_eq!(store.calls(StoreOp::CreateIndexes), 1);
    assert_eq!(store.calls(StoreOp::ListCollectionNames), 1);
    assert_eq!(store.calls(StoreOp::Collection), 2);
    Ok(())
}
