//! Contract-style tests for the store ports using the in-memory store.

use bson::doc;
use docsink_ports::{
    CappedOptions, CollectionOptions, IndexDefinition, StoreCollection, StoreConnection,
    StoreConnector, StoreDatabase,
};
use docsink_shared::{RequestContext, Result, SecretString};
use docsink_testkit::{InMemoryStore, StoreOp};

#[tokio::test]
async fn store_port_contract_smoke() -> Result<()> {
    let store = InMemoryStore::new();
    let ctx = RequestContext::new_batch();

    let connection = store
        .connect(&ctx, SecretString::new("mongodb://localhost:27017"))
        .await?;
    assert_eq!(store.connection_uris().await, ["mongodb://localhost:27017"]);
    assert!(store.connect_explicit().is_none());

    let database = connection.database(&ctx, "logs".into()).await?;
    assert_eq!(database.name(), "logs");

    let options = CollectionOptions {
        capped: Some(CappedOptions {
            max_size_bytes: 1_048_576,
            max_documents: Some(10),
        }),
        time_series: None,
    };
    database
        .create_collection(&ctx, "log".into(), options.clone())
        .await?;
    assert_eq!(database.list_collection_names(&ctx).await?, ["log"]);
    assert_eq!(store.collection_options("logs", "log").await, Some(options));

    let collection = database.collection(&ctx, "log".into()).await?;
    collection
        .create_indexes(
            &ctx,
            vec![
                IndexDefinition::descending("Timestamp"),
                IndexDefinition::ascending("Level"),
            ],
        )
        .await?;
    let inserted = collection
        .insert_many(&ctx, vec![doc! { "Message": "a" }, doc! { "Message": "b" }])
        .await?;

    assert_eq!(inserted, 2);
    assert_eq!(store.indexes("logs", "log").await.len(), 2);
    let messages: Vec<_> = store
        .documents("logs", "log")
        .await
        .iter()
        .filter_map(|document| document.get_str("Message").ok().map(str::to_owned))
        .collect();
    assert_eq!(messages, ["a", "b"]);
    assert_eq!(store.calls(StoreOp::CreateCollection), 1);
    assert_eq!(store.calls(StoreOp::CreateIndexes), 1);
    Ok(())
}

#[tokio::test]
async fn creating_an_existing_collection_fails() -> Result<()> {
    let store = InMemoryStore::new();
    store.seed_collection("logs", "log").await;
    let ctx = RequestContext::new_batch();

    let connection = store
        .connect(&ctx, SecretString::new("mongodb://localhost"))
        .await?;
    let database = connection.database(&ctx, "logs".into()).await?;
    let result = database
        .create_collection(&ctx, "log".into(), CollectionOptions::default())
        .await;

    assert!(result.is_err());
    assert_eq!(store.calls(StoreOp::CreateCollection), 1);
    Ok(())
}

#[tokio::test]
async fn repeated_index_definitions_are_idempotent() -> Result<()> {
    let store = InMemoryStore::new();
    let ctx = RequestContext::new_batch();
    let connection = store
        .connect(&ctx, SecretString::new("mongodb://localhost"))
        .await?;
    let database = connection.database(&ctx, "logs".into()).await?;
    let collection = database.collection(&ctx, "log".into()).await?;

    for _ in 0..2 {
        collection
            .create_indexes(&ctx, vec![IndexDefinition::text("Message")])
            .await?;
    }

    assert_eq!(store.indexes("logs", "log").await, [IndexDefinition::text("Message")]);
    assert_eq!(store.calls(StoreOp::CreateIndexes), 2);
    Ok(())
}
