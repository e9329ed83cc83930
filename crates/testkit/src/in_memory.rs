//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the sink and its resource cache
//! - Deterministic contract tests for the store port
//!
//! Every store call is counted per [`StoreOp`], and any operation can be
//! made to fail with a chosen [`ErrorEnvelope`].

use bson::Document;
use docsink_ports::{
    BoxFuture, CollectionOptions, DiagnosticEvent, IndexDefinition, LogFields, LoggerPort,
    StoreCollection, StoreConnection, StoreConnector, StoreDatabase,
};
use docsink_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: DiagnosticEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event it receives.
///
/// Children share the same record and prepend their base fields.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().expect("recording logger lock").clone()
    }

    /// Recorded events with the given event name.
    pub fn events_named(&self, event: &str) -> Vec<DiagnosticEvent> {
        self.events()
            .into_iter()
            .filter(|recorded| recorded.event.as_ref() == event)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: DiagnosticEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(fields);
        }
        self.events.lock().expect("recording logger lock").push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// Store operations observable on [`InMemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    /// `StoreConnector::connect_explicit` returning a connection.
    ConnectExplicit,
    /// `StoreConnector::connect`.
    Connect,
    /// `StoreConnection::database`.
    Database,
    /// `StoreDatabase::list_collection_names`.
    ListCollectionNames,
    /// `StoreDatabase::create_collection`.
    CreateCollection,
    /// `StoreDatabase::collection`.
    Collection,
    /// `StoreCollection::create_indexes`.
    CreateIndexes,
    /// `StoreCollection::insert_many`.
    InsertMany,
}

impl StoreOp {
    const COUNT: usize = 8;

    const fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct CollectionState {
    options: CollectionOptions,
    indexes: Vec<IndexDefinition>,
    documents: Vec<Document>,
}

#[derive(Debug, Default)]
struct StoreState {
    collections: BTreeMap<(String, String), CollectionState>,
    failures: BTreeMap<StoreOp, ErrorEnvelope>,
    connection_uris: Vec<String>,
}

#[derive(Debug)]
struct StoreInner {
    calls: [AtomicUsize; StoreOp::COUNT],
    state: RwLock<StoreState>,
    explicit: bool,
    delay: Option<Duration>,
}

/// In-memory document store implementing every store port.
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store reached through connection strings.
    #[must_use]
    pub fn new() -> Self {
        Self::build(false, None)
    }

    /// Store whose connector also offers an explicit connection.
    #[must_use]
    pub fn with_explicit_connection(self) -> Self {
        Self::build(true, self.inner.delay)
    }

    /// Store that sleeps before completing every async call.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        Self::build(self.inner.explicit, Some(delay))
    }

    fn build(explicit: bool, delay: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                calls: Default::default(),
                state: RwLock::new(StoreState::default()),
                explicit,
                delay,
            }),
        }
    }

    /// Number of times `op` was invoked (including failed calls).
    pub fn calls(&self, op: StoreOp) -> usize {
        self.inner.calls[op.slot()].load(Ordering::SeqCst)
    }

    /// Make every future `op` call fail with `error`.
    pub async fn fail_on(&self, op: StoreOp, error: ErrorEnvelope) {
        self.inner.state.write().await.failures.insert(op, error);
    }

    /// Stop injecting failures for `op`.
    pub async fn clear_failure(&self, op: StoreOp) {
        self.inner.state.write().await.failures.remove(&op);
    }

    /// Register an existing collection.
    pub async fn seed_collection(&self, database: &str, collection: &str) {
        self.inner
            .state
            .write()
            .await
            .collections
            .entry(key(database, collection))
            .or_default();
    }

    /// Names of every collection in `database`.
    pub async fn collection_names(&self, database: &str) -> Vec<String> {
        self.inner
            .state
            .read()
            .await
            .collections
            .keys()
            .filter(|(db, _)| db == database)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Documents stored in a collection, in insertion order.
    pub async fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.read_collection(database, collection, |state| state.documents.clone())
            .await
            .unwrap_or_default()
    }

    /// Indexes created on a collection, in creation order.
    pub async fn indexes(&self, database: &str, collection: &str) -> Vec<IndexDefinition> {
        self.read_collection(database, collection, |state| state.indexes.clone())
            .await
            .unwrap_or_default()
    }

    /// Options a collection was created with; `None` if it does not exist.
    pub async fn collection_options(
        &self,
        database: &str,
        collection: &str,
    ) -> Option<CollectionOptions> {
        self.read_collection(database, collection, |state| state.options.clone())
            .await
    }

    /// Connection strings passed to `connect`, exposed.
    pub async fn connection_uris(&self) -> Vec<String> {
        self.inner.state.read().await.connection_uris.clone()
    }

    async fn read_collection<T>(
        &self,
        database: &str,
        collection: &str,
        read: impl FnOnce(&CollectionState) -> T,
    ) -> Option<T> {
        let state = self.inner.state.read().await;
        state.collections.get(&key(database, collection)).map(read)
    }

    async fn enter(&self, ctx: &RequestContext, op: StoreOp) -> Result<()> {
        self.inner.calls[op.slot()].fetch_add(1, Ordering::SeqCst);
        ctx.ensure_not_cancelled("in_memory_store")?;
        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }
        match self.inner.state.read().await.failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn connection(&self) -> Arc<dyn StoreConnection> {
        Arc::new(InMemoryConnection {
            store: self.clone(),
        })
    }
}

impl StoreConnector for InMemoryStore {
    fn connect_explicit(&self) -> Option<Result<Arc<dyn StoreConnection>>> {
        if !self.inner.explicit {
            return None;
        }
        self.inner.calls[StoreOp::ConnectExplicit.slot()].fetch_add(1, Ordering::SeqCst);
        Some(Ok(self.connection()))
    }

    fn connect(
        &self,
        ctx: &RequestContext,
        uri: SecretString,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreConnection>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.enter(&ctx, StoreOp::Connect).await?;
            self.inner
                .state
                .write()
                .await
                .connection_uris
                .push(uri.expose().to_owned());
            Ok(self.connection())
        })
    }
}

#[derive(Debug)]
struct InMemoryConnection {
    store: InMemoryStore,
}

impl StoreConnection for InMemoryConnection {
    fn database(
        &self,
        ctx: &RequestContext,
        name: Box<str>,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreDatabase>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.store.enter(&ctx, StoreOp::Database).await?;
            Ok(Arc::new(InMemoryDatabase {
                store: self.store.clone(),
                name,
            }) as Arc<dyn StoreDatabase>)
        })
    }
}

#[derive(Debug)]
struct InMemoryDatabase {
    store: InMemoryStore,
    name: Box<str>,
}

impl StoreDatabase for InMemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_collection_names(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<Vec<String>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.store.enter(&ctx, StoreOp::ListCollectionNames).await?;
            Ok(self.store.collection_names(&self.name).await)
        })
    }

    fn create_collection(
        &self,
        ctx: &RequestContext,
        name: Box<str>,
        options: CollectionOptions,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.store.enter(&ctx, StoreOp::CreateCollection).await?;
            let mut state = self.store.inner.state.write().await;
            let entry = key(&self.name, &name);
            if state.collections.contains_key(&entry) {
                return Err(ErrorEnvelope::unexpected(
                    ErrorCode::new("store", "store_unknown"),
                    format!("collection already exists: {name}"),
                    ErrorClass::NonRetriable,
                ));
            }
            state.collections.insert(
                entry,
                CollectionState {
                    options,
                    ..CollectionState::default()
                },
            );
            Ok(())
        })
    }

    fn collection(
        &self,
        ctx: &RequestContext,
        name: Box<str>,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreCollection>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.store.enter(&ctx, StoreOp::Collection).await?;
            Ok(Arc::new(InMemoryCollection {
                store: self.store.clone(),
                database: self.name.clone(),
                name,
            }) as Arc<dyn StoreCollection>)
        })
    }
}

#[derive(Debug)]
struct InMemoryCollection {
    store: InMemoryStore,
    database: Box<str>,
    name: Box<str>,
}

impl StoreCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_indexes(
        &self,
        ctx: &RequestContext,
        indexes: Vec<IndexDefinition>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.store.enter(&ctx, StoreOp::CreateIndexes).await?;
            let mut state = self.store.inner.state.write().await;
            let collection = state
                .collections
                .entry(key(&self.database, &self.name))
                .or_default();
            for index in indexes {
                if !collection.indexes.contains(&index) {
                    collection.indexes.push(index);
                }
            }
            Ok(())
        })
    }

    fn insert_many(
        &self,
        ctx: &RequestContext,
        documents: Vec<Document>,
    ) -> BoxFuture<'_, Result<usize>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.store.enter(&ctx, StoreOp::InsertMany).await?;
            let inserted = documents.len();
            let mut state = self.store.inner.state.write().await;
            state
                .collections
                .entry(key(&self.database, &self.name))
                .or_default()
                .documents
                .extend(documents);
            Ok(inserted)
        })
    }
}

fn key(database: &str, collection: &str) -> (String, String) {
    (database.to_owned(), collection.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docsink_ports::DiagnosticLevel;
    use serde_json::json;

    #[tokio::test]
    async fn insert_into_unknown_collection_creates_it() -> Result<()> {
        let store = InMemoryStore::new();
        let ctx = RequestContext::new_batch();
        let connection = store.connect(&ctx, SecretString::new("mongodb://localhost")).await?;
        let database = connection.database(&ctx, "logs".into()).await?;
        let collection = database.collection(&ctx, "log".into()).await?;

        assert_eq!(collection.insert_many(&ctx, vec![doc! { "n": 1 }]).await?, 1);
        assert_eq!(store.collection_names("logs").await, ["log"]);
        assert_eq!(store.calls(StoreOp::InsertMany), 1);
        Ok(())
    }

    #[test]
    fn recording_logger_child_shares_the_record() {
        let logger = RecordingLogger::new();
        let mut fields = LogFields::new();
        fields.insert("collection".into(), json!("log"));
        logger.child(fields).warn("sink.batch.failed", "dropped", None);

        let events = logger.events_named("sink.batch.failed");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, DiagnosticLevel::Warn);
        assert_eq!(
            events[0].fields.as_ref().and_then(|fields| fields.get("collection")),
            Some(&json!("log"))
        );
    }
}
