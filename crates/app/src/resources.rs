//! Lazily provisioned store handles.
//!
//! The cache resolves connection, database and collection in that order,
//! each at most once. The first collection resolution also makes sure the
//! collection exists and carries the sink's index set. That setup runs once
//! per cache, even when many callers race to the first resolution, and is
//! not retried if it fails.

use crate::mapper::fields;
use docsink_config::{
    DEFAULT_CONNECTION_URI, SinkConfig, TimeSeriesGranularity as ConfigGranularity,
    ValidatedSinkConfig,
};
use docsink_ports::{
    CappedOptions, CollectionOptions, IndexDefinition, StoreCollection, StoreConnection,
    StoreConnector, StoreDatabase, TimeSeriesGranularity, TimeSeriesOptions,
};
use docsink_shared::{RequestContext, Result, SecretString, timeout_with_context};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Store-facing settings taken from the sink config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
    /// Connection string; the local default is used when absent.
    pub connection_uri: Option<SecretString>,
    /// Target database.
    pub database_name: Box<str>,
    /// Target collection.
    pub collection_name: Box<str>,
    /// Options used if the collection has to be created.
    pub collection_options: CollectionOptions,
    /// TTL for the timestamp index.
    pub expire_after: Option<Duration>,
    /// Deadline for each store call.
    pub timeout: Duration,
}

impl ResourceSettings {
    /// Settings from a validated config.
    #[must_use]
    pub fn from_config(config: &ValidatedSinkConfig) -> Self {
        Self {
            connection_uri: config.connection_uri.clone(),
            database_name: config.database_name().into(),
            collection_name: config.collection_name().into(),
            collection_options: collection_options(config),
            expire_after: config.expire_after(),
            timeout: config.timeout(),
        }
    }

    /// Indexes created on first use, in creation order.
    ///
    /// Capped collections get no TTL; time-series collections get no text
    /// index.
    #[must_use]
    pub fn index_set(&self) -> Vec<IndexDefinition> {
        let mut timestamp = IndexDefinition::descending(fields::TIMESTAMP);
        if let Some(expire_after) = self.expire_after {
            if !self.collection_options.is_capped() {
                timestamp = timestamp.with_expire_after(expire_after);
            }
        }

        let mut indexes = vec![timestamp, IndexDefinition::ascending(fields::LEVEL)];
        if !self.collection_options.is_time_series() {
            indexes.push(IndexDefinition::text(fields::MESSAGE));
        }
        indexes.push(IndexDefinition::ascending(fields::TRACE_ID));
        indexes.push(IndexDefinition::ascending(fields::SPAN_ID));
        indexes
    }

    fn connection_uri(&self) -> SecretString {
        self.connection_uri
            .clone()
            .unwrap_or_else(|| SecretString::new(DEFAULT_CONNECTION_URI))
    }
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self::from_config(&ValidatedSinkConfig::default())
    }
}

fn collection_options(config: &SinkConfig) -> CollectionOptions {
    CollectionOptions {
        capped: config.collection.capped.map(|capped| CappedOptions {
            max_size_bytes: capped.max_size_bytes(),
            max_documents: capped.max_documents,
        }),
        time_series: config
            .collection
            .time_series
            .as_ref()
            .map(|time_series| TimeSeriesOptions {
                time_field: time_series.time_field.clone(),
                meta_field: time_series.meta_field.clone(),
                granularity: time_series.granularity.map(|granularity| match granularity {
                    ConfigGranularity::Seconds => TimeSeriesGranularity::Seconds,
                    ConfigGranularity::Minutes => TimeSeriesGranularity::Minutes,
                    ConfigGranularity::Hours => TimeSeriesGranularity::Hours,
                }),
            }),
    }
}

/// Write-once holder for the store handles used by a sink.
pub struct ResourceCache {
    connector: Arc<dyn StoreConnector>,
    settings: ResourceSettings,
    connection: OnceCell<Arc<dyn StoreConnection>>,
    database: OnceCell<Arc<dyn StoreDatabase>>,
    collection: OnceCell<Arc<dyn StoreCollection>>,
    initialized: AtomicBool,
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResourceCache")
            .field("settings", &self.settings)
            .field("connection", &self.connection.initialized())
            .field("database", &self.database.initialized())
            .field("collection", &self.collection.initialized())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl ResourceCache {
    /// Empty cache; nothing is resolved until first use.
    pub fn new(connector: Arc<dyn StoreConnector>, settings: ResourceSettings) -> Self {
        Self {
            connector,
            settings,
            connection: OnceCell::new(),
            database: OnceCell::new(),
            collection: OnceCell::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Cache for a validated config.
    pub fn from_config(connector: Arc<dyn StoreConnector>, config: &ValidatedSinkConfig) -> Self {
        Self::new(connector, ResourceSettings::from_config(config))
    }

    /// Settings the cache resolves against.
    pub const fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    /// Whether collection setup has been attempted.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The store connection.
    ///
    /// Explicit connector settings win over the configured connection
    /// string, which wins over the local default.
    #[tracing::instrument(name = "resources.connection", skip_all)]
    pub async fn connection(&self, ctx: &RequestContext) -> Result<Arc<dyn StoreConnection>> {
        self.connection
            .get_or_try_init(|| async {
                if let Some(explicit) = self.connector.connect_explicit() {
                    tracing::debug!("using explicit connection settings");
                    return explicit;
                }
                self.bounded(
                    ctx,
                    "store.connect",
                    self.connector.connect(ctx, self.settings.connection_uri()),
                )
                .await
            })
            .await
            .map(Arc::clone)
    }

    /// The target database.
    ///
    /// `connection` is only used when the database is not cached yet; when
    /// absent the cached connection is resolved first.
    #[tracing::instrument(
        name = "resources.database",
        skip_all,
        fields(database = %self.settings.database_name)
    )]
    pub async fn database(
        &self,
        ctx: &RequestContext,
        connection: Option<Arc<dyn StoreConnection>>,
    ) -> Result<Arc<dyn StoreDatabase>> {
        self.database
            .get_or_try_init(|| async move {
                let connection = match connection {
                    Some(connection) => connection,
                    None => self.connection(ctx).await?,
                };
                self.bounded(
                    ctx,
                    "store.database",
                    connection.database(ctx, self.settings.database_name.clone()),
                )
                .await
            })
            .await
            .map(Arc::clone)
    }

    /// The target collection, set up on first resolution.
    ///
    /// `database` is only used when the collection is not cached yet; when
    /// absent the cached database is resolved first. Setup errors are
    /// returned to the caller that triggered the setup.
    #[tracing::instrument(
        name = "resources.collection",
        skip_all,
        fields(collection = %self.settings.collection_name)
    )]
    pub async fn collection(
        &self,
        ctx: &RequestContext,
        database: Option<Arc<dyn StoreDatabase>>,
    ) -> Result<Arc<dyn StoreCollection>> {
        self.collection
            .get_or_try_init(|| async move {
                let database = match database {
                    Some(database) => database,
                    None => self.database(ctx, None).await?,
                };
                let collection = self
                    .bounded(
                        ctx,
                        "store.collection",
                        database.collection(ctx, self.settings.collection_name.clone()),
                    )
                    .await?;
                if !self.initialized.swap(true, Ordering::AcqRel) {
                    self.set_up(ctx, &*database, &*collection).await?;
                }
                Ok(collection)
            })
            .await
            .map(Arc::clone)
    }

    async fn set_up(
        &self,
        ctx: &RequestContext,
        database: &dyn StoreDatabase,
        collection: &dyn StoreCollection,
    ) -> Result<()> {
        let name = &*self.settings.collection_name;
        let existing = self
            .bounded(
                ctx,
                "store.list_collection_names",
                database.list_collection_names(ctx),
            )
            .await?;
        if existing.iter().any(|existing| existing == name) {
            tracing::debug!(collection = name, "collection exists");
        } else {
            self.bounded(
                ctx,
                "store.create_collection",
                database.create_collection(
                    ctx,
                    name.into(),
                    self.settings.collection_options.clone(),
                ),
            )
            .await?;
            tracing::debug!(collection = name, "collection created");
        }

        let indexes = self.settings.index_set();
        let count = indexes.len();
        self.bounded(
            ctx,
            "store.create_indexes",
            collection.create_indexes(ctx, indexes),
        )
        .await?;
        tracing::debug!(collection = name, indexes = count, "indexes ensured");
        Ok(())
    }

    /// Run one store call under the configured deadline.
    pub(crate) async fn bounded<T, F>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        timeout_with_context(ctx, self.settings.timeout, operation, call).await
    }
}
