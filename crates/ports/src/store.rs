//! Document store boundary contract.
//!
//! The store is modelled as a chain of handles: a connector yields a
//! connection, a connection resolves databases, a database resolves
//! collections. Every call that may touch the network takes a
//! [`RequestContext`] and returns a [`BoxFuture`].

use crate::BoxFuture;
use bson::Document;
use docsink_shared::{RequestContext, Result, SecretString};
use std::sync::Arc;
use std::time::Duration;

/// Size limits for a capped collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedOptions {
    /// Maximum collection size in bytes.
    pub max_size_bytes: u64,
    /// Maximum number of documents, if limited.
    pub max_documents: Option<u64>,
}

/// Bucketing hint for time-series collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSeriesGranularity {
    /// Measurements arrive seconds apart.
    Seconds,
    /// Measurements arrive minutes apart.
    Minutes,
    /// Measurements arrive hours apart.
    Hours,
}

/// Time-series collection layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesOptions {
    /// Field holding the measurement time.
    pub time_field: Box<str>,
    /// Field holding per-series metadata.
    pub meta_field: Option<Box<str>>,
    /// Bucketing hint.
    pub granularity: Option<TimeSeriesGranularity>,
}

/// Options applied when the target collection is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Capped collection limits.
    pub capped: Option<CappedOptions>,
    /// Time-series layout.
    pub time_series: Option<TimeSeriesOptions>,
}

impl CollectionOptions {
    /// True when the collection is size-limited.
    #[must_use]
    pub const fn is_capped(&self) -> bool {
        self.capped.is_some()
    }

    /// True when the collection is a time-series collection.
    #[must_use]
    pub const fn is_time_series(&self) -> bool {
        self.time_series.is_some()
    }
}

/// Key kind for a single-field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
    /// Full-text index.
    Text,
}

/// A single-field index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Indexed field.
    pub field: Box<str>,
    /// Key kind.
    pub direction: IndexDirection,
    /// Expire documents this long after the indexed timestamp.
    pub expire_after: Option<Duration>,
}

impl IndexDefinition {
    /// Ascending index on `field`.
    pub fn ascending(field: impl Into<Box<str>>) -> Self {
        Self::with_direction(field, IndexDirection::Ascending)
    }

    /// Descending index on `field`.
    pub fn descending(field: impl Into<Box<str>>) -> Self {
        Self::with_direction(field, IndexDirection::Descending)
    }

    /// Text index on `field`.
    pub fn text(field: impl Into<Box<str>>) -> Self {
        Self::with_direction(field, IndexDirection::Text)
    }

    /// Attach a TTL.
    #[must_use]
    pub const fn with_expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = Some(expire_after);
        self
    }

    fn with_direction(field: impl Into<Box<str>>, direction: IndexDirection) -> Self {
        Self {
            field: field.into(),
            direction,
            expire_after: None,
        }
    }
}

/// Creates store connections.
pub trait StoreConnector: Send + Sync {
    /// Connect using driver-native settings held by the connector.
    ///
    /// Returns `None` when the connector carries no such settings, in which
    /// case callers fall back to [`StoreConnector::connect`].
    fn connect_explicit(&self) -> Option<Result<Arc<dyn StoreConnection>>>;

    /// Connect using a connection string.
    fn connect(
        &self,
        ctx: &RequestContext,
        uri: SecretString,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreConnection>>>;
}

/// An open connection (client) to the store.
pub trait StoreConnection: Send + Sync {
    /// Resolve a database handle by name.
    fn database(
        &self,
        ctx: &RequestContext,
        name: Box<str>,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreDatabase>>>;
}

/// A database handle.
pub trait StoreDatabase: Send + Sync {
    /// Database name.
    fn name(&self) -> &str;

    /// Names of the collections that currently exist.
    fn list_collection_names(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Create a collection.
    fn create_collection(
        &self,
        ctx: &RequestContext,
        name: Box<str>,
        options: CollectionOptions,
    ) -> BoxFuture<'_, Result<()>>;

    /// Resolve a collection handle by name (does not create it).
    fn collection(
        &self,
        ctx: &RequestContext,
        name: Box<str>,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreCollection>>>;
}

/// A collection handle.
pub trait StoreCollection: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Create indexes; existing identical indexes are not an error.
    fn create_indexes(
        &self,
        ctx: &RequestContext,
        indexes: Vec<IndexDefinition>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Insert documents in order; returns the number inserted.
    fn insert_many(
        &self,
        ctx: &RequestContext,
        documents: Vec<Document>,
    ) -> BoxFuture<'_, Result<usize>>;
}
