//! MongoDB store adapter.

use crate::mongo::error::{MongoErrorContext, map_mongo_error};
use crate::mongo::options::{create_collection_options, index_model};
use bson::Document;
use docsink_ports::{
    BoxFuture, CollectionOptions, IndexDefinition, StoreCollection, StoreConnection,
    StoreConnector, StoreDatabase,
};
use docsink_shared::{RequestContext, Result, SecretString, timeout_with_context};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::sync::Arc;
use std::time::Duration;

/// Connector backed by the official MongoDB driver.
///
/// Holds optional driver-native [`ClientOptions`]; when present they take
/// precedence over any connection string.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    client_options: Option<ClientOptions>,
    timeout: Duration,
}

impl MongoConnector {
    /// Connector that only connects through connection strings.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            client_options: None,
            timeout,
        }
    }

    /// Connector with explicit driver settings.
    #[must_use]
    pub const fn with_client_options(client_options: ClientOptions, timeout: Duration) -> Self {
        Self {
            client_options: Some(client_options),
            timeout,
        }
    }
}

impl StoreConnector for MongoConnector {
    fn connect_explicit(&self) -> Option<Result<Arc<dyn StoreConnection>>> {
        let options = self.client_options.clone()?;
        let timeout = self.timeout;
        Some(
            Client::with_options(options)
                .map(|client| Arc::new(MongoConnection { client, timeout }) as Arc<dyn StoreConnection>)
                .map_err(|error| map_mongo_error(&error, &MongoErrorContext::new("mongo.connect"))),
        )
    }

    fn connect(
        &self,
        ctx: &RequestContext,
        uri: SecretString,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreConnection>>> {
        let ctx = ctx.clone();
        let timeout = self.timeout;
        Box::pin(async move {
            let error_ctx = MongoErrorContext::new("mongo.connect");
            timeout_with_context(&ctx, timeout, "mongo.connect", async {
                let options = ClientOptions::parse(uri.expose())
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))?;
                let client = Client::with_options(options)
                    .map_err(|error| map_mongo_error(&error, &error_ctx))?;
                tracing::debug!("mongodb client created");
                Ok(Arc::new(MongoConnection { client, timeout }) as Arc<dyn StoreConnection>)
            })
            .await
        })
    }
}

/// Driver client wrapper.
#[derive(Debug, Clone)]
pub struct MongoConnection {
    client: Client,
    timeout: Duration,
}

impl StoreConnection for MongoConnection {
    fn database(
        &self,
        ctx: &RequestContext,
        name: Box<str>,
    ) -> BoxFuture<'_, Result<Arc<dyn StoreDatabase>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mongo.database")?;
            Ok(Arc::new(MongoDatabase {
                database: self.client.database(&name),
                timeout: self.timeout,
            }) as Arc<dyn StoreDatabase>)
        })
    }
}

/// Driver database wrapper.
#[derive(Debug, Clone)]
pub struct MongoDatabase {
    database: Database,
    timeout: Duration,
}

impl StoreDatabase for MongoDatabase {
    fn name(&self) -> &str {
        self.database.name()
    }

    fn list_collection_names(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<Vec<String>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let error_ctx =
                MongoErrorContext::new("mongo.list_collection_names").database(self.name());
            timeout_with_context(&ctx, self.timeout, "mongo.list_collection_names", async {
                self.database
                    .list_collection_names()
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await
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
            let error_ctx = MongoErrorContext::new("mongo.create_collection")
                .database(self.name())
                .collection(&name);
            timeout_with_context(&ctx, self.timeout, "mongo.create_collection", async {
                self.database
                    .create_collection(name.to_string())
                    .with_options(create_collection_options(&options))
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await?;
            tracing::debug!(
                collection = %name,
                capped = options.is_capped(),
                time_series = options.is_time_series(),
                "collection created"
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
            ctx.ensure_not_cancelled("mongo.collection")?;
            Ok(Arc::new(MongoCollection {
                collection: self.database.collection::<Document>(&name),
                database: self.name().into(),
                timeout: self.timeout,
            }) as Arc<dyn StoreCollection>)
        })
    }
}

/// Driver collection wrapper.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    collection: Collection<Document>,
    database: Box<str>,
    timeout: Duration,
}

impl MongoCollection {
    fn error_context(&self, operation: &'static str) -> MongoErrorContext {
        MongoErrorContext::new(operation)
            .database(&self.database)
            .collection(self.name())
    }
}

impl StoreCollection for MongoCollection {
    fn name(&self) -> &str {
        self.collection.name()
    }

    fn create_indexes(
        &self,
        ctx: &RequestContext,
        indexes: Vec<IndexDefinition>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            if indexes.is_empty() {
                return Ok(());
            }
            let error_ctx = self.error_context("mongo.create_indexes");
            let models: Vec<_> = indexes.iter().map(index_model).collect();
            timeout_with_context(&ctx, self.timeout, "mongo.create_indexes", async {
                self.collection
                    .create_indexes(models)
                    .await
                    .map(|_| ())
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await
        })
    }

    fn insert_many(
        &self,
        ctx: &RequestContext,
        documents: Vec<Document>,
    ) -> BoxFuture<'_, Result<usize>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            if documents.is_empty() {
                return Ok(0);
            }
            let error_ctx = self.error_context("mongo.insert_many");
            timeout_with_context(&ctx, self.timeout, "mongo.insert_many", async {
                self.collection
                    .insert_many(documents)
                    .await
                    .map(|result| result.inserted_ids.len())
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await
        })
    }
}
