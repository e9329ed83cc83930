//! Batch delivery into the document store.

use crate::mapper::{MapperOptions, map_event};
use crate::resources::ResourceCache;
use bson::Document;
use docsink_config::{SinkConfig, ValidatedSinkConfig};
use docsink_domain::LogEvent;
use docsink_ports::{DiagnosticEvent, DiagnosticLevel, LogFields, LoggerPort, StoreConnector};
use docsink_shared::{ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::sync::Arc;

/// Diagnostic event emitted when a batch is dropped.
pub const BATCH_FAILED_EVENT: &str = "sink.batch.failed";

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// No events were passed in.
    Empty,
    /// Every event was below the minimum level.
    Omitted {
        /// Events received.
        events: usize,
    },
    /// Documents were written.
    Inserted {
        /// Documents written.
        documents: usize,
    },
    /// The insert failed; the batch is lost.
    Dropped {
        /// Documents that were attempted.
        documents: usize,
        /// Store error.
        error: ErrorEnvelope,
    },
}

/// Maps batches of log events and bulk-inserts them.
pub struct BatchSink {
    mapper: MapperOptions,
    resources: Arc<ResourceCache>,
    logger: Arc<dyn LoggerPort>,
}

impl std::fmt::Debug for BatchSink {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BatchSink")
            .field("mapper", &self.mapper)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

impl BatchSink {
    /// Sink with its own resource cache.
    pub fn new(
        config: &ValidatedSinkConfig,
        connector: Arc<dyn StoreConnector>,
        logger: Arc<dyn LoggerPort>,
    ) -> Self {
        let resources = Arc::new(ResourceCache::from_config(connector, config));
        Self::with_resources(config, resources, logger)
    }

    /// Validate `config` and build a sink from it.
    pub fn from_config(
        config: SinkConfig,
        connector: Arc<dyn StoreConnector>,
        logger: Arc<dyn LoggerPort>,
    ) -> Result<Self> {
        let config = config.validate_and_normalize()?;
        Ok(Self::new(&config, connector, logger))
    }

    /// Sink writing through an existing cache, possibly shared with other
    /// sinks.
    pub fn with_resources(
        config: &ValidatedSinkConfig,
        resources: Arc<ResourceCache>,
        logger: Arc<dyn LoggerPort>,
    ) -> Self {
        Self {
            mapper: MapperOptions::from_config(config),
            resources,
            logger,
        }
    }

    /// The cache this sink resolves the collection from.
    pub const fn resources(&self) -> &Arc<ResourceCache> {
        &self.resources
    }

    /// Mapping options in effect.
    pub const fn mapper(&self) -> &MapperOptions {
        &self.mapper
    }

    /// Write one batch and report what happened.
    ///
    /// Insert failures are logged and reported as [`BatchOutcome::Dropped`].
    /// Failures while resolving or setting up the collection are returned.
    #[tracing::instrument(
        name = "sink.deliver",
        skip_all,
        fields(correlation_id = %ctx.correlation_id().as_str(), events = events.len())
    )]
    pub async fn deliver(
        &self,
        ctx: &RequestContext,
        events: &[LogEvent],
    ) -> Result<BatchOutcome> {
        if events.is_empty() {
            return Ok(BatchOutcome::Empty);
        }

        let documents: Vec<Document> = events
            .iter()
            .filter_map(|event| map_event(Some(event), &self.mapper))
            .collect();
        if documents.is_empty() {
            tracing::debug!("every event below minimum level");
            return Ok(BatchOutcome::Omitted {
                events: events.len(),
            });
        }

        let collection = self.resources.collection(ctx, None).await?;
        let count = documents.len();
        let inserted = self
            .resources
            .bounded(ctx, "store.insert_many", collection.insert_many(ctx, documents))
            .await;
        match inserted {
            Ok(inserted) => {
                tracing::debug!(documents = inserted, "batch written");
                Ok(BatchOutcome::Inserted {
                    documents: inserted,
                })
            },
            Err(error) => {
                tracing::warn!(documents = count, code = %error.code, "batch dropped");
                self.report_failure(ctx, count, &error);
                Ok(BatchOutcome::Dropped {
                    documents: count,
                    error,
                })
            },
        }
    }

    /// Write one batch; store write failures never surface here.
    pub async fn emit_batch(&self, ctx: &RequestContext, events: &[LogEvent]) -> Result<()> {
        self.deliver(ctx, events).await.map(|_| ())
    }

    /// Called when a flush finds nothing to send.
    pub const fn on_empty_batch(&self) {}

    fn report_failure(&self, ctx: &RequestContext, documents: usize, error: &ErrorEnvelope) {
        let mut fields = LogFields::new();
        fields.insert(
            "collection".into(),
            Value::from(&*self.resources.settings().collection_name),
        );
        fields.insert("documents".into(), Value::from(documents));
        fields.insert(
            "correlationId".into(),
            Value::from(ctx.correlation_id().as_str()),
        );

        let payload = serde_json::to_value(error.redacted())
            .unwrap_or_else(|_| Value::String(error.to_string()));
        self.logger.log(
            DiagnosticEvent::new(
                DiagnosticLevel::Error,
                BATCH_FAILED_EVENT,
                "Failed to write log batch; dropping it",
            )
            .with_fields(fields)
            .with_error(payload),
        );
    }
}
