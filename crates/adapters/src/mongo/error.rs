//! Driver error mapping helpers.

use docsink_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Context payload attached to store error envelopes.
#[derive(Debug, Clone)]
pub struct MongoErrorContext {
    /// Operation label for tracing failures.
    pub operation: &'static str,
    /// Database name, when the request is database-scoped.
    pub database: Option<String>,
    /// Collection name, when the request is collection-scoped.
    pub collection: Option<String>,
}

impl MongoErrorContext {
    /// Context with no database or collection.
    pub const fn new(operation: &'static str) -> Self {
        Self {
            operation,
            database: None,
            collection: None,
        }
    }

    /// Attach the database name.
    #[must_use]
    pub fn database(mut self, name: &str) -> Self {
        self.database = Some(name.to_owned());
        self
    }

    /// Attach the collection name.
    #[must_use]
    pub fn collection(mut self, name: &str) -> Self {
        self.collection = Some(name.to_owned());
        self
    }
}

/// Driver-independent failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    /// No reachable server, I/O failure, or DNS failure.
    Connection,
    /// Server-side time limit exceeded.
    Timeout,
    /// Authentication or authorization failure.
    Auth,
    /// Write rejected (duplicate key, validation, ...).
    Write,
    /// Anything else.
    Unknown,
}

impl StoreFailure {
    fn error_code(self) -> ErrorCode {
        match self {
            Self::Connection => ErrorCode::new("store", "store_connection"),
            Self::Timeout => ErrorCode::new("store", "store_timeout"),
            Self::Auth => ErrorCode::new("store", "store_auth"),
            Self::Write => ErrorCode::new("store", "store_write"),
            Self::Unknown => ErrorCode::new("store", "store_unknown"),
        }
    }

    const fn class(self) -> ErrorClass {
        match self {
            Self::Connection | Self::Timeout => ErrorClass::Retriable,
            Self::Auth | Self::Write | Self::Unknown => ErrorClass::NonRetriable,
        }
    }
}

/// Server error codes that indicate an exceeded time limit.
const MAX_TIME_MS_EXPIRED: i32 = 50;
/// Server error codes that indicate missing credentials or privileges.
const UNAUTHORIZED: i32 = 13;
const AUTHENTICATION_FAILED: i32 = 18;

/// Classify a server command error code.
pub const fn classify_command_code(code: i32) -> StoreFailure {
    match code {
        MAX_TIME_MS_EXPIRED => StoreFailure::Timeout,
        UNAUTHORIZED | AUTHENTICATION_FAILED => StoreFailure::Auth,
        _ => StoreFailure::Unknown,
    }
}

/// Build the shared envelope for a classified failure.
pub fn store_error(
    failure: StoreFailure,
    message: impl Into<String>,
    ctx: &MongoErrorContext,
) -> ErrorEnvelope {
    let mut envelope = ErrorEnvelope::unexpected(failure.error_code(), message, failure.class())
        .with_metadata("provider", "mongodb")
        .with_metadata("operation", ctx.operation);

    if let Some(database) = ctx.database.as_ref() {
        envelope = envelope.with_metadata("database", database.to_owned());
    }
    if let Some(collection) = ctx.collection.as_ref() {
        envelope = envelope.with_metadata("collection", collection.to_owned());
    }

    envelope
}

/// Maps a driver error into the shared error envelope format.
#[cfg(feature = "mongodb")]
pub fn map_mongo_error(error: &mongodb::error::Error, ctx: &MongoErrorContext) -> ErrorEnvelope {
    use mongodb::error::ErrorKind;

    let failure = match error.kind.as_ref() {
        ErrorKind::Authentication { .. } => StoreFailure::Auth,
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StoreFailure::Connection,
        ErrorKind::Write(_) | ErrorKind::InsertMany(_) => StoreFailure::Write,
        ErrorKind::Command(command) => classify_command_code(command.code),
        _ => StoreFailure::Unknown,
    };

    store_error(failure, error.to_string(), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_failures_are_retriable() {
        let ctx = MongoErrorContext::new("mongo.insert_many")
            .database("logs")
            .collection("log");
        let envelope = store_error(StoreFailure::Connection, "no servers", &ctx);

        assert_eq!(envelope.code, ErrorCode::new("store", "store_connection"));
        assert!(envelope.class.is_retriable());
        assert_eq!(
            envelope.metadata.get("collection").map(String::as_str),
            Some("log")
        );
        assert_eq!(
            envelope.metadata.get("operation").map(String::as_str),
            Some("mongo.insert_many")
        );
    }

    #[test]
    fn command_codes_are_classified() {
        assert_eq!(classify_command_code(50), StoreFailure::Timeout);
        assert_eq!(classify_command_code(13), StoreFailure::Auth);
        assert_eq!(classify_command_code(11_000), StoreFailure::Unknown);

        let envelope = store_error(
            StoreFailure::Write,
            "duplicate key",
            &MongoErrorContext::new("mongo.insert_many"),
        );
        assert_eq!(envelope.code, ErrorCode::new("store", "store_write"));
        assert!(!envelope.class.is_retriable());
    }
}
