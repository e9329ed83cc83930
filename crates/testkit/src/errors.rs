//! Error envelope fixtures shaped like the ones store adapters produce.

use docsink_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return the store error codes adapters report.
pub fn store_error_codes() -> Vec<ErrorCode> {
    ["store_connection", "store_timeout", "store_auth", "store_write", "store_unknown"]
        .into_iter()
        .map(|code| ErrorCode::new("store", code))
        .collect()
}

/// A cancellation error fixture.
pub fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("cancelled")
}

/// Retriable "no reachable server" fixture.
pub fn connection_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "store_connection"),
        "server selection timed out",
        ErrorClass::Retriable,
    )
    .with_metadata("provider", "in_memory")
}

/// Non-retriable rejected-write fixture.
pub fn write_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "store_write"),
        "document failed validation",
        ErrorClass::NonRetriable,
    )
    .with_metadata("provider", "in_memory")
}

/// Non-retriable auth failure fixture.
pub fn auth_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "store_auth"),
        "authentication failed",
        ErrorClass::NonRetriable,
    )
}
