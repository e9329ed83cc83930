//! Validation failures for domain values.

use docsink_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;

/// Parse failures for levels and correlation identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The level name is not one of the six known levels.
    UnknownLevel {
        /// Raw input.
        input: String,
    },
    /// A trace id is not 32 hex digits (or is all zeros).
    InvalidTraceId {
        /// Raw input length.
        input_length: usize,
    },
    /// A span id is not 16 hex digits (or is all zeros).
    InvalidSpanId {
        /// Raw input length.
        input_length: usize,
    },
}

impl DomainError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownLevel { .. } => ErrorCode::new("domain", "unknown_level"),
            Self::InvalidTraceId { .. } => ErrorCode::new("domain", "invalid_trace_id"),
            Self::InvalidSpanId { .. } => ErrorCode::new("domain", "invalid_span_id"),
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLevel { input } => write!(formatter, "unknown log level: {input}"),
            Self::InvalidTraceId { .. } => {
                formatter.write_str("trace id must be 32 hex digits and not all zeros")
            },
            Self::InvalidSpanId { .. } => {
                formatter.write_str("span id must be 16 hex digits and not all zeros")
            },
        }
    }
}

impl std::error::Error for DomainError {}

impl From<DomainError> for ErrorEnvelope {
    fn from(error: DomainError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            DomainError::UnknownLevel { input } => envelope.with_metadata("input", input),
            DomainError::InvalidTraceId { input_length }
            | DomainError::InvalidSpanId { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
        }
    }
}
