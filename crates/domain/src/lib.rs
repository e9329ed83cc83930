//! # docsink-domain
//!
//! The structured log event model consumed by the sink:
//!
//! - **Levels** - `LogLevel`, totally ordered from `Verbose` to `Fatal`
//! - **Values** - `ScalarValue`, `PropertyValue`, `StructureValue`
//! - **Exceptions** - `ExceptionInfo` with aggregate flattening
//! - **Trace context** - `TraceId`, `SpanId`
//! - **Field names** - `sanitize_field_name`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No store or driver types
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use docsink_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod error;
pub mod event;
pub mod exception;
pub mod field_name;
pub mod level;
pub mod trace;
pub mod value;

pub use error::DomainError;
pub use event::LogEvent;
pub use exception::{CallSite, DEFAULT_HRESULT, ExceptionInfo, ExceptionKind};
pub use field_name::{is_valid_field_name, sanitize_field_name};
pub use level::LogLevel;
pub use trace::{SpanId, TraceId};
pub use value::{
    LogProperty, PropertyValue, ScalarValue, StructureValue, format_duration, format_time_of_day,
};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
