//! # docsink-adapters
//!
//! Adapter implementations for the docsink ports: the MongoDB document
//! store (behind the default `mongodb` feature) and the JSON diagnostics
//! logger. This crate depends on `ports` and `shared`.

pub mod log_sink;
pub mod logger;
pub mod mongo;

pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLogger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
