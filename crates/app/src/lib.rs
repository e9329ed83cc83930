//! # docsink-app
//!
//! Maps log events to store documents and delivers them in batches.
//! This crate depends on `ports`, `domain`, `config`, and `shared`.

pub mod mapper;
pub mod resources;
pub mod sink;

pub use mapper::{MapperOptions, map_event};
pub use resources::{ResourceCache, ResourceSettings};
pub use sink::{BATCH_FAILED_EVENT, BatchOutcome, BatchSink};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
