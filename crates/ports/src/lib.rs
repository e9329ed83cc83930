//! # docsink-ports
//!
//! Port traits for the docsink hexagonal architecture.
//!
//! This crate defines the interfaces between the sink and its
//! infrastructure: the document store and the diagnostics logger. It
//! depends only on `shared` (plus `bson` for the document type).

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod logger;
pub mod store;

pub use logger::*;
pub use store::*;
