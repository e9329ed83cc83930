//! MongoDB document store adapter.

mod error;

#[cfg(feature = "mongodb")]
mod connector;
#[cfg(feature = "mongodb")]
mod options;

pub use error::{MongoErrorContext, StoreFailure, classify_command_code, store_error};

#[cfg(feature = "mongodb")]
pub use connector::{MongoCollection, MongoConnection, MongoConnector, MongoDatabase};
#[cfg(feature = "mongodb")]
pub use error::map_mongo_error;
#[cfg(feature = "mongodb")]
pub use options::{create_collection_options, index_model};
