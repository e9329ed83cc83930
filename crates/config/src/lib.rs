//! # docsink-config
//!
//! Sink configuration schema, validation, and loading.
//! This crate depends on `domain` and `shared` only.

/// JSON Schema export for the sink config.
pub mod config_schema;
/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use config_schema::sink_config_schema;
pub use env::{
    ENV_COLLECTION_NAME, ENV_CONNECTION_URI, ENV_DATABASE_NAME, ENV_MINIMUM_LEVEL, ENV_TIMEOUT_MS,
    EnvParseError, SinkEnv, apply_env_overrides,
};
pub use load::{
    load_sink_config_from_path, load_sink_config_std_env, to_pretty_json, to_pretty_toml,
};
pub use schema::{
    CappedConfig, CollectionConfig, ConfigSchemaError, DEFAULT_COLLECTION_NAME,
    DEFAULT_CONNECTION_URI, DEFAULT_DATABASE_NAME, DEFAULT_TIME_FIELD, SinkConfig,
    TimeSeriesConfig, TimeSeriesGranularity, ValidatedSinkConfig, parse_sink_config_json,
    parse_sink_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsink_domain::domain_crate_version;
    use docsink_shared::shared_crate_version;

    #[test]
    fn config_can_use_domain_and_shared() {
        assert_eq!(config_crate_version(), domain_crate_version());
        assert_eq!(config_crate_version(), shared_crate_version());
    }
}
