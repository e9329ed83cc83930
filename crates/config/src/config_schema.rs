//! JSON Schema export for the sink config.

use crate::SinkConfig;
use schemars::{Schema, schema_for};

/// JSON Schema describing `SinkConfig` as it appears in config files.
#[must_use]
pub fn sink_config_schema() -> Schema {
    schema_for!(SinkConfig)
}
