//! Sink configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims names and the connection string, and de-duplicates
//!   promoted properties.

use docsink_domain::LogLevel;
use docsink_shared::{ErrorCode, ErrorEnvelope, SecretString};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Strips credentials from a connection string before it is echoed in errors.
///
/// Multi-host connection strings are not valid URLs; for those the userinfo
/// segment is cut by hand.
pub(crate) fn sanitize_uri_for_error(uri: &str) -> String {
    if let Ok(mut parsed) = Url::parse(uri) {
        if parsed.password().is_some() || !parsed.username().is_empty() {
            if parsed.set_username("").is_err() || parsed.set_password(None).is_err() {
                return "[invalid uri: credentials]".to_string();
            }
        }
        return parsed.to_string();
    }

    let Some((scheme, rest)) = uri.split_once("://") else {
        return "[invalid uri: missing scheme]".to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let hosts = authority.rsplit_once('@').map_or(authority, |(_, hosts)| hosts);
    format!("{scheme}://{hosts}{tail}")
}

/// Default store connection string.
pub const DEFAULT_CONNECTION_URI: &str = "mongodb://localhost:27017";
/// Default database name.
pub const DEFAULT_DATABASE_NAME: &str = "logs";
/// Default collection name.
pub const DEFAULT_COLLECTION_NAME: &str = "log";
/// Default time field for time-series collections.
pub const DEFAULT_TIME_FIELD: &str = "Timestamp";

const TIMEOUT_MIN_MS: u64 = 1_000;
const TIMEOUT_MAX_MS: u64 = 600_000;
const TIMEOUT_DEFAULT_MS: u64 = 30_000;

const CAPPED_SIZE_MIN_MB: u64 = 1;
const CAPPED_SIZE_MAX_MB: u64 = 1_048_576;
const CAPPED_DOCUMENTS_MIN: u64 = 1;
const EXPIRE_AFTER_MIN_SECS: u64 = 1;
const PROMOTED_PROPERTIES_MAX: usize = 256;

const DATABASE_NAME_MAX_BYTES: usize = 63;
const DATABASE_FORBIDDEN_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '\0'];
const COLLECTION_FORBIDDEN_CHARS: &[char] = &['$', '\0'];

/// Top-level sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SinkConfig {
    /// Events below this level are not written.
    #[schemars(with = "String")]
    pub minimum_level: LogLevel,
    /// Target database (default `logs`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<Box<str>>,
    /// Target collection (default `log`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<Box<str>>,
    /// Store connection string (default `mongodb://localhost:27017`).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub connection_uri: Option<SecretString>,
    /// Property names copied to the top level of each document (case-insensitive).
    pub promoted_properties: Vec<Box<str>>,
    /// Drop promoted properties from the `Properties` container.
    pub deduplicate_promoted_properties: bool,
    /// Expire documents this many seconds after their timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_secs: Option<u64>,
    /// Options applied when the collection is created.
    pub collection: CollectionConfig,
    /// Per-operation store timeout (ms).
    pub timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            minimum_level: LogLevel::Verbose,
            database_name: None,
            collection_name: None,
            connection_uri: None,
            promoted_properties: Vec::new(),
            deduplicate_promoted_properties: false,
            expire_after_secs: None,
            collection: CollectionConfig::default(),
            timeout_ms: TIMEOUT_DEFAULT_MS,
        }
    }
}

/// Collection creation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CollectionConfig {
    /// Create a size-limited collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capped: Option<CappedConfig>,
    /// Create a time-series collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_series: Option<TimeSeriesConfig>,
}

/// Capped collection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CappedConfig {
    /// Maximum size in megabytes.
    pub max_size_mb: u64,
    /// Maximum number of documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_documents: Option<u64>,
}

impl CappedConfig {
    /// Size limit in bytes.
    #[must_use]
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Time-series collection layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct TimeSeriesConfig {
    /// Field holding the measurement time.
    pub time_field: Box<str>,
    /// Field holding per-series metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_field: Option<Box<str>>,
    /// Bucketing hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<TimeSeriesGranularity>,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            time_field: DEFAULT_TIME_FIELD.into(),
            meta_field: None,
            granularity: None,
        }
    }
}

/// Time-series bucketing hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TimeSeriesGranularity {
    /// Seconds apart.
    Seconds,
    /// Minutes apart.
    Minutes,
    /// Hours apart.
    Hours,
}

impl SinkConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedSinkConfig, ConfigSchemaError> {
        self.normalize();
        self.validate()?;
        Ok(ValidatedSinkConfig { raw: self })
    }

    /// Check every rule without modifying the config.
    pub fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_timeout_ms("timeoutMs", self.timeout_ms)?;
        if let Some(name) = self.database_name.as_deref() {
            validate_database_name(name)?;
        }
        if let Some(name) = self.collection_name.as_deref() {
            validate_collection_name(name)?;
        }
        if let Some(uri) = self.connection_uri.as_ref() {
            validate_connection_uri("connectionUri", uri.expose())?;
        }
        if let Some(secs) = self.expire_after_secs {
            validate_limit("", "expireAfterSecs", secs, EXPIRE_AFTER_MIN_SECS, u64::MAX)?;
        }
        self.validate_promoted_properties()?;
        self.collection.validate()
    }

    fn normalize(&mut self) {
        normalize_optional_trimmed(&mut self.database_name);
        normalize_optional_trimmed(&mut self.collection_name);
        if let Some(uri) = self.connection_uri.as_mut() {
            let trimmed = uri.expose().trim();
            if trimmed.len() != uri.expose().len() {
                *uri = SecretString::new(trimmed);
            }
        }
        if let Some(time_series) = self.collection.time_series.as_mut() {
            time_series.time_field = time_series.time_field.trim().into();
            normalize_optional_trimmed(&mut time_series.meta_field);
        }

        let mut seen = BTreeSet::new();
        let promoted = std::mem::take(&mut self.promoted_properties);
        self.promoted_properties = promoted
            .into_iter()
            .map(|name| Box::<str>::from(name.trim()))
            .filter(|name| name.is_empty() || seen.insert(name.to_lowercase()))
            .collect();
    }

    fn validate_promoted_properties(&self) -> Result<(), ConfigSchemaError> {
        if self.promoted_properties.len() > PROMOTED_PROPERTIES_MAX {
            return Err(ConfigSchemaError::ListTooLarge {
                field: "promotedProperties",
                len: self.promoted_properties.len(),
                max: PROMOTED_PROPERTIES_MAX,
            });
        }
        if self.promoted_properties.iter().any(|name| name.is_empty()) {
            return Err(ConfigSchemaError::EmptyName {
                field: "promotedProperties",
            });
        }
        Ok(())
    }
}

impl CollectionConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.capped.is_some() && self.time_series.is_some() {
            return Err(ConfigSchemaError::ConflictingCollectionOptions);
        }
        if let Some(capped) = &self.capped {
            validate_limit(
                "collection.capped",
                "maxSizeMb",
                capped.max_size_mb,
                CAPPED_SIZE_MIN_MB,
                CAPPED_SIZE_MAX_MB,
            )?;
            if let Some(max_documents) = capped.max_documents {
                validate_limit(
                    "collection.capped",
                    "maxDocuments",
                    max_documents,
                    CAPPED_DOCUMENTS_MIN,
                    u64::MAX,
                )?;
            }
        }
        if let Some(time_series) = &self.time_series {
            if time_series.time_field.is_empty() {
                return Err(ConfigSchemaError::EmptyName {
                    field: "collection.timeSeries.timeField",
                });
            }
            if time_series.meta_field.as_deref() == Some(&*time_series.time_field) {
                return Err(ConfigSchemaError::InvalidName {
                    field: "collection.timeSeries.metaField",
                    name: time_series.time_field.to_string(),
                    reason: "must differ from timeField",
                });
            }
        }
        Ok(())
    }
}

/// Validated config wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSinkConfig {
    raw: SinkConfig,
}

impl ValidatedSinkConfig {
    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> SinkConfig {
        self.raw
    }

    /// Database name, falling back to the default.
    #[must_use]
    pub fn database_name(&self) -> &str {
        self.raw
            .database_name
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_NAME)
    }

    /// Collection name, falling back to the default.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.raw
            .collection_name
            .as_deref()
            .unwrap_or(DEFAULT_COLLECTION_NAME)
    }

    /// Per-operation store timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.raw.timeout_ms)
    }

    /// TTL for stored documents.
    #[must_use]
    pub fn expire_after(&self) -> Option<Duration> {
        self.raw.expire_after_secs.map(Duration::from_secs)
    }
}

impl AsRef<SinkConfig> for ValidatedSinkConfig {
    fn as_ref(&self) -> &SinkConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedSinkConfig {
    type Target = SinkConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl Default for ValidatedSinkConfig {
    fn default() -> Self {
        Self {
            raw: SinkConfig::default(),
        }
    }
}

/// Parse a sink config from a JSON string, applying validation and normalization.
pub fn parse_sink_config_json(input: &str) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let config: SinkConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a sink config from a TOML string, applying validation and normalization.
pub fn parse_sink_config_toml(input: &str) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let config: SinkConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Validation failures for the sink config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// Timeout is outside allowed bounds.
    TimeoutOutOfRange {
        /// Field name in the config file.
        field: &'static str,
        /// Provided value (ms).
        value_ms: u64,
        /// Minimum allowed (ms).
        min_ms: u64,
        /// Maximum allowed (ms).
        max_ms: u64,
    },
    /// A numeric limit is outside allowed bounds.
    LimitOutOfRange {
        /// Schema section (empty for top-level fields).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Provided value.
        value: u64,
        /// Minimum allowed.
        min: u64,
        /// Maximum allowed.
        max: u64,
    },
    /// A list field exceeds the maximum allowed size.
    ListTooLarge {
        /// Field name in the config file.
        field: &'static str,
        /// Number of entries after normalization.
        len: usize,
        /// Maximum allowed number of entries.
        max: usize,
    },
    /// A name is present but empty after trimming.
    EmptyName {
        /// Field name in the config file.
        field: &'static str,
    },
    /// A name contains forbidden characters or is otherwise unusable.
    InvalidName {
        /// Field name in the config file.
        field: &'static str,
        /// Offending name.
        name: String,
        /// Human readable reason.
        reason: &'static str,
    },
    /// The connection string is not a store URI.
    InvalidUri {
        /// Field name in the config file.
        field: &'static str,
        /// Offending URI (credentials are stripped before display).
        uri: String,
    },
    /// Capped and time-series options were both set.
    ConflictingCollectionOptions,
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "invalid_timeout"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::ListTooLarge { .. } => ErrorCode::new("config", "list_too_large"),
            Self::EmptyName { .. } | Self::InvalidName { .. } => {
                ErrorCode::new("config", "invalid_name")
            },
            Self::InvalidUri { .. } => ErrorCode::new("config", "invalid_uri"),
            Self::ConflictingCollectionOptions => {
                ErrorCode::new("config", "conflicting_collection_options")
            },
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeoutOutOfRange {
                field,
                value_ms,
                min_ms,
                max_ms,
            } => write!(
                formatter,
                "{field} must be within [{min_ms}, {max_ms}] ms (got {value_ms})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => {
                if !section.is_empty() {
                    write!(formatter, "{section}.")?;
                }
                write!(
                    formatter,
                    "{field} must be within [{min}, {max}] (got {value})"
                )
            },
            Self::ListTooLarge { field, len, max } => write!(
                formatter,
                "{field} must have at most {max} entries (got {len})"
            ),
            Self::EmptyName { field } => write!(formatter, "{field} must be non-empty"),
            Self::InvalidName { field, reason, .. } => {
                write!(formatter, "invalid {field}: {reason}")
            },
            Self::InvalidUri { field, .. } => write!(
                formatter,
                "{field} must be a mongodb:// or mongodb+srv:// connection string"
            ),
            Self::ConflictingCollectionOptions => formatter
                .write_str("collection.capped and collection.timeSeries are mutually exclusive"),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::TimeoutOutOfRange {
                field,
                value_ms,
                min_ms,
                max_ms,
            } => {
                envelope = envelope
                    .with_metadata("field", field)
                    .with_metadata("value_ms", value_ms.to_string())
                    .with_metadata("min_ms", min_ms.to_string())
                    .with_metadata("max_ms", max_ms.to_string());
            },
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => {
                if !section.is_empty() {
                    envelope = envelope.with_metadata("section", section);
                }
                envelope = envelope
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::ListTooLarge { field, len, max } => {
                envelope = envelope
                    .with_metadata("field", field)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::EmptyName { field } => {
                envelope = envelope.with_metadata("field", field);
            },
            ConfigSchemaError::InvalidName { field, name, .. } => {
                envelope = envelope
                    .with_metadata("field", field)
                    .with_metadata("name", name);
            },
            ConfigSchemaError::InvalidUri { field, uri } => {
                envelope = envelope
                    .with_metadata("field", field)
                    .with_metadata("uri", sanitize_uri_for_error(&uri));
            },
            ConfigSchemaError::ConflictingCollectionOptions => {},
        }

        envelope
    }
}

const fn validate_timeout_ms(field: &'static str, value_ms: u64) -> Result<(), ConfigSchemaError> {
    if value_ms < TIMEOUT_MIN_MS || value_ms > TIMEOUT_MAX_MS {
        return Err(ConfigSchemaError::TimeoutOutOfRange {
            field,
            value_ms,
            min_ms: TIMEOUT_MIN_MS,
            max_ms: TIMEOUT_MAX_MS,
        });
    }
    Ok(())
}

const fn validate_limit(
    section: &'static str,
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange {
            section,
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn validate_database_name(name: &str) -> Result<(), ConfigSchemaError> {
    const FIELD: &str = "databaseName";
    if name.is_empty() {
        return Err(ConfigSchemaError::EmptyName { field: FIELD });
    }
    if name.contains(DATABASE_FORBIDDEN_CHARS) {
        return Err(ConfigSchemaError::InvalidName {
            field: FIELD,
            name: name.to_owned(),
            reason: "must not contain / \\ . space \" $ or NUL",
        });
    }
    if name.len() > DATABASE_NAME_MAX_BYTES {
        return Err(ConfigSchemaError::InvalidName {
            field: FIELD,
            name: name.to_owned(),
            reason: "must be at most 63 bytes",
        });
    }
    Ok(())
}

fn validate_collection_name(name: &str) -> Result<(), ConfigSchemaError> {
    const FIELD: &str = "collectionName";
    if name.is_empty() {
        return Err(ConfigSchemaError::EmptyName { field: FIELD });
    }
    if name.contains(COLLECTION_FORBIDDEN_CHARS) {
        return Err(ConfigSchemaError::InvalidName {
            field: FIELD,
            name: name.to_owned(),
            reason: "must not contain $ or NUL",
        });
    }
    if name.starts_with("system.") {
        return Err(ConfigSchemaError::InvalidName {
            field: FIELD,
            name: name.to_owned(),
            reason: "the system. prefix is reserved",
        });
    }
    Ok(())
}

pub(crate) fn validate_connection_uri(
    field: &'static str,
    uri: &str,
) -> Result<(), ConfigSchemaError> {
    let invalid = || ConfigSchemaError::InvalidUri {
        field,
        uri: uri.to_owned(),
    };
    let Some((scheme, rest)) = uri.trim().split_once("://") else {
        return Err(invalid());
    };
    let scheme_ok = scheme.eq_ignore_ascii_case("mongodb") || scheme.eq_ignore_ascii_case("mongodb+srv");
    let hosts = rest.split('/').next().unwrap_or_default();
    let hosts = hosts.rsplit_once('@').map_or(hosts, |(_, hosts)| hosts);
    if !scheme_ok || hosts.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

fn normalize_optional_trimmed(value: &mut Option<Box<str>>) {
    if let Some(current) = value.as_mut() {
        let trimmed = current.trim();
        if trimmed.len() != current.len() {
            *current = trimmed.into();
        }
    }
}
