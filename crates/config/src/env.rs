//! Environment variable overrides.
//!
//! Only a handful of settings may come from the environment: the ones an
//! operator changes per deployment without editing the config file.

use crate::schema::validate_connection_uri;
use crate::{SinkConfig, ValidatedSinkConfig};
use docsink_domain::LogLevel;
use docsink_shared::{ErrorCode, ErrorEnvelope, REDACTED, SecretString, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: store connection string.
pub const ENV_CONNECTION_URI: &str = "DOCSINK_CONNECTION_URI";
/// Env var: minimum event level.
pub const ENV_MINIMUM_LEVEL: &str = "DOCSINK_MINIMUM_LEVEL";
/// Env var: target database name.
pub const ENV_DATABASE_NAME: &str = "DOCSINK_DATABASE_NAME";
/// Env var: target collection name.
pub const ENV_COLLECTION_NAME: &str = "DOCSINK_COLLECTION_NAME";
/// Env var: per-operation store timeout (ms).
pub const ENV_TIMEOUT_MS: &str = "DOCSINK_TIMEOUT_MS";

const ALL_VARS: [&str; 5] = [
    ENV_CONNECTION_URI,
    ENV_MINIMUM_LEVEL,
    ENV_DATABASE_NAME,
    ENV_COLLECTION_NAME,
    ENV_TIMEOUT_MS,
];

/// Typed env-derived overrides for `SinkConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkEnv {
    /// Override for `connectionUri`.
    pub connection_uri: Option<SecretString>,
    /// Override for `minimumLevel`.
    pub minimum_level: Option<LogLevel>,
    /// Override for `databaseName`.
    pub database_name: Option<Box<str>>,
    /// Override for `collectionName`.
    pub collection_name: Option<Box<str>>,
    /// Override for `timeoutMs`.
    pub timeout_ms: Option<u64>,
}

impl SinkEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        let connection_uri = parse_optional_secret(map, ENV_CONNECTION_URI)?;
        if let Some(uri) = &connection_uri {
            validate_connection_uri("connectionUri", uri.expose()).map_err(|_| {
                EnvParseError::InvalidUri {
                    var: ENV_CONNECTION_URI,
                }
            })?;
        }

        Ok(Self {
            connection_uri,
            minimum_level: parse_optional_level(map, ENV_MINIMUM_LEVEL)?,
            database_name: parse_optional_trimmed_string(map, ENV_DATABASE_NAME)?,
            collection_name: parse_optional_trimmed_string(map, ENV_COLLECTION_NAME)?,
            timeout_ms: parse_optional_u64(map, ENV_TIMEOUT_MS)?,
        })
    }

    /// Parse env overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map = ALL_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok().map(|value| ((*var).to_owned(), value)))
            .collect();
        Self::from_map(&map)
    }

    /// True when no override is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.connection_uri.is_none()
            && self.minimum_level.is_none()
            && self.database_name.is_none()
            && self.collection_name.is_none()
            && self.timeout_ms.is_none()
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: SinkConfig,
    env: &SinkEnv,
) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let mut config = base;
    if let Some(uri) = &env.connection_uri {
        config.connection_uri = Some(uri.clone());
    }
    if let Some(level) = env.minimum_level {
        config.minimum_level = level;
    }
    if let Some(name) = &env.database_name {
        config.database_name = Some(name.clone());
    }
    if let Some(name) = &env.collection_name {
        config.collection_name = Some(name.clone());
    }
    if let Some(timeout_ms) = env.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Connection string env var is not a store URI.
    InvalidUri {
        /// Env var name.
        var: &'static str,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
            Self::InvalidUri { .. } => ErrorCode::new("config", "invalid_env_uri"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
            Self::InvalidUri { var } => {
                write!(formatter, "{var} must be a mongodb:// or mongodb+srv:// URI")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var }
            | EnvParseError::EmptySecret { var }
            | EnvParseError::InvalidUri { var } => {
                envelope = envelope.with_metadata("env_var", var);
            },
            EnvParseError::InvalidInt { var, value } | EnvParseError::InvalidEnum { var, value } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_value(var, &value));
            },
        }

        envelope
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.into()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed)))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<LogLevel>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    raw.parse::<LogLevel>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: raw.into_string(),
        })
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}
