//! Config loading helpers (env + file).
//!
//! The loader applies a fixed precedence and surfaces user-facing errors as
//! typed `ErrorEnvelope`s.

use crate::{SinkConfig, SinkEnv, ValidatedSinkConfig, apply_env_overrides};
use docsink_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the sink config from an optional file path.
///
/// Precedence (highest wins):
/// - env overrides (`SinkEnv`)
/// - config file (JSON or TOML by extension)
/// - defaults (`SinkConfig::default()`)
pub fn load_sink_config_from_path(
    config_path: Option<&Path>,
    env: &SinkEnv,
) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let config = match config_path {
        None => SinkConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            tracing::debug!(path = %path.display(), ?format, "loading sink config");
            parse_config_unvalidated(&config_text, format)?
        },
    };

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the sink config from the process environment and an optional file path.
pub fn load_sink_config_std_env(
    config_path: Option<&Path>,
) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let env = SinkEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_sink_config_from_path(config_path, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
///
/// The connection string is written in clear text; callers decide where the
/// output goes.
pub fn to_pretty_json(config: &SinkConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &SinkConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(input: &str, format: ConfigFormat) -> Result<SinkConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_sink_config_toml;
    use docsink_domain::LogLevel;
    use std::error::Error;

    #[test]
    fn format_is_detected_from_extension() {
        assert_eq!(
            detect_config_format(Path::new("sink.TOML")).ok(),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            detect_config_format(Path::new("sink")).ok(),
            Some(ConfigFormat::Json)
        );
        let error = detect_config_format(Path::new("sink.yaml")).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "unsupported_format"))
        );
    }

    #[test]
    fn missing_file_reports_not_found() {
        let result =
            load_sink_config_from_path(Some(Path::new("/nonexistent/sink.json")), &SinkEnv::default());
        assert_eq!(
            result.err().map(|error| error.code),
            Some(ErrorCode::new("config", "config_file_not_found"))
        );
    }

    #[test]
    fn toml_output_parses_back() -> Result<(), Box<dyn Error>> {
        let config = SinkConfig {
            minimum_level: LogLevel::Warning,
            database_name: Some("app".into()),
            promoted_properties: vec!["UserId".into()],
            expire_after_secs: Some(86_400),
            ..SinkConfig::default()
        };

        let text = to_pretty_toml(&config)?;
        let parsed = parse_sink_config_toml(&text)?;
        assert_eq!(parsed.as_ref(), &config);
        Ok(())
    }
}
