//! # docsink-testkit
//!
//! Test helpers and in-memory adapters.
//! This crate depends on `ports` and `shared`.

pub mod errors;
pub mod in_memory;

pub use in_memory::{InMemoryStore, NoopLogger, RecordingLogger, StoreOp};

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Absolute path of a fixture under `crates/testkit/fixtures`.
#[must_use]
pub fn fixture_path(relative: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsink_ports::ports_crate_version;
    use docsink_shared::shared_crate_version;

    #[test]
    fn testkit_can_use_ports_and_shared() {
        assert_eq!(testkit_crate_version(), ports_crate_version());
        assert_eq!(testkit_crate_version(), shared_crate_version());
    }

    #[test]
    fn error_fixtures_cover_every_store_code() {
        let codes = errors::store_error_codes();
        assert!(codes.contains(&errors::connection_error().code));
        assert!(codes.contains(&errors::write_error().code));
        assert!(codes.contains(&errors::auth_error().code));
    }

    #[test]
    fn fixtures_directory_exists() {
        assert!(fixture_path("config/sink-config.valid.json").is_file());
    }
}
