//! Server configuration module.
//!
//! Handles loading and validating `slyde.toml`. Stock defaults are used for
//! every key the file leaves out, and a missing file means "all defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! max_upload_bytes = 10485760  # multipart request body limit
//!
//! [storage]
//! files_root = "files"         # must exist; users/ is created inside it
//! dir_mode = 0o777             # permission bits for per-user directories
//!
//! [images]
//! quality = 75                 # JPEG quality for every stored artifact (1-100)
//! thumbnail_edge = 150         # longer side of thumbnails
//! canonical_max_edge = 3840    # longer side ceiling of canonical images
//! min_dimension = 400          # smallest accepted upload side
//! max_dimension = 10000        # largest accepted upload side
//!
//! [accounts]
//! snapshot = "accounts.json"   # JSON file backing the account store
//! default_quota = 100          # quota for accounts created from the CLI
//!
//! [auth]
//! user_header = "x-user-id"    # trusted header carrying the caller's user id
//!
//! [logging]
//! filter = "info"              # tracing filter; RUST_LOG wins when set
//! format = "pretty"            # "pretty" or "json"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [server]
//! port = 9000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, VariantLimits};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration loaded from `slyde.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener and request limits.
    pub server: ListenConfig,
    /// Where artifacts live on disk.
    pub storage: StorageConfig,
    /// Sizing, bounds and encoding of stored images.
    pub images: ImagesConfig,
    /// Bundled account store.
    pub accounts: AccountsConfig,
    /// Caller identity.
    pub auth: AuthConfig,
    /// Tracing output.
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let images = &self.images;
        if images.quality == 0 || images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if images.thumbnail_edge == 0 {
            return Err(ConfigError::Validation(
                "images.thumbnail_edge must be non-zero".into(),
            ));
        }
        if images.canonical_max_edge < images.thumbnail_edge {
            return Err(ConfigError::Validation(
                "images.canonical_max_edge must be at least images.thumbnail_edge".into(),
            ));
        }
        if images.min_dimension == 0 || images.min_dimension > images.max_dimension {
            return Err(ConfigError::Validation(
                "images.min_dimension must be non-zero and at most images.max_dimension".into(),
            ));
        }
        if self.auth.user_header.trim().is_empty() {
            return Err(ConfigError::Validation(
                "auth.user_header must not be empty".into(),
            ));
        }
        if axum::http::HeaderName::from_bytes(self.auth.user_header.as_bytes()).is_err() {
            return Err(ConfigError::Validation(format!(
                "auth.user_header {:?} is not a valid header name",
                self.auth.user_header
            )));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.storage.dir_mode > 0o7777 {
            return Err(ConfigError::Validation(
                "storage.dir_mode must be a permission mask (at most 0o7777)".into(),
            ));
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory; must already exist at startup.
    pub files_root: PathBuf,
    /// Permission bits for directories created per user (unix only).
    pub dir_mode: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_root: PathBuf::from("files"),
            dir_mode: 0o777,
        }
    }
}

/// Image sizing and encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG quality for canonical, thumbnail and bucketed artifacts (1-100).
    pub quality: u8,
    /// Longer side of every thumbnail, in pixels.
    pub thumbnail_edge: u32,
    /// Canonical artifacts are scaled down so their longer side fits this.
    pub canonical_max_edge: u32,
    /// Uploads with either side below this are rejected.
    pub min_dimension: u32,
    /// Uploads with either side above this are rejected.
    pub max_dimension: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        let limits = VariantLimits::default();
        Self {
            quality: Quality::default().value(),
            thumbnail_edge: limits.thumbnail_edge,
            canonical_max_edge: limits.canonical_max_edge,
            min_dimension: limits.min_dimension,
            max_dimension: limits.max_dimension,
        }
    }
}

impl ImagesConfig {
    pub fn limits(&self) -> VariantLimits {
        VariantLimits {
            thumbnail_edge: self.thumbnail_edge,
            canonical_max_edge: self.canonical_max_edge,
            min_dimension: self.min_dimension,
            max_dimension: self.max_dimension,
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Account store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountsConfig {
    /// JSON snapshot file. When absent, accounts live in memory only.
    pub snapshot: Option<PathBuf>,
    /// Quota given to accounts created with `add-account` and no `--quota`.
    pub default_quota: usize,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            snapshot: Some(PathBuf::from("accounts.json")),
            default_quota: 100,
        }
    }
}

/// Identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Header set by the upstream auth gateway with the verified user id.
    pub user_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_header: "x-user-id".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// =============================================================================
// Config loading
// =============================================================================

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `slyde.toml` path.
///
/// A missing file yields the validated stock defaults. A file that exists
/// but fails to parse or validate is an error.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let config = ServerConfig::default();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns a fully-commented stock `slyde.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Slyde Server Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Listener
# ---------------------------------------------------------------------------
[server]
host = "0.0.0.0"
port = 8080

# Largest accepted request body in bytes (multipart uploads).
max_upload_bytes = 10485760

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Root directory for stored images. Must exist before the server starts;
# a users/ directory is created inside it.
files_root = "files"

# Permission bits for per-user directories (unix only).
dir_mode = 0o777

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# JPEG quality for every stored artifact (1 = worst, 100 = best).
quality = 75

# Longer side of thumbnails, in pixels.
thumbnail_edge = 150

# Canonical images are scaled down so their longer side fits this ceiling.
canonical_max_edge = 3840

# Uploads with either side outside [min_dimension, max_dimension] are rejected.
min_dimension = 400
max_dimension = 10000

# ---------------------------------------------------------------------------
# Accounts
# ---------------------------------------------------------------------------
[accounts]
# JSON file holding accounts and their image records.
# Comment out to keep accounts in memory only.
snapshot = "accounts.json"

# Quota for accounts created with `add-account` when --quota is omitted.
default_quota = 100

# ---------------------------------------------------------------------------
# Identity
# ---------------------------------------------------------------------------
[auth]
# Header carrying the verified user id, set by the upstream auth gateway.
user_header = "x-user-id"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# Tracing filter directive. RUST_LOG takes precedence when set.
filter = "info"

# "pretty" for human-readable lines, "json" for one JSON object per event.
format = "pretty"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_image_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.images.quality, 75);
        assert_eq!(config.images.thumbnail_edge, 150);
        assert_eq!(config.images.canonical_max_edge, 3840);
        assert_eq!(config.images.min_dimension, 400);
        assert_eq!(config.images.max_dimension, 10_000);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.auth.user_header, "x-user-id");
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
[server]
port = 9000
"#,
        )
        .unwrap();
        // Overridden value
        assert_eq!(config.server.port, 9000);
        // Default values preserved
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.images.quality, 75);
    }

    #[test]
    fn parse_logging_format() {
        let config = parse_config("[logging]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn images_config_builds_limits() {
        let images = ImagesConfig {
            quality: 90,
            thumbnail_edge: 200,
            canonical_max_edge: 2000,
            min_dimension: 100,
            max_dimension: 5000,
        };
        let limits = images.limits();
        assert_eq!(limits.thumbnail_edge, 200);
        assert_eq!(limits.canonical_max_edge, 2000);
        assert_eq!(limits.min_dimension, 100);
        assert_eq!(limits.max_dimension, 5000);
        assert_eq!(images.quality().value(), 90);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn unknown_keys_rejected() {
        let result = parse_config("[images]\nqualty = 80\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn quality_out_of_range_rejected() {
        for bad in ["0", "101"] {
            let result = parse_config(&format!("[images]\nquality = {bad}\n"));
            assert!(
                matches!(result, Err(ConfigError::Validation(_))),
                "quality {bad} should be rejected"
            );
        }
    }

    #[test]
    fn min_above_max_rejected() {
        let result = parse_config("[images]\nmin_dimension = 5000\nmax_dimension = 4000\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn canonical_below_thumbnail_rejected() {
        let result = parse_config("[images]\nthumbnail_edge = 500\ncanonical_max_edge = 400\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_or_invalid_user_header_rejected() {
        assert!(matches!(
            parse_config("[auth]\nuser_header = \"\"\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            parse_config("[auth]\nuser_header = \"bad header\"\n"),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("slyde.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slyde.toml");
        fs::write(&path, "[storage]\nfiles_root = \"/srv/slyde\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.files_root, PathBuf::from("/srv/slyde"));
    }

    #[test]
    fn load_config_invalid_toml_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slyde.toml");
        fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        let defaults = ServerConfig::default();
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.storage.dir_mode, 0o777);
        assert_eq!(config.images.quality, defaults.images.quality);
        assert_eq!(config.accounts.snapshot, defaults.accounts.snapshot);
        assert_eq!(config.auth.user_header, defaults.auth.user_header);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[server]",
            "[storage]",
            "[images]",
            "[accounts]",
            "[auth]",
            "[logging]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }
}
