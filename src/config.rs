//! Sync configuration module.
//!
//! Handles loading, validating, and merging `smugsync.toml`. Configuration is
//! layered: stock defaults are overridden by the config file, then by the
//! `SMUGMUG_*` credential environment variables, then by command-line flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [auth]
//! api_key = ""               # OAuth consumer key
//! api_secret = ""            # OAuth consumer secret
//! access_token = ""          # OAuth access token
//! access_token_secret = ""   # OAuth access token secret
//!
//! [api]
//! base_url = "https://api.smugmug.com"
//! upload_url = "https://upload.smugmug.com/"
//! page_size = 100            # Items requested per page when listing
//! timeout_secs = 300         # Per-request timeout (uploads included)
//!
//! [scan]
//! extensions = ["jpg", "jpeg", "png", "gif", "heic", "tif", "tiff"]
//! folder_marker = ".smugfolder"    # Forces a directory to sync as a folder
//! gallery_marker = ".smuggallery"  # Forces a directory to sync as a gallery
//!
//! [gallery]
//! privacy = "Unlisted"       # Privacy of newly created galleries
//! # template = "Archive"     # Album template applied to new galleries
//!
//! [sync]
//! prune = false              # Delete remote images missing locally
//! delete_threshold = 0.15    # Skip pruning above this share of a gallery
//! folder_delay_secs = 30     # Wait after creating a folder
//! upload_delay_ms = 500      # Wait between uploads
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "smugsync.toml";

/// Environment variables that overlay the `[auth]` section.
const AUTH_ENV_VARS: &[(&str, &str)] = &[
    ("SMUGMUG_API_KEY", "api_key"),
    ("SMUGMUG_API_SECRET", "api_secret"),
    ("SMUGMUG_ACCESS_TOKEN", "access_token"),
    ("SMUGMUG_ACCESS_TOKEN_SECRET", "access_token_secret"),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Missing credential {0} (set it in [auth] or the environment)")]
    MissingCredential(&'static str),
}

/// Sync configuration loaded from `smugsync.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// OAuth 1.0a credentials.
    pub auth: AuthConfig,
    /// Endpoints and request tuning.
    pub api: ApiConfig,
    /// Local scanning rules.
    pub scan: ScanConfig,
    /// Settings applied to galleries created by the sync.
    pub gallery: GalleryConfig,
    /// Pruning and back-off behaviour.
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sync.delete_threshold) {
            return Err(ConfigError::Validation(
                "sync.delete_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.api.page_size == 0 || self.api.page_size > 1000 {
            return Err(ConfigError::Validation(
                "api.page_size must be 1-1000".into(),
            ));
        }
        if self.scan.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "scan.extensions must not be empty".into(),
            ));
        }
        if self.scan.folder_marker.is_empty() || self.scan.gallery_marker.is_empty() {
            return Err(ConfigError::Validation(
                "scan markers must not be empty".into(),
            ));
        }
        if self.scan.folder_marker == self.scan.gallery_marker {
            return Err(ConfigError::Validation(
                "scan.folder_marker and scan.gallery_marker must differ".into(),
            ));
        }
        Ok(())
    }
}

/// OAuth 1.0a credentials. Usually supplied through the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl AuthConfig {
    /// Ensure every credential is present. Only network commands call this.
    pub fn require(&self) -> Result<(), ConfigError> {
        let fields = [
            (&self.api_key, "api_key"),
            (&self.api_secret, "api_secret"),
            (&self.access_token, "access_token"),
            (&self.access_token_secret, "access_token_secret"),
        ];
        for (value, name) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingCredential(name));
            }
        }
        Ok(())
    }
}

/// Endpoints and request tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// API host; paths are appended as `/api/v2/...`.
    pub base_url: String,
    /// Upload endpoint.
    pub upload_url: String,
    /// Items requested per page when listing children or images.
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.smugmug.com".to_string(),
            upload_url: "https://upload.smugmug.com/".to_string(),
            page_size: 100,
            timeout_secs: 300,
        }
    }
}

/// Local scanning rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Image extensions, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Marker file forcing a directory to become a folder.
    pub folder_marker: String,
    /// Marker file forcing a directory to become a gallery.
    pub gallery_marker: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "gif", "heic", "tif", "tiff"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            folder_marker: ".smugfolder".to_string(),
            gallery_marker: ".smuggallery".to_string(),
        }
    }
}

/// Settings applied to galleries created by the sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Privacy of newly created galleries (`Public`, `Unlisted`, `Private`).
    pub privacy: String,
    /// Album template name applied to new galleries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            privacy: "Unlisted".to_string(),
            template: None,
        }
    }
}

/// Pruning and back-off behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Delete remote images that no longer exist locally.
    pub prune: bool,
    /// Largest share of a gallery that pruning may remove in one run.
    pub delete_threshold: f64,
    /// Seconds to wait after creating a folder.
    pub folder_delay_secs: u64,
    /// Milliseconds to wait after each upload.
    pub upload_delay_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            prune: false,
            delete_threshold: 0.15,
            folder_delay_secs: 30,
            upload_delay_ms: 500,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SyncConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Build the `[auth]` overlay from credential environment variables.
///
/// `lookup` is `std::env::var` in production; empty values are ignored.
pub fn env_overlay(lookup: impl Fn(&str) -> Option<String>) -> Option<toml::Value> {
    let mut auth = toml::map::Map::new();
    for (var, key) in AUTH_ENV_VARS {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            auth.insert(key.to_string(), toml::Value::String(value));
        }
    }
    if auth.is_empty() {
        return None;
    }
    let mut root = toml::map::Map::new();
    root.insert("auth".to_string(), toml::Value::Table(auth));
    Some(toml::Value::Table(root))
}

/// Merge overlays in order onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = Option<toml::Value>>,
) -> Result<SyncConfig, ConfigError> {
    let merged = overlays
        .into_iter()
        .flatten()
        .fold(base, merge_toml);
    let config: SyncConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path` and the environment overlay.
///
/// A missing file is not an error: stock defaults apply.
pub fn load_config(path: &Path) -> Result<SyncConfig, ConfigError> {
    let file = load_raw_config(path)?;
    let env = env_overlay(|var| std::env::var(var).ok());
    resolve_config(stock_defaults_value(), [file, env])
}

/// Returns a fully-commented stock `smugsync.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# smugsync configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Credentials (OAuth 1.0a)
# ---------------------------------------------------------------------------
# Prefer the SMUGMUG_API_KEY, SMUGMUG_API_SECRET, SMUGMUG_ACCESS_TOKEN and
# SMUGMUG_ACCESS_TOKEN_SECRET environment variables over storing secrets here.
[auth]
api_key = ""
api_secret = ""
access_token = ""
access_token_secret = ""

# ---------------------------------------------------------------------------
# API endpoints
# ---------------------------------------------------------------------------
[api]
base_url = "https://api.smugmug.com"
upload_url = "https://upload.smugmug.com/"

# Items requested per page when listing folders and galleries (1-1000).
page_size = 100

# Per-request timeout in seconds, uploads included.
timeout_secs = 300

# ---------------------------------------------------------------------------
# Local scanning
# ---------------------------------------------------------------------------
[scan]
# Image extensions, matched case-insensitively.
extensions = ["jpg", "jpeg", "png", "gif", "heic", "tif", "tiff"]

# A directory holding this file is synced as a folder, even if it has images.
folder_marker = ".smugfolder"

# A directory holding this file is synced as a gallery, even if it has subdirectories.
gallery_marker = ".smuggallery"

# ---------------------------------------------------------------------------
# New galleries
# ---------------------------------------------------------------------------
[gallery]
# Privacy of galleries created by the sync: Public, Unlisted or Private.
privacy = "Unlisted"

# Album template applied to new galleries.
# template = "Archive"

# ---------------------------------------------------------------------------
# Sync behaviour
# ---------------------------------------------------------------------------
[sync]
# Delete remote images that no longer exist locally.
prune = false

# Pruning is skipped for a gallery when more than this share of its images
# would be deleted.
delete_threshold = 0.15

# Seconds to wait after creating a folder.
folder_delay_secs = 30

# Milliseconds to wait after each upload.
upload_delay_ms = 500
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SyncConfig::default();
        assert_eq!(config.api.base_url, "https://api.smugmug.com");
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.gallery.privacy, "Unlisted");
        assert!(config.gallery.template.is_none());
        assert!(!config.sync.prune);
        assert_eq!(config.sync.delete_threshold, 0.15);
        assert_eq!(config.sync.folder_delay_secs, 30);
        assert_eq!(config.scan.folder_marker, ".smugfolder");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[sync]
prune = true
"#;
        let config: SyncConfig = toml::from_str(toml).unwrap();
        assert!(config.sync.prune);
        assert_eq!(config.sync.delete_threshold, 0.15);
        assert_eq!(config.gallery.privacy, "Unlisted");
    }

    #[test]
    fn parse_template() {
        let toml = r#"
[gallery]
template = "Archive"
"#;
        let config: SyncConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.gallery.template.as_deref(), Some("Archive"));
        assert_eq!(config.gallery.privacy, "Unlisted");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_raw_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn resolve_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[api]
page_size = 50

[sync]
upload_delay_ms = 0
"#,
        )
        .unwrap();

        let file = load_raw_config(&path).unwrap();
        let config = resolve_config(stock_defaults_value(), [file]).unwrap();
        assert_eq!(config.api.page_size, 50);
        assert_eq!(config.sync.upload_delay_ms, 0);
        assert_eq!(config.sync.folder_delay_secs, 30);
    }

    #[test]
    fn invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        assert!(matches!(load_raw_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let overlay: toml::Value = toml::from_str("[sync]\nprun = true\n").unwrap();
        let result = resolve_config(stock_defaults_value(), [Some(overlay)]);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_section_rejected() {
        let overlay: toml::Value = toml::from_str("[uploads]\nfast = true\n").unwrap();
        let result = resolve_config(stock_defaults_value(), [Some(overlay)]);
        assert!(result.is_err());
    }

    // =========================================================================
    // Environment overlay
    // =========================================================================

    #[test]
    fn env_overlay_fills_auth() {
        let overlay = env_overlay(|var| match var {
            "SMUGMUG_API_KEY" => Some("key".to_string()),
            "SMUGMUG_ACCESS_TOKEN" => Some("token".to_string()),
            _ => None,
        });
        let config = resolve_config(stock_defaults_value(), [overlay]).unwrap();
        assert_eq!(config.auth.api_key, "key");
        assert_eq!(config.auth.access_token, "token");
        assert_eq!(config.auth.api_secret, "");
    }

    #[test]
    fn env_overlay_none_when_unset() {
        assert!(env_overlay(|_| None).is_none());
        assert!(env_overlay(|_| Some("  ".to_string())).is_none());
    }

    #[test]
    fn env_overrides_file() {
        let file: toml::Value = toml::from_str("[auth]\napi_key = \"from-file\"\n").unwrap();
        let env = env_overlay(|var| (var == "SMUGMUG_API_KEY").then(|| "from-env".to_string()));
        let config = resolve_config(stock_defaults_value(), [Some(file), env]).unwrap();
        assert_eq!(config.auth.api_key, "from-env");
    }

    #[test]
    fn require_reports_first_missing_credential() {
        let mut auth = AuthConfig {
            api_key: "k".into(),
            api_secret: "s".into(),
            access_token: "t".into(),
            access_token_secret: String::new(),
        };
        assert!(matches!(
            auth.require(),
            Err(ConfigError::MissingCredential("access_token_secret"))
        ));
        auth.access_token_secret = "ts".into();
        assert!(auth.require().is_ok());
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value =
            toml::from_str("[sync]\nprune = false\nupload_delay_ms = 5").unwrap();
        let overlay: toml::Value = toml::from_str("[sync]\nprune = true").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["sync"]["prune"].as_bool(), Some(true));
        assert_eq!(merged["sync"]["upload_delay_ms"].as_integer(), Some(5));
    }

    #[test]
    fn merge_toml_array_replaced_not_appended() {
        let base: toml::Value =
            toml::from_str("[scan]\nextensions = [\"jpg\", \"png\"]").unwrap();
        let overlay: toml::Value = toml::from_str("[scan]\nextensions = [\"heic\"]").unwrap();
        let merged = merge_toml(base, overlay);
        let exts = merged["scan"]["extensions"].as_array().unwrap();
        assert_eq!(exts.len(), 1);
        assert_eq!(exts[0].as_str(), Some("heic"));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_threshold_out_of_range() {
        let mut config = SyncConfig::default();
        config.sync.delete_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.sync.delete_threshold = -0.1;
        assert!(config.validate().is_err());
        config.sync.delete_threshold = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_page_size() {
        let mut config = SyncConfig::default();
        config.api.page_size = 0;
        assert!(config.validate().is_err());
        config.api.page_size = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_extensions_and_markers() {
        let mut config = SyncConfig::default();
        config.scan.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.scan.gallery_marker = config.scan.folder_marker.clone();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SyncConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SyncConfig::default();
        assert_eq!(config.api.base_url, defaults.api.base_url);
        assert_eq!(config.api.page_size, defaults.api.page_size);
        assert_eq!(config.scan.extensions, defaults.scan.extensions);
        assert_eq!(config.gallery.privacy, defaults.gallery.privacy);
        assert_eq!(config.gallery.template, defaults.gallery.template);
        assert_eq!(config.sync.delete_threshold, defaults.sync.delete_threshold);
        assert_eq!(config.sync.upload_delay_ms, defaults.sync.upload_delay_ms);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        for section in ["auth", "api", "scan", "gallery", "sync"] {
            assert!(value.get(section).is_some(), "missing [{section}]");
        }
    }
}
