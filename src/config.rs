//! Slicer configuration.
//!
//! Handles loading, validating, and merging `slicer.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [slicing]
//! max_slice_height = 1200   # Default max slice height in logical px (min 200)
//! pixel_ratio = 2.0         # Export scale factor when a request omits it
//!
//! [compression]
//! default_quality = 85      # Starting JPEG quality (1-100)
//! min_quality = 45          # Quality floor for the size search (1-100)
//! target_slice_kb = 400     # Per-slice byte budget, in KB
//!
//! [upload]
//! endpoint = "https://api.imgbb.com/1/upload"
//! timeout_secs = 60
//! # default_key = "..."     # Used when a request names no account
//!
//! [processing]
//! parallel_encode = false   # Encode all slices up front on a worker pool
//! # max_processes = 4       # Worker cap (omit for auto = CPU cores)
//!
//! [[accounts]]              # One entry per upload account
//! id = "acme-corp"
//! key = "..."
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [compression]
//! target_slice_kb = 250
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::credentials::normalize_account_id;
use crate::suggest::{DEFAULT_MAX_SLICE_HEIGHT, MIN_MAX_SLICE_HEIGHT};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Slicer configuration loaded from `slicer.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlicerConfig {
    /// Slice geometry defaults.
    pub slicing: SlicingConfig,
    /// JPEG quality search settings.
    pub compression: CompressionConfig,
    /// Image-API transport settings.
    pub upload: UploadConfig,
    /// Worker pool settings.
    pub processing: ProcessingConfig,
    /// Account → upload key bindings, in priority order.
    pub accounts: Vec<AccountBinding>,
}

impl SlicerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.compression;
        if !(1..=100).contains(&c.default_quality) {
            return Err(ConfigError::Validation(
                "compression.default_quality must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&c.min_quality) {
            return Err(ConfigError::Validation(
                "compression.min_quality must be 1-100".into(),
            ));
        }
        if c.min_quality > c.default_quality {
            return Err(ConfigError::Validation(
                "compression.min_quality must not exceed compression.default_quality".into(),
            ));
        }
        if c.target_slice_kb == 0 {
            return Err(ConfigError::Validation(
                "compression.target_slice_kb must be positive".into(),
            ));
        }
        if self.slicing.max_slice_height < MIN_MAX_SLICE_HEIGHT {
            return Err(ConfigError::Validation(format!(
                "slicing.max_slice_height must be at least {MIN_MAX_SLICE_HEIGHT}"
            )));
        }
        if !(self.slicing.pixel_ratio.is_finite() && self.slicing.pixel_ratio > 0.0) {
            return Err(ConfigError::Validation(
                "slicing.pixel_ratio must be a positive number".into(),
            ));
        }
        match Url::parse(&self.upload.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::Validation(
                    "upload.endpoint must be an absolute http(s) URL".into(),
                ));
            }
        }
        if self.upload.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upload.timeout_secs must be positive".into(),
            ));
        }

        let mut seen = HashSet::new();
        for binding in &self.accounts {
            let id = normalize_account_id(&binding.id);
            if id.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "accounts: id {:?} is empty after normalization",
                    binding.id
                )));
            }
            if binding.key.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "accounts: entry \"{id}\" has an empty key"
                )));
            }
            if !seen.insert(id.clone()) {
                return Err(ConfigError::Validation(format!(
                    "accounts: duplicate id \"{id}\""
                )));
            }
        }
        Ok(())
    }
}

/// Slice geometry defaults applied when a request leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlicingConfig {
    /// Max slice height in logical pixels for auto-suggested slices.
    pub max_slice_height: u32,
    /// Export scale factor (source pixels per logical pixel).
    pub pixel_ratio: f64,
}

impl Default for SlicingConfig {
    fn default() -> Self {
        Self {
            max_slice_height: DEFAULT_MAX_SLICE_HEIGHT,
            pixel_ratio: 2.0,
        }
    }
}

/// Adaptive JPEG compression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Quality the search starts from.
    pub default_quality: u32,
    /// Lowest quality the search will try.
    pub min_quality: u32,
    /// Per-slice size budget in kilobytes.
    pub target_slice_kb: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            default_quality: 85,
            min_quality: 45,
            target_slice_kb: 400,
        }
    }
}

/// Image-API transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Upload endpoint; the credential is sent as the `key` query parameter.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Key used when a request names no account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_key: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.imgbb.com/1/upload".to_string(),
            timeout_secs: 60,
            default_key: None,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Extract and compress every slice on the pool before uploading in order.
    /// When false, each slice is fully processed before the next one starts.
    pub parallel_encode: bool,
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// One upload account: a free-form id (normalized when matched) and its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountBinding {
    pub id: String,
    pub key: String,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SlicerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (including `[[accounts]]` arrays) replace
///   base values entirely.
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
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but
/// contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SlicerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SlicerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, merged over stock defaults.
///
/// A missing file yields the defaults. Unknown keys are rejected and the
/// result is validated.
pub fn load_config(path: &Path) -> Result<SlicerConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `slicer.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Frame Slicer Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Slicing
# ---------------------------------------------------------------------------
[slicing]
# Max height, in logical (1x) pixels, of an auto-suggested slice.
# Requests may override it; anything below 200 is raised to 200.
max_slice_height = 1200

# Source pixels per logical pixel, used when a request omits pixelRatio.
pixel_ratio = 2.0

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compression]
# JPEG quality the size search starts from (1-100).
default_quality = 85

# Lowest JPEG quality the search will try. Slices still over budget at this
# quality are accepted as-is.
min_quality = 45

# Per-slice size budget in kilobytes. Quality drops in steps of 5 until the
# slice fits or min_quality is reached. Slices with transparency are always
# lossless PNG and skip the search.
target_slice_kb = 400

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# Image API endpoint. The account key is sent as the `key` query parameter.
endpoint = "https://api.imgbb.com/1/upload"

# Per-request timeout in seconds.
timeout_secs = 60

# Key used when a request names no account. Without it, the first
# [[accounts]] entry is used.
# default_key = "..."

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Extract and compress all slices on a worker pool first, then upload them
# one by one in order. When false, each slice is uploaded before the next
# one is extracted.
parallel_encode = false

# Maximum parallel workers for parallel_encode.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Accounts
# ---------------------------------------------------------------------------
# One entry per upload account. Request account names are normalized
# (lowercase, spaces to dashes, only a-z 0-9 - _) before matching `id`.
#
# [[accounts]]
# id = "acme-corp"
# key = "..."
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SlicerConfig::default();
        assert_eq!(config.slicing.max_slice_height, 1200);
        assert_eq!(config.slicing.pixel_ratio, 2.0);
        assert_eq!(config.compression.default_quality, 85);
        assert_eq!(config.compression.min_quality, 45);
        assert_eq!(config.compression.target_slice_kb, 400);
        assert_eq!(config.upload.timeout_secs, 60);
        assert!(config.upload.default_key.is_none());
        assert!(!config.processing.parallel_encode);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[compression]
target_slice_kb = 250
"#;
        let config: SlicerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.compression.target_slice_kb, 250);
        // Defaults preserved
        assert_eq!(config.compression.default_quality, 85);
        assert_eq!(config.slicing.max_slice_height, 1200);
    }

    #[test]
    fn parse_accounts_keeps_file_order() {
        let toml = r#"
[[accounts]]
id = "zeta"
key = "kz"

[[accounts]]
id = "alpha"
key = "ka"
"#;
        let config: SlicerConfig = toml::from_str(toml).unwrap();
        let ids: Vec<&str> = config.accounts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("slicer.toml")).unwrap();
        assert_eq!(config.compression.default_quality, 85);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slicer.toml");
        fs::write(
            &path,
            r#"
[upload]
default_key = "abc123"

[processing]
parallel_encode = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.upload.default_key.as_deref(), Some("abc123"));
        assert!(config.processing.parallel_encode);
        // Unspecified values should be defaults
        assert_eq!(config.upload.endpoint, "https://api.imgbb.com/1/upload");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slicer.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slicer.toml");
        fs::write(
            &path,
            r#"
[compression]
default_quality = 200
"#,
        )
        .unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig::default();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
            ..Default::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
            ..Default::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[compression]
default_quality = 85
min_quality = 45
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[compression]
min_quality = 60
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let compression = merged.get("compression").unwrap();
        assert_eq!(compression.get("min_quality").unwrap().as_integer(), Some(60));
        assert_eq!(compression.get("default_quality").unwrap().as_integer(), Some(85));
    }

    #[test]
    fn merge_toml_replaces_account_arrays() {
        let base: toml::Value = toml::from_str(
            r#"
[[accounts]]
id = "a"
key = "1"

[[accounts]]
id = "b"
key = "2"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[[accounts]]
id = "c"
key = "3"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("accounts").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[compression]
qualty = 90
"#;
        let result: Result<SlicerConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_account_field_rejected() {
        let toml_str = r#"
[[accounts]]
id = "a"
key = "1"
secret = "x"
"#;
        let result: Result<SlicerConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SlicerConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_floor_above_default_quality() {
        let mut config = SlicerConfig::default();
        config.compression.min_quality = 90;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_quality"));
    }

    #[test]
    fn validate_zero_budget() {
        let mut config = SlicerConfig::default();
        config.compression.target_slice_kb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_pixel_ratio() {
        let mut config = SlicerConfig::default();
        config.slicing.pixel_ratio = 0.0;
        assert!(config.validate().is_err());
        config.slicing.pixel_ratio = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_max_slice_height_floor() {
        let mut config = SlicerConfig::default();
        config.slicing.max_slice_height = 199;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_endpoint_must_be_http() {
        let mut config = SlicerConfig::default();
        config.upload.endpoint = "ftp://images.example".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_duplicate_normalized_account_ids() {
        let mut config = SlicerConfig::default();
        config.accounts = vec![
            AccountBinding {
                id: "Acme Corp".into(),
                key: "1".into(),
            },
            AccountBinding {
                id: "acme-corp".into(),
                key: "2".into(),
            },
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn validate_empty_account_key() {
        let mut config = SlicerConfig::default();
        config.accounts = vec![AccountBinding {
            id: "acme".into(),
            key: String::new(),
        }];
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // stock_config_toml / stock_defaults_value tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SlicerConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.slicing.max_slice_height, 1200);
        assert_eq!(config.compression.default_quality, 85);
        assert_eq!(config.compression.min_quality, 45);
        assert_eq!(config.compression.target_slice_kb, 400);
        assert_eq!(config.upload.endpoint, UploadConfig::default().endpoint);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[slicing]", "[compression]", "[upload]", "[processing]", "[[accounts]]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_resolves_to_valid_config() {
        let config = resolve_config(stock_defaults_value(), None).unwrap();
        assert_eq!(config.compression.target_slice_kb, 400);
    }
}
