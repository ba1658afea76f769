//! Converter configuration, loaded from an optional JSON file.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::registry::ItemDefaults;
use crate::core::types::{ConversionOptions, QualityPreset};
use crate::utils::{ConverterError, ConverterResult, ImageFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConverterConfig {
    /// Target format seeded into new items
    pub default_format: ImageFormat,
    /// Quality preset seeded into new items
    pub default_quality: QualityPreset,
    /// Most recent history entries kept
    pub history_limit: usize,
    /// File name used for archive downloads
    pub archive_name: String,
    /// JSON file backing history and rename pattern; in-memory when unset
    pub store_path: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            default_format: ImageFormat::WebP,
            default_quality: QualityPreset::High,
            history_limit: 50,
            archive_name: "convertidos.zip".to_string(),
            store_path: None,
        }
    }
}

impl ConverterConfig {
    /// Reads a JSON config file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> ConverterResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConverterError::config(format!("Cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConverterError::config(format!("Invalid config {}: {e}", path.display())))
    }

    pub fn item_defaults(&self) -> ItemDefaults {
        ItemDefaults {
            target_format: self.default_format,
            options: ConversionOptions {
                quality_preset: self.default_quality,
                ..ConversionOptions::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(config, ConverterConfig::default());
        assert_eq!(config.item_defaults(), ItemDefaults::default());
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"defaultFormat":"jpeg","historyLimit":10}"#).unwrap();

        let config = ConverterConfig::load(&path).unwrap();
        assert_eq!(config.default_format, ImageFormat::JPEG);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.archive_name, "convertidos.zip");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ConverterConfig::load(&path), Err(ConverterError::Config(_))));
    }
}
