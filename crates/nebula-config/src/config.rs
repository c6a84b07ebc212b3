//! Bake settings with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted settings inside the config directory.
pub const CONFIG_FILE_NAME: &str = "bake.ron";

/// Top-level bake configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BakeConfig {
    /// Where the splat catalog lives.
    pub catalog: CatalogConfig,
    /// Where and what to write.
    pub output: OutputConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Catalog source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the catalog document. Image references inside it resolve
    /// against its directory.
    pub path: PathBuf,
}

/// Bake output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving layer images and the manifest.
    pub dir: PathBuf,
    /// Write one PNG per array layer.
    pub write_layers: bool,
    /// File name of the atlas manifest.
    pub manifest_name: String,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write a JSON log file next to the output.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("splat").join("catalog.ron"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("splat_atlas"),
            write_layers: true,
            manifest_name: "atlas.ron".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: cfg!(debug_assertions),
        }
    }
}

impl OutputConfig {
    /// Full path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(&self.manifest_name)
    }
}

// --- Load / Save ---

impl BakeConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::ReadError {
                    path: config_path.clone(),
                    source,
                })?;
            let config: BakeConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded bake config from {}", config_path.display());
            Ok(config)
        } else {
            let config = BakeConfig::default();
            config.save(config_dir)?;
            log::info!("Created default bake config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `bake.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let write_error = |source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        };

        std::fs::create_dir_all(config_dir).map_err(write_error)?;
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let text = ron::ser::to_string_pretty(self, pretty)
            .map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, text).map_err(write_error)?;
        Ok(())
    }
}

/// Default config directory: `<os config dir>/nebula-splat-bake`.
///
/// Falls back to the working directory when the OS exposes no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("nebula-splat-bake"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = BakeConfig::default();
        let pretty = ron::ser::PrettyConfig::new().depth_limit(3);
        let ron_str = ron::ser::to_string_pretty(&config, pretty).unwrap();
        assert!(ron_str.contains("write_layers: true"));
        assert!(ron_str.contains("manifest_name: \"atlas.ron\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = BakeConfig::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: BakeConfig = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(catalog: (path: \"terrain/catalog.ron\"))";
        let config: BakeConfig = ron::from_str(ron_str).unwrap();
        assert_eq!(config.catalog.path, PathBuf::from("terrain/catalog.ron"));
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<BakeConfig, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = BakeConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config, BakeConfig::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BakeConfig::default();
        config.catalog.path = PathBuf::from("alpine.ron");
        config.output.write_layers = false;

        config.save(dir.path()).unwrap();
        let loaded = BakeConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{{not valid}}").unwrap();
        let result = BakeConfig::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_manifest_path_joins_output_dir() {
        let output = OutputConfig::default();
        assert_eq!(
            output.manifest_path(),
            PathBuf::from("splat_atlas").join("atlas.ron")
        );
    }
}
