//! Configuration handling for the LocusView CLI
//!
//! Supports loading configuration from locusview.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use locusview_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when neither -v nor --quiet is given
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Print events as JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                // Try to find locusview.toml in current directory
                let default_path = PathBuf::from("locusview.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: locusview.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        config
            .engine
            .validate()
            .with_context(|| format!("Invalid [engine] section in {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locusview_core::PendingPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.engine.max_canvas_pixels, 30000.0);
        assert_eq!(config.engine.pending_policy, PendingPolicy::Reject);
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.engine.history_depth = 8;
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;

        assert_eq!(loaded_config.engine.history_depth, 8);
        assert_eq!(config.general.log_level, loaded_config.general.log_level);

        Ok(())
    }

    #[test]
    fn test_partial_engine_section() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[engine]\npending_policy = \"queue\"\nborder_pixels = 0.0")?;

        let config = Config::load_from_file(temp_file.path())?;
        assert_eq!(config.engine.pending_policy, PendingPolicy::Queue);
        assert_eq!(config.engine.border_pixels, 0.0);
        assert_eq!(config.engine.history_depth, 32);
        assert!(!config.general.json);

        Ok(())
    }

    #[test]
    fn test_invalid_engine_section_rejected() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[engine]\nmax_pixels_per_base = -1.0")?;
        assert!(Config::load_from_file(temp_file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_oversized_history_rejected() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[engine]\nhistory_depth = 9223372036854775807")?;
        let err = Config::load_from_file(temp_file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("history_depth"));
        Ok(())
    }

    #[test]
    fn test_example_toml_generation() -> Result<()> {
        let example = Config::example_toml()?;
        assert!(example.contains("[general]"));
        assert!(example.contains("[engine]"));
        assert!(example.contains("pending_policy"));
        Ok(())
    }
}
