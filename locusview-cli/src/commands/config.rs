//! Config command implementation - print or write the configuration

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;

pub fn execute(config: &Config, example: bool, output: Option<PathBuf>) -> Result<()> {
    let chosen = if example { Config::default() } else { config.clone() };

    match output {
        Some(path) => {
            chosen.save_to_file(&path)?;
            log::info!("Configuration written to {}", path.display());
        }
        None => {
            let content = toml::to_string_pretty(&chosen)
                .context("Failed to serialize configuration")?;
            print!("{}", content);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_example_config() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("locusview.toml");

        execute(&Config::default(), true, Some(path.clone()))?;

        let loaded = Config::load_from_file(&path)?;
        assert_eq!(loaded.engine.history_depth, Config::default().engine.history_depth);
        Ok(())
    }
}
