use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::analysis::{CompiledRules, MetadataRules};
use crate::document::models::DOCJSON_VERSION;

/// Pipeline configuration for docjson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version stamp written into every document
    pub version: String,

    /// Write per-category component files under `_comp/`
    pub emit_components: bool,

    /// `layout` re-runs load existing component files instead of re-running the analyzers
    pub reuse_components: bool,

    /// Metadata lookup rules
    pub metadata: MetadataRules,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: DOCJSON_VERSION.to_string(),
            emit_components: true,
            reuse_components: true,
            metadata: MetadataRules::default(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, else from the config
    /// directory, else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::get_config_path().filter(|p| p.exists()),
        };

        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .with_context(|| format!("cannot read config {}", config_path.display()))?;
                toml::from_str::<Config>(&content)
                    .with_context(|| format!("invalid config {}", config_path.display()))?
            }
            None => Config::default(),
        };

        config.compile_rules()?;
        Ok(config)
    }

    /// Save configuration to the config directory
    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::get_config_path().context("no configuration directory on this platform")?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Get the path to the config file
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docjson").join("config.toml"))
    }

    /// Initialize default config file
    pub fn init_default() -> Result<PathBuf> {
        Config::default().save()
    }

    /// Compile the metadata patterns, reporting the first invalid one.
    pub fn compile_rules(&self) -> Result<CompiledRules> {
        CompiledRules::new(&self.metadata).context("invalid metadata pattern in configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "reuse_components = false\n\n[metadata.author]\npatterns = ['Owner:\\s*(\\w+)']\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.reuse_components);
        assert!(config.emit_components);
        assert_eq!(config.version, DOCJSON_VERSION);
        assert_eq!(config.metadata.author.patterns.len(), 1);
        assert!(config.metadata.author.labels.is_empty());
        assert_eq!(config.metadata.title, MetadataRules::default().title);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[metadata.revision]\npatterns = ['(']\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
