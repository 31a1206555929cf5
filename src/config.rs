//! Configuration file support
//!
//! Settings are read from TOML. [`Config::load`] looks at
//! `./form-cleaner.toml` first, then `<config dir>/form-cleaner/config.toml`.
//! Command-line values are layered on top with [`Config::merge_with_cli`].
//!
//! ```toml
//! output_dir = "input-cleaned"
//! jpeg_quality = 95
//! recursive = true
//! skip_existing = false
//! threads = 4
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::preprocess::{PreprocessOptions, DEFAULT_JPEG_QUALITY, DEFAULT_OUTPUT_DIR};

/// Config file in the working directory
pub const LOCAL_CONFIG_FILE: &str = "form-cleaner.toml";

/// Application directory below the user config directory
pub const APP_CONFIG_DIR: &str = "form-cleaner";

/// Config file name inside [`APP_CONFIG_DIR`]
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Config error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for a cleaning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where cleaned forms are written
    pub output_dir: PathBuf,

    /// Quality for re-encoded JPEG forms (1-100)
    pub jpeg_quality: u8,

    /// Descend into subdirectories of the input
    pub recursive: bool,

    /// Leave forms whose output already exists untouched
    pub skip_existing: bool,

    /// Worker threads; `None` uses one per CPU
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            recursive: false,
            skip_existing: false,
            threads: None,
        }
    }
}

impl Config {
    /// Load the first config file found in the search paths, or defaults
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Locations checked by [`Config::load`], in order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(user) = Self::user_config_path() {
            paths.push(user);
        }
        paths
    }

    /// Per-user config file location
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_CONFIG_DIR).join(USER_CONFIG_FILE))
    }

    /// Load a specific config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config.normalized())
    }

    /// Apply command-line overrides; CLI values win
    pub fn merge_with_cli(&self, overrides: &CliOverrides) -> Config {
        Config {
            output_dir: overrides
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            jpeg_quality: overrides.jpeg_quality.unwrap_or(self.jpeg_quality),
            recursive: overrides.recursive.unwrap_or(self.recursive),
            skip_existing: overrides.skip_existing.unwrap_or(self.skip_existing),
            threads: overrides.threads.or(self.threads),
        }
        .normalized()
    }

    /// Options for the pre-processing stage
    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions::default().with_jpeg_quality(self.jpeg_quality)
    }

    fn normalized(mut self) -> Self {
        self.jpeg_quality = self.preprocess_options().jpeg_quality;
        self.threads = self.threads.filter(|&n| n > 0);
        self
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub jpeg_quality: Option<u8>,
    pub recursive: Option<bool>,
    pub skip_existing: Option<bool>,
    pub threads: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("input-cleaned"));
        assert_eq!(config.jpeg_quality, 95);
        assert!(!config.recursive);
        assert!(!config.skip_existing);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_parse_full() {
        let config = Config::from_toml_str(
            r#"
            output_dir = "cleaned"
            jpeg_quality = 80
            recursive = true
            skip_existing = true
            threads = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("cleaned"));
        assert_eq!(config.jpeg_quality, 80);
        assert!(config.recursive);
        assert!(config.skip_existing);
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_parse_partial_uses_defaults() {
        let config = Config::from_toml_str("recursive = true").unwrap();
        assert!(config.recursive);
        assert_eq!(config.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_parse_normalizes() {
        let config = Config::from_toml_str("jpeg_quality = 0\nthreads = 0").unwrap();
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let result = Config::from_toml_str("jpeg_qualty = 90");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(Config::from_toml_str("recursive = \"yes\"").is_err());
    }

    #[test]
    fn test_merge_cli_precedence() {
        let file = Config {
            output_dir: PathBuf::from("from-file"),
            jpeg_quality: 70,
            recursive: true,
            skip_existing: false,
            threads: Some(8),
        };

        let overrides = CliOverrides {
            output_dir: Some(PathBuf::from("from-cli")),
            skip_existing: Some(true),
            ..CliOverrides::new()
        };

        let merged = file.merge_with_cli(&overrides);
        assert_eq!(merged.output_dir, PathBuf::from("from-cli"));
        assert_eq!(merged.jpeg_quality, 70);
        assert!(merged.recursive);
        assert!(merged.skip_existing);
        assert_eq!(merged.threads, Some(8));
    }

    #[test]
    fn test_merge_empty_overrides_is_identity() {
        let config = Config::default();
        assert_eq!(config.merge_with_cli(&CliOverrides::new()), config);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form-cleaner.toml");
        fs::write(&path, "jpeg_quality = 90\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn test_load_from_missing_path() {
        let result = Config::load_from_path(Path::new("/nonexistent/form-cleaner.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_search_paths_start_local() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from(LOCAL_CONFIG_FILE));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = Config {
            threads: Some(3),
            ..Config::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }
}
