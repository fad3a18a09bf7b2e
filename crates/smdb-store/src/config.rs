use std::{
    fs,
    path::{Path, PathBuf},
};

use dirs::data_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store settings loadable from TOML. Hosts typically embed this in their
/// own config file; a missing file or empty contents fall back to defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Store name; doubles as the directory name under `<base>/smdb/` and
    /// as the cipher key material.
    pub name: String,
    /// Override for the base directory (platform data dir when absent).
    pub base_dir: Option<PathBuf>,
    /// Prefer AES-GCM over the stream obfuscator.
    pub prefer_aead: bool,
    /// Load all persisted entries when the store opens.
    pub preload: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_dir: None,
            prefer_aead: true,
            preload: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no data directory available on this platform")]
    NoBaseDir,
}

impl StoreConfig {
    /// Load from a given path; if missing or empty, return defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(&contents)?)
    }

    /// Resolve the base directory: explicit override, else the platform
    /// data dir.
    pub fn resolve_base_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => data_dir().ok_or(ConfigError::NoBaseDir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = StoreConfig::load_from_path(dir.path().join("smdb.toml")).expect("load");
        assert_eq!(cfg, StoreConfig::default());
    }

    #[test]
    fn returns_default_when_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("smdb.toml");
        fs::write(&path, "   \n").expect("write");
        let cfg = StoreConfig::load_from_path(&path).expect("load");
        assert_eq!(cfg, StoreConfig::default());
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            name = "settings"
            base_dir = "/tmp/smdb-data"
            prefer_aead = false
            preload = false
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("smdb.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = StoreConfig::load_from_path(&path).expect("load");
        assert_eq!(
            cfg,
            StoreConfig {
                name: "settings".to_string(),
                base_dir: Some(PathBuf::from("/tmp/smdb-data")),
                prefer_aead: false,
                preload: false,
            }
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("smdb.toml");
        fs::write(&path, "name = \"partial\"\n").expect("write");

        let cfg = StoreConfig::load_from_path(&path).expect("load");
        assert_eq!(cfg.name, "partial");
        assert!(cfg.prefer_aead);
        assert!(cfg.preload);
        assert_eq!(cfg.base_dir, None);
    }

    #[test]
    fn explicit_base_dir_wins() {
        let cfg = StoreConfig {
            base_dir: Some(PathBuf::from("/tmp/override")),
            ..StoreConfig::default()
        };
        assert_eq!(
            cfg.resolve_base_dir().expect("resolve"),
            PathBuf::from("/tmp/override")
        );
    }
}
