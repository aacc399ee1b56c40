//! Configuration for knowledgestore

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `store-path`
pub const STORE_PATH_ENV: &str = "KNOWLEDGESTORE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding brain_knowledge.json
    #[serde(rename = "store-path")]
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pageforge")
                .join("knowledge"),
        }
    }
}

impl Config {
    /// Load from `path`, else the first config file found, else defaults
    ///
    /// `KNOWLEDGESTORE_DIR` wins over whatever the file says.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::candidates().into_iter().find(|p| p.exists()) {
                Some(found) => Self::from_file(&found)?,
                None => Self::default(),
            },
        };

        if let Ok(dir) = std::env::var(STORE_PATH_ENV) {
            config.store_path = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// `./knowledgestore.yml`, then `~/.config/knowledgestore/knowledgestore.yml`
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("knowledgestore.yml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("knowledgestore").join("knowledgestore.yml"));
        }
        paths
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content).context(format!("Failed to parse config file: {}", path.display()))
    }
}
