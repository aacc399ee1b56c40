//! PageForge configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main PageForge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generative backend configuration
    pub llm: LlmConfig,

    /// PNG export configuration
    pub export: ExportConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Log level (overridden by --log-level)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set. Call this before
    /// any backend call to fail fast with a clear message.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .pageforge.yml
        let local_config = PathBuf::from(".pageforge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/pageforge/pageforge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pageforge").join("pageforge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Peek at the configured log level before logging is set up
    ///
    /// Errors are swallowed; the real load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".pageforge.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("pageforge").join("pageforge.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Generative backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "gemini" supported)
    pub provider: String,

    /// Model used for the page plan
    #[serde(rename = "plan-model")]
    pub plan_model: String,

    /// Model used for slide images
    #[serde(rename = "image-model")]
    pub image_model: String,

    /// Model used to finalize slide copy
    #[serde(rename = "text-model")]
    pub text_model: String,

    /// Model used by the chat assistant
    #[serde(rename = "chat-model")]
    pub chat_model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            plan_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            text_model: "gemini-3-pro-preview".to_string(),
            chat_model: "gemini-3-pro-preview".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: 300_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(eyre::eyre!("Environment variable {} is not set", self.api_key_env)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// PNG export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Bold TTF/OTF font for the text overlay; system fonts are tried when unset
    #[serde(rename = "font-path")]
    pub font_path: Option<PathBuf>,

    /// Default output directory
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Delay between successive slides in a batch export
    #[serde(rename = "stagger-ms")]
    pub stagger_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            output_dir: PathBuf::from("."),
            stagger_ms: 600,
        }
    }
}

impl ExportConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding session.json
    #[serde(rename = "session-dir")]
    pub session_dir: PathBuf,

    /// Directory holding brain_knowledge.json
    #[serde(rename = "knowledge-dir")]
    pub knowledge_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // XDG data directory (~/.local/share/pageforge on Linux)
        let base = dirs::data_local_dir()
            .map(|d| d.join("pageforge"))
            .unwrap_or_else(|| PathBuf::from(".pageforge"));

        Self {
            session_dir: base.clone(),
            knowledge_dir: base.join("knowledge"),
        }
    }
}
