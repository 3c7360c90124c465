//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main evalprompt configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Prompt template configuration
    pub prompts: PromptsConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that an API key can be found. Call this before the first LLM
    /// request to fail with a clear message.
    pub fn validate(&self) -> Result<()> {
        if self.llm.get_api_key().is_none() {
            return Err(match self.llm.secrets_path() {
                Some(path) => eyre::eyre!(
                    "LLM API key not found. Set the {} environment variable or add it to {}.",
                    self.llm.api_key_env,
                    path.display()
                ),
                None => eyre::eyre!(
                    "LLM API key not found. Set the {} environment variable.",
                    self.llm.api_key_env
                ),
            });
        }
        if self.prompts.wrap_width == 0 {
            return Err(eyre::eyre!("prompts.wrap-width must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .evalprompt.yml
        let local_config = PathBuf::from(".evalprompt.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/evalprompt/evalprompt.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("evalprompt").join("evalprompt.yml");
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

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed: the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// YAML file mapping secret names to values, consulted when the env var is unset
    #[serde(rename = "secrets-file")]
    pub secrets_file: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            secrets_file: Some("~/.config/evalprompt/secrets.yml".to_string()),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key: environment variable first, then the secrets file
    pub fn get_api_key(&self) -> Option<String> {
        debug!(api_key_env = %self.api_key_env, "get_api_key: called");
        if let Ok(key) = std::env::var(&self.api_key_env)
            && !key.trim().is_empty()
        {
            debug!("get_api_key: found in environment");
            return Some(key);
        }

        let path = self.secrets_path()?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(?path, error = %e, "get_api_key: secrets file not readable");
                return None;
            }
        };
        match serde_yaml::from_str::<HashMap<String, String>>(&content) {
            Ok(secrets) => {
                let key = secrets.get(&self.api_key_env).filter(|k| !k.trim().is_empty()).cloned();
                debug!(found = key.is_some(), "get_api_key: looked up secrets file");
                key
            }
            Err(e) => {
                tracing::warn!("Failed to parse secrets file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Secrets file path with `~/` expanded
    pub fn secrets_path(&self) -> Option<PathBuf> {
        self.secrets_file.as_deref().and_then(expand_home)
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory whose `.pmt` files override the embedded templates
    #[serde(rename = "override-dir")]
    pub override_dir: String,

    /// Column width generated prompts are wrapped to
    #[serde(rename = "wrap-width")]
    pub wrap_width: usize,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            override_dir: ".evalprompt/prompts".to_string(),
            wrap_width: crate::DEFAULT_WRAP_WIDTH,
        }
    }
}

impl PromptsConfig {
    pub fn override_path(&self) -> Option<PathBuf> {
        expand_home(&self.override_dir)
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}
