//! Configuration management for prompt-booster

use crate::booster::{FileNamingPattern, OperationMode};
use crate::llm::DEFAULT_OLLAMA_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Overrides the directory holding `config.toml` and `state.json`
pub const CONFIG_DIR_ENV: &str = "PROMPT_BOOSTER_CONFIG_DIR";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub booster: BoosterSettings,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

/// User-facing booster settings
///
/// Strategies receive a clone of this taken when they are built, so a
/// setting changed mid-call only affects the next dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterSettings {
    pub operation_mode: OperationMode,
    /// Realtime mode optimizes chat prompts only when this is on
    pub auto_optimize: bool,
    /// Quote the optimized prompt above the realtime action buttons
    pub show_preview: bool,
    /// Relative to the workspace root
    pub file_output_directory: String,
    pub file_naming_pattern: FileNamingPattern,
    pub model_preference: String,
}

impl Default for BoosterSettings {
    fn default() -> Self {
        Self {
            operation_mode: OperationMode::Manual,
            auto_optimize: false,
            show_preview: true,
            file_output_directory: ".github/prompts".to_string(),
            file_naming_pattern: FileNamingPattern::Prompt,
            model_preference: "gpt-4.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
}

/// Any endpoint speaking the OpenAI chat completions format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub models: Vec<String>,
    pub max_tokens: usize,
    pub vendor: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: crate::llm::DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            models: vec![
                "gpt-4.1".to_string(),
                "gpt-4o".to_string(),
                "gpt-4o-mini".to_string(),
            ],
            max_tokens: 4096,
            vendor: "openai".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Directory holding the config and state files
    pub fn config_dir() -> Result<PathBuf> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => match directories::ProjectDirs::from("", "", "prompt-booster") {
                Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
                None => PathBuf::from("."),
            },
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Shared, persisted configuration
///
/// Reads hand out snapshots; every mutation is written back to disk before
/// it returns (unless the store is in-memory).
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: RwLock<Config>,
}

impl ConfigStore {
    /// Open the store at the default config path
    pub fn open() -> Result<Self> {
        Self::open_at(Config::config_path()?)
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        let config = Config::load_from(&path)?;
        Ok(Self {
            path: Some(path),
            config: RwLock::new(config),
        })
    }

    /// A store that never touches the disk
    pub fn in_memory(config: Config) -> Self {
        Self {
            path: None,
            config: RwLock::new(config),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn settings(&self) -> BoosterSettings {
        self.snapshot().booster
    }

    pub fn set_operation_mode(&self, mode: OperationMode) -> Result<()> {
        self.update(|config| config.booster.operation_mode = mode)?;
        tracing::info!("Mode switched to: {}", mode);
        Ok(())
    }

    /// Flip auto-optimize and return the new value
    pub fn toggle_auto_optimize(&self) -> Result<bool> {
        let enabled = self.update(|config| {
            config.booster.auto_optimize = !config.booster.auto_optimize;
            config.booster.auto_optimize
        })?;
        tracing::info!("Auto-optimize {}", if enabled { "enabled" } else { "disabled" });
        Ok(enabled)
    }

    pub fn set_model_preference(&self, model: &str) -> Result<()> {
        self.update(|config| config.booster.model_preference = model.to_string())?;
        tracing::info!("Model preference switched to: {}", model);
        Ok(())
    }

    fn update<T>(&self, change: impl FnOnce(&mut Config) -> T) -> Result<T> {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let value = change(&mut config);
        if let Some(path) = &self.path {
            config.save_to(path)?;
        }
        Ok(value)
    }
}
