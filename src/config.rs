use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::extract::{ExtractOptions, DEFAULT_MAX_CHARS, DEFAULT_SELF_ROOT_ID};
use crate::llm::http::DEFAULT_TIMEOUT;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ExplainerConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub extractor: ExtractorConfig,
    /// `EXPLAINER_API_KEY`; never read from the file.
    #[serde(skip)]
    pub api_key_override: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `sync.json` and `local.json`.
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractorConfig {
    pub max_chars: usize,
    pub self_root_id: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_explainer_dir()
            .join("data")
            .to_string_lossy()
            .into_owned();
        Self { data_dir }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            self_root_id: DEFAULT_SELF_ROOT_ID.into(),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `~/.ai-explainer/`
pub fn default_explainer_dir() -> PathBuf {
    home_dir().join(".ai-explainer")
}

/// Returns the default config file path: `~/.ai-explainer/config.toml`
pub fn default_config_path() -> PathBuf {
    default_explainer_dir().join("config.toml")
}

impl ExplainerConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ExplainerConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (EXPLAINER_DATA_DIR, EXPLAINER_LOG_LEVEL, EXPLAINER_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EXPLAINER_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("EXPLAINER_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("EXPLAINER_API_KEY") {
            self.api_key_override = Some(val).filter(|v| !v.trim().is_empty());
        }
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs.max(1))
    }

    pub fn extract_options(&self) -> ExtractOptions {
        let id = self.extractor.self_root_id.trim();
        ExtractOptions {
            max_chars: self.extractor.max_chars,
            self_root_id: (!id.is_empty()).then(|| id.to_string()),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}
