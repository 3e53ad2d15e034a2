//! Global API settings and prompt templates, stored in the sync scope.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::tunable::{Tunable, TunableValue};
use crate::blob::{BlobMap, BlobStore, Scope};
use crate::error::{ExplainerError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// Used for image requests when no model is configured at all.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions about text. Reply clearly and concisely.";

/// Sync-scope keys holding [`GlobalSettings`] fields.
pub const SETTINGS_KEYS: &[&str] = &[
    "apiEndpoint",
    "apiKey",
    "apiModel",
    "maxTokens",
    "systemPrompt",
    "userPromptTemplate",
];

/// Sync-scope key holding the prompt template list.
pub const PROMPTS_KEY: &str = "prompts";

/// Settings shared by every prompt. Unset or empty fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_model: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt_template: Option<String>,
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(u32::from_json))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl GlobalSettings {
    /// Read the settings keys from the sync scope. Missing keys stay `None`.
    pub fn load(blobs: &dyn BlobStore) -> Result<Self> {
        let stored = blobs
            .get(Scope::Sync, SETTINGS_KEYS)
            .map_err(|e| ExplainerError::storage("failed to load settings", e))?;
        Ok(serde_json::from_value(Value::Object(stored))?)
    }

    /// Validate and write the settings keys. Unset fields are removed.
    pub fn save(&self, blobs: &dyn BlobStore) -> Result<()> {
        self.validate()?;

        let items: BlobMap = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => BlobMap::new(),
        };
        let unset: Vec<&str> = SETTINGS_KEYS
            .iter()
            .copied()
            .filter(|k| !items.contains_key(*k))
            .collect();

        blobs
            .set(Scope::Sync, items)
            .map_err(|e| ExplainerError::storage("failed to save settings", e))?;
        blobs
            .remove(Scope::Sync, &unset)
            .map_err(|e| ExplainerError::storage("failed to save settings", e))?;

        tracing::info!("settings saved");
        Ok(())
    }

    /// Drop every stored setting and prompt, returning to defaults.
    pub fn reset(blobs: &dyn BlobStore) -> Result<()> {
        blobs
            .clear(Scope::Sync)
            .map_err(|e| ExplainerError::storage("failed to reset settings", e))?;
        tracing::info!("settings reset to defaults");
        Ok(())
    }

    /// Endpoint, key, and model are required before settings can be saved.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if non_empty(&self.api_endpoint).is_none() {
            missing.push("apiEndpoint");
        }
        if non_empty(&self.api_key).is_none() {
            missing.push("apiKey");
        }
        if non_empty(&self.api_model).is_none() {
            missing.push("apiModel");
        }
        if self.max_tokens == Some(0) {
            return Err(ExplainerError::Validation("maxTokens must be positive".into()));
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExplainerError::Validation(format!(
                "required settings missing: {}",
                missing.join(", ")
            )))
        }
    }

    /// Set one field by its stored key name.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());
        match key {
            "apiEndpoint" => self.api_endpoint = text,
            "apiKey" => self.api_key = text,
            "apiModel" => self.api_model = text,
            "systemPrompt" => self.system_prompt = text,
            "userPromptTemplate" => self.user_prompt_template = text,
            "maxTokens" => {
                self.max_tokens = match text {
                    None => None,
                    Some(t) => Some(t.parse().map_err(|_| {
                        ExplainerError::Validation(format!("maxTokens must be a number, got {t:?}"))
                    })?),
                }
            }
            other => {
                return Err(ExplainerError::Validation(format!(
                    "unknown setting {other:?}; expected one of {}",
                    SETTINGS_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        non_empty(&self.api_endpoint).unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }

    /// The configured model, if any. Callers pick the default per context.
    pub fn model(&self) -> Option<&str> {
        non_empty(&self.api_model)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.filter(|n| *n > 0).unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn system_prompt(&self) -> &str {
        non_empty(&self.system_prompt).unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn user_prompt_template(&self) -> Option<&str> {
        non_empty(&self.user_prompt_template)
    }

    /// Copy a preset's endpoint, model and token budget. The key is left alone.
    pub fn apply_preset(&mut self, preset: &Preset) {
        self.api_endpoint = Some(preset.endpoint.to_string());
        self.api_model = Some(preset.model.to_string());
        self.max_tokens = Some(preset.max_tokens);
    }
}

/// A named prompt template with optional per-prompt overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    pub name: String,
    /// Template text; `{text}` is replaced with the analyzed content.
    pub template: String,
    #[serde(default)]
    pub system_prompt: Tunable<String>,
    #[serde(default, rename = "apiModel")]
    pub model: Tunable<String>,
    #[serde(default)]
    pub max_tokens: Tunable<u32>,
}

impl PromptConfig {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            system_prompt: Tunable::Inherit,
            model: Tunable::Inherit,
            max_tokens: Tunable::Inherit,
        }
    }
}

pub fn load_prompts(blobs: &dyn BlobStore) -> Result<Vec<PromptConfig>> {
    let stored = blobs
        .get_one(Scope::Sync, PROMPTS_KEY)
        .map_err(|e| ExplainerError::storage("failed to load prompts", e))?;
    match stored {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

pub fn save_prompts(blobs: &dyn BlobStore, prompts: &[PromptConfig]) -> Result<()> {
    let value = serde_json::to_value(prompts)?;
    blobs
        .set_one(Scope::Sync, PROMPTS_KEY, value)
        .map_err(|e| ExplainerError::storage("failed to save prompts", e))?;
    tracing::info!(count = prompts.len(), "prompts saved");
    Ok(())
}

/// Look up a prompt by exact name.
pub fn find_prompt(blobs: &dyn BlobStore, name: &str) -> Result<Option<PromptConfig>> {
    Ok(load_prompts(blobs)?.into_iter().find(|p| p.name == name))
}

/// Known provider endpoints, to fill in settings quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub model: &'static str,
    pub max_tokens: u32,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "openai",
        endpoint: "https://api.openai.com/v1/chat/completions",
        model: "gpt-3.5-turbo",
        max_tokens: 500,
    },
    Preset {
        name: "azure",
        endpoint: "https://your-resource.openai.azure.com/openai/deployments/your-deployment/chat/completions?api-version=2023-05-15",
        model: "gpt-35-turbo",
        max_tokens: 500,
    },
    Preset {
        name: "zhipu",
        endpoint: "https://open.bigmodel.cn/api/paas/v4/chat/completions",
        model: "glm-4",
        max_tokens: 500,
    },
    Preset {
        name: "tongyi",
        endpoint: "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation",
        model: "qwen-turbo",
        max_tokens: 500,
    },
];

pub fn preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
