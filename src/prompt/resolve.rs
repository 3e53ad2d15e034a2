//! Merge a prompt's overrides with the global settings into one request recipe.

use super::settings::{GlobalSettings, PromptConfig, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_VISION_MODEL};
use crate::error::{ExplainerError, Result};
use crate::history::ContextType;

/// Placeholder replaced with the analyzed content.
pub const TEXT_PLACEHOLDER: &str = "{text}";

pub const DEFAULT_TEXT_TEMPLATE: &str = "Please analyze the following text:\n\n{text}";
pub const DEFAULT_PAGE_TEMPLATE: &str =
    "Please summarize the main points of the following web page content:\n\n{text}";
pub const DEFAULT_IMAGE_TEMPLATE: &str = "Please describe and analyze this image.";

/// Fully resolved parameters for one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Resolve a prompt against the global settings for `content`.
///
/// Template precedence: the prompt's own template, then the global user prompt
/// template, then the built-in default for the context. Text and page templates
/// must contain `{text}`; image templates may omit it, in which case the image is
/// only attached as a content part.
pub fn resolve(
    prompt: Option<&PromptConfig>,
    settings: &GlobalSettings,
    context: ContextType,
    content: &str,
) -> Result<ResolvedPrompt> {
    let template = prompt
        .map(|p| p.template.trim())
        .filter(|t| !t.is_empty())
        .or_else(|| settings.user_prompt_template())
        .unwrap_or(match context {
            ContextType::Text => DEFAULT_TEXT_TEMPLATE,
            ContextType::Page => DEFAULT_PAGE_TEMPLATE,
            ContextType::Image => DEFAULT_IMAGE_TEMPLATE,
        });

    if context != ContextType::Image && !template.contains(TEXT_PLACEHOLDER) {
        let name = prompt.map(|p| p.name.as_str()).unwrap_or("global template");
        return Err(ExplainerError::Validation(format!(
            "prompt template {name:?} must contain {TEXT_PLACEHOLDER}"
        )));
    }

    let fallback_model = match (settings.model(), context) {
        (Some(model), _) => model,
        (None, ContextType::Image) => DEFAULT_VISION_MODEL,
        (None, _) => DEFAULT_MODEL,
    };

    let system_prompt = prompt
        .and_then(|p| p.system_prompt.explicit().cloned())
        .unwrap_or_else(|| settings.system_prompt().to_string());
    let model = prompt
        .and_then(|p| p.model.explicit().cloned())
        .unwrap_or_else(|| fallback_model.to_string());
    let max_tokens = prompt
        .and_then(|p| p.max_tokens.explicit().copied())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| settings.max_tokens());

    Ok(ResolvedPrompt {
        system_prompt,
        user_prompt: template.replacen(TEXT_PLACEHOLDER, content, 1),
        model,
        max_tokens,
        temperature: DEFAULT_TEMPERATURE,
    })
}
