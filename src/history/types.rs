//! History record type definitions.
//!
//! Defines [`ContextType`] (what was analyzed), [`HistoryRecord`] (a stored row),
//! and [`NewRecord`] (caller input to [`HistoryStore::add`](super::HistoryStore::add)).
//! Both record types serialize in camelCase so they match the payloads the
//! extension surfaces already exchange.

use serde::{Deserialize, Serialize};

/// Classification of the analyzed content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    /// A text selection.
    #[default]
    Text,
    /// A whole page, converted to Markdown.
    Page,
    /// An image, referenced by URL and optionally embedded as a data URL.
    Image,
}

impl ContextType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Page => "page",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "page" => Ok(Self::Page),
            "image" => Ok(Self::Image),
            _ => Err(format!("unknown context type: {s}")),
        }
    }
}

/// One stored analysis event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Store-assigned, strictly increasing in insertion order.
    pub id: i64,
    /// The analyzed content: raw text, extracted Markdown, or an image URL.
    pub text: String,
    /// The model's response.
    pub explanation: String,
    /// Canonical sort key (milliseconds since the Unix epoch).
    pub created_at_epoch_millis: i64,
    /// Locale-formatted timestamp kept verbatim for display.
    pub created_at_display: String,
    pub prompt_name: Option<String>,
    /// Short human label: truncated selection, page title, or "Image analysis".
    pub source_info: Option<String>,
    pub page_url: Option<String>,
    pub page_title: Option<String>,
    #[serde(default)]
    pub context_type: ContextType,
    /// Embedded image payload (data URL). Only set for image records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

/// Input to the history store. The store assigns `id` and the epoch timestamp.
///
/// `timestamp` is the caller's display string; it is parsed to produce the sort
/// key and kept verbatim. The same shape is used by the session fallback list,
/// so entries found there can be imported unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub text: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub prompt_name: Option<String>,
    #[serde(default)]
    pub source_info: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub context_type: Option<ContextType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl NewRecord {
    /// A text record with no provenance; handy for tests and simple callers.
    pub fn text(text: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            explanation: explanation.into(),
            context_type: Some(ContextType::Text),
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt_name: impl Into<String>) -> Self {
        self.prompt_name = Some(prompt_name.into());
        self
    }

    pub fn with_timestamp(mut self, display: impl Into<String>) -> Self {
        self.timestamp = Some(display.into());
        self
    }
}
