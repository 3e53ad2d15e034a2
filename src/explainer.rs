//! The explain flow: resolve a prompt, call the model, record the result.

use std::sync::{Arc, Mutex, PoisonError};

use crate::blob::BlobStore;
use crate::error::{ExplainerError, Result};
use crate::history::time::now_display;
use crate::history::{ContextType, HistoryStore, NewRecord, SessionFallback};
use crate::llm::{ChatMessage, ChatRequest, CompletionBackend, Endpoint};
use crate::prompt::settings::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::prompt::{resolve, GlobalSettings, PromptConfig};

/// Prompt name recorded when no named prompt was used.
pub const DEFAULT_PROMPT_NAME: &str = "Explain";

/// Characters of a text selection kept in `sourceInfo`.
pub const SOURCE_PREVIEW_CHARS: usize = 30;

pub const IMAGE_SOURCE_INFO: &str = "Image analysis";

const TEST_MESSAGE: &str = "Hi, this is a test message.";
const TEST_MAX_TOKENS: u32 = 10;

/// What is being explained.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// A text selection.
    Text(String),
    /// A whole page, already converted to Markdown.
    Page { markdown: String },
    /// An image by URL, optionally with its bytes as a data URL.
    Image { url: String, data: Option<String> },
}

impl Subject {
    pub fn context_type(&self) -> ContextType {
        match self {
            Self::Text(_) => ContextType::Text,
            Self::Page { .. } => ContextType::Page,
            Self::Image { .. } => ContextType::Image,
        }
    }

    /// Content substituted into the template and stored as the record's text.
    fn content(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Page { markdown } => markdown,
            Self::Image { url, .. } => url,
        }
    }
}

/// Where the subject came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub page_url: Option<String>,
    pub page_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplainRequest {
    pub subject: Subject,
    /// Named prompt; `None` uses the global template.
    pub prompt: Option<PromptConfig>,
    pub provenance: Provenance,
}

impl ExplainRequest {
    pub fn new(subject: Subject) -> Self {
        Self {
            subject,
            prompt: None,
            provenance: Provenance::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: PromptConfig) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

/// Where the explanation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    /// Persisted in the history store under this id.
    Durable(i64),
    /// Kept only in the session fallback list.
    SessionOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub text: String,
    pub stored: Stored,
}

pub struct Explainer {
    blobs: Arc<dyn BlobStore>,
    history: Arc<HistoryStore>,
    backend: Arc<dyn CompletionBackend>,
    fallback: Mutex<SessionFallback>,
    api_key_override: Option<String>,
}

impl Explainer {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        history: Arc<HistoryStore>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            fallback: Mutex::new(SessionFallback::new(Arc::clone(&blobs))),
            blobs,
            history,
            backend,
            api_key_override: None,
        }
    }

    /// Use this key instead of the stored `apiKey`.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key_override = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Call the model for `request` and record the answer in history.
    ///
    /// Request failures are returned and nothing is recorded. If the model
    /// answered but history cannot be written, the record goes to the session
    /// fallback list and the explanation is still returned.
    pub async fn explain(&self, request: ExplainRequest) -> Result<Explanation> {
        let settings = GlobalSettings::load(self.blobs.as_ref())?;
        let endpoint = self.endpoint(&settings)?;
        let context_type = request.subject.context_type();
        let resolved = resolve(
            request.prompt.as_ref(),
            &settings,
            context_type,
            request.subject.content(),
        )?;

        let chat = match &request.subject {
            Subject::Image { url, data } => {
                ChatRequest::image(&resolved, data.as_deref().unwrap_or(url))
            }
            _ => ChatRequest::text(&resolved),
        };

        tracing::info!(
            context_type = %context_type,
            model = %resolved.model,
            prompt = request.prompt.as_ref().map(|p| p.name.as_str()).unwrap_or(DEFAULT_PROMPT_NAME),
            "requesting explanation"
        );
        let text = self.backend.complete(&endpoint, &chat).await?;

        let record = record_for(&request, &text);
        let stored = match self.history.add(record.clone()) {
            Ok(id) => Stored::Durable(id),
            Err(e) => {
                tracing::error!(error = %e, "explanation could not be saved to history");
                self.fallback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(record);
                Stored::SessionOnly
            }
        };

        Ok(Explanation { text, stored })
    }

    /// Send a tiny request to check the endpoint, key, and model.
    pub async fn test_connection(&self) -> Result<String> {
        let settings = GlobalSettings::load(self.blobs.as_ref())?;
        let endpoint = self.endpoint(&settings)?;
        let chat = ChatRequest {
            model: settings.model().unwrap_or(DEFAULT_MODEL).to_string(),
            messages: vec![ChatMessage::user(TEST_MESSAGE)],
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: TEST_MAX_TOKENS,
        };
        let reply = self.backend.complete(&endpoint, &chat).await?;
        tracing::info!(url = %endpoint.url, "connection test succeeded");
        Ok(reply)
    }

    /// Records that could only be kept for this session, most recent first.
    pub fn session_records(&self) -> Vec<NewRecord> {
        self.fallback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records()
            .cloned()
            .collect()
    }

    fn endpoint(&self, settings: &GlobalSettings) -> Result<Endpoint> {
        let api_key = self
            .api_key_override
            .as_deref()
            .or_else(|| settings.api_key())
            .ok_or_else(|| ExplainerError::Validation("API key not configured".into()))?;
        Ok(Endpoint {
            url: settings.endpoint().to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// History record for a successful explanation.
fn record_for(request: &ExplainRequest, explanation: &str) -> NewRecord {
    let subject = &request.subject;
    let provenance = &request.provenance;

    let source_info = match subject {
        Subject::Text(text) => Some(preview(text)),
        Subject::Page { .. } => provenance
            .page_title
            .clone()
            .or_else(|| provenance.page_url.clone()),
        Subject::Image { .. } => Some(IMAGE_SOURCE_INFO.to_string()),
    };
    let image_data = match subject {
        Subject::Image { data, .. } => data.clone(),
        _ => None,
    };

    NewRecord {
        text: subject.content().to_string(),
        explanation: explanation.to_string(),
        timestamp: Some(now_display()),
        prompt_name: Some(
            request
                .prompt
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| DEFAULT_PROMPT_NAME.to_string()),
        ),
        source_info,
        page_url: provenance.page_url.clone(),
        page_title: provenance.page_title.clone(),
        context_type: Some(subject.context_type()),
        image_data,
    }
}

/// First [`SOURCE_PREVIEW_CHARS`] characters, with `...` if anything was cut.
fn preview(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(SOURCE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_cuts_on_characters() {
        assert_eq!(preview("short"), "short");
        let long = "ü".repeat(40);
        assert_eq!(preview(&long), format!("{}...", "ü".repeat(30)));
    }

    #[test]
    fn page_record_uses_title_then_url() {
        let request = ExplainRequest::new(Subject::Page {
            markdown: "# Doc".into(),
        })
        .with_provenance(Provenance {
            page_url: Some("https://example.com/doc".into()),
            page_title: None,
        });
        let record = record_for(&request, "summary");
        assert_eq!(record.source_info.as_deref(), Some("https://example.com/doc"));
        assert_eq!(record.context_type, Some(ContextType::Page));
        assert_eq!(record.prompt_name.as_deref(), Some(DEFAULT_PROMPT_NAME));
    }

    #[test]
    fn image_record_keeps_data_and_url() {
        let request = ExplainRequest::new(Subject::Image {
            url: "https://example.com/cat.png".into(),
            data: Some("data:image/png;base64,AAAA".into()),
        });
        let record = record_for(&request, "a cat");
        assert_eq!(record.text, "https://example.com/cat.png");
        assert_eq!(record.image_data.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(record.source_info.as_deref(), Some(IMAGE_SOURCE_INFO));
    }
}
