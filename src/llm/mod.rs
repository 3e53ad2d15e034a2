//! Chat-completion wire format and the backend seam.
//!
//! The request body is the OpenAI-compatible `chat/completions` shape, which the
//! supported providers all accept. [`CompletionBackend`] is the only place a
//! network call happens, so the orchestrator can be driven by a fake in tests.

pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ExplainerError, Result};
use crate::prompt::ResolvedPrompt;

/// `detail` requested for image parts.
pub const IMAGE_DETAIL: &str = "auto";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Plain text, or a list of typed parts for multimodal messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message carrying the prompt text and one image.
    pub fn user_with_image(text: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.into(),
                        detail: IMAGE_DETAIL.to_string(),
                    },
                },
            ]),
        }
    }
}

impl ChatRequest {
    /// System message plus one text user message.
    pub fn text(prompt: &ResolvedPrompt) -> Self {
        Self::with_messages(
            prompt,
            vec![
                ChatMessage::system(&prompt.system_prompt),
                ChatMessage::user(&prompt.user_prompt),
            ],
        )
    }

    /// System message plus a user message with a text part and an image part.
    pub fn image(prompt: &ResolvedPrompt, image: &str) -> Self {
        Self::with_messages(
            prompt,
            vec![
                ChatMessage::system(&prompt.system_prompt),
                ChatMessage::user_with_image(&prompt.user_prompt, image),
            ],
        )
    }

    fn with_messages(prompt: &ResolvedPrompt, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: prompt.model.clone(),
            messages,
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        }
    }
}

/// Where to send a request and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub api_key: String,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one request and return the first choice's message text.
    ///
    /// Dropping the returned future abandons the request.
    async fn complete(&self, endpoint: &Endpoint, request: &ChatRequest) -> Result<String>;
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a success body.
pub fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| ExplainerError::Request {
        status: None,
        message: format!("unreadable response body: {e}"),
    })?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| ExplainerError::Request {
            status: None,
            message: "response contained no completion text".into(),
        })
}

/// Human message for a non-success response.
///
/// Prefers the provider's `error.message` (or top-level `message`), falling back
/// to the canonical reason phrase.
pub fn failure_message(status: u16, reason: Option<&str>, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });
    match (detail, reason) {
        (Some(detail), _) => format!("HTTP {status}: {detail}"),
        (None, Some(reason)) => format!("HTTP {status}: {reason}"),
        (None, None) => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolved() -> ResolvedPrompt {
        ResolvedPrompt {
            system_prompt: "sys".into(),
            user_prompt: "describe".into(),
            model: "gpt-4o".into(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    #[test]
    fn text_request_body_shape() {
        let body = serde_json::to_value(ChatRequest::text(&resolved())).unwrap();
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "sys"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "describe"}));
        assert_eq!(body["max_tokens"], json!(500));
    }

    #[test]
    fn image_request_uses_content_parts() {
        let body = serde_json::to_value(ChatRequest::image(&resolved(), "data:image/png;base64,AA")).unwrap();
        assert_eq!(
            body["messages"][1]["content"],
            json!([
                {"type": "text", "text": "describe"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AA", "detail": "auto"}}
            ])
        );
    }

    #[test]
    fn completion_text_is_extracted() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hi there");
    }

    #[test]
    fn empty_choices_is_a_request_failure() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ExplainerError::Request { status: None, .. }));
    }

    #[test]
    fn failure_message_prefers_server_detail() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        assert_eq!(
            failure_message(401, Some("Unauthorized"), body),
            "HTTP 401: Incorrect API key provided"
        );
        assert_eq!(failure_message(503, Some("Service Unavailable"), "<html>"), "HTTP 503: Service Unavailable");
    }
}
