//! reqwest-backed [`CompletionBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use super::{failure_message, parse_completion, ChatRequest, CompletionBackend, Endpoint};
use crate::error::{ExplainerError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpBackend {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplainerError::Request {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, timeout })
    }

    fn transport_error(&self, e: reqwest::Error) -> ExplainerError {
        let message = if e.is_timeout() {
            format!("no response within {}s", self.timeout.as_secs())
        } else if e.is_connect() {
            format!("could not connect: {e}")
        } else {
            e.to_string()
        };
        ExplainerError::Request {
            status: None,
            message,
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(&self, endpoint: &Endpoint, request: &ChatRequest) -> Result<String> {
        let body = serde_json::to_vec(request)?;
        tracing::debug!(url = %endpoint.url, model = %request.model, bytes = body.len(), "posting completion request");

        let response = self
            .client
            .post(&endpoint.url)
            .header(AUTHORIZATION, format!("Bearer {}", endpoint.api_key))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = failure_message(status.as_u16(), status.canonical_reason(), &text);
            tracing::warn!(status = status.as_u16(), %message, "completion request rejected");
            return Err(ExplainerError::Request {
                status: Some(status.as_u16()),
                message,
            });
        }

        parse_completion(&text)
    }
}
