//! OpenAI-compatible chat model
//!
//! Works with any endpoint that speaks the chat completions format with
//! `stream: true` (OpenAI, GitHub Models, OpenRouter, LM Studio, vLLM).
//!
//! SECURITY: the API key is only sent to the configured base URL.

use super::streaming::{decode_text_stream, Frame, SseDecoder};
use super::{cancellable, ChatModel, LlmError, Message, TextStream};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    vendor: String,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: model.into(),
            vendor: "openai".to_string(),
            max_tokens: 4096,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_vendor(mut self, vendor: &str) -> Self {
        self.vendor = vendor.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Interpret one SSE payload from a chat completions stream
fn parse_chunk(payload: &str) -> Result<Frame, LlmError> {
    if payload == "[DONE]" {
        return Ok(Frame::Done);
    }

    let chunk: ChatChunk = serde_json::from_str(payload)
        .map_err(|e| LlmError::Other(anyhow::anyhow!("Malformed stream chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(LlmError::ServiceError(error.to_string()));
    }

    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();

    if text.is_empty() {
        Ok(Frame::Skip)
    } else {
        Ok(Frame::Text(text))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    fn id(&self) -> &str {
        &self.model
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }

    async fn send_request(
        &self,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<TextStream, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
            max_tokens: self.max_tokens,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!("POST {} (model {})", self.endpoint(), self.model);

        let response = cancellable(&cancel, async {
            builder.send().await.map_err(LlmError::from_network_error)
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text));
        }

        let bytes = response.bytes_stream().map(|r| r.map(|b| b.to_vec())).boxed();
        Ok(decode_text_stream(bytes, SseDecoder::new(), parse_chunk))
    }
}
