//! Ollama chat model (local models)

use super::streaming::{decode_text_stream, Frame, NdjsonDecoder};
use super::{cancellable, ChatModel, LlmError, Message, TextStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

/// Model info returned from Ollama's /api/tags endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    #[serde(default)]
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    content: String,
}

/// List installed models from an Ollama instance
///
/// Fails when Ollama is not running or unreachable.
pub async fn list_local_ollama_models(base_url: &str) -> Result<Vec<OllamaModelInfo>> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));

    let response = client
        .get(&url)
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .context("Failed to connect to Ollama - is it running? Try: ollama serve")?;

    if !response.status().is_success() {
        let status = response.status();
        anyhow::bail!("Ollama API error ({})", status);
    }

    #[derive(Deserialize)]
    struct TagsResponse {
        models: Vec<OllamaModelInfo>,
    }

    let resp: TagsResponse = response
        .json()
        .await
        .context("Failed to parse Ollama response")?;

    Ok(resp.models)
}

impl OllamaModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

fn parse_line(line: &str) -> Result<Frame, LlmError> {
    let chunk: OllamaStreamChunk = serde_json::from_str(line)
        .map_err(|e| LlmError::Other(anyhow::anyhow!("Malformed Ollama chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(LlmError::ServiceError(error));
    }

    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    match (text.is_empty(), chunk.done) {
        (false, _) => Ok(Frame::Text(text)),
        (true, true) => Ok(Frame::Done),
        (true, false) => Ok(Frame::Skip),
    }
}

#[async_trait]
impl ChatModel for OllamaModel {
    fn id(&self) -> &str {
        &self.model
    }

    fn vendor(&self) -> &str {
        "ollama"
    }

    async fn send_request(
        &self,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<TextStream, LlmError> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!("POST {} (model {})", url, self.model);

        let response = cancellable(&cancel, async {
            self.client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(LlmError::from_network_error)
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text));
        }

        let bytes = response.bytes_stream().map(|r| r.map(|b| b.to_vec())).boxed();
        Ok(decode_text_stream(bytes, NdjsonDecoder::new(), parse_line))
    }
}
