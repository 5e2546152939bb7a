//! Chat model capability
//!
//! The booster only needs two things from a language model host: a way to
//! enumerate the models that are available right now, and a way to send a
//! list of role-tagged messages and read the reply as a stream of text.
//! [`ModelCatalog`] and [`ChatModel`] are those two seams; everything else in
//! this module is a concrete binding to an HTTP API.

mod catalog;
mod error;
mod ollama;
mod openai_compat;
pub mod streaming;
mod types;

pub use catalog::{ConfiguredCatalog, StaticCatalog};
pub use error::LlmError;
pub use ollama::{list_local_ollama_models, OllamaModel, OllamaModelInfo, DEFAULT_OLLAMA_URL};
pub use openai_compat::{OpenAiCompatModel, DEFAULT_OPENAI_BASE_URL};
pub use types::*;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Incrementally delivered response text, in delivery order
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

/// A chat model that accepts role-tagged messages and streams text back
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Stable identifier (e.g. `gpt-4.1`, `llama3.1:8b`)
    fn id(&self) -> &str;

    /// Human-readable name; defaults to the id
    fn name(&self) -> &str {
        self.id()
    }

    /// Who serves the model (e.g. `openai`, `ollama`)
    fn vendor(&self) -> &str;

    fn info(&self) -> ModelInfo {
        ModelInfo {
            id: self.id().to_string(),
            name: self.name().to_string(),
            vendor: self.vendor().to_string(),
        }
    }

    /// Submit a request and return the response as a text stream
    ///
    /// Implementations should return `LlmError::Cancelled` when `cancel`
    /// fires before the response starts. Once the stream is handed back the
    /// caller is responsible for observing the token while consuming it.
    async fn send_request(
        &self,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<TextStream, LlmError>;
}

/// Enumerates the chat models that are currently selectable
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn chat_models(&self) -> Result<Vec<Arc<dyn ChatModel>>, LlmError>;
}

/// Run `fut` unless `cancel` fires first
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, LlmError>
where
    F: std::future::Future<Output = Result<T, LlmError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LlmError::Cancelled),
        result = fut => result,
    }
}
