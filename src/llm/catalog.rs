//! Model catalogs

use super::ollama::{list_local_ollama_models, OllamaModel};
use super::openai_compat::{OpenAiCompatModel, DEFAULT_OPENAI_BASE_URL};
use super::{ChatModel, LlmError, ModelCatalog};
use crate::config::LlmConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Catalog built from the `[llm]` config section
///
/// OpenAI-compatible models are listed when an API key is available (or the
/// endpoint is not the public OpenAI one, e.g. a local LM Studio server).
/// Ollama models are listed when the daemon answers on its tags endpoint.
pub struct ConfiguredCatalog {
    config: LlmConfig,
}

impl ConfiguredCatalog {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    fn openai_models(&self) -> Vec<Arc<dyn ChatModel>> {
        let openai = &self.config.openai;
        if !openai.enabled {
            return Vec::new();
        }

        let api_key = std::env::var(&openai.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        let is_public_endpoint = openai.base_url.trim_end_matches('/') == DEFAULT_OPENAI_BASE_URL;

        if api_key.is_none() && is_public_endpoint {
            tracing::debug!(
                "{} not set, skipping OpenAI-compatible models",
                openai.api_key_env
            );
            return Vec::new();
        }

        openai
            .models
            .iter()
            .map(|id| {
                let mut model = OpenAiCompatModel::new(id.clone())
                    .with_base_url(&openai.base_url)
                    .with_vendor(&openai.vendor)
                    .with_max_tokens(openai.max_tokens);
                if let Some(key) = &api_key {
                    model = model.with_api_key(key.clone());
                }
                Arc::new(model) as Arc<dyn ChatModel>
            })
            .collect()
    }

    async fn ollama_models(&self) -> Vec<Arc<dyn ChatModel>> {
        let ollama = &self.config.ollama;
        if !ollama.enabled {
            return Vec::new();
        }

        match list_local_ollama_models(&ollama.base_url).await {
            Ok(models) => models
                .into_iter()
                .map(|info| {
                    Arc::new(OllamaModel::new(info.name).with_base_url(&ollama.base_url))
                        as Arc<dyn ChatModel>
                })
                .collect(),
            Err(e) => {
                tracing::debug!("Ollama unavailable: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ModelCatalog for ConfiguredCatalog {
    async fn chat_models(&self) -> Result<Vec<Arc<dyn ChatModel>>, LlmError> {
        let mut models = self.openai_models();
        models.extend(self.ollama_models().await);
        Ok(models)
    }
}

/// Catalog over a fixed set of models
pub struct StaticCatalog {
    models: Vec<Arc<dyn ChatModel>>,
}

impl StaticCatalog {
    pub fn new(models: Vec<Arc<dyn ChatModel>>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl ModelCatalog for StaticCatalog {
    async fn chat_models(&self) -> Result<Vec<Arc<dyn ChatModel>>, LlmError> {
        Ok(self.models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OllamaConfig, OpenAiConfig};

    fn local_config() -> LlmConfig {
        LlmConfig {
            openai: OpenAiConfig {
                base_url: "http://127.0.0.1:1234/v1".to_string(),
                api_key_env: "PROMPT_BOOSTER_TEST_UNSET_KEY".to_string(),
                models: vec!["local-a".to_string(), "local-b".to_string()],
                ..OpenAiConfig::default()
            },
            ollama: OllamaConfig {
                enabled: false,
                ..OllamaConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn test_local_endpoint_listed_without_key() {
        let catalog = ConfiguredCatalog::new(local_config());
        let models = catalog.chat_models().await.unwrap();
        let ids: Vec<&str> = models.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["local-a", "local-b"]);
    }

    #[tokio::test]
    async fn test_public_endpoint_requires_key() {
        let mut config = local_config();
        config.openai.base_url = DEFAULT_OPENAI_BASE_URL.to_string();
        let catalog = ConfiguredCatalog::new(config);
        assert!(catalog.chat_models().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_openai_lists_nothing() {
        let mut config = local_config();
        config.openai.enabled = false;
        let catalog = ConfiguredCatalog::new(config);
        assert!(catalog.chat_models().await.unwrap().is_empty());
    }
}
