//! Model selection
//!
//! Remembers the model used last in this session. Interactive selection
//! (`get_model`) shows a picker when nothing usable is remembered; automatic
//! selection (`get_model_automatically`) never asks and prefers, in order,
//! the last-used model, the configured preference, then the first model the
//! catalog lists. A remembered model is only reused while the catalog still
//! offers it.

use crate::host::{HostUi, PickItem};
use crate::llm::{ChatModel, ModelCatalog};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

pub struct ModelProvider {
    catalog: Arc<dyn ModelCatalog>,
    ui: Arc<dyn HostUi>,
    preference: RwLock<String>,
    last_used: Mutex<Option<String>>,
}

impl ModelProvider {
    pub fn new(catalog: Arc<dyn ModelCatalog>, ui: Arc<dyn HostUi>, preference: impl Into<String>) -> Self {
        Self {
            catalog,
            ui,
            preference: RwLock::new(preference.into()),
            last_used: Mutex::new(None),
        }
    }

    pub fn preference(&self) -> String {
        self.preference
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_preference(&self, preference: &str) {
        *self.preference.write().unwrap_or_else(PoisonError::into_inner) = preference.to_string();
    }

    /// Id of the model used last, if any
    pub fn last_used(&self) -> Option<String> {
        self.last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Restore a remembered model id, e.g. from persisted state
    pub fn seed_last_used(&self, id: Option<String>) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = id;
    }

    pub fn reset_last_used(&self) {
        self.seed_last_used(None);
    }

    /// Every model the catalog offers right now, empty on catalog errors
    pub async fn available(&self) -> Vec<Arc<dyn ChatModel>> {
        self.catalog.chat_models().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to list language models: {}", e);
            Vec::new()
        })
    }

    /// Pick a model, asking the user when needed (or always, with `force_prompt`)
    pub async fn get_model(&self, force_prompt: bool) -> Option<Arc<dyn ChatModel>> {
        let models = match self.catalog.chat_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => {
                tracing::error!("No language models available");
                self.ui
                    .show_error("Failed to select language model: no language models available. Configure an OpenAI-compatible endpoint or start Ollama.")
                    .await;
                return None;
            }
            Err(e) => {
                tracing::error!("Error listing models: {}", e);
                self.ui
                    .show_error(&format!("Failed to select language model: {}", e))
                    .await;
                return None;
            }
        };

        tracing::debug!(
            "Found {} available model(s): {}",
            models.len(),
            models.iter().map(|m| m.id()).collect::<Vec<_>>().join(", ")
        );

        if !force_prompt {
            if let Some(model) = self.available_last_used(&models) {
                tracing::info!("Using last selected model: {}", model.id());
                warn_if_slow_model(model.id());
                return Some(model);
            }
            if self.last_used().is_some() {
                tracing::info!("Last used model no longer available");
            }
        }

        let model = self.show_picker(models).await?;
        warn_if_slow_model(model.id());
        self.seed_last_used(Some(model.id().to_string()));
        Some(model)
    }

    /// Pick a model without any user interaction
    pub async fn get_model_automatically(&self) -> Option<Arc<dyn ChatModel>> {
        let models = match self.catalog.chat_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => {
                tracing::error!("No language models available");
                return None;
            }
            Err(e) => {
                tracing::error!("Error getting model: {}", e);
                return None;
            }
        };

        if let Some(model) = self.available_last_used(&models) {
            tracing::info!("Using last selected model: {}", model.id());
            warn_if_slow_model(model.id());
            return Some(model);
        }

        let preference = self.preference();
        let model = match models.iter().find(|m| matches_preference(m.id(), &preference)) {
            Some(model) => {
                tracing::info!("Using preferred model from settings: {}", model.id());
                model.clone()
            }
            None => {
                tracing::info!("Using first available model: {}", models[0].id());
                models[0].clone()
            }
        };

        warn_if_slow_model(model.id());
        self.seed_last_used(Some(model.id().to_string()));
        Some(model)
    }

    fn available_last_used(&self, models: &[Arc<dyn ChatModel>]) -> Option<Arc<dyn ChatModel>> {
        let last = self.last_used()?;
        models.iter().find(|m| m.id() == last).cloned()
    }

    async fn show_picker(&self, models: Vec<Arc<dyn ChatModel>>) -> Option<Arc<dyn ChatModel>> {
        let ordered = picker_order(models, self.last_used().as_deref(), &self.preference());
        let items: Vec<PickItem> = ordered.iter().map(|entry| entry.item()).collect();

        let index = self
            .ui
            .pick("Select AI Model for Prompt Optimization", &items)
            .await?;
        let entry = ordered.into_iter().nth(index)?;
        tracing::info!("User selected model: {}", entry.model.id());
        Some(entry.model)
    }
}

struct PickerEntry {
    model: Arc<dyn ChatModel>,
    last_used: bool,
    preferred: bool,
}

impl PickerEntry {
    fn item(&self) -> PickItem {
        let item = PickItem::new(self.model.name(), self.model.vendor());
        let mut details = Vec::new();
        if self.last_used {
            details.push("Last used");
        }
        if self.preferred {
            details.push("Preferred");
        }
        if details.is_empty() {
            item
        } else {
            item.with_detail(details.join(" • "))
        }
    }
}

/// Last used first, then preferred, then by name
fn picker_order(
    models: Vec<Arc<dyn ChatModel>>,
    last_used: Option<&str>,
    preference: &str,
) -> Vec<PickerEntry> {
    let mut entries: Vec<PickerEntry> = models
        .into_iter()
        .map(|model| PickerEntry {
            last_used: last_used == Some(model.id()),
            preferred: matches_preference(model.id(), preference),
            model,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.last_used
            .cmp(&a.last_used)
            .then(b.preferred.cmp(&a.preferred))
            .then_with(|| a.model.name().cmp(b.model.name()))
    });
    entries
}

/// Case-insensitive match ignoring hyphens, so `gpt-4.1` finds `gpt-4.1-2025`
/// and `gpt4.1` alike
pub fn matches_preference(model_id: &str, preference: &str) -> bool {
    let wanted = preference.to_lowercase().replace('-', "");
    if wanted.is_empty() {
        return false;
    }
    model_id.to_lowercase().replace('-', "").contains(&wanted)
}

fn warn_if_slow_model(model_id: &str) {
    let id = model_id.to_lowercase();
    if id.contains("gpt-5") && id.contains("mini") {
        tracing::warn!(
            "{} may have slow response times; optimization may take longer or time out. Consider a faster model.",
            model_id
        );
    }
}
