//! Prompt boosting core
//!
//! [`Booster`] wires the pieces together for one host binding: it owns the
//! config and state stores, the session's [`ModelProvider`], and builds a
//! fresh [`ModeDispatcher`] from the current settings for every dispatch.

mod dispatcher;
mod error;
mod mode;
mod model_provider;
mod optimizer;
pub mod staging;
pub mod strategies;
mod types;

pub use dispatcher::ModeDispatcher;
pub use error::BoosterError;
pub use mode::OperationMode;
pub use model_provider::{matches_preference, ModelProvider};
pub use optimizer::{parse_result, strip_code_fence, PromptOptimizer};
pub use staging::{FileNamingPattern, PromptStager};
pub use types::{
    ChatReference, Intent, ModeExecutionContext, ModeOutcome, OptimizationOptions, Position,
    PromptResult, SkipReason, TextRange,
};

use crate::config::{BoosterSettings, ConfigStore};
use crate::host::HostBindings;
use crate::llm::ModelCatalog;
use crate::state::StateStore;
use std::sync::Arc;
use std::time::Duration;
use strategies::{FileModeStrategy, ManualModeStrategy, ModeStrategy, RealtimeModeStrategy};

pub struct Booster {
    config: Arc<ConfigStore>,
    state: Arc<StateStore>,
    models: Arc<ModelProvider>,
    host: HostBindings,
    optimizer: PromptOptimizer,
    realtime_deadline: Duration,
}

impl Booster {
    pub fn new(
        config: Arc<ConfigStore>,
        state: Arc<StateStore>,
        catalog: Arc<dyn ModelCatalog>,
        host: HostBindings,
    ) -> Self {
        let models = Arc::new(ModelProvider::new(
            catalog,
            host.ui.clone(),
            config.settings().model_preference,
        ));
        models.seed_last_used(state.last_model_id());

        Self {
            config,
            state,
            models,
            host,
            optimizer: PromptOptimizer::new(),
            realtime_deadline: strategies::REALTIME_DEADLINE,
        }
    }

    pub fn with_realtime_deadline(mut self, deadline: Duration) -> Self {
        self.realtime_deadline = deadline;
        self
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    pub fn models(&self) -> &Arc<ModelProvider> {
        &self.models
    }

    pub fn host(&self) -> &HostBindings {
        &self.host
    }

    pub fn optimizer(&self) -> PromptOptimizer {
        self.optimizer
    }

    pub fn settings(&self) -> BoosterSettings {
        self.config.settings()
    }

    /// Stager configured from the current settings
    pub fn stager(&self) -> PromptStager {
        let settings = self.settings();
        PromptStager::new(
            self.host.workspace.clone(),
            settings.file_output_directory,
            settings.file_naming_pattern,
            self.host.ui.clone(),
        )
    }

    /// Dispatcher over strategies built from a settings snapshot
    pub fn dispatcher(&self) -> ModeDispatcher {
        let settings = self.settings();
        self.models.set_preference(&settings.model_preference);

        let strategies: Vec<Box<dyn ModeStrategy>> = vec![
            Box::new(ManualModeStrategy::new(
                self.optimizer,
                self.models.clone(),
                self.host.clone(),
            )),
            Box::new(
                RealtimeModeStrategy::new(
                    self.optimizer,
                    self.models.clone(),
                    self.host.clone(),
                    self.state.clone(),
                    settings.clone(),
                )
                .with_deadline(self.realtime_deadline),
            ),
            Box::new(FileModeStrategy::new(
                self.optimizer,
                self.models.clone(),
                self.host.clone(),
                &settings,
            )),
        ];
        ModeDispatcher::new(strategies)
    }

    /// Dispatch using the configured operation mode
    pub async fn run(&self, ctx: ModeExecutionContext) -> ModeOutcome {
        let mode = self.settings().operation_mode;
        self.run_mode(mode, ctx).await
    }

    pub async fn run_mode(&self, mode: OperationMode, ctx: ModeExecutionContext) -> ModeOutcome {
        let outcome = self.dispatcher().dispatch(mode, ctx).await;
        self.remember_model();
        outcome
    }

    /// Persist the session's last-used model so the next process can reuse it
    pub fn remember_model(&self) {
        if let Err(e) = self.state.set_last_model_id(self.models.last_used()) {
            tracing::warn!("Failed to save last used model: {:#}", e);
        }
    }
}
