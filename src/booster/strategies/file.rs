//! File mode: stage the optimized prompt in an editable file

use super::ModeStrategy;
use crate::booster::error::BoosterError;
use crate::booster::model_provider::ModelProvider;
use crate::booster::mode::OperationMode;
use crate::booster::optimizer::PromptOptimizer;
use crate::booster::staging::PromptStager;
use crate::booster::types::{ModeExecutionContext, ModeOutcome, OptimizationOptions, SkipReason};
use crate::config::BoosterSettings;
use crate::host::{with_progress, HostBindings};
use async_trait::async_trait;
use std::sync::Arc;

pub struct FileModeStrategy {
    optimizer: PromptOptimizer,
    models: Arc<ModelProvider>,
    host: HostBindings,
    stager: PromptStager,
}

impl FileModeStrategy {
    pub fn new(
        optimizer: PromptOptimizer,
        models: Arc<ModelProvider>,
        host: HostBindings,
        settings: &BoosterSettings,
    ) -> Self {
        let stager = PromptStager::new(
            host.workspace.clone(),
            settings.file_output_directory.clone(),
            settings.file_naming_pattern,
            host.ui.clone(),
        );
        Self {
            optimizer,
            models,
            host,
            stager,
        }
    }
}

#[async_trait]
impl ModeStrategy for FileModeStrategy {
    fn mode(&self) -> OperationMode {
        OperationMode::File
    }

    async fn execute(&self, ctx: ModeExecutionContext) -> ModeOutcome {
        tracing::info!("Executing file mode strategy");

        if !ctx.has_prompt() {
            self.host.ui.show_warning("No text to optimize").await;
            return ModeOutcome::Skipped(SkipReason::EmptyPrompt);
        }

        if self.host.workspace.is_none() {
            tracing::warn!("No workspace folder open");
            self.host
                .ui
                .show_warning("Open a workspace folder to generate prompt files")
                .await;
            return ModeOutcome::Skipped(SkipReason::NoWorkspace);
        }

        let Some(model) = self.models.get_model(false).await else {
            tracing::info!("Model selection cancelled");
            return ModeOutcome::Skipped(SkipReason::NoModel);
        };

        let optimizer = self.optimizer;
        let prompt = ctx.prompt.as_str();
        let optimized = with_progress(
            self.host.progress.as_ref(),
            "PromptBooster: Generating prompt file...",
            "Optimizing prompt...",
            &ctx.cancel,
            |token| async move {
                let options = OptimizationOptions::new(model, token);
                optimizer.optimize(prompt, &options).await
            },
        )
        .await;

        let optimized = match optimized {
            Ok(text) => text,
            Err(BoosterError::Cancelled) => {
                self.host.ui.show_info("Optimization cancelled").await;
                return ModeOutcome::Cancelled;
            }
            Err(e) => {
                tracing::error!("Error generating file: {}", e);
                self.host.ui.show_error(&e.to_string()).await;
                return ModeOutcome::Failed(e.to_string());
            }
        };

        match self.stager.stage(&ctx.prompt, &optimized).await {
            Ok(Some(path)) => {
                if let Err(e) = self.host.ui.open_document(&path).await {
                    tracing::error!("Failed to open generated file: {:#}", e);
                }
                ModeOutcome::Staged(path)
            }
            Ok(None) => {
                tracing::info!("File name prompt dismissed");
                ModeOutcome::Skipped(SkipReason::NoFileName)
            }
            Err(e) => {
                tracing::error!("Error generating file: {}", e);
                let message = format!("Failed to create prompt file: {}", e);
                self.host.ui.show_error(&message).await;
                ModeOutcome::Failed(message)
            }
        }
    }
}
