//! Manual mode: rewrite a selected prompt in place

use super::ModeStrategy;
use crate::booster::error::BoosterError;
use crate::booster::model_provider::ModelProvider;
use crate::booster::mode::OperationMode;
use crate::booster::optimizer::PromptOptimizer;
use crate::booster::types::{ModeExecutionContext, ModeOutcome, OptimizationOptions, SkipReason};
use crate::host::{with_progress, HostBindings};
use async_trait::async_trait;
use std::sync::Arc;

pub struct ManualModeStrategy {
    optimizer: PromptOptimizer,
    models: Arc<ModelProvider>,
    host: HostBindings,
}

impl ManualModeStrategy {
    pub fn new(optimizer: PromptOptimizer, models: Arc<ModelProvider>, host: HostBindings) -> Self {
        Self {
            optimizer,
            models,
            host,
        }
    }

    async fn fail(&self, message: String) -> ModeOutcome {
        tracing::error!("{}", message);
        self.host.ui.show_error(&message).await;
        ModeOutcome::Failed(message)
    }
}

#[async_trait]
impl ModeStrategy for ManualModeStrategy {
    fn mode(&self) -> OperationMode {
        OperationMode::Manual
    }

    async fn execute(&self, ctx: ModeExecutionContext) -> ModeOutcome {
        tracing::info!("Executing manual mode strategy");

        if !ctx.has_prompt() {
            self.host.ui.show_warning("No text to optimize").await;
            return ModeOutcome::Skipped(SkipReason::EmptyPrompt);
        }

        let (uri, range) = match (&ctx.document_uri, ctx.range) {
            (Some(uri), Some(range)) => (uri.clone(), range),
            (None, _) => return self.fail(BoosterError::MissingDocument.to_string()).await,
            (Some(_), None) => return self.fail(BoosterError::MissingRange.to_string()).await,
        };

        let Some(model) = self.models.get_model(false).await else {
            tracing::info!("Model selection cancelled");
            return ModeOutcome::Skipped(SkipReason::NoModel);
        };

        let optimizer = self.optimizer;
        let prompt = ctx.prompt.as_str();
        let optimized = with_progress(
            self.host.progress.as_ref(),
            "PromptBooster: Optimizing...",
            "Sending to AI model...",
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
            Err(e) => return self.fail(e.to_string()).await,
        };

        match self.host.editor.replace(&uri, range, &optimized).await {
            Ok(true) => {
                self.host.ui.show_info("✓ Prompt optimized successfully!").await;
                tracing::info!("Original length: {} chars", ctx.prompt.len());
                tracing::info!("Optimized length: {} chars", optimized.len());
                ModeOutcome::Applied {
                    original_len: ctx.prompt.len(),
                    optimized_len: optimized.len(),
                }
            }
            Ok(false) => self.fail("Failed to apply optimization".to_string()).await,
            Err(e) => self.fail(format!("Failed to apply optimization: {:#}", e)).await,
        }
    }
}
