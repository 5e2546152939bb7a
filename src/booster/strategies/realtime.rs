//! Realtime mode: intercept a chat prompt and render an optimized preview
//!
//! The optimization call races a fixed deadline and the caller's
//! cancellation token. Whichever side loses is dropped, and the model call
//! gets its own child token so a late response is abandoned upstream too.

use super::ModeStrategy;
use crate::booster::error::BoosterError;
use crate::booster::model_provider::ModelProvider;
use crate::booster::mode::OperationMode;
use crate::booster::optimizer::PromptOptimizer;
use crate::booster::types::{
    ChatReference, Intent, ModeExecutionContext, ModeOutcome, OptimizationOptions, PromptResult,
    SkipReason,
};
use crate::commands::CommandId;
use crate::config::BoosterSettings;
use crate::host::{ChatButton, ChatResponseStream, HostBindings};
use crate::state::StateStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const REALTIME_DEADLINE: Duration = Duration::from_millis(20_000);

const DISABLED_NOTICE: &str = "⚠️ Auto-optimization is disabled. Run **PromptBooster: Toggle Auto-Optimization** to enable.";
const PERMISSION_NOTICE: &str = "⚠️ Permission required to optimize prompts. Allow PromptBooster to optimize prompts when asked, or reset the decision in its state file.";
const NO_MODEL_NOTICE: &str = "⚠️ No language model available. Configure an OpenAI-compatible endpoint or start Ollama.";
const CANCELLED_NOTICE: &str = "⚠️ Optimization cancelled.";
const FALLBACK_NOTICE: &str = "⚠️ Optimization timed out or failed. Falling back to original prompt.\n\n";

/// How the optimization race ended
#[derive(Debug)]
enum RaceOutcome {
    Completed(Result<PromptResult, BoosterError>),
    DeadlineExceeded,
    Cancelled,
}

pub struct RealtimeModeStrategy {
    optimizer: PromptOptimizer,
    models: Arc<ModelProvider>,
    host: HostBindings,
    state: Arc<StateStore>,
    settings: BoosterSettings,
    deadline: Duration,
}

impl RealtimeModeStrategy {
    pub fn new(
        optimizer: PromptOptimizer,
        models: Arc<ModelProvider>,
        host: HostBindings,
        state: Arc<StateStore>,
        settings: BoosterSettings,
    ) -> Self {
        Self {
            optimizer,
            models,
            host,
            state,
            settings,
            deadline: REALTIME_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn race(&self, prompt: &str, options: &OptimizationOptions, ctx: &ModeExecutionContext) -> RaceOutcome {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => RaceOutcome::Cancelled,
            result = self.optimizer.optimize_structured(prompt, options) => RaceOutcome::Completed(result),
            _ = tokio::time::sleep(self.deadline) => RaceOutcome::DeadlineExceeded,
        }
    }

    fn render(&self, chat: &dyn ChatResponseStream, original: &str, result: &PromptResult) {
        let optimized = result.enhanced_prompt.as_str();

        if self.settings.show_preview {
            chat.markdown("**Optimized Prompt**\n\n");
            chat.markdown(&format!("> {}\n\n", optimized.replace('\n', "\n> ")));
        }

        let run_optimized = vec![optimized.to_string()];
        let refine = vec![original.to_string(), optimized.to_string()];
        match result.intent {
            Intent::Edit => {
                chat.button(ChatButton::new(
                    CommandId::RunPrompt,
                    "Apply Edits",
                    "Run this prompt to apply edits",
                    run_optimized,
                ));
                chat.button(ChatButton::new(
                    CommandId::CreatePromptFile,
                    "Refine in File",
                    "Open in editor for manual refinement",
                    refine,
                ));
            }
            Intent::Ask => {
                chat.button(ChatButton::new(
                    CommandId::RunPrompt,
                    "Ask Copilot",
                    "Send enhanced prompt to the chat",
                    run_optimized,
                ));
                chat.button(ChatButton::new(
                    CommandId::CreatePromptFile,
                    "Edit",
                    "Edit prompt before sending",
                    refine,
                ));
            }
        }

        chat.button(ChatButton::new(
            CommandId::RunPrompt,
            "Use Original",
            "Revert to original prompt",
            vec![original.to_string()],
        ));
    }
}

/// Prefix chat references to the prompt as context
pub fn build_prompt_with_context(prompt: &str, references: &[ChatReference]) -> String {
    if references.is_empty() {
        return prompt.to_string();
    }

    let context = references
        .iter()
        .map(ChatReference::describe)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n\nUser Request:\n{}", context, prompt)
}

#[async_trait]
impl ModeStrategy for RealtimeModeStrategy {
    fn mode(&self) -> OperationMode {
        OperationMode::Realtime
    }

    async fn execute(&self, ctx: ModeExecutionContext) -> ModeOutcome {
        let Some(chat) = ctx.chat.clone() else {
            tracing::error!("Missing chat response stream for realtime mode");
            return ModeOutcome::Skipped(SkipReason::MissingChatContext);
        };

        tracing::info!("Executing realtime mode strategy");

        if !self.settings.auto_optimize {
            tracing::info!("Auto-optimize disabled, passing through");
            chat.markdown(DISABLED_NOTICE);
            return ModeOutcome::Skipped(SkipReason::AutoOptimizeDisabled);
        }

        if !self.state.ensure_permission(self.host.ui.as_ref()).await {
            tracing::info!("Permission not granted");
            chat.markdown(PERMISSION_NOTICE);
            return ModeOutcome::Skipped(SkipReason::PermissionDenied);
        }

        if !ctx.has_prompt() {
            return ModeOutcome::Skipped(SkipReason::EmptyPrompt);
        }

        let Some(model) = self.models.get_model_automatically().await else {
            tracing::info!("No language model available");
            chat.markdown(NO_MODEL_NOTICE);
            return ModeOutcome::Skipped(SkipReason::NoModel);
        };
        tracing::info!("Using model: {}", model.name());

        let prompt = build_prompt_with_context(&ctx.prompt, &ctx.references);
        chat.progress("Optimizing your prompt...");

        let call_token = ctx.cancel.child_token();
        let options = OptimizationOptions::new(model, call_token.clone());
        let outcome = self.race(&prompt, &options, &ctx).await;
        call_token.cancel();

        if ctx.cancel.is_cancelled() {
            chat.markdown(CANCELLED_NOTICE);
            return ModeOutcome::Cancelled;
        }

        match outcome {
            RaceOutcome::Completed(Ok(result)) => {
                self.render(chat.as_ref(), &ctx.prompt, &result);
                ModeOutcome::Rendered {
                    intent: result.intent,
                }
            }
            RaceOutcome::Cancelled | RaceOutcome::Completed(Err(BoosterError::Cancelled)) => {
                chat.markdown(CANCELLED_NOTICE);
                ModeOutcome::Cancelled
            }
            RaceOutcome::Completed(Err(e)) => {
                tracing::error!("Optimization failed: {}", e);
                chat.markdown(FALLBACK_NOTICE);
                ModeOutcome::FellBack
            }
            RaceOutcome::DeadlineExceeded => {
                let err = BoosterError::TimedOut(self.deadline.as_millis() as u64);
                tracing::error!("Optimization failed: {}", err);
                chat.markdown(FALLBACK_NOTICE);
                ModeOutcome::FellBack
            }
        }
    }
}
