//! Command surface
//!
//! Every binding exposes the same commands: the LSP server through
//! `workspace/executeCommand`, the CLI as subcommands, and chat buttons by
//! wire id. The handlers here are binding-agnostic.

use crate::booster::staging::{is_prompt_file, strip_html_comments};
use crate::booster::{Booster, ModeExecutionContext, ModeOutcome, OperationMode};
use crate::host::{HostUi, PickItem};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandId {
    #[serde(rename = "promptBooster.boost")]
    Boost,
    #[serde(rename = "promptBooster.switchMode")]
    SwitchMode,
    #[serde(rename = "promptBooster.switchModel")]
    SwitchModel,
    #[serde(rename = "promptBooster.toggleAutoOptimization")]
    ToggleAutoOptimize,
    #[serde(rename = "promptBooster.processPromptFile")]
    ProcessFile,
    #[serde(rename = "promptBooster.runPrompt")]
    RunPrompt,
    #[serde(rename = "promptBooster.createPromptFile")]
    CreatePromptFile,
}

impl CommandId {
    pub const ALL: [CommandId; 7] = [
        Self::Boost,
        Self::SwitchMode,
        Self::SwitchModel,
        Self::ToggleAutoOptimize,
        Self::ProcessFile,
        Self::RunPrompt,
        Self::CreatePromptFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boost => "promptBooster.boost",
            Self::SwitchMode => "promptBooster.switchMode",
            Self::SwitchModel => "promptBooster.switchModel",
            Self::ToggleAutoOptimize => "promptBooster.toggleAutoOptimization",
            Self::ProcessFile => "promptBooster.processPromptFile",
            Self::RunPrompt => "promptBooster.runPrompt",
            Self::CreatePromptFile => "promptBooster.createPromptFile",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Boost => "PromptBooster: Boost This Prompt",
            Self::SwitchMode => "PromptBooster: Switch Mode",
            Self::SwitchModel => "PromptBooster: Switch Model",
            Self::ToggleAutoOptimize => "PromptBooster: Toggle Auto-Optimization",
            Self::ProcessFile => "PromptBooster: Process Prompt File",
            Self::RunPrompt => "PromptBooster: Run Prompt",
            Self::CreatePromptFile => "PromptBooster: Create Prompt File",
        }
    }

    pub fn from_wire(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == id)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model preferences offered by the switch-model picker
pub const MODEL_PRESETS: [(&str, &str, &str); 3] = [
    ("GPT-4.1", "gpt-4.1", "Standard GPT-4 model"),
    ("GPT-4o", "gpt-4o", "Optimized GPT-4 model"),
    ("Claude Haiku 4.5", "claude-haiku-4.5", "Fast and efficient model"),
];

/// Boost always runs the manual strategy, whatever the configured mode
pub async fn boost(booster: &Booster, ctx: ModeExecutionContext) -> ModeOutcome {
    tracing::info!("Command: boost");
    booster.run_mode(OperationMode::Manual, ctx).await
}

/// Set the operation mode, asking for it when `mode` is `None`
pub async fn switch_mode(booster: &Booster, mode: Option<OperationMode>) -> Result<Option<OperationMode>> {
    tracing::info!("Command: switch mode");
    let ui = booster.host().ui.as_ref();

    let mode = match mode {
        Some(mode) => mode,
        None => {
            let current = booster.settings().operation_mode;
            let items: Vec<PickItem> = OperationMode::ALL
                .iter()
                .map(|m| {
                    let item = PickItem::new(format!("{} {} Mode", m.icon(), m.label()), m.description());
                    if *m == current {
                        item.with_detail("Current")
                    } else {
                        item
                    }
                })
                .collect();
            match ui.pick("Select operation mode", &items).await {
                Some(index) => OperationMode::ALL[index],
                None => return Ok(None),
            }
        }
    };

    booster.config().set_operation_mode(mode)?;
    ui.show_info(&format!("PromptBooster switched to {} {} Mode", mode.icon(), mode.label()))
        .await;
    Ok(Some(mode))
}

/// Set the model preference, asking for it when `model` is `None`
///
/// The remembered last-used model is dropped so the new preference applies
/// to the next automatic selection.
pub async fn switch_model(booster: &Booster, model: Option<String>) -> Result<Option<String>> {
    tracing::info!("Command: switch model");
    let ui = booster.host().ui.as_ref();

    let (label, value) = match model {
        Some(id) => (id.clone(), id),
        None => {
            let current = booster.settings().model_preference;
            let items: Vec<PickItem> = MODEL_PRESETS
                .iter()
                .map(|(label, value, description)| {
                    let item = PickItem::new(*label, *description);
                    if *value == current {
                        item.with_detail("Current")
                    } else {
                        item
                    }
                })
                .collect();
            match ui.pick("Select AI Model Preference", &items).await {
                Some(index) => {
                    let (label, value, _) = MODEL_PRESETS[index];
                    (label.to_string(), value.to_string())
                }
                None => return Ok(None),
            }
        }
    };

    booster.config().set_model_preference(&value)?;
    booster.models().set_preference(&value);
    booster.models().reset_last_used();
    booster.remember_model();
    ui.show_info(&format!("PromptBooster model switched to {}", label))
        .await;
    Ok(Some(value))
}

pub async fn toggle_auto_optimize(booster: &Booster) -> Result<bool> {
    tracing::info!("Command: toggle auto-optimization");
    let enabled = booster.config().toggle_auto_optimize()?;
    let message = if enabled {
        "PromptBooster auto-optimization enabled"
    } else {
        "PromptBooster auto-optimization disabled"
    };
    booster.host().ui.show_info(message).await;
    Ok(enabled)
}

/// Send the body of a staged prompt file on disk to the chat
pub async fn process_prompt_file(booster: &Booster, path: &Path) -> Result<bool> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    process_prompt_content(booster, path, &content).await
}

/// Send the body of a staged prompt file to the chat
///
/// Returns `false` when nothing was sent (wrong file type or an empty body).
pub async fn process_prompt_content(booster: &Booster, path: &Path, content: &str) -> Result<bool> {
    tracing::info!("Processing prompt file: {}", path.display());
    let ui = booster.host().ui.as_ref();

    if !is_prompt_file(path) {
        ui.show_warning("This command only works with .prompt.md files")
            .await;
        return Ok(false);
    }

    let body = strip_html_comments(content);
    if body.is_empty() {
        ui.show_warning("Prompt file is empty after removing comments")
            .await;
        return Ok(false);
    }

    if !ui.open_chat(&body).await {
        ui.show_info("Prompt ready! Copying to clipboard...").await;
        ui.write_clipboard(&body).await?;
    }
    Ok(true)
}

/// Copy a prompt to the clipboard and hand it to the chat
pub async fn run_prompt(ui: &dyn HostUi, prompt: &str) -> Result<()> {
    tracing::info!("Command: run prompt");

    if let Err(e) = ui.write_clipboard(prompt).await {
        tracing::warn!("Clipboard unavailable: {:#}", e);
    }

    if !ui.open_chat(prompt).await {
        ui.show_info("Prompt copied to clipboard. Paste it in the chat.")
            .await;
    }
    Ok(())
}

/// Stage an original and an already optimized prompt without a model call
pub async fn create_prompt_file(booster: &Booster, original: &str, optimized: &str) -> Result<Option<PathBuf>> {
    tracing::info!("Command: create prompt file");
    let ui = booster.host().ui.as_ref();

    let path = match booster.stager().stage(original, optimized).await {
        Ok(Some(path)) => path,
        Ok(None) => return Ok(None),
        Err(e) => {
            tracing::error!("createPromptFile failed: {}", e);
            ui.show_error(&format!("Failed to create prompt file: {}", e))
                .await;
            return Err(e.into());
        }
    };

    if let Err(e) = ui.open_document(&path).await {
        tracing::error!("Failed to open generated file: {:#}", e);
    }
    ui.show_info("Prompt file created successfully").await;
    Ok(Some(path))
}
