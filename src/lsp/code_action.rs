//! LSP code action handler

use super::document::DocumentStore;
use crate::booster::staging::is_prompt_file;
use crate::commands::CommandId;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::*;

/// Arguments of the boost command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostArgs {
    pub uri: Url,
    /// Whole document when absent
    #[serde(default)]
    pub range: Option<Range>,
}

/// Offer "Boost prompt" on a non-empty selection, and "Process prompt file"
/// inside staged prompt files
pub fn handle_code_action(documents: &DocumentStore, params: CodeActionParams) -> Option<CodeActionResponse> {
    let uri = params.text_document.uri;
    let range = params.range;
    let doc = documents.get(&uri)?;

    let mut actions = Vec::new();

    let selected = doc.get_range(&range).unwrap_or_default();
    if !selected.trim().is_empty() {
        let args = BoostArgs {
            uri: uri.clone(),
            range: Some(range),
        };
        actions.push(command_action(
            "Boost prompt",
            CodeActionKind::REFACTOR_REWRITE,
            CommandId::Boost,
            vec![serde_json::to_value(args).ok()?],
        ));
    }

    let is_staged = uri
        .to_file_path()
        .map(|path| is_prompt_file(&path))
        .unwrap_or(false);
    if is_staged {
        actions.push(command_action(
            "Process prompt file",
            CodeActionKind::SOURCE,
            CommandId::ProcessFile,
            vec![serde_json::Value::String(uri.to_string())],
        ));
    }

    if actions.is_empty() {
        None
    } else {
        Some(actions)
    }
}

fn command_action(
    title: &str,
    kind: CodeActionKind,
    command: CommandId,
    arguments: Vec<serde_json::Value>,
) -> CodeActionOrCommand {
    CodeActionOrCommand::CodeAction(CodeAction {
        title: title.to_string(),
        kind: Some(kind),
        diagnostics: None,
        edit: None,
        command: Some(Command {
            title: command.title().to_string(),
            command: command.as_str().to_string(),
            arguments: Some(arguments),
        }),
        is_preferred: None,
        disabled: None,
        data: None,
    })
}
