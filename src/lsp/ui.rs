//! Host capabilities over an LSP client connection

use super::document::to_lsp_range;
use crate::booster::TextRange;
use crate::host::{DocumentEditor, HostUi, PermissionAnswer, PickItem, ProgressReporter};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;

/// Messages, pickers and document opening through `window/*` requests
pub struct LspUi {
    client: Client,
}

impl LspUi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn ask(&self, typ: MessageType, message: &str, choices: &[&str]) -> Option<String> {
        let actions = choices
            .iter()
            .map(|title| MessageActionItem {
                title: title.to_string(),
                properties: HashMap::new(),
            })
            .collect();

        match self
            .client
            .show_message_request(typ, message.to_string(), Some(actions))
            .await
        {
            Ok(answer) => answer.map(|item| item.title),
            Err(e) => {
                tracing::warn!("showMessageRequest failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl HostUi for LspUi {
    async fn show_info(&self, message: &str) {
        self.client.show_message(MessageType::INFO, message).await;
    }

    async fn show_warning(&self, message: &str) {
        self.client.show_message(MessageType::WARNING, message).await;
    }

    async fn show_error(&self, message: &str) {
        self.client.show_message(MessageType::ERROR, message).await;
    }

    async fn pick(&self, title: &str, items: &[PickItem]) -> Option<usize> {
        let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
        let chosen = self.ask(MessageType::INFO, title, &labels).await?;
        labels.iter().position(|label| *label == chosen)
    }

    async fn input(&self, _prompt: &str, _default: &str) -> Option<String> {
        self.show_warning(
            "Free-form input is not available over LSP; set file_naming_pattern to \"prompt\" or \"timestamp\"",
        )
        .await;
        None
    }

    async fn request_permission(&self, message: &str) -> PermissionAnswer {
        match self
            .ask(MessageType::INFO, message, &PermissionAnswer::CHOICES)
            .await
        {
            Some(choice) => PermissionAnswer::from_choice(&choice),
            None => PermissionAnswer::Dismissed,
        }
    }

    async fn open_document(&self, path: &Path) -> Result<()> {
        let uri = Url::from_file_path(path)
            .map_err(|_| anyhow!("Not an absolute path: {}", path.display()))?;
        let result = self
            .client
            .show_document(ShowDocumentParams {
                uri,
                external: Some(false),
                take_focus: Some(true),
                selection: None,
            })
            .await
            .context("window/showDocument failed")?;
        if !result {
            tracing::debug!("Client declined to show {}", path.display());
        }
        Ok(())
    }

    async fn open_chat(&self, _query: &str) -> bool {
        false
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        crate::clipboard::write_text(text).await
    }
}

/// Applies edits through `workspace/applyEdit`
pub struct LspEditor {
    client: Client,
}

impl LspEditor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentEditor for LspEditor {
    async fn replace(&self, uri: &str, range: TextRange, new_text: &str) -> Result<bool> {
        let uri = Url::parse(uri).with_context(|| format!("Invalid document URI: {}", uri))?;
        let mut changes = HashMap::new();
        changes.insert(
            uri,
            vec![TextEdit {
                range: to_lsp_range(range),
                new_text: new_text.to_string(),
            }],
        );

        let response = self
            .client
            .apply_edit(WorkspaceEdit {
                changes: Some(changes),
                document_changes: None,
                change_annotations: None,
            })
            .await
            .context("workspace/applyEdit failed")?;

        if let Some(reason) = &response.failure_reason {
            tracing::warn!("Edit rejected: {}", reason);
        }
        Ok(response.applied)
    }
}

/// Progress shown as `window/logMessage` entries
pub struct LspProgress {
    client: Client,
}

impl LspProgress {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProgressReporter for LspProgress {
    async fn begin(&self, title: &str) {
        self.client.log_message(MessageType::INFO, title).await;
    }

    async fn report(&self, message: &str) {
        self.client.log_message(MessageType::LOG, message).await;
    }

    async fn end(&self) {}
}
