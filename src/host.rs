//! Host capabilities
//!
//! The booster never talks to an editor directly. Each binding (LSP server,
//! terminal, HTTP endpoint) implements these traits and hands them in as a
//! [`HostBindings`] bundle.

use crate::booster::{BoosterError, TextRange};
use crate::commands::CommandId;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// One entry in a quick-pick list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickItem {
    pub label: String,
    pub description: String,
    pub detail: Option<String>,
}

impl PickItem {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Answer to the first-use permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAnswer {
    Allow,
    /// Ask again next time
    NotNow,
    Never,
    /// The request was closed without an answer
    Dismissed,
}

impl PermissionAnswer {
    pub const CHOICES: [&'static str; 3] = ["Allow", "Not Now", "Never"];

    pub fn from_choice(choice: &str) -> Self {
        match choice {
            "Allow" => Self::Allow,
            "Not Now" => Self::NotNow,
            "Never" => Self::Never,
            _ => Self::Dismissed,
        }
    }
}

/// Follow-up action rendered under a chat response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatButton {
    pub command: CommandId,
    pub title: String,
    pub tooltip: String,
    pub arguments: Vec<String>,
}

impl ChatButton {
    pub fn new(command: CommandId, title: &str, tooltip: &str, arguments: Vec<String>) -> Self {
        Self {
            command,
            title: title.to_string(),
            tooltip: tooltip.to_string(),
            arguments,
        }
    }
}

/// User-facing surface of the host
#[async_trait]
pub trait HostUi: Send + Sync {
    async fn show_info(&self, message: &str);
    async fn show_warning(&self, message: &str);
    async fn show_error(&self, message: &str);

    /// Let the user pick one item, returning its index
    async fn pick(&self, title: &str, items: &[PickItem]) -> Option<usize>;

    /// Ask for a free-form value, `None` when dismissed
    async fn input(&self, prompt: &str, default: &str) -> Option<String>;

    async fn request_permission(&self, message: &str) -> PermissionAnswer;

    async fn open_document(&self, path: &Path) -> anyhow::Result<()>;

    /// Hand a prompt to the host chat, `false` when there is none
    async fn open_chat(&self, query: &str) -> bool;

    async fn write_clipboard(&self, text: &str) -> anyhow::Result<()>;
}

/// Applies text edits to open documents
#[async_trait]
pub trait DocumentEditor: Send + Sync {
    /// Replace `range` in `uri` with `new_text`, `Ok(false)` when the host
    /// refused the edit
    async fn replace(&self, uri: &str, range: TextRange, new_text: &str) -> anyhow::Result<bool>;
}

/// Chat response the realtime strategy renders into
pub trait ChatResponseStream: Send + Sync {
    fn markdown(&self, text: &str);
    fn progress(&self, text: &str);
    fn button(&self, button: ChatButton);
}

/// One rendered piece of a chat response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChatPart {
    Markdown { text: String },
    Progress { text: String },
    Button(ChatButton),
}

/// Chat response that keeps every part in order
#[derive(Debug, Default)]
pub struct RecordedChat {
    parts: Mutex<Vec<ChatPart>>,
}

impl RecordedChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> Vec<ChatPart> {
        self.lock().clone()
    }

    pub fn markdown_text(&self) -> String {
        self.lock()
            .iter()
            .filter_map(|part| match part {
                ChatPart::Markdown { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn buttons(&self) -> Vec<ChatButton> {
        self.lock()
            .iter()
            .filter_map(|part| match part {
                ChatPart::Button(button) => Some(button.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ChatPart>> {
        self.parts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChatResponseStream for RecordedChat {
    fn markdown(&self, text: &str) {
        self.lock().push(ChatPart::Markdown {
            text: text.to_string(),
        });
    }

    fn progress(&self, text: &str) {
        self.lock().push(ChatPart::Progress {
            text: text.to_string(),
        });
    }

    fn button(&self, button: ChatButton) {
        self.lock().push(ChatPart::Button(button));
    }
}

/// Long-running task indicator
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn begin(&self, title: &str);
    async fn report(&self, message: &str);
    async fn end(&self);
}

/// Progress reporter that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

#[async_trait]
impl ProgressReporter for LogProgress {
    async fn begin(&self, title: &str) {
        tracing::info!("{}", title);
    }

    async fn report(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    async fn end(&self) {}
}

/// Everything a binding provides to the booster
#[derive(Clone)]
pub struct HostBindings {
    pub ui: Arc<dyn HostUi>,
    pub editor: Arc<dyn DocumentEditor>,
    pub progress: Arc<dyn ProgressReporter>,
    /// Root folder staged prompt files are written under
    pub workspace: Option<PathBuf>,
}

impl HostBindings {
    pub fn new(
        ui: Arc<dyn HostUi>,
        editor: Arc<dyn DocumentEditor>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            ui,
            editor,
            progress,
            workspace: None,
        }
    }

    pub fn with_workspace(mut self, workspace: Option<PathBuf>) -> Self {
        self.workspace = workspace;
        self
    }
}

/// Run `task` inside a cancellable progress indicator
///
/// The task receives a child of `cancel`; the indicator is closed whichever
/// way the task ends.
pub async fn with_progress<T, F, Fut>(
    reporter: &dyn ProgressReporter,
    title: &str,
    message: &str,
    cancel: &CancellationToken,
    task: F,
) -> Result<T, BoosterError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, BoosterError>>,
{
    let token = cancel.child_token();
    reporter.begin(title).await;
    reporter.report(message).await;

    let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(BoosterError::Cancelled),
        result = task(token.clone()) => result,
    };

    token.cancel();
    reporter.end().await;
    result
}
