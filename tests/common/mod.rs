//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use prompt_booster::booster::{Booster, TextRange};
use prompt_booster::config::{BoosterSettings, Config, ConfigStore};
use prompt_booster::host::{
    DocumentEditor, HostBindings, HostUi, LogProgress, PermissionAnswer, PickItem,
};
use prompt_booster::llm::{ChatModel, LlmError, Message, StaticCatalog, TextStream};
use prompt_booster::state::{SessionState, StateStore};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Model that replies with fixed chunks and counts its calls
pub struct ScriptedModel {
    id: String,
    chunks: Vec<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(id: &str, response: &str) -> Arc<Self> {
        Self::chunked(id, &[response])
    }

    pub fn chunked(id: &str, chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn vendor(&self) -> &str {
        "test"
    }

    async fn send_request(
        &self,
        messages: &[Message],
        _cancel: CancellationToken,
    ) -> Result<TextStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(messages.to_vec());
        let chunks: Vec<Result<String, LlmError>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// Model whose response never arrives
pub struct PendingModel {
    calls: AtomicUsize,
}

impl PendingModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for PendingModel {
    fn id(&self) -> &str {
        "pending"
    }

    fn vendor(&self) -> &str {
        "test"
    }

    async fn send_request(
        &self,
        _messages: &[Message],
        _cancel: CancellationToken,
    ) -> Result<TextStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(stream::pending().boxed())
    }
}

/// Model whose stream breaks after one chunk
pub struct BrokenModel;

#[async_trait]
impl ChatModel for BrokenModel {
    fn id(&self) -> &str {
        "broken"
    }

    fn vendor(&self) -> &str {
        "test"
    }

    async fn send_request(
        &self,
        _messages: &[Message],
        _cancel: CancellationToken,
    ) -> Result<TextStream, LlmError> {
        let chunks = vec![
            Ok("{\"intent\":".to_string()),
            Err(LlmError::Network("connection reset".to_string())),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

/// UI that records messages and answers from a script
#[derive(Default)]
pub struct RecordingUi {
    pub infos: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub picks: Mutex<Vec<(String, Vec<PickItem>)>>,
    pub opened: Mutex<Vec<PathBuf>>,
    pub chats: Mutex<Vec<String>>,
    pub clipboard: Mutex<Vec<String>>,
    pub permission_requests: AtomicUsize,
    pick_answer: Option<usize>,
    input_answer: Option<String>,
    permission_answer: Option<PermissionAnswer>,
    has_chat: bool,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn picking(mut self, index: usize) -> Self {
        self.pick_answer = Some(index);
        self
    }

    pub fn answering_input(mut self, value: &str) -> Self {
        self.input_answer = Some(value.to_string());
        self
    }

    pub fn answering_permission(mut self, answer: PermissionAnswer) -> Self {
        self.permission_answer = Some(answer);
        self
    }

    pub fn with_chat(mut self) -> Self {
        self.has_chat = true;
        self
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostUi for RecordingUi {
    async fn show_info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    async fn show_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    async fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    async fn pick(&self, title: &str, items: &[PickItem]) -> Option<usize> {
        self.picks
            .lock()
            .unwrap()
            .push((title.to_string(), items.to_vec()));
        self.pick_answer.filter(|i| *i < items.len())
    }

    async fn input(&self, _prompt: &str, _default: &str) -> Option<String> {
        self.input_answer.clone()
    }

    async fn request_permission(&self, _message: &str) -> PermissionAnswer {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        self.permission_answer.unwrap_or(PermissionAnswer::Dismissed)
    }

    async fn open_document(&self, path: &Path) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn open_chat(&self, query: &str) -> bool {
        if self.has_chat {
            self.chats.lock().unwrap().push(query.to_string());
        }
        self.has_chat
    }

    async fn write_clipboard(&self, text: &str) -> anyhow::Result<()> {
        self.clipboard.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Editor that records replacements instead of applying them
#[derive(Default)]
pub struct RecordingEditor {
    pub edits: Mutex<Vec<(String, TextRange, String)>>,
}

impl RecordingEditor {
    pub fn edits(&self) -> Vec<(String, TextRange, String)> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentEditor for RecordingEditor {
    async fn replace(&self, uri: &str, range: TextRange, new_text: &str) -> anyhow::Result<bool> {
        self.edits
            .lock()
            .unwrap()
            .push((uri.to_string(), range, new_text.to_string()));
        Ok(true)
    }
}

/// Everything a test needs to drive a booster and inspect the host side
pub struct Harness {
    pub booster: Booster,
    pub ui: Arc<RecordingUi>,
    pub editor: Arc<RecordingEditor>,
}

impl Harness {
    pub fn new(models: Vec<Arc<dyn ChatModel>>, settings: BoosterSettings, ui: RecordingUi) -> Self {
        Self::with_state(models, settings, ui, SessionState::default(), None)
    }

    pub fn with_state(
        models: Vec<Arc<dyn ChatModel>>,
        settings: BoosterSettings,
        ui: RecordingUi,
        state: SessionState,
        workspace: Option<PathBuf>,
    ) -> Self {
        let ui = Arc::new(ui);
        let editor = Arc::new(RecordingEditor::default());
        let config = Config {
            booster: settings,
            ..Config::default()
        };
        let host = HostBindings::new(ui.clone(), editor.clone(), Arc::new(LogProgress))
            .with_workspace(workspace);
        let booster = Booster::new(
            Arc::new(ConfigStore::in_memory(config)),
            Arc::new(StateStore::in_memory(state)),
            Arc::new(StaticCatalog::new(models)),
            host,
        );
        Self { booster, ui, editor }
    }
}

/// Counts `WARN` events
#[derive(Clone, Default)]
pub struct WarningCounter {
    count: Arc<AtomicUsize>,
}

impl WarningCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Install a warning counter for the current thread
pub fn count_warnings() -> (WarningCounter, tracing::subscriber::DefaultGuard) {
    let counter = WarningCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (counter, guard)
}
