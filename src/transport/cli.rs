//! CLI command implementations
//!
//! The terminal plays every host role: messages go to stdout/stderr, pickers
//! and the permission question read a line from stdin, edits are applied to
//! files on disk, and the "chat" a prompt is handed to is stdout.

use crate::booster::{
    Booster, ModeExecutionContext, ModeOutcome, OperationMode, OptimizationOptions, Position,
    TextRange,
};
use crate::commands::{self, CommandId};
use crate::config::{Config, ConfigStore};
use crate::host::{
    ChatButton, ChatResponseStream, DocumentEditor, HostBindings, HostUi, PermissionAnswer,
    PickItem, ProgressReporter,
};
use crate::llm::{ConfiguredCatalog, ModelCatalog};
use crate::state::StateStore;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, Once, PoisonError};
use tokio_util::sync::CancellationToken;

/// Read one line from stdin, `None` on end of input
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input.trim().to_string()),
        }
    })
    .await
    .ok()
    .flatten()
}

fn prompt_line(text: &str) {
    print!("{}", text);
    let _ = io::stdout().flush();
}

/// `HostUi` over stdin/stdout
#[derive(Debug, Default)]
pub struct TerminalUi;

#[async_trait]
impl HostUi for TerminalUi {
    async fn show_info(&self, message: &str) {
        println!("{}", message);
    }

    async fn show_warning(&self, message: &str) {
        eprintln!("warning: {}", message);
    }

    async fn show_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    async fn pick(&self, title: &str, items: &[PickItem]) -> Option<usize> {
        println!("{}", title);
        for (i, item) in items.iter().enumerate() {
            match &item.detail {
                Some(detail) => println!("  {}) {} - {} ({})", i + 1, item.label, item.description, detail),
                None => println!("  {}) {} - {}", i + 1, item.label, item.description),
            }
        }
        prompt_line("Select [number, Enter to cancel]: ");

        let choice: usize = read_line().await?.parse().ok()?;
        (1..=items.len()).contains(&choice).then(|| choice - 1)
    }

    async fn input(&self, prompt: &str, default: &str) -> Option<String> {
        prompt_line(&format!("{} [{}]: ", prompt, default));
        let value = read_line().await?;
        if value.is_empty() {
            Some(default.to_string())
        } else {
            Some(value)
        }
    }

    async fn request_permission(&self, message: &str) -> PermissionAnswer {
        println!("{}\n", message);
        for (i, choice) in PermissionAnswer::CHOICES.iter().enumerate() {
            println!("  {}) {}", i + 1, choice);
        }
        prompt_line("Choice: ");

        let Some(answer) = read_line().await else {
            return PermissionAnswer::Dismissed;
        };
        match answer.parse::<usize>() {
            Ok(n) if (1..=PermissionAnswer::CHOICES.len()).contains(&n) => {
                PermissionAnswer::from_choice(PermissionAnswer::CHOICES[n - 1])
            }
            _ => PermissionAnswer::from_choice(&answer),
        }
    }

    async fn open_document(&self, path: &Path) -> Result<()> {
        println!("Created {}", path.display());
        Ok(())
    }

    async fn open_chat(&self, query: &str) -> bool {
        println!("{}", query);
        true
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        crate::clipboard::write_text(text).await
    }
}

/// Applies range edits to files on disk
///
/// Accepts `file://` URIs and plain paths. Positions count UTF-16 code units.
#[derive(Debug, Default)]
pub struct FileEditor;

impl FileEditor {
    pub fn splice(content: &str, range: TextRange, new_text: &str) -> Result<String> {
        let start = range.start.byte_offset(content)
            .ok_or_else(|| anyhow!("Range start {:?} is outside the document", range.start))?;
        let end = range.end.byte_offset(content)
            .ok_or_else(|| anyhow!("Range end {:?} is outside the document", range.end))?;
        if end < start {
            bail!("Range end precedes its start");
        }

        let mut result = String::with_capacity(content.len() + new_text.len());
        result.push_str(&content[..start]);
        result.push_str(new_text);
        result.push_str(&content[end..]);
        Ok(result)
    }
}

/// Text covered by `range`
pub fn range_text(content: &str, range: TextRange) -> Result<String> {
    let start = range.start.byte_offset(content).unwrap_or(content.len());
    let end = range.end.byte_offset(content).unwrap_or(content.len());
    if end < start {
        bail!("Range end precedes its start");
    }
    Ok(content[start..end].to_string())
}

pub fn uri_to_path(uri: &str) -> Result<PathBuf> {
    if uri.starts_with("file://") {
        let url = reqwest::Url::parse(uri).with_context(|| format!("Invalid URI: {}", uri))?;
        url.to_file_path()
            .map_err(|_| anyhow!("Not a local file URI: {}", uri))
    } else {
        Ok(PathBuf::from(uri))
    }
}

#[async_trait]
impl DocumentEditor for FileEditor {
    async fn replace(&self, uri: &str, range: TextRange, new_text: &str) -> Result<bool> {
        let path = uri_to_path(uri)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let updated = Self::splice(&content, range, new_text)?;
        tokio::fs::write(&path, updated)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(true)
    }
}

/// Progress lines on stderr
#[derive(Debug, Default)]
pub struct TerminalProgress;

#[async_trait]
impl ProgressReporter for TerminalProgress {
    async fn begin(&self, title: &str) {
        eprintln!("{}", title);
    }

    async fn report(&self, message: &str) {
        eprintln!("  {}", message);
    }

    async fn end(&self) {}
}

/// Chat response printed as it arrives; buttons are numbered
#[derive(Debug, Default)]
pub struct TerminalChat {
    buttons: Mutex<Vec<ChatButton>>,
}

impl TerminalChat {
    pub fn take_buttons(&self) -> Vec<ChatButton> {
        std::mem::take(&mut *self.buttons.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ChatResponseStream for TerminalChat {
    fn markdown(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    fn progress(&self, text: &str) {
        eprintln!("{}", text);
    }

    fn button(&self, button: ChatButton) {
        let mut buttons = self.buttons.lock().unwrap_or_else(PoisonError::into_inner);
        buttons.push(button);
        let button = &buttons[buttons.len() - 1];
        println!("  [{}] {} - {}", buttons.len(), button.title, button.tooltip);
    }
}

/// Token the Ctrl+C handler cancels; replaced for every request
static CURRENT_CANCEL: Lazy<Mutex<CancellationToken>> =
    Lazy::new(|| Mutex::new(CancellationToken::new()));
static CTRL_C_HANDLER: Once = Once::new();

/// Fresh token cancelled by the next Ctrl+C
fn cancel_on_ctrl_c() -> CancellationToken {
    CTRL_C_HANDLER.call_once(|| {
        if let Err(e) = ctrlc::set_handler(|| {
            eprintln!("\nCancelling...");
            CURRENT_CANCEL
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .cancel();
        }) {
            tracing::debug!("Ctrl+C handler not installed: {}", e);
        }
    });

    let token = CancellationToken::new();
    *CURRENT_CANCEL.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
    token
}

fn build_booster(workspace: Option<PathBuf>) -> Result<Booster> {
    let config = Arc::new(ConfigStore::open()?);
    let state = Arc::new(StateStore::open()?);
    let catalog: Arc<dyn ModelCatalog> = Arc::new(ConfiguredCatalog::new(config.snapshot().llm));
    let host = HostBindings::new(
        Arc::new(TerminalUi),
        Arc::new(FileEditor),
        Arc::new(TerminalProgress),
    )
    .with_workspace(workspace);
    Ok(Booster::new(config, state, catalog, host))
}

fn current_workspace(cwd: Option<&str>) -> Result<PathBuf> {
    let dir = match cwd {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    Ok(dir.canonicalize().unwrap_or(dir))
}

/// Parse `START:END` (1-based, inclusive) into a line range of `content`
pub fn parse_line_range(spec: &str, content: &str) -> Result<TextRange> {
    let (start, end) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected START:END, got '{}'", spec))?;
    let start: u32 = start.trim().parse().context("Invalid start line")?;
    let end: u32 = end.trim().parse().context("Invalid end line")?;
    if start == 0 || end < start {
        bail!("Line range must be 1-based with START <= END");
    }

    let lines: Vec<&str> = content.split('\n').collect();
    if end as usize > lines.len() {
        bail!("Line {} is past the end of the file ({} lines)", end, lines.len());
    }
    let last = lines[end as usize - 1];
    Ok(TextRange::new(
        Position::new(start - 1, 0),
        Position::new(end - 1, last.encode_utf16().count() as u32),
    ))
}

fn report_outcome(outcome: &ModeOutcome) -> Result<()> {
    match outcome {
        ModeOutcome::Applied {
            original_len,
            optimized_len,
        } => {
            tracing::debug!("Applied ({} -> {} chars)", original_len, optimized_len);
            Ok(())
        }
        ModeOutcome::Failed(message) => bail!("{}", message),
        other => {
            tracing::debug!("Finished: {:?}", other);
            Ok(())
        }
    }
}

/// Rewrite a prompt file (or some of its lines) in place
pub async fn run_boost(file: &str, lines: Option<&str>) -> Result<()> {
    let path = PathBuf::from(file)
        .canonicalize()
        .with_context(|| format!("File not found: {}", file))?;
    let content = tokio::fs::read_to_string(&path).await?;

    let range = match lines {
        Some(spec) => parse_line_range(spec, &content)?,
        None => TextRange::whole(&content),
    };
    let prompt = range_text(&content, range)?;

    let booster = build_booster(path.parent().map(Path::to_path_buf))?;
    let ctx = ModeExecutionContext::new(prompt)
        .with_document(path.to_string_lossy(), Some(range))
        .with_cancel(cancel_on_ctrl_c());

    let outcome = commands::boost(&booster, ctx).await;
    report_outcome(&outcome)
}

/// Optimize a prompt
///
/// With `json`, print the structured result without dispatching. Otherwise
/// run the configured mode: manual rewrites `--file`, realtime renders the
/// preview here, file stages a prompt file.
pub async fn run_optimize(prompt: Option<String>, file: Option<&str>, json: bool, cwd: Option<&str>) -> Result<()> {
    let workspace = current_workspace(cwd)?;
    let booster = build_booster(Some(workspace))?;
    let cancel = cancel_on_ctrl_c();

    let (prompt, document) = match (prompt, file) {
        (_, Some(file)) => {
            let path = PathBuf::from(file)
                .canonicalize()
                .with_context(|| format!("File not found: {}", file))?;
            let content = tokio::fs::read_to_string(&path).await?;
            (content, Some(path))
        }
        (Some(prompt), None) => (prompt, None),
        (None, None) => bail!("Provide a prompt or --file"),
    };

    if json {
        let model = booster
            .models()
            .get_model_automatically()
            .await
            .ok_or_else(|| anyhow!("No language model available"))?;
        booster.remember_model();
        let options = OptimizationOptions::new(model, cancel);
        let result = booster.optimizer().optimize_structured(&prompt, &options).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let mut ctx = ModeExecutionContext::new(prompt.clone()).with_cancel(cancel);
    if let Some(path) = &document {
        ctx = ctx.with_document(path.to_string_lossy(), Some(TextRange::whole(&prompt)));
    }

    let mode = booster.settings().operation_mode;
    if mode == OperationMode::Realtime {
        let chat = Arc::new(TerminalChat::default());
        let outcome = booster.run(ctx.with_chat(chat.clone())).await;
        println!();
        follow_up(&booster, &chat).await?;
        return report_outcome(&outcome);
    }

    let outcome = booster.run(ctx).await;
    report_outcome(&outcome)
}

/// Interactive realtime chat
pub async fn run_chat(initial_message: Option<String>, cwd: Option<&str>) -> Result<()> {
    let workspace = current_workspace(cwd)?;
    let booster = build_booster(Some(workspace))?;

    println!("prompt-booster chat (realtime mode)");
    println!("Type 'exit' or 'quit' to exit\n");

    let mut pending = initial_message;
    loop {
        let input = match pending.take() {
            Some(message) => {
                println!("> {}", message);
                message
            }
            None => {
                prompt_line("> ");
                match read_line().await {
                    Some(line) => line,
                    None => break,
                }
            }
        };

        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            println!("Goodbye!");
            break;
        }

        let chat = Arc::new(TerminalChat::default());
        let ctx = ModeExecutionContext::new(input)
            .with_chat(chat.clone())
            .with_cancel(cancel_on_ctrl_c());
        booster.run_mode(OperationMode::Realtime, ctx).await;
        println!();
        follow_up(&booster, &chat).await?;
    }

    Ok(())
}

/// Let the user press one of the rendered chat buttons
async fn follow_up(booster: &Booster, chat: &TerminalChat) -> Result<()> {
    let buttons = chat.take_buttons();
    if buttons.is_empty() {
        return Ok(());
    }

    prompt_line("Action [number, Enter to skip]: ");
    let Some(choice) = read_line().await.and_then(|c| c.parse::<usize>().ok()) else {
        return Ok(());
    };
    let Some(button) = choice.checked_sub(1).and_then(|i| buttons.get(i)) else {
        return Ok(());
    };

    run_button(booster, button).await
}

async fn run_button(booster: &Booster, button: &ChatButton) -> Result<()> {
    match (button.command, button.arguments.as_slice()) {
        (CommandId::RunPrompt, [prompt]) => commands::run_prompt(booster.host().ui.as_ref(), prompt).await,
        (CommandId::CreatePromptFile, [original, optimized]) => {
            commands::create_prompt_file(booster, original, optimized).await?;
            Ok(())
        }
        (command, _) => bail!("Unsupported chat action: {}", command),
    }
}

pub async fn run_switch_mode(mode: Option<&str>) -> Result<()> {
    let mode = mode
        .map(|raw| raw.parse::<OperationMode>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let booster = build_booster(None)?;
    commands::switch_mode(&booster, mode).await?;
    Ok(())
}

pub async fn run_switch_model(model: Option<String>) -> Result<()> {
    let booster = build_booster(None)?;
    commands::switch_model(&booster, model).await?;
    Ok(())
}

pub async fn run_toggle_auto_optimize() -> Result<()> {
    let booster = build_booster(None)?;
    commands::toggle_auto_optimize(&booster).await?;
    Ok(())
}

pub async fn run_process_file(file: &str) -> Result<()> {
    let booster = build_booster(None)?;
    commands::process_prompt_file(&booster, Path::new(file)).await?;
    Ok(())
}

pub async fn run_run_prompt(prompt: &str) -> Result<()> {
    commands::run_prompt(&TerminalUi, prompt).await
}

pub async fn run_create_prompt_file(original: &str, optimized: &str, cwd: Option<&str>) -> Result<()> {
    let booster = build_booster(Some(current_workspace(cwd)?))?;
    commands::create_prompt_file(&booster, original, optimized).await?;
    Ok(())
}

/// Print settings, persisted state, and available models
pub async fn run_status(json: bool) -> Result<()> {
    let config_path = Config::config_path()?;
    let config = ConfigStore::open_at(config_path.clone())?;
    let state = StateStore::open()?;
    let settings = config.settings();

    let catalog = ConfiguredCatalog::new(config.snapshot().llm);
    let models: Vec<_> = catalog
        .chat_models()
        .await
        .unwrap_or_default()
        .iter()
        .map(|m| m.info())
        .collect();

    if json {
        let status = serde_json::json!({
            "settings": settings,
            "state": state.snapshot(),
            "models": models,
            "config_path": config_path,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let mode = settings.operation_mode;
    println!("Mode:              {} {} ({})", mode.icon(), mode.label(), mode.description());
    println!("Auto-optimize:     {}", on_off(settings.auto_optimize));
    println!("Show preview:      {}", on_off(settings.show_preview));
    println!("Output directory:  {}", settings.file_output_directory);
    println!("File naming:       {:?}", settings.file_naming_pattern);
    println!("Model preference:  {}", settings.model_preference);
    println!(
        "Last used model:   {}",
        state.last_model_id().unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Permission:        {}",
        match state.permission() {
            Some(true) => "granted",
            Some(false) => "denied",
            None => "not asked",
        }
    );
    println!("Config file:       {}", config_path.display());
    println!();

    if models.is_empty() {
        println!("No language models available");
    } else {
        println!("Available models:");
        for model in models {
            println!("  {} ({})", model.id, model.vendor);
        }
    }
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_single_line() {
        let range = TextRange::new(Position::new(0, 6), Position::new(0, 11));
        assert_eq!(
            FileEditor::splice("write tests now", range, "docs").unwrap(),
            "write docs now"
        );
    }

    #[test]
    fn test_splice_whole_document() {
        let content = "line one\nline two\n";
        let range = TextRange::whole(content);
        assert_eq!(FileEditor::splice(content, range, "Y").unwrap(), "Y");
    }

    #[test]
    fn test_splice_after_astral_char() {
        let range = TextRange::new(Position::new(0, 3), Position::new(0, 6));
        assert_eq!(
            FileEditor::splice("😀 fix bug", range, "squash").unwrap(),
            "😀 squash bug"
        );
    }

    #[test]
    fn test_splice_rejects_out_of_range() {
        let range = TextRange::new(Position::new(5, 0), Position::new(6, 0));
        assert!(FileEditor::splice("short", range, "x").is_err());
    }

    #[test]
    fn test_parse_line_range() {
        let content = "a\nbb\nccc\n";
        let range = parse_line_range("2:3", content).unwrap();
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(2, 3));

        assert!(parse_line_range("0:1", content).is_err());
        assert!(parse_line_range("3:2", content).is_err());
        assert!(parse_line_range("1:9", content).is_err());
        assert!(parse_line_range("12", content).is_err());
    }

    #[test]
    fn test_range_text() {
        let content = "first\nsecond line\nthird";
        let range = TextRange::new(Position::new(1, 0), Position::new(1, 6));
        assert_eq!(range_text(content, range).unwrap(), "second");
        assert_eq!(range_text(content, TextRange::whole(content)).unwrap(), content);
    }

    #[test]
    fn test_uri_to_path() {
        assert_eq!(
            uri_to_path("file:///tmp/a.prompt.md").unwrap(),
            PathBuf::from("/tmp/a.prompt.md")
        );
        assert_eq!(uri_to_path("notes/a.md").unwrap(), PathBuf::from("notes/a.md"));
    }
}
