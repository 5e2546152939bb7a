//! Main LSP server implementation

use super::code_action::{self, BoostArgs};
use super::document::{from_lsp_range, DocumentStore};
use super::ui::{LspEditor, LspProgress, LspUi};
use crate::booster::{Booster, ModeExecutionContext, OperationMode};
use crate::commands::{self, CommandId};
use crate::config::ConfigStore;
use crate::host::HostBindings;
use crate::llm::ModelCatalog;
use crate::state::StateStore;
use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower_lsp::jsonrpc::{Error as JsonRpcError, Result as JsonRpcResult};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

/// Stores and catalog the booster is built from once the workspace is known
#[derive(Clone)]
pub struct BoosterParts {
    pub config: Arc<ConfigStore>,
    pub state: Arc<StateStore>,
    pub catalog: Arc<dyn ModelCatalog>,
}

/// The LSP backend
pub struct PromptBoosterLsp {
    client: Client,
    documents: Arc<DocumentStore>,
    parts: BoosterParts,
    booster: OnceCell<Arc<Booster>>,
}

impl PromptBoosterLsp {
    pub fn new(client: Client, parts: BoosterParts) -> Self {
        Self {
            client,
            documents: Arc::new(DocumentStore::new()),
            parts,
            booster: OnceCell::new(),
        }
    }

    fn booster(&self, workspace: Option<PathBuf>) -> &Arc<Booster> {
        self.booster.get_or_init(|| {
            let host = HostBindings::new(
                Arc::new(LspUi::new(self.client.clone())),
                Arc::new(LspEditor::new(self.client.clone())),
                Arc::new(LspProgress::new(self.client.clone())),
            )
            .with_workspace(workspace);
            Arc::new(Booster::new(
                self.parts.config.clone(),
                self.parts.state.clone(),
                self.parts.catalog.clone(),
                host,
            ))
        })
    }

    async fn run_command(&self, id: CommandId, args: Vec<Value>) -> Result<Value> {
        let booster = self.booster(None).clone();

        match id {
            CommandId::Boost => {
                let args: BoostArgs = serde_json::from_value(first_arg(&args)?.clone())
                    .context("Expected {uri, range} argument")?;
                let doc = self
                    .documents
                    .get_or_load(&args.uri)
                    .await
                    .ok_or_else(|| anyhow!("No document to boost: {}", args.uri))?;
                let range = args.range.unwrap_or_else(|| doc.full_range());
                let prompt = doc.get_range(&range).unwrap_or_default();

                let ctx = ModeExecutionContext::new(prompt)
                    .with_document(args.uri.to_string(), Some(from_lsp_range(range)));
                let outcome = commands::boost(&booster, ctx).await;
                Ok(serde_json::to_value(outcome)?)
            }
            CommandId::SwitchMode => {
                let mode = match args.first().and_then(Value::as_str) {
                    Some(raw) => Some(raw.parse::<OperationMode>().map_err(|e| anyhow!(e))?),
                    None => None,
                };
                let mode = commands::switch_mode(&booster, mode).await?;
                Ok(serde_json::to_value(mode)?)
            }
            CommandId::SwitchModel => {
                let model = args.first().and_then(Value::as_str).map(str::to_string);
                let model = commands::switch_model(&booster, model).await?;
                Ok(serde_json::to_value(model)?)
            }
            CommandId::ToggleAutoOptimize => {
                let enabled = commands::toggle_auto_optimize(&booster).await?;
                Ok(Value::Bool(enabled))
            }
            CommandId::ProcessFile => {
                let raw = first_arg(&args)?
                    .as_str()
                    .ok_or_else(|| anyhow!("Expected a document URI"))?;
                let uri = Url::parse(raw).with_context(|| format!("Invalid URI: {}", raw))?;
                let path = uri
                    .to_file_path()
                    .map_err(|_| anyhow!("Not a file URI: {}", uri))?;
                let doc = self
                    .documents
                    .get_or_load(&uri)
                    .await
                    .ok_or_else(|| anyhow!("No prompt file open"))?;
                let sent = commands::process_prompt_content(&booster, &path, &doc.content).await?;
                Ok(Value::Bool(sent))
            }
            CommandId::RunPrompt => {
                let prompt = string_arg(&args, 0)?;
                commands::run_prompt(booster.host().ui.as_ref(), &prompt).await?;
                Ok(Value::Null)
            }
            CommandId::CreatePromptFile => {
                let original = string_arg(&args, 0)?;
                let optimized = string_arg(&args, 1)?;
                let path = commands::create_prompt_file(&booster, &original, &optimized).await?;
                Ok(serde_json::to_value(path)?)
            }
        }
    }
}

fn first_arg(args: &[Value]) -> Result<&Value> {
    args.first().ok_or_else(|| anyhow!("Missing command argument"))
}

fn string_arg(args: &[Value], index: usize) -> Result<String> {
    args.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Expected a string argument at position {}", index))
}

/// Workspace root from the initialize request
#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .and_then(|folder| folder.uri.to_file_path().ok())
        .or_else(|| params.root_uri.as_ref().and_then(|uri| uri.to_file_path().ok()))
}

#[tower_lsp::async_trait]
impl LanguageServer for PromptBoosterLsp {
    async fn initialize(&self, params: InitializeParams) -> JsonRpcResult<InitializeResult> {
        let workspace = workspace_root(&params);
        tracing::info!("Workspace root: {:?}", workspace);
        self.booster(workspace);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: CommandId::ALL.iter().map(|c| c.as_str().to_string()).collect(),
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "prompt-booster".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("LSP server initialized");
        let mode = self.parts.config.settings().operation_mode;
        self.client
            .log_message(
                MessageType::INFO,
                format!("prompt-booster ready ({} {} mode)", mode.icon(), mode.label()),
            )
            .await;
    }

    async fn shutdown(&self) -> JsonRpcResult<()> {
        tracing::info!("LSP server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.documents.open(params);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.documents.change(params);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.close(params);
    }

    async fn code_action(
        &self,
        params: CodeActionParams,
    ) -> JsonRpcResult<Option<CodeActionResponse>> {
        Ok(code_action::handle_code_action(&self.documents, params))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> JsonRpcResult<Option<Value>> {
        let Some(id) = CommandId::from_wire(&params.command) else {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown command: {}",
                params.command
            )));
        };

        tracing::debug!("executeCommand {}", id);
        match self.run_command(id, params.arguments).await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::error!("{} failed: {:#}", id, e);
                self.client
                    .show_message(MessageType::ERROR, format!("{} failed: {:#}", id.title(), e))
                    .await;
                Err(JsonRpcError::invalid_params(e.to_string()))
            }
        }
    }
}

/// Run the LSP server on stdio
pub async fn run_lsp_server(parts: BoosterParts) -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| PromptBoosterLsp::new(client, parts));

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
