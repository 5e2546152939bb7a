//! HTTP server standing in for the chat participant
//!
//! There is no one to answer pickers or prompts on this side, so the UI is
//! headless: messages are logged, pickers and inputs return nothing, and the
//! first-use permission is granted through `POST /permission`.

use super::cli::FileEditor;
use crate::booster::{
    matches_preference, Booster, ChatReference, ModeExecutionContext, ModeOutcome,
    OperationMode, OptimizationOptions, PromptResult,
};
use crate::commands;
use crate::config::BoosterSettings;
use crate::host::{
    ChatPart, HostBindings, HostUi, LogProgress, PermissionAnswer, PickItem, RecordedChat,
};
use crate::llm::{ChatModel, ModelInfo};
use crate::lsp::BoosterParts;
use crate::state::SessionState;
use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

pub const NOT_REALTIME_NOTICE: &str =
    "ℹ️ PromptBooster is not in realtime mode with auto-optimization enabled.";

/// `HostUi` with nobody on the other end
#[derive(Debug, Default)]
pub struct HeadlessUi;

#[async_trait]
impl HostUi for HeadlessUi {
    async fn show_info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    async fn show_warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    async fn show_error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    async fn pick(&self, title: &str, _items: &[PickItem]) -> Option<usize> {
        tracing::debug!("No picker available for '{}'", title);
        None
    }

    async fn input(&self, prompt: &str, _default: &str) -> Option<String> {
        tracing::debug!("No input available for '{}'", prompt);
        None
    }

    async fn request_permission(&self, _message: &str) -> PermissionAnswer {
        tracing::info!("Permission not granted yet; POST /permission to answer");
        PermissionAnswer::Dismissed
    }

    async fn open_document(&self, path: &Path) -> Result<()> {
        tracing::info!("Created {}", path.display());
        Ok(())
    }

    async fn open_chat(&self, _query: &str) -> bool {
        false
    }

    async fn write_clipboard(&self, _text: &str) -> Result<()> {
        bail!("No clipboard on a headless server")
    }
}

/// Shared application state
struct AppState {
    booster: Arc<Booster>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    mode: OperationMode,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    settings: BoosterSettings,
    state: SessionState,
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OptimizeRequest {
    prompt: String,
    /// Model id or preference fragment; automatic selection when absent
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    prompt: String,
    #[serde(default)]
    references: Vec<ChatReference>,
    /// Caller-defined extras handed to the strategy untouched
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    /// `None` when the request was not handed to the realtime strategy
    outcome: Option<ModeOutcome>,
    parts: Vec<ChatPart>,
}

#[derive(Debug, Deserialize)]
struct PermissionRequest {
    /// `None` clears the decision so the next request asks again
    granted: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: OperationMode,
}

/// Run the HTTP server
pub async fn run_http_server(host: &str, port: u16, parts: BoosterParts, working_dir: PathBuf) -> Result<()> {
    let working_dir = working_dir.canonicalize().unwrap_or(working_dir);
    tracing::info!("Server working directory: {:?}", working_dir);

    let host_bindings = HostBindings::new(
        Arc::new(HeadlessUi),
        Arc::new(FileEditor),
        Arc::new(LogProgress),
    )
    .with_workspace(Some(working_dir));
    let booster = Booster::new(parts.config, parts.state, parts.catalog, host_bindings);

    let app = router(Arc::new(booster));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes over an already-built booster
pub fn router(booster: Arc<Booster>) -> Router {
    let state = Arc::new(AppState { booster });

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/optimize", post(handle_optimize))
        .route("/chat", post(handle_chat))
        .route("/permission", post(set_permission))
        .route("/mode", post(set_mode))
        .route("/auto-optimize/toggle", post(toggle_auto_optimize))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: state.booster.settings().operation_mode,
    })
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let models = state
        .booster
        .models()
        .available()
        .await
        .iter()
        .map(|m| m.info())
        .collect();

    Json(StatusResponse {
        settings: state.booster.settings(),
        state: state.booster.state().snapshot(),
        models,
    })
}

async fn resolve_model(booster: &Booster, requested: Option<&str>) -> Option<Arc<dyn ChatModel>> {
    match requested {
        Some(wanted) => booster
            .models()
            .available()
            .await
            .into_iter()
            .find(|m| m.id() == wanted || matches_preference(m.id(), wanted)),
        None => {
            let model = booster.models().get_model_automatically().await;
            booster.remember_model();
            model
        }
    }
}

async fn handle_optimize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeRequest>,
) -> axum::response::Response {
    if req.prompt.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No text to optimize");
    }

    let Some(model) = resolve_model(&state.booster, req.model.as_deref()).await else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "No language model available");
    };
    tracing::debug!("Optimizing with {}", model.id());

    let options = OptimizationOptions::new(model, CancellationToken::new());
    match state
        .booster
        .optimizer()
        .optimize_structured(&req.prompt, &options)
        .await
    {
        Ok(result) => Json::<PromptResult>(result).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Json<ChatResponse> {
    if state.booster.settings().operation_mode != OperationMode::Realtime {
        return Json(ChatResponse {
            outcome: None,
            parts: vec![ChatPart::Markdown {
                text: NOT_REALTIME_NOTICE.to_string(),
            }],
        });
    }

    let chat = Arc::new(RecordedChat::new());
    let ctx = ModeExecutionContext::new(req.prompt)
        .with_references(req.references)
        .with_metadata(req.metadata)
        .with_chat(chat.clone());
    let outcome = state.booster.run_mode(OperationMode::Realtime, ctx).await;

    Json(ChatResponse {
        outcome: Some(outcome),
        parts: chat.parts(),
    })
}

async fn set_permission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PermissionRequest>,
) -> axum::response::Response {
    match state.booster.state().set_permission(req.granted) {
        Ok(()) => Json(state.booster.state().snapshot()).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)),
    }
}

async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModeRequest>,
) -> axum::response::Response {
    match commands::switch_mode(&state.booster, Some(req.mode)).await {
        Ok(mode) => Json(serde_json::json!({ "mode": mode })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)),
    }
}

async fn toggle_auto_optimize(State(state): State<Arc<AppState>>) -> axum::response::Response {
    match commands::toggle_auto_optimize(&state.booster).await {
        Ok(enabled) => Json(serde_json::json!({ "auto_optimize": enabled })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)),
    }
}
