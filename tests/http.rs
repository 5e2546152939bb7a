//! Integration tests for the HTTP front-end

mod common;

use common::{Harness, RecordingUi, ScriptedModel};
use prompt_booster::booster::OperationMode;
use prompt_booster::config::BoosterSettings;
use prompt_booster::llm::ChatModel;
use prompt_booster::transport::http::{router, NOT_REALTIME_NOTICE};
use serde_json::{json, Value};
use std::sync::Arc;

/// Serve the router on an ephemeral port and return its base URL
async fn spawn(models: Vec<Arc<dyn ChatModel>>, settings: BoosterSettings) -> String {
    let h = Harness::new(models, settings, RecordingUi::new());
    let app = router(Arc::new(h.booster));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn realtime() -> BoosterSettings {
    BoosterSettings {
        operation_mode: OperationMode::Realtime,
        auto_optimize: true,
        ..BoosterSettings::default()
    }
}

#[tokio::test]
async fn test_health_reports_mode() {
    let base = spawn(vec![], realtime()).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "realtime");
}

#[tokio::test]
async fn test_optimize_returns_structured_result() {
    let model = ScriptedModel::new("gpt-4.1", r#"{"intent":"edit","enhancedPrompt":"X"}"#);
    let base = spawn(vec![model], BoosterSettings::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/optimize", base))
        .json(&json!({ "prompt": "speed it up" }))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "enhancedPrompt": "X", "intent": "edit" }));
}

#[tokio::test]
async fn test_optimize_without_models_is_unavailable() {
    let base = spawn(vec![], BoosterSettings::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/optimize", base))
        .json(&json!({ "prompt": "speed it up" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn test_chat_outside_realtime_returns_notice() {
    let model = ScriptedModel::new("gpt-4.1", r#"{"intent":"ask","enhancedPrompt":"Y"}"#);
    let base = spawn(vec![model.clone()], BoosterSettings::default()).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({ "prompt": "hello" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["outcome"], Value::Null);
    assert_eq!(body["parts"][0]["text"], NOT_REALTIME_NOTICE);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_chat_needs_permission_then_renders() {
    let model = ScriptedModel::new("gpt-4.1", r#"{"intent":"ask","enhancedPrompt":"Y"}"#);
    let base = spawn(vec![model.clone()], realtime()).await;
    let client = reqwest::Client::new();

    let denied: Value = client
        .post(format!("{}/chat", base))
        .json(&json!({ "prompt": "hello" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(denied["outcome"]["outcome"], "skipped");
    assert_eq!(denied["outcome"]["detail"], "permission_denied");

    let state: Value = client
        .post(format!("{}/permission", base))
        .json(&json!({ "granted": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state["permission_granted"], true);

    let rendered: Value = client
        .post(format!("{}/chat", base))
        .json(&json!({
            "prompt": "hello",
            "references": [{ "kind": "text", "value": "greeting" }],
            "metadata": { "source": "editor", "requestId": 7 }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(rendered["outcome"]["outcome"], "rendered");
    let buttons: Vec<&Value> = rendered["parts"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["kind"] == "button")
        .collect();
    assert_eq!(buttons.len(), 3);
    assert_eq!(buttons[0]["command"], "promptBooster.runPrompt");
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_mode_and_toggle_endpoints() {
    let base = spawn(vec![], BoosterSettings::default()).await;
    let client = reqwest::Client::new();

    let mode: Value = client
        .post(format!("{}/mode", base))
        .json(&json!({ "mode": "file" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mode["mode"], "file");

    let toggled: Value = client
        .post(format!("{}/auto-optimize/toggle", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["auto_optimize"], true);

    let status: Value = reqwest::get(format!("{}/status", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["settings"]["operation_mode"], "file");
    assert_eq!(status["settings"]["auto_optimize"], true);
}
