//! Integration tests for the optimization call
//!
//! Cover the structured result, fence tolerance, the raw-text fallback, and
//! cancellation against scripted models.

mod common;

use common::{count_warnings, BrokenModel, PendingModel, ScriptedModel};
use prompt_booster::booster::{
    BoosterError, Intent, OptimizationOptions, PromptOptimizer, PromptResult,
};
use prompt_booster::llm::Role;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn options(model: Arc<dyn prompt_booster::llm::ChatModel>) -> OptimizationOptions {
    OptimizationOptions::new(model, CancellationToken::new())
}

#[tokio::test]
async fn test_well_formed_json_is_returned_as_is() {
    let model = ScriptedModel::new("gpt-4.1", r#"{"intent":"edit","enhancedPrompt":"X"}"#);
    let result = PromptOptimizer::new()
        .optimize_structured("make it faster", &options(model.clone()))
        .await
        .unwrap();

    assert_eq!(result, PromptResult::new("X", Intent::Edit));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_sends_instruction_then_prompt_as_user_messages() {
    let model = ScriptedModel::new("gpt-4.1", r#"{"intent":"ask","enhancedPrompt":"Y"}"#);
    let optimizer = PromptOptimizer::new();
    optimizer
        .optimize_structured("explain lifetimes", &options(model.clone()))
        .await
        .unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0];
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.role == Role::User));
    assert_eq!(messages[0].content, optimizer.system_prompt());
    assert_eq!(messages[1].content, "explain lifetimes");
}

#[tokio::test]
async fn test_chunks_are_joined_in_delivery_order() {
    let model = ScriptedModel::chunked(
        "gpt-4.1",
        &[r#"{"intent":"#, r#""ask","enhanced"#, r#"Prompt":"Step one"}"#],
    );
    let result = PromptOptimizer::new()
        .optimize_structured("steps", &options(model))
        .await
        .unwrap();

    assert_eq!(result.enhanced_prompt, "Step one");
    assert_eq!(result.intent, Intent::Ask);
}

#[tokio::test]
async fn test_fenced_json_parses_like_plain_json() {
    let plain = r#"{"intent":"edit","enhancedPrompt":"**Task**\nAdd a cache"}"#;
    let fenced = format!("```json\n{}\n```", plain);

    let optimizer = PromptOptimizer::new();
    let from_plain = optimizer
        .optimize_structured("cache", &options(ScriptedModel::new("m", plain)))
        .await
        .unwrap();
    let from_fenced = optimizer
        .optimize_structured("cache", &options(ScriptedModel::new("m", &fenced)))
        .await
        .unwrap();

    assert_eq!(from_plain, from_fenced);
    assert_eq!(from_fenced.enhanced_prompt, "**Task**\nAdd a cache");
}

#[tokio::test]
async fn test_plain_text_falls_back_with_one_warning() {
    let (warnings, _guard) = count_warnings();

    let result = PromptOptimizer::new()
        .optimize_structured("hi", &options(ScriptedModel::new("m", "  Hello \n")))
        .await
        .unwrap();

    assert_eq!(result, PromptResult::new("Hello", Intent::Ask));
    assert_eq!(warnings.count(), 1);
}

#[tokio::test]
async fn test_valid_json_logs_no_warning() {
    let (warnings, _guard) = count_warnings();

    PromptOptimizer::new()
        .optimize_structured(
            "hi",
            &options(ScriptedModel::new("m", r#"{"intent":"ask","enhancedPrompt":"Hi"}"#)),
        )
        .await
        .unwrap();

    assert_eq!(warnings.count(), 0);
}

#[tokio::test]
async fn test_unknown_intent_reads_as_ask() {
    let model = ScriptedModel::new("m", r#"{"intent":"refactor","enhancedPrompt":"Z"}"#);
    let result = PromptOptimizer::new()
        .optimize_structured("z", &options(model))
        .await
        .unwrap();

    assert_eq!(result.intent, Intent::Ask);
}

#[tokio::test]
async fn test_null_intent_keeps_enhanced_prompt() {
    let (warnings, _guard) = count_warnings();
    let model = ScriptedModel::new("m", r#"{"intent":null,"enhancedPrompt":"Z"}"#);

    let result = PromptOptimizer::new()
        .optimize_structured("z", &options(model))
        .await
        .unwrap();

    assert_eq!(result, PromptResult::new("Z", Intent::Ask));
    assert_eq!(warnings.count(), 0);
}

#[tokio::test]
async fn test_optimize_returns_text_only() {
    let model = ScriptedModel::new("m", r#"{"intent":"edit","enhancedPrompt":"Rewritten"}"#);
    let text = PromptOptimizer::new()
        .optimize("rough", &options(model))
        .await
        .unwrap();

    assert_eq!(text, "Rewritten");
}

#[tokio::test]
async fn test_cancelled_before_start_skips_the_model() {
    let model = ScriptedModel::new("m", "ignored");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = PromptOptimizer::new()
        .optimize_structured("x", &OptimizationOptions::new(model.clone(), cancel))
        .await;

    assert!(matches!(result, Err(BoosterError::Cancelled)));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_stream_is_reported_distinctly() {
    let model = PendingModel::new();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = PromptOptimizer::new()
        .optimize_structured("x", &OptimizationOptions::new(model, cancel))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.to_string(), "Optimization cancelled by user");
}

#[tokio::test]
async fn test_broken_stream_is_a_single_failure() {
    let err = PromptOptimizer::new()
        .optimize_structured("x", &options(Arc::new(BrokenModel)))
        .await
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert!(err.to_string().starts_with("Failed to optimize prompt:"));
    assert!(err.to_string().contains("connection reset"));
}

proptest! {
    #[test]
    fn prop_edit_json_round_trips_any_text(text in "[ -~\\n]{0,80}") {
        let json = serde_json::json!({ "intent": "edit", "enhancedPrompt": text }).to_string();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = rt
            .block_on(PromptOptimizer::new().optimize_structured("p", &options(ScriptedModel::new("m", &json))))
            .unwrap();

        prop_assert_eq!(result.intent, Intent::Edit);
        prop_assert_eq!(result.enhanced_prompt, text);
    }
}
