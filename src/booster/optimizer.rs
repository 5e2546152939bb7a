//! Prompt optimization call
//!
//! Sends the fixed instruction plus the user's raw prompt to a chat model and
//! turns the streamed reply into a [`PromptResult`]. A reply that is not
//! valid JSON degrades to the raw text with an `ask` intent.

use super::error::BoosterError;
use super::types::{Intent, OptimizationOptions, PromptResult};
use crate::llm::Message;
use futures::StreamExt;

const SYSTEM_PROMPT: &str = r#"You are a prompt expert. Your task is to rewrite the user's raw prompt and determine their intent.

Return a JSON object with this exact structure:
{
  "intent": "ask" | "edit",
  "enhancedPrompt": "..."
}

Rules for Intent:
- "edit": Use this if the user wants to write code, modify files, fix bugs, or generate new files.
- "ask": Use this for questions, explanations, concepts, or general help that doesn't strictly require code modification.

Rules for Enhanced Prompt:
Follow this structure string for the "enhancedPrompt" value:
**Task**
[Clear objective]

**Context**
[Technical context]

**Requirements**
[Bullet points]

**Output**
[Expected output format]

IMPORTANT:
- Output valid JSON only.
- Do NOT use markdown code blocks (```).
- Escape newlines in the JSON string properly."#;

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptOptimizer;

impl PromptOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// The fixed instruction sent ahead of every prompt
    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// Optimize and return only the enhanced text
    pub async fn optimize(
        &self,
        prompt: &str,
        options: &OptimizationOptions,
    ) -> Result<String, BoosterError> {
        let result = self.optimize_structured(prompt, options).await?;
        Ok(result.enhanced_prompt)
    }

    /// Optimize and return the enhanced text with its intent
    pub async fn optimize_structured(
        &self,
        prompt: &str,
        options: &OptimizationOptions,
    ) -> Result<PromptResult, BoosterError> {
        tracing::info!("Starting structured prompt optimization...");
        tracing::debug!("Original prompt length: {} characters", prompt.len());

        let response = match self.collect_response(prompt, options).await {
            Ok(text) => text,
            Err(BoosterError::Cancelled) => {
                tracing::info!("Optimization cancelled");
                return Err(BoosterError::Cancelled);
            }
            Err(e) => {
                tracing::error!("Optimization error: {}", e);
                return Err(e);
            }
        };

        let cleaned = strip_code_fence(&response);
        tracing::debug!("Model response length: {} characters", cleaned.len());

        match parse_result(cleaned) {
            Some(result) => {
                tracing::info!("Optimization completed. Intent: {}", result.intent);
                Ok(result)
            }
            None => {
                tracing::warn!("Failed to parse JSON response. Falling back to text.");
                Ok(PromptResult::new(cleaned, Intent::Ask))
            }
        }
    }

    async fn collect_response(
        &self,
        prompt: &str,
        options: &OptimizationOptions,
    ) -> Result<String, BoosterError> {
        let cancel = &options.cancel;
        if cancel.is_cancelled() {
            return Err(BoosterError::Cancelled);
        }

        let messages = [Message::user(SYSTEM_PROMPT), Message::user(prompt)];
        let mut stream = options
            .model
            .send_request(&messages, cancel.clone())
            .await?;

        let mut response = String::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BoosterError::Cancelled),
                next = stream.next() => match next {
                    Some(Ok(chunk)) => response.push_str(&chunk),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
            }
        }
        Ok(response)
    }
}

/// Trim and remove a surrounding markdown code fence, if any
///
/// The opening fence line (including a language tag such as `json`) and a
/// closing fence are dropped. Text without a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse a cleaned model reply, `None` when it is not a prompt result
pub fn parse_result(text: &str) -> Option<PromptResult> {
    serde_json::from_str::<PromptResult>(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let fenced = "```json\n{\"intent\":\"edit\",\"enhancedPrompt\":\"X\"}\n```";
        assert_eq!(
            strip_code_fence(fenced),
            "{\"intent\":\"edit\",\"enhancedPrompt\":\"X\"}"
        );
    }

    #[test]
    fn test_strip_bare_fence_and_whitespace() {
        assert_eq!(strip_code_fence("  ```\nbody\n```  \n"), "body");
        assert_eq!(strip_code_fence("```json {\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let once = strip_code_fence("```json\n{\"a\":1}\n```");
        assert_eq!(strip_code_fence(once), once);
        assert_eq!(strip_code_fence("Hello"), "Hello");
    }

    #[test]
    fn test_parse_result() {
        let result = parse_result(r#"{"intent":"edit","enhancedPrompt":"X"}"#).unwrap();
        assert_eq!(result, PromptResult::new("X", Intent::Edit));

        assert!(parse_result("Hello").is_none());
        assert!(parse_result(r#"{"intent":"edit"}"#).is_none());
        assert!(parse_result(r#""just a string""#).is_none());
    }

    #[test]
    fn test_system_prompt_describes_shape() {
        let prompt = PromptOptimizer::new().system_prompt();
        assert!(prompt.contains("\"enhancedPrompt\""));
        assert!(prompt.contains("\"intent\": \"ask\" | \"edit\""));
        assert!(prompt.contains("**Requirements**"));
    }
}
