//! Data passed through one optimization call chain

use crate::host::ChatResponseStream;
use crate::llm::ChatModel;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What the user wants from the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Questions, explanations, general help
    #[default]
    Ask,
    /// Write or modify code
    Edit,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Ask => "ask",
            Intent::Edit => "edit",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Models are sloppy with casing; anything that is not "edit" is a question.
impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            Some(intent) if intent.trim().eq_ignore_ascii_case("edit") => Intent::Edit,
            _ => Intent::Ask,
        })
    }
}

/// Output of the optimization call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResult {
    #[serde(rename = "enhancedPrompt")]
    pub enhanced_prompt: String,
    #[serde(default)]
    pub intent: Intent,
}

impl PromptResult {
    pub fn new(enhanced_prompt: impl Into<String>, intent: Intent) -> Self {
        Self {
            enhanced_prompt: enhanced_prompt.into(),
            intent,
        }
    }
}

/// Per-call inputs for the optimizer
#[derive(Clone)]
pub struct OptimizationOptions {
    pub model: Arc<dyn ChatModel>,
    pub cancel: CancellationToken,
}

impl OptimizationOptions {
    pub fn new(model: Arc<dyn ChatModel>, cancel: CancellationToken) -> Self {
        Self { model, cancel }
    }
}

/// Zero-based line/character position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Byte offset of this position in `text`
    ///
    /// Characters are UTF-16 code units, as LSP clients send them. A column
    /// past the end of its line clamps to the line end; a line past the end
    /// of `text` yields `None`.
    pub fn byte_offset(&self, text: &str) -> Option<usize> {
        let mut offset = 0;
        for (i, line) in text.split('\n').enumerate() {
            if i == self.line as usize {
                return Some(offset + utf16_column(line, self.character));
            }
            offset += line.len() + 1;
        }
        None
    }
}

fn utf16_column(line: &str, character: u32) -> usize {
    let mut units = 0usize;
    for (idx, ch) in line.char_indices() {
        if units >= character as usize {
            return idx;
        }
        units += ch.len_utf16();
    }
    line.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range covering all of `text`
    pub fn whole(text: &str) -> Self {
        let mut line = 0u32;
        let mut character = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                line += 1;
                character = 0;
            } else {
                character += ch.len_utf16() as u32;
            }
        }
        Self::new(Position::new(0, 0), Position::new(line, character))
    }

    /// Text covered by the range
    ///
    /// An end past the last line clamps to the end of `text`. `None` when the
    /// start lies outside `text`.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = self.start.byte_offset(text)?;
        let end = self.end.byte_offset(text).unwrap_or(text.len()).max(start);
        Some(&text[start..end])
    }
}

/// Extra context attached to a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChatReference {
    File { path: PathBuf },
    Location { path: PathBuf, line: u32 },
    Text { value: String },
}

impl ChatReference {
    pub fn describe(&self) -> String {
        match self {
            ChatReference::File { path } => format!("File: {}", path.display()),
            ChatReference::Location { path, line } => {
                format!("Location: {}:{}", path.display(), line)
            }
            ChatReference::Text { value } => format!("Context: {}", value),
        }
    }
}

/// Input bundle handed to a mode strategy
#[derive(Clone)]
pub struct ModeExecutionContext {
    pub prompt: String,
    pub document_uri: Option<String>,
    pub range: Option<TextRange>,
    pub references: Vec<ChatReference>,
    /// Chat surface the realtime strategy renders into
    pub chat: Option<Arc<dyn ChatResponseStream>>,
    pub cancel: CancellationToken,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ModeExecutionContext {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            document_uri: None,
            range: None,
            references: Vec::new(),
            chat: None,
            cancel: CancellationToken::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_document(mut self, uri: impl Into<String>, range: Option<TextRange>) -> Self {
        self.document_uri = Some(uri.into());
        self.range = range;
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatResponseStream>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_references(mut self, references: Vec<ChatReference>) -> Self {
        self.references = references;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }
}

/// Why a strategy stopped without doing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyPrompt,
    NoModel,
    NoWorkspace,
    NoFileName,
    AutoOptimizeDisabled,
    PermissionDenied,
    MissingChatContext,
}

/// How a strategy run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ModeOutcome {
    /// Manual: the range was replaced
    Applied { original_len: usize, optimized_len: usize },
    /// Realtime: the preview and actions were rendered
    Rendered { intent: Intent },
    /// File: the staged file was written
    Staged(PathBuf),
    /// Realtime: timed out or failed, a fallback notice was rendered
    FellBack,
    Skipped(SkipReason),
    Cancelled,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset_counts_utf16_units() {
        let text = "😀 ab\ncé";
        assert_eq!(Position::new(0, 0).byte_offset(text), Some(0));
        assert_eq!(Position::new(0, 2).byte_offset(text), Some(4));
        assert_eq!(Position::new(0, 3).byte_offset(text), Some(5));
        assert_eq!(Position::new(0, 40).byte_offset(text), Some(7));
        assert_eq!(Position::new(1, 2).byte_offset(text), Some(text.len()));
        assert_eq!(Position::new(2, 0).byte_offset(text), None);
    }

    #[test]
    fn test_slice_whole_text_with_trailing_newline() {
        let text = "make a login form\n";
        assert_eq!(TextRange::whole(text).slice(text), Some(text));

        let past_end = TextRange::new(Position::new(0, 5), Position::new(9, 0));
        assert_eq!(past_end.slice(text), Some("a login form\n"));
        assert_eq!(
            TextRange::new(Position::new(4, 0), Position::new(5, 0)).slice(text),
            None
        );
    }

    #[test]
    fn test_prompt_result_wire_names() {
        let result: PromptResult =
            serde_json::from_str(r#"{"intent":"edit","enhancedPrompt":"X"}"#).unwrap();
        assert_eq!(result, PromptResult::new("X", Intent::Edit));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["enhancedPrompt"], "X");
        assert_eq!(json["intent"], "edit");
    }

    #[test]
    fn test_intent_is_lenient() {
        let result: PromptResult =
            serde_json::from_str(r#"{"intent":"EDIT","enhancedPrompt":"X"}"#).unwrap();
        assert_eq!(result.intent, Intent::Edit);

        let result: PromptResult =
            serde_json::from_str(r#"{"intent":"explain","enhancedPrompt":"X"}"#).unwrap();
        assert_eq!(result.intent, Intent::Ask);

        let result: PromptResult = serde_json::from_str(r#"{"enhancedPrompt":"X"}"#).unwrap();
        assert_eq!(result.intent, Intent::Ask);
    }

    #[test]
    fn test_non_string_intent_keeps_prompt() {
        for body in [
            r#"{"intent":null,"enhancedPrompt":"X"}"#,
            r#"{"intent":3,"enhancedPrompt":"X"}"#,
            r#"{"intent":["edit"],"enhancedPrompt":"X"}"#,
        ] {
            let result: PromptResult = serde_json::from_str(body).unwrap();
            assert_eq!(result, PromptResult::new("X", Intent::Ask));
        }
    }

    #[test]
    fn test_whole_range() {
        let range = TextRange::whole("ab\ncde");
        assert_eq!(range.start, Position::new(0, 0));
        assert_eq!(range.end, Position::new(1, 3));

        let range = TextRange::whole("line\n");
        assert_eq!(range.end, Position::new(1, 0));
    }

    #[test]
    fn test_reference_descriptions() {
        let file = ChatReference::File {
            path: PathBuf::from("src/main.rs"),
        };
        assert_eq!(file.describe(), "File: src/main.rs");

        let loc = ChatReference::Location {
            path: PathBuf::from("src/lib.rs"),
            line: 12,
        };
        assert_eq!(loc.describe(), "Location: src/lib.rs:12");

        let text = ChatReference::Text {
            value: "uses axum".to_string(),
        };
        assert_eq!(text.describe(), "Context: uses axum");
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(ModeOutcome::Rendered {
            intent: Intent::Edit,
        })
        .unwrap();
        assert_eq!(json["outcome"], "rendered");
        assert_eq!(json["detail"]["intent"], "edit");

        let json = serde_json::to_value(ModeOutcome::Skipped(SkipReason::NoModel)).unwrap();
        assert_eq!(json["detail"], "no_model");
    }

    #[test]
    fn test_context_prompt_check() {
        assert!(!ModeExecutionContext::new("   ").has_prompt());
        assert!(ModeExecutionContext::new("fix it").has_prompt());
    }
}
