//! Staged `.prompt.md` files
//!
//! A staged file carries the original prompt in an HTML comment header, the
//! optimized prompt as its body, and usage instructions in a comment footer.
//! Processing the file strips the comments again, leaving only the body.

use super::error::BoosterError;
use crate::host::HostUi;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const PROMPT_FILE_SUFFIX: &str = ".prompt.md";

const SLUG_MAX_CHARS: usize = 50;

static HTML_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static CUSTOM_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

/// How staged files are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNamingPattern {
    /// `chat-<ISO timestamp>.prompt.md`
    Timestamp,
    /// Slug of the prompt's first line
    #[default]
    Prompt,
    /// Ask the user for a name
    Custom,
    /// Unrecognised setting value, `prompt-<unix millis>.prompt.md`
    #[serde(other)]
    Other,
}

/// Lowercase, hyphenated name from the first line of `text`
///
/// Only ASCII letters, digits, `_` and `-` survive. Returns `prompt` when
/// nothing is left.
pub fn slugify(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let head: String = first_line.chars().take(SLUG_MAX_CHARS).collect();
    let kept: String = head
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let slug = kept.split_whitespace().collect::<Vec<_>>().join("-");

    if slug.is_empty() {
        "prompt".to_string()
    } else {
        slug
    }
}

pub fn timestamp_file_name(now: DateTime<Utc>) -> String {
    format!("chat-{}{}", now.format("%Y-%m-%dT%H-%M-%S-%3fZ"), PROMPT_FILE_SUFFIX)
}

pub fn fallback_file_name(now: DateTime<Utc>) -> String {
    format!("prompt-{}{}", now.timestamp_millis(), PROMPT_FILE_SUFFIX)
}

/// Validate a user-supplied base name and append the suffix
pub fn custom_file_name(name: &str) -> Result<String, BoosterError> {
    let name = name.trim();
    if !CUSTOM_NAME.is_match(name) {
        return Err(BoosterError::InvalidFileName(name.to_string()));
    }
    Ok(format!("{}{}", name, PROMPT_FILE_SUFFIX))
}

/// First free `<base>.prompt.md`, `<base>-2.prompt.md`, ... in `dir`
pub async fn resolve_collision(dir: &Path, base: &str) -> Result<String, BoosterError> {
    let mut counter = 1;
    let mut file_name = format!("{}{}", base, PROMPT_FILE_SUFFIX);
    while tokio::fs::try_exists(dir.join(&file_name)).await? {
        counter += 1;
        file_name = format!("{}-{}{}", base, counter, PROMPT_FILE_SUFFIX);
    }
    Ok(file_name)
}

pub fn build_file_content(original: &str, optimized: &str, now: DateTime<Utc>) -> String {
    format!(
        "<!--\n\
Original Prompt:\n\
{original}\n\
\n\
Generated: {generated}\n\
Mode: File Generation\n\
-->\n\
\n\
{optimized}\n\
\n\
<!--\n\
Instructions:\n\
1. Edit this prompt as needed\n\
2. Run \"PromptBooster: Process Prompt File\" (promptBooster.processPromptFile)\n\
3. The prompt will be sent to the chat, or copied to the clipboard\n\
-->\n",
        original = original,
        generated = now.to_rfc3339_opts(SecondsFormat::Millis, true),
        optimized = optimized,
    )
}

/// Remove every HTML comment and trim
pub fn strip_html_comments(content: &str) -> String {
    HTML_COMMENT.replace_all(content, "").trim().to_string()
}

pub fn is_prompt_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(PROMPT_FILE_SUFFIX))
}

/// Writes staged prompt files under `<workspace>/<output_dir>`
pub struct PromptStager {
    workspace: Option<PathBuf>,
    output_dir: String,
    pattern: FileNamingPattern,
    ui: Arc<dyn HostUi>,
}

impl PromptStager {
    pub fn new(
        workspace: Option<PathBuf>,
        output_dir: impl Into<String>,
        pattern: FileNamingPattern,
        ui: Arc<dyn HostUi>,
    ) -> Self {
        Self {
            workspace,
            output_dir: output_dir.into(),
            pattern,
            ui,
        }
    }

    pub fn output_path(&self) -> Result<PathBuf, BoosterError> {
        let workspace = self.workspace.as_ref().ok_or(BoosterError::NoWorkspace)?;
        Ok(workspace.join(&self.output_dir))
    }

    /// Write a staged file, `Ok(None)` when the user dismissed the name prompt
    pub async fn stage(&self, original: &str, optimized: &str) -> Result<Option<PathBuf>, BoosterError> {
        let dir = self.output_path()?;
        tokio::fs::create_dir_all(&dir).await?;

        let now = Utc::now();
        let file_name = match self.file_name(&dir, original, now).await? {
            Some(name) => name,
            None => return Ok(None),
        };

        let path = dir.join(file_name);
        tokio::fs::write(&path, build_file_content(original, optimized, now)).await?;
        tracing::info!("Generated prompt file at {}", path.display());
        Ok(Some(path))
    }

    async fn file_name(
        &self,
        dir: &Path,
        original: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, BoosterError> {
        match self.pattern {
            FileNamingPattern::Timestamp => Ok(Some(timestamp_file_name(now))),
            FileNamingPattern::Prompt => resolve_collision(dir, &slugify(original)).await.map(Some),
            FileNamingPattern::Custom => {
                match self
                    .ui
                    .input("Enter a name for this prompt file", "my-prompt")
                    .await
                {
                    Some(name) if !name.trim().is_empty() => custom_file_name(&name).map(Some),
                    _ => Ok(None),
                }
            }
            FileNamingPattern::Other => Ok(Some(fallback_file_name(now))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap() + chrono::Duration::milliseconds(89)
    }

    #[test]
    fn test_slugify_first_line() {
        assert_eq!(slugify("Create a login form\nwith validation"), "create-a-login-form");
        assert_eq!(slugify("  Fix: the   BUG (#42)!  "), "fix-the-bug-42");
        assert_eq!(slugify("snake_case and-dash"), "snake_case-and-dash");
    }

    #[test]
    fn test_slugify_truncates_before_cleaning() {
        let long = "a".repeat(60);
        assert_eq!(slugify(&long).len(), 50);

        let padded = format!("{}!!!!!!!!!!", "b".repeat(45));
        assert_eq!(slugify(&padded), "b".repeat(45));
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "prompt");
        assert_eq!(slugify("!!! ???"), "prompt");
        assert_eq!(slugify("héllo wörld"), "hllo-wrld");
    }

    #[test]
    fn test_timestamp_name() {
        assert_eq!(
            timestamp_file_name(fixed_time()),
            "chat-2025-03-04T05-06-07-089Z.prompt.md"
        );
    }

    #[test]
    fn test_fallback_name() {
        let name = fallback_file_name(fixed_time());
        assert_eq!(name, format!("prompt-{}.prompt.md", fixed_time().timestamp_millis()));
    }

    #[test]
    fn test_custom_name_validation() {
        assert_eq!(custom_file_name("my-prompt_2").unwrap(), "my-prompt_2.prompt.md");
        assert!(matches!(
            custom_file_name("../escape"),
            Err(BoosterError::InvalidFileName(_))
        ));
        assert!(custom_file_name("has space").is_err());
    }

    #[tokio::test]
    async fn test_resolve_collision_counts_from_two() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "draft").await.unwrap(),
            "draft.prompt.md"
        );

        std::fs::write(dir.path().join("draft.prompt.md"), "").unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "draft").await.unwrap(),
            "draft-2.prompt.md"
        );

        std::fs::write(dir.path().join("draft-2.prompt.md"), "").unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "draft").await.unwrap(),
            "draft-3.prompt.md"
        );
    }

    #[test]
    fn test_file_content_layout() {
        let content = build_file_content("raw ask", "**Task**\nDo it", fixed_time());
        assert!(content.starts_with("<!--\nOriginal Prompt:\nraw ask\n"));
        assert!(content.contains("Generated: 2025-03-04T05:06:07.089Z"));
        assert!(content.contains("-->\n\n**Task**\nDo it\n\n<!--\nInstructions:"));
        assert_eq!(strip_html_comments(&content), "**Task**\nDo it");
    }

    #[test]
    fn test_strip_html_comments() {
        assert_eq!(strip_html_comments("<!-- a -->\nkeep\n<!--\nb\n-->"), "keep");
        assert_eq!(strip_html_comments("<!-- only -->"), "");
        assert_eq!(strip_html_comments("no comments"), "no comments");
    }

    #[test]
    fn test_is_prompt_file() {
        assert!(is_prompt_file(Path::new("/w/.github/prompts/x.prompt.md")));
        assert!(!is_prompt_file(Path::new("/w/README.md")));
    }

    proptest! {
        #[test]
        fn slug_is_always_a_safe_file_stem(input in ".{0,120}") {
            let slug = slugify(&input);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        }
    }
}
