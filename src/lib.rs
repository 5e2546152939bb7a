//! prompt-booster: rewrite rough prompts into clear, structured ones
//!
//! This library provides:
//! - Three operation modes: manual (rewrite a selection in place), realtime
//!   (preview an optimized chat prompt), and file (stage a `.prompt.md` file)
//! - A structured optimization call returning the rewritten prompt and intent
//! - LSP server exposing the commands to editors
//! - Terminal and HTTP front-ends
//! - OpenAI-compatible and Ollama chat models

pub mod booster;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod host;
pub mod llm;
pub mod lsp;
pub mod state;
pub mod transport;

pub use booster::{Booster, ModeOutcome, OperationMode, PromptResult};
pub use config::{Config, ConfigStore};
pub use state::StateStore;
