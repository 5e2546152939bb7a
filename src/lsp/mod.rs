//! LSP server implementation

mod code_action;
mod document;
mod server;
mod ui;

pub use code_action::BoostArgs;
pub use server::{run_lsp_server, BoosterParts};
