//! System clipboard access
//!
//! Uses the `arboard` crate. Clipboard handles are not `Send` on every
//! platform, so each write opens its own handle on a blocking thread.

use anyhow::{Context, Result};
use arboard::Clipboard;

/// Copy `text` to the system clipboard
pub async fn write_text(text: &str) -> Result<()> {
    let text = text.to_string();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut clipboard = Clipboard::new().context("Clipboard not available")?;
        clipboard
            .set_text(text)
            .context("Failed to write to clipboard")?;
        Ok(())
    })
    .await
    .context("Clipboard task failed")?
}
