//! Persisted session state
//!
//! Kept apart from `config.toml` because it is written by the program, not
//! the user: the realtime permission decision and the last chosen model.

use crate::config::Config;
use crate::host::{HostUi, PermissionAnswer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const PERMISSION_MESSAGE: &str = "PromptBooster wants to optimize your prompts before sending them to the chat.\n\n\
This will:\n\
• Intercept chat prompts when auto-optimization is enabled\n\
• Send prompts to an AI model for enhancement\n\
• Show a preview before submitting\n\n\
You can disable this anytime in settings.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// `None` until the user answers Allow or Never
    pub permission_granted: Option<bool>,
    pub last_model_id: Option<String>,
}

#[derive(Debug)]
pub struct StateStore {
    path: Option<PathBuf>,
    state: Mutex<SessionState>,
}

impl StateStore {
    /// Open `state.json` next to the config file
    pub fn open() -> Result<Self> {
        Self::open_at(Config::config_dir()?.join("state.json"))
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt state file {}: {}", path.display(), e);
                    SessionState::default()
                }
            }
        } else {
            SessionState::default()
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn in_memory(state: SessionState) -> Self {
        Self {
            path: None,
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn permission(&self) -> Option<bool> {
        self.lock().permission_granted
    }

    pub fn set_permission(&self, granted: Option<bool>) -> Result<()> {
        self.update(|state| state.permission_granted = granted)
    }

    pub fn last_model_id(&self) -> Option<String> {
        self.lock().last_model_id.clone()
    }

    pub fn set_last_model_id(&self, id: Option<String>) -> Result<()> {
        if self.lock().last_model_id == id {
            return Ok(());
        }
        self.update(|state| state.last_model_id = id)
    }

    /// Whether realtime optimization may run, asking on first use
    ///
    /// Allow and Never are remembered. Not Now is not, so the question comes
    /// back on the next chat request.
    pub async fn ensure_permission(&self, ui: &dyn HostUi) -> bool {
        if let Some(granted) = self.permission() {
            return granted;
        }

        let answer = ui.request_permission(PERMISSION_MESSAGE).await;
        let stored = match answer {
            PermissionAnswer::Allow => Some(true),
            PermissionAnswer::Never => Some(false),
            PermissionAnswer::NotNow | PermissionAnswer::Dismissed => None,
        };

        if stored.is_some() {
            if let Err(e) = self.set_permission(stored) {
                tracing::error!("Failed to save permission decision: {:#}", e);
            }
        }
        stored.unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, change: impl FnOnce(&mut SessionState)) -> Result<()> {
        let mut state = self.lock();
        change(&mut state);
        if let Some(path) = &self.path {
            let content = serde_json::to_string_pretty(&*state)?;
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open_at(path.clone()).unwrap();
        assert_eq!(store.permission(), None);
        store.set_permission(Some(true)).unwrap();
        store.set_last_model_id(Some("gpt-4.1".to_string())).unwrap();

        let reopened = StateStore::open_at(path).unwrap();
        assert_eq!(reopened.permission(), Some(true));
        assert_eq!(reopened.last_model_id().as_deref(), Some("gpt-4.1"));
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = StateStore::open_at(path).unwrap();
        assert_eq!(store.snapshot(), SessionState::default());
    }
}
