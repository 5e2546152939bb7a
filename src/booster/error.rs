//! Booster errors

use crate::llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoosterError {
    /// The caller's cancellation token fired
    #[error("Optimization cancelled by user")]
    Cancelled,

    #[error("Optimization timed out after {0}ms")]
    TimedOut(u64),

    /// The model call failed
    #[error("Failed to optimize prompt: {0}")]
    Optimization(String),

    #[error("No workspace folder open")]
    NoWorkspace,

    #[error("No range provided for replacement")]
    MissingRange,

    #[error("No document URI provided")]
    MissingDocument,

    #[error("Invalid file name '{0}': use only letters, numbers, hyphens, and underscores")]
    InvalidFileName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoosterError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BoosterError::Cancelled)
    }
}

impl From<LlmError> for BoosterError {
    fn from(err: LlmError) -> Self {
        if err.is_cancelled() {
            BoosterError::Cancelled
        } else {
            BoosterError::Optimization(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_cancel_maps_to_cancelled() {
        let err: BoosterError = LlmError::Cancelled.into();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_llm_failure_is_descriptive() {
        let err: BoosterError = LlmError::RateLimited("slow down".to_string()).into();
        assert!(!err.is_cancelled());
        assert_eq!(
            err.to_string(),
            "Failed to optimize prompt: Rate limited: slow down"
        );
    }
}
