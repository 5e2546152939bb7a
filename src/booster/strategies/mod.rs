//! Mode strategies
//!
//! One strategy per [`OperationMode`]. A strategy owns everything from model
//! selection to applying the result, and reports how it ended as a
//! [`ModeOutcome`] instead of an error: failures are logged and surfaced to
//! the user inside `execute`.

mod file;
mod manual;
mod realtime;

pub use file::FileModeStrategy;
pub use manual::ManualModeStrategy;
pub use realtime::{build_prompt_with_context, RealtimeModeStrategy, REALTIME_DEADLINE};

use super::mode::OperationMode;
use super::types::{ModeExecutionContext, ModeOutcome};
use async_trait::async_trait;

#[async_trait]
pub trait ModeStrategy: Send + Sync {
    fn mode(&self) -> OperationMode;

    fn can_handle(&self, mode: OperationMode) -> bool {
        self.mode() == mode
    }

    async fn execute(&self, ctx: ModeExecutionContext) -> ModeOutcome;
}
