//! Routes an execution context to the strategy for a mode

use super::mode::OperationMode;
use super::strategies::ModeStrategy;
use super::types::{ModeExecutionContext, ModeOutcome, SkipReason};

pub struct ModeDispatcher {
    strategies: Vec<Box<dyn ModeStrategy>>,
}

impl ModeDispatcher {
    pub fn new(strategies: Vec<Box<dyn ModeStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_for(&self, mode: OperationMode) -> Option<&dyn ModeStrategy> {
        self.strategies
            .iter()
            .find(|s| s.can_handle(mode))
            .map(|s| s.as_ref())
    }

    pub async fn dispatch(&self, mode: OperationMode, ctx: ModeExecutionContext) -> ModeOutcome {
        if !ctx.has_prompt() {
            tracing::warn!("Ignoring empty prompt");
            return ModeOutcome::Skipped(SkipReason::EmptyPrompt);
        }

        match self.strategy_for(mode) {
            Some(strategy) => {
                tracing::debug!(
                    metadata = ?ctx.metadata.keys().collect::<Vec<_>>(),
                    "Dispatching to {} mode",
                    mode
                );
                strategy.execute(ctx).await
            }
            None => {
                tracing::error!("No strategy registered for {} mode", mode);
                ModeOutcome::Failed(format!("No strategy registered for {} mode", mode))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStrategy {
        mode: OperationMode,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ModeStrategy for CountingStrategy {
        fn mode(&self) -> OperationMode {
            self.mode
        }

        async fn execute(&self, _ctx: ModeExecutionContext) -> ModeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ModeOutcome::Cancelled
        }
    }

    fn dispatcher(calls: &Arc<AtomicUsize>) -> ModeDispatcher {
        ModeDispatcher::new(vec![Box::new(CountingStrategy {
            mode: OperationMode::File,
            calls: calls.clone(),
        })])
    }

    #[tokio::test]
    async fn test_routes_by_mode() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher(&calls);

        let outcome = dispatcher
            .dispatch(OperationMode::File, ModeExecutionContext::new("stage this"))
            .await;
        assert_eq!(outcome, ModeOutcome::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let outcome = dispatcher
            .dispatch(OperationMode::Manual, ModeExecutionContext::new("stage this"))
            .await;
        assert!(matches!(outcome, ModeOutcome::Failed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_prompt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = dispatcher(&calls)
            .dispatch(OperationMode::File, ModeExecutionContext::new(" \n "))
            .await;
        assert_eq!(outcome, ModeOutcome::Skipped(SkipReason::EmptyPrompt));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    struct MetadataEcho;

    #[async_trait]
    impl ModeStrategy for MetadataEcho {
        fn mode(&self) -> OperationMode {
            OperationMode::Realtime
        }

        async fn execute(&self, ctx: ModeExecutionContext) -> ModeOutcome {
            match ctx.metadata.get("source").and_then(|v| v.as_str()) {
                Some(source) => ModeOutcome::Failed(source.to_string()),
                None => ModeOutcome::Cancelled,
            }
        }
    }

    #[tokio::test]
    async fn test_metadata_reaches_strategy() {
        let dispatcher = ModeDispatcher::new(vec![Box::new(MetadataEcho)]);
        let metadata = [("source".to_string(), serde_json::json!("http"))]
            .into_iter()
            .collect();

        let outcome = dispatcher
            .dispatch(
                OperationMode::Realtime,
                ModeExecutionContext::new("hi").with_metadata(metadata),
            )
            .await;
        assert_eq!(outcome, ModeOutcome::Failed("http".to_string()));
    }
}
