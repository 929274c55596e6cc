use crate::{
    error::EngineResult,
    runtime::{
        executor::{NodeExecutor, NodeInvocation},
        step::run_step,
    },
    workflow::types::Context,
};
use async_trait::async_trait;

/// Passthrough for entry-point nodes (manual trigger, initial placeholder)
///
/// The context goes through one recorded step so the trigger shows up in the
/// run's step history like every other node.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualTriggerExecutor;

#[async_trait]
impl NodeExecutor for ManualTriggerExecutor {
    async fn execute(&self, invocation: NodeInvocation<'_>) -> EngineResult<Context> {
        let NodeInvocation {
            node_id,
            context,
            step,
            ..
        } = invocation;
        tracing::debug!("🎯 Manual trigger '{}' passing context through", node_id);
        run_step(step, "manual-trigger", async move { Ok(context) }).await
    }
}
