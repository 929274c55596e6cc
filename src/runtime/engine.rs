//! Run orchestrator
//!
//! Drives one invocation of a run: Preparing (load the workflow and compute
//! its order inside the `prepare-workflow` step), resolving every node's
//! executor, then Executing the nodes one by one while the context is folded
//! through them. A run ends Completed with a [`RunResult`] or Failed with the
//! first error; there is no partial result.

use crate::{
    error::{EngineError, EngineResult},
    runtime::{
        executor::{NodeExecutor, NodeInvocation},
        registry::ExecutorRegistry,
        scheduler::topological_sort,
        step::{run_step, StepFacility},
    },
    workflow::{
        source::WorkflowSource,
        types::{Node, RunResult, TriggerEvent},
    },
};
use std::{sync::Arc, time::Instant};

/// Sequential workflow executor over an injected source and registry
pub struct ExecutionEngine {
    source: Arc<dyn WorkflowSource>,
    registry: Arc<ExecutorRegistry>,
}

impl ExecutionEngine {
    pub fn new(source: Arc<dyn WorkflowSource>, registry: Arc<ExecutorRegistry>) -> Self {
        Self { source, registry }
    }

    /// Execute the workflow named by `event` using `step` for every side effect
    ///
    /// Safe to call again with a step facility over the same journal: the
    /// preparation and every completed node step replay from their records.
    pub async fn execute(
        &self,
        event: &TriggerEvent,
        step: &dyn StepFacility,
    ) -> EngineResult<RunResult> {
        let workflow_id = event
            .workflow_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(EngineError::MissingWorkflowId)?;

        let workflow_start_time = Instant::now();
        tracing::info!("🚀 Starting workflow execution: {}", workflow_id);

        // Preparing
        let source = &self.source;
        let nodes: Vec<Node> = run_step(step, "prepare-workflow", async move {
            let workflow = source.load_workflow(workflow_id).await?;
            tracing::debug!(
                "📊 Loaded workflow '{}' ({}) with {} nodes and {} connections",
                workflow.id,
                workflow.name,
                workflow.nodes.len(),
                workflow.connections.len()
            );
            topological_sort(&workflow)
        })
        .await
        .inspect_err(|e| tracing::error!("❌ Preparing workflow '{}' failed: {}", workflow_id, e))?;

        // Every executor is resolved before the first node runs, so an unknown
        // type fails the run without any side effect.
        let plan: Vec<(&Node, Arc<dyn NodeExecutor>)> = nodes
            .iter()
            .map(|node| {
                self.registry
                    .resolve(&node.node_type, &node.id)
                    .map(|executor| (node, executor))
            })
            .collect::<EngineResult<_>>()
            .inspect_err(|e| tracing::error!("❌ Workflow '{}' cannot run: {}", workflow_id, e))?;

        // Executing
        let mut context = event.initial_data.clone().unwrap_or_default();
        let total = plan.len();
        for (step_num, (node, executor)) in plan.into_iter().enumerate() {
            tracing::info!(
                "📍 Step {}/{}: Executing node '{}' (type: {})",
                step_num + 1,
                total,
                node.id,
                node.node_type
            );
            let node_start_time = Instant::now();

            context = executor
                .execute(NodeInvocation {
                    node_id: &node.id,
                    config: &node.data,
                    context,
                    step,
                })
                .await
                .inspect_err(|e| {
                    tracing::error!(
                        "❌ Node '{}' failed (retriable: {}): {}",
                        node.id,
                        e.is_retriable(),
                        e
                    )
                })?;

            tracing::info!("✅ Node '{}' completed in {:?}", node.id, node_start_time.elapsed());
        }

        tracing::info!(
            "🎉 Workflow '{}' execution completed successfully in {:?}",
            workflow_id,
            workflow_start_time.elapsed()
        );

        Ok(RunResult {
            workflow_id: workflow_id.to_string(),
            result: context,
        })
    }
}
