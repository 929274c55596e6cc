//! Graph read boundary consumed by the run orchestrator

use crate::{error::EngineResult, workflow::types::Workflow};
use async_trait::async_trait;

/// Loads a workflow's full node and connection set in one atomic read
///
/// Implementations return [`EngineError::WorkflowNotFound`] for unknown ids
/// and never hand out a partially loaded graph.
///
/// [`EngineError::WorkflowNotFound`]: crate::error::EngineError::WorkflowNotFound
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    async fn load_workflow(&self, workflow_id: &str) -> EngineResult<Workflow>;
}
