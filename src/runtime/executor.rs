//! Node executor contract
//!
//! An executor turns (node configuration, node id, current context, step
//! facility) into the next context. Everything with a side effect goes
//! through `step`; the rest of an executor must be safe to run again, because
//! a retried run re-invokes executors even though their steps replay.

use crate::{
    error::EngineResult,
    runtime::step::StepFacility,
    workflow::types::Context,
};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Everything an executor receives for one node
pub struct NodeInvocation<'a> {
    /// Node being executed
    pub node_id: &'a str,
    /// Declared node configuration (`node.data`)
    pub config: &'a Map<String, Value>,
    /// Context produced by the previous node
    pub context: Context,
    /// Durable-step facility for this invocation of the run
    pub step: &'a dyn StepFacility,
}

/// Execution logic for one node type
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(&self, invocation: NodeInvocation<'_>) -> EngineResult<Context>;
}
