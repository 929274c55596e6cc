//! In-memory workflow store using ArcSwap
//!
//! Holds workflow snapshots behind an atomically swapped map. Every write
//! clones the map and swaps the pointer, so concurrent runs keep reading the
//! snapshot they started with while updates land.

use crate::{
    error::{EngineError, EngineResult},
    workflow::{source::WorkflowSource, types::Workflow},
};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};

/// Lock-free workflow store for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    /// Key: workflow_id, Value: workflow definition
    workflows: ArcSwap<HashMap<String, Workflow>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `workflows`
    pub fn with_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        let map = workflows
            .into_iter()
            .map(|workflow| (workflow.id.clone(), workflow))
            .collect::<HashMap<_, _>>();
        Self {
            workflows: ArcSwap::new(Arc::new(map)),
        }
    }

    /// Add or replace a workflow wholesale
    pub fn insert(&self, workflow: Workflow) {
        self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(workflow.id.clone(), workflow.clone());
            next
        });
        tracing::debug!("🔥 Stored workflow in memory: {}", workflow.id);
    }

    /// Remove a workflow; returns whether it existed
    pub fn remove(&self, workflow_id: &str) -> bool {
        let mut removed = false;
        self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            removed = next.remove(workflow_id).is_some();
            next
        });
        removed
    }

    /// Get a workflow by ID (lock-free read)
    pub fn get(&self, workflow_id: &str) -> Option<Workflow> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// List all stored workflow IDs
    pub fn list_workflow_ids(&self) -> Vec<String> {
        self.workflows.load().keys().cloned().collect()
    }
}

#[async_trait]
impl WorkflowSource for MemoryWorkflowStore {
    async fn load_workflow(&self, workflow_id: &str) -> EngineResult<Workflow> {
        self.get(workflow_id)
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))
    }
}
