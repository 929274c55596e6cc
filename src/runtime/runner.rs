//! Local run driver
//!
//! Plays the part of a durable-execution runtime inside the process: every
//! run gets its own step journal, and a run that fails with a retriable error
//! is invoked again over that journal after a delay, so completed steps
//! replay instead of repeating.

use crate::{
    error::EngineResult,
    runtime::{
        engine::ExecutionEngine,
        step::{JournaledSteps, StepJournal},
    },
    workflow::types::{RunResult, TriggerEvent},
};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

/// How often and how patiently a failed run is re-invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations per run, the first one included
    pub max_attempts: u32,
    /// Pause between invocations
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

pub struct WorkflowRunner {
    engine: Arc<ExecutionEngine>,
    policy: RetryPolicy,
}

impl WorkflowRunner {
    pub fn new(engine: Arc<ExecutionEngine>, policy: RetryPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `event` to completion or to its final failure
    pub async fn run(&self, event: TriggerEvent) -> EngineResult<RunResult> {
        let run_id = Uuid::new_v4();
        let journal = Arc::new(StepJournal::new());
        let max_attempts = self.policy.max_attempts.max(1);

        tracing::info!(
            "🆔 Run {} started for workflow {:?}",
            run_id,
            event.workflow_id.as_deref().unwrap_or_default()
        );

        let mut attempt = 1;
        loop {
            let steps = JournaledSteps::new(Arc::clone(&journal));
            match self.engine.execute(&event, &steps).await {
                Ok(result) => {
                    tracing::info!(
                        "🏁 Run {} completed on attempt {}/{} ({} steps executed, {} replayed)",
                        run_id,
                        attempt,
                        max_attempts,
                        steps.executed(),
                        steps.replayed()
                    );
                    return Ok(result);
                }
                Err(e) if e.is_retriable() && attempt < max_attempts => {
                    tracing::warn!(
                        "🔁 Run {} attempt {}/{} failed, retrying in {:?}: {}",
                        run_id,
                        attempt,
                        max_attempts,
                        self.policy.retry_delay,
                        e
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "💥 Run {} failed on attempt {}/{} (retriable: {}): {}",
                        run_id,
                        attempt,
                        max_attempts,
                        e.is_retriable(),
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}
