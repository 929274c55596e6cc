//! Runtime Execution Engine
//!
//! This module turns a stored workflow into a finished run:
//! - Deterministic topological scheduling over petgraph
//! - Immutable executor registry keyed by node type
//! - Built-in node executors and the template function they render with
//! - Durable, memoized steps for every side effect
//! - The run orchestrator and the local retry driver around it

// Run orchestrator: prepare, resolve, execute
pub mod engine;

// Node executor contract
pub mod executor;

// Built-in node executors
pub mod nodes;

// NodeType -> executor map
pub mod registry;

// Local retry driver
pub mod runner;

// Kahn's algorithm over the workflow graph
pub mod scheduler;

// Durable-step facility and in-process journal
pub mod step;

// `{{ path }}` interpolation against the run context
pub mod template;

// Re-export main types
pub use engine::ExecutionEngine;
pub use executor::{NodeExecutor, NodeInvocation};
pub use registry::ExecutorRegistry;
pub use runner::{RetryPolicy, WorkflowRunner};
pub use scheduler::topological_sort;
pub use step::{run_step, JournaledSteps, StepFacility, StepJournal};
