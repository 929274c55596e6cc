//! nodeflow: durable workflow execution engine
//!
//! Loads a stored workflow graph, orders it with a deterministic topological
//! sort and runs each node through the executor registered for its type,
//! threading a JSON context from node to node. Side effects happen inside
//! memoized steps so a retried run replays finished work.

// Core configuration and setup
pub mod config;

// Engine error taxonomy
pub mod error;

// Workflow management layer - graph model, storage and in-memory store
pub mod workflow;

// Runtime execution engine - scheduling, executors, steps and orchestration
pub mod runtime;

// HTTP API layer - run trigger endpoints
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{EngineError, EngineResult};
pub use runtime::{ExecutionEngine, ExecutorRegistry, WorkflowRunner};
pub use server::start_server;
pub use workflow::{Connection, Context, Node, NodeType, RunResult, TriggerEvent, Workflow};
