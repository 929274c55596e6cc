//! Workflow Management Layer
//!
//! Graph model and the read boundary the engine consumes:
//! - Type definitions (Workflow, Node, Connection, NodeType)
//! - SQLite persistence with sqlx
//! - Lock-free in-memory store using ArcSwap

// Core workflow type definitions
pub mod types;

// Graph read contract consumed by the orchestrator
pub mod source;

// SQLite persistence layer for workflow storage
pub mod storage;

// In-memory snapshot store
pub mod registry;

// Re-export commonly used types
pub use registry::MemoryWorkflowStore;
pub use source::WorkflowSource;
pub use storage::WorkflowStorage;
pub use types::{Connection, Context, Node, NodeType, RunResult, TriggerEvent, Workflow};
