//! HTTP API Layer
//!
//! Trigger endpoints that start workflow runs. Workflow editing happens
//! elsewhere; this service only reads stored workflows.

// Run trigger endpoints
pub mod runs;

// Re-export router builder
pub use runs::{create_run_routes, ApiError, RunsState};
