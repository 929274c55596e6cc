//! Engine error taxonomy
//!
//! Every failure a run can end with, split into fatal (the surrounding runtime
//! must not retry) and retriable (transient, safe to re-invoke the run).

use crate::runtime::template::TemplateError;
use thiserror::Error;

/// Convenience alias for engine-level results.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the scheduler, registry, executors and orchestrator
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Workflow ID is missing from the trigger event")]
    MissingWorkflowId,

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Workflow '{workflow_id}' has an invalid graph: {reason}")]
    InvalidGraph { workflow_id: String, reason: String },

    #[error("Workflow '{workflow_id}' contains a cycle; unscheduled nodes: [{}]", .unscheduled.join(", "))]
    CyclicGraph {
        workflow_id: String,
        unscheduled: Vec<String>,
    },

    #[error("No executor found for node '{node_id}' of type '{node_type}'")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("Node '{node_id}' is misconfigured: {reason}")]
    InvalidNodeConfig { node_id: String, reason: String },

    #[error("Node '{node_id}' template error: {source}")]
    Template {
        node_id: String,
        #[source]
        source: TemplateError,
    },

    #[error("Node '{node_id}' rendered a request body that is not valid JSON: {reason}")]
    MalformedBody { node_id: String, reason: String },

    #[error("Node '{node_id}' HTTP request failed: {source}")]
    Http {
        node_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Node '{node_id}' received HTTP {status} {status_text}")]
    HttpStatus {
        node_id: String,
        status: u16,
        status_text: String,
    },

    #[error("Step '{step_id}' recorded a value that cannot be replayed: {reason}")]
    StepReplay { step_id: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Whether the surrounding runtime may re-invoke the run after this failure.
    ///
    /// Configuration and graph problems never heal on their own; only
    /// transport hiccups, throttling and server-side faults do.
    pub fn is_retriable(&self) -> bool {
        match self {
            EngineError::Http { .. } | EngineError::Storage(_) => true,
            EngineError::HttpStatus { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            EngineError::MissingWorkflowId
            | EngineError::WorkflowNotFound(_)
            | EngineError::InvalidGraph { .. }
            | EngineError::CyclicGraph { .. }
            | EngineError::UnknownNodeType { .. }
            | EngineError::InvalidNodeConfig { .. }
            | EngineError::Template { .. }
            | EngineError::MalformedBody { .. }
            | EngineError::StepReplay { .. } => false,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_and_graph_errors_are_fatal() {
        let fatal = [
            EngineError::MissingWorkflowId,
            EngineError::WorkflowNotFound("wf".into()),
            EngineError::CyclicGraph {
                workflow_id: "wf".into(),
                unscheduled: vec!["a".into(), "b".into()],
            },
            EngineError::UnknownNodeType {
                node_id: "n1".into(),
                node_type: "UNKNOWN_TYPE".into(),
            },
            EngineError::InvalidNodeConfig {
                node_id: "n1".into(),
                reason: "endpoint is required".into(),
            },
            EngineError::MalformedBody {
                node_id: "n1".into(),
                reason: "eof".into(),
            },
        ];
        for err in fatal {
            assert!(!err.is_retriable(), "{err} should be fatal");
        }
    }

    #[test]
    fn http_status_retriability_follows_status_class() {
        let status = |status: u16| EngineError::HttpStatus {
            node_id: "n1".into(),
            status,
            status_text: String::new(),
        };
        assert!(status(503).is_retriable());
        assert!(status(429).is_retriable());
        assert!(status(408).is_retriable());
        assert!(!status(404).is_retriable());
        assert!(!status(400).is_retriable());
    }

    #[test]
    fn cycle_message_names_workflow_and_nodes() {
        let err = EngineError::CyclicGraph {
            workflow_id: "wf-1".into(),
            unscheduled: vec!["b".into(), "c".into()],
        };
        assert_eq!(
            err.to_string(),
            "Workflow 'wf-1' contains a cycle; unscheduled nodes: [b, c]"
        );
    }
}
