//! Run trigger endpoints
//!
//! Accepts trigger events over HTTP and hands them to the run driver. A
//! request returns once the run has completed or finally failed.

use crate::{
    error::EngineError,
    runtime::runner::WorkflowRunner,
    workflow::types::{Context, RunResult, TriggerEvent},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared state for the run routes
#[derive(Clone)]
pub struct RunsState {
    pub runner: Arc<WorkflowRunner>,
}

/// Body of `POST /api/workflows/{workflow_id}/execute`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest {
    initial_data: Option<Context>,
}

/// Error returned by the run routes as `{ "error": ..., "retriable": ... }`
#[derive(Debug)]
pub enum ApiError {
    /// Request body that is not a valid trigger
    BadRequest(String),
    /// Run that ended Failed
    Run(EngineError),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Run(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Run(EngineError::MissingWorkflowId) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Run(EngineError::WorkflowNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Run(e) if e.is_retriable() => StatusCode::BAD_GATEWAY,
            ApiError::Run(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, retriable) = match &self {
            ApiError::BadRequest(msg) => (msg.clone(), false),
            ApiError::Run(e) => (e.to_string(), e.is_retriable()),
        };
        let body = json!({
            "error": message,
            "retriable": retriable,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        (status, Json(body)).into_response()
    }
}

/// Create run trigger routes
pub fn create_run_routes() -> Router<RunsState> {
    Router::new()
        .route("/api/runs", post(trigger_run))
        .route("/api/workflows/{workflow_id}/execute", post(execute_workflow))
}

/// Start a run from a raw trigger event
///
/// POST /api/runs
/// Body: { "workflowId": "...", "initialData": { ... } }
async fn trigger_run(
    State(state): State<RunsState>,
    body: String,
) -> Result<Json<RunResult>, ApiError> {
    tracing::info!("📥 Trigger event received");
    tracing::debug!("📄 Request body: {}", body);

    let event: TriggerEvent = serde_json::from_str(&body).map_err(|e| {
        tracing::warn!("❌ Invalid trigger event: {}", e);
        ApiError::BadRequest(format!("invalid trigger event: {e}"))
    })?;

    Ok(Json(state.runner.run(event).await?))
}

/// Start a run of one workflow
///
/// POST /api/workflows/{workflow_id}/execute
/// Body (optional): { "initialData": { ... } }
async fn execute_workflow(
    State(state): State<RunsState>,
    Path(workflow_id): Path<String>,
    body: String,
) -> Result<Json<RunResult>, ApiError> {
    tracing::info!("📥 Execute request received for workflow: {}", workflow_id);

    let request = if body.trim().is_empty() {
        ExecuteRequest::default()
    } else {
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("❌ Invalid execute request for {}: {}", workflow_id, e);
            ApiError::BadRequest(format!("invalid execute request: {e}"))
        })?
    };

    let event = TriggerEvent::new(workflow_id, request.initial_data);
    Ok(Json(state.runner.run(event).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (EngineError::MissingWorkflowId, StatusCode::BAD_REQUEST),
            (
                EngineError::WorkflowNotFound("x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::CyclicGraph {
                    workflow_id: "x".into(),
                    unscheduled: vec!["a".into()],
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EngineError::HttpStatus {
                    node_id: "n".into(),
                    status: 503,
                    status_text: "Service Unavailable".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (EngineError::Storage("locked".into()), StatusCode::BAD_GATEWAY),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
        assert_eq!(
            ApiError::BadRequest("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
