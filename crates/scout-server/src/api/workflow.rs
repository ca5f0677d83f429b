// ABOUTME: Handler for POST /runWorkflow.
// ABOUTME: Validates the request, runs the workflow on its own task, and maps failures to status codes.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::app_state::SharedState;
use crate::workflow::{self, WorkflowError, WorkflowInput};

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = match self {
            WorkflowError::EmptyInput | WorkflowError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            WorkflowError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            WorkflowError::Serialize(_) | WorkflowError::Aborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// POST /runWorkflow - Run the guardrail gate and the listing agent for one request.
///
/// Bodies that are not JSON, or whose fields have the wrong types, are a 400.
/// The workflow runs on a spawned task so a client disconnect does not cancel
/// in-flight model or tool calls.
pub async fn run_workflow(
    State(state): State<SharedState>,
    body: Result<Json<WorkflowInput>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let Json(input) = body.map_err(|rejection| {
        tracing::debug!(status = %rejection.status(), "rejected workflow body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            WorkflowError::BodyTooLarge
        } else {
            WorkflowError::InvalidBody(rejection.body_text())
        }
    })?;
    if input.text().is_none() {
        return Err(WorkflowError::EmptyInput);
    }

    let task = tokio::spawn(async move { workflow::run_workflow(&state, input).await });
    let output = task.await.map_err(|e| {
        tracing::error!("workflow task failed: {}", e);
        WorkflowError::Aborted(e.to_string())
    })??;

    Ok(Json(output))
}
