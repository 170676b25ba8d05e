use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{error::AppResult, state::AppState, workflow::WorkflowRequest};

#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub message: &'static str,
    pub status: u16,
}

/// Forwards a stored document's file reference to the workflow endpoint.
pub async fn trigger_workflow(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<Json<WorkflowResponse>> {
    let document = state.documents.read(&collection, &id).await?;
    let id = state.documents.parse_id(&id)?;
    let request = WorkflowRequest::for_document(&collection, &id, &document)?;
    let status = state.workflow.trigger(&request).await?;

    Ok(Json(WorkflowResponse {
        message: "Workflow triggered",
        status,
    }))
}
