//! Workflow bridge: hands an uploaded document's file reference to the
//! external workflow endpoint.

use crate::gateway::{Document, RecordId};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("workflow endpoint is not configured")]
    NotConfigured,

    #[error("Document does not have file")]
    MissingFile,

    #[error("workflow endpoint rejected the request with status {0}")]
    Rejected(u16),

    #[error("workflow endpoint is unreachable")]
    Unavailable,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    pub document_id: String,
    pub collection: String,
    pub filename: JsonValue,
    pub file_url: JsonValue,
}

impl WorkflowRequest {
    /// Builds the request from a stored document; the document must carry a
    /// `file` object.
    pub fn for_document(
        collection: &str,
        id: &RecordId,
        document: &Document,
    ) -> Result<Self, WorkflowError> {
        let file = document
            .get("file")
            .and_then(JsonValue::as_object)
            .ok_or(WorkflowError::MissingFile)?;
        let field = |name: &str| file.get(name).cloned().unwrap_or(JsonValue::Null);

        Ok(Self {
            document_id: id.to_string(),
            collection: collection.to_string(),
            filename: field("filename"),
            file_url: field("fileUrl"),
        })
    }
}

#[derive(Clone)]
pub struct WorkflowBridge {
    http: Client,
    endpoint: Option<String>,
}

impl WorkflowBridge {
    pub fn new(http: Client, endpoint: Option<String>) -> Self {
        Self { http, endpoint }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Posts the request and returns the endpoint's status code.
    pub async fn trigger(&self, request: &WorkflowRequest) -> Result<u16, WorkflowError> {
        let endpoint = self.endpoint.as_deref().ok_or(WorkflowError::NotConfigured)?;

        let response = self
            .http
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                error!(error = %err, "workflow request failed");
                WorkflowError::Unavailable
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            error!(status, document = %request.document_id, "workflow endpoint rejected request");
            return Err(WorkflowError::Rejected(status));
        }

        info!(
            status,
            document = %request.document_id,
            collection = %request.collection,
            "workflow triggered"
        );
        Ok(status)
    }
}
