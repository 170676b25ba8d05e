pub mod contacts;
pub mod crud;
pub mod dataverse;
pub mod jobs;
pub mod workflow;

use axum::{Json, extract::rejection::JsonRejection};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::gateway::Document;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub message: &'static str,
    pub documents: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub message: &'static str,
    pub document: Document,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub message: &'static str,
    pub data: T,
}

pub async fn healthcheck() -> Json<MessageResponse> {
    Json(MessageResponse { message: "success" })
}

/// Unwraps a JSON body, turning extractor rejections into `400 {"error": ...}`.
pub(crate) fn json_body(payload: Result<Json<JsonValue>, JsonRejection>) -> AppResult<JsonValue> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}
