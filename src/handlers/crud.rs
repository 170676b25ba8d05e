//! Collection-agnostic CRUD routes. The same handlers serve the document
//! store and, under `/dataverse`, the Dataverse entity sets.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value as JsonValue;

use super::{DocumentResponse, DocumentsResponse, json_body};
use crate::{dispatcher::CrudDispatcher, error::AppResult, state::AppState};

async fn list(
    dispatcher: &CrudDispatcher,
    collection: &str,
) -> AppResult<Json<DocumentsResponse>> {
    let documents = dispatcher.list(collection).await?;
    Ok(Json(DocumentsResponse {
        message: "success",
        documents,
    }))
}

async fn read(
    dispatcher: &CrudDispatcher,
    collection: &str,
    id: &str,
) -> AppResult<Json<DocumentResponse>> {
    let document = dispatcher.read(collection, id).await?;
    Ok(Json(DocumentResponse {
        message: "success",
        document,
    }))
}

async fn create(
    dispatcher: &CrudDispatcher,
    collection: &str,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let document = dispatcher.create(collection, json_body(payload)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse {
            message: "success",
            document,
        }),
    ))
}

async fn update(
    dispatcher: &CrudDispatcher,
    collection: &str,
    id: &str,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let document = dispatcher
        .update(collection, id, json_body(payload)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse {
            message: "success",
            document,
        }),
    ))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> AppResult<Json<DocumentsResponse>> {
    list(&state.documents, &collection).await
}

pub async fn read_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<Json<DocumentResponse>> {
    read(&state.documents, &collection, &id).await
}

pub async fn create_document(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    create(&state.documents, &collection, payload).await
}

pub async fn update_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    update(&state.documents, &collection, &id, payload).await
}

pub async fn list_entities(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> AppResult<Json<DocumentsResponse>> {
    list(&state.dataverse, &collection).await
}

pub async fn read_entity(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<Json<DocumentResponse>> {
    read(&state.dataverse, &collection, &id).await
}

pub async fn create_entity(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    create(&state.dataverse, &collection, payload).await
}

pub async fn update_entity(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    update(&state.dataverse, &collection, &id, payload).await
}
