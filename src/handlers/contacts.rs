use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::json_body;
use crate::{
    dispatcher::into_document,
    error::{AppError, AppResult},
    gateway::Document,
    registry::Collection,
    schema::EntityType,
    state::AppState,
};

const CONTACTS: &str = Collection::Contact.as_str();

#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub message: &'static str,
    pub entities: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct EntityResponse {
    pub message: &'static str,
    pub entity: Document,
}

pub async fn list_contacts(State(state): State<AppState>) -> AppResult<Json<EntitiesResponse>> {
    let entities = state.documents.list(CONTACTS).await?;
    Ok(Json(EntitiesResponse {
        message: "success",
        entities,
    }))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<EntityResponse>> {
    let entity = state
        .documents
        .read(CONTACTS, &id)
        .await
        .map_err(|err| match err {
            AppError::NotFound(_) => AppError::not_found("Entity not found"),
            other => other,
        })?;
    Ok(Json(EntityResponse {
        message: "success",
        entity,
    }))
}

/// Creates a contact; the body needs no entity tag.
pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<EntityResponse>)> {
    let body = into_document(json_body(payload)?)?;
    let entity = state
        .documents
        .create_as(CONTACTS, EntityType::Contact, body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(EntityResponse {
            message: "success",
            entity,
        }),
    ))
}
