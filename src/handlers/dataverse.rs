//! Dataverse-only routes: deletes, metadata, dropdown options and the
//! organisation + contact submission.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value as JsonValue;
use tracing::error;

use super::{DataResponse, MessageResponse, json_body};
use crate::{
    dataverse::{
        SelectOption, options::OPTION_SET_LABEL_PATH, organisation, parse_guid, process_options,
    },
    dispatcher::into_document,
    error::{AppError, AppResult},
    gateway::{Document, GatewayError},
    registry::validate_logical_name,
    schema::EntityType,
    state::AppState,
};

const COUNTRY_VALUE_PATH: &str = "nm_countryid";
const COUNTRY_LABEL_PATH: &str = "nm_name";

fn gateway_failure(operation: &'static str, entity: &str, err: GatewayError) -> AppError {
    error!(operation, entity, error = %err, "dataverse call failed");
    AppError::from(err)
}

pub async fn delete_entity(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    let destination = state.dataverse.destination_for(&collection)?;
    let id = parse_guid(&id)?;

    state
        .dataverse_gateway
        .delete(destination.name(), id)
        .await
        .map_err(|err| gateway_failure("delete", destination.name(), err))?;

    Ok(Json(MessageResponse {
        message: "Data deleted successfully",
    }))
}

pub async fn entity_metadata(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> AppResult<Json<DataResponse<JsonValue>>> {
    validate_logical_name(&entity)?;
    let data = state
        .dataverse_gateway
        .read_metadata(&entity)
        .await
        .map_err(|err| gateway_failure("read metadata", &entity, err))?;
    Ok(Json(DataResponse {
        message: "success",
        data,
    }))
}

pub async fn option_set(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<DataResponse<Vec<SelectOption>>>> {
    validate_logical_name(&name)?;
    let definition = state
        .dataverse_gateway
        .read_option_set(&name)
        .await
        .map_err(|err| gateway_failure("read option set", &name, err))?;

    let items = definition.get("Options").and_then(JsonValue::as_array);
    Ok(Json(DataResponse {
        message: "success",
        data: process_options(items.map(Vec::as_slice), "Value", OPTION_SET_LABEL_PATH),
    }))
}

/// Reference-table records as dropdown options.
pub async fn entity_options(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> AppResult<Json<DataResponse<Vec<SelectOption>>>> {
    validate_logical_name(&entity)?;
    let records: Vec<JsonValue> = state
        .dataverse_gateway
        .fetch_collection(&entity)
        .await
        .map_err(|err| gateway_failure("read", &entity, err))?
        .into_iter()
        .map(JsonValue::Object)
        .collect();

    Ok(Json(DataResponse {
        message: "success",
        data: process_options(
            Some(records.as_slice()),
            COUNTRY_VALUE_PATH,
            COUNTRY_LABEL_PATH,
        ),
    }))
}

pub async fn save_organisation_contact(
    State(state): State<AppState>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    let body = into_document(json_body(payload)?)?;
    let submission = state
        .schemas
        .schema_of(EntityType::OrganisationContact)?
        .validate(&body)
        .map_err(AppError::Validation)?;

    let data = organisation::submit(&state.dataverse_gateway, &submission)
        .await
        .map_err(|err| gateway_failure("create", organisation::CONTACT_ENTITY_SET, err))?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            message: "Save successfully",
            data,
        }),
    ))
}
