use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        contacts::{create_contact, get_contact, list_contacts},
        crud::{
            create_document, create_entity, list_documents, list_entities, read_document,
            read_entity, update_document, update_entity,
        },
        dataverse::{
            delete_entity, entity_metadata, entity_options, option_set, save_organisation_contact,
        },
        healthcheck,
        jobs::{job_submission, list_jobs, run_job},
        workflow::trigger_workflow,
    },
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let dataverse = Router::new()
        .route("/list/:collection", get(list_entities))
        .route("/read/:collection/:id", get(read_entity))
        .route("/create/:collection", post(create_entity))
        .route("/update/:collection/:id", put(update_entity))
        .route("/delete/:collection/:id", delete(delete_entity))
        .route("/metadata/:entity", get(entity_metadata))
        .route("/options/:option_set", get(option_set))
        .route("/entity-options/:entity", get(entity_options))
        .route("/organisation-contact", post(save_organisation_contact));

    Router::new()
        .route("/health", get(healthcheck))
        .route("/list/:collection", get(list_documents))
        .route("/read/:collection/:id", get(read_document))
        .route("/create/:collection", post(create_document))
        .route("/update/:collection/:id", put(update_document))
        .route("/contacts", get(list_contacts).post(create_contact))
        .route("/contacts/:id", get(get_contact))
        .route("/workflow/:collection/:id", post(trigger_workflow))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:name/run", post(run_job))
        .route("/job-submission", get(job_submission))
        .nest("/dataverse", dataverse)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
