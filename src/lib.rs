// ============================================================================
// NMS Backend
// ============================================================================
//
// Backend-for-frontend service: schema-validated CRUD over named collections,
// dispatched either to the document store or to Dataverse entity sets, plus
// a cron job registry and a workflow bridge.

pub mod app;
pub mod config;
pub mod dataverse;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod http;
pub mod jobs;
pub mod registry;
pub mod schema;
pub mod state;
pub mod store;
pub mod workflow;

pub use app::build_router;
pub use dispatcher::CrudDispatcher;
pub use error::{AppError, AppResult};
pub use gateway::{Document, GatewayError, RecordGateway, RecordId};
pub use state::AppState;
