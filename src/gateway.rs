//! Collaborator-facing record gateways.
//!
//! A gateway wraps exactly one operation against an external collaborator and
//! folds its low-level failures into [`GatewayError`]. Both the document store
//! and the Dataverse platform are reached through [`RecordGateway`], so the
//! dispatcher is written once for both.

use crate::registry::Collection;
use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use thiserror::Error;

/// A structured record as exchanged with clients and collaborators.
pub type Document = JsonMap<String, JsonValue>;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Identifier of a stored record in the canonical text form of the gateway
/// that parsed or issued it: a hex ObjectId for the document store, a
/// hyphenated GUID for Dataverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Destination unavailable: {0}")]
    DestinationUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl GatewayError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::DestinationUnavailable(message.into())
    }
}

#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Parses a client-supplied id in this gateway's native format.
    fn parse_id(&self, raw: &str) -> GatewayResult<RecordId>;

    /// Shapes a validated document for the collaborator before it is written.
    fn prepare(&self, _collection: Collection, document: Document) -> Document {
        document
    }

    /// Every record at `destination`, in collaborator-defined order.
    async fn read_all(&self, destination: &str) -> GatewayResult<Vec<Document>>;

    async fn read(&self, destination: &str, id: &RecordId) -> GatewayResult<Option<Document>>;

    /// Writes a new record and returns the identifier the collaborator
    /// assigned to it. The written shape is not returned; callers re-read.
    async fn create(&self, destination: &str, document: Document) -> GatewayResult<RecordId>;

    /// Merges `patch` into the record with `id`. Returns `false` when no record
    /// matched; never creates one.
    async fn update(
        &self,
        destination: &str,
        id: &RecordId,
        patch: Document,
    ) -> GatewayResult<bool>;
}
