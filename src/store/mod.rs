//! Document Store
//!
//! The store collaborator is consumed through the narrow [`DocumentStore`]
//! trait: `insert_one`, `find_one`, `find`, `update_one`. The
//! [`DocumentStoreGateway`] adapts it to [`crate::gateway::RecordGateway`].
//!
//! # Architecture
//!
//! - `mongo.rs` - MongoDB-backed store used in production
//! - `memory.rs` - in-process store keyed by collection name
//! - `gateway.rs` - record gateway over any `DocumentStore`
//!
//! Documents are identified by ObjectIds in both stores.

mod gateway;
mod memory;
mod mongo;

pub use gateway::DocumentStoreGateway;
pub use memory::InMemoryDocumentStore;
pub use mongo::MongoDocumentStore;
pub use mongodb::bson::oid::ObjectId;

use crate::gateway::Document;
use async_trait::async_trait;
use thiserror::Error;

/// Field carrying the store-assigned identifier of a document.
pub const ID_FIELD: &str = "_id";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Document could not be encoded: {0}")]
    Encoding(String),
}

/// Document selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    ById(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> StoreResult<InsertOneResult>;

    async fn find_one(&self, collection: &str, filter: Filter) -> StoreResult<Option<Document>>;

    async fn find(&self, collection: &str, filter: Filter) -> StoreResult<Vec<Document>>;

    /// `$set`-style merge of `patch` into the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: Filter,
        patch: Document,
    ) -> StoreResult<UpdateResult>;
}
