use super::{DocumentStore, Filter, ObjectId, StoreError};
use crate::gateway::{Document, GatewayError, GatewayResult, RecordGateway, RecordId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// Record gateway over a [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentStoreGateway {
    store: Arc<dyn DocumentStore>,
}

impl DocumentStoreGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

fn unavailable(operation: &'static str, collection: &str, err: StoreError) -> GatewayError {
    error!(operation, collection, error = %err, "document store call failed");
    GatewayError::unavailable(format!("Failed to {operation} in {collection}"))
}

fn object_id(id: &RecordId) -> GatewayResult<ObjectId> {
    ObjectId::parse_str(id.as_str()).map_err(|_| GatewayError::InvalidId(id.to_string()))
}

#[async_trait]
impl RecordGateway for DocumentStoreGateway {
    fn parse_id(&self, raw: &str) -> GatewayResult<RecordId> {
        ObjectId::parse_str(raw)
            .map(|id| RecordId::new(id.to_hex()))
            .map_err(|_| GatewayError::InvalidId(raw.to_string()))
    }

    async fn read_all(&self, destination: &str) -> GatewayResult<Vec<Document>> {
        self.store
            .find(destination, Filter::All)
            .await
            .map_err(|err| unavailable("read documents", destination, err))
    }

    async fn read(&self, destination: &str, id: &RecordId) -> GatewayResult<Option<Document>> {
        self.store
            .find_one(destination, Filter::ById(object_id(id)?))
            .await
            .map_err(|err| unavailable("read document", destination, err))
    }

    async fn create(&self, destination: &str, document: Document) -> GatewayResult<RecordId> {
        let result = self
            .store
            .insert_one(destination, document)
            .await
            .map_err(|err| unavailable("create document", destination, err))?;

        match (result.acknowledged, result.inserted_id) {
            (true, Some(id)) => Ok(RecordId::new(id.to_hex())),
            _ => Err(GatewayError::unavailable(format!(
                "Insert into {destination} was not acknowledged"
            ))),
        }
    }

    async fn update(
        &self,
        destination: &str,
        id: &RecordId,
        patch: Document,
    ) -> GatewayResult<bool> {
        let result = self
            .store
            .update_one(destination, Filter::ById(object_id(id)?), patch)
            .await
            .map_err(|err| unavailable("update document", destination, err))?;
        Ok(result.matched_count > 0)
    }
}
