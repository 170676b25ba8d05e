//! Dynamic CRUD Dispatcher
//!
//! Resolves the collection name from the request path to a destination, the
//! entity tag from the request body to a schema, validates, and performs one
//! gateway operation. Writes are always followed by a read of the stored
//! record, and that canonical copy is what callers receive.
//!
//! Validation happens before any write: a rejected payload never reaches the
//! gateway. Gateway failures are logged here with collection and operation
//! context and surface to clients as top-level messages only.

use crate::error::{AppError, AppResult};
use crate::gateway::{Document, GatewayError, RecordGateway, RecordId};
use crate::registry::{CollectionRegistry, Destination};
use crate::schema::{ENTITY_TAG, EntityType, ErrorDetails, SchemaRegistry, Violation};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct CrudDispatcher {
    schemas: Arc<SchemaRegistry>,
    collections: CollectionRegistry,
    gateway: Arc<dyn RecordGateway>,
}

impl CrudDispatcher {
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        collections: CollectionRegistry,
        gateway: Arc<dyn RecordGateway>,
    ) -> Self {
        Self {
            schemas,
            collections,
            gateway,
        }
    }

    /// Resolves a collection name without performing any I/O.
    pub fn destination_for(&self, collection: &str) -> AppResult<Destination> {
        self.collections.destination_for(collection).map_err(|err| {
            warn!(collection, error = %err, "collection lookup failed");
            AppError::from(err)
        })
    }

    /// Parses a record id in the destination's native format. An unparsable
    /// id is a client error, distinct from a well-formed id that matches
    /// nothing.
    pub fn parse_id(&self, raw: &str) -> AppResult<RecordId> {
        self.gateway.parse_id(raw).map_err(AppError::from)
    }

    pub async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        let destination = self.destination_for(collection)?;
        self.gateway
            .read_all(destination.name())
            .await
            .map_err(|err| self.gateway_failure("list", &destination, None, err))
    }

    pub async fn read(&self, collection: &str, id: &str) -> AppResult<Document> {
        let destination = self.destination_for(collection)?;
        let id = self.parse_id(id)?;

        self.gateway
            .read(destination.name(), &id)
            .await
            .map_err(|err| self.gateway_failure("read", &destination, Some(&id), err))?
            .ok_or_else(|| AppError::not_found("Document not found"))
    }

    /// Validates against the schema named by the body's entity tag, writes
    /// the normalised document and returns the stored copy.
    pub async fn create(&self, collection: &str, payload: JsonValue) -> AppResult<Document> {
        let destination = self.destination_for(collection)?;
        let body = into_document(payload)?;
        let entity = entity_tag(&body)?;
        self.insert(&destination, entity, body).await
    }

    /// [`Self::create`] with the entity type fixed by the caller.
    pub async fn create_as(
        &self,
        collection: &str,
        entity: EntityType,
        body: Document,
    ) -> AppResult<Document> {
        let destination = self.destination_for(collection)?;
        self.insert(&destination, entity, body).await
    }

    async fn insert(
        &self,
        destination: &Destination,
        entity: EntityType,
        body: Document,
    ) -> AppResult<Document> {
        let document = self.validate("create", destination, entity, &body)?;
        let document = self.gateway.prepare(destination.collection(), document);

        let id = self
            .gateway
            .create(destination.name(), document)
            .await
            .map_err(|err| self.gateway_failure("create", destination, None, err))?;

        self.read_back("create", destination, &id).await
    }

    /// Validates like [`Self::create`] and merges the submitted fields into the
    /// existing record. A missing record is `NotFound`; nothing is upserted.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        payload: JsonValue,
    ) -> AppResult<Document> {
        let destination = self.destination_for(collection)?;
        let id = self.parse_id(id)?;
        let body = into_document(payload)?;
        let entity = entity_tag(&body)?;

        let mut patch = self.validate("update", &destination, entity, &body)?;
        // Defaults only apply on create; a partial update must not clobber
        // stored values with them.
        patch.retain(|key, _| body.contains_key(key));
        let patch = self.gateway.prepare(destination.collection(), patch);

        let matched = self
            .gateway
            .update(destination.name(), &id, patch)
            .await
            .map_err(|err| self.gateway_failure("update", &destination, Some(&id), err))?;

        if !matched {
            warn!(
                collection = %destination.collection(),
                destination = destination.name(),
                %id,
                "update matched no document"
            );
            return Err(AppError::not_found("Failed to find the document"));
        }

        self.read_back("update", &destination, &id).await
    }

    fn validate(
        &self,
        operation: &'static str,
        destination: &Destination,
        entity: EntityType,
        body: &Document,
    ) -> AppResult<Document> {
        let schema = self.schemas.schema_of(entity)?;
        schema.validate(body).map_err(|details| {
            info!(
                operation,
                collection = %destination.collection(),
                %entity,
                errors = %details,
                "document validation error"
            );
            AppError::Validation(details)
        })
    }

    async fn read_back(
        &self,
        operation: &'static str,
        destination: &Destination,
        id: &RecordId,
    ) -> AppResult<Document> {
        self.gateway
            .read(destination.name(), id)
            .await
            .map_err(|err| self.gateway_failure(operation, destination, Some(id), err))?
            .ok_or_else(|| {
                error!(
                    operation,
                    collection = %destination.collection(),
                    destination = destination.name(),
                    %id,
                    "written record could not be read back"
                );
                AppError::DestinationUnavailable(format!("Failed to {operation} document"))
            })
    }

    fn gateway_failure(
        &self,
        operation: &'static str,
        destination: &Destination,
        id: Option<&RecordId>,
        err: GatewayError,
    ) -> AppError {
        error!(
            operation,
            collection = %destination.collection(),
            destination = destination.name(),
            id = id.map(RecordId::as_str),
            error = %err,
            "gateway call failed"
        );
        AppError::from(err)
    }
}

pub(crate) fn into_document(payload: JsonValue) -> AppResult<Document> {
    match payload {
        JsonValue::Object(document) => Ok(document),
        _ => Err(AppError::bad_request("request body must be a JSON object")),
    }
}

fn entity_tag(body: &Document) -> AppResult<EntityType> {
    let message = match body.get(ENTITY_TAG) {
        Some(JsonValue::String(tag)) => return Ok(tag.parse::<EntityType>()?),
        None | Some(JsonValue::Null) => format!("\"{ENTITY_TAG}\" is required"),
        Some(_) => format!("\"{ENTITY_TAG}\" must be a string"),
    };
    let details: ErrorDetails =
        std::iter::once(Violation::new(vec![ENTITY_TAG.to_string()], message)).collect();
    Err(AppError::Validation(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStoreGateway, ID_FIELD, InMemoryDocumentStore, ObjectId};
    use serde_json::json;

    struct Harness {
        store: Arc<InMemoryDocumentStore>,
        dispatcher: CrudDispatcher,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryDocumentStore::new());
        let gateway = Arc::new(DocumentStoreGateway::new(store.clone()));
        let schemas = Arc::new(SchemaRegistry::builtin().expect("schemas"));
        Harness {
            store,
            dispatcher: CrudDispatcher::new(schemas, CollectionRegistry::document_store(), gateway),
        }
    }

    fn jo() -> JsonValue {
        json!({
            "entity": "contact",
            "firstName": "Jo",
            "lastName": "Lee",
            "email": "jo@example.com"
        })
    }

    #[tokio::test]
    async fn create_returns_stored_copy_with_new_id() {
        let h = harness();
        let created = h.dispatcher.create("contacts", jo()).await.unwrap();

        assert_eq!(created["firstName"], "Jo");
        assert_eq!(created["lastName"], "Lee");
        assert_eq!(created["email"], "jo@example.com");
        assert!(!created.contains_key(ENTITY_TAG));
        let id = created[ID_FIELD].as_str().expect("id assigned");
        assert!(ObjectId::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let h = harness();
        let created = h.dispatcher.create("contact", jo()).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap();

        let read = h.dispatcher.read("contact", id).await.unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn missing_required_field_writes_nothing() {
        let h = harness();
        h.dispatcher.create("contact", jo()).await.unwrap();
        let before = h.dispatcher.list("contact").await.unwrap().len();

        let mut payload = jo();
        payload.as_object_mut().unwrap().remove("email");
        let err = h.dispatcher.create("contact", payload).await.unwrap_err();

        match err {
            AppError::Validation(details) => assert!(details.contains_path(&["email"])),
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(h.dispatcher.list("contact").await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn entity_tag_is_required_and_must_be_known() {
        let h = harness();

        let mut untagged = jo();
        untagged.as_object_mut().unwrap().remove(ENTITY_TAG);
        assert!(matches!(
            h.dispatcher.create("contact", untagged).await,
            Err(AppError::Validation(ref details)) if details.contains_path(&[ENTITY_TAG])
        ));

        let mut unknown = jo();
        unknown[ENTITY_TAG] = json!("invoice");
        assert!(matches!(
            h.dispatcher.create("contact", unknown).await,
            Err(AppError::UnknownEntity(ref name)) if name == "invoice"
        ));
    }

    #[tokio::test]
    async fn unknown_collection_is_rejected_before_validation() {
        let h = harness();
        assert!(matches!(
            h.dispatcher.create("invoices", json!({})).await,
            Err(AppError::UnknownCollection(_))
        ));
        assert!(matches!(
            h.dispatcher.create("invoices", json!(["not", "an", "object"])).await,
            Err(AppError::UnknownCollection(_))
        ));
        assert!(matches!(
            h.dispatcher.update("invoices", "not-an-id", json!({})).await,
            Err(AppError::UnknownCollection(_))
        ));
        assert!(matches!(
            h.dispatcher.list("invoices").await,
            Err(AppError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn non_object_bodies_are_bad_requests() {
        let h = harness();
        assert!(matches!(
            h.dispatcher.create("contact", json!(["a"])).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn update_merges_and_returns_canonical_copy() {
        let h = harness();
        let mut payload = jo();
        payload["address"] = json!("1 High Street");
        let created = h.dispatcher.create("contact", payload).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap().to_string();

        let updated = h
            .dispatcher
            .update(
                "contact",
                &id,
                json!({
                    "entity": "contact",
                    "firstName": "Joanne",
                    "lastName": "Lee",
                    "email": "joanne@example.com"
                }),
            )
            .await
            .unwrap();

        assert_eq!(updated["firstName"], "Joanne");
        assert_eq!(updated["email"], "joanne@example.com");
        assert_eq!(updated["address"], "1 High Street");
        assert_eq!(updated[ID_FIELD], created[ID_FIELD]);
        assert_eq!(h.dispatcher.read("contact", &id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found_and_creates_nothing() {
        let h = harness();
        h.dispatcher.create("contact", jo()).await.unwrap();

        let err = h
            .dispatcher
            .update("contact", &ObjectId::new().to_hex(), jo())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(h.dispatcher.list("contact").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_update_leaves_document_unchanged() {
        let h = harness();
        let created = h.dispatcher.create("contact", jo()).await.unwrap();
        let id = created[ID_FIELD].as_str().unwrap().to_string();

        let err = h
            .dispatcher
            .update(
                "contact",
                &id,
                json!({ "entity": "contact", "firstName": "Joanne", "lastName": "Lee" }),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref d) if d.contains_path(&["email"])));
        assert_eq!(h.dispatcher.read("contact", &id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn malformed_ids_differ_from_missing_ids() {
        let h = harness();
        assert!(matches!(
            h.dispatcher.read("contact", "not-an-id").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            h.dispatcher.read("contact", &ObjectId::new().to_hex()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_unavailable() {
        let h = harness();
        h.store.set_available(false);
        assert!(matches!(
            h.dispatcher.list("contact").await,
            Err(AppError::DestinationUnavailable(_))
        ));
        assert!(matches!(
            h.dispatcher.create("contact", jo()).await,
            Err(AppError::DestinationUnavailable(_))
        ));
    }
}
