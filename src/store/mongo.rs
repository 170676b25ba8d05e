use super::{
    DocumentStore, Filter, ID_FIELD, InsertOneResult, ObjectId, StoreError, StoreResult,
    UpdateResult,
};
use crate::gateway::Document;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document as BsonDocument, doc};
use mongodb::{Client, Collection, Database};
use serde_json::Value as JsonValue;
use tracing::info;

/// Document store backed by a MongoDB database. Collections map one to one
/// onto MongoDB collections and `_id` is the server's ObjectId.
#[derive(Clone)]
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    /// The driver connects on first use; an unreachable host surfaces as
    /// `Unavailable` from the first call.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await.map_err(unavailable)?;
        info!(database, "mongodb client configured");
        Ok(Self {
            database: client.database(database),
        })
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }
}

fn unavailable(err: mongodb::error::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn selector(filter: Filter) -> BsonDocument {
    match filter {
        Filter::All => doc! {},
        Filter::ById(id) => doc! { "_id": id },
    }
}

fn to_bson(document: &Document) -> StoreResult<BsonDocument> {
    bson::to_document(document).map_err(|err| StoreError::Encoding(err.to_string()))
}

/// Stored BSON back to JSON. ObjectIds in `_id` become their hex string so
/// clients can send them straight back.
fn from_bson(mut document: BsonDocument) -> Document {
    let id = document.remove(ID_FIELD);
    let mut json = match Bson::Document(document).into_relaxed_extjson() {
        JsonValue::Object(map) => map,
        _ => Document::new(),
    };
    if let Some(id) = id {
        let id = match id {
            Bson::ObjectId(oid) => JsonValue::String(oid.to_hex()),
            other => other.into_relaxed_extjson(),
        };
        json.insert(ID_FIELD.to_string(), id);
    }
    json
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> StoreResult<InsertOneResult> {
        let mut document = to_bson(&document)?;
        document.remove(ID_FIELD);

        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(unavailable)?;

        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: result.inserted_id.as_object_id(),
        })
    }

    async fn find_one(&self, collection: &str, filter: Filter) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one(selector(filter))
            .await
            .map_err(unavailable)?
            .map(from_bson))
    }

    async fn find(&self, collection: &str, filter: Filter) -> StoreResult<Vec<Document>> {
        let documents: Vec<BsonDocument> = self
            .collection(collection)
            .find(selector(filter))
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;
        Ok(documents.into_iter().map(from_bson).collect())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Filter,
        patch: Document,
    ) -> StoreResult<UpdateResult> {
        let mut set = to_bson(&patch)?;
        set.remove(ID_FIELD);

        // MongoDB refuses an empty `$set`; an empty patch only needs to match.
        if set.is_empty() {
            let matched = self.find_one(collection, filter).await?.is_some();
            return Ok(UpdateResult {
                matched_count: u64::from(matched),
                modified_count: 0,
            });
        }

        let result = self
            .collection(collection)
            .update_one(selector(filter), doc! { "$set": set })
            .await
            .map_err(unavailable)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }
}
