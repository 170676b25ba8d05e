//! OData client for the Dataverse Web API.

use super::auth::TokenProvider;
use super::mapping::entity_payload;
use crate::gateway::{Document, GatewayError, GatewayResult, RecordGateway, RecordId};
use crate::registry::Collection;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, IF_MATCH};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

const API_PATH: &str = "api/data/v9.1";
const ENTITY_ID_HEADER: &str = "OData-EntityId";

/// A record written by [`DataverseGateway::create_record`].
#[derive(Debug, Clone)]
pub struct CreatedRecord {
    pub id: Uuid,
    /// Returned representation; empty when the platform answered 204.
    pub representation: Document,
}

pub struct DataverseGateway {
    http: Client,
    api_base: String,
    scopes: Vec<String>,
    tokens: Arc<dyn TokenProvider>,
}

impl DataverseGateway {
    pub fn new(http: Client, dataverse_uri: &str, tokens: Arc<dyn TokenProvider>) -> Self {
        let resource = format!("{}/", dataverse_uri.trim_end_matches('/'));
        Self {
            http,
            api_base: format!("{resource}{API_PATH}"),
            scopes: vec![format!("{resource}.default")],
            tokens,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn request(&self, method: Method, path: &str) -> GatewayResult<RequestBuilder> {
        let token = self.tokens.acquire_token(&self.scopes).await.map_err(|err| {
            error!(error = %err, "token acquisition failed");
            GatewayError::AuthenticationFailed(err.to_string())
        })?;

        Ok(self
            .http
            .request(method, format!("{}/{}", self.api_base, path))
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .header("Prefer", "return=representation"))
    }

    /// Sends the request. Transport errors and 401 are folded here; every
    /// other status is left to the caller.
    async fn send(
        &self,
        request: RequestBuilder,
        operation: &str,
        path: &str,
    ) -> GatewayResult<Response> {
        let response = request.send().await.map_err(|err| {
            error!(operation, path, error = %err, "dataverse request failed");
            GatewayError::unavailable(format!("Failed to {operation} {path}"))
        })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(operation, path, "dataverse rejected bearer token");
            self.tokens.invalidate().await;
            return Err(GatewayError::AuthenticationFailed(format!(
                "{operation} {path} was unauthorized"
            )));
        }

        Ok(response)
    }

    async fn failure(operation: &str, path: &str, response: Response) -> GatewayError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        error!(
            operation,
            path,
            status = status.as_u16(),
            body = %text,
            "dataverse returned an error"
        );
        GatewayError::unavailable(format!(
            "Failed to {operation} {path}: status {}",
            status.as_u16()
        ))
    }

    async fn json_body(
        operation: &str,
        path: &str,
        response: Response,
    ) -> GatewayResult<JsonValue> {
        response.json::<JsonValue>().await.map_err(|err| {
            error!(operation, path, error = %err, "dataverse response was not JSON");
            GatewayError::unavailable(format!("Failed to {operation} {path}: malformed response"))
        })
    }

    async fn get_json(&self, operation: &str, path: &str) -> GatewayResult<JsonValue> {
        let request = self.request(Method::GET, path).await?;
        let response = self.send(request, operation, path).await?;
        match response.status() {
            status if status.is_success() => Self::json_body(operation, path, response).await,
            _ => Err(Self::failure(operation, path, response).await),
        }
    }

    /// Every record of `entity`, as returned in the `value` array.
    pub async fn fetch_collection(&self, entity: &str) -> GatewayResult<Vec<Document>> {
        let body = self.get_json("read", entity).await?;
        let records = match body {
            JsonValue::Object(mut envelope) => match envelope.remove("value") {
                Some(JsonValue::Array(records)) => records,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(records
            .into_iter()
            .filter_map(|record| match record {
                JsonValue::Object(document) => Some(document),
                _ => None,
            })
            .collect())
    }

    pub async fn fetch_one(&self, entity: &str, id: Uuid) -> GatewayResult<Option<Document>> {
        let path = format!("{entity}({id})");
        let request = self.request(Method::GET, &path).await?;
        let response = self.send(request, "read", &path).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                match Self::json_body("read", &path, response).await? {
                    JsonValue::Object(document) => Ok(Some(document)),
                    _ => Err(GatewayError::unavailable(format!(
                        "Failed to read {path}: malformed response"
                    ))),
                }
            }
            _ => Err(Self::failure("read", &path, response).await),
        }
    }

    /// Writes a record, deep-inserting any nested navigation payloads.
    pub async fn create_record(
        &self,
        entity: &str,
        body: &Document,
    ) -> GatewayResult<CreatedRecord> {
        let request = self.request(Method::POST, entity).await?.json(body);
        let response = self.send(request, "create", entity).await?;
        if !response.status().is_success() {
            return Err(Self::failure("create", entity, response).await);
        }

        let header_id = response
            .headers()
            .get(ENTITY_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(id_from_entity_url);

        let representation = if response.status() == StatusCode::NO_CONTENT {
            Document::new()
        } else {
            match Self::json_body("create", entity, response).await? {
                JsonValue::Object(document) => document,
                _ => Document::new(),
            }
        };

        let id = header_id
            .or_else(|| {
                representation
                    .get(&primary_key(entity))
                    .and_then(JsonValue::as_str)
                    .and_then(|raw| Uuid::parse_str(raw).ok())
            })
            .ok_or_else(|| {
                error!(entity, "dataverse create returned no record id");
                GatewayError::unavailable(format!("Failed to create {entity}: no record id"))
            })?;

        debug!(entity, %id, "dataverse record created");
        Ok(CreatedRecord { id, representation })
    }

    /// Patches an existing record. Returns `false` when it does not exist;
    /// `If-Match: *` keeps the platform from upserting.
    pub async fn update_record(
        &self,
        entity: &str,
        id: Uuid,
        patch: &Document,
    ) -> GatewayResult<bool> {
        let path = format!("{entity}({id})");
        let request = self
            .request(Method::PATCH, &path)
            .await?
            .header(IF_MATCH, "*")
            .json(patch);
        let response = self.send(request, "update", &path).await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::PRECONDITION_FAILED => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(Self::failure("update", &path, response).await),
        }
    }

    pub async fn delete(&self, entity: &str, id: Uuid) -> GatewayResult<()> {
        let path = format!("{entity}({id})");
        let request = self.request(Method::DELETE, &path).await?;
        let response = self.send(request, "delete", &path).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(path)),
            status if status.is_success() => Ok(()),
            _ => Err(Self::failure("delete", &path, response).await),
        }
    }

    /// Entity definition for the logical name `entity`.
    pub async fn read_metadata(&self, entity: &str) -> GatewayResult<JsonValue> {
        self.get_json(
            "read metadata of",
            &format!("EntityDefinitions(LogicalName='{entity}')"),
        )
        .await
    }

    pub async fn read_option_set(&self, name: &str) -> GatewayResult<JsonValue> {
        self.get_json(
            "read option set",
            &format!("GlobalOptionSetDefinitions(Name='{name}')"),
        )
        .await
    }
}

/// Parses a record GUID, rejecting anything else as `InvalidId`.
pub fn parse_guid(raw: &str) -> GatewayResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| GatewayError::InvalidId(raw.to_string()))
}

fn guid(id: &RecordId) -> GatewayResult<Uuid> {
    parse_guid(id.as_str())
}

#[async_trait]
impl RecordGateway for DataverseGateway {
    fn parse_id(&self, raw: &str) -> GatewayResult<RecordId> {
        parse_guid(raw).map(|id| RecordId::new(id.hyphenated().to_string()))
    }

    fn prepare(&self, collection: Collection, document: Document) -> Document {
        entity_payload(collection, document)
    }

    async fn read_all(&self, destination: &str) -> GatewayResult<Vec<Document>> {
        self.fetch_collection(destination).await
    }

    async fn read(&self, destination: &str, id: &RecordId) -> GatewayResult<Option<Document>> {
        self.fetch_one(destination, guid(id)?).await
    }

    async fn create(&self, destination: &str, document: Document) -> GatewayResult<RecordId> {
        let created = self.create_record(destination, &document).await?;
        Ok(RecordId::new(created.id.hyphenated().to_string()))
    }

    async fn update(
        &self,
        destination: &str,
        id: &RecordId,
        patch: Document,
    ) -> GatewayResult<bool> {
        self.update_record(destination, guid(id)?, &patch).await
    }
}

/// Primary key attribute of an entity set: `contacts` -> `contactid`.
pub fn primary_key(entity_set: &str) -> String {
    format!("{}id", entity_set.strip_suffix('s').unwrap_or(entity_set))
}

/// Extracts the GUID from `https://org/api/data/v9.1/contacts(<guid>)`.
pub fn id_from_entity_url(url: &str) -> Option<Uuid> {
    let open = url.rfind('(')?;
    let close = url[open..].find(')')? + open;
    Uuid::parse_str(&url[open + 1..close]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataverse::auth::{AccessToken, AuthError};
    use chrono::{Duration, Utc};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TOKEN: &str = "test-token";

    #[derive(Default)]
    struct FixedToken {
        invalidations: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for FixedToken {
        async fn acquire_token(&self, _scopes: &[String]) -> Result<AccessToken, AuthError> {
            Ok(AccessToken::new(TOKEN, Utc::now() + Duration::hours(1)))
        }

        async fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gateway(server: &Server) -> (DataverseGateway, Arc<FixedToken>) {
        let tokens = Arc::new(FixedToken::default());
        (
            DataverseGateway::new(Client::new(), &server.url(), tokens.clone()),
            tokens,
        )
    }

    fn offline_gateway() -> DataverseGateway {
        DataverseGateway::new(
            Client::new(),
            "http://127.0.0.1:9",
            Arc::new(FixedToken::default()),
        )
    }

    fn doc(value: JsonValue) -> Document {
        match value {
            JsonValue::Object(document) => document,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn key_and_id_helpers() {
        assert_eq!(primary_key("contacts"), "contactid");
        assert_eq!(primary_key("nm_organisations"), "nm_organisationid");

        let id = Uuid::new_v4();
        assert_eq!(
            id_from_entity_url(&format!("https://org.example/api/data/v9.1/contacts({id})")),
            Some(id)
        );
        assert_eq!(id_from_entity_url("https://org.example/contacts"), None);
    }

    #[test]
    fn ids_must_be_guids() {
        let gateway = offline_gateway();
        let id = Uuid::new_v4();

        assert_eq!(
            gateway.parse_id(&id.to_string().to_uppercase()).unwrap(),
            RecordId::new(id.to_string())
        );
        assert_eq!(
            gateway.parse_id("65f1c2a9e4b0a1b2c3d4e5f6"),
            Err(GatewayError::InvalidId("65f1c2a9e4b0a1b2c3d4e5f6".to_string()))
        );
    }

    #[test]
    fn writes_are_prepared_with_dataverse_attributes() {
        let gateway = offline_gateway();
        let prepared = gateway.prepare(
            Collection::Contact,
            doc(json!({ "firstName": "Jo", "email": "jo@example.com" })),
        );
        assert_eq!(
            JsonValue::Object(prepared),
            json!({ "firstname": "Jo", "nm_email": "jo@example.com" })
        );
    }

    #[tokio::test]
    async fn read_all_unwraps_value_array() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/data/v9.1/contacts")
            .match_header("authorization", format!("Bearer {TOKEN}").as_str())
            .match_header("odata-version", "4.0")
            .with_header("content-type", "application/json")
            .with_body(r#"{"@odata.context":"x","value":[{"firstname":"Jo"},{"firstname":"Al"}]}"#)
            .create_async()
            .await;

        let (gateway, _) = gateway(&server);
        let records = gateway.read_all("contacts").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["firstname"], "Jo");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_of_missing_record_is_none() {
        let mut server = Server::new_async().await;
        let id = Uuid::new_v4();
        let _mock = server
            .mock("GET", format!("/api/data/v9.1/contacts({id})").as_str())
            .with_status(404)
            .create_async()
            .await;

        let (gateway, _) = gateway(&server);
        let id = gateway.parse_id(&id.to_string()).unwrap();
        assert_eq!(gateway.read("contacts", &id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_takes_id_from_entity_header() {
        let mut server = Server::new_async().await;
        let id = Uuid::new_v4();
        let mock = server
            .mock("POST", "/api/data/v9.1/contacts")
            .match_body(Matcher::Json(json!({ "firstname": "Jo" })))
            .with_status(204)
            .with_header(
                "OData-EntityId",
                &format!("{}/api/data/v9.1/contacts({id})", server.url()),
            )
            .create_async()
            .await;

        let (gateway, _) = gateway(&server);
        let created = gateway
            .create("contacts", doc(json!({ "firstname": "Jo" })))
            .await
            .unwrap();
        assert_eq!(created, RecordId::new(id.to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_falls_back_to_primary_key_in_representation() {
        let mut server = Server::new_async().await;
        let id = Uuid::new_v4();
        let _mock = server
            .mock("POST", "/api/data/v9.1/contacts")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(json!({ "contactid": id.to_string(), "firstname": "Jo" }).to_string())
            .create_async()
            .await;

        let (gateway, _) = gateway(&server);
        let created = gateway
            .create_record("contacts", &doc(json!({ "firstname": "Jo" })))
            .await
            .unwrap();
        assert_eq!(created.id, id);
        assert_eq!(created.representation["firstname"], "Jo");
    }

    #[tokio::test]
    async fn update_never_upserts() {
        let mut server = Server::new_async().await;
        let id = Uuid::new_v4();
        let mock = server
            .mock("PATCH", format!("/api/data/v9.1/contacts({id})").as_str())
            .match_header("if-match", "*")
            .with_status(404)
            .create_async()
            .await;

        let (gateway, _) = gateway(&server);
        let id = gateway.parse_id(&id.to_string()).unwrap();
        let matched = gateway
            .update("contacts", &id, doc(json!({ "lastname": "Lee" })))
            .await
            .unwrap();
        assert!(!matched);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_invalidates_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/data/v9.1/contacts")
            .with_status(401)
            .create_async()
            .await;

        let (gateway, tokens) = gateway(&server);
        assert!(matches!(
            gateway.read_all("contacts").await,
            Err(GatewayError::AuthenticationFailed(_))
        ));
        assert_eq!(tokens.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/data/v9.1/GlobalOptionSetDefinitions(Name='nm_status')")
            .with_status(503)
            .with_body("busy")
            .create_async()
            .await;

        let (gateway, _) = gateway(&server);
        match gateway.read_option_set("nm_status").await {
            Err(GatewayError::DestinationUnavailable(message)) => assert!(message.contains("503")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_and_metadata() {
        let mut server = Server::new_async().await;
        let id = Uuid::new_v4();
        let delete = server
            .mock("DELETE", format!("/api/data/v9.1/contacts({id})").as_str())
            .with_status(204)
            .create_async()
            .await;
        let metadata = server
            .mock("GET", "/api/data/v9.1/EntityDefinitions(LogicalName='contact')")
            .with_header("content-type", "application/json")
            .with_body(r#"{"LogicalName":"contact"}"#)
            .create_async()
            .await;

        let (gateway, _) = gateway(&server);
        gateway.delete("contacts", id).await.unwrap();
        let definition = gateway.read_metadata("contact").await.unwrap();
        assert_eq!(definition["LogicalName"], "contact");
        delete.assert_async().await;
        metadata.assert_async().await;
    }
}
