use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dataverse::{
        CachedTokenProvider, ClientCredentials, ClientCredentialsProvider, DataverseGateway,
        MissingCredentials, TokenProvider,
    },
    dispatcher::CrudDispatcher,
    http::build_http_client,
    jobs::JobRegistry,
    registry::CollectionRegistry,
    schema::SchemaRegistry,
    store::{DocumentStore, DocumentStoreGateway},
    workflow::WorkflowBridge,
};

#[derive(Clone)]
pub struct AppState {
    pub schemas: Arc<SchemaRegistry>,
    /// CRUD against the document store.
    pub documents: Arc<CrudDispatcher>,
    /// CRUD against Dataverse entity sets.
    pub dataverse: Arc<CrudDispatcher>,
    pub dataverse_gateway: Arc<DataverseGateway>,
    pub jobs: Arc<JobRegistry>,
    pub workflow: WorkflowBridge,
}

impl AppState {
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        store: Arc<dyn DocumentStore>,
        dataverse_gateway: Arc<DataverseGateway>,
        jobs: Arc<JobRegistry>,
        workflow: WorkflowBridge,
    ) -> Self {
        let documents = CrudDispatcher::new(
            schemas.clone(),
            CollectionRegistry::document_store(),
            Arc::new(DocumentStoreGateway::new(store)),
        );
        let dataverse = CrudDispatcher::new(
            schemas.clone(),
            CollectionRegistry::dataverse(),
            dataverse_gateway.clone(),
        );

        Self {
            schemas,
            documents: Arc::new(documents),
            dataverse: Arc::new(dataverse),
            dataverse_gateway,
            jobs,
            workflow,
        }
    }

    /// Wires the collaborators described by `config` around `store`.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn DocumentStore>,
        jobs: Arc<JobRegistry>,
    ) -> Result<Self> {
        let schemas = Arc::new(SchemaRegistry::builtin().context("built-in schemas are invalid")?);
        let http = build_http_client(config.proxy.as_deref())
            .context("failed to build outbound HTTP client")?;

        let tokens: Arc<dyn TokenProvider> = match &config.azure {
            Some(azure) => Arc::new(CachedTokenProvider::new(ClientCredentialsProvider::new(
                http.clone(),
                &config.authority_host,
                ClientCredentials {
                    tenant_id: azure.tenant_id.clone(),
                    client_id: azure.client_id.clone(),
                    client_secret: azure.client_secret.clone(),
                },
            ))),
            None => {
                warn!("Azure credentials are not configured; Dataverse calls will fail");
                Arc::new(MissingCredentials)
            }
        };

        let dataverse_gateway = Arc::new(DataverseGateway::new(
            http.clone(),
            &config.dataverse_uri,
            tokens,
        ));
        info!(api = dataverse_gateway.api_base(), "dataverse gateway configured");

        let workflow = WorkflowBridge::new(http, config.logic_app_url.clone());
        if !workflow.is_configured() {
            warn!("LOGIC_APP_URL is not set; workflow bridge is disabled");
        }

        Ok(Self::new(schemas, store, dataverse_gateway, jobs, workflow))
    }
}
