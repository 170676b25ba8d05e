use std::sync::Arc;

use anyhow::{Context, Result};
use nms_backend::{
    build_router,
    config::AppConfig,
    jobs::{JobRegistry, register_submission_job},
    state::AppState,
    store::{DocumentStore, InMemoryDocumentStore, MongoDocumentStore},
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to load application configuration")?;
    init_tracing(config.log_level.as_directive());

    let jobs = Arc::new(JobRegistry::with_timezone(config.job_timezone));
    register_submission_job(&jobs, &config.submission_schedule)
        .await
        .context("failed to register submission job")?;

    let store: Arc<dyn DocumentStore> = match &config.mongo_uri {
        Some(uri) => Arc::new(
            MongoDocumentStore::connect(uri, &config.mongo_database)
                .await
                .context("failed to configure the MongoDB document store")?,
        ),
        None => {
            warn!("MONGO_URI is not set; documents are kept in memory only");
            Arc::new(InMemoryDocumentStore::new())
        }
    };
    let state = AppState::from_config(&config, store, jobs.clone())?;
    let app = build_router(state);

    let scheduler = if config.jobs_enabled {
        Some(jobs.start().await)
    } else {
        info!("job scheduler disabled");
        None
    };

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(service = %config.service_name, address = %addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }

    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("nms_backend={level},tower_http=info"))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
