use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum_server::Handle;
use blob_store::DbBlobStore;
use state_store::MetadataStore;
use tokio::signal;
use tracing::{error, info};

use crate::{
    blobs::BlobService,
    config::ServerConfig,
    metrics::{init_provider, METER_NAME},
    routes::{create_routes, RouteState},
};

const DB_MAX_CONNECTIONS: u32 = 5;
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Service {
    pub config: ServerConfig,
    pub blob_service: Arc<BlobService>,
}

impl Service {
    pub async fn new(config: ServerConfig) -> Result<Self> {
        init_provider(&config.telemetry, env!("CARGO_PKG_VERSION"))?;

        let pool = state_store::connect(&config.database_url, DB_MAX_CONNECTIONS).await?;

        let metadata = MetadataStore::new(pool.clone());
        metadata
            .create_table()
            .await
            .context("error creating metadata table")?;
        DbBlobStore::create_table(&pool)
            .await
            .context("error creating blob data table")?;

        let meter = opentelemetry::global::meter(METER_NAME);
        let blob_service = Arc::new(
            BlobService::new(&config.blob_storage, metadata, &meter)
                .await
                .context("error initializing blob storage")?,
        );

        Ok(Self {
            config,
            blob_service,
        })
    }

    pub fn route_state(&self) -> RouteState {
        RouteState {
            blob_service: self.blob_service.clone(),
            api_token: self.config.api_token().map(Arc::from),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let handle = Handle::new();
        let handle_sh = handle.clone();
        tokio::spawn(async move {
            shutdown_signal(handle_sh).await;
            info!("graceful shutdown signal received, shutting down server gracefully");
        });

        let addr: SocketAddr = self.config.listen_addr.parse()?;
        info!(
            backend = %self.blob_service.backend_kind(),
            "server api listening on {}", self.config.listen_addr
        );
        let routes = create_routes(self.route_state());
        axum_server::bind(addr)
            .handle(handle)
            .serve(routes.into_make_service())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
        },
        _ = terminate => {
        },
    }
    handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
}
