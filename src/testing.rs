use anyhow::Result;
use axum::Router;
use blob_store::BlobStorageConfig;
use tempfile::TempDir;
use tracing::subscriber;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use crate::{config::ServerConfig, routes::create_routes, service::Service};

pub struct TestService {
    pub service: Service,
    // Dropped last so the database file and blob root outlive the service.
    pub temp_dir: TempDir,
}

impl TestService {
    pub async fn new() -> Result<Self> {
        Self::with_config(|_| {}).await
    }

    pub async fn with_api_token(token: &str) -> Result<Self> {
        Self::with_config(|cfg| cfg.api_token = Some(token.to_string())).await
    }

    pub async fn with_backend(backend: &str) -> Result<Self> {
        Self::with_config(|cfg| cfg.blob_storage.backend = backend.to_string()).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut ServerConfig)) -> Result<Self> {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trace"));
        let _ = subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_filter(env_filter)),
        );

        let temp_dir = tempfile::tempdir()?;

        let mut cfg = ServerConfig {
            database_url: format!(
                "sqlite://{}",
                temp_dir.path().join("state/blobgate.db").to_str().unwrap()
            ),
            blob_storage: BlobStorageConfig {
                local_path: temp_dir.path().join("blobs").to_str().unwrap().to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        customize(&mut cfg);
        let srv = Service::new(cfg).await?;

        Ok(Self {
            service: srv,
            temp_dir,
        })
    }

    pub fn router(&self) -> Router {
        create_routes(self.service.route_state())
    }
}
