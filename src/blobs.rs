use std::sync::Arc;

use blob_store::{
    select_backend,
    BlobError,
    BlobStorageConfig,
    BlobStore,
    InstrumentedBlobStore,
    StorageKind,
};
use chrono::{DateTime, Utc};
use data_model::{BlobId, NewBlobMetadata};
use opentelemetry::metrics::Meter;
use state_store::MetadataStore;
use tracing::{info, warn};

use crate::payload::{decode_payload, encode_payload};

#[derive(Debug, thiserror::Error)]
pub enum BlobServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Blob not found")]
    NotFound,

    #[error("blob storage error: {0}")]
    Backend(#[source] BlobError),

    #[error("metadata store error: {0:#}")]
    Metadata(#[source] anyhow::Error),
}

impl BlobServiceError {
    fn from_write(err: BlobError) -> Self {
        if err.is_client_error() {
            return Self::InvalidInput(err.to_string());
        }
        Self::Backend(err)
    }

    fn from_read(err: BlobError) -> Self {
        // A key no backend would accept can't name a stored blob.
        if err.is_client_error() {
            return Self::NotFound;
        }
        Self::Backend(err)
    }
}

/// A retrieved blob with its payload re-encoded as standard base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub id: BlobId,
    pub data: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Stores and retrieves blobs through the configured backend and keeps the
/// metadata table in step with it.
///
/// The backend is selected once from the immutable startup configuration, so
/// every call goes through the backend that is configured at that moment.
pub struct BlobService {
    backend: Arc<dyn BlobStore>,
    kind: StorageKind,
    metadata: MetadataStore,
}

impl BlobService {
    pub async fn new(
        config: &BlobStorageConfig,
        metadata: MetadataStore,
        meter: &Meter,
    ) -> Result<Self, BlobError> {
        let kind = config.kind();
        let selected = select_backend(config, metadata.pool()).await?;
        let backend = Arc::new(InstrumentedBlobStore::new(selected, kind, meter));
        info!(backend = %kind, "blob service ready");
        Ok(Self {
            backend,
            kind,
            metadata,
        })
    }

    pub fn backend_kind(&self) -> StorageKind {
        self.kind
    }

    /// Decode `payload`, write the bytes to the backend, then record the
    /// metadata row. Nothing is recorded when the write fails.
    #[tracing::instrument(skip(self, payload), fields(backend = %self.kind))]
    pub async fn store(&self, id: &str, payload: &str) -> Result<BlobId, BlobServiceError> {
        let id = BlobId::new(id).map_err(|e| BlobServiceError::InvalidInput(e.to_string()))?;
        let bytes =
            decode_payload(payload).map_err(|e| BlobServiceError::InvalidInput(e.to_string()))?;
        let size = bytes.len() as u64;

        self.backend
            .put(id.as_str(), bytes)
            .await
            .map_err(BlobServiceError::from_write)?;

        self.metadata
            .record(&NewBlobMetadata::new(id.clone(), size, self.kind.as_ref()))
            .await
            .map_err(BlobServiceError::Metadata)?;

        info!(blob_id = %id, size, "blob stored");
        Ok(id)
    }

    /// Look up the metadata row, then read the bytes from the configured
    /// backend.
    #[tracing::instrument(skip(self), fields(backend = %self.kind))]
    pub async fn retrieve(&self, id: &str) -> Result<StoredBlob, BlobServiceError> {
        let id = BlobId::new(id).map_err(|_| BlobServiceError::NotFound)?;
        let metadata = self
            .metadata
            .get(&id)
            .await
            .map_err(BlobServiceError::Metadata)?
            .ok_or(BlobServiceError::NotFound)?;

        if metadata.backend.as_deref() != Some(self.kind.as_ref()) {
            warn!(
                blob_id = %id,
                recorded = metadata.backend.as_deref().unwrap_or("<none>"),
                configured = %self.kind,
                "blob was written through a different backend",
            );
        }

        let bytes = self
            .backend
            .get(id.as_str())
            .await
            .map_err(BlobServiceError::from_read)?
            .ok_or(BlobServiceError::NotFound)?;

        Ok(StoredBlob {
            data: encode_payload(&bytes),
            id,
            size: metadata.size,
            created_at: metadata.created_at,
        })
    }
}
