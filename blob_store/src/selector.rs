//! Maps the configured backend name to a constructed backend.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::debug;

use crate::{
    backends::{db::DbBlobStore, local::LocalBlobStore, s3::S3BlobStore},
    BlobResult,
    BlobStorageConfig,
    BlobStore,
    StorageKind,
};

/// Build the backend named by `config.backend`.
///
/// `db` shares `pool` with the metadata store, `s3` uses path-style
/// addressing unless `virtual_host` is set, and anything else is the local
/// backend rooted at `config.local_path`. The only I/O performed is creating
/// the local root directory.
pub async fn select_backend(
    config: &BlobStorageConfig,
    pool: &SqlitePool,
) -> BlobResult<Arc<dyn BlobStore>> {
    let kind = config.kind();
    debug!(backend = %kind, "selecting blob storage backend");
    let backend: Arc<dyn BlobStore> = match kind {
        StorageKind::Db => Arc::new(DbBlobStore::new(pool.clone())),
        StorageKind::S3 => Arc::new(S3BlobStore::new(&config.s3)?),
        StorageKind::Local => Arc::new(LocalBlobStore::new(&config.local_path).await?),
    };
    Ok(backend)
}
