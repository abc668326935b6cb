//! Blob metadata persisted in the `blobs_meta` table.
//!
//! The pool opened here is shared with the relational blob backend, but the
//! metadata row and the blob bytes are committed in separate transactions.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Context, Result};
use data_model::{now_millis, timestamp_from_millis, BlobId, BlobMetadata, NewBlobMetadata};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row,
    SqlitePool,
};
use tracing::{debug, info};

pub const BLOBS_META_TABLE: &str = "blobs_meta";

/// Open a connection pool for `database_url`, creating the database file and
/// its parent directory when they don't exist.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid database url: {}", database_url))?
        .create_if_missing(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("unable to open database: {}", database_url))?;
    info!(max_connections, "database pool ready");
    Ok(pool)
}

#[derive(Clone)]
pub struct MetadataStore {
    pool: SqlitePool,
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore").finish()
    }
}

impl MetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_table(&self) -> Result<()> {
        let query = format!(
            "CREATE TABLE IF NOT EXISTS \"{BLOBS_META_TABLE}\" (
            id VARCHAR(255) PRIMARY KEY NOT NULL,
            size INTEGER NOT NULL,
            backend VARCHAR(50),
            created_at INTEGER NOT NULL
        );"
        );
        sqlx::query(&query).execute(&self.pool).await?;
        debug!(table = BLOBS_META_TABLE, "metadata table ready");
        Ok(())
    }

    /// Insert the metadata row for a freshly written blob.
    ///
    /// When a row already exists the size and backend are refreshed so they
    /// describe the bytes just written, `created_at` keeps its first value.
    pub async fn record(&self, metadata: &NewBlobMetadata) -> Result<()> {
        let size = i64::try_from(metadata.size)
            .map_err(|_| anyhow!("blob size {} does not fit the size column", metadata.size))?;
        let query = format!(
            "INSERT INTO \"{BLOBS_META_TABLE}\" (id, size, backend, created_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (id) DO UPDATE SET size = excluded.size, backend = excluded.backend;"
        );
        sqlx::query(&query)
            .bind(metadata.id.as_str())
            .bind(size)
            .bind(metadata.backend.as_deref())
            .bind(now_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &BlobId) -> Result<Option<BlobMetadata>> {
        let query = format!(
            "SELECT id, size, backend, created_at FROM \"{BLOBS_META_TABLE}\" WHERE id = ?1"
        );
        let Some(row) = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let stored_id: String = row.try_get("id")?;
        let size: i64 = row.try_get("size")?;
        let backend: Option<String> = row.try_get("backend")?;
        let created_at: i64 = row.try_get("created_at")?;

        Ok(Some(BlobMetadata {
            id: BlobId::new(stored_id)?,
            size: u64::try_from(size).map_err(|_| anyhow!("negative blob size {}", size))?,
            backend,
            created_at: timestamp_from_millis(created_at)?,
        }))
    }
}
