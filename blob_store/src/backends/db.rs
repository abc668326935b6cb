//! Relational blob store backend: bytes live in the `blobs_data` table.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::{BlobResult, BlobStore};

pub const BLOBS_DATA_TABLE: &str = "blobs_data";

/// Stores blob bytes in a binary column keyed by blob id.
///
/// Writes are a single `INSERT .. ON CONFLICT DO UPDATE` inside a
/// transaction, so concurrent writers of the same id never lose the row;
/// the last committed write wins.
#[derive(Debug, Clone)]
pub struct DbBlobStore {
    pool: SqlitePool,
}

impl DbBlobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `blobs_data` table if it doesn't exist yet.
    pub async fn create_table(pool: &SqlitePool) -> BlobResult<()> {
        let query = format!(
            "CREATE TABLE IF NOT EXISTS \"{BLOBS_DATA_TABLE}\" (
            id VARCHAR(255) PRIMARY KEY NOT NULL,
            data BLOB NOT NULL
        );"
        );
        sqlx::query(&query).execute(pool).await?;
        debug!(table = BLOBS_DATA_TABLE, "blob data table ready");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for DbBlobStore {
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, id: &str, data: Vec<u8>) -> BlobResult<()> {
        let query = format!(
            "INSERT INTO \"{BLOBS_DATA_TABLE}\" (id, data) VALUES (?1, ?2) \
             ON CONFLICT (id) DO UPDATE SET data = excluded.data;"
        );
        let mut tx = self.pool.begin().await?;
        sqlx::query(&query)
            .bind(id)
            .bind(data)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> BlobResult<Option<Vec<u8>>> {
        let query = format!("SELECT data FROM \"{BLOBS_DATA_TABLE}\" WHERE id = ?1");
        let data = sqlx::query_scalar::<_, Vec<u8>>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(data)
    }
}
