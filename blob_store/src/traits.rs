//! Core blob store trait.

use async_trait::async_trait;

use crate::BlobResult;

/// Capability shared by every storage backend: write bytes under an id and
/// read them back.
///
/// Backends only ever see raw bytes. Encoding of the wire payload is owned by
/// the caller.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `id`, replacing whatever was stored there before.
    async fn put(&self, id: &str, data: Vec<u8>) -> BlobResult<()>;

    /// Fetch the bytes stored under `id`.
    ///
    /// Returns `Ok(None)` when nothing is stored under `id`.
    async fn get(&self, id: &str) -> BlobResult<Option<Vec<u8>>>;
}
