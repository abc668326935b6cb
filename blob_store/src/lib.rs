//! Blob storage backends for Blobgate.
//!
//! Every backend implements the two-operation [`BlobStore`] trait:
//!
//! - [`LocalBlobStore`]: files under a root directory, the blob id is the
//!   relative path.
//! - [`DbBlobStore`]: a binary column in the `blobs_data` table.
//! - [`S3BlobStore`]: an S3-compatible endpoint over plain HTTP, signed with
//!   AWS Signature Version 4 (see [`sigv4`]).
//!
//! [`select_backend`] turns a [`BlobStorageConfig`] into one of them.
//!
//! ```rust,no_run
//! use blob_store::{select_backend, BlobStorageConfig, BlobStore};
//!
//! # async fn example(pool: sqlx::SqlitePool) -> Result<(), blob_store::BlobError> {
//! let config = BlobStorageConfig {
//!     backend: "local".to_string(),
//!     local_path: "/var/lib/blobgate/blobs".to_string(),
//!     ..Default::default()
//! };
//! let store = select_backend(&config, &pool).await?;
//! store.put("images/avatar.png", vec![1, 2, 3]).await?;
//! assert_eq!(store.get("images/avatar.png").await?, Some(vec![1, 2, 3]));
//! # Ok(())
//! # }
//! ```

mod backends;
mod config;
mod error;
mod metrics;
pub mod region;
mod selector;
pub mod sigv4;
mod traits;

pub use backends::{
    db::{DbBlobStore, BLOBS_DATA_TABLE},
    local::LocalBlobStore,
    s3::{ObjectLocation, S3BlobStore},
};
pub use config::{default_blob_store_path, BlobStorageConfig, S3Config, StorageKind};
pub use error::{BlobError, BlobResult};
pub use metrics::InstrumentedBlobStore;
pub use selector::select_backend;
pub use traits::BlobStore;
