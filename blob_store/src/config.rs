//! Blob storage configuration.

use std::env;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The backend family selected by the `backend` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageKind {
    #[default]
    Local,
    Db,
    S3,
}

impl StorageKind {
    /// Maps a configuration value to a backend family. Anything that is not
    /// `db` or `s3`, including an empty value, selects the local backend.
    pub fn from_config_value(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }
}

/// Configuration for blob storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStorageConfig {
    /// `local`, `db` or `s3`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Root directory of the local backend.
    #[serde(default = "default_blob_store_path")]
    pub local_path: String,

    #[serde(default)]
    pub s3: S3Config,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            local_path: default_blob_store_path(),
            s3: S3Config::default(),
        }
    }
}

impl BlobStorageConfig {
    pub fn kind(&self) -> StorageKind {
        StorageKind::from_config_value(&self.backend)
    }
}

/// Endpoint and credentials of an S3-compatible object store.
///
/// Empty strings are treated the same as absent values so that blank
/// environment variables do not enable signing with an empty key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Base URL, e.g. `https://s3.eu-west-1.amazonaws.com` or `http://localhost:9000`.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    /// Detected from the endpoint host when unset.
    #[serde(default)]
    pub region: Option<String>,

    /// Use `bucket.host/key` addressing instead of `host/bucket/key`.
    #[serde(default)]
    pub virtual_host: bool,
}

impl S3Config {
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(&self.endpoint)
    }

    pub fn bucket(&self) -> Option<&str> {
        non_empty(&self.bucket)
    }

    pub fn access_key(&self) -> Option<&str> {
        non_empty(&self.access_key)
    }

    pub fn secret_key(&self) -> Option<&str> {
        non_empty(&self.secret_key)
    }

    pub fn region(&self) -> Option<&str> {
        non_empty(&self.region)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn default_backend() -> String {
    StorageKind::Local.to_string()
}

/// Default blob store path (local filesystem).
pub fn default_blob_store_path() -> String {
    env::current_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join("blobgate_storage/blobs")
        .to_str()
        .unwrap_or("./blobgate_storage/blobs")
        .to_string()
}
