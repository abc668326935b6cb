use std::fmt::{self, Display};

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Width of the `id` column in both blob tables.
pub const MAX_BLOB_ID_LEN: usize = 255;

/// Width of the nullable `backend` column in the metadata table.
pub const MAX_BACKEND_NAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBlobId {
    #[error("blob id must not be empty")]
    Empty,

    #[error("blob id is {len} bytes long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Caller chosen identifier of a blob.
///
/// The same string is used as the metadata primary key, the relational blob
/// key, the relative path under the local storage root and the object key in
/// the S3 bucket. Path safety is checked by the local backend, which is the
/// only place the id turns into a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobId(String);

impl BlobId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidBlobId> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidBlobId::Empty);
        }
        if id.len() > MAX_BLOB_ID_LEN {
            return Err(InvalidBlobId::TooLong {
                len: id.len(),
                max: MAX_BLOB_ID_LEN,
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BlobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata row written after the bytes of a blob are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    pub id: BlobId,
    /// Byte length of the most recently stored payload.
    pub size: u64,
    /// Name of the backend that was configured when the blob was written.
    pub backend: Option<String>,
    /// Set when the row is first inserted, never refreshed on overwrite.
    pub created_at: DateTime<Utc>,
}

/// Values supplied by the writer; `created_at` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlobMetadata {
    pub id: BlobId,
    pub size: u64,
    pub backend: Option<String>,
}

impl NewBlobMetadata {
    pub fn new(id: BlobId, size: u64, backend: &str) -> Self {
        let backend = truncate_to_char_boundary(backend, MAX_BACKEND_NAME_LEN);
        Self {
            id,
            size,
            backend: (!backend.is_empty()).then(|| backend.to_string()),
        }
    }
}

fn truncate_to_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Converts a stored epoch-milliseconds column back into a timestamp.
pub fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| anyhow!("timestamp out of range: {} ms", ms))
}

/// RFC 3339 in UTC with microsecond precision and a `Z` suffix, the form
/// timestamps take in API responses.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
