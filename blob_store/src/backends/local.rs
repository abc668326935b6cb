//! Local filesystem blob store backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::{BlobError, BlobResult, BlobStore};

/// Local filesystem blob store rooted at a directory.
///
/// Blob ids are used as paths relative to the root, so `a/b/c` ends up in
/// `<root>/a/b/c`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new local filesystem blob store, creating `root` if needed.
    pub async fn new(root: impl Into<PathBuf>) -> BlobResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Created local blob store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob id to a path under the root.
    ///
    /// Only plain relative segments are accepted, anything that could escape
    /// the root is rejected.
    fn path_for(&self, id: &str) -> BlobResult<PathBuf> {
        if id.is_empty() {
            return Err(BlobError::invalid_key(id, "id must not be empty"));
        }
        if id.contains('\0') {
            return Err(BlobError::invalid_key(id, "id must not contain NUL bytes"));
        }
        if id.contains('\\') {
            return Err(BlobError::invalid_key(id, "id must not contain backslashes"));
        }
        if id.starts_with('/') {
            return Err(BlobError::invalid_key(id, "id must be a relative path"));
        }

        // Checked on the raw string: `Path::components` folds `a/./b` and
        // `a//b` into `a/b`, which would alias distinct ids onto one file.
        if id
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(BlobError::invalid_key(
                id,
                "id must not contain empty, '.' or '..' segments",
            ));
        }

        let relative = Path::new(id);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(BlobError::invalid_key(id, "id must be a relative path"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, id: &str, data: Vec<u8>) -> BlobResult<()> {
        let path = self.path_for(id)?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> BlobResult<Option<Vec<u8>>> {
        let path = self.path_for(id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::Io { source: e }),
        }
    }
}
