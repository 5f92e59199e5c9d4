//! Local disk backend
//!
//! Adapter over a directory on the local filesystem using `tokio::fs`.
//! Backend-relative paths are validated before resolution so a listing request
//! can never escape the configured root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::types::{BackendEntry, BackendError, Visibility};
use super::{encode_path, StorageBackend};
use crate::config::LocalDiskConfig;

/// Maximum accepted backend-relative path length.
const MAX_PATH_LEN: usize = 4096;

/// Storage backend rooted at a local directory.
pub struct LocalBackend {
    root: PathBuf,
    label: String,
    visibility: Visibility,
    public_url_base: Option<String>,
}

impl LocalBackend {
    pub fn new(config: &LocalDiskConfig) -> Self {
        Self {
            root: config.root.clone(),
            label: config.label.clone().unwrap_or_else(|| "local".to_string()),
            visibility: config.visibility,
            public_url_base: config.public_url_base.clone(),
        }
    }

    /// Validate a backend-relative path. Rejects null bytes, `..` traversal,
    /// absolute paths, and excessive length.
    fn validate(path: &str) -> Result<(), BackendError> {
        if path.len() > MAX_PATH_LEN {
            return Err(BackendError::InvalidPath(format!(
                "path exceeds {} characters",
                MAX_PATH_LEN
            )));
        }
        if path.contains('\0') {
            return Err(BackendError::InvalidPath(
                "path contains null bytes".to_string(),
            ));
        }
        for component in Path::new(path).components() {
            match component {
                Component::ParentDir => {
                    return Err(BackendError::InvalidPath(
                        "path traversal ('..') not allowed".to_string(),
                    ))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(BackendError::InvalidPath(
                        "absolute paths not allowed".to_string(),
                    ))
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve a backend-relative path under the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        Self::validate(path)?;
        if path.is_empty() {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(path))
        }
    }
}

/// Translate an I/O failure into the backend taxonomy, keeping the
/// backend-relative path in the message rather than the absolute one.
fn io_error(path: &str, err: std::io::Error) -> BackendError {
    match err.kind() {
        ErrorKind::NotFound => BackendError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => BackendError::PermissionDenied(path.to_string()),
        ErrorKind::AlreadyExists => BackendError::AlreadyExists(path.to_string()),
        _ => BackendError::Io(err),
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn display_name(&self) -> String {
        self.label.clone()
    }

    async fn list(&self, path: &str) -> Result<Vec<BackendEntry>, BackendError> {
        let dir = self.resolve(path)?;
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error(path, e))?;

        let mut entries = Vec::new();
        while let Some(dirent) = reader.next_entry().await.map_err(|e| io_error(path, e))? {
            let name = dirent.file_name().to_string_lossy().to_string();
            let child_path = if path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", path, name)
            };
            // Follows symlinks so a link to a file lists as a file. Dangling
            // links and children unreadable mid-enumeration are skipped
            // instead of failing the whole listing.
            let meta = match tokio::fs::metadata(dirent.path()).await {
                Ok(meta) => meta,
                Err(err) => {
                    warn!(path = %child_path, error = %err, "Skipping unreadable entry");
                    continue;
                }
            };

            let mut entry = if meta.is_file() {
                let mut file = BackendEntry::file(child_path, meta.len());
                if let Some(mime) = mime_guess::from_path(&name).first_raw() {
                    file = file.with_media_type(mime);
                }
                file
            } else {
                BackendEntry::directory(child_path)
            };
            if let Ok(modified) = meta.modified() {
                entry = entry.with_modified(DateTime::<Utc>::from(modified));
            }
            entries.push(entry);
        }

        debug!(path, count = entries.len(), "Listed local directory");
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool, BackendError> {
        let target = self.resolve(path)?;
        tokio::fs::try_exists(&target)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn visibility(&self, path: &str) -> Result<Visibility, BackendError> {
        Self::validate(path)?;
        Ok(self.visibility)
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn delete_directory(&self, path: &str) -> Result<(), BackendError> {
        if path.is_empty() {
            return Err(BackendError::InvalidPath(
                "refusing to delete the disk root".to_string(),
            ));
        }
        let target = self.resolve(path)?;
        tokio::fs::remove_dir_all(&target)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn make_directory(&self, path: &str) -> Result<(), BackendError> {
        if path.is_empty() {
            return Err(BackendError::InvalidPath("empty path".to_string()));
        }
        let target = self.resolve(path)?;
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BackendError> {
        if path.is_empty() {
            return Err(BackendError::InvalidPath("empty path".to_string()));
        }
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target).await.map_err(|e| io_error(path, e))
    }

    async fn url(&self, path: &str) -> Result<String, BackendError> {
        Self::validate(path)?;
        let base = self.public_url_base.as_ref().ok_or_else(|| {
            BackendError::NotSupported("no public URL base configured for this disk".to_string())
        })?;
        Ok(format!("{}/{}", base.trim_end_matches('/'), encode_path(path)))
    }
}
