//! Browsing session and navigation controller
//!
//! One `Session` per active browsing context. It owns the current path and a
//! shared backend reference, validates every user intent before dispatching
//! it, and never updates navigation state speculatively: a failed mutation
//! leaves `current_path` and the previous listing untouched (stale listings
//! are re-fetched by the host, never auto-corrected).

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::{BackendError, StorageBackend, Visibility};
use crate::error::FileManagerError;
use crate::listing::{join_path, list_directory, EntryKind, FileEntry};

/// A file handed to `upload_files`: original filename plus content.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Per-entry outcome of a bulk delete. Successes are not rolled back when
/// other entries fail; there is no transactional guarantee.
#[derive(Debug, Default)]
pub struct BulkDeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, FileManagerError)>,
}

impl BulkDeleteReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-file outcome of an upload batch.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub stored: Vec<String>,
    pub failed: Vec<(String, FileManagerError)>,
}

impl UploadReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One user's browsing context over a configured backend.
pub struct Session {
    backend: Arc<dyn StorageBackend>,
    current_path: String,
    path_tx: watch::Sender<String>,
}

impl Session {
    /// Start a session at the backend root.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_path(backend, "")
    }

    /// Start a session at a specific path (e.g. restored from a URL).
    pub fn with_path(backend: Arc<dyn StorageBackend>, path: impl Into<String>) -> Self {
        let current_path = path.into();
        let (path_tx, _) = watch::channel(current_path.clone());
        Self {
            backend,
            current_path,
            path_tx,
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Table heading for the current location; root displays as "Root".
    pub fn heading(&self) -> String {
        if self.current_path.is_empty() {
            "Root".to_string()
        } else {
            self.current_path.clone()
        }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Subscribe to "path changed" notifications so the host can re-render
    /// after navigation.
    pub fn watch_path(&self) -> watch::Receiver<String> {
        self.path_tx.subscribe()
    }

    /// Listing of the current directory.
    pub async fn list(&self) -> Result<Vec<FileEntry>, FileManagerError> {
        list_directory(self.backend.as_ref(), &self.current_path).await
    }

    /// Navigate into a folder entry (including the `".."` pseudo-entry).
    ///
    /// Files are a no-op returning `false`. On navigation the path watchers
    /// are notified; the host re-derives the listing via [`Session::list`].
    pub fn open(&mut self, entry: &FileEntry) -> bool {
        if !entry.is_folder() {
            return false;
        }
        self.current_path = entry.path.clone();
        let _ = self.path_tx.send(self.current_path.clone());
        info!(path = %self.heading(), "Opened folder");
        true
    }

    /// Delete a single entry. The `".."` pseudo-entry is rejected before any
    /// backend call; folders are removed recursively.
    pub async fn delete(&self, entry: &FileEntry) -> Result<(), FileManagerError> {
        if entry.is_parent() {
            warn!("Rejected delete of the parent pseudo-entry");
            return Err(FileManagerError::DeleteFailed {
                path: entry.path.clone(),
                source: BackendError::InvalidPath(
                    "the parent pseudo-entry cannot be deleted".to_string(),
                ),
            });
        }

        let result = if entry.is_folder() {
            self.backend.delete_directory(&entry.path).await
        } else {
            self.backend.delete(&entry.path).await
        };
        result.map_err(|source| FileManagerError::delete(entry.path.clone(), source))?;

        info!(path = %entry.path, folder = entry.is_folder(), "Deleted entry");
        Ok(())
    }

    /// Delete each entry independently, in sequence. Partial failure is
    /// reported per entry and does not roll back successes.
    pub async fn bulk_delete(&self, entries: &[FileEntry]) -> BulkDeleteReport {
        let mut report = BulkDeleteReport::default();
        for entry in entries {
            match self.delete(entry).await {
                Ok(()) => report.deleted.push(entry.path.clone()),
                Err(err) => report.failed.push((entry.path.clone(), err)),
            }
        }
        if !report.failed.is_empty() {
            warn!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "Bulk delete finished with failures"
            );
        }
        report
    }

    /// Create a folder named `name` under the current path and return its
    /// full path. The backend may still reject names reserved or duplicated
    /// by its own namespace rules.
    pub async fn create_folder(&self, name: &str) -> Result<String, FileManagerError> {
        let target = join_path(&self.current_path, name);
        if let Err(source) = validate_component(name) {
            return Err(FileManagerError::CreateFolderFailed {
                path: target,
                source,
            });
        }

        self.backend
            .make_directory(&target)
            .await
            .map_err(|source| FileManagerError::create_folder(target.clone(), source))?;

        info!(path = %target, "Created folder");
        Ok(target)
    }

    /// Store each file under the current path, preserving filenames verbatim.
    /// An existing file with the same name is silently overwritten.
    pub async fn upload_files(&self, files: &[UploadFile]) -> UploadReport {
        let mut report = UploadReport::default();
        for file in files {
            if let Err(source) = validate_component(&file.name) {
                report
                    .failed
                    .push((file.name.clone(), FileManagerError::upload(file.name.clone(), source)));
                continue;
            }
            let target = join_path(&self.current_path, &file.name);
            match self.backend.put(&target, &file.bytes).await {
                Ok(()) => {
                    info!(path = %target, size = file.bytes.len(), "Stored upload");
                    report.stored.push(target);
                }
                Err(source) => {
                    report
                        .failed
                        .push((file.name.clone(), FileManagerError::upload(file.name.clone(), source)));
                }
            }
        }
        report
    }

    /// Whether the entry can be opened directly in a browser: files only,
    /// existing on the backend and publicly visible. Gates "open" affordances,
    /// not navigation.
    pub async fn can_open_directly(&self, entry: &FileEntry) -> bool {
        if entry.kind != EntryKind::File {
            return false;
        }
        match self.backend.exists(&entry.path).await {
            Ok(true) => {}
            _ => return false,
        }
        matches!(
            self.backend.visibility(&entry.path).await,
            Ok(Visibility::Public)
        )
    }

    /// Browser URL for an entry passing [`Session::can_open_directly`].
    pub async fn open_url(&self, entry: &FileEntry) -> Option<String> {
        if !self.can_open_directly(entry).await {
            return None;
        }
        self.backend.url(&entry.path).await.ok()
    }

    /// Fetch a file's content for a host-driven download action.
    pub async fn download(&self, entry: &FileEntry) -> Result<Vec<u8>, FileManagerError> {
        if entry.is_folder() {
            return Err(FileManagerError::DownloadFailed {
                path: entry.path.clone(),
                source: BackendError::InvalidPath("cannot download a folder".to_string()),
            });
        }
        self.backend
            .download(&entry.path)
            .await
            .map_err(|source| FileManagerError::download(entry.path.clone(), source))
    }
}

/// Validate a user-supplied name that must stay a single path segment.
fn validate_component(name: &str) -> Result<(), BackendError> {
    if name.trim().is_empty() {
        return Err(BackendError::InvalidPath("name must not be empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(BackendError::InvalidPath(format!(
            "name '{}' contains path separators",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(BackendError::InvalidPath(format!("name '{}' is reserved", name)));
    }
    Ok(())
}
