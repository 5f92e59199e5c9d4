//! Storage backends
//!
//! A unified abstraction over hierarchical byte-stores. Every backend
//! implements the `StorageBackend` trait, so the listing and session layers
//! work against local disks and remote providers through one interface.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            StorageBackend trait          │
//! │  list, exists, put, delete, mkdir, url   │
//! └──────────────────────────────────────────┘
//!                     │
//!            ┌────────┴────────┐
//!            ▼                 ▼
//!      ┌──────────┐     ┌────────────┐
//!      │  Local   │     │  OneDrive  │
//!      └──────────┘     └────────────┘
//! ```

pub mod auth;
pub mod local;
pub mod onedrive;
pub mod types;

pub use local::LocalBackend;
pub use onedrive::OneDriveBackend;
pub use types::{BackendEntry, BackendError, Visibility};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::DiskConfig;

/// Unified storage backend trait
///
/// All methods take `&self` so a browsing session can hold the backend behind
/// `Arc<dyn StorageBackend>`; adapters use interior mutability for any cached
/// state (e.g. OAuth tokens).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logs and UI headings.
    fn display_name(&self) -> String;

    /// List the direct (non-recursive) children of `path`. Root is `""`.
    async fn list(&self, path: &str) -> Result<Vec<BackendEntry>, BackendError>;

    /// Check whether `path` exists.
    async fn exists(&self, path: &str) -> Result<bool, BackendError>;

    /// Report the visibility of the object at `path`.
    async fn visibility(&self, path: &str) -> Result<Visibility, BackendError>;

    /// Delete a single file.
    async fn delete(&self, path: &str) -> Result<(), BackendError>;

    /// Delete a directory and everything beneath it.
    async fn delete_directory(&self, path: &str) -> Result<(), BackendError>;

    /// Create a directory (parents included).
    async fn make_directory(&self, path: &str) -> Result<(), BackendError>;

    /// Write `bytes` to `path`, creating or overwriting the file.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BackendError>;

    /// Read the full content of the file at `path`.
    async fn download(&self, path: &str) -> Result<Vec<u8>, BackendError>;

    /// Browser-openable URL for a public file at `path`.
    async fn url(&self, path: &str) -> Result<String, BackendError>;
}

/// Percent-encode each `/`-separated segment of a backend path for use in a
/// URL, keeping the separators.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build a backend from a disk configuration.
///
/// Dispatches on the `driver` tag; each adapter validates its own fields.
pub fn create_backend(config: &DiskConfig) -> Result<Arc<dyn StorageBackend>, BackendError> {
    let backend: Arc<dyn StorageBackend> = match config {
        DiskConfig::Local(cfg) => Arc::new(LocalBackend::new(cfg)),
        DiskConfig::OneDrive(cfg) => Arc::new(OneDriveBackend::new(cfg)?),
    };
    info!("Configured storage backend: {}", backend.display_name());
    Ok(backend)
}

#[cfg(test)]
pub(crate) mod testutil {
    //! In-memory backend used by listing and session tests.

    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::listing::parent_path;

    /// In-memory `StorageBackend` with per-path visibility overrides and a
    /// delete-call counter for "never contacted the backend" assertions.
    #[derive(Default)]
    pub struct MemoryBackend {
        files: Mutex<BTreeMap<String, Vec<u8>>>,
        dirs: Mutex<BTreeSet<String>>,
        private_paths: Mutex<BTreeSet<String>>,
        pub delete_calls: AtomicUsize,
    }

    impl MemoryBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            self
        }

        pub fn with_dir(self, path: &str) -> Self {
            self.dirs.lock().unwrap().insert(path.to_string());
            self
        }

        pub fn with_private(self, path: &str) -> Self {
            self.private_paths.lock().unwrap().insert(path.to_string());
            self
        }

        pub fn delete_calls(&self) -> usize {
            self.delete_calls.load(Ordering::SeqCst)
        }

        fn contains_dir(&self, path: &str) -> bool {
            self.dirs.lock().unwrap().contains(path)
        }
    }

    #[async_trait]
    impl StorageBackend for MemoryBackend {
        fn display_name(&self) -> String {
            "memory".to_string()
        }

        async fn list(&self, path: &str) -> Result<Vec<BackendEntry>, BackendError> {
            if !path.is_empty() && !self.contains_dir(path) {
                return Err(BackendError::NotFound(path.to_string()));
            }
            let mut entries = Vec::new();
            for dir in self.dirs.lock().unwrap().iter() {
                if parent_path(dir) == path {
                    entries.push(BackendEntry::directory(dir.clone()));
                }
            }
            for (file, bytes) in self.files.lock().unwrap().iter() {
                if parent_path(file) == path {
                    entries.push(BackendEntry::file(file.clone(), bytes.len() as u64));
                }
            }
            Ok(entries)
        }

        async fn exists(&self, path: &str) -> Result<bool, BackendError> {
            Ok(self.files.lock().unwrap().contains_key(path) || self.contains_dir(path))
        }

        async fn visibility(&self, path: &str) -> Result<Visibility, BackendError> {
            if self.private_paths.lock().unwrap().contains(path) {
                Ok(Visibility::Private)
            } else {
                Ok(Visibility::Public)
            }
        }

        async fn delete(&self, path: &str) -> Result<(), BackendError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.files
                .lock()
                .unwrap()
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| BackendError::NotFound(path.to_string()))
        }

        async fn delete_directory(&self, path: &str) -> Result<(), BackendError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if !self.contains_dir(path) {
                return Err(BackendError::NotFound(path.to_string()));
            }
            let prefix = format!("{}/", path);
            self.dirs
                .lock()
                .unwrap()
                .retain(|d| d != path && !d.starts_with(&prefix));
            self.files
                .lock()
                .unwrap()
                .retain(|f, _| !f.starts_with(&prefix));
            Ok(())
        }

        async fn make_directory(&self, path: &str) -> Result<(), BackendError> {
            if path.is_empty() {
                return Err(BackendError::InvalidPath("empty path".to_string()));
            }
            self.dirs.lock().unwrap().insert(path.to_string());
            Ok(())
        }

        async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BackendError> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn download(&self, path: &str) -> Result<Vec<u8>, BackendError> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(path.to_string()))
        }

        async fn url(&self, path: &str) -> Result<String, BackendError> {
            Ok(format!("https://files.example.test/{}", path))
        }
    }
}
