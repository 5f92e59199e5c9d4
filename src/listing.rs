//! Directory listing model
//!
//! Turns a backend's raw children into the unified tabular model: an optional
//! `".."` pseudo-entry followed by children sorted by display name. The
//! listing is transient and recomputed on every request, never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{BackendEntry, StorageBackend};
use crate::error::FileManagerError;

/// Display name of the "navigate to parent" pseudo-entry.
pub const PARENT_ENTRY_NAME: &str = "..";

/// Kind of a listing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Folder,
}

/// One row in a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Display name (basename of `path`, or `".."`).
    pub name: String,
    /// Full backend-relative path; empty string denotes root.
    pub path: String,
    pub kind: EntryKind,
    /// Absent for the parent pseudo-entry and for backends that do not
    /// report folder mtimes.
    pub modified: Option<DateTime<Utc>>,
    /// Byte count; files only.
    pub size: Option<u64>,
    /// MIME type; files only.
    pub media_type: Option<String>,
}

impl FileEntry {
    /// The synthetic "go up one directory" row.
    pub fn parent(parent_of_current: impl Into<String>) -> Self {
        Self {
            name: PARENT_ENTRY_NAME.to_string(),
            path: parent_of_current.into(),
            kind: EntryKind::Folder,
            modified: None,
            size: None,
            media_type: None,
        }
    }

    fn from_backend(entry: BackendEntry) -> Self {
        let name = base_name(&entry.path).to_string();
        if entry.is_file {
            Self {
                name,
                path: entry.path,
                kind: EntryKind::File,
                modified: entry.modified,
                size: entry.size,
                media_type: entry.media_type,
            }
        } else {
            // Folders never carry a size or media type, whatever the backend
            // reported.
            Self {
                name,
                path: entry.path,
                kind: EntryKind::Folder,
                modified: entry.modified,
                size: None,
                media_type: None,
            }
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// Whether this is the `".."` pseudo-entry.
    pub fn is_parent(&self) -> bool {
        self.name == PARENT_ENTRY_NAME
    }

    /// File extension of the display name, if any.
    pub fn extension(&self) -> Option<&str> {
        if self.is_folder() {
            return None;
        }
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

/// Parent of a `/`-delimited backend path; a single segment parents to root.
pub fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

/// Join a base path and a child name (root base yields just the name).
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

/// Final `/`-delimited segment of a path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Produce the listing for `path` on `backend`.
///
/// Non-root paths get the `".."` pseudo-entry first; children follow, sorted
/// by display name ascending (case-sensitive byte order). One non-recursive
/// backend call; classification trusts the backend's own type reporting.
pub async fn list_directory(
    backend: &dyn StorageBackend,
    path: &str,
) -> Result<Vec<FileEntry>, FileManagerError> {
    let mut entries = Vec::new();
    if !path.is_empty() {
        entries.push(FileEntry::parent(parent_path(path)));
    }

    let children = backend
        .list(path)
        .await
        .map_err(|source| FileManagerError::listing(path, source))?;

    let mut rows: Vec<FileEntry> = children.into_iter().map(FileEntry::from_backend).collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    entries.extend(rows);

    debug!(path, rows = entries.len(), "Built directory listing");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testutil::MemoryBackend;
    use crate::backend::BackendError;

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("docs/images/cats"), "docs/images");
        assert_eq!(parent_path("docs"), "");
        assert_eq!(parent_path(""), "");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "docs"), "docs");
        assert_eq!(join_path("docs", "sub"), "docs/sub");
    }

    #[test]
    fn test_extension() {
        let file = FileEntry {
            name: "report.pdf".to_string(),
            path: "report.pdf".to_string(),
            kind: EntryKind::File,
            modified: None,
            size: Some(10),
            media_type: None,
        };
        assert_eq!(file.extension(), Some("pdf"));

        let no_ext = FileEntry {
            name: "Makefile".to_string(),
            ..file.clone()
        };
        assert_eq!(no_ext.extension(), None);

        let folder = FileEntry::parent("");
        assert_eq!(folder.extension(), None);
    }

    #[tokio::test]
    async fn test_root_listing_has_no_parent_entry() {
        let backend = MemoryBackend::new()
            .with_dir("images")
            .with_file("notes.txt", &[0u8; 500]);

        let entries = list_directory(&backend, "").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_parent()));

        // Scenario from the tabular model: folder first by name, sizes on
        // files only.
        assert_eq!(entries[0].name, "images");
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[0].size, None);
        assert_eq!(entries[1].name, "notes.txt");
        assert_eq!(entries[1].kind, EntryKind::File);
        assert_eq!(entries[1].size, Some(500));
    }

    #[tokio::test]
    async fn test_non_root_listing_has_parent_first() {
        let backend = MemoryBackend::new()
            .with_dir("docs")
            .with_dir("docs/images")
            .with_file("docs/b.txt", b"b")
            .with_file("docs/a.txt", b"a");

        let entries = list_directory(&backend, "docs").await.unwrap();
        assert_eq!(entries[0].name, "..");
        assert_eq!(entries[0].path, "");
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[0].size, None);
        assert_eq!(
            entries.iter().filter(|e| e.is_parent()).count(),
            1,
            "exactly one parent pseudo-entry"
        );

        let names: Vec<&str> = entries[1..].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "images"]);
    }

    #[tokio::test]
    async fn test_parent_entry_points_to_grandparent() {
        let backend = MemoryBackend::new()
            .with_dir("docs")
            .with_dir("docs/images")
            .with_dir("docs/images/cats");

        let entries = list_directory(&backend, "docs/images/cats").await.unwrap();
        assert_eq!(entries[0].path, "docs/images");
    }

    #[tokio::test]
    async fn test_empty_directory_lists_only_parent() {
        let backend = MemoryBackend::new().with_dir("empty");
        let entries = list_directory(&backend, "empty").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_parent());
    }

    #[tokio::test]
    async fn test_listing_is_idempotent() {
        let backend = MemoryBackend::new()
            .with_dir("docs")
            .with_file("docs/z.txt", b"z")
            .with_file("docs/a.txt", b"a");

        let first = list_directory(&backend, "docs").await.unwrap();
        let second = list_directory(&backend, "docs").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_listing_failed() {
        let backend = MemoryBackend::new();
        match list_directory(&backend, "missing").await {
            Err(FileManagerError::ListingFailed { path, source }) => {
                assert_eq!(path, "missing");
                assert!(matches!(source, BackendError::NotFound(_)));
            }
            other => panic!("expected ListingFailed, got {:?}", other),
        }
    }
}
