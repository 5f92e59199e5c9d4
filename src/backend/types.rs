//! Shared types for storage backends
//!
//! Raw entry representation, visibility reporting, and the backend-level
//! error taxonomy shared by all adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Visibility of a stored object, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Reachable without credentials (e.g. via `url()`).
    Public,
    /// Requires backend credentials to read.
    Private,
}

/// Raw child record returned by a backend's non-recursive listing.
///
/// Unified representation across adapters; display concerns (names, parent
/// pseudo-entries, ordering) are layered on top by `listing::list_directory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendEntry {
    /// Full backend-relative path (root = `""`).
    pub path: String,
    /// Whether this is a file (folders otherwise).
    pub is_file: bool,
    /// File size in bytes; `None` for folders.
    pub size: Option<u64>,
    /// Last modification time, if the backend reports one.
    pub modified: Option<DateTime<Utc>>,
    /// MIME type for files, if known.
    pub media_type: Option<String>,
}

impl BackendEntry {
    /// Create a file entry with the given size.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_file: true,
            size: Some(size),
            modified: None,
            media_type: None,
        }
    }

    /// Create a folder entry.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_file: false,
            size: None,
            modified: None,
            media_type: None,
        }
    }

    /// Attach a modification time.
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Attach a MIME type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Errors surfaced by storage backends
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Map a reqwest failure onto the backend taxonomy. Timeouts are kept
    /// distinct so callers can tell a hung provider from a refused one.
    pub fn from_http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::NetworkError(err.to_string())
        }
    }

    /// Whether this failure came from the authentication layer.
    pub fn is_authentication(&self) -> bool {
        matches!(self, BackendError::AuthenticationFailed(_))
    }
}
