//! Operation-level errors surfaced to the host application.

use thiserror::Error;

use crate::backend::BackendError;

/// Failure of a file-manager operation, carrying the path or filename it was
/// attempted on. Authentication failures from the backend layer are surfaced
/// as their own kind regardless of which operation tripped them; they resolve
/// naturally on the next call via lazy token refresh.
#[derive(Debug, Error)]
pub enum FileManagerError {
    #[error("Listing failed for '{path}'")]
    ListingFailed {
        path: String,
        #[source]
        source: BackendError,
    },

    #[error("Delete failed for '{path}'")]
    DeleteFailed {
        path: String,
        #[source]
        source: BackendError,
    },

    #[error("Create folder failed for '{path}'")]
    CreateFolderFailed {
        path: String,
        #[source]
        source: BackendError,
    },

    #[error("Upload failed for '{filename}'")]
    UploadFailed {
        filename: String,
        #[source]
        source: BackendError,
    },

    #[error("Download failed for '{path}'")]
    DownloadFailed {
        path: String,
        #[source]
        source: BackendError,
    },

    #[error("Authentication failed")]
    AuthenticationFailed {
        #[source]
        source: BackendError,
    },
}

impl FileManagerError {
    pub(crate) fn listing(path: impl Into<String>, source: BackendError) -> Self {
        if source.is_authentication() {
            return Self::AuthenticationFailed { source };
        }
        Self::ListingFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn delete(path: impl Into<String>, source: BackendError) -> Self {
        if source.is_authentication() {
            return Self::AuthenticationFailed { source };
        }
        Self::DeleteFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn create_folder(path: impl Into<String>, source: BackendError) -> Self {
        if source.is_authentication() {
            return Self::AuthenticationFailed { source };
        }
        Self::CreateFolderFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn upload(filename: impl Into<String>, source: BackendError) -> Self {
        if source.is_authentication() {
            return Self::AuthenticationFailed { source };
        }
        Self::UploadFailed {
            filename: filename.into(),
            source,
        }
    }

    pub(crate) fn download(path: impl Into<String>, source: BackendError) -> Self {
        if source.is_authentication() {
            return Self::AuthenticationFailed { source };
        }
        Self::DownloadFailed {
            path: path.into(),
            source,
        }
    }
}
