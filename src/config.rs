//! Disk configuration
//!
//! Serde model for configuring a storage backend, tagged by `driver`. Loaded
//! from a JSON file or assembled by the host; secrets are held as
//! `SecretString` and never serialized back out.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::backend::auth::DEFAULT_TOKEN_ENDPOINT_BASE;
use crate::backend::{BackendError, Visibility};

/// Configuration for one storage disk, dispatched on the `driver` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DiskConfig {
    Local(LocalDiskConfig),
    OneDrive(OneDriveDiskConfig),
}

impl DiskConfig {
    /// Load a disk configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| {
            BackendError::ParseError(format!(
                "invalid disk config {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

/// Local filesystem disk.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalDiskConfig {
    /// Directory all backend paths resolve under.
    pub root: PathBuf,
    /// Display name for logs and UI headings.
    #[serde(default)]
    pub label: Option<String>,
    /// Visibility reported for every object on this disk.
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    /// Base URL for `url()`; without it "open in browser" is unsupported.
    #[serde(default)]
    pub public_url_base: Option<String>,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

/// OneDrive disk addressed via Microsoft Graph with app-only credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct OneDriveDiskConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Graph drive to browse.
    pub drive_id: String,
    /// Folder inside the drive acting as the backend root.
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Bound on every Graph/token request so a stuck provider surfaces as a
    /// timeout instead of a hang.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_token_endpoint_base")]
    pub token_endpoint_base: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_token_endpoint_base() -> String {
    DEFAULT_TOKEN_ENDPOINT_BASE.to_string()
}
