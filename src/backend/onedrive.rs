//! OneDrive storage backend
//!
//! Adapter over the Microsoft Graph API, addressing a single configured drive
//! with app-only (client-credentials) authentication. Bearer tokens come from
//! the session-scoped `TokenCache` and are refreshed lazily.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::auth::{ClientCredentials, TokenCache};
use super::types::{BackendEntry, BackendError, Visibility};
use super::{encode_path, StorageBackend};
use crate::config::OneDriveDiskConfig;

/// Microsoft Graph API base URL
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Drive item metadata (fields needed for API response deserialization)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    name: String,
    #[serde(default)]
    size: u64,
    last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    folder: Option<FolderFacet>,
    #[serde(default)]
    file: Option<FileFacet>,
    #[serde(default)]
    shared: Option<SharedFacet>,
    web_url: Option<String>,
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FolderFacet {
    #[allow(dead_code)]
    child_count: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FileFacet {
    mime_type: Option<String>,
}

/// Present when the item has been shared (anonymous or organization link).
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SharedFacet {
    #[allow(dead_code)]
    scope: Option<String>,
}

/// List children response
#[derive(Debug, Deserialize)]
struct ChildrenResponse {
    value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// OneDrive storage backend over a single Graph drive.
pub struct OneDriveBackend {
    drive_id: String,
    root: String,
    label: String,
    client: reqwest::Client,
    tokens: TokenCache,
}

impl OneDriveBackend {
    pub fn new(config: &OneDriveDiskConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Other(format!("HTTP client build failed: {}", e)))?;

        let credentials = ClientCredentials {
            tenant_id: config.tenant_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            endpoint_base: config.token_endpoint_base.clone(),
        };

        Ok(Self {
            drive_id: config.drive_id.clone(),
            root: config.root.trim_matches('/').to_string(),
            label: config
                .label
                .clone()
                .unwrap_or_else(|| "OneDrive".to_string()),
            tokens: TokenCache::new(credentials, client.clone()),
            client,
        })
    }

    /// Authorization header from the (lazily refreshed) token cache.
    async fn auth_header(&self) -> Result<HeaderValue, BackendError> {
        let token = self.tokens.get_token().await?;
        HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| BackendError::Other(format!("Invalid token: {}", e)))
    }

    fn drive_base(&self) -> String {
        format!("{}/drives/{}", GRAPH_API_BASE, self.drive_id)
    }

    /// Backend-relative path prefixed with the configured root folder.
    fn full_path(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        match (self.root.is_empty(), path.is_empty()) {
            (true, _) => path.to_string(),
            (false, true) => self.root.clone(),
            (false, false) => format!("{}/{}", self.root, path),
        }
    }

    /// Item address for a path (`/root` for the drive root, `:`-addressed
    /// otherwise).
    fn item_url(&self, path: &str) -> String {
        let full = self.full_path(path);
        if full.is_empty() {
            format!("{}/root", self.drive_base())
        } else {
            format!("{}/root:/{}", self.drive_base(), encode_path(&full))
        }
    }

    fn children_url(&self, path: &str) -> String {
        let full = self.full_path(path);
        if full.is_empty() {
            format!("{}/root/children", self.drive_base())
        } else {
            format!("{}/root:/{}:/children", self.drive_base(), encode_path(&full))
        }
    }

    fn content_url(&self, path: &str) -> String {
        format!(
            "{}/root:/{}:/content",
            self.drive_base(),
            encode_path(&self.full_path(path))
        )
    }

    /// Fetch item metadata for a backend-relative path.
    async fn get_item(&self, path: &str) -> Result<DriveItem, BackendError> {
        let response = self
            .client
            .get(self.item_url(path))
            .header(AUTHORIZATION, self.auth_header().await?)
            .send()
            .await
            .map_err(BackendError::from_http)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error("stat", path, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))
    }

    fn to_backend_entry(&self, item: &DriveItem, parent: &str) -> BackendEntry {
        let path = if parent.is_empty() {
            item.name.clone()
        } else {
            format!("{}/{}", parent, item.name)
        };
        let mut entry = if item.folder.is_some() {
            BackendEntry::directory(path)
        } else {
            let mut file = BackendEntry::file(path, item.size);
            if let Some(mime) = item.file.as_ref().and_then(|f| f.mime_type.clone()) {
                file = file.with_media_type(mime);
            }
            file
        };
        if let Some(modified) = item.last_modified_date_time {
            entry = entry.with_modified(modified);
        }
        entry
    }
}

/// Non-2xx Graph response to a backend error, mapping the well-known codes.
async fn api_error(op: &str, path: &str, response: reqwest::Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(path.to_string()),
        StatusCode::CONFLICT => BackendError::AlreadyExists(path.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::AuthenticationFailed(format!("{} rejected: {}", op, body))
        }
        _ => BackendError::Other(format!("Graph {} error ({}): {}", op, status, body)),
    }
}

#[async_trait]
impl StorageBackend for OneDriveBackend {
    fn display_name(&self) -> String {
        self.label.clone()
    }

    async fn list(&self, path: &str) -> Result<Vec<BackendEntry>, BackendError> {
        let mut entries = Vec::new();
        let mut url = self.children_url(path);
        let parent = path.trim_matches('/').to_string();

        loop {
            let response = self
                .client
                .get(&url)
                .header(AUTHORIZATION, self.auth_header().await?)
                .send()
                .await
                .map_err(BackendError::from_http)?;

            if !response.status().is_success() {
                return Err(api_error("list", path, response).await);
            }

            let page: ChildrenResponse = response
                .json()
                .await
                .map_err(|e| BackendError::ParseError(e.to_string()))?;

            entries.extend(page.value.iter().map(|i| self.to_backend_entry(i, &parent)));

            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(path, count = entries.len(), "Listed drive children");
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool, BackendError> {
        match self.get_item(path).await {
            Ok(_) => Ok(true),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn visibility(&self, path: &str) -> Result<Visibility, BackendError> {
        let item = self.get_item(path).await?;
        if item.shared.is_some() {
            Ok(Visibility::Public)
        } else {
            Ok(Visibility::Private)
        }
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.item_url(path))
            .header(AUTHORIZATION, self.auth_header().await?)
            .send()
            .await
            .map_err(BackendError::from_http)?;

        if !response.status().is_success() {
            return Err(api_error("delete", path, response).await);
        }
        info!(path, "Deleted drive item");
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> Result<(), BackendError> {
        // Graph removes folders recursively with the same DELETE.
        self.delete(path).await
    }

    async fn make_directory(&self, path: &str) -> Result<(), BackendError> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(BackendError::InvalidPath("empty path".to_string()));
        }
        let (parent, name) = match trimmed.rfind('/') {
            Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
            None => ("", trimmed),
        };

        let body = serde_json::json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });

        let response = self
            .client
            .post(self.children_url(parent))
            .header(AUTHORIZATION, self.auth_header().await?)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(BackendError::from_http)?;

        if !response.status().is_success() {
            return Err(api_error("mkdir", path, response).await);
        }
        info!(path, "Created drive folder");
        Ok(())
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BackendError> {
        if path.trim_matches('/').is_empty() {
            return Err(BackendError::InvalidPath("empty path".to_string()));
        }
        let response = self
            .client
            .put(self.content_url(path))
            .header(AUTHORIZATION, self.auth_header().await?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(BackendError::from_http)?;

        if !response.status().is_success() {
            return Err(api_error("upload", path, response).await);
        }
        info!(path, size = bytes.len(), "Uploaded drive item");
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .get(self.content_url(path))
            .header(AUTHORIZATION, self.auth_header().await?)
            .send()
            .await
            .map_err(BackendError::from_http)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error("download", path, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(BackendError::from_http)?;
        Ok(bytes.to_vec())
    }

    async fn url(&self, path: &str) -> Result<String, BackendError> {
        let item = self.get_item(path).await?;
        item.web_url
            .or(item.download_url)
            .ok_or_else(|| BackendError::Other(format!("no web URL for '{}'", path)))
    }
}
