//! OAuth2 client-credentials token cache
//!
//! Remote backends authenticate with an app-only bearer token minted from the
//! tenant's token endpoint. Tokens are cached per session and refreshed
//! lazily: nothing happens until the next operation after expiry.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

use super::types::BackendError;

/// Default token endpoint base (Microsoft identity platform).
pub const DEFAULT_TOKEN_ENDPOINT_BASE: &str = "https://login.microsoftonline.com";

/// Fixed scope for app-only Graph access.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Treat tokens expiring within this window as already expired, so a token
/// cannot die mid-request.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Client-credentials grant inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Overridable for tests and sovereign clouds.
    #[serde(default = "default_endpoint_base")]
    pub endpoint_base: String,
}

fn default_endpoint_base() -> String {
    DEFAULT_TOKEN_ENDPOINT_BASE.to_string()
}

impl ClientCredentials {
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.endpoint_base.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

/// A cached bearer token with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Expired (or about to be) relative to now.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Token endpoint response; any other shape is an authentication failure.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Session-scoped cache around the client-credentials exchange.
///
/// The cached slot sits behind a mutex so two concurrent operations on the
/// same session cannot both trigger a redundant exchange.
pub struct TokenCache {
    credentials: ClientCredentials,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(credentials: ClientCredentials, client: reqwest::Client) -> Self {
        Self {
            credentials,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, exchanging credentials only when the
    /// cached one is absent or expired.
    pub async fn get_token(&self) -> Result<SecretString, BackendError> {
        let mut slot = self.cached.lock().await;
        if let Some(token) = slot.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.exchange().await?;
        let access = token.access_token.clone();
        *slot = Some(token);
        Ok(access)
    }

    /// One form-encoded POST against the tenant's token endpoint.
    async fn exchange(&self) -> Result<CachedToken, BackendError> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
            ("client_secret", self.credentials.client_secret.expose_secret()),
        ];

        let response = self
            .client
            .post(self.credentials.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                BackendError::AuthenticationFailed(format!("token endpoint unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::AuthenticationFailed(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            BackendError::AuthenticationFailed(format!("malformed token response: {}", e))
        })?;

        let expires_at = Utc::now() + Duration::seconds(body.expires_in);
        info!(
            tenant = %self.credentials.tenant_id,
            expires_at = %expires_at,
            "Acquired access token"
        );

        Ok(CachedToken {
            access_token: SecretString::from(body.access_token),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(endpoint_base: &str) -> ClientCredentials {
        ClientCredentials {
            tenant_id: "tenant-1".to_string(),
            client_id: "client-1".to_string(),
            client_secret: SecretString::from("s3cret".to_string()),
            endpoint_base: endpoint_base.to_string(),
        }
    }

    #[test]
    fn test_token_url() {
        let creds = credentials("https://login.microsoftonline.com/");
        assert_eq!(
            creds.token_url(),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_is_expired_with_margin() {
        let live = CachedToken {
            access_token: SecretString::from("t".to_string()),
            expires_at: Utc::now() + Duration::seconds(3600),
        };
        assert!(!live.is_expired());

        let stale = CachedToken {
            access_token: SecretString::from("t".to_string()),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        assert!(stale.is_expired());

        // Inside the safety margin counts as expired.
        let dying = CachedToken {
            access_token: SecretString::from("t".to_string()),
            expires_at: Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS / 2),
        };
        assert!(dying.is_expired());
    }

    #[tokio::test]
    async fn test_cached_token_is_returned_without_network() {
        // Endpoint points nowhere: any exchange attempt would fail loudly.
        let cache = TokenCache::new(credentials("http://127.0.0.1:9"), reqwest::Client::new());
        *cache.cached.lock().await = Some(CachedToken {
            access_token: SecretString::from("cached-token".to_string()),
            expires_at: Utc::now() + Duration::seconds(3600),
        });

        let token = cache.get_token().await.unwrap();
        assert_eq!(token.expose_secret(), "cached-token");
    }

    #[tokio::test]
    async fn test_successful_exchange_is_cached_for_reuse() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Canned token endpoint on an ephemeral port, counting hits.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        let served = hits.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                served.fetch_add(1, Ordering::SeqCst);
                let mut buffer = vec![0u8; 4096];
                let _ = socket.read(&mut buffer).await;
                let body = r#"{"access_token":"fresh-token","expires_in":3600}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        let cache = TokenCache::new(
            credentials(&format!("http://127.0.0.1:{}", port)),
            reqwest::Client::new(),
        );

        let first = cache.get_token().await.unwrap();
        assert_eq!(first.expose_secret(), "fresh-token");

        // Second call must reuse the cached slot without a second exchange.
        let second = cache.get_token().await.unwrap();
        assert_eq!(second.expose_secret(), "fresh-token");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let slot = cache.cached.lock().await;
        assert!(slot.as_ref().is_some_and(|t| !t.is_expired()));
    }

    #[tokio::test]
    async fn test_expired_token_triggers_exchange() {
        let cache = TokenCache::new(credentials("http://127.0.0.1:9"), reqwest::Client::new());
        *cache.cached.lock().await = Some(CachedToken {
            access_token: SecretString::from("cached-token".to_string()),
            expires_at: Utc::now() - Duration::seconds(10),
        });

        // The exchange hits an unreachable endpoint and must surface as an
        // authentication failure rather than the stale token.
        match cache.get_token().await {
            Err(BackendError::AuthenticationFailed(_)) => {}
            other => panic!("expected AuthenticationFailed, got {:?}", other.map(|_| ())),
        }
    }
}
