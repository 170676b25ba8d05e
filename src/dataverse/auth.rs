//! Bearer-token acquisition for the Dataverse gateway.
//!
//! [`ClientCredentialsProvider`] performs an OAuth2 client-credentials
//! exchange per call. [`CachedTokenProvider`] shares one token between calls
//! until shortly before it expires, or until the platform rejects it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credentials are not configured")]
    NotConfigured,

    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token endpoint rejected the request with status {0}")]
    Rejected(u16),

    #[error("Token response was malformed: {0}")]
    MalformedResponse(String),
}

#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self, scopes: &[String]) -> Result<AccessToken, AuthError>;

    /// Drops any shared token, e.g. after the platform answered 401.
    async fn invalidate(&self) {}
}

/// Client identity for the client-credentials grant.
#[derive(Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct ClientCredentialsProvider {
    http: Client,
    token_url: String,
    credentials: ClientCredentials,
}

impl ClientCredentialsProvider {
    pub fn new(http: Client, authority_host: &str, credentials: ClientCredentials) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            credentials.tenant_id
        );
        Self {
            http,
            token_url,
            credentials,
        }
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn acquire_token(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        let scope = scopes.join(" ");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|err| {
                error!(error = %err, "token request failed");
                AuthError::Request(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "token endpoint rejected request");
            return Err(AuthError::Rejected(status.as_u16()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::MalformedResponse(err.to_string()))?;

        let lifetime = body.expires_in.unwrap_or(3600);
        debug!(expires_in = lifetime, "acquired access token");
        Ok(AccessToken::new(
            body.access_token,
            Utc::now() + Duration::seconds(lifetime),
        ))
    }
}

/// Provider used when no client identity is configured.
#[derive(Debug, Default)]
pub struct MissingCredentials;

#[async_trait]
impl TokenProvider for MissingCredentials {
    async fn acquire_token(&self, _scopes: &[String]) -> Result<AccessToken, AuthError> {
        Err(AuthError::NotConfigured)
    }
}

/// Shares one token across calls: read-mostly, refreshed near expiry,
/// invalidated on demand.
pub struct CachedTokenProvider<P> {
    inner: P,
    cached: RwLock<Option<AccessToken>>,
}

impl<P: TokenProvider> CachedTokenProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cached: RwLock::new(None),
        }
    }
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for CachedTokenProvider<P> {
    async fn acquire_token(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(Utc::now())) {
                return Ok(token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(Utc::now())) {
            return Ok(token.clone());
        }

        let token = self.inner.acquire_token(scopes).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn invalidate(&self) {
        self.cached.write().await.take();
        self.inner.invalidate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        lifetime: i64,
    }

    #[async_trait]
    impl TokenProvider for Counting {
        async fn acquire_token(&self, _scopes: &[String]) -> Result<AccessToken, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::new(
                format!("token-{n}"),
                Utc::now() + Duration::seconds(self.lifetime),
            ))
        }
    }

    fn counting(lifetime: i64) -> CachedTokenProvider<Counting> {
        CachedTokenProvider::new(Counting {
            calls: AtomicUsize::new(0),
            lifetime,
        })
    }

    #[tokio::test]
    async fn cached_token_is_shared_until_invalidated() {
        let provider = counting(3600);
        let scopes = vec!["https://org.example/.default".to_string()];

        let first = provider.acquire_token(&scopes).await.unwrap();
        let second = provider.acquire_token(&scopes).await.unwrap();
        assert_eq!(first.secret(), "token-0");
        assert_eq!(second.secret(), "token-0");

        provider.invalidate().await;
        let third = provider.acquire_token(&scopes).await.unwrap();
        assert_eq!(third.secret(), "token-1");
    }

    #[tokio::test]
    async fn nearly_expired_tokens_are_refreshed() {
        let provider = counting(EXPIRY_MARGIN_SECS - 1);
        let scopes = Vec::new();

        provider.acquire_token(&scopes).await.unwrap();
        let second = provider.acquire_token(&scopes).await.unwrap();
        assert_eq!(second.secret(), "token-1");
    }

    #[tokio::test]
    async fn missing_credentials_never_yield_a_token() {
        assert!(matches!(
            MissingCredentials.acquire_token(&[]).await,
            Err(AuthError::NotConfigured)
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let token = AccessToken::new("very-secret", Utc::now());
        assert!(!format!("{token:?}").contains("very-secret"));

        let credentials = ClientCredentials {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "hunter2".into(),
        };
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn client_credentials_exchange_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "client-1".into()),
                mockito::Matcher::UrlEncoded(
                    "scope".into(),
                    "https://org.example/.default".into(),
                ),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"abc","expires_in":3599,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let provider = ClientCredentialsProvider::new(
            Client::new(),
            &server.url(),
            ClientCredentials {
                tenant_id: "tenant-1".into(),
                client_id: "client-1".into(),
                client_secret: "secret".into(),
            },
        );

        let token = provider
            .acquire_token(&["https://org.example/.default".to_string()])
            .await
            .unwrap();
        assert_eq!(token.secret(), "abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_exchange_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let provider = ClientCredentialsProvider::new(
            Client::new(),
            &server.url(),
            ClientCredentials {
                tenant_id: "tenant-1".into(),
                client_id: "client-1".into(),
                client_secret: "wrong".into(),
            },
        );

        assert!(matches!(
            provider.acquire_token(&[]).await,
            Err(AuthError::Rejected(401))
        ));
    }
}
