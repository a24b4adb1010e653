//! Credential managers
//!
//! Each manager applies one kind of credentials to an unsent [`Request`]:
//!
//! - [`ApiKeyManager`] appends a `key` query parameter
//! - [`Oauth2Manager`] sets a bearer token and refreshes user credentials
//! - [`AdcCredentials`] gets tokens from Application Default Credentials
//!   (service account keys, gcloud user credentials or the metadata server)

use crate::error::{Error, Result};
use crate::models::Request;
use chrono::{DateTime, Utc};
use gcp_auth::TokenProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for Application Default Credentials
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are treated as expired this long before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Adds an API key to requests
#[derive(Debug, Clone)]
pub struct ApiKeyManager {
    key: String,
}

impl ApiKeyManager {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Append `key=<api key>` unless the URL already carries a key
    pub fn authorize(&self, request: Request) -> Request {
        if request.has_query_param("key") {
            return request;
        }
        request.with_query_param("key", &self.key)
    }
}

/// OAuth2 user credentials, as returned by the token endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCreds {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// OAuth2 client (application) credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCreds {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Authorizes requests with OAuth2 user credentials
#[derive(Debug, Clone)]
pub struct Oauth2Manager {
    http: reqwest::Client,
    token_uri: String,
}

impl Oauth2Manager {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gdiscovery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            token_uri: GOOGLE_TOKEN_URI.to_string(),
        })
    }

    /// Point refreshes at another token endpoint
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Set `Authorization: Bearer <access token>`
    pub fn authorize(request: Request, creds: &UserCreds) -> Result<Request> {
        let token = creds
            .access_token
            .as_deref()
            .ok_or_else(|| Error::Credentials("user credentials carry no access token".into()))?;
        Ok(request.with_header("Authorization", format!("Bearer {token}")))
    }

    /// Expired, or about to expire. Credentials without an expiry never expire.
    pub fn is_expired(creds: &UserCreds) -> bool {
        match creds.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(TOKEN_EXPIRY_BUFFER.as_secs() as i64);
                expires_at - buffer <= Utc::now()
            },
            None => false,
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// The old refresh token is kept when the server doesn't send a new one.
    pub async fn refresh(&self, creds: &UserCreds, client: &ClientCreds) -> Result<UserCreds> {
        let refresh_token = creds
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::Credentials("user credentials carry no refresh token".into()))?;
        let token_uri = creds.token_uri.as_deref().unwrap_or(&self.token_uri);

        tracing::debug!("POST {} (refresh_token grant)", token_uri);
        let response = self
            .http
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!("Token refresh failed: {} - {}", status, super::http::sanitize_for_log(&body));
            return Err(Error::Auth {
                status: status.as_u16(),
                message: body,
                url: token_uri.to_string(),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        let expires_at = token
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        Ok(UserCreds {
            access_token: Some(token.access_token),
            refresh_token: token.refresh_token.or_else(|| creds.refresh_token.clone()),
            expires_in: token.expires_in,
            expires_at,
            scopes: token
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| creds.scopes.clone()),
            id_token: token.id_token.or_else(|| creds.id_token.clone()),
            token_type: token.token_type.or_else(|| creds.token_type.clone()),
            token_uri: creds.token_uri.clone(),
        })
    }

    /// Refresh only when [`Oauth2Manager::is_expired`] says so
    pub async fn refresh_if_expired(&self, creds: &UserCreds, client: &ClientCreds) -> Result<(bool, UserCreds)> {
        if Self::is_expired(creds) {
            Ok((true, self.refresh(creds, client).await?))
        } else {
            Ok((false, creds.clone()))
        }
    }
}

/// Application Default Credentials with token caching
#[derive(Clone)]
pub struct AdcCredentials {
    provider: Arc<dyn TokenProvider>,
    scopes: Vec<String>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl std::fmt::Debug for AdcCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdcCredentials")
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl AdcCredentials {
    /// Detect credentials the way gcloud does. Empty `scopes` means
    /// [`DEFAULT_SCOPES`].
    pub async fn new(scopes: &[String]) -> Result<Self> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            Error::Credentials(format!(
                "{e}. Run 'gcloud auth application-default login'"
            ))
        })?;
        let scopes = if scopes.is_empty() {
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
        } else {
            scopes.to_vec()
        };

        Ok(Self {
            provider,
            scopes,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Access token, from cache while it is still valid
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let token = self
            .provider
            .token(&scopes)
            .await
            .map_err(|e| Error::Credentials(format!("Failed to get access token: {e}")))?;
        let token_str = token.as_str().to_string();

        // gcp_auth doesn't hand out a usable TTL, so use a conservative default
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;
        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }

    /// Drop the cached token and fetch a new one
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }

    pub async fn authorize(&self, request: Request) -> Result<Request> {
        let token = self.get_token().await?;
        Ok(request.with_header("Authorization", format!("Bearer {token}")))
    }
}
