//! Dispatch client
//!
//! Combines a [`Session`] with credentials to send built requests, and
//! wraps the Discovery Service itself to fetch discovery documents.

use super::auth::{AdcCredentials, ApiKeyManager, ClientCreds, Oauth2Manager, UserCreds};
use super::http::{ReqwestSession, Session};
use crate::error::{Error, Result};
use crate::models::{CallArgs, Request, Response};
use crate::resource::GoogleApi;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Discovery Service v1 document, compiled into the binary
const DISCOVERY_SERVICE_DOCUMENT: &str = include_str!("../resources/discovery_v1.json");

pub const DEFAULT_DISCOVERY_ROOT_URL: &str = "https://www.googleapis.com/";

/// Discovery v2 endpoint, served by each API's own host
pub fn discovery_v2_url(api: &str, version: &str) -> String {
    format!(
        "https://{}.googleapis.com/$discovery/rest?version={}",
        urlencoding::encode(api),
        urlencoding::encode(version)
    )
}

/// Which credentials a request is sent with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Auth {
    /// Strongest configured credentials, see [`Client::send`]
    #[default]
    Auto,
    Anon,
    ApiKey,
    User,
    ServiceAccount,
}

struct UserAuth {
    manager: Oauth2Manager,
    creds: RwLock<UserCreds>,
    client: Option<ClientCreds>,
}

/// Sends requests anonymously, with an API key, as a user or as a service
/// account
#[derive(Clone)]
pub struct Client<S = ReqwestSession> {
    session: S,
    discovery_service: GoogleApi,
    api_key: Option<ApiKeyManager>,
    user: Option<Arc<UserAuth>>,
    service_account: Option<AdcCredentials>,
}

impl Client<ReqwestSession> {
    /// Client over a default reqwest session
    pub fn new() -> Result<Self> {
        Self::with_session(ReqwestSession::new()?)
    }
}

impl<S: Session> Client<S> {
    pub fn with_session(session: S) -> Result<Self> {
        let discovery_service = GoogleApi::from_json(DISCOVERY_SERVICE_DOCUMENT)?.with_validation(false);
        Ok(Self {
            session,
            discovery_service,
            api_key: None,
            user: None,
            service_account: None,
        })
    }

    /// Point the Discovery Service at another root, e.g. a mock server
    pub fn with_discovery_root_url(mut self, root_url: &str) -> Result<Self> {
        let mut raw: Value = serde_json::from_str(DISCOVERY_SERVICE_DOCUMENT)?;
        let root_url = if root_url.ends_with('/') {
            root_url.to_string()
        } else {
            format!("{root_url}/")
        };
        raw["rootUrl"] = Value::String(root_url.clone());
        raw["baseUrl"] = Value::String(format!("{root_url}discovery/v1/"));
        self.discovery_service = GoogleApi::from_value(raw)?.with_validation(false);
        Ok(self)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(ApiKeyManager::new(key));
        self
    }

    /// OAuth2 user credentials. With client credentials, expired tokens are
    /// refreshed before sending.
    pub fn with_user_creds(self, creds: UserCreds, client: Option<ClientCreds>) -> Result<Self> {
        Ok(self.with_user_manager(Oauth2Manager::new()?, creds, client))
    }

    /// Same as [`Client::with_user_creds`] with a custom token endpoint
    pub fn with_user_manager(mut self, manager: Oauth2Manager, creds: UserCreds, client: Option<ClientCreds>) -> Self {
        self.user = Some(Arc::new(UserAuth {
            manager,
            creds: RwLock::new(creds),
            client,
        }));
        self
    }

    pub fn with_service_account(mut self, credentials: AdcCredentials) -> Self {
        self.service_account = Some(credentials);
        self
    }

    /// Current user credentials, refreshed ones included
    pub async fn user_creds(&self) -> Option<UserCreds> {
        match &self.user {
            Some(user) => Some(user.creds.read().await.clone()),
            None => None,
        }
    }

    /// The Discovery Service API itself
    pub fn discovery_service(&self) -> &GoogleApi {
        &self.discovery_service
    }

    async fn dispatch(&self, request: Request) -> Result<Response> {
        self.session.send(&request).await?.raise_for_status()
    }

    pub async fn as_anon(&self, request: Request) -> Result<Response> {
        self.dispatch(request).await
    }

    pub async fn as_api_key(&self, request: Request) -> Result<Response> {
        let manager = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::usage("No API key configured, use Client::with_api_key"))?;
        self.dispatch(manager.authorize(request)).await
    }

    pub async fn as_user(&self, request: Request) -> Result<Response> {
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| Error::usage("No user credentials configured, use Client::with_user_creds"))?;

        let current = user.creds.read().await.clone();
        let creds = if Oauth2Manager::is_expired(&current) {
            match &user.client {
                Some(client) => {
                    tracing::debug!("User credentials expired, refreshing");
                    let fresh = user.manager.refresh(&current, client).await?;
                    *user.creds.write().await = fresh.clone();
                    fresh
                },
                None => {
                    tracing::warn!("User credentials expired and no client credentials to refresh them");
                    current
                },
            }
        } else {
            current
        };

        self.dispatch(Oauth2Manager::authorize(request, &creds)?).await
    }

    pub async fn as_service_account(&self, request: Request) -> Result<Response> {
        let credentials = self
            .service_account
            .as_ref()
            .ok_or_else(|| Error::usage("No service account configured, use Client::with_service_account"))?;
        let request = credentials.authorize(request).await?;
        self.dispatch(request).await
    }

    /// Send with the strongest configured credentials: user, then service
    /// account, then API key, then anonymously
    pub async fn send(&self, request: Request) -> Result<Response> {
        if self.user.is_some() {
            self.as_user(request).await
        } else if self.service_account.is_some() {
            self.as_service_account(request).await
        } else if self.api_key.is_some() {
            self.as_api_key(request).await
        } else {
            self.as_anon(request).await
        }
    }

    pub async fn send_as(&self, auth: Auth, request: Request) -> Result<Response> {
        match auth {
            Auth::Auto => self.send(request).await,
            Auth::Anon => self.as_anon(request).await,
            Auth::ApiKey => self.as_api_key(request).await,
            Auth::User => self.as_user(request).await,
            Auth::ServiceAccount => self.as_service_account(request).await,
        }
    }

    /// Send many requests concurrently. Fails on the first error.
    pub async fn send_all(&self, requests: Vec<Request>) -> Result<Vec<Response>> {
        futures::future::try_join_all(requests.into_iter().map(|request| self.send(request))).await
    }

    /// Follow `nextPageToken` until exhausted or `max_pages` responses
    pub async fn pages(&self, first: Request, max_pages: Option<usize>) -> Result<Vec<Response>> {
        self.pages_as(Auth::Auto, first, max_pages).await
    }

    /// [`Client::pages`], sending every page with the same credentials
    pub async fn pages_as(&self, auth: Auth, first: Request, max_pages: Option<usize>) -> Result<Vec<Response>> {
        let mut pages = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(first);

        while let Some(request) = next.take() {
            if max_pages.map(|max| pages.len() >= max).unwrap_or(false) {
                break;
            }
            let page_key = (request.url().to_string(), request.json().map(|j| j.to_string()));
            if !seen.insert(page_key) {
                tracing::warn!("Page token repeated, stopping pagination at {}", request.url());
                break;
            }
            let json_req = request.json().is_some();
            let response = self.send_as(auth, request).await?;
            next = response.next_page(None, None, json_req);
            pages.push(response);
        }
        Ok(pages)
    }

    /// `apis.list` of the Discovery Service
    pub async fn list_api(&self, name: Option<&str>, preferred: bool) -> Result<Value> {
        let mut args = CallArgs::new();
        if let Some(name) = name {
            args = args.param("name", name);
        }
        if preferred {
            args = args.param("preferred", true);
        }
        let request = self.discovery_service.build("apis.list", args)?;
        Ok(self.as_anon(request).await?.content())
    }

    /// Fetch a discovery document. Falls back to the Discovery v2 endpoint
    /// when the directory doesn't know the API.
    pub async fn discover(&self, api: &str, version: &str) -> Result<GoogleApi> {
        let request = self.discovery_service.build(
            "apis.getRest",
            CallArgs::new().param("api", api).param("version", version),
        )?;
        let document = match self.as_anon(request).await {
            Ok(response) => response.content(),
            Err(e) if e.status() == Some(404) => {
                tracing::debug!("{} {} not in the v1 directory, trying Discovery v2", api, version);
                let request = Request::new("GET", discovery_v2_url(api, version));
                self.as_anon(request).await?.content()
            },
            Err(e) => return Err(e),
        };
        Ok(GoogleApi::from_value(document)?.with_validation(false))
    }

    /// Discover the preferred version of `api`
    pub async fn discover_preferred(&self, api: &str) -> Result<GoogleApi> {
        let listing = self.list_api(Some(api), true).await?;
        let first = listing
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .ok_or_else(|| Error::usage(format!("Invalid API name: {api}")))?;
        let name = first.get("name").and_then(Value::as_str).unwrap_or(api);
        let version = first
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Document("apis.list item has no version".into()))?;
        self.discover(name, version).await
    }
}
