//! Discovery Document model
//!
//! Typed view of a Google API Discovery Service v1 document. Only the keys
//! the request builder needs are typed; everything else is kept in `extra`
//! so nothing from the original document is lost.

use crate::schema::{JsonSchema, Schemas};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root of a discovery document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub documentation_link: Option<String>,
    #[serde(default)]
    pub root_url: Option<String>,
    #[serde(default)]
    pub service_path: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub batch_path: Option<String>,
    /// Global parameters, merged into every method
    #[serde(default)]
    pub parameters: IndexMap<String, JsonSchema>,
    #[serde(default)]
    pub schemas: Schemas,
    #[serde(default)]
    pub resources: IndexMap<String, ResourceSpec>,
    #[serde(default)]
    pub methods: IndexMap<String, MethodSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiscoveryDocument {
    /// Prefix every method path is appended to.
    ///
    /// `rootUrl + servicePath` when both are declared, `baseUrl` otherwise.
    pub fn method_base_url(&self) -> String {
        match (&self.root_url, &self.service_path) {
            (Some(root), Some(service)) => format!("{root}{service}"),
            _ => self.base_url.clone().unwrap_or_default(),
        }
    }
}

/// A named group of methods and nested resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(default)]
    pub methods: IndexMap<String, MethodSpec>,
    #[serde(default)]
    pub resources: IndexMap<String, ResourceSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single REST operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_http_method")]
    pub http_method: String,
    /// URL template, e.g. `calendars/{calendarId}/acl/{ruleId}`
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub flat_path: Option<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, JsonSchema>,
    /// Substitution order of path parameters
    #[serde(default)]
    pub parameter_order: Vec<String>,
    #[serde(default)]
    pub request: Option<JsonSchema>,
    #[serde(default)]
    pub response: Option<JsonSchema>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub supports_media_upload: bool,
    #[serde(default)]
    pub supports_media_download: bool,
    #[serde(default)]
    pub use_media_download_service: bool,
    #[serde(default)]
    pub media_upload: Option<MediaUploadSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_http_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadSpec {
    /// MIME media ranges accepted for upload
    #[serde(default)]
    pub accept: Vec<String>,
    /// e.g. `"5TB"`
    #[serde(default)]
    pub max_size: Option<String>,
    #[serde(default)]
    pub protocols: UploadProtocols,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadProtocols {
    #[serde(default)]
    pub simple: Option<UploadProtocol>,
    #[serde(default)]
    pub resumable: Option<UploadProtocol>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadProtocol {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub multipart: Option<bool>,
}
