//! gdiscovery - Google API client driven by Discovery Documents
//!
//! Load a discovery document, navigate its resources and methods, build
//! validated requests, then dispatch them with a [`gcp::client::Client`].
//!
//! # Module Structure
//!
//! - [`schema`] - Discovery JSON Schema model and validator
//! - [`discovery`] - Typed discovery document
//! - [`resource`] - Resource/method tree and request builder
//! - [`models`] - Requests, responses and media descriptors
//! - [`gcp`] - Credentials, HTTP session and dispatch client
//! - [`config`] - Persisted CLI configuration
//! - [`error`] - Error kinds

pub mod config;
pub mod discovery;
pub mod error;
pub mod gcp;
pub mod models;
pub mod resource;
pub mod schema;

pub use discovery::{DiscoveryDocument, MethodSpec, ResourceSpec};
pub use error::{Error, Result, ValidationError, Warning};
pub use models::{CallArgs, MediaDownload, MediaUpload, Request, Response, ResponseBody, ResumableUpload, UploadSource};
pub use resource::{GoogleApi, Lookup, Method, Resource};
