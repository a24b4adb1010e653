//! Resource/method tree over a discovery document
//!
//! This module turns a parsed discovery document into navigable resources
//! and callable methods. Everything here is synchronous and side-effect
//! free: building a request never touches the network.
//!
//! # Architecture
//!
//! - [`api`] - [`GoogleApi`], owns the document and injects stack parameters
//! - [`tree`] - [`Resource`] nodes and the [`Lookup`] result of a name lookup
//! - [`method`] - [`Method`], the request builder
//! - [`parameters`] - merged parameter view and classification
//!
//! # Example
//!
//! ```ignore
//! use gdiscovery::{CallArgs, GoogleApi};
//!
//! fn acl_get(doc: serde_json::Value) -> gdiscovery::Result<gdiscovery::Request> {
//!     let calendar = GoogleApi::from_value(doc)?;
//!     calendar
//!         .resource("acl")?
//!         .method("get")?
//!         .build(CallArgs::new().param("calendarId", "primary").param("ruleId", "r1"))
//! }
//! ```

pub mod api;
pub mod method;
pub mod parameters;
pub mod tree;

pub use api::{GoogleApi, STACK_QUERY_PARAMETERS};
pub use method::Method;
pub use parameters::{argument_name, Parameters};
pub use tree::{Lookup, Resource};
