//! GoogleApi - entry point over a whole discovery document

use super::method::Method;
use super::tree::{Lookup, Resource};
use crate::discovery::DiscoveryDocument;
use crate::error::{Error, Result};
use crate::models::{CallArgs, Request};
use serde_json::{json, Value};

/// Query parameters every Google endpoint accepts without declaring them
pub const STACK_QUERY_PARAMETERS: &[&str] = &["trace", "pp", "strict"];

/// A Google API built from its discovery document.
///
/// Owns the document. Resources and methods borrow from it, so they are
/// cheap to create and are not cached.
#[derive(Debug, Clone)]
pub struct GoogleApi {
    raw: Value,
    doc: DiscoveryDocument,
    validate: bool,
}

impl GoogleApi {
    /// Build from a parsed document, with validation on
    pub fn from_value(mut raw: Value) -> Result<Self> {
        let Value::Object(root) = &mut raw else {
            return Err(Error::Document("discovery document must be a JSON object".into()));
        };
        let parameters = root
            .entry("parameters")
            .or_insert_with(|| Value::Object(Default::default()));
        if !parameters.is_object() {
            *parameters = Value::Object(Default::default());
        }
        if let Value::Object(parameters) = parameters {
            for name in STACK_QUERY_PARAMETERS {
                parameters.insert(
                    name.to_string(),
                    json!({"type": "string", "location": "query"}),
                );
            }
        }

        let doc: DiscoveryDocument = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Document(e.to_string()))?;
        tracing::debug!(
            "Loaded discovery document {} ({} resources, {} methods)",
            doc.id.as_deref().unwrap_or("<unnamed>"),
            doc.resources.len(),
            doc.methods.len()
        );
        Ok(Self {
            raw,
            doc,
            validate: true,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Default validation flag for every method of this API
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn validates(&self) -> bool {
        self.validate
    }

    pub fn document(&self) -> &DiscoveryDocument {
        &self.doc
    }

    /// Raw document item, e.g. `api.get("documentationLink")`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn name(&self) -> &str {
        self.doc.name.as_deref().unwrap_or_default()
    }

    pub fn version(&self) -> &str {
        self.doc.version.as_deref().unwrap_or_default()
    }

    pub fn resources_available(&self) -> Vec<&str> {
        self.doc.resources.keys().map(String::as_str).collect()
    }

    pub fn methods_available(&self) -> Vec<&str> {
        self.doc.methods.keys().map(String::as_str).collect()
    }

    /// Top-level resource first, then top-level method
    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        Lookup::find(
            name,
            &self.doc,
            &self.doc.resources,
            &self.doc.methods,
            self.validate,
        )
    }

    pub fn resource(&self, name: &str) -> Result<Resource<'_>> {
        self.lookup(name).into_resource()
    }

    pub fn method(&self, name: &str) -> Result<Method<'_>> {
        self.lookup(name).into_method()
    }

    /// Walk a dotted path such as `acl.get` or `users.messages.list`
    pub fn resolve(&self, path: &str) -> Lookup<'_> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or(path);
        segments.fold(self.lookup(first), Lookup::descend)
    }

    /// Build a request for the method at `path`
    pub fn build(&self, path: &str, args: CallArgs) -> Result<Request> {
        if path.is_empty() {
            return self.call(args);
        }
        self.resolve(path).build(args)
    }

    /// The API itself isn't callable
    pub fn call(&self, _args: CallArgs) -> Result<Request> {
        Err(Error::usage(
            "Only methods are callables, not the API itself. e.g. api.resource.method(...)",
        ))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.doc.resources.contains_key(name) || self.doc.methods.contains_key(name)
    }

    /// Number of top-level resources and methods
    pub fn len(&self) -> usize {
        self.doc.resources.len() + self.doc.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for GoogleApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{} API @ {}{}",
            self.name(),
            self.version(),
            self.doc.root_url.as_deref().unwrap_or_default(),
            self.doc.service_path.as_deref().unwrap_or_default()
        )?;
        if let Some(labels) = self.raw.get("labels") {
            write!(f, "\nLabels:\n{labels}")?;
        }
        Ok(())
    }
}
