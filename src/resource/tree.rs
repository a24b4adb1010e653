//! Resource tree navigation
//!
//! Resources and methods are borrowed views created on every lookup. A name
//! is searched in nested resources first, then in methods.

use super::method::Method;
use crate::discovery::{DiscoveryDocument, MethodSpec, ResourceSpec};
use crate::error::{Error, Result};
use crate::models::{CallArgs, Request};
use indexmap::IndexMap;
use serde_json::Value;

/// Outcome of looking a name up in a resource or API
#[derive(Debug, Clone)]
pub enum Lookup<'a> {
    Resource(Resource<'a>),
    Method(Method<'a>),
    NotFound {
        name: String,
        resources: Vec<String>,
        methods: Vec<String>,
    },
}

impl<'a> Lookup<'a> {
    pub(crate) fn find(
        name: &str,
        doc: &'a DiscoveryDocument,
        resources: &'a IndexMap<String, ResourceSpec>,
        methods: &'a IndexMap<String, MethodSpec>,
        validate: bool,
    ) -> Self {
        if let Some((key, spec)) = resources.get_key_value(name) {
            Self::Resource(Resource::new(key, doc, spec, validate))
        } else if let Some((key, spec)) = methods.get_key_value(name) {
            Self::Method(Method::new(key, doc, spec, validate))
        } else {
            Self::NotFound {
                name: name.to_string(),
                resources: resources.keys().cloned().collect(),
                methods: methods.keys().cloned().collect(),
            }
        }
    }

    /// Look `segment` up under this node. Methods have no children.
    pub fn descend(self, segment: &str) -> Self {
        match self {
            Self::Resource(resource) => resource.lookup(segment),
            Self::Method(method) => Self::NotFound {
                name: format!("{}.{}", method.name(), segment),
                resources: Vec::new(),
                methods: Vec::new(),
            },
            not_found => not_found,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }

    /// The resource, or an error if the name is a method or unknown
    pub fn into_resource(self) -> Result<Resource<'a>> {
        match self {
            Self::Resource(resource) => Ok(resource),
            Self::Method(method) => Err(Error::usage(format!(
                "{} is a method, not a resource",
                method.name()
            ))),
            not_found => Err(not_found.into_error()),
        }
    }

    /// The method, or an error if the name is a resource or unknown
    pub fn into_method(self) -> Result<Method<'a>> {
        match self {
            Self::Method(method) => Ok(method),
            Self::Resource(resource) => Err(Error::usage(format!(
                "Only methods are callables, not resources. {} is a resource",
                resource.name()
            ))),
            not_found => Err(not_found.into_error()),
        }
    }

    /// Build a request if this is a method. Resources aren't callable.
    pub fn build(self, args: CallArgs) -> Result<Request> {
        self.into_method()?.build(args)
    }

    fn into_error(self) -> Error {
        match self {
            Self::NotFound {
                name,
                resources,
                methods,
            } => Error::NotFound {
                name,
                resources,
                methods,
            },
            Self::Resource(resource) => Error::usage(format!("{} is a resource", resource.name())),
            Self::Method(method) => Error::usage(format!("{} is a method", method.name())),
        }
    }
}

/// A group of methods and nested resources
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    name: &'a str,
    doc: &'a DiscoveryDocument,
    spec: &'a ResourceSpec,
    validate: bool,
}

impl<'a> Resource<'a> {
    pub fn new(name: &'a str, doc: &'a DiscoveryDocument, spec: &'a ResourceSpec, validate: bool) -> Self {
        Self {
            name,
            doc,
            spec,
            validate,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn spec(&self) -> &'a ResourceSpec {
        self.spec
    }

    pub fn methods_available(&self) -> Vec<&'a str> {
        self.spec.methods.keys().map(String::as_str).collect()
    }

    pub fn resources_available(&self) -> Vec<&'a str> {
        self.spec.resources.keys().map(String::as_str).collect()
    }

    /// Nested resource first, then method
    pub fn lookup(&self, name: &str) -> Lookup<'a> {
        Lookup::find(
            name,
            self.doc,
            &self.spec.resources,
            &self.spec.methods,
            self.validate,
        )
    }

    pub fn resource(&self, name: &str) -> Result<Resource<'a>> {
        self.lookup(name).into_resource()
    }

    pub fn method(&self, name: &str) -> Result<Method<'a>> {
        self.lookup(name).into_method()
    }

    /// Walk a dotted path such as `acl.get`
    pub fn resolve(&self, path: &str) -> Lookup<'a> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or(path);
        segments.fold(self.lookup(first), Lookup::descend)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.spec.resources.contains_key(name) || self.spec.methods.contains_key(name)
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.spec.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spec.methods.is_empty()
    }

    /// Raw access to a key of the resource spec
    pub fn get(&self, key: &str) -> Option<Value> {
        serde_json::to_value(self.spec).ok()?.get(key).cloned()
    }

    /// Resources can't be called
    pub fn call(&self, _args: CallArgs) -> Result<Request> {
        Err(Error::usage(
            "Only methods are callables, not resources. e.g. api.resource.list() NOT api.resource().list()",
        ))
    }
}

impl std::fmt::Display for Resource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} resource @ {}{}",
            self.name,
            self.doc.root_url.as_deref().unwrap_or_default(),
            self.doc.service_path.as_deref().unwrap_or_default()
        )
    }
}
