//! Discovery JSON Schema
//!
//! Google's Discovery Service describes parameters and bodies with a slightly
//! modified JSON Schema draft 3. The differences that matter here:
//!
//! - `minimum` / `maximum` are strings, not numbers
//! - `format` carries Discovery specific values (`int64`, `date-time`, ...)
//! - `required` is a literal boolean on the property itself
//! - the JSON `null` value is spelled as the string `"null"`
//!
//! # Module Structure
//!
//! - [`validate`] - instance validation against a schema
//! - [`format`] - Discovery `format` validators

pub mod format;
pub mod validate;

use crate::error::ValidationError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use validate::{validate, validate_collecting};

/// Named schemas of a discovery document, used to resolve `$ref`
pub type Schemas = IndexMap<String, JsonSchema>;

/// A schema node as it appears in `schemas`, `parameters`, `request`...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchema {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// `"path"` or `"query"` for method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Kept raw: only a literal `true` makes a property required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Value>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub minimum: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub maximum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, JsonSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    #[serde(
        default,
        deserialize_with = "schema_or_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<bool>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Everything else (annotations, readOnly, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JsonSchema {
    /// Shorthand for a schema with only a `type`
    pub fn of_type(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    /// Strict boolean identity: `required: 1` or `required: "true"` don't count
    pub fn is_required(&self) -> bool {
        matches!(self.required, Some(Value::Bool(true)))
    }

    pub fn is_path(&self) -> bool {
        self.location.as_deref() == Some("path")
    }

    pub fn is_query(&self) -> bool {
        self.location.as_deref() == Some("query")
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}

/// Follow a single `$ref` indirection, if any
pub fn resolve<'a>(schema: &'a JsonSchema, schemas: &'a Schemas) -> Result<&'a JsonSchema, ValidationError> {
    match &schema.reference {
        Some(name) => schemas.get(name).ok_or_else(|| {
            ValidationError::new(format!(
                "Attempted to resolve {name}, but no result was found."
            ))
        }),
        None => Ok(schema),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// `additionalProperties: true` allows anything, `false` allows nothing
fn schema_or_bool<'de, D>(deserializer: D) -> Result<Option<Box<JsonSchema>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(true)) => Ok(Some(Box::new(JsonSchema::of_type("any")))),
        Some(Value::Bool(false)) | Some(Value::Null) | None => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(|s| Some(Box::new(s)))
            .map_err(serde::de::Error::custom),
    }
}
