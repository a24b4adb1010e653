//! Instance validation against Discovery schemas
//!
//! Objects and arrays are walked recursively; every other schema is a leaf
//! where four independent checks run: type, format, range and pattern.

use super::format::{validate_format, validate_null, Numeric};
use super::{resolve, JsonSchema, Schemas};
use crate::error::{ValidationError, Warning};
use regex::Regex;
use serde_json::Value;

/// Validate `instance` against `schema`, resolving `$ref`s from `schemas`.
///
/// Unknown object properties are logged, never rejected.
pub fn validate(instance: &Value, schema: &JsonSchema, schemas: &Schemas) -> Result<(), ValidationError> {
    let mut warnings = Vec::new();
    validate_collecting(instance, schema, schemas, &mut warnings)
}

/// Same as [`validate`], also handing back the non-fatal warnings
pub fn validate_collecting(
    instance: &Value,
    schema: &JsonSchema,
    schemas: &Schemas,
    warnings: &mut Vec<Warning>,
) -> Result<(), ValidationError> {
    let schema = resolve(schema, schemas)?;

    match schema.kind() {
        Some("object") => validate_object(instance, schema, schemas, warnings),
        Some("array") => {
            check_type(instance, "array")?;
            let Some(items) = schema.items.as_deref() else {
                return Ok(());
            };
            let items = resolve(items, schemas)?;
            if let Value::Array(elements) = instance {
                for element in elements {
                    validate_collecting(element, items, schemas, warnings)?;
                }
            }
            Ok(())
        },
        _ => validate_leaf(instance, schema),
    }
}

fn validate_object(
    instance: &Value,
    schema: &JsonSchema,
    schemas: &Schemas,
    warnings: &mut Vec<Warning>,
) -> Result<(), ValidationError> {
    check_type(instance, "object")?;
    let Value::Object(map) = instance else {
        return Ok(());
    };

    let properties = schema.properties.as_ref();
    for key in map.keys() {
        if !properties.map(|p| p.contains_key(key)).unwrap_or(false) {
            let warning = Warning::UnknownProperty {
                property: key.clone(),
                schema_id: schema.id.clone(),
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }
    }

    let Some(properties) = properties else {
        return Ok(());
    };
    for (name, property) in properties {
        let property = resolve(property, schemas)?;
        match map.get(name) {
            Some(value) => validate_collecting(value, property, schemas, warnings)?,
            None if property.is_required() => {
                return Err(ValidationError::new(format!("Instance {name} is required")));
            },
            None => {},
        }
    }
    Ok(())
}

fn validate_leaf(instance: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
    if let Some(kind) = schema.kind() {
        check_type(instance, kind)?;
    }
    if let Some(format) = schema.format.as_deref() {
        validate_format(instance, format)?;
    }
    validate_range(instance, schema)?;
    validate_pattern(instance, schema)
}

fn type_criteria(kind: &str) -> &'static str {
    match kind {
        "number" => "JSON number (integer or float)",
        "integer" => "JSON integer",
        "string" => "JSON string",
        "object" => "JSON object",
        "array" => "JSON array",
        "boolean" => "JSON boolean",
        _ => "any non-null JSON value",
    }
}

/// Type check for a declared JSON type
pub fn check_type(instance: &Value, kind: &str) -> Result<(), ValidationError> {
    let ok = match kind {
        "number" => instance.is_number(),
        "integer" => instance.is_i64() || instance.is_u64(),
        "string" => instance.is_string(),
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "boolean" => instance.is_boolean(),
        "any" => !instance.is_null(),
        "null" => return validate_null(instance),
        other => {
            return Err(ValidationError::new(format!(
                "Schema declares unsupported type {other:?}"
            )));
        },
    };
    if !ok {
        return Err(ValidationError::invalid(instance, type_criteria(kind)));
    }
    Ok(())
}

// Only one bound is looked at: `minimum` wins when both are declared.
fn validate_range(instance: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
    if let Some(minimum) = schema.minimum.as_deref().filter(|m| !m.is_empty()) {
        let bound = parse_bound(minimum)?;
        let value = numeric_instance(instance, minimum)?;
        if value.lt(bound) {
            return Err(ValidationError::invalid(instance, format!("Not less than {minimum}")));
        }
    } else if let Some(maximum) = schema.maximum.as_deref().filter(|m| !m.is_empty()) {
        let bound = parse_bound(maximum)?;
        let value = numeric_instance(instance, maximum)?;
        if value.gt(bound) {
            return Err(ValidationError::invalid(instance, format!("Not more than {maximum}")));
        }
    }
    Ok(())
}

fn parse_bound(bound: &str) -> Result<Numeric, ValidationError> {
    Numeric::parse(bound)
        .ok_or_else(|| ValidationError::new(format!("Schema bound {bound:?} is not a number")))
}

fn numeric_instance(instance: &Value, bound: &str) -> Result<Numeric, ValidationError> {
    Numeric::from_value(instance)
        .ok_or_else(|| ValidationError::invalid(instance, format!("A number comparable to {bound}")))
}

fn validate_pattern(instance: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
    let Some(pattern) = schema.pattern.as_deref() else {
        return Ok(());
    };
    let criteria = format!("Match this pattern: {pattern}");
    let Some(text) = instance.as_str() else {
        return Err(ValidationError::invalid(instance, criteria));
    };
    // Anchored at the start only, not a full match
    let regex = match Regex::new(&format!("^(?:{pattern})")) {
        Ok(regex) => regex,
        Err(e) => {
            tracing::warn!("Skipping unsupported pattern {}: {}", pattern, e);
            return Ok(());
        },
    };
    if !regex.is_match(text) {
        return Err(ValidationError::invalid(instance, criteria));
    }
    Ok(())
}
