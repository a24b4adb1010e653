//! Discovery `format` validators
//!
//! See <https://developers.google.com/discovery/v1/type-format>. Integer
//! formats accept JSON numbers as well as numeric strings, since 64-bit
//! values travel as strings in Discovery documents.

use crate::error::ValidationError;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const INT32_BOUND: i128 = 2_147_483_648;
const UINT32_MAX: i128 = 4_294_967_295;
const INT64_BOUND: i128 = 9_223_372_036_854_775_807;
const UINT64_MAX: i128 = INT64_BOUND * 2;

/// A numeric view over a JSON value
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i as i128))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::Int(u as i128))
                } else {
                    n.as_f64().map(Self::Float)
                }
            },
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(i) = s.parse::<i128>() {
            return Some(Self::Int(i));
        }
        s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Self::Float)
    }

    pub(crate) fn lt(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a < b,
            (a, b) => a.as_f64() < b.as_f64(),
        }
    }

    pub(crate) fn gt(self, other: Self) -> bool {
        other.lt(self)
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

fn check_range(value: &Value, low: i128, high: i128, criteria: &str) -> Result<(), ValidationError> {
    let n = Numeric::from_value(value).ok_or_else(|| ValidationError::invalid(value, criteria))?;
    if n.lt(Numeric::Int(low)) || n.gt(Numeric::Int(high)) {
        return Err(ValidationError::invalid(value, criteria));
    }
    Ok(())
}

pub fn validate_int32(value: &Value) -> Result<(), ValidationError> {
    check_range(
        value,
        -INT32_BOUND,
        INT32_BOUND,
        "Integer between -2147483648 and 2147483648",
    )
}

pub fn validate_uint32(value: &Value) -> Result<(), ValidationError> {
    check_range(value, 0, UINT32_MAX, "Integer between 0 and 4294967295")
}

pub fn validate_int64(value: &Value) -> Result<(), ValidationError> {
    check_range(
        value,
        -INT64_BOUND,
        INT64_BOUND,
        "Integer between -9,223,372,036,854,775,807 and 9,223,372,036,854,775,807",
    )
}

pub fn validate_uint64(value: &Value) -> Result<(), ValidationError> {
    check_range(
        value,
        0,
        UINT64_MAX,
        "Integer between 0 and 9,223,372,036,854,775,807 * 2",
    )
}

fn is_float(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_f64())
}

pub fn validate_double(value: &Value) -> Result<(), ValidationError> {
    if !is_float(value) {
        return Err(ValidationError::invalid(value, "Double type"));
    }
    Ok(())
}

pub fn validate_float(value: &Value) -> Result<(), ValidationError> {
    if !is_float(value) {
        return Err(ValidationError::invalid(value, "Float type"));
    }
    Ok(())
}

/// Raw bytes: an array of octets, or their base64 text form (standard or
/// URL-safe alphabet, padding optional)
pub fn validate_byte(value: &Value) -> Result<(), ValidationError> {
    let ok = match value {
        Value::Array(items) => items
            .iter()
            .all(|b| b.as_u64().map(|b| b <= u8::MAX as u64).unwrap_or(false)),
        Value::String(s) => [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
            .iter()
            .any(|engine| engine.decode(s).is_ok()),
        _ => false,
    };
    if !ok {
        return Err(ValidationError::invalid(value, "Bytes type"));
    }
    Ok(())
}

pub fn validate_date(value: &Value) -> Result<(), ValidationError> {
    let parsed = value
        .as_str()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
        .unwrap_or(false);
    if !parsed {
        return Err(ValidationError::invalid(
            value,
            "JSON date value. Hint: format dates as YYYY-MM-DD",
        ));
    }
    Ok(())
}

fn parse_datetime(s: &str) -> bool {
    if DateTime::parse_from_rfc3339(s).is_ok() {
        return true;
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
        || ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"]
            .iter()
            .any(|fmt| DateTime::parse_from_str(s, fmt).is_ok())
}

pub fn validate_datetime(value: &Value) -> Result<(), ValidationError> {
    if !value.as_str().map(parse_datetime).unwrap_or(false) {
        return Err(ValidationError::invalid(
            value,
            "JSON date-time value. Hint: format timestamps as RFC 3339",
        ));
    }
    Ok(())
}

/// The Discovery "null" is the literal string `"null"`, not a JSON null
pub fn validate_null(value: &Value) -> Result<(), ValidationError> {
    if value.as_str() != Some("null") {
        return Err(ValidationError::invalid(value, "'null' NOT None"));
    }
    Ok(())
}

/// Dispatch on a `format` name. Formats without a validator are accepted.
pub fn validate_format(value: &Value, format: &str) -> Result<(), ValidationError> {
    match format {
        "int32" => validate_int32(value),
        "uint32" => validate_uint32(value),
        "int64" => validate_int64(value),
        "uint64" => validate_uint64(value),
        "double" => validate_double(value),
        "float" => validate_float(value),
        "byte" => validate_byte(value),
        "date" => validate_date(value),
        "date-time" => validate_datetime(value),
        "null" => validate_null(value),
        other => {
            tracing::trace!("No validator for format {}, accepting", other);
            Ok(())
        },
    }
}
