//! Type validation and coercion of attribute values
//!
//! `coerce` is pure: it turns a caller-supplied JSON value into the canonical
//! value for the attribute's data type, then applies the attribute's
//! validation pattern to the canonical value's string form.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Number, Value};

use super::errors::{CoercionError, CoercionResult};
use super::types::DataType;
use crate::storage::Attribute;

/// Largest magnitude at which every integer is exactly representable in f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static pattern"))
}

fn datetime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+\-]\d{2}:?\d{2})?$")
            .expect("static pattern")
    })
}

pub fn is_iso_date(s: &str) -> bool {
    date_pattern().is_match(s)
}

pub fn is_iso_datetime(s: &str) -> bool {
    datetime_pattern().is_match(s)
}

/// Compiles an attribute validation pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

/// Canonical JSON form of a finite number.
///
/// Integral values in the exactly representable range become integers.
pub(crate) fn canonical_number(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number)
}

/// Formats a number the way JavaScript's `Number#toString` does: plain
/// decimals for magnitudes in `[1e-6, 1e21)`, exponent notation outside.
pub(crate) fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_float(f),
        None => n.to_string(),
    }
}

fn format_float(f: f64) -> String {
    let magnitude = f.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        // `{:e}` is the shortest round-trip mantissa; JS signs positive exponents.
        let formatted = format!("{:e}", f);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }
    if f.fract() == 0.0 && magnitude <= MAX_SAFE_INTEGER {
        return (f as i64).to_string();
    }
    f.to_string()
}

/// String form of a value: strings as-is, scalars formatted, composites as JSON text.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Validates `value` against `attribute` and returns its canonical form.
pub fn coerce(attribute: &Attribute, value: &Value) -> CoercionResult<Value> {
    let name = attribute.name.as_str();

    if value.is_null() {
        return Err(CoercionError::new(
            name,
            format!("Value for attribute '{}' cannot be null", name),
        ));
    }

    let canonical = match attribute.data_type {
        DataType::Text => Value::String(display_string(value)),
        DataType::Number => coerce_number(name, value)?,
        DataType::Boolean => Value::Bool(coerce_boolean(name, value)?),
        DataType::Enum => coerce_enum(attribute, value)?,
        DataType::Date => match value {
            Value::String(s) if is_iso_date(s) => value.clone(),
            _ => {
                return Err(CoercionError::new(
                    name,
                    format!("Attribute '{}' must be an ISO date (YYYY-MM-DD)", name),
                ))
            }
        },
        DataType::Datetime => match value {
            Value::String(s) if is_iso_datetime(s) => value.clone(),
            _ => {
                return Err(CoercionError::new(
                    name,
                    format!("Attribute '{}' must be an ISO datetime", name),
                ))
            }
        },
    };

    if let Some(pattern) = attribute.validation_regex.as_deref() {
        let re = compile_pattern(pattern).map_err(|e| {
            CoercionError::new(
                name,
                format!("Attribute '{}' has an invalid validation_regex: {}", name, e),
            )
        })?;
        if !re.is_match(&display_string(&canonical)) {
            return Err(CoercionError::new(
                name,
                format!("Attribute '{}' failed validation_regex", name),
            ));
        }
    }

    Ok(canonical)
}

fn coerce_number(name: &str, value: &Value) -> CoercionResult<Value> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .and_then(canonical_number)
        .ok_or_else(|| CoercionError::new(name, format!("Attribute '{}' must be a number", name)))
}

fn coerce_boolean(name: &str, value: &Value) -> CoercionResult<bool> {
    match value {
        Value::Bool(b) => return Ok(*b),
        Value::Number(n) => return Ok(n.as_f64().map_or(true, |f| f != 0.0)),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => return Ok(true),
            "false" | "0" | "no" | "n" => return Ok(false),
            _ => {}
        },
        _ => {}
    }
    Err(CoercionError::new(
        name,
        format!("Invalid boolean value for attribute '{}': {}", name, display_string(value)),
    ))
}

fn coerce_enum(attribute: &Attribute, value: &Value) -> CoercionResult<Value> {
    let name = attribute.name.as_str();
    let allowed = match attribute.allowed_values.as_deref() {
        Some(allowed) if !allowed.is_empty() => allowed,
        _ => {
            return Err(CoercionError::new(
                name,
                format!("Attribute '{}' is ENUM but has no allowed_values", name),
            ))
        }
    };

    let candidate = display_string(value);
    if allowed.iter().any(|a| display_string(a) == candidate) {
        return Ok(Value::String(candidate));
    }

    let listed: Vec<String> = allowed.iter().map(display_string).collect();
    Err(CoercionError::new(
        name,
        format!("Attribute '{}' must be one of: {}", name, listed.join(", ")),
    ))
}
