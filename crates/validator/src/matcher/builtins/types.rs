//! Type and shape predicates

use std::sync::LazyLock;

use super::{PredicateContext, param};
use crate::error::MatcherResult;
use crate::value::Value;

static INTEGER_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\s*[+-]?[0-9]+\s*$").unwrap());

/// Boolean reading of common boolean spellings.
///
/// `true`, `1`, `yes`, `on` (any case) are true; `false`, `0`, `no`, `off`
/// and the empty string are false. Everything else is `None`.
pub fn as_bool_like(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Integer, or a string holding one
pub fn is_integer_like(value: &Value) -> bool {
    match value {
        Value::Int(_) => true,
        Value::String(s) => INTEGER_REGEX.is_match(s),
        _ => false,
    }
}

fn type_alias(name: &str) -> String {
    match name.trim().to_ascii_lowercase().as_str() {
        "null" => "NULL".to_string(),
        "int" | "integer" => "integer".to_string(),
        "bool" | "boolean" => "boolean".to_string(),
        "float" | "double" => "double".to_string(),
        "datetime" | "date" | "object" => "object".to_string(),
        other => other.to_string(),
    }
}

/// `type(name)`: type name in `gettype` vocabulary
pub fn type_of(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let expected = type_alias(&param(ctx, params, 0)?.to_display_string());
    Ok(value.type_name() == expected)
}

pub fn int(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(is_integer_like(value))
}

pub fn bool(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(as_bool_like(value).is_some())
}

pub fn numeric(
    value: &Value,
    _params: &[Value],
    _ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(value.is_numeric())
}

/// Numbers and numeric strings
pub fn float(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(value.is_numeric())
}

pub fn string(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(matches!(value, Value::String(_)))
}

pub fn scalar(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(value.is_scalar())
}

/// Lists and maps alike
pub fn array(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(value.is_collection())
}

pub fn is_true(
    value: &Value,
    _params: &[Value],
    _ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(as_bool_like(value) == Some(true))
}

pub fn is_false(
    value: &Value,
    _params: &[Value],
    _ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(as_bool_like(value) == Some(false))
}

pub fn null(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(value.is_null())
}

pub fn not_null(
    value: &Value,
    _params: &[Value],
    _ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(!value.is_null())
}
