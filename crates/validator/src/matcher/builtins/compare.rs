//! Equality, ordering and size-coerced range predicates.
//!
//! Ordering goes through [`make_comparable`]: date/times compare by
//! timestamp, everything else by [`size_of`]. Equality operators skip that
//! coercion and require [`is_comparable`] operands instead.

use super::temporal::lenient_timestamp;
use super::{PredicateContext, check_min_params, flag, number_param, param};
use crate::config::Formats;
use crate::error::{MatcherError, MatcherResult};
use crate::value::Value;

/// Derived size used by ordering comparisons.
///
/// Numbers and numeric strings are themselves, collections their element
/// count, other strings their character count, `null` is 0 and booleans 1/0.
pub fn size_of(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::DateTime(dt) => dt.timestamp() as f64,
        other => other
            .as_number()
            .or_else(|| other.collection_len().map(|n| n as f64))
            .unwrap_or_else(|| other.to_display_string().chars().count() as f64),
    }
}

/// Same type, both numeric, or either side bool/null.
pub fn is_comparable(a: &Value, b: &Value) -> bool {
    a.type_name() == b.type_name()
        || (a.is_numeric() && b.is_numeric())
        || matches!(a, Value::Bool(_) | Value::Null)
        || matches!(b, Value::Bool(_) | Value::Null)
}

/// Projects both operands onto numbers.
///
/// When either side is a date/time both are parsed as timestamps; `None`
/// when one of them cannot be parsed.
pub fn make_comparable(value: &Value, param: &Value, formats: &Formats) -> Option<(f64, f64)> {
    if matches!(value, Value::DateTime(_)) || matches!(param, Value::DateTime(_)) {
        let left = lenient_timestamp(value, None, formats)?;
        let right = lenient_timestamp(param, None, formats)?;
        return Some((left as f64, right as f64));
    }
    Some((size_of(value), size_of(param)))
}

/// Compares `left <operator> right`.
///
/// Operators: `< > <= >= = != <> is` and `is not`. `strict` turns equality
/// into identity. Unknown operators are an error.
pub fn compare_values(
    left: &Value,
    operator: &str,
    right: &Value,
    strict: bool,
    formats: &Formats,
) -> MatcherResult<bool> {
    let op = operator.trim().to_ascii_lowercase();
    let equal = |l: &Value, r: &Value| if strict { l.identical(r) } else { l.loose_eq(r) };

    match op.as_str() {
        "=" | "==" | "is" => Ok(is_comparable(left, right) && equal(left, right)),
        "!=" | "<>" | "is not" => Ok(is_comparable(left, right) && !equal(left, right)),
        "<" | ">" | "<=" | ">=" => {
            let Some((a, b)) = make_comparable(left, right, formats) else {
                return Ok(false);
            };
            Ok(match op.as_str() {
                "<" => a < b,
                ">" => a > b,
                "<=" => a <= b,
                _ => a >= b,
            })
        }
        _ => Err(MatcherError::unsupported_operator(operator)),
    }
}

fn ordered(
    value: &Value,
    operator: &str,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    let bound = param(ctx, params, 0)?;
    compare_values(value, operator, bound, false, ctx.formats)
}

// ============================================================================
// EQUALITY
// ============================================================================

/// `compare(value, operator, right, strict = false)`
pub fn compare(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    check_min_params(ctx, params, 2)?;
    let operator = params[0].to_display_string();
    let strict = params.get(2).is_some_and(flag);
    compare_values(value, &operator, &params[1], strict, ctx.formats)
}

/// Loose equality
pub fn equals(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(value.loose_eq(param(ctx, params, 0)?))
}

/// Loose inequality
pub fn not_equal(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(!value.loose_eq(param(ctx, params, 0)?))
}

/// Strict equality of comparable values
pub fn is(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    compare_values(value, "is", param(ctx, params, 0)?, true, ctx.formats)
}

/// Strict inequality of comparable values
pub fn is_not(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    compare_values(value, "is not", param(ctx, params, 0)?, true, ctx.formats)
}

// ============================================================================
// RANGES
// ============================================================================

pub fn min(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    ordered(value, ">=", params, ctx)
}

pub fn max(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    ordered(value, "<=", params, ctx)
}

pub fn greater(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    ordered(value, ">", params, ctx)
}

pub fn less(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    ordered(value, "<", params, ctx)
}

/// Inclusive range
pub fn between(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    check_min_params(ctx, params, 2)?;
    Ok(compare_values(value, ">=", &params[0], false, ctx.formats)?
        && compare_values(value, "<=", &params[1], false, ctx.formats)?)
}

/// Exact derived size
pub fn size(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let expected = param(ctx, params, 0)?;
    Ok(make_comparable(value, expected, ctx.formats).is_some_and(|(a, b)| a == b))
}

/// String length: exact `n`, `"lo-hi"`, or `lo, hi`
pub fn length(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    check_min_params(ctx, params, 1)?;
    let len = value.to_display_string().chars().count() as f64;

    if params.len() >= 2 {
        let lo = number_param(ctx, params, 0)?;
        let hi = number_param(ctx, params, 1)?;
        return Ok(lo <= len && len <= hi);
    }

    if let Value::String(spec) = &params[0] {
        if let Some((lo, hi)) = spec.split_once('-') {
            if !lo.trim().is_empty() {
                let parse = |s: &str| {
                    s.trim().parse::<f64>().map_err(|_| {
                        MatcherError::invalid_parameter(
                            ctx.name,
                            format!("'{spec}' is not a length or a 'lo-hi' range"),
                        )
                    })
                };
                let (lo, hi) = (parse(lo)?, parse(hi)?);
                return Ok(lo <= len && len <= hi);
            }
        }
    }

    Ok(len == number_param(ctx, params, 0)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn run(
        predicate: crate::matcher::builtins::BuiltinPredicate,
        name: &str,
        value: Value,
        params: serde_json::Value,
    ) -> MatcherResult<bool> {
        let params = match v(params) {
            Value::Array(items) => items,
            other => vec![other],
        };
        predicate(&value, &params, &PredicateContext::new(name))
    }

    #[rstest]
    #[case(json!([]), json!(4), false)]
    #[case(json!(3), json!("3"), true)]
    #[case(json!("a"), json!("b"), true)]
    #[case(json!(null), json!([1]), true)]
    #[case(json!(true), json!("x"), true)]
    #[case(json!("abc"), json!(3), false)]
    fn comparability(
        #[case] a: serde_json::Value,
        #[case] b: serde_json::Value,
        #[case] expected: bool,
    ) {
        assert_eq!(is_comparable(&v(a), &v(b)), expected);
    }

    #[rstest]
    #[case(json!(null), 0.0)]
    #[case(json!(true), 1.0)]
    #[case(json!("12.5"), 12.5)]
    #[case(json!("héllo"), 5.0)]
    #[case(json!([1, 2, 3]), 3.0)]
    #[case(json!({"a": 1}), 1.0)]
    fn derived_sizes(#[case] value: serde_json::Value, #[case] expected: f64) {
        assert_eq!(size_of(&v(value)), expected);
    }

    #[test]
    fn strict_operators_require_comparable_operands() {
        let formats = Formats::new();
        let empty = v(json!([]));
        let four = Value::from(4);
        assert!(!compare_values(&empty, "=", &four, false, &formats).unwrap());
        assert!(!compare_values(&empty, "!=", &four, false, &formats).unwrap());
        assert!(compare_values(&empty, "<", &four, false, &formats).unwrap());
    }

    #[test]
    fn strict_flag_means_identity() {
        let formats = Formats::new();
        let three = Value::from(3);
        assert!(compare_values(&three, "=", &Value::from("3"), false, &formats).unwrap());
        assert!(!compare_values(&three, "=", &Value::from("3"), true, &formats).unwrap());
        assert!(compare_values(&three, "is not", &Value::from("3"), true, &formats).unwrap());
    }

    #[test]
    fn unknown_operator_fails() {
        let err = compare_values(&Value::Null, "~", &Value::Null, false, &Formats::new())
            .unwrap_err();
        assert_eq!(err.code(), "MATCHER:UNSUPPORTED_OPERATOR");
    }

    #[test]
    fn compare_predicate_reads_strict_flag() {
        assert!(run(compare, "compare", Value::from(5), json!([">", "3"])).unwrap());
        assert!(!run(compare, "compare", Value::from(5), json!(["=", "5", true])).unwrap());
        assert!(run(compare, "compare", Value::from(5), json!(["=", "5", "false"])).unwrap());
        assert!(run(compare, "compare", Value::from(5), json!(["="])).is_err());
    }

    #[test]
    fn ranges_use_derived_size() {
        assert!(run(min, "min", v(json!([])), json!(["0"])).unwrap());
        assert!(run(max, "max", v(json!([1, 2])), json!(["2"])).unwrap());
        assert!(!run(min, "min", Value::from("ab"), json!(["3"])).unwrap());
        assert!(run(between, "between", Value::from(5), json!(["1", "9"])).unwrap());
        assert!(!run(between, "between", Value::from(10), json!(["1", "9"])).unwrap());
        assert!(run(greater, "greater", Value::from(2), json!([1])).unwrap());
        assert!(run(less, "less", Value::from(0), json!([1])).unwrap());
        assert!(run(size, "size", v(json!([1, 2, 3])), json!(["3"])).unwrap());
        assert!(run(size, "size", Value::from(7), json!([7])).unwrap());
    }

    #[test]
    fn min_without_parameter_is_fatal() {
        let err = run(min, "min", Value::from(1), json!([])).unwrap_err();
        assert_eq!(err.code(), "MATCHER:MISSING_PARAMETER");
    }

    #[rstest]
    #[case(json!("abc"), json!(["3"]), true)]
    #[case(json!(12345), json!(["5"]), true)]
    #[case(json!("abcd"), json!(["2-4"]), true)]
    #[case(json!("abcde"), json!(["2-4"]), false)]
    #[case(json!("ab"), json!(["1", "2"]), true)]
    fn length_forms(
        #[case] value: serde_json::Value,
        #[case] params: serde_json::Value,
        #[case] expected: bool,
    ) {
        assert_eq!(run(length, "length", v(value), params).unwrap(), expected);
    }

    #[test]
    fn equality_predicates() {
        assert!(run(equals, "equals", Value::from("1"), json!([1])).unwrap());
        assert!(run(not_equal, "not_equal", Value::from("1"), json!([2])).unwrap());
        assert!(run(is, "is", Value::from(1), json!([1])).unwrap());
        assert!(!run(is, "is", Value::from(1), json!(["1"])).unwrap());
        assert!(run(is_not, "is_not", Value::from(1), json!([2])).unwrap());
    }
}
