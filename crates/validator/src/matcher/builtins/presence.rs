//! Presence predicates
//!
//! `required_if` and `required_unless` read another field of the subject
//! record; the field name may be any path selector.

use super::{PredicateContext, param};
use crate::error::MatcherResult;
use crate::validation::path::lookup;
use crate::value::{NULL, Value};

/// Not null, not a blank string, not an empty collection.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

pub fn required(
    value: &Value,
    _params: &[Value],
    _ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(is_present(value))
}

/// Whether the other field named by `params[0]` triggers the requirement:
/// its presence, or its loose equality with `params[1]` when given.
fn other_field_matches(params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let field = param(ctx, params, 0)?.to_display_string();
    let other = ctx
        .subject
        .and_then(|subject| lookup(subject, &field))
        .unwrap_or(&NULL);

    Ok(match params.get(1) {
        Some(expected) => other.loose_eq(expected),
        None => is_present(other),
    })
}

/// `required_if(field, value?)`
pub fn required_if(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(!other_field_matches(params, ctx)? || is_present(value))
}

/// `required_unless(field, value?)`
pub fn required_unless(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(other_field_matches(params, ctx)? || is_present(value))
}

/// Not empty in the loose sense: `0`, `"0"`, `""`, `false` and empty
/// collections fail
pub fn filled(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(value.is_truthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!("  "), false)]
    #[case(json!([]), false)]
    #[case(json!({}), false)]
    #[case(json!(0), true)]
    #[case(json!(false), true)]
    #[case(json!("x"), true)]
    fn presence(#[case] value: serde_json::Value, #[case] expected: bool) {
        assert_eq!(is_present(&Value::from(value)), expected);
    }

    #[test]
    fn required_if_other_absent_is_not_required() {
        let subject = Value::from(json!({}));
        let ctx = PredicateContext::new("required_if").with_subject(Some(&subject));
        assert!(required_if(&Value::Null, &[Value::from("other")], &ctx).unwrap());
    }

    #[test]
    fn required_if_other_present_requires_value() {
        let subject = Value::from(json!({"other": "x"}));
        let ctx = PredicateContext::new("required_if").with_subject(Some(&subject));
        assert!(!required_if(&Value::Null, &[Value::from("other")], &ctx).unwrap());
        assert!(required_if(&Value::from("y"), &[Value::from("other")], &ctx).unwrap());
    }

    #[test]
    fn required_if_compares_with_expected_value() {
        let subject = Value::from(json!({"kind": {"name": "company"}}));
        let ctx = PredicateContext::new("required_if").with_subject(Some(&subject));
        let params = [Value::from("kind.name"), Value::from("person")];
        assert!(required_if(&Value::Null, &params, &ctx).unwrap());

        let params = [Value::from("kind.name"), Value::from("company")];
        assert!(!required_if(&Value::Null, &params, &ctx).unwrap());
    }

    #[test]
    fn required_unless_inverts_the_trigger() {
        let subject = Value::from(json!({"email": "a@b.c"}));
        let ctx = PredicateContext::new("required_unless").with_subject(Some(&subject));
        assert!(required_unless(&Value::Null, &[Value::from("email")], &ctx).unwrap());
        assert!(!required_unless(&Value::Null, &[Value::from("phone")], &ctx).unwrap());
    }

    #[test]
    fn required_if_without_field_is_fatal() {
        let ctx = PredicateContext::new("required_if");
        assert!(required_if(&Value::Null, &[], &ctx).is_err());
    }

    #[test]
    fn filled_is_loose_non_empty() {
        let ctx = PredicateContext::new("filled");
        assert!(filled(&Value::from("a"), &[], &ctx).unwrap());
        assert!(!filled(&Value::from("0"), &[], &ctx).unwrap());
        assert!(!filled(&Value::Null, &[], &ctx).unwrap());
    }
}
