//! Casting of validated values
//!
//! After a value passes its rules, the validator hands it to a [`Caster`]
//! together with those rules. [`RuleCaster`] converts by the first type rule
//! it recognizes and leaves everything else untouched.

use crate::expression::RuleMap;
use crate::matcher::builtins::canonical_name;
use crate::matcher::builtins::temporal::{lenient_datetime, to_datetime};
use crate::matcher::builtins::types::{as_bool_like, is_integer_like};
use crate::value::Value;

pub use crate::config::Formats;

/// Turns a validated value into its output form.
///
/// `None` keeps the value out of the output. Implementations must be
/// deterministic and free of side effects.
pub trait Caster {
    fn cast(
        &self,
        value: &Value,
        rules: &RuleMap,
        subject: Option<&Value>,
        formats: &Formats,
    ) -> Option<Value>;
}

/// Rule-driven caster.
///
/// | rule                         | output                              |
/// |------------------------------|-------------------------------------|
/// | `int`                        | `Int`                               |
/// | `float`, `numeric`           | `Int` for integers, else `Float`    |
/// | `bool`, `true`, `false`      | `Bool`                              |
/// | `string`                     | `String`                            |
/// | `date`, `datetime`           | `DateTime`                          |
///
/// `Null` is kept only when the rules name `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCaster;

impl RuleCaster {
    pub fn new() -> Self {
        Self
    }

    fn cast_by_rule(name: &str, params: &[Value], value: &Value, formats: &Formats) -> Option<Value> {
        match name {
            "int" => cast_int(value),
            "float" | "numeric" => cast_number(value),
            "bool" | "true" | "false" => as_bool_like(value).map(Value::Bool),
            "string" => Some(Value::String(value.to_display_string())),
            "date" | "datetime" => {
                let format = params
                    .first()
                    .filter(|p| !p.is_null())
                    .map(Value::to_display_string)
                    .or_else(|| formats.get(name).cloned());
                format
                    .and_then(|f| to_datetime(value, Some(&f)))
                    .or_else(|| lenient_datetime(value, None, formats))
                    .map(Value::DateTime)
            }
            _ => None,
        }
    }
}

fn cast_int(value: &Value) -> Option<Value> {
    match value {
        Value::Int(_) => Some(value.clone()),
        Value::String(s) if is_integer_like(value) => s.trim().parse::<i64>().ok().map(Value::Int),
        _ => None,
    }
}

fn cast_number(value: &Value) -> Option<Value> {
    if let Some(int) = cast_int(value) {
        return Some(int);
    }
    value.as_number().map(Value::Float)
}

impl Caster for RuleCaster {
    fn cast(
        &self,
        value: &Value,
        rules: &RuleMap,
        _subject: Option<&Value>,
        formats: &Formats,
    ) -> Option<Value> {
        let mut names = rules.iter().map(|(name, params)| (canonical_name(name), params));

        if value.is_null() {
            return names
                .any(|(name, _)| name == "null")
                .then_some(Value::Null);
        }

        let cast = names.find_map(|(name, params)| Self::cast_by_rule(&name, params, value, formats));
        Some(cast.unwrap_or_else(|| value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn rules(names: &[&str]) -> RuleMap {
        names.iter().map(|n| (n.to_string(), Vec::new())).collect()
    }

    #[rstest]
    #[case(&["required", "int"], Value::from("42"), Value::Int(42))]
    #[case(&["integer"], Value::from(" 7 "), Value::Int(7))]
    #[case(&["numeric"], Value::from("1.5"), Value::Float(1.5))]
    #[case(&["numeric"], Value::from("3"), Value::Int(3))]
    #[case(&["bool"], Value::from("yes"), Value::Bool(true))]
    #[case(&["string"], Value::from(12), Value::from("12"))]
    #[case(&["min"], Value::from("abc"), Value::from("abc"))]
    fn casts_by_first_type_rule(#[case] names: &[&str], #[case] input: Value, #[case] expected: Value) {
        let cast = RuleCaster.cast(&input, &rules(names), None, &Formats::new());
        assert_eq!(cast, Some(expected));
    }

    #[test]
    fn null_needs_a_null_rule() {
        let caster = RuleCaster::new();
        assert_eq!(caster.cast(&Value::Null, &rules(&["int"]), None, &Formats::new()), None);
        assert_eq!(
            caster.cast(&Value::Null, &rules(&["null"]), None, &Formats::new()),
            Some(Value::Null)
        );
    }

    #[test]
    fn dates_use_named_formats() {
        let mut formats = Formats::new();
        formats.insert("date".into(), "d/m/Y".into());
        let cast = RuleCaster
            .cast(&Value::from("14/03/2024"), &rules(&["date"]), None, &formats)
            .unwrap();
        match cast {
            Value::DateTime(dt) => assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-03-14"),
            other => panic!("expected a date, got {other:?}"),
        }
    }
}
