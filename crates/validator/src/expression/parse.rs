//! Rule definition parsing.
//!
//! Turns the string DSL (`required|min:3|between:1,9`) and its structured
//! equivalents into an ordered [`RuleMap`].

use crate::error::{ConstraintError, ConstraintResult};
use crate::expression::RuleMap;
use crate::value::Value;

/// Predicates whose single parameter may itself contain commas.
const VERBATIM_PARAMETER_RULES: [&str; 2] = ["regex", "like"];

/// A rule definition in any accepted shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition<'a> {
    /// `name1:p1,p2|name2`
    Dsl(&'a str),
    /// Already normalized map; names are re-normalized to snake_case
    Map(RuleMap),
    /// Object (`{"min": [3]}`), array of DSL strings/objects, or a DSL string
    Value(&'a Value),
}

impl<'a> From<&'a str> for Definition<'a> {
    fn from(dsl: &'a str) -> Self {
        Self::Dsl(dsl)
    }
}

impl<'a> From<&'a String> for Definition<'a> {
    fn from(dsl: &'a String) -> Self {
        Self::Dsl(dsl)
    }
}

impl From<RuleMap> for Definition<'_> {
    fn from(map: RuleMap) -> Self {
        Self::Map(map)
    }
}

impl<'a> From<&'a Value> for Definition<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Value(value)
    }
}

/// Parses a definition into an ordered `name → parameters` map.
///
/// A name given twice keeps its first position and its last parameters.
///
/// # Errors
///
/// [`ConstraintError::Parse`] on an empty segment, an empty name, a dangling
/// `:` or a definition of an unsupported shape.
pub fn explode_constraints<'a>(definition: impl Into<Definition<'a>>) -> ConstraintResult<RuleMap> {
    let mut rules = RuleMap::new();
    match definition.into() {
        Definition::Dsl(dsl) => explode_dsl(dsl, &mut rules)?,
        Definition::Map(map) => {
            for (name, parameters) in map {
                let name = snake_case(&name);
                if name.is_empty() {
                    return Err(ConstraintError::parse("", "empty rule name"));
                }
                rules.insert(name, parameters);
            }
        }
        Definition::Value(value) => explode_value(value, &mut rules)?,
    }
    Ok(rules)
}

fn explode_dsl(dsl: &str, rules: &mut RuleMap) -> ConstraintResult<()> {
    for segment in dsl.split('|') {
        if segment.trim().is_empty() {
            return Err(ConstraintError::parse(dsl, "empty rule segment"));
        }
        let (name, parameters) = name_and_parameters(segment)?;
        rules.insert(name, parameters);
    }
    Ok(())
}

fn explode_value(value: &Value, rules: &mut RuleMap) -> ConstraintResult<()> {
    match value {
        Value::String(dsl) => explode_dsl(dsl, rules),
        Value::Object(map) => {
            for (key, entry) in map {
                // Positional keys carry DSL items: {"0": "required"}
                if key.parse::<usize>().is_ok() {
                    if let Value::String(dsl) = entry {
                        explode_dsl(dsl, rules)?;
                        continue;
                    }
                }
                let name = snake_case(key);
                if name.is_empty() {
                    return Err(ConstraintError::parse(key.as_str(), "empty rule name"));
                }
                match entry {
                    Value::Bool(false) => {}
                    Value::Null | Value::Bool(true) => {
                        rules.insert(name, Vec::new());
                    }
                    Value::Array(items) => {
                        rules.insert(name, items.clone());
                    }
                    other => {
                        rules.insert(name, vec![other.clone()]);
                    }
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(_) | Value::Object(_) => explode_value(item, rules)?,
                    other => {
                        return Err(ConstraintError::parse(
                            other.to_display_string(),
                            format!("unsupported list item of type {}", other.type_name()),
                        ));
                    }
                }
            }
            Ok(())
        }
        other => Err(ConstraintError::parse(
            other.to_display_string(),
            format!("unsupported definition of type {}", other.type_name()),
        )),
    }
}

/// Splits one DSL item into its snake_case name and string parameters.
///
/// `between:1,9` gives `("between", ["1", "9"])`. Parameters are kept as
/// written; `regex` and `like` take everything after the first `:` as their
/// only parameter.
pub fn name_and_parameters(raw: &str) -> ConstraintResult<(String, Vec<Value>)> {
    let (name, parameters) = match raw.split_once(':') {
        Some((name, parameters)) => (name, Some(parameters)),
        None => (raw, None),
    };

    let name = snake_case(name.trim());
    if name.is_empty() {
        return Err(ConstraintError::parse(raw, "empty rule name"));
    }

    let Some(parameters) = parameters else {
        return Ok((name, Vec::new()));
    };
    if parameters.is_empty() {
        return Err(ConstraintError::parse(raw, "empty parameter list"));
    }

    let parameters = if VERBATIM_PARAMETER_RULES.contains(&name.as_str()) {
        vec![Value::from(parameters)]
    } else {
        parameters.split(',').map(Value::from).collect()
    };
    Ok((name, parameters))
}

/// Normalizes a rule name: `notIn`, `not-in` and `NOT_IN` all give `not_in`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '_' || c.is_whitespace() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn names(rules: &RuleMap) -> Vec<&str> {
        rules.keys().map(String::as_str).collect()
    }

    #[test]
    fn dsl_splits_names_and_parameters() {
        let rules = explode_constraints("required|min:3|between:1,9").unwrap();
        assert_eq!(names(&rules), vec!["required", "min", "between"]);
        assert_eq!(rules["required"], Vec::<Value>::new());
        assert_eq!(rules["between"], vec![Value::from("1"), Value::from("9")]);
    }

    #[test]
    fn regex_parameter_is_not_split() {
        let rules = explode_constraints("regex:/^a{1,3}$/|like:%a,b%").unwrap();
        assert_eq!(rules["regex"], vec![Value::from("/^a{1,3}$/")]);
        assert_eq!(rules["like"], vec![Value::from("%a,b%")]);
    }

    #[rstest]
    #[case("")]
    #[case("required||min:3")]
    #[case(":3")]
    #[case("min:")]
    fn malformed_dsl_is_rejected(#[case] dsl: &str) {
        let err = explode_constraints(dsl).unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:PARSE");
    }

    #[test]
    fn object_definition() {
        let value = Value::from(json!({
            "min": [3],
            "maxLength": 9,
            "required": true,
            "nullable": false,
            "filled": null
        }));
        let rules = explode_constraints(&value).unwrap();
        assert_eq!(names(&rules), vec!["min", "max_length", "required", "filled"]);
        assert_eq!(rules["max_length"], vec![Value::from(9)]);
    }

    #[test]
    fn list_definition_mixes_dsl_and_objects() {
        let value = Value::from(json!(["required|string", {"min": [2]}]));
        let rules = explode_constraints(&value).unwrap();
        assert_eq!(names(&rules), vec!["required", "string", "min"]);
    }

    #[test]
    fn positional_keys_hold_dsl_items() {
        let value = Value::from(json!({"0": "required", "max": [4]}));
        let rules = explode_constraints(&value).unwrap();
        assert_eq!(names(&rules), vec!["required", "max"]);
    }

    #[test]
    fn scalar_definition_is_rejected() {
        assert!(explode_constraints(&Value::from(4)).is_err());
    }

    #[rstest]
    #[case("notIn", "not_in")]
    #[case("not-in", "not_in")]
    #[case("alpha_dash", "alpha_dash")]
    #[case("startsWith", "starts_with")]
    #[case("HTMLTags", "html_tags")]
    #[case("Required", "required")]
    fn snake_case_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(snake_case(input), expected);
    }
}
