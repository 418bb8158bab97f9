//! Name-keyed constraint group built from rule definitions.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{ConstraintError, ConstraintResult};
use crate::expression::parse::{Definition, explode_constraints, snake_case};
use crate::expression::{Constraint, Expression, LogicalGroup, RenderFormat, RuleMap};
use crate::value::Value;

/// Constraints keyed by snake_case name, in insertion order.
///
/// Wraps a named [`LogicalGroup`] and derefs to it, so restrictions and
/// rendering are the group's own.
///
/// # Examples
///
/// ```rust,ignore
/// use tessera_validator::expression::ConstraintGroup;
///
/// let mut rules = ConstraintGroup::parse("required|min:3")?;
/// rules.set("max", 9.into())?;
/// assert_eq!(rules.to_string(), "required AND min:3 AND max:9");
/// assert_eq!(rules.parameter("min"), Some("3".into()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintGroup {
    group: LogicalGroup,
    render_format: RenderFormat,
}

impl Default for ConstraintGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintGroup {
    /// Creates an empty group rendering its constraints in name format.
    pub fn new() -> Self {
        Self {
            group: LogicalGroup::named(),
            render_format: RenderFormat::Name,
        }
    }

    /// Parses a definition into a new group.
    pub fn parse<'a>(definition: impl Into<Definition<'a>>) -> ConstraintResult<Self> {
        let mut group = Self::new();
        group.merge(definition)?;
        Ok(group)
    }

    /// Replaces every constraint with the parsed definition.
    pub fn fill<'a>(&mut self, definition: impl Into<Definition<'a>>) -> ConstraintResult<&mut Self> {
        let rules = explode_constraints(definition)?;
        self.group.clear();
        self.merge_rules(rules)
    }

    /// Adds the parsed definition; existing names are replaced in place.
    pub fn merge<'a>(&mut self, definition: impl Into<Definition<'a>>) -> ConstraintResult<&mut Self> {
        let rules = explode_constraints(definition)?;
        self.merge_rules(rules)
    }

    fn merge_rules(&mut self, rules: RuleMap) -> ConstraintResult<&mut Self> {
        for (name, parameters) in rules {
            self.add(Constraint::new(name, parameters))?;
        }
        Ok(self)
    }

    /// Adds a constraint under its own name, taking the group's render format.
    pub fn add(&mut self, mut constraint: Constraint) -> ConstraintResult<&mut Self> {
        constraint.set_render_format(self.render_format);
        self.group.add(constraint)?;
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Keyed access
    // ------------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&Constraint> {
        let name = snake_case(name);
        self.constraints().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Parameters of `name`, narrowed: none gives `None`, one gives the value
    /// itself, more give an array of all of them.
    pub fn parameter(&self, name: &str) -> Option<Value> {
        match self.get(name)?.parameters() {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(Value::Array(many.to_vec())),
        }
    }

    /// Sets the parameters of `name`; an array value is the parameter list.
    pub fn set(&mut self, name: &str, value: Value) -> ConstraintResult<&mut Self> {
        let parameters = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        self.add(Constraint::new(snake_case(name), parameters))
    }

    /// Stores `constraint` under `key`, which must equal its name.
    pub fn insert(&mut self, key: &str, constraint: Constraint) -> ConstraintResult<&mut Self> {
        let key = snake_case(key);
        if key != constraint.name() {
            return Err(ConstraintError::KeyMismatch {
                key,
                name: constraint.name().to_string(),
            });
        }
        self.add(constraint)
    }

    /// Removes the constraint named `name`.
    pub fn unset(&mut self, name: &str) -> &mut Self {
        let name = snake_case(name);
        self.group
            .expressions_mut()
            .retain(|e| e.as_constraint().is_none_or(|c| c.name() != name));
        self
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Top-level constraints in order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.group.expressions().iter().filter_map(Expression::as_constraint)
    }

    pub fn names(&self) -> Vec<&str> {
        self.constraints().map(Constraint::name).collect()
    }

    /// `name → parameters` of the top-level constraints.
    pub fn to_rule_map(&self) -> RuleMap {
        self.constraints()
            .map(|c| (c.name().to_string(), c.parameters().to_vec()))
            .collect()
    }

    pub fn render_format(&self) -> RenderFormat {
        self.render_format
    }

    /// Changes how the group and every constraint in it render.
    pub fn set_render_format(&mut self, format: RenderFormat) -> &mut Self {
        self.render_format = format;
        for expression in self.group.expressions_mut() {
            if let Expression::Constraint(c) = expression {
                c.set_render_format(format);
            }
        }
        self
    }

    pub fn as_group(&self) -> &LogicalGroup {
        &self.group
    }

    pub fn into_group(self) -> LogicalGroup {
        self.group
    }
}

impl Deref for ConstraintGroup {
    type Target = LogicalGroup;

    fn deref(&self) -> &Self::Target {
        &self.group
    }
}

impl DerefMut for ConstraintGroup {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.group
    }
}

impl fmt::Display for ConstraintGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_and_renders_in_name_format() {
        let group = ConstraintGroup::parse("required|min:3|between:1,9").unwrap();
        assert_eq!(group.to_string(), "required AND min:3 AND between:1,9");
        assert_eq!(group.names(), vec!["required", "min", "between"]);
    }

    #[test]
    fn fill_replaces_everything() {
        let mut group = ConstraintGroup::parse("min:3|max:9").unwrap();
        group.fill("required|email").unwrap();
        assert_eq!(group.names(), vec!["required", "email"]);
        assert!(!group.contains("min"));
    }

    #[test]
    fn merge_replaces_in_place_and_appends() {
        let mut group = ConstraintGroup::parse("min:3|max:9").unwrap();
        group.merge("min:5|required").unwrap();
        assert_eq!(group.to_string(), "min:5 AND max:9 AND required");
    }

    #[test]
    fn parameter_narrows_by_count() {
        let group = ConstraintGroup::parse("required|min:3|between:1,9").unwrap();
        assert_eq!(group.parameter("required"), None);
        assert_eq!(group.parameter("min"), Some(Value::from("3")));
        assert_eq!(
            group.parameter("between"),
            Some(Value::from(json!(["1", "9"])))
        );
        assert_eq!(group.parameter("missing"), None);
    }

    #[test]
    fn keyed_access_normalizes_names() {
        let mut group = ConstraintGroup::new();
        group.set("maxLength", Value::from(9)).unwrap();
        group.set("in", Value::from(json!([1, 2]))).unwrap();
        assert!(group.contains("max_length"));
        assert_eq!(group.get("in").unwrap().parameters().len(), 2);

        group.unset("max-length");
        assert_eq!(group.names(), vec!["in"]);
    }

    #[test]
    fn insert_requires_matching_key() {
        let mut group = ConstraintGroup::new();
        let err = group
            .insert("min", Constraint::new("max", vec![Value::from(1)]))
            .unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:KEY_MISMATCH");
        assert!(group.insert("Min", Constraint::new("min", vec![])).is_ok());
    }

    #[test]
    fn object_definition_builds_group() {
        let value = Value::from(json!({"min": [3], "max": [9]}));
        let group = ConstraintGroup::parse(&value).unwrap();
        assert_eq!(group.to_rule_map().len(), 2);
        assert_eq!(group.to_string(), "min:3 AND max:9");
    }

    #[test]
    fn operator_format_renders_calls() {
        let mut group = ConstraintGroup::parse("between:1,9").unwrap();
        group.set_render_format(RenderFormat::Operator);
        assert_eq!(group.to_string(), "between(1, 9)");
    }

    #[test]
    fn restrictions_come_from_the_group() {
        let mut group = ConstraintGroup::parse("min:1").unwrap();
        group.allow_max_conditions(1).unwrap();
        assert!(group.set("min", Value::from(2)).is_ok());
        assert!(group.set("max", Value::from(3)).is_err());
    }
}
