//! Record validation
//!
//! [`MatcherBaseValidator`] applies [`FieldRules`] to a whole record:
//!
//! 1. each field key is resolved to one or more `(path, value)` pairs, with
//!    selectors such as `items.*.price` expanded per match,
//! 2. `required`, `required_if` and `required_unless` run first; a failure is
//!    recorded once and the field's other rules are skipped,
//! 3. every other rule runs and each failure is recorded,
//! 4. values that passed are cast and written back under their concrete path.
//!
//! The returned value is the rebuilt subset of the input that passed.
//!
//! # Examples
//!
//! ```rust,ignore
//! use tessera_validator::prelude::*;
//!
//! let rules = FieldRules::new()
//!     .rule("name", "required|string")?
//!     .rule("items.*.price", "required|numeric|min:0")?;
//!
//! let mut report = ValidationReport::new();
//! let output = MatcherBaseValidator::new().validate(&mut report, &input, &rules, None, None)?;
//! ```

pub mod caster;
pub mod path;
pub mod report;

use std::fmt;

use indexmap::IndexMap;

use crate::config::{Formats, ValidatorConfig};
use crate::error::{ConstraintError, MatcherResult};
use crate::expression::RuleMap;
use crate::matcher::builtins::canonical_name;
use crate::matcher::{Matcher, Rule, rule_to_map};
use crate::value::{Map, NULL, Value};

pub use caster::{Caster, RuleCaster};
pub use path::{JsonPathIterator, PathSegment, deep_set, is_selector, render_path, split_path};
pub use report::{Failure, FailureSink, ValidationReport};

/// Rules evaluated before all others.
const REQUIRED_RULES: [&str; 3] = ["required", "required_if", "required_unless"];

fn is_required_rule(name: &str) -> bool {
    REQUIRED_RULES.contains(&canonical_name(name).as_str())
}

// ============================================================================
// FIELD RULES
// ============================================================================

/// Ordered map of field key (or selector) to its rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRules {
    fields: IndexMap<String, RuleMap>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds rules to `field`, merging with rules it already has.
    ///
    /// A rule name given again replaces its parameters.
    pub fn rule<'r>(
        mut self,
        field: impl Into<String>,
        rule: impl Into<Rule<'r>>,
    ) -> MatcherResult<Self> {
        let map = rule_to_map(&rule.into())?;
        let entry = self.fields.entry(field.into()).or_default();
        for (name, params) in map {
            entry.insert(name, params);
        }
        Ok(self)
    }

    /// Sets the rules of `field`, replacing any previous ones.
    pub fn insert(&mut self, field: impl Into<String>, rules: RuleMap) -> &mut Self {
        self.fields.insert(field.into(), rules);
        self
    }

    pub fn get(&self, field: &str) -> Option<&RuleMap> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RuleMap)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads `{"field": "dsl" | {..} | [..], ...}`.
    pub fn parse(definition: &Value) -> MatcherResult<Self> {
        let Value::Object(fields) = definition else {
            return Err(ConstraintError::parse(
                definition.to_display_string(),
                format!("field rules must be a map, got {}", definition.type_name()),
            )
            .into());
        };

        fields.iter().try_fold(Self::new(), |rules, (field, rule)| match rule {
            Value::String(dsl) => rules.rule(field.as_str(), dsl),
            other => rules.rule(field.as_str(), other),
        })
    }
}

impl FromIterator<(String, RuleMap)> for FieldRules {
    fn from_iter<I: IntoIterator<Item = (String, RuleMap)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Runs a [`Matcher`] over every field of a record.
pub struct MatcherBaseValidator {
    matcher: Matcher,
    caster: Box<dyn Caster + Send + Sync>,
    config: ValidatorConfig,
}

impl Default for MatcherBaseValidator {
    fn default() -> Self {
        Self::with_config(ValidatorConfig::default())
    }
}

impl fmt::Debug for MatcherBaseValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherBaseValidator")
            .field("matcher", &self.matcher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MatcherBaseValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self {
            matcher: Matcher::with_config(config.matcher.clone()),
            caster: Box::new(RuleCaster),
            config,
        }
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_caster(mut self, caster: impl Caster + Send + Sync + 'static) -> Self {
        self.caster = Box::new(caster);
        self
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Mutable access for registering extensions.
    pub fn matcher_mut(&mut self) -> &mut Matcher {
        &mut self.matcher
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Resolves a field key to `(path, value)` pairs.
    ///
    /// Selectors expand to one pair per match, or to `(selector, Null)` when
    /// nothing matches. Plain keys are looked up directly.
    pub fn extract_value<'a>(input: &'a Value, key: &str) -> Vec<(String, &'a Value)> {
        Self::extract_targets(input, key)
            .into_iter()
            .map(|extracted| (extracted.path, extracted.value))
            .collect()
    }

    /// [`extract_value`](Self::extract_value) keeping the concrete segments
    /// each value is written back under.
    fn extract_targets<'a>(input: &'a Value, key: &str) -> Vec<Extracted<'a>> {
        if !is_selector(key) {
            return vec![Extracted {
                path: key.to_string(),
                segments: vec![PathSegment::Key(key.to_string())],
                value: input.get(key).unwrap_or(&NULL),
            }];
        }

        let mut iter = JsonPathIterator::new(input, key);
        let mut targets = Vec::new();
        while let Some((segments, value)) = iter.next_match() {
            targets.push(Extracted {
                path: render_path(&segments),
                segments,
                value,
            });
        }
        tracing::debug!(selector = %key, matches = targets.len(), "expanded selector");

        if targets.is_empty() {
            targets.push(Extracted {
                path: key.to_string(),
                segments: split_path(key),
                value: &NULL,
            });
        }
        targets
    }

    /// Validates `input` against `rules`, recording failures into `sink`.
    ///
    /// `subject` is the record seen by `required_if` / `required_unless`
    /// (defaults to `input`). `formats` defaults to the configured formats.
    /// Only unknown predicates and malformed rules are errors.
    ///
    /// A failing list element is left out, but the output list keeps the
    /// positions of later elements, so its slot holds `Null`. Map members
    /// are written under their own key.
    pub fn validate<S>(
        &self,
        sink: &mut S,
        input: &Value,
        rules: &FieldRules,
        subject: Option<&Value>,
        formats: Option<&Formats>,
    ) -> MatcherResult<Value>
    where
        S: FailureSink + ?Sized,
    {
        let subject = subject.unwrap_or(input);
        let formats = formats.unwrap_or(&self.config.formats);
        let mut output = Value::Object(Map::new());

        for (field, rule_map) in rules.iter() {
            let (required, others): (Vec<_>, Vec<_>) =
                rule_map.iter().partition(|(name, _)| is_required_rule(name));

            for Extracted {
                path,
                segments,
                value,
            } in Self::extract_targets(input, field)
            {
                let target = FieldTarget {
                    path: &path,
                    value,
                    subject,
                    formats,
                };

                if !self.check_required_rules(sink, &target, &required)? {
                    tracing::debug!(path = %path, "required check failed");
                    continue;
                }

                if value.is_null() && self.config.skip_absent_optional {
                    tracing::debug!(path = %path, "absent optional value skipped");
                    continue;
                }

                if !self.check_rules(sink, &target, &others)? {
                    tracing::debug!(path = %path, "field failed");
                    continue;
                }

                let Some(cast) = self.caster.cast(value, rule_map, Some(subject), formats) else {
                    continue;
                };
                deep_set(&mut output, &segments, cast);
                tracing::debug!(path = %path, "field passed");
            }
        }

        Ok(output)
    }

    /// Runs the required family; stops at and records the first failure.
    fn check_required_rules<S>(
        &self,
        sink: &mut S,
        target: &FieldTarget<'_>,
        rules: &[(&String, &Vec<Value>)],
    ) -> MatcherResult<bool>
    where
        S: FailureSink + ?Sized,
    {
        for (name, params) in rules {
            if !self.run(target, name, params)? {
                sink.add_failure(target.path, name, params);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs every rule, recording each failure.
    fn check_rules<S>(
        &self,
        sink: &mut S,
        target: &FieldTarget<'_>,
        rules: &[(&String, &Vec<Value>)],
    ) -> MatcherResult<bool>
    where
        S: FailureSink + ?Sized,
    {
        let mut passed = true;
        for (name, params) in rules {
            if !self.run(target, name, params)? {
                sink.add_failure(target.path, name, params);
                passed = false;
            }
        }
        Ok(passed)
    }

    fn run(&self, target: &FieldTarget<'_>, name: &str, params: &[Value]) -> MatcherResult<bool> {
        self.matcher
            .predicate_with_formats(name, target.value, params, Some(target.subject), target.formats)
            .map_err(|err| {
                tracing::debug!(path = %target.path, rule = %name, error = %err, "rule errored");
                err
            })
    }
}

/// A value found under a field key, with where it came from.
struct Extracted<'a> {
    path: String,
    segments: Vec<PathSegment>,
    value: &'a Value,
}

/// One extracted value and what its rules see.
struct FieldTarget<'a> {
    path: &'a str,
    value: &'a Value,
    subject: &'a Value,
    formats: &'a Formats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn selector_extraction() {
        let input = record(json!({"items": [{"price": 1}, {"price": 2}]}));
        let pairs = MatcherBaseValidator::extract_value(&input, "items.*.price");
        assert_eq!(
            pairs,
            vec![
                ("items[0].price".to_string(), &Value::from(1)),
                ("items[1].price".to_string(), &Value::from(2)),
            ]
        );
    }

    #[test]
    fn map_selector_extraction_quotes_ambiguous_keys() {
        let input = record(json!({"prices": {"10": 5, "a.com": 7, "net": 1}}));
        let paths: Vec<_> = MatcherBaseValidator::extract_value(&input, "prices.*")
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec![r#"prices["10"]"#, r#"prices["a.com"]"#, "prices.net"]);
    }

    #[test]
    fn map_members_are_written_under_their_keys() {
        let input = record(json!({"prices": {"10": "5", "a.com": 7}}));
        let rules = FieldRules::new().rule("prices.*", "int").unwrap();

        let mut report = ValidationReport::new();
        let output = MatcherBaseValidator::new()
            .validate(&mut report, &input, &rules, None, None)
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(
            serde_json::Value::from(output),
            json!({"prices": {"10": 5, "a.com": 7}})
        );
    }

    #[test]
    fn unmatched_selector_yields_null() {
        let input = record(json!({}));
        let pairs = MatcherBaseValidator::extract_value(&input, "items.*.price");
        assert_eq!(pairs, vec![("items.*.price".to_string(), &Value::Null)]);
    }

    #[test]
    fn rebuilds_nested_output() {
        let input = record(json!({"items": [{"price": 1, "junk": true}, {"price": 2}]}));
        let rules = FieldRules::new().rule("items.*.price", "required|numeric").unwrap();

        let mut report = ValidationReport::new();
        let output = MatcherBaseValidator::new()
            .validate(&mut report, &input, &rules, None, None)
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(
            serde_json::Value::from(output),
            json!({"items": [{"price": 1}, {"price": 2}]})
        );
    }

    #[test]
    fn required_failure_short_circuits() {
        let input = record(json!({}));
        let rules = FieldRules::new().rule("name", "required|string|min:3").unwrap();

        let mut report = ValidationReport::new();
        let output = MatcherBaseValidator::new()
            .validate(&mut report, &input, &rules, None, None)
            .unwrap();

        assert_eq!(report.len(), 1);
        assert!(report.has("name", "required"));
        assert_eq!(serde_json::Value::from(output), json!({}));
    }

    #[test]
    fn other_rules_collect_every_failure() {
        let input = record(json!({"code": "ab"}));
        let rules = FieldRules::new().rule("code", "int|min:3").unwrap();

        let mut failures: Vec<Failure> = Vec::new();
        MatcherBaseValidator::new()
            .validate(&mut failures, &input, &rules, None, None)
            .unwrap();

        let names: Vec<_> = failures.iter().map(|f| f.rule.as_str()).collect();
        assert_eq!(names, vec!["int", "min"]);
    }

    #[test]
    fn field_rules_merge_and_parse() {
        let rules = FieldRules::new()
            .rule("age", "min:1")
            .unwrap()
            .rule("age", "max:9|min:2")
            .unwrap();
        let age = rules.get("age").unwrap();
        assert_eq!(age.keys().collect::<Vec<_>>(), vec!["min", "max"]);
        assert_eq!(age["min"], vec![Value::from("2")]);

        let parsed = FieldRules::parse(&record(json!({
            "age": "required|int",
            "tags": {"array": true, "max": [3]},
        })))
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.get("tags").unwrap().contains_key("array"));

        assert!(FieldRules::parse(&record(json!(["age"]))).is_err());
    }

    #[test]
    fn unknown_predicate_aborts_validation() {
        let input = record(json!({"a": 1}));
        let rules = FieldRules::new().rule("a", "frobnicate").unwrap();
        let err = MatcherBaseValidator::new()
            .validate(&mut ValidationReport::new(), &input, &rules, None, None)
            .unwrap_err();
        assert_eq!(err.code(), "MATCHER:UNSUPPORTED_PREDICATE");
    }
}
