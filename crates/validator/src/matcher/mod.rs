//! Rule matching
//!
//! [`Matcher`] evaluates a rule against a value. Every rule shape (DSL
//! string, rule map, [`Constraint`], [`ConstraintGroup`], [`LogicalGroup`])
//! is first normalized into an ordered [`RuleMap`] by [`rule_to_map`]; each
//! `(name, parameters)` pair is then dispatched to a user extension or a
//! builtin, and the results are combined with AND.
//!
//! # Examples
//!
//! ```rust,ignore
//! use tessera_validator::matcher::Matcher;
//! use tessera_validator::value::Value;
//!
//! let matcher = Matcher::new();
//! assert!(matcher.matches(&Value::from(3), "required|min:2|max:4", None)?);
//! assert!(!matcher.matches(&Value::from(5), "required|min:2|max:4", None)?);
//! ```

pub mod builtins;
pub mod like;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{Formats, MatcherConfig};
use crate::error::{MatcherError, MatcherResult};
use crate::expression::{
    Connective, Constraint, ConstraintGroup, Expression, LogicalGroup, RuleMap,
    explode_constraints,
};
use crate::value::Value;

pub use builtins::{BuiltinPredicate, BuiltinRegistry, PredicateContext, builtins};
pub use registry::{PredicateFn, PredicateRegistry};

// ============================================================================
// RULE
// ============================================================================

/// Any rule representation the matcher accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule<'a> {
    /// `required|min:3`
    Dsl(&'a str),
    /// Normalized rule map
    Map(RuleMap),
    /// Structured definition (object or list), as accepted by
    /// [`explode_constraints`]
    Definition(&'a Value),
    Constraint(&'a Constraint),
    ConstraintGroup(&'a ConstraintGroup),
    LogicalGroup(&'a LogicalGroup),
}

impl<'a> From<&'a str> for Rule<'a> {
    fn from(dsl: &'a str) -> Self {
        Self::Dsl(dsl)
    }
}

impl<'a> From<&'a String> for Rule<'a> {
    fn from(dsl: &'a String) -> Self {
        Self::Dsl(dsl)
    }
}

impl From<RuleMap> for Rule<'_> {
    fn from(map: RuleMap) -> Self {
        Self::Map(map)
    }
}

impl From<&RuleMap> for Rule<'_> {
    fn from(map: &RuleMap) -> Self {
        Self::Map(map.clone())
    }
}

impl<'a> From<&'a Value> for Rule<'a> {
    fn from(definition: &'a Value) -> Self {
        Self::Definition(definition)
    }
}

impl<'a> From<&'a Constraint> for Rule<'a> {
    fn from(constraint: &'a Constraint) -> Self {
        Self::Constraint(constraint)
    }
}

impl<'a> From<&'a ConstraintGroup> for Rule<'a> {
    fn from(group: &'a ConstraintGroup) -> Self {
        Self::ConstraintGroup(group)
    }
}

impl<'a> From<&'a LogicalGroup> for Rule<'a> {
    fn from(group: &'a LogicalGroup) -> Self {
        Self::LogicalGroup(group)
    }
}

impl fmt::Display for Rule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dsl(dsl) => f.write_str(dsl),
            Self::Map(map) => write!(f, "{}", render_rule_map(map)),
            Self::Definition(value) => write!(f, "{value}"),
            Self::Constraint(c) => f.write_str(&c.render_name_string()),
            Self::ConstraintGroup(group) => write!(f, "{group}"),
            Self::LogicalGroup(group) => write!(f, "{group}"),
        }
    }
}

fn render_rule_map(map: &RuleMap) -> String {
    map.iter()
        .map(|(name, params)| Constraint::new(name.as_str(), params.clone()).render_name_string())
        .collect::<Vec<_>>()
        .join("|")
}

// ============================================================================
// GROUP MODE
// ============================================================================

/// How the matcher treats groups whose connective is not AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    /// Flatten every group into one AND-ed rule map
    #[default]
    Flatten,
    /// Evaluate children and combine them with the group's connective
    Evaluate,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalized `(name, parameters)` form of one constraint.
///
/// Operator constraints become `compare` (strict) except `like`, which keeps
/// its name.
pub fn constraint_to_pair(constraint: &Constraint) -> (String, Vec<Value>) {
    match constraint.operator() {
        "" => (constraint.name().to_string(), constraint.parameters().to_vec()),
        op if op.eq_ignore_ascii_case("like") => {
            ("like".to_string(), constraint.parameters().to_vec())
        }
        op => {
            let right = constraint.parameters().first().cloned().unwrap_or_default();
            (
                "compare".to_string(),
                vec![Value::from(op), right, Value::Bool(true)],
            )
        }
    }
}

/// Flattens any rule into an ordered rule map.
///
/// Groups become the union of their constraints; a later constraint with the
/// same name overwrites an earlier one. Only AND semantics survive the
/// flattening, so non-AND groups are logged.
pub fn rule_to_map(rule: &Rule<'_>) -> MatcherResult<RuleMap> {
    match rule {
        Rule::Dsl(dsl) => Ok(explode_constraints(*dsl)?),
        Rule::Map(map) => Ok(explode_constraints(map.clone())?),
        Rule::Definition(value) => Ok(explode_constraints(*value)?),
        Rule::Constraint(constraint) => {
            let (name, params) = constraint_to_pair(constraint);
            Ok(RuleMap::from_iter([(name, params)]))
        }
        Rule::ConstraintGroup(group) => {
            let mut map = RuleMap::new();
            flatten_group(group.as_group(), &mut map)?;
            Ok(map)
        }
        Rule::LogicalGroup(group) => {
            let mut map = RuleMap::new();
            flatten_group(group, &mut map)?;
            Ok(map)
        }
    }
}

fn flatten_group(group: &LogicalGroup, map: &mut RuleMap) -> MatcherResult<()> {
    if group.connective() != Connective::And && group.len() > 1 {
        tracing::warn!(
            connective = %group.connective(),
            group = %group,
            "flattening a non-AND group into AND semantics"
        );
    }
    for expression in group.expressions() {
        match expression {
            Expression::Constraint(constraint) => {
                let (name, params) = constraint_to_pair(constraint);
                map.insert(name, params);
            }
            Expression::Group(child) => flatten_group(child, map)?,
            other => {
                return Err(MatcherError::UnsupportedRule {
                    kind: other.kind().to_string(),
                });
            }
        }
    }
    Ok(())
}

// ============================================================================
// MATCHER
// ============================================================================

/// Predicate evaluator with a user-extensible registry.
///
/// Configure first (`extend`, `with_config`), then share read-only.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    extensions: PredicateRegistry,
    config: MatcherConfig,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatcherConfig) -> Self {
        Self {
            extensions: PredicateRegistry::new(),
            config,
        }
    }

    /// Replaces the extension registry.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_registry(mut self, registry: PredicateRegistry) -> Self {
        self.extensions = registry;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &PredicateRegistry {
        &self.extensions
    }

    /// Registers or overrides a predicate. Extensions win over builtins.
    pub fn extend<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Value, &[Value], Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.extensions.register(name, predicate);
        self
    }

    pub fn supports(&self, name: &str) -> bool {
        self.extensions.contains(name) || builtins().contains(name)
    }

    /// Extension and builtin names, sorted and unique.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.extensions.names().map(str::to_string).collect();
        names.extend(builtins().names().map(str::to_string));
        names.sort_unstable();
        names.dedup();
        names
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Whether `value` satisfies every predicate of `rule`.
    ///
    /// Stops at the first failing predicate.
    pub fn matches<'r>(
        &self,
        value: &Value,
        rule: impl Into<Rule<'r>>,
        subject: Option<&Value>,
    ) -> MatcherResult<bool> {
        let rule = rule.into();
        let formats = Formats::new();

        if self.config.group_mode == GroupMode::Evaluate {
            match &rule {
                Rule::ConstraintGroup(group) => {
                    return self.evaluate_group(value, group.as_group(), subject, &formats);
                }
                Rule::LogicalGroup(group) => {
                    return self.evaluate_group(value, group, subject, &formats);
                }
                _ => {}
            }
        }

        for (name, params) in &rule_to_map(&rule)? {
            if !self.predicate_with_formats(name, value, params, subject, &formats)? {
                tracing::trace!(predicate = %name, "rule failed");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Like [`matches`](Self::matches), but a failed match is a
    /// [`MatcherError::ConstraintViolation`].
    pub fn force<'r>(
        &self,
        value: &Value,
        rule: impl Into<Rule<'r>>,
        subject: Option<&Value>,
    ) -> MatcherResult<bool> {
        let rule = rule.into();
        if self.matches(value, rule.clone(), subject)? {
            Ok(true)
        } else {
            Err(MatcherError::ConstraintViolation {
                rule: rule.to_string(),
                value: value.clone(),
            })
        }
    }

    /// Evaluates one named predicate.
    pub fn predicate(
        &self,
        name: &str,
        value: &Value,
        params: &[Value],
        subject: Option<&Value>,
    ) -> MatcherResult<bool> {
        self.predicate_with_formats(name, value, params, subject, &Formats::new())
    }

    /// Evaluates one named predicate with named date formats.
    pub fn predicate_with_formats(
        &self,
        name: &str,
        value: &Value,
        params: &[Value],
        subject: Option<&Value>,
        formats: &Formats,
    ) -> MatcherResult<bool> {
        if let Some(extension) = self.extensions.get(name) {
            tracing::trace!(predicate = %name, "dispatching to extension");
            return Ok(extension(value, params, subject));
        }

        let Some((canonical, predicate)) = builtins().resolve(name) else {
            return Err(MatcherError::unsupported_predicate(name));
        };
        tracing::trace!(predicate = %canonical, "dispatching to builtin");

        let ctx = PredicateContext::new(&canonical)
            .with_subject(subject)
            .with_formats(formats)
            .with_like_escape(self.config.like_escape);
        predicate(value, params, &ctx)
    }

    fn evaluate_group(
        &self,
        value: &Value,
        group: &LogicalGroup,
        subject: Option<&Value>,
        formats: &Formats,
    ) -> MatcherResult<bool> {
        let connective = group.connective();
        // The result that settles the group on its own
        let decisive = matches!(connective, Connective::Or | Connective::Nor);

        for expression in group.expressions() {
            let result = match expression {
                Expression::Constraint(constraint) => {
                    let (name, params) = constraint_to_pair(constraint);
                    self.predicate_with_formats(&name, value, &params, subject, formats)?
                }
                Expression::Group(child) => self.evaluate_group(value, child, subject, formats)?,
                other => {
                    return Err(MatcherError::UnsupportedRule {
                        kind: other.kind().to_string(),
                    });
                }
            };
            if result == decisive {
                return Ok(connective.combine([result]));
            }
        }
        Ok(connective.combine(std::iter::empty()))
    }
}
