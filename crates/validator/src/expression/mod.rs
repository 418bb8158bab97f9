//! Constraint expression model
//!
//! A small composable boolean-expression language over named predicates:
//!
//! - [`Constraint`]: one named predicate with ordered parameters and an
//!   optional comparison operator (`min:3`, `> 18`)
//! - [`Condition`]: an operand paired with a constraint or constraint group
//!   (`age > 18`)
//! - [`LogicalGroup`]: ordered expressions joined by a [`Connective`], with
//!   set-once restriction policies
//! - [`ConstraintGroup`]: a name-keyed group parsed from the rule DSL
//!   (`required|min:3|max:9`)
//!
//! # Examples
//!
//! ```rust,ignore
//! use tessera_validator::expression::{ConstraintGroup, Connective, LogicalGroup};
//!
//! let rules = ConstraintGroup::parse("required|min:3|max:9")?;
//! assert_eq!(rules.to_string(), "required AND min:3 AND max:9");
//!
//! let mut group = LogicalGroup::with_connective(Connective::Or);
//! group.allow_max_conditions(2)?;
//! ```

pub mod condition;
pub mod constraint;
pub mod constraint_group;
pub mod group;
pub mod parse;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConstraintError, ConstraintResult};
use crate::value::Value;

pub use condition::{Condition, ConstraintOrGroup, Operand};
pub use constraint::{Constraint, FLAT_PARAMETER_LIMIT};
pub use constraint_group::ConstraintGroup;
pub use group::{ExpressionFilter, LogicalGroup, NamedIndex, RestrictionPolicy};
pub use parse::{Definition, explode_constraints, name_and_parameters, snake_case};

/// Ordered `name → parameters` map; the normalized form of every rule.
pub type RuleMap = IndexMap<String, Vec<Value>>;

// ============================================================================
// CONNECTIVE
// ============================================================================

/// Boolean operator joining sibling expressions of a group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    /// All expressions hold
    #[default]
    And,
    /// At least one expression holds
    Or,
    /// Not all expressions hold
    Nand,
    /// No expression holds
    Nor,
}

impl Connective {
    /// The universal connective set.
    pub const ALL: [Connective; 4] = [Self::And, Self::Or, Self::Nand, Self::Nor];

    /// Lowercase keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Nand => "nand",
            Self::Nor => "nor",
        }
    }

    /// Separator used when rendering a group.
    pub fn separator(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
            Self::Nand => " NAND ",
            Self::Nor => " NOR ",
        }
    }

    /// Combines child results under this connective.
    ///
    /// Short-circuits like the boolean operators it stands for.
    pub fn combine<I>(self, results: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut results = results.into_iter();
        match self {
            Self::And => results.all(|r| r),
            Self::Or => results.any(|r| r),
            Self::Nand => !results.all(|r| r),
            Self::Nor => !results.any(|r| r),
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.separator().trim())
    }
}

impl FromStr for Connective {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "nand" => Ok(Self::Nand),
            "nor" => Ok(Self::Nor),
            _ => Err(ConstraintError::UnsupportedConnective {
                value: s.to_string(),
            }),
        }
    }
}

/// Anything a connective can be set from: the enum itself or its keyword.
pub trait IntoConnective {
    fn into_connective(self) -> ConstraintResult<Connective>;
}

impl IntoConnective for Connective {
    fn into_connective(self) -> ConstraintResult<Connective> {
        Ok(self)
    }
}

impl IntoConnective for &str {
    fn into_connective(self) -> ConstraintResult<Connective> {
        self.parse()
    }
}

impl IntoConnective for String {
    fn into_connective(self) -> ConstraintResult<Connective> {
        self.parse()
    }
}

// ============================================================================
// RENDER FORMAT
// ============================================================================

/// Which textual form a [`Constraint`] renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// `"<op> <params>"`, or `"<name>(<params>)"` without an operator
    #[default]
    Operator,
    /// `"<name>:<params>"`, or the bare name without parameters
    Name,
}

impl FromStr for RenderFormat {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "operator" => Ok(Self::Operator),
            "name" => Ok(Self::Name),
            _ => Err(ConstraintError::UnsupportedRenderFormat {
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// EXPRESSION
// ============================================================================

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constraint(Constraint),
    Condition(Condition),
    Group(Box<LogicalGroup>),
    /// Pre-rendered leaf, e.g. a fragment produced by another renderer
    Raw(String),
}

impl Expression {
    /// Kind name used by [`ExpressionFilter::class`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Constraint(_) => "Constraint",
            Self::Condition(_) => "Condition",
            Self::Group(group) => match group.index() {
                NamedIndex::Named => "ConstraintGroup",
                NamedIndex::Positional => "LogicalGroup",
            },
            Self::Raw(_) => "Raw",
        }
    }

    /// Constraint name, for constraints and single-constraint conditions.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Constraint(c) => Some(c.name()),
            Self::Condition(cond) => cond.constraint().as_constraint().map(Constraint::name),
            _ => None,
        }
    }

    /// Operator, for constraints and single-constraint conditions.
    pub fn operator(&self) -> Option<&str> {
        match self {
            Self::Constraint(c) => Some(c.operator()),
            Self::Condition(cond) => cond.constraint().as_constraint().map(Constraint::operator),
            _ => None,
        }
    }

    /// Rendered operand, for conditions.
    pub fn operand(&self) -> Option<String> {
        match self {
            Self::Condition(cond) => Some(cond.operand().to_string()),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&LogicalGroup> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_constraint(&self) -> Option<&Constraint> {
        match self {
            Self::Constraint(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constraint(c) => write!(f, "{c}"),
            Self::Condition(cond) => write!(f, "{cond}"),
            Self::Group(group) => write!(f, "{group}"),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

impl From<Constraint> for Expression {
    fn from(c: Constraint) -> Self {
        Self::Constraint(c)
    }
}

impl From<Condition> for Expression {
    fn from(cond: Condition) -> Self {
        Self::Condition(cond)
    }
}

impl From<LogicalGroup> for Expression {
    fn from(group: LogicalGroup) -> Self {
        Self::Group(Box::new(group))
    }
}

impl From<ConstraintGroup> for Expression {
    fn from(group: ConstraintGroup) -> Self {
        Self::Group(Box::new(group.into_group()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("and", Connective::And)]
    #[case("OR", Connective::Or)]
    #[case(" Nand ", Connective::Nand)]
    #[case("nor", Connective::Nor)]
    fn connective_parses_case_insensitively(#[case] input: &str, #[case] expected: Connective) {
        assert_eq!(input.parse::<Connective>().unwrap(), expected);
    }

    #[test]
    fn unknown_connective_is_rejected() {
        let err = "xor".parse::<Connective>().unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:UNSUPPORTED_CONNECTIVE");
    }

    #[rstest]
    #[case(Connective::And, vec![true, true], true)]
    #[case(Connective::And, vec![true, false], false)]
    #[case(Connective::Or, vec![false, true], true)]
    #[case(Connective::Or, vec![false, false], false)]
    #[case(Connective::Nand, vec![true, true], false)]
    #[case(Connective::Nand, vec![true, false], true)]
    #[case(Connective::Nor, vec![false, false], true)]
    #[case(Connective::Nor, vec![false, true], false)]
    fn connective_combines(
        #[case] connective: Connective,
        #[case] results: Vec<bool>,
        #[case] expected: bool,
    ) {
        assert_eq!(connective.combine(results), expected);
    }

    #[test]
    fn render_format_parses() {
        assert_eq!("name".parse::<RenderFormat>().unwrap(), RenderFormat::Name);
        assert!("sql".parse::<RenderFormat>().is_err());
    }

    #[test]
    fn expression_kinds() {
        let c = Expression::from(Constraint::new("min", vec![Value::from(3)]));
        assert_eq!(c.kind(), "Constraint");
        assert_eq!(c.name(), Some("min"));
        assert_eq!(Expression::from(LogicalGroup::new()).kind(), "LogicalGroup");
        assert_eq!(Expression::from(ConstraintGroup::new()).kind(), "ConstraintGroup");
        assert_eq!(Expression::Raw("a = 1".into()).to_string(), "a = 1");
    }
}
