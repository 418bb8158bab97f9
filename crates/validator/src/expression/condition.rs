//! Operand paired with a constraint or a constraint group.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ConstraintError, ConstraintResult, join_quoted};
use crate::expression::{Constraint, ConstraintGroup, Expression};
use crate::value::Value;

// ============================================================================
// OPERAND
// ============================================================================

/// Left-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Scalar or null: a column name, a literal
    Value(Value),
    /// Nested renderable expression
    Expression(Box<Expression>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Expression(expr) if expr.is_group() => write!(f, "({expr})"),
            Self::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Self::Value(Value::from(s))
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Expression> for Operand {
    fn from(expr: Expression) -> Self {
        Self::Expression(Box::new(expr))
    }
}

// ============================================================================
// CONSTRAINT OR GROUP
// ============================================================================

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintOrGroup {
    Constraint(Constraint),
    Group(ConstraintGroup),
}

impl ConstraintOrGroup {
    pub fn as_constraint(&self) -> Option<&Constraint> {
        match self {
            Self::Constraint(c) => Some(c),
            Self::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&ConstraintGroup> {
        match self {
            Self::Group(group) => Some(group),
            Self::Constraint(_) => None,
        }
    }

    fn allow_operators(&mut self, operators: &BTreeSet<String>) -> ConstraintResult<()> {
        match self {
            Self::Constraint(c) => c.allow_operators(operators.iter().cloned()).map(|_| ()),
            Self::Group(group) => group.allow_operators(operators.iter().cloned()).map(|_| ()),
        }
    }
}

impl From<Constraint> for ConstraintOrGroup {
    fn from(c: Constraint) -> Self {
        Self::Constraint(c)
    }
}

impl From<ConstraintGroup> for ConstraintOrGroup {
    fn from(group: ConstraintGroup) -> Self {
        Self::Group(group)
    }
}

// ============================================================================
// CONDITION
// ============================================================================

/// `operand <constraint>`, e.g. `age > 18` or `name (required AND min:3)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    operand: Operand,
    constraint: ConstraintOrGroup,
    allowed_operators: Option<BTreeSet<String>>,
}

impl Condition {
    /// Creates a condition.
    ///
    /// The operand must be scalar-like (or null) or a renderable expression.
    pub fn new(
        operand: impl Into<Operand>,
        constraint: impl Into<ConstraintOrGroup>,
    ) -> ConstraintResult<Self> {
        let operand = operand.into();
        if let Operand::Value(value) = &operand {
            if value.is_collection() {
                return Err(ConstraintError::unsupported_expression(format!(
                    "condition operand of type {}",
                    value.type_name()
                )));
            }
        }
        Ok(Self {
            operand,
            constraint: constraint.into(),
            allowed_operators: None,
        })
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn constraint(&self) -> &ConstraintOrGroup {
        &self.constraint
    }

    pub fn allowed_operators(&self) -> Option<&BTreeSet<String>> {
        self.allowed_operators.as_ref()
    }

    /// Replaces the constraint, re-validated against a locked allow-list.
    pub fn set_constraint(
        &mut self,
        constraint: impl Into<ConstraintOrGroup>,
    ) -> ConstraintResult<&mut Self> {
        let mut constraint = constraint.into();
        if let Some(allowed) = &self.allowed_operators {
            constraint.allow_operators(allowed)?;
        }
        self.constraint = constraint;
        Ok(self)
    }

    /// Locks the operator allow-list and pushes it down to the constraint.
    pub fn allow_operators<I, S>(&mut self, operators: I) -> ConstraintResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: BTreeSet<String> = operators.into_iter().map(Into::into).collect();
        if let Some(current) = &self.allowed_operators {
            if *current == requested {
                return Ok(self);
            }
            return Err(ConstraintError::locked(
                "allowed_operators",
                join_quoted(current),
                join_quoted(&requested),
            ));
        }
        let mut constraint = self.constraint.clone();
        constraint.allow_operators(&requested)?;
        self.constraint = constraint;
        self.allowed_operators = Some(requested);
        Ok(self)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            ConstraintOrGroup::Constraint(c) => {
                write!(f, "{} {}", self.operand, c.render_operator_string())
            }
            ConstraintOrGroup::Group(group) => write!(f, "{} ({group})", self.operand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_operand_and_constraint() {
        let cond = Condition::new(
            "age",
            Constraint::with_operator("greater", ">", vec![Value::from(18)]),
        )
        .unwrap();
        assert_eq!(cond.to_string(), "age > 18");
    }

    #[test]
    fn renders_group_constraint() {
        let group = ConstraintGroup::parse("required|min:3").unwrap();
        let cond = Condition::new("name", group).unwrap();
        assert_eq!(cond.to_string(), "name (required AND min:3)");
    }

    #[test]
    fn collection_operand_is_rejected() {
        let err = Condition::new(
            Value::Array(vec![]),
            Constraint::new("required", vec![]),
        )
        .unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:UNSUPPORTED_EXPRESSION");
    }

    #[test]
    fn set_constraint_respects_locked_operators() {
        let mut cond = Condition::new(
            "age",
            Constraint::with_operator("compare", "=", vec![Value::from(1)]),
        )
        .unwrap();
        cond.allow_operators(["=", "<>"]).unwrap();

        assert!(
            cond.set_constraint(Constraint::with_operator("compare", "<>", vec![]))
                .is_ok()
        );
        let err = cond
            .set_constraint(Constraint::with_operator("compare", ">", vec![]))
            .unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:OPERATOR_NOT_ALLOWED");
        assert_eq!(cond.to_string(), "age <>");
    }
}
