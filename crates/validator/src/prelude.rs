//! Prelude module for convenient imports.
//!
//! Provides a single `use tessera_validator::prelude::*;` import that brings
//! in the expression model, the matcher and the validator.
//!
//! # Examples
//!
//! ```rust,ignore
//! use tessera_validator::prelude::*;
//!
//! let mut group = LogicalGroup::with_connective(Connective::Or);
//! group.add(Constraint::with_operator("age", ">=", vec![Value::from(18)]))?;
//! ```

// ============================================================================
// VALUES AND ERRORS
// ============================================================================

pub use crate::error::{ConstraintError, ConstraintResult, MatcherError, MatcherResult};
pub use crate::value::Value;

// ============================================================================
// EXPRESSIONS
// ============================================================================

pub use crate::expression::{
    Condition, Connective, Constraint, ConstraintGroup, Expression, ExpressionFilter,
    LogicalGroup, RenderFormat, RuleMap,
};

// ============================================================================
// MATCHING AND VALIDATION
// ============================================================================

pub use crate::config::{Formats, MatcherConfig, ValidatorConfig};
pub use crate::matcher::{GroupMode, Matcher, Rule};
pub use crate::validation::{
    Caster, Failure, FailureSink, FieldRules, MatcherBaseValidator, RuleCaster, ValidationReport,
};
