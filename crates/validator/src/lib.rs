//! # tessera-validator
//!
//! Constraint expressions, a rule matcher and a record validator.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessera_validator::prelude::*;
//!
//! // Match one value against a rule DSL string
//! let matcher = Matcher::new();
//! assert!(matcher.matches(&Value::from(3), "required|min:2|max:4", None)?);
//!
//! // Validate a whole record
//! let rules = FieldRules::new().rule("items.*.price", "required|numeric")?;
//! let mut report = ValidationReport::new();
//! let output = MatcherBaseValidator::new().validate(&mut report, &input, &rules, None, None)?;
//! ```
//!
//! ## Layers
//!
//! - [`expression`]: [`LogicalGroup`](expression::LogicalGroup),
//!   [`Constraint`](expression::Constraint), [`Condition`](expression::Condition)
//!   and [`ConstraintGroup`](expression::ConstraintGroup), with restriction
//!   policies and the rule DSL parser
//! - [`matcher`]: [`Matcher`](matcher::Matcher) and the builtin predicates
//! - [`validation`]: [`MatcherBaseValidator`](validation::MatcherBaseValidator),
//!   path selectors, casting and failure reports

pub mod config;
pub mod error;
pub mod expression;
pub mod matcher;
pub mod prelude;
pub mod validation;
pub mod value;
