//! Error types for the constraint model and the matcher.
//!
//! Uses thiserror. Both enums are programmer/configuration errors: they are
//! returned immediately and never recovered locally. Expected validation
//! failures are *not* errors; they are recorded into a
//! [`FailureSink`](crate::validation::FailureSink).

use thiserror::Error;

use crate::value::Value;

/// Result alias for expression-model operations.
pub type ConstraintResult<T> = Result<T, ConstraintError>;

/// Result alias for matcher and validator operations.
pub type MatcherResult<T> = Result<T, MatcherError>;

// ============================================================================
// CONSTRAINT ERROR
// ============================================================================

/// Errors raised while building, restricting or parsing expressions.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// Connective outside `{and, or, nand, nor}`
    #[error("Unsupported connective '{value}'")]
    UnsupportedConnective { value: String },

    /// Connective is valid but not in the group's allow-list
    #[error("Connective '{connective}' is not allowed, allowed: {allowed}")]
    ConnectiveNotAllowed { connective: String, allowed: String },

    /// Child group uses a different connective while multiple are forbidden
    #[error("Multiple connectives are forbidden: expected '{expected}', found '{found}'")]
    MixedConnectives { expected: String, found: String },

    /// Operator outside the allow-list
    #[error("Operator '{operator}' is not allowed, allowed: {allowed}")]
    OperatorNotAllowed { operator: String, allowed: String },

    /// Render format name outside `{operator, name}`
    #[error("Unsupported render format '{value}'")]
    UnsupportedRenderFormat { value: String },

    /// A set-once restriction was set again with a different value
    #[error("Restriction '{restriction}' is already locked to {current}, cannot change to {requested}")]
    RestrictionLocked {
        restriction: &'static str,
        current: String,
        requested: String,
    },

    /// Nested group added to a group that forbids nesting
    #[error("Nesting is not allowed in this group")]
    NestingForbidden,

    /// Group is full
    #[error("Group accepts at most {max} conditions")]
    MaxConditionsExceeded { max: usize },

    /// Expression kind not accepted by this group or operation
    #[error("Unsupported expression: {kind}")]
    UnsupportedExpression { kind: String },

    /// Rule definition could not be parsed
    #[error("Cannot parse rule definition '{definition}': {message}")]
    Parse { definition: String, message: String },

    /// Keyed insert where the key does not match the constraint name
    #[error("Key '{key}' does not match constraint name '{name}'")]
    KeyMismatch { key: String, name: String },
}

impl ConstraintError {
    /// Get error code for categorization
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedConnective { .. } => "CONSTRAINT:UNSUPPORTED_CONNECTIVE",
            Self::ConnectiveNotAllowed { .. } => "CONSTRAINT:CONNECTIVE_NOT_ALLOWED",
            Self::MixedConnectives { .. } => "CONSTRAINT:MIXED_CONNECTIVES",
            Self::OperatorNotAllowed { .. } => "CONSTRAINT:OPERATOR_NOT_ALLOWED",
            Self::UnsupportedRenderFormat { .. } => "CONSTRAINT:UNSUPPORTED_FORMAT",
            Self::RestrictionLocked { .. } => "CONSTRAINT:RESTRICTION_LOCKED",
            Self::NestingForbidden => "CONSTRAINT:NESTING_FORBIDDEN",
            Self::MaxConditionsExceeded { .. } => "CONSTRAINT:MAX_CONDITIONS",
            Self::UnsupportedExpression { .. } => "CONSTRAINT:UNSUPPORTED_EXPRESSION",
            Self::Parse { .. } => "CONSTRAINT:PARSE",
            Self::KeyMismatch { .. } => "CONSTRAINT:KEY_MISMATCH",
        }
    }

    /// Create a parse error
    pub fn parse(definition: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            definition: definition.into(),
            message: message.into(),
        }
    }

    /// Create an operator-not-allowed error
    pub fn operator_not_allowed<'a>(
        operator: impl Into<String>,
        allowed: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        Self::OperatorNotAllowed {
            operator: operator.into(),
            allowed: join_quoted(allowed),
        }
    }

    /// Create a restriction-locked error
    pub fn locked(
        restriction: &'static str,
        current: impl Into<String>,
        requested: impl Into<String>,
    ) -> Self {
        Self::RestrictionLocked {
            restriction,
            current: current.into(),
            requested: requested.into(),
        }
    }

    /// Create an unsupported-expression error
    pub fn unsupported_expression(kind: impl Into<String>) -> Self {
        Self::UnsupportedExpression { kind: kind.into() }
    }
}

pub(crate) fn join_quoted<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// MATCHER ERROR
// ============================================================================

/// Errors raised by [`Matcher`](crate::matcher::Matcher) and the validator.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatcherError {
    /// No extension and no builtin answers to this name
    #[error("No predicate named '{name}' is registered")]
    UnsupportedPredicate { name: String },

    /// Comparison operator outside the supported set
    #[error("Unsupported comparison operator '{operator}'")]
    UnsupportedOperator { operator: String },

    /// Predicate called without a parameter it needs
    #[error("Predicate '{predicate}' expects at least {expected} parameter(s), got {actual}")]
    MissingParameter {
        predicate: String,
        expected: usize,
        actual: usize,
    },

    /// Parameter has a shape the predicate cannot use
    #[error("Invalid parameter for '{predicate}': {message}")]
    InvalidParameter { predicate: String, message: String },

    /// Regular expression or LIKE pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Rule representation that cannot become a flat rule map
    #[error("Unsupported rule: {kind}")]
    UnsupportedRule { kind: String },

    /// Expression-model error surfaced during matching
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// `force` found a value that does not satisfy the rule
    #[error("Value {value} violates rule '{rule}'")]
    ConstraintViolation { rule: String, value: Value },
}

impl MatcherError {
    /// Get error code for categorization
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedPredicate { .. } => "MATCHER:UNSUPPORTED_PREDICATE",
            Self::UnsupportedOperator { .. } => "MATCHER:UNSUPPORTED_OPERATOR",
            Self::MissingParameter { .. } => "MATCHER:MISSING_PARAMETER",
            Self::InvalidParameter { .. } => "MATCHER:INVALID_PARAMETER",
            Self::InvalidPattern { .. } => "MATCHER:INVALID_PATTERN",
            Self::UnsupportedRule { .. } => "MATCHER:UNSUPPORTED_RULE",
            Self::Constraint(inner) => inner.code(),
            Self::ConstraintViolation { .. } => "MATCHER:VIOLATION",
        }
    }

    /// Create an unsupported-predicate error
    pub fn unsupported_predicate(name: impl Into<String>) -> Self {
        Self::UnsupportedPredicate { name: name.into() }
    }

    /// Create an unsupported-operator error
    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
        }
    }

    /// Create a missing-parameter error
    pub fn missing_parameter(predicate: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::MissingParameter {
            predicate: predicate.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid-parameter error
    pub fn invalid_parameter(predicate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            predicate: predicate.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// True for the error `force` returns on a failed match
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn codes_are_namespaced() {
        assert_eq!(ConstraintError::NestingForbidden.code(), "CONSTRAINT:NESTING_FORBIDDEN");
        assert_eq!(
            MatcherError::unsupported_predicate("nope").code(),
            "MATCHER:UNSUPPORTED_PREDICATE"
        );
    }

    #[test]
    fn constraint_errors_keep_their_code_through_matcher() {
        let err = MatcherError::from(ConstraintError::parse("min:", "empty parameter"));
        assert_eq!(err.code(), "CONSTRAINT:PARSE");
        assert_eq!(
            err.to_string(),
            "Cannot parse rule definition 'min:': empty parameter"
        );
    }

    #[test]
    fn operator_not_allowed_lists_allow_list() {
        let allowed = vec!["=".to_string(), ">".to_string()];
        let err = ConstraintError::operator_not_allowed("<", &allowed);
        assert_eq!(
            err.to_string(),
            "Operator '<' is not allowed, allowed: '=', '>'"
        );
    }
}
