//! Single named predicate with parameters and an optional operator.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ConstraintError, ConstraintResult, join_quoted};
use crate::expression::RenderFormat;
use crate::value::Value;

/// Lists longer than this render bracketed instead of as a flat comma list.
pub const FLAT_PARAMETER_LIMIT: usize = 80;

// ============================================================================
// CONSTRAINT
// ============================================================================

/// A named predicate instance: `min:3`, `between:1,9`, `> 18`.
///
/// # Examples
///
/// ```rust,ignore
/// use tessera_validator::expression::{Constraint, RenderFormat};
/// use tessera_validator::value::Value;
///
/// let c = Constraint::with_operator("greater", ">", vec![Value::from(18)]);
/// assert_eq!(c.render_operator_string(), "> 18");
/// assert_eq!(c.render_name_string(), "greater:18");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    name: String,
    operator: String,
    parameters: Vec<Value>,
    render_format: RenderFormat,
    allowed_operators: Option<BTreeSet<String>>,
}

impl Constraint {
    /// Creates a constraint without an operator.
    pub fn new(name: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            operator: String::new(),
            parameters,
            render_format: RenderFormat::Operator,
            allowed_operators: None,
        }
    }

    /// Creates a constraint with a comparison operator.
    pub fn with_operator(
        name: impl Into<String>,
        operator: impl Into<String>,
        parameters: Vec<Value>,
    ) -> Self {
        Self {
            operator: operator.into(),
            ..Self::new(name, parameters)
        }
    }

    /// Sets the render format.
    #[must_use = "builder methods must be chained or built"]
    pub fn rendered_as(mut self, format: RenderFormat) -> Self {
        self.render_format = format;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator, empty when the constraint has none.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn has_operator(&self) -> bool {
        !self.operator.is_empty()
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    pub fn render_format(&self) -> RenderFormat {
        self.render_format
    }

    pub fn allowed_operators(&self) -> Option<&BTreeSet<String>> {
        self.allowed_operators.as_ref()
    }

    /// Sets the operator, checked against the allow-list when one is locked.
    ///
    /// An empty operator means "no operator" and is always accepted.
    pub fn set_operator(&mut self, operator: impl Into<String>) -> ConstraintResult<&mut Self> {
        let operator = operator.into();
        check_operator(self.allowed_operators.as_ref(), &operator)?;
        self.operator = operator;
        Ok(self)
    }

    pub fn set_parameters(&mut self, parameters: Vec<Value>) -> &mut Self {
        self.parameters = parameters;
        self
    }

    pub fn set_render_format(&mut self, format: RenderFormat) -> &mut Self {
        self.render_format = format;
        self
    }

    /// Locks the operator allow-list.
    ///
    /// Can be set once; setting the same set again is a no-op, a different
    /// set is an error. The current operator is re-validated and the lock is
    /// only taken when it passes.
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
        check_operator(Some(&requested), &self.operator)?;
        self.allowed_operators = Some(requested);
        Ok(self)
    }

    /// `"<operator> <params>"`, or `"<name>(<params>)"` without an operator.
    pub fn render_operator_string(&self) -> String {
        let params = render_parameters(&self.parameters, RenderFormat::Operator, false);
        if self.has_operator() {
            if params.is_empty() {
                self.operator.clone()
            } else {
                format!("{} {params}", self.operator)
            }
        } else {
            format!("{}({params})", self.name)
        }
    }

    /// `"<name>:<params>"`, or the bare name without parameters.
    pub fn render_name_string(&self) -> String {
        if self.parameters.is_empty() {
            self.name.clone()
        } else {
            format!(
                "{}:{}",
                self.name,
                render_parameters(&self.parameters, RenderFormat::Name, false)
            )
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render_format {
            RenderFormat::Operator => f.write_str(&self.render_operator_string()),
            RenderFormat::Name => f.write_str(&self.render_name_string()),
        }
    }
}

pub(crate) fn check_operator(
    allowed: Option<&BTreeSet<String>>,
    operator: &str,
) -> ConstraintResult<()> {
    match allowed {
        Some(allowed) if !operator.is_empty() && !allowed.contains(operator) => {
            Err(ConstraintError::operator_not_allowed(operator, allowed))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// PARAMETER RENDERING
// ============================================================================

/// Renders a parameter list.
///
/// Flat lists join with `,` (name format) or `, ` (operator format). Lists
/// that are nested (`recursion`), longer than [`FLAT_PARAMETER_LIMIT`], or
/// hold any non-scalar are bracketed: `[...]` in name format, `(...)` in
/// operator format.
pub(crate) fn render_parameters(params: &[Value], format: RenderFormat, recursion: bool) -> String {
    let bracketed = recursion
        || params.len() > FLAT_PARAMETER_LIMIT
        || params.iter().any(|p| !is_flat_parameter(p));

    let parts: Vec<String> = params
        .iter()
        .map(|p| render_parameter(p, format))
        .collect();

    if !bracketed {
        let separator = match format {
            RenderFormat::Name => ",",
            RenderFormat::Operator => ", ",
        };
        return parts.join(separator);
    }

    let (open, close) = match format {
        RenderFormat::Name => ('[', ']'),
        RenderFormat::Operator => ('(', ')'),
    };
    format!("{open}{}{close}", parts.join(", "))
}

fn is_flat_parameter(value: &Value) -> bool {
    value.is_scalar() || value.is_null() || matches!(value, Value::DateTime(_))
}

fn render_parameter(value: &Value, format: RenderFormat) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => render_parameters(items, format, true),
        Value::Object(map) => {
            let values: Vec<Value> = map.values().cloned().collect();
            render_parameters(&values, format, true)
        }
        other => other.to_display_string(),
    }
}
