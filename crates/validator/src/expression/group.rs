//! Logical groups and their set-once restriction policies.
//!
//! A [`LogicalGroup`] holds ordered expressions joined by one connective.
//! Its [`RestrictionPolicy`] limits what may be added: which connectives,
//! which operators, whether groups may nest and how many conditions fit.
//! Each restriction locks on first assignment. Locking re-validates every
//! expression already in the group and only commits if all of them pass.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ConstraintError, ConstraintResult, join_quoted};
use crate::expression::{Connective, Expression, IntoConnective};

// ============================================================================
// RESTRICTION POLICY
// ============================================================================

/// Restrictions of a group. Every field is write-once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionPolicy {
    allowed_connectives: Option<BTreeSet<Connective>>,
    allow_multiple_connectives: bool,
    allow_nesting: bool,
    allowed_operators: Option<BTreeSet<String>>,
    max_conditions: Option<usize>,
}

impl Default for RestrictionPolicy {
    fn default() -> Self {
        Self {
            allowed_connectives: None,
            allow_multiple_connectives: true,
            allow_nesting: true,
            allowed_operators: None,
            max_conditions: None,
        }
    }
}

impl RestrictionPolicy {
    pub fn allowed_connectives(&self) -> Option<&BTreeSet<Connective>> {
        self.allowed_connectives.as_ref()
    }

    pub fn allows_multiple_connectives(&self) -> bool {
        self.allow_multiple_connectives
    }

    pub fn allows_nesting(&self) -> bool {
        self.allow_nesting
    }

    pub fn allowed_operators(&self) -> Option<&BTreeSet<String>> {
        self.allowed_operators.as_ref()
    }

    pub fn max_conditions(&self) -> Option<usize> {
        self.max_conditions
    }

    fn allows_connective(&self, connective: Connective) -> bool {
        self.allowed_connectives
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&connective))
    }
}

/// Sets a write-once slot. Returns whether the slot changed; an equal value
/// is accepted silently, a different one is a [`ConstraintError::RestrictionLocked`].
fn set_or_confirm<T, F>(
    slot: &mut Option<T>,
    value: T,
    restriction: &'static str,
    describe: F,
) -> ConstraintResult<bool>
where
    T: PartialEq,
    F: Fn(&T) -> String,
{
    match slot {
        Some(current) if *current == value => Ok(false),
        Some(current) => Err(ConstraintError::locked(
            restriction,
            describe(current),
            describe(&value),
        )),
        None => {
            *slot = Some(value);
            Ok(true)
        }
    }
}

fn describe_connectives(set: &BTreeSet<Connective>) -> String {
    set.iter()
        .map(|c| format!("'{}'", c.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// NAMED INDEX
// ============================================================================

/// How a group indexes its expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamedIndex {
    /// Plain ordered list; accepts every expression kind
    #[default]
    Positional,
    /// Constraints keyed by name, plus nested groups; re-adding a name
    /// replaces it in place
    Named,
}

// ============================================================================
// LOGICAL GROUP
// ============================================================================

/// Ordered expressions joined by a connective.
///
/// # Examples
///
/// ```rust,ignore
/// use tessera_validator::expression::{Connective, Constraint, LogicalGroup};
///
/// let mut group = LogicalGroup::with_connective(Connective::Or);
/// group.add(Constraint::with_operator("compare", "=", vec![1.into()]))?;
/// group.add(Constraint::with_operator("compare", "=", vec![2.into()]))?;
/// assert_eq!(group.to_string(), "= 1 OR = 2");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogicalGroup {
    connective: Connective,
    expressions: Vec<Expression>,
    policy: RestrictionPolicy,
    index: NamedIndex,
}

impl LogicalGroup {
    /// Creates an empty AND group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty group with the given connective.
    pub fn with_connective(connective: Connective) -> Self {
        Self {
            connective,
            ..Self::default()
        }
    }

    pub(crate) fn named() -> Self {
        Self {
            index: NamedIndex::Named,
            ..Self::default()
        }
    }

    pub fn connective(&self) -> Connective {
        self.connective
    }

    /// Separator used when rendering, e.g. `" AND "`.
    pub fn separator(&self) -> &'static str {
        self.connective.separator()
    }

    pub fn index(&self) -> NamedIndex {
        self.index
    }

    pub fn policy(&self) -> &RestrictionPolicy {
        &self.policy
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn is_nesting_allowed(&self) -> bool {
        self.policy.allow_nesting
    }

    pub fn is_multiple_connectives_allowed(&self) -> bool {
        self.policy.allow_multiple_connectives
    }

    pub fn allowed_connectives(&self) -> Option<&BTreeSet<Connective>> {
        self.policy.allowed_connectives.as_ref()
    }

    pub fn allowed_operators(&self) -> Option<&BTreeSet<String>> {
        self.policy.allowed_operators.as_ref()
    }

    pub fn max_conditions(&self) -> Option<usize> {
        self.policy.max_conditions
    }

    /// Sets the connective.
    ///
    /// Keywords outside `{and, or, nand, nor}` are rejected first, then
    /// connectives outside the allow-list. With multiple connectives
    /// forbidden, every nested group must already use the new connective.
    pub fn set_connective(&mut self, connective: impl IntoConnective) -> ConstraintResult<&mut Self> {
        let connective = connective.into_connective()?;
        if !self.policy.allows_connective(connective) {
            return Err(self.connective_not_allowed(connective));
        }
        if !self.policy.allow_multiple_connectives {
            for child in self.expressions.iter().filter_map(Expression::as_group) {
                if child.connective != connective {
                    return Err(ConstraintError::MixedConnectives {
                        expected: connective.as_str().to_string(),
                        found: child.connective.as_str().to_string(),
                    });
                }
            }
        }
        self.connective = connective;
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Adds an expression.
    ///
    /// Runs the kind check, then every restriction, then appends. In a named
    /// group a constraint whose name is already present replaces that entry
    /// in place.
    pub fn add(&mut self, expression: impl Into<Expression>) -> ConstraintResult<&mut Self> {
        let mut expression = expression.into();
        self.type_check(&expression)?;

        let slot = self.named_slot(&expression);
        if slot.is_none() {
            if let Some(max) = self.policy.max_conditions {
                if self.expressions.len() >= max {
                    return Err(ConstraintError::MaxConditionsExceeded { max });
                }
            }
        }

        apply_restrictions(&self.policy, self.connective, &mut expression)?;

        match slot {
            Some(position) => self.expressions[position] = expression,
            None => self.expressions.push(expression),
        }

        if let Some(max) = self.policy.max_conditions {
            if self.expressions.len() > max {
                self.expressions.pop();
                return Err(ConstraintError::MaxConditionsExceeded { max });
            }
        }
        Ok(self)
    }

    /// Removes every expression that renders like `expression`.
    ///
    /// Matching is by rendered string, not identity.
    pub fn remove(&mut self, expression: &Expression) -> &mut Self {
        let rendered = expression.to_string();
        self.expressions.retain(|known| known.to_string() != rendered);
        self
    }

    /// Removes all expressions. Restrictions stay locked.
    pub fn clear(&mut self) -> &mut Self {
        self.expressions.clear();
        self
    }

    pub(crate) fn expressions_mut(&mut self) -> &mut Vec<Expression> {
        &mut self.expressions
    }

    fn type_check(&self, expression: &Expression) -> ConstraintResult<()> {
        match (self.index, expression) {
            (NamedIndex::Positional, _)
            | (NamedIndex::Named, Expression::Constraint(_) | Expression::Group(_)) => Ok(()),
            (NamedIndex::Named, other) => Err(ConstraintError::unsupported_expression(format!(
                "{} in a named constraint group",
                other.kind()
            ))),
        }
    }

    fn named_slot(&self, expression: &Expression) -> Option<usize> {
        if self.index != NamedIndex::Named {
            return None;
        }
        let name = expression.name()?;
        self.expressions
            .iter()
            .position(|known| known.name() == Some(name))
    }

    // ------------------------------------------------------------------------
    // Restrictions
    // ------------------------------------------------------------------------

    /// Restricts the connectives this group and its nested groups may use.
    pub fn allow_connectives<I, C>(&mut self, connectives: I) -> ConstraintResult<&mut Self>
    where
        I: IntoIterator<Item = C>,
        C: IntoConnective,
    {
        let requested = connectives
            .into_iter()
            .map(IntoConnective::into_connective)
            .collect::<ConstraintResult<BTreeSet<_>>>()?;
        if !requested.contains(&self.connective) {
            return Err(ConstraintError::ConnectiveNotAllowed {
                connective: self.connective.as_str().to_string(),
                allowed: describe_connectives(&requested),
            });
        }
        self.restrict(|policy| {
            set_or_confirm(
                &mut policy.allowed_connectives,
                requested,
                "allowed_connectives",
                describe_connectives,
            )
        })
    }

    /// Restricts the operators of every constraint in the tree.
    pub fn allow_operators<I, S>(&mut self, operators: I) -> ConstraintResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: BTreeSet<String> = operators.into_iter().map(Into::into).collect();
        self.restrict(|policy| {
            set_or_confirm(
                &mut policy.allowed_operators,
                requested,
                "allowed_operators",
                |set| join_quoted(set),
            )
        })
    }

    /// Forces nested groups to use this group's connective.
    pub fn forbid_multiple_connectives(&mut self) -> ConstraintResult<&mut Self> {
        self.restrict(|policy| {
            let changed = policy.allow_multiple_connectives;
            policy.allow_multiple_connectives = false;
            Ok(changed)
        })
    }

    /// Forbids nested groups.
    pub fn forbid_nesting(&mut self) -> ConstraintResult<&mut Self> {
        self.restrict(|policy| {
            let changed = policy.allow_nesting;
            policy.allow_nesting = false;
            Ok(changed)
        })
    }

    /// Caps the number of top-level expressions. Also forbids nesting.
    pub fn allow_max_conditions(&mut self, max: usize) -> ConstraintResult<&mut Self> {
        self.restrict(|policy| {
            let changed = set_or_confirm(&mut policy.max_conditions, max, "max_conditions", |n| {
                n.to_string()
            })?;
            policy.allow_nesting = false;
            Ok(changed)
        })
    }

    /// Applies a policy update transactionally: the new policy is checked
    /// against copies of the existing expressions and committed together
    /// with them only if every one passes.
    fn restrict<F>(&mut self, update: F) -> ConstraintResult<&mut Self>
    where
        F: FnOnce(&mut RestrictionPolicy) -> ConstraintResult<bool>,
    {
        let mut policy = self.policy.clone();
        if !update(&mut policy)? {
            return Ok(self);
        }

        if let Some(max) = policy.max_conditions {
            if self.expressions.len() > max {
                return Err(ConstraintError::MaxConditionsExceeded { max });
            }
        }

        let mut expressions = self.expressions.clone();
        for expression in &mut expressions {
            apply_restrictions(&policy, self.connective, expression)?;
        }

        self.policy = policy;
        self.expressions = expressions;
        Ok(self)
    }

    fn connective_not_allowed(&self, connective: Connective) -> ConstraintError {
        ConstraintError::ConnectiveNotAllowed {
            connective: connective.as_str().to_string(),
            allowed: self
                .policy
                .allowed_connectives
                .as_ref()
                .map(describe_connectives)
                .unwrap_or_default(),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Pre-order flattening of the whole tree: each expression, followed by
    /// the flattening of a nested group.
    pub fn all_expressions(&self) -> Vec<&Expression> {
        let mut all = Vec::new();
        collect_expressions(&self.expressions, &mut all);
        all
    }

    /// Expressions of the whole tree matching `filter`.
    pub fn find_expressions(&self, filter: &ExpressionFilter) -> Vec<&Expression> {
        Self::find_in(filter, self.all_expressions())
    }

    /// Filters an explicit pool instead of this group's tree.
    pub fn find_in<'a, I>(filter: &ExpressionFilter, pool: I) -> Vec<&'a Expression>
    where
        I: IntoIterator<Item = &'a Expression>,
    {
        pool.into_iter().filter(|e| filter.matches(e)).collect()
    }
}

fn collect_expressions<'a>(expressions: &'a [Expression], out: &mut Vec<&'a Expression>) {
    for expression in expressions {
        out.push(expression);
        if let Expression::Group(group) = expression {
            collect_expressions(&group.expressions, out);
        }
    }
}

/// Checks one expression against a policy and pushes the inherited locks
/// down into it.
fn apply_restrictions(
    policy: &RestrictionPolicy,
    connective: Connective,
    expression: &mut Expression,
) -> ConstraintResult<()> {
    match expression {
        Expression::Group(child) => {
            if !policy.allow_nesting {
                return Err(ConstraintError::NestingForbidden);
            }
            if !policy.allows_connective(child.connective) {
                return Err(ConstraintError::ConnectiveNotAllowed {
                    connective: child.connective.as_str().to_string(),
                    allowed: policy
                        .allowed_connectives
                        .as_ref()
                        .map(describe_connectives)
                        .unwrap_or_default(),
                });
            }
            if !policy.allow_multiple_connectives {
                if child.connective != connective {
                    return Err(ConstraintError::MixedConnectives {
                        expected: connective.as_str().to_string(),
                        found: child.connective.as_str().to_string(),
                    });
                }
                child.allow_connectives([connective])?;
                child.forbid_multiple_connectives()?;
            }
            if let Some(operators) = &policy.allowed_operators {
                child.allow_operators(operators.iter().cloned())?;
            }
        }
        Expression::Constraint(constraint) => {
            if let Some(operators) = &policy.allowed_operators {
                constraint.allow_operators(operators.iter().cloned())?;
            }
        }
        Expression::Condition(condition) => {
            if let Some(operators) = &policy.allowed_operators {
                condition.allow_operators(operators.iter().cloned())?;
            }
        }
        Expression::Raw(_) => {}
    }
    Ok(())
}

impl fmt::Display for LogicalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, expression) in self.expressions.iter().enumerate() {
            if i > 0 {
                f.write_str(self.separator())?;
            }
            if expression.is_group() {
                write!(f, "({expression})")?;
            } else {
                write!(f, "{expression}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// EXPRESSION FILTER
// ============================================================================

/// Attribute filter for [`LogicalGroup::find_expressions`].
///
/// Unset attributes and `"*"` match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionFilter {
    string: Option<String>,
    name: Option<String>,
    operator: Option<String>,
    operand: Option<String>,
    class: Option<String>,
}

impl ExpressionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered form of the expression.
    #[must_use = "builder methods must be chained or built"]
    pub fn string(mut self, string: impl Into<String>) -> Self {
        self.string = Some(string.into());
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn operand(mut self, operand: impl Into<String>) -> Self {
        self.operand = Some(operand.into());
        self
    }

    /// Expression kind: `Constraint`, `Condition`, `LogicalGroup`,
    /// `ConstraintGroup` or `Raw`.
    #[must_use = "builder methods must be chained or built"]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn matches(&self, expression: &Expression) -> bool {
        attribute_matches(self.string.as_deref(), Some(expression.to_string().as_str()))
            && attribute_matches(self.name.as_deref(), expression.name())
            && attribute_matches(self.operator.as_deref(), expression.operator())
            && attribute_matches(self.operand.as_deref(), expression.operand().as_deref())
            && attribute_matches(self.class.as_deref(), Some(expression.kind()))
    }
}

fn attribute_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None | Some("*") => true,
        Some(wanted) => actual == Some(wanted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Condition, Constraint};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn eq(value: i64) -> Constraint {
        Constraint::with_operator("compare", "=", vec![Value::from(value)])
    }

    fn gt(value: i64) -> Constraint {
        Constraint::with_operator("compare", ">", vec![Value::from(value)])
    }

    #[test]
    fn renders_with_separator_and_parenthesized_groups() {
        let mut inner = LogicalGroup::with_connective(Connective::Or);
        inner.add(eq(1)).unwrap().add(eq(2)).unwrap();

        let mut outer = LogicalGroup::new();
        outer.add(gt(0)).unwrap().add(inner).unwrap();
        assert_eq!(outer.to_string(), "> 0 AND (= 1 OR = 2)");
    }

    #[test]
    fn set_connective_validates_universal_set_first() {
        let mut group = LogicalGroup::new();
        let err = group.set_connective("xor").unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:UNSUPPORTED_CONNECTIVE");

        group.set_connective("or").unwrap();
        assert_eq!(group.separator(), " OR ");
    }

    #[test]
    fn allow_operators_is_set_once() {
        let mut group = LogicalGroup::new();
        group.allow_operators(["="]).unwrap();
        assert!(group.allow_operators(["="]).is_ok());
        let err = group.allow_operators(["=", ">"]).unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:RESTRICTION_LOCKED");
    }

    #[test]
    fn allow_operators_rejects_existing_violator() {
        let mut group = LogicalGroup::new();
        group.add(gt(1)).unwrap();
        let err = group.allow_operators(["="]).unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:OPERATOR_NOT_ALLOWED");
        assert!(group.allowed_operators().is_none());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn allowed_operators_apply_to_new_constraints() {
        let mut group = LogicalGroup::new();
        group.allow_operators(["="]).unwrap();
        assert!(group.add(eq(1)).is_ok());
        assert!(group.add(gt(1)).is_err());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn allowed_operators_propagate_into_nested_groups() {
        let mut group = LogicalGroup::new();
        group.allow_operators(["=", "<>"]).unwrap();

        let mut child = LogicalGroup::new();
        child.add(eq(1)).unwrap();
        group.add(child).unwrap();

        let nested = group.expressions()[0].as_group().unwrap();
        assert_eq!(nested.allowed_operators(), group.allowed_operators());

        let mut bad = LogicalGroup::new();
        bad.add(gt(1)).unwrap();
        assert!(group.add(bad).is_err());
    }

    #[test]
    fn max_conditions_forbids_nesting_and_caps_count() {
        let mut group = LogicalGroup::new();
        group.allow_max_conditions(2).unwrap();
        assert!(!group.is_nesting_allowed());

        group.add(eq(1)).unwrap().add(eq(2)).unwrap();
        let err = group.add(eq(3)).unwrap_err();
        assert_eq!(err, ConstraintError::MaxConditionsExceeded { max: 2 });
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn max_conditions_rejects_oversized_existing_group() {
        let mut group = LogicalGroup::new();
        group.add(eq(1)).unwrap().add(eq(2)).unwrap().add(eq(3)).unwrap();
        assert!(group.allow_max_conditions(2).is_err());
        assert_eq!(group.max_conditions(), None);
        assert!(group.is_nesting_allowed());
    }

    #[test]
    fn max_conditions_is_set_once() {
        let mut group = LogicalGroup::new();
        group.allow_max_conditions(3).unwrap();
        assert!(group.allow_max_conditions(3).is_ok());
        assert!(group.allow_max_conditions(4).is_err());
    }

    #[test]
    fn forbid_nesting_rejects_groups() {
        let mut group = LogicalGroup::new();
        group.forbid_nesting().unwrap();
        assert_eq!(
            group.add(LogicalGroup::new()).unwrap_err(),
            ConstraintError::NestingForbidden
        );
    }

    #[test]
    fn forbid_nesting_fails_closed_on_existing_group() {
        let mut group = LogicalGroup::new();
        group.add(LogicalGroup::new()).unwrap();
        assert!(group.forbid_nesting().is_err());
        assert!(group.is_nesting_allowed());
    }

    #[test]
    fn allowed_connectives_restrict_nested_groups() {
        let mut group = LogicalGroup::new();
        group.allow_connectives(["and", "or"]).unwrap();
        assert!(group.add(LogicalGroup::with_connective(Connective::Or)).is_ok());
        let err = group
            .add(LogicalGroup::with_connective(Connective::Nor))
            .unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:CONNECTIVE_NOT_ALLOWED");
        assert!(group.set_connective(Connective::Nand).is_err());
    }

    #[test]
    fn single_connective_locks_children_recursively() {
        let mut group = LogicalGroup::new();
        group.forbid_multiple_connectives().unwrap();

        let err = group
            .add(LogicalGroup::with_connective(Connective::Or))
            .unwrap_err();
        assert_eq!(err.code(), "CONSTRAINT:MIXED_CONNECTIVES");

        group.add(LogicalGroup::new()).unwrap();
        let child = group.expressions()[0].as_group().unwrap();
        assert!(!child.is_multiple_connectives_allowed());
        assert_eq!(
            child.allowed_connectives().unwrap().iter().copied().collect::<Vec<_>>(),
            vec![Connective::And]
        );
        assert!(group.set_connective(Connective::Or).is_err());
    }

    #[test]
    fn remove_matches_by_rendered_string() {
        let mut group = LogicalGroup::new();
        group.add(eq(1)).unwrap().add(gt(2)).unwrap().add(eq(1)).unwrap();
        group.remove(&Expression::from(eq(1)));
        assert_eq!(group.to_string(), "> 2");
    }

    #[test]
    fn all_expressions_is_preorder() {
        let mut inner = LogicalGroup::with_connective(Connective::Or);
        inner.add(eq(2)).unwrap().add(eq(3)).unwrap();
        let mut outer = LogicalGroup::new();
        outer.add(eq(1)).unwrap().add(inner).unwrap().add(eq(4)).unwrap();

        let rendered: Vec<String> = outer
            .all_expressions()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["= 1", "= 2 OR = 3", "= 2", "= 3", "= 4"]);
    }

    #[test]
    fn find_expressions_filters_with_wildcards() {
        let mut outer = LogicalGroup::new();
        outer
            .add(Condition::new("age", gt(18)).unwrap())
            .unwrap()
            .add(Condition::new("name", eq(1)).unwrap())
            .unwrap()
            .add(eq(5))
            .unwrap();

        let by_operand = outer.find_expressions(&ExpressionFilter::new().operand("age"));
        assert_eq!(by_operand.len(), 1);
        assert_eq!(by_operand[0].to_string(), "age > 18");

        let conditions = outer.find_expressions(
            &ExpressionFilter::new()
                .class("Condition")
                .operator("*")
                .name("compare"),
        );
        assert_eq!(conditions.len(), 2);

        let equals = outer.find_expressions(&ExpressionFilter::new().operator("="));
        assert_eq!(equals.len(), 2);
    }
}
