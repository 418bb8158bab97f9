//! User-registered predicates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::expression::snake_case;
use crate::value::Value;

/// Extension predicate: `(value, parameters, subject) -> bool`.
pub type PredicateFn = Arc<dyn Fn(&Value, &[Value], Option<&Value>) -> bool + Send + Sync>;

/// Named extension predicates.
///
/// Names are stored and looked up in snake case, the same form the rule DSL
/// produces, so `isEven`, `is-even` and `is_even` are one predicate.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a predicate.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &[Value], Option<&Value>) -> bool + Send + Sync + 'static,
    {
        let name = snake_case(&name.into());
        tracing::debug!(predicate = %name, "registering extension predicate");
        self.predicates.insert(name, Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<&PredicateFn> {
        self.predicates.get(&snake_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(&snake_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("PredicateRegistry")
            .field("predicates", &names)
            .finish()
    }
}
