//! Failure collection
//!
//! Failed rules are expected outcomes, not errors: the validator records
//! them into a [`FailureSink`] and carries on.

use std::fmt;

use crate::value::Value;

// ============================================================================
// SINK
// ============================================================================

/// Receives one call per failing rule.
pub trait FailureSink {
    fn add_failure(&mut self, path: &str, rule: &str, args: &[Value]);
}

impl FailureSink for Vec<Failure> {
    fn add_failure(&mut self, path: &str, rule: &str, args: &[Value]) {
        self.push(Failure::new(path, rule, args.to_vec()));
    }
}

// ============================================================================
// FAILURE
// ============================================================================

/// A rule that did not hold for the value at `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// Concrete path, e.g. `items[0].price`
    pub path: String,
    /// Rule name as written in the definition
    pub rule: String,
    pub args: Vec<Value>,
}

impl Failure {
    pub fn new(path: impl Into<String>, rule: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            rule: rule.into(),
            args,
        }
    }

    /// JSON form: `{"path": .., "rule": .., "args": [..]}`.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path,
            "rule": self.rule,
            "args": self.args.iter().cloned().map(serde_json::Value::from).collect::<Vec<_>>(),
        })
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.rule)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(Value::to_display_string).collect();
            write!(f, "({})", args.join(", "))?;
        }
        Ok(())
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Ordered collection of failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    failures: Vec<Failure>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Failures recorded for one concrete path.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Failure> + 'a {
        self.failures.iter().filter(move |f| f.path == path)
    }

    /// Whether `rule` failed at `path`.
    pub fn has(&self, path: &str, rule: &str) -> bool {
        self.for_path(path).any(|f| f.rule == rule)
    }

    /// `Ok(value)` when nothing failed.
    pub fn into_result<T>(self, ok_value: T) -> Result<T, ValidationReport> {
        if self.failures.is_empty() {
            Ok(ok_value)
        } else {
            Err(self)
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::Value::Array(self.failures.iter().map(Failure::to_json_value).collect())
    }
}

impl FailureSink for ValidationReport {
    fn add_failure(&mut self, path: &str, rule: &str, args: &[Value]) {
        tracing::debug!(path = %path, rule = %rule, "rule failed");
        self.add(Failure::new(path, rule, args.to_vec()));
    }
}

impl FromIterator<Failure> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = Failure>>(iter: I) -> Self {
        Self {
            failures: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationReport {
    type Item = Failure;
    type IntoIter = std::vec::IntoIter<Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "No validation failures");
        }
        writeln!(f, "Validation failed with {} failure(s):", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, failure)?;
        }
        Ok(())
    }
}
