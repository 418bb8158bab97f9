//! Builtin predicate catalogue.
//!
//! Every builtin shares the signature [`BuiltinPredicate`] and is registered
//! by name, per category, into a [`BuiltinRegistry`].
pub mod compare;
pub mod presence;
pub mod sets;
pub mod temporal;
pub mod text;
pub mod types;

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::Formats;
use crate::error::{MatcherError, MatcherResult};
use crate::expression::snake_case;
use crate::matcher::like::DEFAULT_ESCAPE;
use crate::value::Value;

/// Type alias for a builtin predicate
pub type BuiltinPredicate = fn(&Value, &[Value], &PredicateContext<'_>) -> MatcherResult<bool>;

static NO_FORMATS: LazyLock<Formats> = LazyLock::new(Formats::new);

static BUILTINS: LazyLock<BuiltinRegistry> = LazyLock::new(BuiltinRegistry::new);

/// The process-wide builtin table.
pub fn builtins() -> &'static BuiltinRegistry {
    &BUILTINS
}

/// Alternative spellings accepted for builtin names.
const ALIASES: [(&str, &str); 4] = [
    ("integer", "int"),
    ("boolean", "bool"),
    ("regexp", "regex"),
    ("nin", "not_in"),
];

/// Canonical builtin name: snake_case, then aliases.
pub fn canonical_name(name: &str) -> String {
    let name = snake_case(name);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, target)| (*target).to_string())
}

// ============================================================================
// CONTEXT
// ============================================================================

/// What a builtin sees besides its value and parameters.
#[derive(Debug, Clone, Copy)]
pub struct PredicateContext<'a> {
    /// Canonical name of the predicate being evaluated
    pub name: &'a str,
    /// Whole record the value was taken from, if any
    pub subject: Option<&'a Value>,
    /// Named date formats for lenient date parsing
    pub formats: &'a Formats,
    /// Default escape character of `like`
    pub like_escape: char,
}

impl<'a> PredicateContext<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            subject: None,
            formats: &NO_FORMATS,
            like_escape: DEFAULT_ESCAPE,
        }
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_subject(mut self, subject: Option<&'a Value>) -> Self {
        self.subject = subject;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_formats(mut self, formats: &'a Formats) -> Self {
        self.formats = formats;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_like_escape(mut self, escape: char) -> Self {
        self.like_escape = escape;
        self
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Registry of all builtin predicates
pub struct BuiltinRegistry {
    predicates: HashMap<&'static str, BuiltinPredicate>,
}

impl BuiltinRegistry {
    /// Create a new registry with every builtin predicate
    pub fn new() -> Self {
        let mut registry = Self {
            predicates: HashMap::new(),
        };

        registry.register_compare_predicates();
        registry.register_presence_predicates();
        registry.register_temporal_predicates();
        registry.register_type_predicates();
        registry.register_text_predicates();
        registry.register_set_predicates();

        registry
    }

    fn register(&mut self, name: &'static str, predicate: BuiltinPredicate) {
        self.predicates.insert(name, predicate);
    }

    /// Looks up a predicate by exact canonical name
    pub fn get(&self, name: &str) -> Option<BuiltinPredicate> {
        self.predicates.get(name).copied()
    }

    /// Looks up a predicate after snake_case and alias normalization
    pub fn resolve(&self, name: &str) -> Option<(String, BuiltinPredicate)> {
        let canonical = canonical_name(name);
        self.get(&canonical).map(|predicate| (canonical, predicate))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Canonical names, unsorted
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.predicates.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    // Registration methods for each category

    fn register_compare_predicates(&mut self) {
        self.register("compare", compare::compare);
        self.register("equals", compare::equals);
        self.register("not_equal", compare::not_equal);
        self.register("is", compare::is);
        self.register("is_not", compare::is_not);

        // Size-coerced ranges
        self.register("min", compare::min);
        self.register("max", compare::max);
        self.register("greater", compare::greater);
        self.register("less", compare::less);
        self.register("between", compare::between);
        self.register("size", compare::size);
        self.register("length", compare::length);
    }

    fn register_presence_predicates(&mut self) {
        self.register("required", presence::required);
        self.register("required_if", presence::required_if);
        self.register("required_unless", presence::required_unless);
        self.register("filled", presence::filled);
    }

    fn register_temporal_predicates(&mut self) {
        self.register("date", temporal::date);
        self.register("datetime", temporal::datetime);
        self.register("time", temporal::time);
        self.register("after", temporal::after);
        self.register("before", temporal::before);
    }

    fn register_type_predicates(&mut self) {
        self.register("type", types::type_of);
        self.register("int", types::int);
        self.register("bool", types::bool);
        self.register("numeric", types::numeric);
        self.register("string", types::string);
        self.register("float", types::float);
        self.register("scalar", types::scalar);
        self.register("array", types::array);
        self.register("true", types::is_true);
        self.register("false", types::is_false);
        self.register("null", types::null);
        self.register("not_null", types::not_null);
    }

    fn register_text_predicates(&mut self) {
        // Formats
        self.register("email", text::email);
        self.register("url", text::url);
        self.register("ip", text::ip);
        self.register("ipv4", text::ipv4);
        self.register("ipv6", text::ipv6);
        self.register("digits", text::digits);
        self.register("json", text::json);
        self.register("xml", text::xml);

        // Markup
        self.register("html", text::html);
        self.register("plain", text::plain);
        self.register("tags", text::tags);

        // Counting
        self.register("chars", text::chars);
        self.register("words", text::words);

        // Substrings and patterns
        self.register("starts_with", text::starts_with);
        self.register("ends_with", text::ends_with);
        self.register("contains", text::contains);
        self.register("like", text::like);
        self.register("regex", text::regex);

        // Character classes
        self.register("alpha", text::alpha);
        self.register("alpha_dash", text::alpha_dash);
        self.register("alpha_num", text::alpha_num);
    }

    fn register_set_predicates(&mut self) {
        self.register("in", sets::in_list);
        self.register("not_in", sets::not_in_list);
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PARAMETER HELPERS
// ============================================================================

/// Helper to check the minimum parameter count
pub(crate) fn check_min_params(
    ctx: &PredicateContext<'_>,
    params: &[Value],
    min: usize,
) -> MatcherResult<()> {
    if params.len() < min {
        Err(MatcherError::missing_parameter(ctx.name, min, params.len()))
    } else {
        Ok(())
    }
}

/// Helper to get a parameter that must be present
pub(crate) fn param<'p>(
    ctx: &PredicateContext<'_>,
    params: &'p [Value],
    index: usize,
) -> MatcherResult<&'p Value> {
    params
        .get(index)
        .ok_or_else(|| MatcherError::missing_parameter(ctx.name, index + 1, params.len()))
}

/// Helper to get a numeric parameter
pub(crate) fn number_param(
    ctx: &PredicateContext<'_>,
    params: &[Value],
    index: usize,
) -> MatcherResult<f64> {
    let value = param(ctx, params, index)?;
    value.as_number().ok_or_else(|| {
        MatcherError::invalid_parameter(
            ctx.name,
            format!(
                "parameter {} must be numeric, got {}",
                index + 1,
                value.type_name()
            ),
        )
    })
}

/// Helper to get an optional string parameter
pub(crate) fn optional_str_param(params: &[Value], index: usize) -> Option<String> {
    params
        .get(index)
        .filter(|v| !v.is_null())
        .map(Value::to_display_string)
        .filter(|s| !s.is_empty())
}

/// Boolean reading of a flag parameter; `"false"` and `"0"` are false.
pub(crate) fn flag(value: &Value) -> bool {
    types::as_bool_like(value).unwrap_or_else(|| value.is_truthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aliases_resolve() {
        assert_eq!(canonical_name("integer"), "int");
        assert_eq!(canonical_name("Boolean"), "bool");
        assert_eq!(canonical_name("regexp"), "regex");
        assert_eq!(canonical_name("nin"), "not_in");
        assert_eq!(canonical_name("startsWith"), "starts_with");
    }

    #[test]
    fn every_category_is_registered() {
        let registry = builtins();
        for name in ["compare", "required", "date", "int", "email", "in"] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert!(registry.len() >= 45);
        assert!(registry.resolve("notIn").is_some());
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn missing_parameter_reports_predicate() {
        let ctx = PredicateContext::new("min");
        let err = param(&ctx, &[], 0).unwrap_err();
        assert_eq!(
            err,
            MatcherError::MissingParameter {
                predicate: "min".into(),
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn flags() {
        assert!(flag(&Value::from(true)));
        assert!(flag(&Value::from("true")));
        assert!(!flag(&Value::from("false")));
        assert!(!flag(&Value::from("0")));
        assert!(!flag(&Value::Null));
    }
}
