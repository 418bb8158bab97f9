//! Matcher and validator configuration.
//!
//! Both structs deserialize from partial documents; missing fields take
//! their defaults.
//!
//! ```rust,ignore
//! use tessera_validator::config::ValidatorConfig;
//!
//! let config: ValidatorConfig = serde_json::from_str(r#"{
//!     "matcher": { "group_mode": "evaluate" },
//!     "formats": { "date": "Y-m-d" }
//! }"#)?;
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::matcher::GroupMode;
use crate::matcher::like::DEFAULT_ESCAPE;

/// Named date formats, e.g. `date → "Y-m-d"`.
///
/// Values are either `date()`-style letters or chrono `%` specifiers.
pub type Formats = IndexMap<String, String>;

// ============================================================================
// MATCHER CONFIG
// ============================================================================

/// Behavior of a [`Matcher`](crate::matcher::Matcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// How non-AND groups are treated
    pub group_mode: GroupMode,
    /// Default escape character of `like`
    pub like_escape: char,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            group_mode: GroupMode::default(),
            like_escape: DEFAULT_ESCAPE,
        }
    }
}

impl MatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_group_mode(mut self, mode: GroupMode) -> Self {
        self.group_mode = mode;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_like_escape(mut self, escape: char) -> Self {
        self.like_escape = escape;
        self
    }
}

// ============================================================================
// VALIDATOR CONFIG
// ============================================================================

/// Behavior of a [`MatcherBaseValidator`](crate::validation::MatcherBaseValidator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub matcher: MatcherConfig,
    /// Absent fields without a failing required rule skip their other rules.
    /// Off by default: every rule runs against `Null`.
    pub skip_absent_optional: bool,
    /// Formats used when none are passed to `validate`
    pub formats: Formats,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            skip_absent_optional: false,
            formats: Formats::new(),
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_skip_absent_optional(mut self, skip: bool) -> Self {
        self.skip_absent_optional = skip;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_format(mut self, name: impl Into<String>, format: impl Into<String>) -> Self {
        self.formats.insert(name.into(), format.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = ValidatorConfig::default();
        assert!(!config.skip_absent_optional);
        assert_eq!(config.matcher.group_mode, GroupMode::Flatten);
        assert_eq!(config.matcher.like_escape, '\\');
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ValidatorConfig = serde_json::from_str(
            r#"{"matcher": {"group_mode": "evaluate"}, "formats": {"date": "Y-m-d"}}"#,
        )
        .unwrap();
        assert_eq!(config.matcher.group_mode, GroupMode::Evaluate);
        assert_eq!(config.matcher.like_escape, '\\');
        assert!(!config.skip_absent_optional);
        assert_eq!(config.formats.get("date").map(String::as_str), Some("Y-m-d"));
    }

    #[test]
    fn builders() {
        let config = ValidatorConfig::new()
            .with_skip_absent_optional(true)
            .with_matcher(MatcherConfig::new().with_like_escape('!'))
            .with_format("datetime", "%Y-%m-%d %H:%M");
        assert!(config.skip_absent_optional);
        assert_eq!(config.matcher.like_escape, '!');
        assert_eq!(config.formats.len(), 1);
    }
}
