//! SQL `LIKE` patterns as regular expressions.
//!
//! - `%` matches any run of characters (consecutive `%` collapse)
//! - `_` matches exactly one character
//! - the escape character makes `%`, `_` and itself literal
//!
//! Matching is case-insensitive and covers the whole string.

use regex::Regex;

use crate::error::{MatcherError, MatcherResult};

/// Default escape character.
pub const DEFAULT_ESCAPE: char = '\\';

/// Translates a `LIKE` pattern into an anchored regex source.
pub fn to_regex_source(pattern: &str, escape: char) -> String {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?is)^");

    let mut chars = pattern.chars().peekable();
    let mut last_was_any = false;
    while let Some(c) = chars.next() {
        if c == escape {
            match chars.peek().copied() {
                Some(next) if next == '%' || next == '_' || next == escape => {
                    chars.next();
                    push_literal(&mut source, next);
                }
                _ => push_literal(&mut source, c),
            }
            last_was_any = false;
            continue;
        }
        match c {
            '%' => {
                if !last_was_any {
                    source.push_str(".*?");
                }
                last_was_any = true;
            }
            '_' => {
                source.push('.');
                last_was_any = false;
            }
            other => {
                push_literal(&mut source, other);
                last_was_any = false;
            }
        }
    }

    source.push('$');
    source
}

fn push_literal(source: &mut String, c: char) {
    let mut buf = [0u8; 4];
    source.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Compiles a `LIKE` pattern.
pub fn compile(pattern: &str, escape: char) -> MatcherResult<Regex> {
    Regex::new(&to_regex_source(pattern, escape))
        .map_err(|e| MatcherError::invalid_pattern(pattern, e.to_string()))
}

/// Whether `subject` matches the `LIKE` pattern.
pub fn is_like(subject: &str, pattern: &str, escape: char) -> MatcherResult<bool> {
    Ok(compile(pattern, escape)?.is_match(subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Hello my dear", "%dear%", true)]
    #[case("Hello my%", "%my\\%", true)]
    #[case("Hello my dear", "%my\\%", false)]
    #[case("Hello my dear", "hello", false)]
    #[case("Hello", "hello", true)]
    #[case("Hello", "h_llo", true)]
    #[case("Hello", "h_lo", false)]
    #[case("a_b", "a\\_b", true)]
    #[case("axb", "a\\_b", false)]
    #[case("a\\b", "a\\\\b", true)]
    #[case("line\nbreak", "line%", true)]
    #[case("1+1=2", "1+1=_", true)]
    #[case("", "%", true)]
    fn like_matches(#[case] subject: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(is_like(subject, pattern, DEFAULT_ESCAPE).unwrap(), expected);
    }

    #[test]
    fn consecutive_wildcards_collapse() {
        assert_eq!(to_regex_source("a%%%b", DEFAULT_ESCAPE), "(?is)^a.*?b$");
    }

    #[test]
    fn custom_escape() {
        assert!(is_like("100%", "100!%", '!').unwrap());
        assert!(!is_like("1000", "100!%", '!').unwrap());
    }
}
