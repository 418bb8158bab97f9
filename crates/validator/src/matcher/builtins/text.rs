//! Text predicates: formats, markup, counting, substrings and patterns
//!
//! Scalars are read through their string cast; collections never match a
//! text predicate, with the exception of `contains`.

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;

use super::{PredicateContext, check_min_params, number_param, optional_str_param, param};
use crate::error::{MatcherError, MatcherResult};
use crate::matcher::like::compile as compile_like;
use crate::value::Value;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap()
});

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\s*(/?)\s*([A-Za-z][A-Za-z0-9:_.-]*)([^>]*?)(/?)\s*>").unwrap()
});

static TAG_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9-]*").unwrap());

static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\pL\pN]+").unwrap());

static ALPHA_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\pL\pM]+$").unwrap());

static ALPHA_NUM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\pL\pM\pN]+$").unwrap());

static ALPHA_DASH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\pL\pM\pN_-]+$").unwrap());

/// Delimiters accepted around a `regex` pattern.
const REGEX_DELIMITERS: [char; 3] = ['/', '#', '~'];

/// String cast of a scalar; `None` for null and collections.
fn text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        other => Some(Cow::Owned(other.to_display_string())),
    }
}

fn text_matches(value: &Value, regex: &Regex) -> bool {
    text(value).is_some_and(|s| regex.is_match(&s))
}

// ============================================================================
// FORMATS
// ============================================================================

pub fn email(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(text_matches(value, &EMAIL_REGEX))
}

/// Absolute URL with a host
pub fn url(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(text(value).is_some_and(|s| url::Url::parse(&s).is_ok_and(|u| u.has_host())))
}

pub fn ip(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(text(value).is_some_and(|s| s.parse::<IpAddr>().is_ok()))
}

pub fn ipv4(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(text(value).is_some_and(|s| s.parse::<Ipv4Addr>().is_ok()))
}

pub fn ipv6(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(text(value).is_some_and(|s| s.parse::<Ipv6Addr>().is_ok()))
}

/// ASCII digits only, optionally exactly `n` of them
pub fn digits(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let Some(s) = text(value) else {
        return Ok(false);
    };
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }
    if params.is_empty() {
        return Ok(true);
    }
    Ok(s.len() as f64 == number_param(ctx, params, 0)?)
}

/// A string holding a JSON document
pub fn json(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(match value {
        Value::String(s) => serde_json::from_str::<serde_json::Value>(s).is_ok(),
        _ => false,
    })
}

/// A well-formed XML document: one root element, balanced tags
pub fn xml(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(match value {
        Value::String(s) => is_well_formed_xml(s),
        _ => false,
    })
}

/// Comment, processing-instruction, CDATA and doctype delimiters.
const XML_NOISE: [(&str, &str); 4] = [
    ("<!--", "-->"),
    ("<?", "?>"),
    ("<![CDATA[", "]]>"),
    ("<!DOCTYPE", ">"),
];

fn strip_xml_noise(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        let next = XML_NOISE
            .iter()
            .filter_map(|(open, close)| rest.find(open).map(|at| (at, *open, *close)))
            .min_by_key(|(at, _, _)| *at);
        let Some((start, open, close)) = next else {
            out.push_str(rest);
            return Some(out);
        };
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail[open.len()..].find(close)? + open.len() + close.len();
        if open == "<![CDATA[" {
            // CDATA is element content
            out.push('x');
        }
        rest = &tail[end..];
    }
}

fn is_well_formed_xml(input: &str) -> bool {
    let Some(body) = strip_xml_noise(input) else {
        return false;
    };

    let mut stack: Vec<&str> = Vec::new();
    let mut roots = 0usize;
    let mut last = 0usize;

    for caps in TAG_REGEX.captures_iter(&body) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let between = &body[last..whole.start()];
        if between.contains('<') || between.contains('>') {
            return false;
        }
        if stack.is_empty() && !between.trim().is_empty() {
            return false;
        }
        last = whole.end();

        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
        let name = name.as_str();

        if closing {
            if stack.pop() != Some(name) {
                return false;
            }
            continue;
        }
        if stack.is_empty() {
            roots += 1;
        }
        if !self_closing {
            stack.push(name);
        }
    }

    let trailing = &body[last..];
    stack.is_empty() && roots == 1 && trailing.trim().is_empty()
}

// ============================================================================
// MARKUP
// ============================================================================

fn contains_markup(s: &str) -> bool {
    s.contains("<!--") || TAG_REGEX.is_match(s)
}

/// Contains at least one tag or comment
pub fn html(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(match value {
        Value::String(s) => contains_markup(s),
        _ => false,
    })
}

/// Inverse of `html`
pub fn plain(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(match value {
        Value::String(s) => !contains_markup(s),
        other => other.is_scalar(),
    })
}

/// Only the listed tags may appear, given as `b`, `<b>` or `<b><i>`.
/// Comments never pass.
pub fn tags(value: &Value, params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let Some(s) = text(value) else {
        return Ok(false);
    };
    if s.contains("<!--") {
        return Ok(false);
    }

    let allowed: Vec<String> = params
        .iter()
        .flat_map(|p| {
            let p = p.to_display_string();
            TAG_NAME_REGEX
                .find_iter(&p)
                .map(|m| m.as_str().to_ascii_lowercase())
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(TAG_REGEX.captures_iter(&s).all(|caps| {
        caps.get(2)
            .is_some_and(|name| allowed.contains(&name.as_str().to_ascii_lowercase()))
    }))
}

// ============================================================================
// COUNTING
// ============================================================================

/// Exactly `n` characters in the string cast
pub fn chars(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let expected = number_param(ctx, params, 0)?;
    if value.is_collection() {
        return Ok(false);
    }
    Ok(value.to_display_string().chars().count() as f64 == expected)
}

/// Exactly `n` words of letters and digits
pub fn words(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let expected = number_param(ctx, params, 0)?;
    Ok(text(value).is_some_and(|s| WORD_REGEX.find_iter(&s).count() as f64 == expected))
}

// ============================================================================
// SUBSTRINGS AND PATTERNS
// ============================================================================

/// Starts with any of the parameters
pub fn starts_with(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    check_min_params(ctx, params, 1)?;
    Ok(text(value).is_some_and(|s| params.iter().any(|p| s.starts_with(&p.to_display_string()))))
}

/// Ends with any of the parameters
pub fn ends_with(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    check_min_params(ctx, params, 1)?;
    Ok(text(value).is_some_and(|s| params.iter().any(|p| s.ends_with(&p.to_display_string()))))
}

/// Substring of a string, or member of a collection; every parameter must be
/// contained
pub fn contains(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    check_min_params(ctx, params, 1)?;
    if value.is_collection() {
        return Ok(params
            .iter()
            .all(|needle| value.members().any(|member| member.loose_eq(needle))));
    }
    Ok(text(value).is_some_and(|s| {
        params
            .iter()
            .all(|needle| s.contains(needle.to_display_string().as_str()))
    }))
}

/// `like(pattern, escape?)`
pub fn like(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let pattern = param(ctx, params, 0)?.to_display_string();
    let escape = optional_str_param(params, 1)
        .and_then(|s| s.chars().next())
        .unwrap_or(ctx.like_escape);
    let regex = compile_like(&pattern, escape)?;
    Ok(text(value).is_some_and(|s| regex.is_match(&s)))
}

/// Compiles a bare pattern or a delimited one such as `/^a+$/i`.
pub fn compile_regex(pattern: &str) -> MatcherResult<Regex> {
    let source = delimited_regex(pattern).unwrap_or_else(|| pattern.to_string());
    Regex::new(&source).map_err(|e| MatcherError::invalid_pattern(pattern, e.to_string()))
}

fn delimited_regex(pattern: &str) -> Option<String> {
    let delimiter = pattern.chars().next()?;
    if !REGEX_DELIMITERS.contains(&delimiter) {
        return None;
    }
    let end = pattern.rfind(delimiter)?;
    if end == 0 {
        return None;
    }
    let body = &pattern[delimiter.len_utf8()..end];
    let flags: String = pattern[end + delimiter.len_utf8()..]
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
        .collect();
    if pattern[end + delimiter.len_utf8()..]
        .chars()
        .any(|c| !matches!(c, 'i' | 'm' | 's' | 'x' | 'u' | 'U' | 'D'))
    {
        return None;
    }
    Some(if flags.is_empty() {
        body.to_string()
    } else {
        format!("(?{flags}){body}")
    })
}

pub fn regex(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    let pattern = param(ctx, params, 0)?.to_display_string();
    let regex = compile_regex(&pattern)?;
    Ok(text_matches(value, &regex))
}

// ============================================================================
// CHARACTER CLASSES
// ============================================================================

pub fn alpha(value: &Value, _params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(text_matches(value, &ALPHA_REGEX))
}

pub fn alpha_num(
    value: &Value,
    _params: &[Value],
    _ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(text_matches(value, &ALPHA_NUM_REGEX))
}

pub fn alpha_dash(
    value: &Value,
    _params: &[Value],
    _ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    Ok(text_matches(value, &ALPHA_DASH_REGEX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn check(
        predicate: crate::matcher::builtins::BuiltinPredicate,
        value: impl Into<Value>,
        params: &[&str],
    ) -> bool {
        let params: Vec<Value> = params.iter().map(|p| Value::from(*p)).collect();
        predicate(&value.into(), &params, &PredicateContext::new("text")).unwrap()
    }

    #[rstest]
    #[case("user@example.com", true)]
    #[case("first.last+tag@sub.example.org", true)]
    #[case("no-at-sign", false)]
    #[case("a@-bad.com", false)]
    fn emails(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(check(email, input, &[]), expected);
    }

    #[test]
    fn urls_and_ips() {
        assert!(check(url, "https://example.com/a?b=c", &[]));
        assert!(!check(url, "example.com", &[]));
        assert!(!check(url, "mailto:user@example.com", &[]));
        assert!(check(ip, "::1", &[]));
        assert!(check(ipv4, "192.168.0.1", &[]));
        assert!(!check(ipv4, "::1", &[]));
        assert!(check(ipv6, "2001:db8::1", &[]));
        assert!(!check(ip, "300.1.1.1", &[]));
    }

    #[test]
    fn digit_strings() {
        assert!(check(digits, "0123", &[]));
        assert!(check(digits, 4711, &["4"]));
        assert!(!check(digits, "12a", &[]));
        assert!(!check(digits, "-12", &[]));
        assert!(!check(digits, "123", &["4"]));
    }

    #[test]
    fn json_documents() {
        assert!(check(json, r#"{"a": [1, 2]}"#, &[]));
        assert!(!check(json, "{a: 1}", &[]));
        assert!(!check(json, Value::from(json!({"a": 1})), &[]));
    }

    #[rstest]
    #[case("<a><b>text</b><c/></a>", true)]
    #[case("<?xml version=\"1.0\"?>\n<root attr=\"1\"><!-- note --><x/></root>", true)]
    #[case("<root><![CDATA[<not a tag>]]></root>", true)]
    #[case("<a><b></a></b>", false)]
    #[case("<a></a><b></b>", false)]
    #[case("plain text", false)]
    #[case("<a>", false)]
    fn xml_documents(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(check(xml, input, &[]), expected);
    }

    #[test]
    fn markup() {
        assert!(check(html, "<p>Hello</p>", &[]));
        assert!(check(html, "a <!-- b --> c", &[]));
        assert!(!check(html, "1 < 2 and 3 > 2", &[]));
        assert!(check(plain, "1 < 2", &[]));
        assert!(!check(plain, "<br/>", &[]));
    }

    #[test]
    fn allowed_tags() {
        assert!(check(tags, "<b>bold</b> and <i>it</i>", &["<b><i>"]));
        assert!(check(tags, "<b>bold</b>", &["b", "i"]));
        assert!(!check(tags, "<b>bold</b><script>x</script>", &["b"]));
        assert!(!check(tags, "<b>a</b><!-- c -->", &["b"]));
        assert!(check(tags, "no markup", &[]));
    }

    #[test]
    fn counting() {
        assert!(check(chars, "héllo", &["5"]));
        assert!(check(chars, 12.5, &["4"]));
        assert!(check(words, "Hello, wörld 42!", &["3"]));
        assert!(!check(words, "one two", &["3"]));
    }

    #[test]
    fn substrings() {
        assert!(check(starts_with, "foobar", &["baz", "foo"]));
        assert!(check(ends_with, "foobar", &["bar"]));
        assert!(check(contains, "foobar", &["oba"]));
        assert!(!check(contains, "foobar", &["x"]));
        assert!(check(contains, Value::from(json!(["a", 2])), &["2"]));
        assert!(check(contains, Value::from(json!({"k": "v"})), &["v"]));
        assert!(!check(contains, Value::from(json!({"k": "v"})), &["k"]));
    }

    #[test]
    fn like_uses_context_escape() {
        let ctx = PredicateContext::new("like").with_like_escape('!');
        let params = [Value::from("100!%")];
        assert!(like(&Value::from("100%"), &params, &ctx).unwrap());
        assert!(check(like, "Hello my dear", &["%dear%"]));
        assert!(!check(like, "Hello my dear", &["hello"]));
    }

    #[rstest]
    #[case("^a+$", "aaa", true)]
    #[case("/^A+$/i", "aaa", true)]
    #[case("/^A+$/", "aaa", false)]
    #[case("#\\d{2,3}#", "x123", true)]
    #[case("/a/b/", "xa/by", true)]
    fn regex_forms(#[case] pattern: &str, #[case] input: &str, #[case] expected: bool) {
        assert_eq!(check(regex, input, &[pattern]), expected);
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let ctx = PredicateContext::new("regex");
        let err = regex(&Value::from("a"), &[Value::from("(")], &ctx).unwrap_err();
        assert_eq!(err.code(), "MATCHER:INVALID_PATTERN");
    }

    #[test]
    fn character_classes() {
        assert!(check(alpha, "Ärger", &[]));
        assert!(!check(alpha, "abc1", &[]));
        assert!(check(alpha_num, "abc1", &[]));
        assert!(!check(alpha_num, "abc-1", &[]));
        assert!(check(alpha_dash, "abc-1_x", &[]));
        assert!(!check(alpha_dash, "a b", &[]));
    }
}
