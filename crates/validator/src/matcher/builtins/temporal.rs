//! Date and time predicates
//!
//! Accepted inputs are [`Value::DateTime`], integer Unix timestamps and
//! strings. Strings are parsed best-effort: RFC 3339 and RFC 2822, a list of
//! common layouts, the keywords `now`, `today`, `tomorrow`, `yesterday`, and
//! `@<timestamp>`. An explicit format may use `date()` letters (`Y-m-d`) or
//! chrono specifiers (`%Y-%m-%d`).

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::{PredicateContext, optional_str_param, param};
use crate::config::Formats;
use crate::error::MatcherResult;
use crate::value::Value;

const DATETIME_LAYOUTS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_LAYOUTS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y", "%Y%m%d"];

const TIME_LAYOUTS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

// ============================================================================
// PARSING
// ============================================================================

/// Translates `date()` format letters into chrono specifiers.
///
/// Formats that already contain `%` are returned unchanged. A backslash
/// makes the next character literal.
pub fn to_chrono_format(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }

    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        let spec = match c {
            'd' => "%d",
            'j' => "%-d",
            'm' => "%m",
            'n' => "%-m",
            'Y' => "%Y",
            'y' => "%y",
            'H' => "%H",
            'G' => "%-H",
            'h' => "%I",
            'g' => "%-I",
            'i' => "%M",
            's' => "%S",
            'u' => "%6f",
            'v' => "%3f",
            'A' => "%p",
            'a' => "%P",
            'D' => "%a",
            'l' => "%A",
            'M' => "%b",
            'F' => "%B",
            'O' => "%z",
            'P' => "%:z",
            'T' => "%Z",
            'U' => "%s",
            '\\' => {
                if let Some(literal) = chars.next() {
                    push_literal(&mut out, literal);
                }
                continue;
            }
            other => {
                push_literal(&mut out, other);
                continue;
            }
        };
        out.push_str(spec);
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    naive.and_utc().fixed_offset()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_with_layout(input: &str, layout: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_str(input, layout) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, layout) {
        return Some(utc(naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, layout) {
        return Some(utc(date.and_time(NaiveTime::MIN)));
    }
    NaiveTime::parse_from_str(input, layout)
        .ok()
        .map(|time| utc(today().and_time(time)))
}

fn parse_keyword(input: &str) -> Option<DateTime<FixedOffset>> {
    let midnight = |date: NaiveDate| utc(date.and_time(NaiveTime::MIN));
    match input.to_ascii_lowercase().as_str() {
        "now" => Some(Utc::now().fixed_offset()),
        "today" | "midnight" => Some(midnight(today())),
        "tomorrow" => today().checked_add_days(Days::new(1)).map(midnight),
        "yesterday" => today().checked_sub_days(Days::new(1)).map(midnight),
        _ => None,
    }
}

fn from_timestamp(seconds: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.fixed_offset())
}

/// Parses a date/time string without a format.
pub fn parse_datetime_str(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Some(seconds) = input.strip_prefix('@') {
        return seconds.parse().ok().and_then(from_timestamp);
    }
    parse_keyword(input)
        .or_else(|| DateTime::parse_from_rfc3339(input).ok())
        .or_else(|| DateTime::parse_from_rfc2822(input).ok())
        .or_else(|| {
            DATETIME_LAYOUTS
                .iter()
                .chain(&DATE_LAYOUTS)
                .chain(&TIME_LAYOUTS)
                .find_map(|layout| parse_with_layout(input, layout))
        })
}

/// Converts a value into a date/time, with an optional explicit format.
pub fn to_datetime(value: &Value, format: Option<&str>) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Int(seconds) => from_timestamp(*seconds),
        Value::Float(seconds) if seconds.is_finite() => from_timestamp(seconds.trunc() as i64),
        Value::String(s) => match format {
            Some(format) => parse_with_layout(s.trim(), &to_chrono_format(format)),
            None => parse_datetime_str(s),
        },
        _ => None,
    }
}

/// Parses without a format first, then retries with `format` and with each
/// of the named `formats`.
pub fn lenient_datetime(
    value: &Value,
    format: Option<&str>,
    formats: &Formats,
) -> Option<DateTime<FixedOffset>> {
    to_datetime(value, None)
        .or_else(|| format.and_then(|f| to_datetime(value, Some(f))))
        .or_else(|| formats.values().find_map(|f| to_datetime(value, Some(f))))
}

/// Unix timestamp of [`lenient_datetime`].
pub fn lenient_timestamp(value: &Value, format: Option<&str>, formats: &Formats) -> Option<i64> {
    lenient_datetime(value, format, formats).map(|dt| dt.timestamp())
}

fn has_time_component(input: &str) -> bool {
    let input = input.trim();
    DATETIME_LAYOUTS
        .iter()
        .any(|layout| NaiveDateTime::parse_from_str(input, layout).is_ok())
        || DateTime::parse_from_rfc3339(input).is_ok()
        || DateTime::parse_from_rfc2822(input).is_ok()
        || input.eq_ignore_ascii_case("now")
}

fn is_time_of_day(input: &str) -> bool {
    let input = input.trim();
    TIME_LAYOUTS
        .iter()
        .any(|layout| NaiveTime::parse_from_str(input, layout).is_ok())
}

// ============================================================================
// PREDICATES
// ============================================================================

/// Parseable as a date, with the optional format
pub fn date(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(match optional_str_param(params, 0) {
        Some(format) => to_datetime(value, Some(&format)).is_some(),
        None => lenient_datetime(value, None, ctx.formats).is_some(),
    })
}

/// Parseable as a date carrying a time of day
pub fn datetime(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    if let Some(format) = optional_str_param(params, 0) {
        return Ok(to_datetime(value, Some(&format)).is_some());
    }
    Ok(match value {
        Value::String(s) => {
            has_time_component(s)
                || ctx
                    .formats
                    .values()
                    .any(|f| to_datetime(value, Some(f)).is_some())
        }
        other => to_datetime(other, None).is_some(),
    })
}

/// A time of day such as `13:45` or `13:45:10`
pub fn time(value: &Value, params: &[Value], _ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    if let Some(format) = optional_str_param(params, 0) {
        return Ok(to_datetime(value, Some(&format)).is_some());
    }
    Ok(match value {
        Value::String(s) => is_time_of_day(s),
        Value::DateTime(_) => true,
        _ => false,
    })
}

fn relative(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<Option<(i64, i64)>> {
    let boundary = param(ctx, params, 0)?;
    let format = optional_str_param(params, 1);
    let value = lenient_timestamp(value, format.as_deref(), ctx.formats);
    let boundary = lenient_timestamp(boundary, format.as_deref(), ctx.formats);
    Ok(value.zip(boundary))
}

/// Strictly later than the boundary
pub fn after(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(relative(value, params, ctx)?.is_some_and(|(v, b)| v > b))
}

/// Strictly earlier than the boundary
pub fn before(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    Ok(relative(value, params, ctx)?.is_some_and(|(v, b)| v < b))
}
