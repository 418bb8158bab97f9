//! Path selectors over nested values
//!
//! A selector addresses values inside nested maps and lists:
//!
//! - `a.b.c` walks map keys,
//! - `a[0].b` / `a[*].b` index or fan out over a list,
//! - `items.*.price` / `items.0.price` are accepted as long as the selector
//!   has no `[`.
//!
//! Matches carry their concrete segments, for [`deep_set`], and a rendered
//! path such as `items[0].price` for reports. Map keys that would read as an
//! index or hold `.`/`[`/`]` render quoted, e.g. `prices["10"]`.

use std::fmt;

use crate::value::{Map, Value};

// ============================================================================
// SEGMENTS
// ============================================================================

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Map key
    Key(String),
    /// List position
    Index(usize),
    /// Every member of a list (or map)
    Wildcard,
}

impl PathSegment {
    fn parse_bracket(inner: &str) -> Self {
        let inner = inner.trim();
        if inner == "*" {
            return Self::Wildcard;
        }
        match inner.parse::<usize>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Key(inner.trim_matches(|c| c == '"' || c == '\'').to_string()),
        }
    }

    fn parse_dotted(part: &str, positional: bool) -> Self {
        if positional {
            if part == "*" {
                return Self::Wildcard;
            }
            if let Ok(index) = part.parse::<usize>() {
                return Self::Index(index);
            }
        }
        Self::Key(part.to_string())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Wildcard => f.write_str("[*]"),
        }
    }
}

/// Splits a selector or concrete path into segments.
///
/// Dotted integer and `*` segments are positional only when the path has no
/// bracket; with brackets present they are plain keys. A quoted bracket
/// (`["a.b"]`) is always a key.
pub fn split_path(path: &str) -> Vec<PathSegment> {
    let positional = !path.contains('[');
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix('[') {
            let (segment, tail) = bracket_segment(inner);
            segments.push(segment);
            rest = tail;
        } else {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let (head, tail) = rest.split_at(end);
            if !head.is_empty() {
                segments.push(PathSegment::parse_dotted(head, positional));
            }
            rest = tail;
        }
        rest = rest.strip_prefix('.').unwrap_or(rest);
    }

    segments
}

/// Parses the text after a `[`, returning the segment and what follows `]`.
fn bracket_segment(inner: &str) -> (PathSegment, &str) {
    let trimmed = inner.trim_start();
    if let Some(quote) = trimmed.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let body = &trimmed[1..];
        if let Some(close) = body.find(quote) {
            let after = body[close + 1..].trim_start();
            let tail = after.strip_prefix(']').unwrap_or(after);
            return (PathSegment::Key(body[..close].to_string()), tail);
        }
    }

    match inner.find(']') {
        Some(close) => (PathSegment::parse_bracket(&inner[..close]), &inner[close + 1..]),
        // Unterminated bracket: keep the remainder as a key
        None => (PathSegment::Key(format!("[{inner}")), ""),
    }
}

/// Renders segments as a concrete path, e.g. `items[0].price`.
pub fn render_path(segments: &[PathSegment]) -> String {
    let mut path = String::new();
    for segment in segments {
        push_segment(&mut path, segment);
    }
    path
}

/// Keys that would not split back into themselves.
fn needs_quoting(key: &str) -> bool {
    key.is_empty()
        || key == "*"
        || key.bytes().all(|b| b.is_ascii_digit())
        || key.contains(['.', '[', ']'])
}

fn push_segment(path: &mut String, segment: &PathSegment) {
    match segment {
        PathSegment::Key(key) if needs_quoting(key) => {
            let quote = if key.contains('"') { '\'' } else { '"' };
            path.push('[');
            path.push(quote);
            path.push_str(key);
            path.push(quote);
            path.push(']');
        }
        PathSegment::Key(key) => {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(key);
        }
        other => path.push_str(&other.to_string()),
    }
}

/// Whether a field key needs selector expansion.
pub fn is_selector(key: &str) -> bool {
    key.contains(['*', '.', '['])
}

// ============================================================================
// ITERATOR
// ============================================================================

struct Frame<'a> {
    segments: Vec<PathSegment>,
    value: &'a Value,
}

/// Expands a selector against a value, yielding `(concrete path, value)`.
///
/// Matches come in document order. Missing keys and out-of-range indexes
/// simply produce no match. [`next_match`](Self::next_match) yields the
/// concrete segments instead of the rendered path.
///
/// ```rust,ignore
/// use tessera_validator::validation::path::JsonPathIterator;
///
/// let input = Value::from(json!({"items": [{"price": 1}, {"price": 2}]}));
/// let paths: Vec<_> = JsonPathIterator::new(&input, "items.*.price")
///     .map(|(path, _)| path)
///     .collect();
/// assert_eq!(paths, ["items[0].price", "items[1].price"]);
/// ```
pub struct JsonPathIterator<'a> {
    selector: Vec<PathSegment>,
    stack: Vec<Frame<'a>>,
    prefix: String,
}

impl<'a> JsonPathIterator<'a> {
    pub fn new(input: &'a Value, selector: &str) -> Self {
        Self {
            selector: split_path(selector),
            stack: vec![Frame {
                segments: Vec::new(),
                value: input,
            }],
            prefix: String::new(),
        }
    }

    /// Prepends `prefix` to every yielded path.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// See [`split_path`].
    pub fn split_path(path: &str) -> Vec<PathSegment> {
        split_path(path)
    }

    /// Next match with its concrete segments, prefix included.
    pub fn next_match(&mut self) -> Option<(Vec<PathSegment>, &'a Value)> {
        while let Some(frame) = self.stack.pop() {
            if frame.segments.len() == self.selector.len() {
                let mut segments = split_path(&self.prefix);
                segments.extend(frame.segments);
                return Some((segments, frame.value));
            }
            self.expand(frame);
        }
        None
    }

    fn prefixed(&self, path: String) -> String {
        if self.prefix.is_empty() {
            path
        } else if path.is_empty() || path.starts_with('[') {
            format!("{}{path}", self.prefix)
        } else {
            format!("{}.{path}", self.prefix)
        }
    }

    fn expand(&mut self, frame: Frame<'a>) {
        let child = |segment: PathSegment, value: &'a Value| {
            let mut segments = frame.segments.clone();
            segments.push(segment);
            Frame { segments, value }
        };

        let children: Vec<Frame<'a>> = match (&self.selector[frame.segments.len()], frame.value) {
            (PathSegment::Wildcard, Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| child(PathSegment::Index(index), item))
                .collect(),
            (PathSegment::Wildcard, Value::Object(map)) => map
                .iter()
                .map(|(key, item)| child(PathSegment::Key(key.clone()), item))
                .collect(),
            (PathSegment::Index(index), Value::Array(items)) => items
                .get(*index)
                .map(|item| child(PathSegment::Index(*index), item))
                .into_iter()
                .collect(),
            (PathSegment::Index(index), Value::Object(map)) => {
                let key = index.to_string();
                map.get(&key)
                    .map(|item| child(PathSegment::Key(key.clone()), item))
                    .into_iter()
                    .collect()
            }
            (PathSegment::Key(key), Value::Object(map)) => map
                .get(key)
                .map(|item| child(PathSegment::Key(key.clone()), item))
                .into_iter()
                .collect(),
            (PathSegment::Key(key), Value::Array(items)) => key
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index).map(|item| (index, item)))
                .map(|(index, item)| child(PathSegment::Index(index), item))
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };

        // Reversed so the first child is popped first
        self.stack.extend(children.into_iter().rev());
    }
}

impl<'a> Iterator for JsonPathIterator<'a> {
    type Item = (String, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            if frame.segments.len() == self.selector.len() {
                let path = self.prefixed(render_path(&frame.segments));
                return Some((path, frame.value));
            }
            self.expand(frame);
        }
        None
    }
}

// ============================================================================
// LOOKUP / DEEP SET
// ============================================================================

/// First value addressed by `path`, if any.
pub fn lookup<'a>(input: &'a Value, path: &str) -> Option<&'a Value> {
    JsonPathIterator::new(input, path).next().map(|(_, value)| value)
}

/// Writes `value` at `segments`, creating maps and lists on the way.
///
/// A wildcard writes at position 0. Lists are padded with `Null` up to the
/// written index, so a padded slot reads the same as a stored `Null`. A node
/// of the wrong shape is replaced.
pub fn deep_set(target: &mut Value, segments: &[PathSegment], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    match segment {
        PathSegment::Key(key) => {
            if !matches!(target, Value::Object(_)) {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                deep_set(slot, rest, value);
            }
        }
        PathSegment::Index(_) | PathSegment::Wildcard => {
            let index = match segment {
                PathSegment::Index(index) => *index,
                _ => 0,
            };
            if !matches!(target, Value::Array(_)) {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(items) = target {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                deep_set(&mut items[index], rest, value);
            }
        }
    }
}
