//! In-memory value model for matching and validation.
//!
//! [`Value`] is the JSON data model plus a point-in-time variant. Records
//! usually arrive as `serde_json::Value` and are converted once with
//! `Value::from`. A JSON string never turns into [`Value::DateTime`] on its
//! own; only callers that already hold a parsed timestamp produce one.
//!
//! The type queries follow loose scripting-language semantics: `type_name`
//! mirrors `gettype` and `is_numeric` accepts numeric strings.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Map type used for [`Value::Object`]. Keeps insertion order.
pub type Map = IndexMap<String, Value>;

/// Shared null for lookups that find nothing.
pub static NULL: Value = Value::Null;

static NUMERIC_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap()
});

// ============================================================================
// VALUE
// ============================================================================

/// A value flowing through constraints, the matcher and the validator.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer number
    Int(i64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list
    Array(Vec<Value>),
    /// Ordered key-value map
    Object(Map),
    /// Point in time with a fixed offset
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    /// Type name in `gettype` vocabulary.
    ///
    /// Lists and maps are both `"array"`; date/times are `"object"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "double",
            Self::String(_) => "string",
            Self::Array(_) | Self::Object(_) => "array",
            Self::DateTime(_) => "object",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Bool, number or string.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_)
        )
    }

    /// List or map.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    /// True for numbers and numeric strings.
    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    /// Numeric view of the value: numbers and numeric strings.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => parse_numeric(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Number of elements of a list or map.
    pub fn collection_len(&self) -> Option<usize> {
        match self {
            Self::Array(items) => Some(items.len()),
            Self::Object(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Iterates the elements of a list or the values of a map.
    pub fn members(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Self::Array(items) => Box::new(items.iter()),
            Self::Object(map) => Box::new(map.values()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Truthiness of a bool cast.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty() && s != "0",
            Self::Array(items) => !items.is_empty(),
            Self::Object(map) => !map.is_empty(),
            Self::DateTime(_) => true,
        }
    }

    /// String cast: `null` and `false` become empty, collections become
    /// `"Array"`, integral floats drop their fraction.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null | Self::Bool(false) => String::new(),
            Self::Bool(true) => "1".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::String(s) => s.clone(),
            Self::Array(_) | Self::Object(_) => "Array".to_string(),
            Self::DateTime(dt) => dt.to_rfc3339(),
        }
    }

    /// Same variant and same content.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
            }
            _ => self == other,
        }
    }

    /// Loose equality with type juggling.
    ///
    /// Numeric operands (including numeric strings) compare by value, `null`
    /// and booleans compare by truthiness, and a number against a
    /// non-numeric string compares as strings.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(_) | Self::Null, _) | (_, Self::Bool(_) | Self::Null) => {
                self.is_truthy() == other.is_truthy()
            }
            (Self::String(a), Self::String(b)) => match (parse_numeric(a), parse_numeric(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            (Self::Int(_) | Self::Float(_), Self::String(_))
            | (Self::String(_), Self::Int(_) | Self::Float(_)) => {
                match (self.as_number(), other.as_number()) {
                    (Some(x), Some(y)) => x == y,
                    _ => self.to_display_string() == other.to_display_string(),
                }
            }
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_number() == other.as_number()
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.loose_eq(other)))
            }
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            _ => false,
        }
    }

    /// Looks up a direct key of a map, or an index of a list when the key
    /// is an integer.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(key),
            Self::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

/// Parses a numeric string the way `is_numeric` accepts it: optional
/// surrounding whitespace, optional sign, decimal or exponent notation.
pub fn parse_numeric(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if !NUMERIC_REGEX.is_match(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

// ============================================================================
// DISPLAY
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Array(_) | Self::Object(_) => {
                write!(f, "{}", serde_json::Value::from(self.clone()))
            }
            other => f.write_str(&other.to_display_string()),
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(u: usize) -> Self {
        Self::Int(u as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(map)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
            Value::DateTime(dt) => Self::String(dt.to_rfc3339()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
