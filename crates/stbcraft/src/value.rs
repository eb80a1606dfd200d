//! Semantic values produced by decoding and consumed by encoding.

use std::{collections::BTreeMap, fmt};

/// One decoded record: field name to value.
pub type Record = BTreeMap<String, Value>;

/// A decoded value.
///
/// Composite fields decode to [`Value::Record`] when they occur once and to
/// [`Value::List`] of records when they repeat.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Bool(bool),
    U64(u64),
    I64(i64),
    F64(f64),
    /// Single-precision float, kept apart from `F64` so it re-encodes bit-exact.
    F32(f32),
    Text(String),
    Record(Record),
    List(Vec<Value>),
}

impl Value {
    /// Parses a constant literal from schema text.
    ///
    /// Text containing a `.` is read as a float, otherwise as an integer;
    /// anything that is not a number stays text.
    pub fn from_literal(text: &str) -> Value {
        if text.contains('.') {
            if let Ok(v) = text.parse::<f64>() {
                return Value::F64(v);
            }
        } else if let Ok(v) = text.parse::<i64>() {
            return Value::I64(v);
        } else if let Ok(v) = text.parse::<u64>() {
            return Value::U64(v);
        }

        Value::Text(text.to_string())
    }

    /// Integer view of numeric and boolean values.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Bool(b) => Some(*b as i128),
            Value::U64(v) => Some(*v as i128),
            Value::I64(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Float view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::F32(v) => Some(*v as f64),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    /// Interprets the value as a repetition or byte count.
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Value::U64(_) | Value::I64(_) => self.as_i128().and_then(|v| usize::try_from(v).ok()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Short name of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::U64(_) | Value::I64(_) => "integer",
            Value::F64(_) | Value::F32(_) => "float",
            Value::Text(_) => "text",
            Value::Record(_) => "record",
            Value::List(_) => "list",
        }
    }

    /// Compares two scalars by meaning rather than representation,
    /// so `U64(3)` matches the literal `I64(3)`.
    pub fn same_scalar(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_i128(), other.as_i128()) {
            return a == b;
        }

        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Record(_) | Value::List(_), _) => false,
            (_, Value::Record(_) | Value::List(_)) => false,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Record(r) => write!(f, "record with {} fields", r.len()),
            Value::List(l) => write!(f, "list of {}", l.len()),
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::U64(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}
