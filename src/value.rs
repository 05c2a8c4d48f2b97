//! Typed option values and the value kinds that produce them from raw text.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A converted option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Every value of a multi-valued or composing option, in merge order.
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Custom conversion from raw text. The error string is reported as the
/// expected form of the value.
pub type ParseFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// How raw text is turned into a [`Value`].
#[derive(Clone)]
pub enum ValueKind {
    String,
    Int,
    Float,
    Bool,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    Custom { name: String, parse: ParseFn },
}

impl fmt::Debug for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Custom { name, .. } => f.debug_tuple("Custom").field(name).finish(),
            other => f.write_str(&other.describe()),
        }
    }
}

impl ValueKind {
    pub fn custom<F>(name: impl Into<String>, parse: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        ValueKind::Custom {
            name: name.into(),
            parse: Arc::new(parse),
        }
    }

    /// Human-readable name of the expected value, used in conversion errors.
    pub fn describe(&self) -> String {
        match self {
            ValueKind::String => "string".to_string(),
            ValueKind::Int => "integer".to_string(),
            ValueKind::Float => "float".to_string(),
            ValueKind::Bool => "boolean".to_string(),
            ValueKind::Enum(choices) => format!("one of [{}]", choices.join(", ")),
            ValueKind::Custom { name, .. } => name.clone(),
        }
    }

    /// Convert raw text. On failure the error names what was expected.
    pub fn convert(&self, text: &str) -> Result<Value, String> {
        match self {
            ValueKind::String => Ok(Value::Str(text.to_string())),
            ValueKind::Int => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.describe()),
            ValueKind::Float => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.describe()),
            ValueKind::Bool => parse_bool(text).map(Value::Bool).ok_or_else(|| self.describe()),
            ValueKind::Enum(choices) => {
                if choices.iter().any(|c| c == text) {
                    Ok(Value::Str(text.to_string()))
                } else {
                    Err(self.describe())
                }
            }
            ValueKind::Custom { parse, .. } => parse(text),
        }
    }
}

/// Parse a boolean literal (case-insensitive).
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Extraction of a Rust type from a stored [`Value`].
pub trait FromValue: Sized {
    /// Name of the target type for mismatch errors.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            single => T::from_value(single).map(|v| vec![v]),
        }
    }
}
