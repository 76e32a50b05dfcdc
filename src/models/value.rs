use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// A single field value as stored in a document
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
    /// Maps, arrays, references, bytes and geo points, kept as rendered text
    Other(String),
}

impl FieldValue {
    /// Null and empty text count as empty; numbers and booleans never do
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(text) | FieldValue::Other(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Boolean(value) => write!(f, "{value}"),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Double(value) => write!(f, "{value}"),
            FieldValue::Timestamp(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            FieldValue::Text(text) | FieldValue::Other(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

#[cfg(test)]
impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

#[cfg(test)]
impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}
