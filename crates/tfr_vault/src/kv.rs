//! Key/value payloads stored in the secrets store.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Ordered key/value data of a single secret.
pub type KvData = BTreeMap<String, KvValue>;

/// Scalar value of a secret key.
///
/// Secrets consumed by terraform only ever hold scalars; anything else is
/// rejected when reading and stringified when converting terraform outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KvValue {
    Bool(bool),
    Number(Number),
    String(String),
}

impl KvValue {
    /// Borrow the value if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value, rejecting nulls, arrays and objects.
    pub fn from_scalar(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::Number(n) => Some(Self::Number(n)),
            Value::String(s) => Some(Self::String(s)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Convert a JSON value, encoding non-scalars as their JSON text.
    pub fn from_json_lossy(value: Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            other => Self::String(other.to_string()),
        }
    }
}

impl fmt::Display for KvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for KvValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for KvValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for KvValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for KvValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}
