// ── Device state values ──
//
// The device reports a flat map of short keys to scalars. Numbers arrive
// as JSON numbers or as numeric strings depending on firmware, so the
// accessors here parse leniently and return `None` rather than failing.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sunxt_api::ReportedState;

/// A single reported value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum StateValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Arrays, objects, or numbers outside the i64/f64 range.
    Raw(Value),
}

impl StateValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view. Numeric text (`"123"`, `" -2.5 "`) parses; anything
    /// else is `None`.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Null | Self::Raw(_) => None,
        }
    }

    /// Integer view. Floats only qualify when they have no fractional part.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::Text(s) => s.trim().parse::<i64>().ok(),
            Self::Float(_) | Self::Null | Self::Raw(_) => None,
        }
    }

    /// Boolean view of a 0/1 flag.
    pub fn as_flag(&self) -> Option<bool> {
        self.as_i64().map(|i| i != 0)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Raw(v) => write!(f, "{v}"),
        }
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Raw(Value::Number(n))
                }
            }
            Value::String(s) => Self::Text(s),
            other @ (Value::Array(_) | Value::Object(_)) => Self::Raw(other),
        }
    }
}

impl From<StateValue> for Value {
    fn from(value: StateValue) -> Self {
        match value {
            StateValue::Null => Value::Null,
            StateValue::Bool(b) => Value::Bool(b),
            StateValue::Integer(i) => Value::from(i),
            StateValue::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
            StateValue::Text(s) => Value::String(s),
            StateValue::Raw(v) => v,
        }
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// ── DeviceState ──────────────────────────────────────────────────

/// Latest known key/value snapshot from the device.
///
/// Read-only outside this crate: the state store is the only writer,
/// through wholesale replacement after a poll or a per-key patch after
/// an accepted write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(HashMap<String, StateValue>);

impl DeviceState {
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, StateValue> {
        self.0.iter()
    }

    pub(crate) fn insert(&mut self, key: String, value: StateValue) {
        self.0.insert(key, value);
    }
}

impl From<ReportedState> for DeviceState {
    fn from(reported: ReportedState) -> Self {
        Self(
            reported
                .into_iter()
                .map(|(k, v)| (k, StateValue::from(v)))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<StateValue>> FromIterator<(K, V)> for DeviceState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a DeviceState {
    type Item = (&'a String, &'a StateValue);
    type IntoIter = hash_map::Iter<'a, String, StateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
