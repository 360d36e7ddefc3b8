// File: rusty-forms-types/src/value.rs
// Purpose: Value tree held by a form (nested records, sequences and scalars)

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Keyed children of an object node
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Date format used for `type="date"` inputs and for serialization
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A node in the form value tree
///
/// Container variants keep their children behind an `Arc`, so cloning a tree
/// (or producing a modified copy with [`crate::path::set`]) shares every
/// branch that did not change.
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// No value at this location
    #[default]
    Undefined,
    Null,
    Bool(bool),
    /// May hold NaN after a failed numeric coercion
    Number(f64),
    String(String),
    /// `None` is an invalid date (failed date coercion)
    Date(Option<NaiveDate>),
    Array(Arc<Vec<FieldValue>>),
    Object(Arc<FieldMap>),
}

impl FieldValue {
    /// Build an object node from key/value pairs
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        FieldValue::Object(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Build an array node
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<FieldValue>,
        I: IntoIterator<Item = V>,
    {
        FieldValue::Array(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Empty object, the root of a fresh form
    pub fn empty_object() -> Self {
        FieldValue::Object(Arc::new(FieldMap::new()))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, FieldValue::Undefined)
    }

    /// Whether the value counts as "no input" for the `required` rule
    ///
    /// Empty strings, `Undefined`, `Null`, NaN and invalid dates are empty.
    pub fn is_empty_input(&self) -> bool {
        match self {
            FieldValue::Undefined | FieldValue::Null => true,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Date(d) => d.is_none(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => *d,
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convert to JSON (`Undefined`, NaN and invalid dates become `null`)
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            FieldValue::Undefined | FieldValue::Null => Json::Null,
            FieldValue::Bool(b) => Json::Bool(*b),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            FieldValue::String(s) => Json::String(s.clone()),
            FieldValue::Date(Some(d)) => Json::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::Date(None) => Json::Null,
            FieldValue::Array(items) => Json::Array(items.iter().map(|v| v.to_json()).collect()),
            FieldValue::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Undefined, FieldValue::Undefined) => true,
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            // NaN equals NaN here so dirty tracking can settle after an invalid number
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Undefined | FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            // f64's Display already drops `.0` on whole numbers; only -0 needs folding
            FieldValue::Number(n) if *n == 0.0 => f.write_str("0"),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Date(Some(d)) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::Date(None) => f.write_str("Invalid Date"),
            FieldValue::Array(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            FieldValue::Object(_) => f.write_str("[Object]"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(FieldValue::from)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => FieldValue::Null,
            Json::Bool(b) => FieldValue::Bool(b),
            Json::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => FieldValue::String(s),
            Json::Array(items) => FieldValue::array(items),
            Json::Object(map) => FieldValue::object(map),
        }
    }
}

impl From<&FieldValue> for serde_json::Value {
    fn from(value: &FieldValue) -> Self {
        value.to_json()
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(Some(d))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::Array(Arc::new(items))
    }
}

impl From<FieldMap> for FieldValue {
    fn from(map: FieldMap) -> Self {
        FieldValue::Object(Arc::new(map))
    }
}
