#![forbid(unsafe_code)]

//! JSON-compatible parameter tree with structurally shared containers.
//!
//! A [`Value`] is what the editor loads from the theme API, what every tab
//! writes into, and what the preview renders. Containers keep their children
//! behind an [`Arc`], so:
//!
//! - cloning a tree is O(1) (a history snapshot costs one refcount bump),
//! - two snapshots share every subtree that was not written between them,
//! - writes go through [`Arc::make_mut`], which copies a container only when
//!   it is shared. A write therefore never reaches into an older snapshot.
//!
//! # Invariants
//!
//! 1. **Always serializable**: only JSON variants exist, and shared ownership
//!    without interior mutability cannot form cycles.
//! 2. **Key order is preserved**: objects are [`IndexMap`]s, so a loaded tree
//!    serializes back with the same key order.
//! 3. **Lossless JSON bridge**: `Value` <-> `serde_json::Value` conversions
//!    round-trip exactly.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

use crate::path::{ParamPath, Segment};

/// Object body of a [`Value::Object`].
pub type Map = IndexMap<String, Value>;

/// A node of the parameter tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// JSON `null`; also what skipped array slots are filled with.
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    /// Ordered sequence, addressed by [`Segment::Index`].
    Array(Arc<Vec<Value>>),
    /// Keyed object, addressed by [`Segment::Key`] (or an index's text).
    Object(Arc<Map>),
}

impl Value {
    /// An empty object.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(Arc::new(Map::new()))
    }

    /// An empty array.
    #[must_use]
    pub fn array() -> Self {
        Self::Array(Arc::new(Vec::new()))
    }

    /// The empty container a missing slot becomes when `next` is written into it.
    #[must_use]
    pub fn container_for(next: &Segment) -> Self {
        match next {
            Segment::Index(_) => Self::array(),
            Segment::Key(_) => Self::object(),
        }
    }

    /// Stable name of the variant, for logs and error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this is an array or an object.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up an object key. `None` for non-objects.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Read the value at `path`.
    ///
    /// Index segments address array elements; on an object they are read as
    /// the key with the same text. Returns `None` as soon as the walk leaves
    /// the tree.
    #[must_use]
    pub fn get(&self, path: &ParamPath) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| match (node, segment) {
                (Self::Object(map), segment) => map.get(&*segment.as_key()),
                (Self::Array(items), Segment::Index(index)) => items.get(*index),
                _ => None,
            })
    }

    /// Whether `self` and `other` are the same shared container allocation.
    ///
    /// Scalars never share; two equal strings still compare `false`.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Convert into a `serde_json::Value` (deep copy).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.to_string()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s.into()),
            serde_json::Value::Array(items) => {
                Self::Array(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Self::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Arc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(Arc::new(map))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    /// Compact JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
