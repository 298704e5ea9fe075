//! Structured event model shared by the decode and encode paths.
//!
//! An [`Event`] is an ordered set of named fields plus two reserved fields,
//! `@timestamp` and `@version`. Field values are either a [`Scalar`] or a
//! single level of nested scalars ([`FieldValue::Map`]).
//!
//! Events serialize to and from the usual JSON shape:
//!
//! ```json
//! {"@timestamp": "2024-01-01T00:00:00Z", "@version": "1", "host": "web1", "stats": {"p99": 9.9}}
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::coerce::format_value;
use crate::error::DecodeError;

/// Name of the reserved timestamp field.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Name of the reserved version field.
pub const VERSION_FIELD: &str = "@version";

/// Version stamped on events this crate creates.
pub const DEFAULT_VERSION: &str = "1";

/// A single scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A double-precision float.
    Float(f64),
    /// Free-form text.
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(&format_value(*v)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The value held by an event field.
///
/// Exactly one level of nesting is supported: a map's entries are scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A single scalar.
    Scalar(Scalar),
    /// Sub-name to scalar, in insertion order.
    Map(IndexMap<String, Scalar>),
}

impl FieldValue {
    /// Builds a nested map value from `(sub_name, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use graphite_codec::FieldValue;
    ///
    /// let stats = FieldValue::map([("p50", "1.1"), ("p99", "9.9")]);
    /// assert!(stats.as_map().is_some());
    /// ```
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the scalar, if this is not a map.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Map(_) => None,
        }
    }

    /// Returns the nested map, if this is one.
    pub fn as_map(&self) -> Option<&IndexMap<String, Scalar>> {
        match self {
            Self::Scalar(_) => None,
            Self::Map(m) => Some(m),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => s.fmt(f),
            // Maps render as compact JSON when substituted into text.
            Self::Map(m) => {
                let json = serde_json::to_string(m).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

macro_rules! scalar_field_value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_field_value_from!(bool, i64, f64, &str, String);

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<IndexMap<String, Scalar>> for FieldValue {
    fn from(value: IndexMap<String, Scalar>) -> Self {
        Self::Map(value)
    }
}

/// A structured event.
///
/// Events are built once per decoded line, or handed to the encoder by the
/// surrounding pipeline. The codec never mutates an event it is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "@timestamp", default = "Utc::now")]
    timestamp: DateTime<Utc>,

    #[serde(
        rename = "@version",
        default = "default_version",
        deserialize_with = "deserialize_version"
    )]
    version: String,

    #[serde(flatten)]
    fields: IndexMap<String, FieldValue>,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// `@version` is opaque: any JSON value is accepted and kept as text.
fn deserialize_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(version) => version,
        serde_json::Value::Null => default_version(),
        other => other.to_string(),
    })
}

impl Event {
    /// Creates an event with no user fields at the given instant.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            version: default_version(),
            fields: IndexMap::new(),
        }
    }

    /// Creates an event at `seconds` since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::TimestampOutOfRange`] if the instant is outside
    /// chrono's representable range.
    pub fn at_epoch(seconds: i64) -> Result<Self, DecodeError> {
        DateTime::from_timestamp(seconds, 0)
            .map(Self::new)
            .ok_or(DecodeError::TimestampOutOfRange { seconds })
    }

    /// Sets a field, keeping its original position if it already existed.
    ///
    /// Returns the previous value, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Builder-style [`Event::insert`].
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks up a user field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Looks up one entry of a nested field.
    pub fn get_nested(&self, name: &str, sub_name: &str) -> Option<&Scalar> {
        self.fields.get(name)?.as_map()?.get(sub_name)
    }

    /// Iterates user fields in insertion order.
    ///
    /// The reserved fields are not part of this iteration.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of user fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the event has no user fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The event's `@timestamp`.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Replaces the event's `@timestamp`.
    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    /// The event's `@timestamp` as whole seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }

    /// The event's `@version`.
    pub fn version(&self) -> &str {
        &self.version
    }
}
