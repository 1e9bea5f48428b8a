//! Property value types for holons
//!
//! A holon's content is a [`PropertyMap`]: property names mapped to an
//! optional [`BaseValue`]. The value model is closed to four variants.
//!
//! ## Presence Rules
//!
//! - A name absent from the map and a name mapped to `None` are distinct
//! - Property names are case-sensitive
//! - Different variants are never equal (`StringValue("1")` != `IntegerValue(1)`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the property a holon is indexed under in a session pool.
pub const KEY_PROPERTY: &str = "key";

/// A string wrapper used for names, keys and descriptions on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapString(pub String);

impl MapString {
    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapString {
    fn from(s: &str) -> Self {
        MapString(s.to_string())
    }
}

impl From<String> for MapString {
    fn from(s: String) -> Self {
        MapString(s)
    }
}

/// Case-sensitive property name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyName(pub MapString);

impl PropertyName {
    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PropertyName {
    fn from(s: &str) -> Self {
        PropertyName(MapString::from(s))
    }
}

impl From<String> for PropertyName {
    fn from(s: String) -> Self {
        PropertyName(MapString(s))
    }
}

/// A single property value
///
/// Serialized externally tagged, e.g. `{"StringValue": "mybook"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseValue {
    /// UTF-8 string
    StringValue(String),
    /// Boolean
    BooleanValue(bool),
    /// 64-bit signed integer
    IntegerValue(i64),
    /// Name of an enum variant
    EnumValue(String),
}

impl BaseValue {
    /// Returns the variant name (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            BaseValue::StringValue(_) => "StringValue",
            BaseValue::BooleanValue(_) => "BooleanValue",
            BaseValue::IntegerValue(_) => "IntegerValue",
            BaseValue::EnumValue(_) => "EnumValue",
        }
    }

    /// Try to get as string slice (StringValue only)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BaseValue::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BaseValue::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BaseValue::IntegerValue(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get the enum variant name
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            BaseValue::EnumValue(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for BaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseValue::StringValue(s) => write!(f, "{:?}", s),
            BaseValue::BooleanValue(b) => write!(f, "{}", b),
            BaseValue::IntegerValue(i) => write!(f, "{}", i),
            BaseValue::EnumValue(e) => write!(f, "{}", e),
        }
    }
}

impl From<&str> for BaseValue {
    fn from(s: &str) -> Self {
        BaseValue::StringValue(s.to_string())
    }
}

impl From<String> for BaseValue {
    fn from(s: String) -> Self {
        BaseValue::StringValue(s)
    }
}

impl From<bool> for BaseValue {
    fn from(b: bool) -> Self {
        BaseValue::BooleanValue(b)
    }
}

impl From<i64> for BaseValue {
    fn from(i: i64) -> Self {
        BaseValue::IntegerValue(i)
    }
}

/// Property names mapped to optional values
pub type PropertyMap = BTreeMap<PropertyName, Option<BaseValue>>;

/// Build a [`PropertyMap`] from `(name, value)` pairs.
///
/// ```
/// use holons_core::value::{properties, BaseValue, PropertyName};
///
/// let map = properties([("title", "mybook")]);
/// assert_eq!(
///     map.get(&PropertyName::from("title")),
///     Some(&Some(BaseValue::StringValue("mybook".into())))
/// );
/// ```
pub fn properties<N, V, I>(pairs: I) -> PropertyMap
where
    I: IntoIterator<Item = (N, V)>,
    N: Into<PropertyName>,
    V: Into<BaseValue>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), Some(value.into())))
        .collect()
}

/// Extract the index key from a property map.
///
/// Only a present, non-null `StringValue` under [`KEY_PROPERTY`] yields a key.
pub fn key_of(property_map: &PropertyMap) -> Option<MapString> {
    match property_map.get(&PropertyName::from(KEY_PROPERTY)) {
        Some(Some(BaseValue::StringValue(s))) => Some(MapString(s.clone())),
        _ => None,
    }
}

/// Key a staged successor is indexed under on the server, `"{key}__{version}_staged"`.
pub fn versioned_key(base_key: &MapString, version: u64) -> MapString {
    MapString(format!("{}__{}_staged", base_key.0, version))
}
