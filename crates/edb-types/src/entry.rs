//! Typed entry values.
//!
//! An entry is one `key -> value` attribute of an object version. The value
//! carries its own type tag, so queries can coerce predicate text into the
//! stored type without consulting any external type registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::oid::Oid;

/// Type tag of an [`EntryValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    String,
    Integer,
    Float,
    Boolean,
    /// Pointer to another object by OID.
    Reference,
    /// A composite value encoded as JSON text.
    Composite,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Reference => "reference",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "reference" => Ok(Self::Reference),
            "composite" => Ok(Self::Composite),
            other => Err(TypeError::UnknownEntryType(other.to_string())),
        }
    }
}

/// The value of one entry together with its type.
///
/// Equality is reflexive: two `Float(NaN)` values are equal, so an object
/// always equals itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EntryValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Reference(Oid),
    /// JSON-encoded composite (list, map, nested model).
    Composite(String),
}

impl EntryValue {
    /// Encode any serializable value as a composite entry.
    pub fn composite<T: Serialize>(value: &T) -> Result<Self, TypeError> {
        serde_json::to_string(value)
            .map(Self::Composite)
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn type_tag(&self) -> EntryType {
        match self {
            Self::String(_) => EntryType::String,
            Self::Integer(_) => EntryType::Integer,
            Self::Float(_) => EntryType::Float,
            Self::Boolean(_) => EntryType::Boolean,
            Self::Reference(_) => EntryType::Reference,
            Self::Composite(_) => EntryType::Composite,
        }
    }

    /// Canonical text form, the inverse of [`EntryValue::parse_as`].
    pub fn render(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Reference(oid) => oid.to_string(),
            Self::Composite(json) => json.clone(),
        }
    }

    /// Interpret `text` as a value of type `ty`.
    pub fn parse_as(ty: EntryType, text: &str) -> Result<Self, TypeError> {
        let coercion = || TypeError::Coercion {
            text: text.to_string(),
            expected: ty.to_string(),
        };
        match ty {
            EntryType::String => Ok(Self::String(text.to_string())),
            EntryType::Integer => text.trim().parse().map(Self::Integer).map_err(|_| coercion()),
            EntryType::Float => text.trim().parse().map(Self::Float).map_err(|_| coercion()),
            EntryType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                _ => Err(coercion()),
            },
            EntryType::Reference => Oid::new(text).map(Self::Reference).map_err(|_| coercion()),
            EntryType::Composite => {
                let parsed: serde_json::Value =
                    serde_json::from_str(text).map_err(|_| coercion())?;
                Ok(Self::Composite(parsed.to_string()))
            }
        }
    }

    /// Infer the most specific scalar type for untyped text.
    ///
    /// Integers, floats and booleans are recognised; everything else stays a
    /// string.
    pub fn infer(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(f);
            }
        }
        match text {
            "true" => Self::Boolean(true),
            "false" => Self::Boolean(false),
            _ => Self::String(text.to_string()),
        }
    }

    /// Type-aware equality used by queries.
    ///
    /// `self` is the stored value. Equal variants compare directly; otherwise
    /// the predicate's text form is coerced into the stored type.
    pub fn matches(&self, predicate: &EntryValue) -> bool {
        if self.type_tag() == predicate.type_tag() {
            return match (self, predicate) {
                (Self::Composite(a), Self::Composite(b)) => same_json(a, b),
                _ => self == predicate,
            };
        }
        match Self::parse_as(self.type_tag(), &predicate.render()) {
            Ok(Self::Composite(coerced)) => match self {
                Self::Composite(stored) => same_json(stored, &coerced),
                _ => false,
            },
            Ok(coerced) => *self == coerced,
            Err(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Reference(oid) => Some(oid.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

fn same_json(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl PartialEq for EntryValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Reference(a), Self::Reference(b)) => a == b,
            (Self::Composite(a), Self::Composite(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for EntryValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EntryValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for EntryValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for EntryValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for EntryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for EntryValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Oid> for EntryValue {
    fn from(value: Oid) -> Self {
        Self::Reference(value)
    }
}
