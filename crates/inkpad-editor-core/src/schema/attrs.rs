//! Attribute values and their declarations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, ToSmolStr};

/// Resolved attribute bag of a node or mark.
///
/// Ordered so that equality, hashing and HTML emission are deterministic.
pub type Attrs = BTreeMap<SmolStr, AttrValue>;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(SmolStr),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string form used when emitting HTML. `Null` has none.
    pub fn to_html_value(&self) -> Option<SmolStr> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(if *b { "true".into() } else { "false".into() }),
            Self::Int(i) => Some(i.to_smolstr()),
            Self::Str(s) => Some(s.clone()),
        }
    }

    /// Whether this value is acceptable for an attribute of type `ty`.
    pub fn fits(&self, ty: AttrType) -> bool {
        matches!(
            (self, ty),
            (Self::Bool(_), AttrType::Bool) | (Self::Int(_), AttrType::Int) | (Self::Str(_), AttrType::Str)
        )
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u8> for AttrValue {
    fn from(value: u8) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<SmolStr> for AttrValue {
    fn from(value: SmolStr) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrType {
    Bool,
    Int,
    Str,
}

impl AttrType {
    /// Parse an HTML attribute string into a value of this type. Strings
    /// are kept verbatim; numbers and flags ignore surrounding whitespace.
    pub fn parse(self, raw: &str) -> Option<AttrValue> {
        match self {
            Self::Str => Some(AttrValue::Str(raw.into())),
            Self::Int => raw.trim().parse::<i64>().ok().map(AttrValue::Int),
            Self::Bool => match raw.trim() {
                "true" | "" | "checked" | "open" => Some(AttrValue::Bool(true)),
                "false" => Some(AttrValue::Bool(false)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "string",
        })
    }
}

/// Declaration of one attribute on a node or mark kind.
///
/// `default: None` makes the attribute required. A `Null` default makes it
/// nullable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: SmolStr,
    pub ty: AttrType,
    pub default: Option<AttrValue>,
    /// Inclusive bounds for `Int` attributes.
    pub range: Option<(i64, i64)>,
}

impl AttrSpec {
    pub fn required(name: impl Into<SmolStr>, ty: AttrType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            range: None,
        }
    }

    pub fn optional(name: impl Into<SmolStr>, ty: AttrType, default: impl Into<AttrValue>) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default.into()),
            range: None,
        }
    }

    pub fn nullable(name: impl Into<SmolStr>, ty: AttrType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(AttrValue::Null),
            range: None,
        }
    }

    /// Restrict an `Int` attribute to `min..=max`.
    pub fn within(mut self, min: i64, max: i64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn accepts(&self, value: &AttrValue) -> bool {
        value.fits(self.ty) || (value.is_null() && self.default == Some(AttrValue::Null))
    }

    /// Whether `value` lies inside the declared bounds, if any.
    pub fn in_range(&self, value: &AttrValue) -> bool {
        match (self.range, value) {
            (Some((min, max)), AttrValue::Int(n)) => (min..=max).contains(n),
            _ => true,
        }
    }
}

/// Build an [`Attrs`] bag from `key => value` pairs.
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attrs::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut attrs = $crate::Attrs::new();
        $(
            attrs.insert($crate::SmolStr::from($key), $crate::AttrValue::from($value));
        )+
        attrs
    }};
}
