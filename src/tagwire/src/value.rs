use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};

use indexmap::IndexMap;

/// The attribute bag attached to a single tag occurrence, in declaration order.
pub type Attributes = IndexMap<String, Scalar>;

/// A scalar value usable as a tag attribute, a container parameter or a
/// literal call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Reads the scalar as a number. Numbers are returned as is and strings
    /// holding a finite decimal number are parsed; anything else yields `None`.
    pub fn to_numeric(&self) -> Option<Scalar> {
        match self {
            Self::Int(_) | Self::Float(_) => Some(self.clone()),
            Self::String(s) => {
                let s = s.trim();
                s.parse::<i64>().map(Self::Int).ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|x| x.is_finite())
                        .map(Self::Float)
                })
            }
            Self::Bool(_) => None,
        }
    }

    /// Compares two numeric scalars by value. Integers and floats compare with
    /// each other; `None` is returned if either side is not numeric.
    pub fn numeric_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => Some((*a as f64).total_cmp(b)),
            (Self::Float(a), Self::Int(b)) => Some(a.total_cmp(&(*b as f64))),
            (Self::Float(a), Self::Float(b)) => Some(a.total_cmp(b)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Builds an [`Attributes`] bag from `key => value` pairs.
///
/// ```rust
/// # use tagwire::attributes;
/// let attrs = attributes! { "key" => "orange", "priority" => -1 };
/// assert_eq!(attrs.len(), 2);
/// ```
#[macro_export]
macro_rules! attributes {
    () => {
        $crate::value::Attributes::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut attrs = $crate::value::Attributes::new();
        $(attrs.insert(::std::string::String::from($key), $crate::value::Scalar::from($value));)+
        attrs
    }};
}
