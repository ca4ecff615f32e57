use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::value::Scalar;

/// A deferred reference to another definition, resolved by the container
/// when the service holding it is instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    id: String,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "@{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Scalar),
    Reference(Reference),
    /// Looked up in the container's parameters at instantiation time.
    Parameter(String),
}

impl Argument {
    pub fn reference(id: impl Into<String>) -> Self {
        Self::Reference(Reference::new(id))
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter(name.into())
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Scalar> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Reference(reference) => write!(f, "{reference}"),
            Self::Parameter(name) => write!(f, "%{name}%"),
        }
    }
}

impl From<Reference> for Argument {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

impl From<Scalar> for Argument {
    fn from(value: Scalar) -> Self {
        Self::Value(value)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Self::Value(Scalar::from(value))
                }
            }
        )+
    };
}

impl_from_value!(&str, String, i64, i32, f64, bool);

/// A method invocation replayed on a service right after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    method: String,
    arguments: Vec<Argument>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

impl Display for MethodCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}(", self.method)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{argument}")?;
        }
        write!(f, ")")
    }
}
