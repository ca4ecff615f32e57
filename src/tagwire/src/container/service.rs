use std::any;
use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{Arc, Weak};

use snafu::prelude::*;

use crate::container::context::ResolveTrace;
use crate::container::core::ContainerCore;
use crate::container::error::{ContainerError, ReleasedSnafu};
use crate::util::any::AsAny;
use crate::value::Scalar;

/// An object managed by a [`Container`].
///
/// Method calls registered on a definition, including the ones added by a
/// collector pass, are replayed through [`Service::call`] right after the
/// factory returns and before the instance is shared.
///
/// [`Container`]: crate::container::Container
pub trait Service: AsAny + Send + Sync {
    fn call(
        &mut self,
        method: &str,
        arguments: Vec<Resolved>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let _ = arguments;
        UnknownMethodSnafu {
            service: any::type_name::<Self>(),
            method,
        }
        .fail()
        .map_err(Into::into)
    }
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ServiceCallError {
    #[snafu(display("{service} has no method named {method}"))]
    #[non_exhaustive]
    UnknownMethod {
        service: &'static str,
        method: String,
    },
    #[snafu(display("{method} expects argument {index} to be {expected}"))]
    #[non_exhaustive]
    InvalidArgument {
        method: String,
        index: usize,
        expected: &'static str,
    },
}

/// A call argument after the container has resolved it.
#[derive(Clone)]
pub enum Resolved {
    Value(Scalar),
    Service(Arc<dyn Service>),
    /// A reference to a lazy definition, instantiated on first use.
    Lazy(LazyService),
}

impl Resolved {
    pub fn as_value(&self) -> Option<&Scalar> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Scalar> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Scalar::as_str)
    }

    /// Reads argument `index` of a call to `method` as a string.
    pub fn str_argument<'a>(
        arguments: &'a [Resolved],
        method: &str,
        index: usize,
    ) -> Result<&'a str, ServiceCallError> {
        arguments
            .get(index)
            .and_then(Resolved::as_str)
            .context(InvalidArgumentSnafu {
                method,
                index,
                expected: "a string",
            })
    }

    /// Reads argument `index` of a call to `method` as a service, going
    /// through the container for lazy ones.
    pub fn service_argument(
        arguments: &[Resolved],
        method: &str,
        index: usize,
    ) -> Result<Arc<dyn Service>, Box<dyn Error + Send + Sync>> {
        let argument = arguments.get(index).cloned().and_then(Resolved::into_service);
        let service = argument.context(InvalidArgumentSnafu {
            method,
            index,
            expected: "a service",
        })?;
        Ok(service?)
    }

    /// Returns the service behind this argument, instantiating a lazy one if
    /// needed. Plain values yield `None`.
    pub fn into_service(self) -> Option<Result<Arc<dyn Service>, ContainerError>> {
        match self {
            Self::Value(_) => None,
            Self::Service(service) => Some(Ok(service)),
            Self::Lazy(lazy) => Some(lazy.get()),
        }
    }
}

impl Debug for Resolved {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Service(service) => f.debug_tuple("Service").field(&(**service).type_name()).finish(),
            Self::Lazy(lazy) => f.debug_tuple("Lazy").field(lazy).finish(),
        }
    }
}

/// A handle to a lazy service. Holding it does not construct the service;
/// [`LazyService::get`] does, at most once per container.
#[derive(Clone)]
pub struct LazyService {
    id: String,
    core: Weak<ContainerCore>,
}

impl LazyService {
    pub(super) fn new(id: impl Into<String>, core: &Arc<ContainerCore>) -> Self {
        Self {
            id: id.into(),
            core: Arc::downgrade(core),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.is_instantiated(&self.id))
    }

    pub fn get(&self) -> Result<Arc<dyn Service>, ContainerError> {
        let core = self.core.upgrade().context(ReleasedSnafu { id: &self.id })?;
        core.resolve(&ResolveTrace::new(&self.id))
    }
}

impl Debug for LazyService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LazyService")
            .field("id", &self.id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::util::any::DowncastRef;

    use super::*;

    #[derive(Default)]
    struct Plain;

    impl Service for Plain {}

    #[test]
    fn service_call_fails_when_method_is_unknown() {
        let mut plain = Plain;
        let err = plain.call("addFruit", Vec::new()).unwrap_err();
        assert!(err.to_string().contains("has no method named addFruit"));
    }

    #[test]
    fn resolved_accessors_succeed() {
        let value = Resolved::Value(Scalar::from("orange"));
        assert_eq!(value.as_str(), Some("orange"));
        assert!(value.clone().into_service().is_none());
        assert_eq!(value.into_value(), Some(Scalar::from("orange")));

        let service = Resolved::Service(Arc::new(Plain));
        assert!(service.as_value().is_none());
        assert!(service.into_service().unwrap().is_ok());
    }

    #[test]
    fn resolved_str_argument_fails_when_argument_is_not_a_string() {
        let arguments = [
            Resolved::Service(Arc::new(Plain)),
            Resolved::Value(Scalar::from("orange")),
            Resolved::Value(Scalar::Int(3)),
        ];

        assert_eq!(Resolved::str_argument(&arguments, "addFruit", 1).unwrap(), "orange");
        assert!(Resolved::service_argument(&arguments, "addFruit", 0).unwrap().is::<Plain>());

        let err = Resolved::str_argument(&arguments, "addFruit", 2).unwrap_err();
        assert!(matches!(err, ServiceCallError::InvalidArgument { index: 2, .. }));
        assert_eq!(err.to_string(), "addFruit expects argument 2 to be a string");

        let Err(err) = Resolved::service_argument(&arguments, "addFruit", 1) else {
            panic!("a plain value is not a service");
        };
        assert_eq!(err.to_string(), "addFruit expects argument 1 to be a service");
        assert!(Resolved::str_argument(&arguments, "addFruit", 3).is_err());
    }
}
