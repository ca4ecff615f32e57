mod argument;

use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::container::service::{Resolved, Service};
use crate::value::Attributes;

pub use argument::{Argument, MethodCall, Reference};

/// Constructs a service instance from its resolved constructor arguments.
pub type Factory =
    Arc<dyn Fn(Vec<Resolved>) -> Result<Box<dyn Service>, Box<dyn Error + Send + Sync>> + Send + Sync>;

/// A named annotation on a definition, carrying its own attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    name: String,
    attributes: Attributes,
}

impl Tag {
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Describes how the container builds one service: the factory, its
/// constructor arguments, the method calls replayed on the fresh instance,
/// the tags used for discovery, and the visibility and laziness flags.
///
/// Definitions are private and eager unless told otherwise.
#[derive(Clone)]
pub struct Definition {
    type_name: Option<&'static str>,
    factory: Option<Factory>,
    arguments: Vec<Argument>,
    calls: Vec<MethodCall>,
    tags: Vec<Tag>,
    public: bool,
    lazy: bool,
}

impl Definition {
    /// Creates a definition without a factory. Such a definition can still be
    /// tagged and wired, but resolving it at runtime fails.
    pub fn new() -> Self {
        Self {
            type_name: None,
            factory: None,
            arguments: Vec::new(),
            calls: Vec::new(),
            tags: Vec::new(),
            public: false,
            lazy: false,
        }
    }

    /// Creates a definition whose service is built by `T::default()`.
    pub fn of<T>() -> Self
    where
        T: Service + Default,
    {
        let mut definition = Self::from_factory(|_| Ok(Box::new(T::default())));
        definition.type_name = Some(std::any::type_name::<T>());
        definition
    }

    pub fn from_factory<F>(factory: F) -> Self
    where
        F: Fn(Vec<Resolved>) -> Result<Box<dyn Service>, Box<dyn Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            factory: Some(Arc::new(factory)),
            ..Self::new()
        }
    }

    pub fn with_argument(mut self, argument: impl Into<Argument>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, attributes: Attributes) -> Self {
        self.add_tag(name, attributes);
        self
    }

    pub fn with_method_call(mut self, method: impl Into<String>, arguments: Vec<Argument>) -> Self {
        self.add_method_call(method, arguments);
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn add_tag(&mut self, name: impl Into<String>, attributes: Attributes) -> &mut Self {
        self.tags.push(Tag::new(name, attributes));
        self
    }

    pub fn add_method_call(
        &mut self,
        method: impl Into<String>,
        arguments: Vec<Argument>,
    ) -> &mut Self {
        self.calls.push(MethodCall::new(method, arguments));
        self
    }

    pub fn set_public(&mut self, public: bool) -> &mut Self {
        self.public = public;
        self
    }

    pub fn set_lazy(&mut self, lazy: bool) -> &mut Self {
        self.lazy = lazy;
        self
    }

    pub fn type_name(&self) -> Option<&'static str> {
        self.type_name
    }

    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn method_calls(&self) -> &[MethodCall] {
        &self.calls
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Returns the attribute bags of every occurrence of the tag `name`, in
    /// declaration order.
    pub fn tag_occurrences<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Attributes> {
        self.tags
            .iter()
            .filter(move |tag| tag.name == name)
            .map(Tag::attributes)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.name == name)
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }
}

impl Default for Definition {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Definition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Definition")
            .field("type_name", &self.type_name)
            .field("factory", &self.factory.as_ref().map(|_| ".."))
            .field("arguments", &self.arguments)
            .field("calls", &self.calls)
            .field("tags", &self.tags)
            .field("public", &self.public)
            .field("lazy", &self.lazy)
            .finish()
    }
}
