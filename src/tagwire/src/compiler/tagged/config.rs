use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use snafu::prelude::*;

use crate::compiler::tagged::TaggedCollectorPass;
use crate::container::ContainerBuilder;
use crate::value::Scalar;

/// The attribute read for ordering when priority is enabled without naming
/// one.
pub const DEFAULT_PRIORITY_ATTRIBUTE: &str = "priority";

/// How a tagged service is handed to the collector as the first argument of
/// every emitted call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CallMode {
    /// A deferred reference to the tagged service.
    #[default]
    Service,
    /// A deferred reference, with the tagged service marked lazy.
    LazyService,
    /// The raw service id, with the tagged service made public.
    Id,
}

impl CallMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::LazyService => "lazy_service",
            Self::Id => "id",
        }
    }
}

impl Display for CallMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CallMode {
    type Err = ParseCallModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(Self::Service),
            "lazy_service" => Ok(Self::LazyService),
            "id" => Ok(Self::Id),
            _ => UnknownCallModeSnafu { mode: s }.fail(),
        }
    }
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ParseCallModeError {
    #[snafu(display("unknown call mode {mode}, expected service, lazy_service or id"))]
    #[non_exhaustive]
    UnknownCallMode { mode: String },
}

/// One positional argument extracted from a tag's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    default: Option<Scalar>,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Scalar>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&Scalar> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl From<&str> for ParameterSpec {
    fn from(name: &str) -> Self {
        Self::required(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorPassConfig {
    target: String,
    tag: String,
    method: String,
    parameters: Vec<ParameterSpec>,
    call_mode: CallMode,
    priority_attribute: Option<String>,
}

impl CollectorPassConfig {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn call_mode(&self) -> CallMode {
        self.call_mode
    }

    pub fn priority_attribute(&self) -> Option<&str> {
        self.priority_attribute.as_deref()
    }
}

pub struct TaggedCollectorPassBuilder {
    config: CollectorPassConfig,
}

impl TaggedCollectorPassBuilder {
    pub(super) fn new(
        target: impl Into<String>,
        tag: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            config: CollectorPassConfig {
                target: target.into(),
                tag: tag.into(),
                method: method.into(),
                parameters: Vec::new(),
                call_mode: CallMode::default(),
                priority_attribute: None,
            },
        }
    }

    pub fn parameter(mut self, parameter: impl Into<ParameterSpec>) -> Self {
        self.config.parameters.push(parameter.into());
        self
    }

    pub fn parameters<I>(self, parameters: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ParameterSpec>,
    {
        parameters
            .into_iter()
            .fold(self, |builder, parameter| builder.parameter(parameter))
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.parameter(ParameterSpec::required(name))
    }

    pub fn optional(self, name: impl Into<String>, default: impl Into<Scalar>) -> Self {
        self.parameter(ParameterSpec::optional(name, default))
    }

    /// Orders tags by the `priority` attribute before emitting calls. Lower
    /// values are called earlier; tags without the attribute count as 0.
    pub fn enable_priority(self) -> Self {
        self.priority_attribute(DEFAULT_PRIORITY_ATTRIBUTE)
    }

    pub fn priority_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.config.priority_attribute = Some(attribute.into());
        self
    }

    pub fn call_mode(mut self, call_mode: CallMode) -> Self {
        self.config.call_mode = call_mode;
        self
    }

    pub fn build(self) -> TaggedCollectorPass {
        TaggedCollectorPass::new(self.config)
    }

    pub fn register_on(self, builder: &mut ContainerBuilder) {
        builder.add_compiler_pass(Arc::new(self.build()));
    }
}
