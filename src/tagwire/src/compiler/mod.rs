pub mod tagged;

use std::sync::Arc;

use snafu::prelude::*;

use crate::container::ContainerBuilder;

pub use tagged::{
    CallMode, CollectorPassConfig, ParameterSpec, TaggedCollectorPass, TaggedCollectorPassBuilder,
    TaggedServiceEntry,
};

/// A build-time hook that inspects and rewrites the definitions of a
/// [`ContainerBuilder`] before it is compiled.
#[cfg_attr(test, mockall::automock)]
pub trait CompilerPass: Send + Sync {
    fn process(&self, builder: &mut ContainerBuilder) -> Result<(), ConfigurationError>;
}

/// Something that contributes compiler passes, typically a configurator
/// which also needs definitions wired after loading.
pub trait CompilerPassProvider {
    fn compiler_passes(&self) -> Vec<Arc<dyn CompilerPass>>;
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum ConfigurationError {
    #[snafu(display("no such service: {id}"))]
    #[non_exhaustive]
    NoSuchService { id: String },
    #[snafu(display(
        "some required attributes are missing in service {service_id} tag {tag} definition"
    ))]
    #[non_exhaustive]
    MissingAttributes { service_id: String, tag: String },
    #[snafu(display(
        "priority attribute {attribute} in service {service_id} tag {tag} definition must be numeric, found {kind}"
    ))]
    #[non_exhaustive]
    InvalidPriority {
        service_id: String,
        tag: String,
        attribute: String,
        kind: &'static str,
    },
    #[snafu(display("service {service_id} references the undefined service {reference}"))]
    #[non_exhaustive]
    InvalidReference {
        service_id: String,
        reference: String,
    },
    #[snafu(display("service {service_id} requires the undefined parameter {name}"))]
    #[non_exhaustive]
    MissingParameter { service_id: String, name: String },
    #[snafu(display("the container builder has already been compiled"))]
    #[non_exhaustive]
    AlreadyCompiled,
}
