use std::error::Error;

use snafu::prelude::*;
use tracing::debug;

use crate::compiler::ConfigurationError;
use crate::configurator::{Configurator, Resource};
use crate::container::ContainerBuilder;
use crate::value::Scalar;

/// Applies configurators to one builder.
pub struct ConfiguratorLoader<'a> {
    builder: &'a mut ContainerBuilder,
}

impl<'a> ConfiguratorLoader<'a> {
    pub fn new(builder: &'a mut ContainerBuilder) -> Self {
        Self { builder }
    }

    pub fn supports<R>(&self, resource: &R) -> bool
    where
        R: Resource + ?Sized,
    {
        resource.as_configurator().is_some()
    }

    pub fn load<R>(&mut self, resource: &R) -> Result<(), LoaderError>
    where
        R: Resource + ?Sized,
    {
        let configurator = resource.as_configurator().context(InvalidArgumentSnafu)?;
        debug!(configurator = configurator.name(), "loading configurator");
        configurator
            .load(self.builder)
            .context(ConfiguratorSnafu {
                configurator: configurator.name(),
            })
    }
}

/// Builds and compiles a fresh [`ContainerBuilder`] from `configurator`.
///
/// Compiler passes exposed by the configurator are registered first, then the
/// configurator is loaded, `parameters` are overlaid onto the builder's
/// parameters and the builder is compiled.
pub fn create_container<C, I, K, V>(
    configurator: &C,
    parameters: I,
) -> Result<ContainerBuilder, LoaderError>
where
    C: Configurator,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Scalar>,
{
    let mut builder = ContainerBuilder::new();

    if let Some(provider) = configurator.as_pass_provider() {
        for pass in provider.compiler_passes() {
            builder.add_compiler_pass(pass);
        }
    }

    ConfiguratorLoader::new(&mut builder).load(configurator)?;
    builder.add_parameters(parameters);
    builder.compile().context(CompileSnafu)?;

    Ok(builder)
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum LoaderError {
    #[snafu(display("resource must be a configurator"))]
    #[non_exhaustive]
    InvalidArgument,
    #[snafu(display("configurator {configurator} fails to set up the container"))]
    #[non_exhaustive]
    Configurator {
        configurator: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
    #[snafu(display("could not compile the container"))]
    #[non_exhaustive]
    Compile { source: ConfigurationError },
}
