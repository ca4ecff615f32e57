mod composite;
mod definitions;
mod loader;

use std::any;
use std::error::Error;

use crate::compiler::CompilerPassProvider;
use crate::container::ContainerBuilder;

pub use composite::CompositeConfigurator;
pub use definitions::DefinitionsConfigurator;
pub use loader::{create_container, ConfiguratorLoader, LoaderError};

/// A unit of container configuration.
pub trait Configurator: 'static {
    fn load(&self, builder: &mut ContainerBuilder) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Exposes the compiler passes this configurator contributes, if any.
    fn as_pass_provider(&self) -> Option<&dyn CompilerPassProvider> {
        None
    }

    fn name(&self) -> &'static str {
        any::type_name::<Self>()
    }
}

impl<C: Configurator + ?Sized> Configurator for Box<C> {
    fn load(&self, builder: &mut ContainerBuilder) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).load(builder)
    }

    fn as_pass_provider(&self) -> Option<&dyn CompilerPassProvider> {
        (**self).as_pass_provider()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Anything a [`ConfiguratorLoader`] may be asked to load. Only configurators
/// are actually loadable.
pub trait Resource {
    fn as_configurator(&self) -> Option<&dyn Configurator> {
        None
    }
}

impl<C: Configurator> Resource for C {
    fn as_configurator(&self) -> Option<&dyn Configurator> {
        Some(self)
    }
}

impl Resource for dyn Configurator {
    fn as_configurator(&self) -> Option<&dyn Configurator> {
        Some(self)
    }
}
