pub mod compiler;
pub mod configurator;
pub mod container;
pub mod definition;
pub mod value;
mod util;

pub use util::any::{AsAny, DowncastMut, DowncastRef};

pub mod prelude {
    pub use crate::attributes;
    pub use crate::compiler::{
        CallMode, CompilerPass, CompilerPassProvider, ConfigurationError, ParameterSpec,
        TaggedCollectorPass,
    };
    pub use crate::configurator::{
        create_container, CompositeConfigurator, Configurator, ConfiguratorLoader,
        DefinitionsConfigurator, LoaderError, Resource,
    };
    pub use crate::container::{
        Container, ContainerBuilder, ContainerError, DefinitionRegistry, LazyService, Resolved,
        Service, ServiceCallError,
    };
    pub use crate::definition::{Argument, Definition, MethodCall, Reference};
    pub use crate::value::{Attributes, Scalar};
    pub use crate::{AsAny, DowncastRef};
}
