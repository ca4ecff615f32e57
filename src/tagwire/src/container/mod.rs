pub mod builder;
pub mod service;

mod context;
mod core;
mod error;
mod handle;

pub use builder::{ContainerBuilder, DefinitionRegistry};
pub use error::ContainerError;
pub use handle::Container;
pub use service::{LazyService, Resolved, Service, ServiceCallError};
