use std::error::Error;

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(super)))]
pub enum ContainerError {
    #[snafu(display("could not find the service {id}"))]
    #[non_exhaustive]
    NotFound { id: String },
    #[snafu(display("the service {id} is private and cannot be fetched from the container"))]
    #[non_exhaustive]
    NotPublic { id: String },
    #[snafu(display("could not construct the service {id} which depends on itself somehow"))]
    #[non_exhaustive]
    CyclicDependency { id: String },
    #[snafu(display("the service {id} requires the undefined parameter {name}"))]
    #[non_exhaustive]
    MissingParameter { id: String, name: String },
    #[snafu(display("the service {id} has no factory and cannot be instantiated"))]
    #[non_exhaustive]
    MissingFactory { id: String },
    #[snafu(display("the lazy service {id} outlived its container"))]
    #[non_exhaustive]
    Released { id: String },
    #[snafu(display("could not construct the service {id}"))]
    #[non_exhaustive]
    Construction {
        id: String,
        source: Box<dyn Error + Send + Sync>,
    },
    #[snafu(display("could not call {method} on the service {id}"))]
    #[non_exhaustive]
    MethodCall {
        id: String,
        method: String,
        source: Box<dyn Error + Send + Sync>,
    },
}
