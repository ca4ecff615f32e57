use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use snafu::prelude::*;
use tracing::trace;

use crate::container::context::ResolveTrace;
use crate::container::service::{LazyService, Resolved, Service};
use crate::container::error::{
    ConstructionSnafu, ContainerError, MethodCallSnafu, MissingFactorySnafu, MissingParameterSnafu,
};
use crate::definition::{Argument, Definition};
use crate::value::Scalar;

pub struct ContainerCore {
    definitions: IndexMap<String, Definition>,
    parameters: IndexMap<String, Scalar>,
    instances: RwLock<HashMap<String, Arc<dyn Service>>>,
    /// Services whose factory or method calls are running, per thread.
    constructing: Mutex<HashSet<(String, ThreadId)>>,
}

impl ContainerCore {
    pub fn new(definitions: IndexMap<String, Definition>, parameters: IndexMap<String, Scalar>) -> Self {
        Self {
            definitions,
            parameters,
            instances: RwLock::new(HashMap::new()),
            constructing: Mutex::new(HashSet::new()),
        }
    }

    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    pub fn parameter(&self, name: &str) -> Option<&Scalar> {
        self.parameters.get(name)
    }

    pub fn is_instantiated(&self, id: &str) -> bool {
        self.instances.read().contains_key(id)
    }

    pub fn resolve(self: &Arc<Self>, trace: &ResolveTrace) -> Result<Arc<dyn Service>, ContainerError> {
        let id = trace.id();
        if let Some(instance) = self.try_get_instantiated(id) {
            return Ok(instance);
        }
        let Some(definition) = self.definitions.get(id) else {
            return Err(ContainerError::NotFound { id: id.to_owned() });
        };

        if trace.previous_exist_id(id) {
            return Err(ContainerError::CyclicDependency { id: id.to_owned() });
        }
        // A lazy handle restarts the trace, so the trace alone misses cycles
        // closed while a dependent is still under construction.
        let Some(_construction) = Construction::begin(self, id) else {
            return Err(ContainerError::CyclicDependency { id: id.to_owned() });
        };

        let instance: Arc<dyn Service> = Arc::from(self.instantiate(definition, trace)?);

        // Another thread may have won the race; the first stored instance is
        // the one everybody shares.
        let mut instances = self.instances.write();
        let instance = instances.entry(id.to_owned()).or_insert(instance);
        Ok(Arc::clone(instance))
    }

    fn try_get_instantiated(&self, id: &str) -> Option<Arc<dyn Service>> {
        self.instances.read().get(id).map(Arc::clone)
    }

    fn instantiate(
        self: &Arc<Self>,
        definition: &Definition,
        trace: &ResolveTrace,
    ) -> Result<Box<dyn Service>, ContainerError> {
        let id = trace.id();
        let factory = definition
            .factory()
            .context(MissingFactorySnafu { id })?;

        let arguments = self.resolve_arguments(definition.arguments(), trace)?;
        let mut instance = (**factory)(arguments).context(ConstructionSnafu { id })?;
        trace!(service = id, type_name = (*instance).type_name(), "constructed service");

        for call in definition.method_calls() {
            let arguments = self.resolve_arguments(call.arguments(), trace)?;
            instance
                .call(call.method(), arguments)
                .context(MethodCallSnafu {
                    id,
                    method: call.method(),
                })?;
            trace!(service = id, %call, "replayed method call");
        }

        Ok(instance)
    }

    fn resolve_arguments(
        self: &Arc<Self>,
        arguments: &[Argument],
        trace: &ResolveTrace,
    ) -> Result<Vec<Resolved>, ContainerError> {
        arguments
            .iter()
            .map(|argument| self.resolve_argument(argument, trace))
            .collect()
    }

    fn resolve_argument(
        self: &Arc<Self>,
        argument: &Argument,
        trace: &ResolveTrace,
    ) -> Result<Resolved, ContainerError> {
        match argument {
            Argument::Value(value) => Ok(Resolved::Value(value.clone())),
            Argument::Parameter(name) => {
                let value = self.parameters.get(name).context(MissingParameterSnafu {
                    id: trace.id(),
                    name,
                })?;
                Ok(Resolved::Value(value.clone()))
            }
            Argument::Reference(reference) => {
                let id = reference.id();
                match self.definitions.get(id) {
                    Some(definition) if definition.is_lazy() => {
                        Ok(Resolved::Lazy(LazyService::new(id, self)))
                    }
                    _ => self.resolve(&trace.append(id)).map(Resolved::Service),
                }
            }
        }
    }
}

struct Construction<'a> {
    core: &'a ContainerCore,
    key: (String, ThreadId),
}

impl<'a> Construction<'a> {
    fn begin(core: &'a ContainerCore, id: &str) -> Option<Self> {
        let key = (id.to_owned(), thread::current().id());
        if !core.constructing.lock().insert(key.clone()) {
            return None;
        }
        Some(Self { core, key })
    }
}

impl Drop for Construction<'_> {
    fn drop(&mut self) {
        self.core.constructing.lock().remove(&self.key);
    }
}
