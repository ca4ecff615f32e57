use std::sync::Arc;

use indexmap::IndexMap;

use crate::container::context::ResolveTrace;
use crate::container::core::ContainerCore;
use crate::container::service::Service;
use crate::container::ContainerError;
use crate::definition::Definition;
use crate::value::Scalar;

/// The runtime side of a built container. Cloning is cheap and clones share
/// the same instances.
#[derive(Clone)]
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    pub(super) fn new(
        definitions: IndexMap<String, Definition>,
        parameters: IndexMap<String, Scalar>,
    ) -> Self {
        Self {
            core: Arc::new(ContainerCore::new(definitions, parameters)),
        }
    }

    /// Fetches a public service, constructing it and its dependencies on
    /// first access.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Service>, ContainerError> {
        match self.core.definition(id) {
            None => Err(ContainerError::NotFound { id: id.to_owned() }),
            Some(definition) if !definition.is_public() => {
                Err(ContainerError::NotPublic { id: id.to_owned() })
            }
            Some(_) => self.core.resolve(&ResolveTrace::new(id)),
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.core
            .definition(id)
            .is_some_and(Definition::is_public)
    }

    pub fn is_instantiated(&self, id: &str) -> bool {
        self.core.is_instantiated(id)
    }

    pub fn parameter(&self, name: &str) -> Option<&Scalar> {
        self.core.parameter(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::definition::Argument;
    use crate::util::any::DowncastRef;

    use super::*;

    #[derive(Default)]
    struct Greeter {
        greeting: String,
    }

    impl Service for Greeter {}

    fn container() -> Container {
        let mut definitions = IndexMap::new();
        definitions.insert(
            String::from("greeter"),
            Definition::from_factory(|arguments| {
                let greeting = arguments
                    .first()
                    .and_then(|argument| argument.as_str())
                    .unwrap_or_default()
                    .to_owned();
                Ok(Box::new(Greeter { greeting }))
            })
            .with_argument(Argument::parameter("greeting"))
            .public(),
        );
        definitions.insert(String::from("hidden"), Definition::of::<Greeter>());

        let mut parameters = IndexMap::new();
        parameters.insert(String::from("greeting"), Scalar::from("hello"));
        Container::new(definitions, parameters)
    }

    #[test]
    fn container_get_succeeds_when_service_is_public() {
        let container = container();
        assert!(container.has("greeter"));
        assert!(!container.is_instantiated("greeter"));

        let greeter = container.get("greeter").unwrap();
        assert_eq!(greeter.downcast_ref::<Greeter>().unwrap().greeting, "hello");
        assert!(container.is_instantiated("greeter"));
        assert_eq!(container.parameter("greeting"), Some(&Scalar::from("hello")));
    }

    #[test]
    fn container_get_fails_when_service_is_private_or_unknown() {
        let container = container();
        assert!(!container.has("hidden"));
        assert!(matches!(
            container.get("hidden"),
            Err(ContainerError::NotPublic { .. })
        ));
        assert!(matches!(
            container.get("missing"),
            Err(ContainerError::NotFound { .. })
        ));
    }
}
