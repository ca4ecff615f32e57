use std::error::Error;
use std::sync::Arc;

use crate::compiler::{CompilerPass, CompilerPassProvider};
use crate::configurator::{Configurator, ConfiguratorLoader};
use crate::container::ContainerBuilder;

/// Applies several configurators in registration order and gathers their
/// compiler passes.
#[derive(Default)]
pub struct CompositeConfigurator {
    configurators: Vec<Box<dyn Configurator>>,
}

impl CompositeConfigurator {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with<C: Configurator>(mut self, configurator: C) -> Self {
        self.register_configurator(configurator);
        self
    }

    pub fn register_configurator<C: Configurator>(&mut self, configurator: C) {
        self.configurators.push(Box::new(configurator));
    }

    pub fn compose(mut self, mut other: CompositeConfigurator) -> Self {
        self.configurators.append(&mut other.configurators);
        self
    }

    pub fn len(&self) -> usize {
        self.configurators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurators.is_empty()
    }
}

impl Configurator for CompositeConfigurator {
    fn load(&self, builder: &mut ContainerBuilder) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut loader = ConfiguratorLoader::new(builder);
        for configurator in &self.configurators {
            loader.load(&**configurator)?;
        }
        Ok(())
    }

    fn as_pass_provider(&self) -> Option<&dyn CompilerPassProvider> {
        Some(self)
    }
}

impl CompilerPassProvider for CompositeConfigurator {
    fn compiler_passes(&self) -> Vec<Arc<dyn CompilerPass>> {
        self.configurators
            .iter()
            .filter_map(|configurator| configurator.as_pass_provider())
            .flat_map(|provider| provider.compiler_passes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use crate::compiler::MockCompilerPass;
    use crate::container::DefinitionRegistry;
    use crate::definition::Definition;

    use super::*;

    struct Recording {
        id: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Configurator for Recording {
        fn load(&self, builder: &mut ContainerBuilder) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.log.lock().push(self.id);
            builder.set_definition(self.id, Definition::new());
            Ok(())
        }
    }

    struct DependsOn {
        id: &'static str,
        dependency: &'static str,
    }

    impl Configurator for DependsOn {
        fn load(&self, builder: &mut ContainerBuilder) -> Result<(), Box<dyn Error + Send + Sync>> {
            if !builder.has_definition(self.dependency) {
                return Err(format!("{} needs {}", self.id, self.dependency).into());
            }
            builder.set_definition(self.id, Definition::new());
            Ok(())
        }
    }

    struct WithPasses {
        passes: Vec<Arc<dyn CompilerPass>>,
    }

    impl Configurator for WithPasses {
        fn load(&self, _builder: &mut ContainerBuilder) -> Result<(), Box<dyn Error + Send + Sync>> {
            Ok(())
        }

        fn as_pass_provider(&self) -> Option<&dyn CompilerPassProvider> {
            Some(self)
        }
    }

    impl CompilerPassProvider for WithPasses {
        fn compiler_passes(&self) -> Vec<Arc<dyn CompilerPass>> {
            self.passes.clone()
        }
    }

    fn pass() -> Arc<dyn CompilerPass> {
        Arc::new(MockCompilerPass::new())
    }

    #[test]
    fn composite_configurator_load_applies_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let composite = CompositeConfigurator::new()
            .with(Recording {
                id: "first",
                log: Arc::clone(&log),
            })
            .with(DependsOn {
                id: "second",
                dependency: "first",
            })
            .compose(CompositeConfigurator::new().with(Recording {
                id: "third",
                log: Arc::clone(&log),
            }));
        assert_eq!(composite.len(), 3);

        let mut builder = ContainerBuilder::new();
        composite.load(&mut builder).unwrap();

        assert_eq!(*log.lock(), ["first", "third"]);
        let ids: Vec<_> = builder.definition_ids().collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn composite_configurator_load_fails_when_a_constituent_fails() {
        let composite = CompositeConfigurator::new().with(DependsOn {
            id: "second",
            dependency: "first",
        });

        let mut builder = ContainerBuilder::new();
        let err = composite.load(&mut builder).unwrap_err();
        assert!(err.to_string().contains("DependsOn"));
        assert!(!builder.has_definition("second"));
    }

    #[test]
    fn composite_configurator_compiler_passes_concatenates_in_order() {
        let (a, b, c) = (pass(), pass(), pass());
        let mut composite = CompositeConfigurator::new()
            .with(WithPasses {
                passes: vec![Arc::clone(&a), Arc::clone(&b)],
            })
            .with(DependsOn {
                id: "plain",
                dependency: "none",
            });
        composite.register_configurator(WithPasses {
            passes: vec![Arc::clone(&c), Arc::clone(&a)],
        });

        let passes = composite.compiler_passes();
        assert_eq!(passes.len(), 4);
        for (actual, expected) in passes.iter().zip([&a, &b, &c, &a]) {
            assert!(Arc::ptr_eq(actual, expected));
        }
    }

    #[test]
    fn composite_configurator_nested_passes_are_visible() {
        let inner = CompositeConfigurator::new().with(WithPasses {
            passes: vec![pass()],
        });
        let outer = CompositeConfigurator::new().with(inner);

        assert!(CompositeConfigurator::new().is_empty());
        assert_eq!(
            outer.as_pass_provider().unwrap().compiler_passes().len(),
            1
        );
    }
}
