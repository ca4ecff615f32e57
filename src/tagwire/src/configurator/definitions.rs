use std::error::Error;

use indexmap::IndexMap;
use tracing::debug;

use crate::configurator::Configurator;
use crate::container::ContainerBuilder;
use crate::definition::Definition;

/// Registers a fixed set of definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionsConfigurator {
    definitions: IndexMap<String, Definition>,
}

impl DefinitionsConfigurator {
    pub fn new<I, K>(definitions: I) -> Self
    where
        I: IntoIterator<Item = (K, Definition)>,
        K: Into<String>,
    {
        definitions.into_iter().collect()
    }

    pub fn with_definition(mut self, id: impl Into<String>, definition: Definition) -> Self {
        self.definitions.insert(id.into(), definition);
        self
    }

    pub fn definitions(&self) -> &IndexMap<String, Definition> {
        &self.definitions
    }
}

impl<K: Into<String>> FromIterator<(K, Definition)> for DefinitionsConfigurator {
    fn from_iter<T: IntoIterator<Item = (K, Definition)>>(iter: T) -> Self {
        Self {
            definitions: iter
                .into_iter()
                .map(|(id, definition)| (id.into(), definition))
                .collect(),
        }
    }
}

impl Configurator for DefinitionsConfigurator {
    fn load(&self, builder: &mut ContainerBuilder) -> Result<(), Box<dyn Error + Send + Sync>> {
        debug!(definitions = self.definitions.len(), "registering static definitions");
        builder.add_definitions(self.definitions.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::attributes;
    use crate::container::DefinitionRegistry;

    use super::*;

    #[test]
    fn definitions_configurator_load_registers_every_definition() {
        let configurator = DefinitionsConfigurator::new([
            ("collector", Definition::new().public()),
            (
                "orange",
                Definition::new().with_tag("fruit", attributes! { "key" => "orange" }),
            ),
        ])
        .with_definition("pear", Definition::new());

        let mut builder = ContainerBuilder::new();
        builder.set_definition("existing", Definition::new());
        configurator.load(&mut builder).unwrap();

        let ids: Vec<_> = builder.definition_ids().collect();
        assert_eq!(ids, ["existing", "collector", "orange", "pear"]);
        assert!(builder.definition("collector").unwrap().is_public());
        assert!(builder.definition("orange").unwrap().has_tag("fruit"));
    }

    #[test]
    fn definitions_configurator_load_can_be_repeated() {
        let configurator: DefinitionsConfigurator =
            [("orange", Definition::new())].into_iter().collect();

        let mut first = ContainerBuilder::new();
        let mut second = ContainerBuilder::new();
        configurator.load(&mut first).unwrap();
        configurator.load(&mut second).unwrap();

        assert!(first.has_definition("orange"));
        assert!(second.has_definition("orange"));
        assert_eq!(configurator.definitions().len(), 1);
    }
}
