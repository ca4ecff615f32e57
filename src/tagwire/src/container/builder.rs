use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use indexmap::IndexMap;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::compiler::{
    AlreadyCompiledSnafu, CompilerPass, ConfigurationError, NoSuchServiceSnafu,
};
use crate::container::handle::Container;
use crate::definition::{Argument, Definition};
use crate::value::{Attributes, Scalar};

/// The subset of a builder a compiler pass needs to discover and rewrite
/// definitions.
pub trait DefinitionRegistry {
    fn has_definition(&self, id: &str) -> bool;

    fn definition(&self, id: &str) -> Option<&Definition>;

    fn definition_mut(&mut self, id: &str) -> Option<&mut Definition>;

    /// Returns, for every definition carrying `tag` and in definition order,
    /// the attribute bags of its occurrences in declaration order.
    fn find_tagged_definitions(&self, tag: &str) -> IndexMap<String, Vec<Attributes>>;

    fn get_definition(&mut self, id: &str) -> Result<&mut Definition, ConfigurationError> {
        self.definition_mut(id).context(NoSuchServiceSnafu { id })
    }
}

/// Collects definitions, parameters and compiler passes, then compiles them
/// into something a [`Container`] can be built from.
#[derive(Default)]
pub struct ContainerBuilder {
    definitions: IndexMap<String, Definition>,
    parameters: IndexMap<String, Scalar>,
    passes: Vec<Arc<dyn CompilerPass>>,
    compiled: bool,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition` under `id`, replacing any previous definition
    /// with the same id while keeping its position.
    pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) -> &mut Self {
        self.definitions.insert(id.into(), definition);
        self
    }

    pub fn add_definitions<I, K>(&mut self, definitions: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Definition)>,
        K: Into<String>,
    {
        for (id, definition) in definitions {
            self.set_definition(id, definition);
        }
        self
    }

    pub fn remove_definition(&mut self, id: &str) -> Option<Definition> {
        self.definitions.shift_remove(id)
    }

    pub fn definition_ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Overlays `parameters` onto the current parameters.
    pub fn add_parameters<I, K, V>(&mut self, parameters: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        for (name, value) in parameters {
            self.set_parameter(name, value);
        }
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Scalar> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> &IndexMap<String, Scalar> {
        &self.parameters
    }

    pub fn add_compiler_pass(&mut self, pass: Arc<dyn CompilerPass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn compiler_passes(&self) -> &[Arc<dyn CompilerPass>] {
        &self.passes
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Runs every registered compiler pass in registration order, then checks
    /// that all references and parameters used by the definitions exist.
    ///
    /// On failure the definitions and parameters are rolled back to their
    /// state before the first pass, so a later `compile` starts clean.
    pub fn compile(&mut self) -> Result<(), ConfigurationError> {
        ensure!(!self.compiled, AlreadyCompiledSnafu);

        let definitions = self.definitions.clone();
        let parameters = self.parameters.clone();
        if let Err(err) = self.run_passes() {
            debug!(error = %err, "compilation failed, rolling back");
            self.definitions = definitions;
            self.parameters = parameters;
            return Err(err);
        }

        self.compiled = true;
        info!(
            definitions = self.definitions.len(),
            passes = self.passes.len(),
            "compiled container builder"
        );
        Ok(())
    }

    /// Snapshots the current definitions and parameters into a runtime
    /// container.
    pub fn build(&self) -> Container {
        Container::new(self.definitions.clone(), self.parameters.clone())
    }

    fn run_passes(&mut self) -> Result<(), ConfigurationError> {
        let passes = self.passes.clone();
        for (index, pass) in passes.iter().enumerate() {
            debug!(pass = index, "running compiler pass");
            pass.process(self)?;
        }
        self.check_references()
    }

    fn check_references(&self) -> Result<(), ConfigurationError> {
        for (id, definition) in &self.definitions {
            let arguments = definition
                .arguments()
                .iter()
                .chain(definition.method_calls().iter().flat_map(|call| call.arguments()));
            for argument in arguments {
                match argument {
                    Argument::Reference(reference) if !self.has_definition(reference.id()) => {
                        return Err(ConfigurationError::InvalidReference {
                            service_id: id.clone(),
                            reference: reference.id().to_owned(),
                        });
                    }
                    Argument::Parameter(name) if !self.parameters.contains_key(name) => {
                        return Err(ConfigurationError::MissingParameter {
                            service_id: id.clone(),
                            name: name.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl Debug for ContainerBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ContainerBuilder")
            .field("definitions", &self.definitions)
            .field("parameters", &self.parameters)
            .field("passes", &self.passes.len())
            .field("compiled", &self.compiled)
            .finish()
    }
}

impl DefinitionRegistry for ContainerBuilder {
    fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    fn definition_mut(&mut self, id: &str) -> Option<&mut Definition> {
        self.definitions.get_mut(id)
    }

    fn find_tagged_definitions(&self, tag: &str) -> IndexMap<String, Vec<Attributes>> {
        self.definitions
            .iter()
            .filter(|(_, definition)| definition.has_tag(tag))
            .map(|(id, definition)| {
                let occurrences = definition.tag_occurrences(tag).cloned().collect();
                (id.clone(), occurrences)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use crate::attributes;
    use crate::compiler::{MockCompilerPass, TaggedCollectorPass};

    use super::*;

    #[test]
    fn container_builder_find_tagged_definitions_keeps_order() {
        let mut builder = ContainerBuilder::new();
        builder
            .set_definition(
                "pear",
                Definition::new()
                    .with_tag("fruit", attributes! { "key" => "pear" })
                    .with_tag("fruit", attributes! { "key" => "apple" }),
            )
            .set_definition("leek", Definition::new().with_tag("vegetable", attributes! {}))
            .set_definition(
                "orange",
                Definition::new().with_tag("fruit", attributes! { "key" => "orange" }),
            );

        let tagged = builder.find_tagged_definitions("fruit");
        let ids: Vec<_> = tagged.keys().map(String::as_str).collect();
        assert_eq!(ids, ["pear", "orange"]);
        assert_eq!(tagged["pear"].len(), 2);
        assert_eq!(tagged["pear"][1]["key"], Scalar::from("apple"));
        assert!(builder.find_tagged_definitions("mineral").is_empty());
    }

    #[test]
    fn container_builder_get_definition_fails_when_missing() {
        let mut builder = ContainerBuilder::new();
        let err = builder.get_definition("collector").unwrap_err();
        assert_eq!(err.to_string(), "no such service: collector");
    }

    #[test]
    fn container_builder_add_parameters_overlays_existing_values() {
        let mut builder = ContainerBuilder::new();
        builder
            .set_parameter("locale", "en")
            .set_parameter("debug", false);
        builder.add_parameters([("locale", Scalar::from("lt")), ("retries", Scalar::from(3))]);

        assert_eq!(builder.parameter("locale"), Some(&Scalar::from("lt")));
        assert_eq!(builder.parameter("debug"), Some(&Scalar::Bool(false)));
        assert_eq!(builder.parameter("retries"), Some(&Scalar::Int(3)));
    }

    #[test]
    fn container_builder_compile_runs_passes_in_order() {
        let mut seq = Sequence::new();
        let mut first = MockCompilerPass::new();
        first
            .expect_process()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|builder| {
                builder.set_definition("added", Definition::new());
                Ok(())
            });
        let mut second = MockCompilerPass::new();
        second
            .expect_process()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|builder| {
                assert!(builder.has_definition("added"));
                Ok(())
            });

        let mut builder = ContainerBuilder::new();
        builder
            .add_compiler_pass(Arc::new(first))
            .add_compiler_pass(Arc::new(second));
        builder.compile().unwrap();
        assert!(builder.is_compiled());
    }

    #[test]
    fn container_builder_compile_fails_when_called_twice() {
        let mut builder = ContainerBuilder::new();
        builder.compile().unwrap();
        assert!(matches!(
            builder.compile(),
            Err(ConfigurationError::AlreadyCompiled)
        ));
    }

    #[test]
    fn container_builder_compile_fails_on_dangling_reference() {
        let mut builder = ContainerBuilder::new();
        builder.set_definition(
            "collector",
            Definition::new().with_method_call("addFruit", vec![Argument::reference("ghost")]),
        );

        let err = builder.compile().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidReference { ref reference, .. } if reference == "ghost"
        ));
        assert!(!builder.is_compiled());
    }

    #[test]
    fn container_builder_compile_fails_on_unknown_parameter() {
        let mut builder = ContainerBuilder::new();
        builder.set_definition(
            "mailer",
            Definition::new().with_argument(Argument::parameter("mailer.host")),
        );

        assert!(matches!(
            builder.compile(),
            Err(ConfigurationError::MissingParameter { .. })
        ));

        builder.set_parameter("mailer.host", "localhost");
        builder.compile().unwrap();
    }

    #[test]
    fn container_builder_compile_rolls_back_when_a_pass_fails() {
        let mut builder = ContainerBuilder::new();
        builder
            .set_definition("collector", Definition::new())
            .set_definition(
                "orange",
                Definition::new().with_tag("fruit", attributes! { "key" => "orange" }),
            )
            .set_parameter("locale", "en");

        let mut flaky = MockCompilerPass::new();
        let mut failed = false;
        flaky.expect_process().times(2).returning(move |builder| {
            builder.set_parameter("locale", "lt");
            if failed {
                return Ok(());
            }
            failed = true;
            Err(ConfigurationError::NoSuchService {
                id: String::from("mailer"),
            })
        });
        TaggedCollectorPass::builder("collector", "fruit", "addFruit")
            .required("key")
            .register_on(&mut builder);
        builder.add_compiler_pass(Arc::new(flaky));

        assert!(builder.compile().is_err());
        assert!(!builder.is_compiled());
        assert!(builder.definition("collector").unwrap().method_calls().is_empty());
        assert_eq!(builder.parameter("locale"), Some(&Scalar::from("en")));

        builder.compile().unwrap();
        assert_eq!(builder.definition("collector").unwrap().method_calls().len(), 1);
        assert_eq!(builder.parameter("locale"), Some(&Scalar::from("lt")));
    }

    #[test]
    fn container_builder_remove_definition_keeps_remaining_order() {
        let mut builder = ContainerBuilder::new();
        builder
            .set_definition("orange", Definition::new())
            .set_definition("pear", Definition::new().public())
            .set_definition("kiwi", Definition::new());

        let removed = builder.remove_definition("pear").unwrap();
        assert!(removed.is_public());
        assert!(builder.remove_definition("pear").is_none());

        let ids: Vec<_> = builder.definition_ids().collect();
        assert_eq!(ids, ["orange", "kiwi"]);
        assert!(!builder.has_definition("pear"));
        assert!(format!("{builder:?}").contains("ContainerBuilder"));
    }
}
