mod config;

use std::cmp::Ordering;

use snafu::prelude::*;
use tracing::{debug, trace};

use crate::compiler::{
    CompilerPass, ConfigurationError, InvalidPrioritySnafu, MissingAttributesSnafu,
    NoSuchServiceSnafu,
};
use crate::container::{ContainerBuilder, DefinitionRegistry};
use crate::definition::Argument;
use crate::value::{Attributes, Scalar};

pub use config::{
    CallMode, CollectorPassConfig, ParameterSpec, ParseCallModeError, TaggedCollectorPassBuilder,
    DEFAULT_PRIORITY_ATTRIBUTE,
};

/// One occurrence of the collected tag on one definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedServiceEntry {
    service_id: String,
    attributes: Attributes,
}

impl TaggedServiceEntry {
    pub fn new(service_id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            service_id: service_id.into(),
            attributes,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Wires every service carrying a tag into a collector service.
///
/// For each occurrence of the tag, a call to the configured method is
/// appended to the collector definition. The first argument is the tagged
/// service (as a reference or as its id, see [`CallMode`]); the rest are
/// taken from the tag's attributes following the configured
/// [`ParameterSpec`]s.
///
/// # Examples
///
/// ```rust
/// # use tagwire::prelude::*;
/// let mut builder = ContainerBuilder::new();
/// builder
///     .set_definition("collector", Definition::new())
///     .set_definition(
///         "orange",
///         Definition::new().with_tag("fruit", attributes! { "key" => "orange" }),
///     );
///
/// TaggedCollectorPass::builder("collector", "fruit", "addFruit")
///     .required("key")
///     .optional("color", "yellow")
///     .build()
///     .process(&mut builder)
///     .unwrap();
///
/// let calls = builder.definition("collector").unwrap().method_calls();
/// assert_eq!(calls[0].to_string(), r#"addFruit(@orange, "orange", "yellow")"#);
/// ```
#[derive(Debug, Clone)]
pub struct TaggedCollectorPass {
    config: CollectorPassConfig,
}

impl TaggedCollectorPass {
    pub fn builder(
        target: impl Into<String>,
        tag: impl Into<String>,
        method: impl Into<String>,
    ) -> TaggedCollectorPassBuilder {
        TaggedCollectorPassBuilder::new(target, tag, method)
    }

    pub fn new(config: CollectorPassConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CollectorPassConfig {
        &self.config
    }

    /// Runs the pass against any definition registry.
    pub fn collect_into<R>(&self, registry: &mut R) -> Result<(), ConfigurationError>
    where
        R: DefinitionRegistry + ?Sized,
    {
        let target = self.config.target();
        ensure!(
            registry.has_definition(target),
            NoSuchServiceSnafu { id: target }
        );

        let entries = self.collect_entries(registry);
        let entries = self.prioritize(entries)?;
        debug!(
            tag = self.config.tag(),
            collector = target,
            entries = entries.len(),
            "collecting tagged services"
        );

        for entry in entries {
            let mut arguments = vec![self.service_argument(registry, entry.service_id())?];
            arguments.extend(self.additional_arguments(&entry)?);

            let collector = registry.get_definition(target)?;
            collector.add_method_call(self.config.method(), arguments);
            if let Some(call) = collector.method_calls().last() {
                trace!(service = entry.service_id(), %call, "wired tagged service");
            }
        }
        Ok(())
    }

    fn collect_entries<R>(&self, registry: &R) -> Vec<TaggedServiceEntry>
    where
        R: DefinitionRegistry + ?Sized,
    {
        registry
            .find_tagged_definitions(self.config.tag())
            .into_iter()
            .flat_map(|(service_id, occurrences)| {
                occurrences
                    .into_iter()
                    .map(move |attributes| TaggedServiceEntry::new(service_id.clone(), attributes))
            })
            .collect()
    }

    fn prioritize(
        &self,
        entries: Vec<TaggedServiceEntry>,
    ) -> Result<Vec<TaggedServiceEntry>, ConfigurationError> {
        let Some(attribute) = self.config.priority_attribute() else {
            return Ok(entries);
        };

        let mut prioritized = entries
            .into_iter()
            .map(|entry| {
                let priority = self.priority_of(&entry, attribute)?;
                Ok((priority, entry))
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        // `sort_by` is stable, so equal priorities keep discovery order.
        prioritized.sort_by(|(a, _), (b, _)| a.numeric_cmp(b).unwrap_or(Ordering::Equal));
        Ok(prioritized.into_iter().map(|(_, entry)| entry).collect())
    }

    fn priority_of(
        &self,
        entry: &TaggedServiceEntry,
        attribute: &str,
    ) -> Result<Scalar, ConfigurationError> {
        let Some(priority) = entry.attributes().get(attribute) else {
            return Ok(Scalar::Int(0));
        };
        priority.to_numeric().context(InvalidPrioritySnafu {
            service_id: entry.service_id(),
            tag: self.config.tag(),
            attribute,
            kind: priority.kind(),
        })
    }

    fn service_argument<R>(
        &self,
        registry: &mut R,
        service_id: &str,
    ) -> Result<Argument, ConfigurationError>
    where
        R: DefinitionRegistry + ?Sized,
    {
        match self.config.call_mode() {
            CallMode::Service => Ok(Argument::reference(service_id)),
            CallMode::LazyService => {
                registry.get_definition(service_id)?.set_lazy(true);
                Ok(Argument::reference(service_id))
            }
            CallMode::Id => {
                registry.get_definition(service_id)?.set_public(true);
                Ok(Argument::from(service_id))
            }
        }
    }

    /// Resolves the configured parameters against one tag occurrence. A
    /// parameter with neither attribute nor default is omitted, and no later
    /// parameter may then be given by an attribute.
    fn additional_arguments(
        &self,
        entry: &TaggedServiceEntry,
    ) -> Result<Vec<Argument>, ConfigurationError> {
        let mut only_optional = false;
        let mut arguments = Vec::with_capacity(self.config.parameters().len());

        for parameter in self.config.parameters() {
            let attribute = entry.attributes().get(parameter.name());
            ensure!(
                !(attribute.is_some() && only_optional),
                MissingAttributesSnafu {
                    service_id: entry.service_id(),
                    tag: self.config.tag(),
                }
            );

            match attribute.or(parameter.default_value()) {
                Some(value) => arguments.push(Argument::Value(value.clone())),
                None => only_optional = true,
            }
        }
        Ok(arguments)
    }
}

impl CompilerPass for TaggedCollectorPass {
    fn process(&self, builder: &mut ContainerBuilder) -> Result<(), ConfigurationError> {
        self.collect_into(builder)
    }
}
