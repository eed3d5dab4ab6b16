//! Per-pass component registry backing `$ref` deduplication.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::entity::Component;
use crate::model::{Components, Parameter, RefOr, Reference, RequestBody, Response, Schema};
use crate::types::ComponentKind;

/// A definition stored under `components`.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentEntry {
    Schema(Box<Schema>),
    Response(Box<Response>),
    Parameter(Box<Parameter>),
    RequestBody(Box<RequestBody>),
    /// Alias to another definition.
    Reference(Reference),
    /// Verbatim definition for partitions without a typed model.
    Raw(Value),
}

impl<T> From<RefOr<T>> for ComponentEntry
where
    T: Into<ComponentEntry>,
{
    fn from(value: RefOr<T>) -> Self {
        match value {
            RefOr::Ref(reference) => ComponentEntry::Reference(reference),
            RefOr::Item(item) => item.into(),
        }
    }
}

impl From<Box<Schema>> for ComponentEntry {
    fn from(schema: Box<Schema>) -> Self {
        ComponentEntry::Schema(schema)
    }
}

impl From<Response> for ComponentEntry {
    fn from(response: Response) -> Self {
        ComponentEntry::Response(Box::new(response))
    }
}

impl From<Parameter> for ComponentEntry {
    fn from(parameter: Parameter) -> Self {
        ComponentEntry::Parameter(Box::new(parameter))
    }
}

impl From<RequestBody> for ComponentEntry {
    fn from(body: RequestBody) -> Self {
        ComponentEntry::RequestBody(Box::new(body))
    }
}

/// Name → definition store, partitioned by component kind.
///
/// A name holds at most one definition per partition. Storing a name again
/// keeps the first definition and hands back the same reference; a differing
/// body is logged and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentRegistry {
    partitions: BTreeMap<ComponentKind, IndexMap<String, ComponentEntry>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a named component and return a reference to it.
    ///
    /// Returns `None` when the component carries no name.
    pub fn store<C: Component>(&mut self, component: &C) -> Option<Reference> {
        let name = component.ref_name()?.to_string();
        Some(self.insert(C::COMPONENT, &name, component.clone().into_entry()))
    }

    /// Store `entry` under `name` unless the name is taken, then return a
    /// reference to whatever the name holds.
    pub fn insert(&mut self, kind: ComponentKind, name: &str, entry: ComponentEntry) -> Reference {
        let partition = self.partitions.entry(kind).or_default();
        match partition.get(name) {
            Some(existing) if *existing != entry => {
                tracing::warn!(
                    kind = %kind,
                    name,
                    "component name already defined with a different body; keeping the first definition"
                );
            }
            Some(_) => {
                tracing::debug!(kind = %kind, name, "component already stored");
            }
            None => {
                tracing::debug!(kind = %kind, name, "storing component");
                partition.insert(name.to_string(), entry);
            }
        }
        Reference::to(kind, name)
    }

    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<&ComponentEntry> {
        self.partitions.get(&kind)?.get(name)
    }

    pub fn contains(&self, kind: ComponentKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// Stored names in one partition, in insertion order.
    pub fn names(&self, kind: ComponentKind) -> Vec<&str> {
        self.partitions
            .get(&kind)
            .map(|partition| partition.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Total number of stored definitions.
    pub fn len(&self) -> usize {
        self.partitions.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `(kind, name)` pair, partitions in emission order.
    pub fn keys(&self) -> Vec<(ComponentKind, String)> {
        self.partitions
            .iter()
            .flat_map(|(kind, partition)| partition.keys().map(move |name| (*kind, name.clone())))
            .collect()
    }

    /// Register every definition of a document's own `components` section.
    pub fn seed(&mut self, components: &Components) {
        fn seed_all<V: Clone + Into<ComponentEntry>>(
            registry: &mut ComponentRegistry,
            kind: ComponentKind,
            entries: Option<&IndexMap<String, V>>,
        ) {
            for (name, value) in entries.into_iter().flatten() {
                registry.insert(kind, name, value.clone().into());
            }
        }

        seed_all(self, ComponentKind::Schemas, components.schemas());
        seed_all(self, ComponentKind::Responses, components.responses());
        seed_all(self, ComponentKind::Parameters, components.parameters());
        seed_all(self, ComponentKind::Examples, raw(components.examples()).as_ref());
        seed_all(self, ComponentKind::RequestBodies, components.request_bodies());
        seed_all(self, ComponentKind::Headers, raw(components.headers()).as_ref());
        seed_all(
            self,
            ComponentKind::SecuritySchemes,
            raw(components.security_schemes()).as_ref(),
        );
        seed_all(self, ComponentKind::Links, raw(components.links()).as_ref());
        seed_all(self, ComponentKind::Callbacks, raw(components.callbacks()).as_ref());
    }
}

fn raw(entries: Option<&IndexMap<String, Value>>) -> Option<IndexMap<String, ComponentEntry>> {
    entries.map(|entries| {
        entries
            .iter()
            .map(|(name, value)| (name.clone(), ComponentEntry::Raw(value.clone())))
            .collect()
    })
}
