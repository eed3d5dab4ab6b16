//! Rendering of the object model into plain JSON values.
//!
//! Every render call threads one [`SerializationContext`]. The context owns the
//! [`ComponentRegistry`] for the pass and the referencing switch:
//!
//! | Value | Output |
//! |-------|--------|
//! | scalar | as-is |
//! | sequence | each element, original order |
//! | mapping | each value under its rendered key |
//! | entity | declared fields in order; unset and internal fields left out |
//! | named component, referencing on | `{"$ref": "#/components/<kind>/<name>"}` |

use std::collections::{BTreeMap, HashMap};

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Number, Value};

use crate::entity::{Component, Entity};
use crate::error::RenderError;
use crate::field::SlotState;
use crate::model::{OpenApi, StatusCode};
use crate::registry::{ComponentEntry, ComponentRegistry};
use crate::types::{ComponentKind, RenderOptions};

/// Anything that can appear in the object model.
pub trait Render {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError>;
}

/// Mapping keys. JSON object keys are strings, so every key renders to one.
pub trait RenderKey {
    fn render_key(&self) -> String;
}

/// State of one render pass: the component registry and referencing policy.
///
/// Create one per pass; the registry it owns is not meant to outlive it.
#[derive(Debug, Clone, Default)]
pub struct SerializationContext {
    registry: ComponentRegistry,
    options: RenderOptions,
    depth: usize,
}

impl SerializationContext {
    /// Fresh registry, referencing enabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            options,
            depth: 0,
        }
    }

    /// Continue filling an existing registry.
    pub fn with_registry(registry: ComponentRegistry, options: RenderOptions) -> Self {
        Self {
            registry,
            options,
            depth: 0,
        }
    }

    pub fn referencing(&self) -> bool {
        self.options.referencing
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn into_registry(self) -> ComponentRegistry {
        self.registry
    }

    /// Render an entity inline, field by field.
    pub fn render_entity<E: Entity>(&mut self, entity: &E) -> Result<Value, RenderError> {
        self.descend(E::KIND, |ctx| ctx.render_fields(entity, &[]))
            .map(Value::Object)
    }

    /// Render a nameable entity, substituting a reference when it carries a
    /// name and referencing is on. The first body stored under a name wins.
    pub fn render_component<C: Component>(&mut self, component: &C) -> Result<Value, RenderError> {
        if self.options.referencing {
            if let Some(reference) = self.registry.store(component) {
                return self.render_entity(&reference);
            }
        }
        self.render_entity(component)
    }

    /// Render an entity with referencing switched off for its whole subtree.
    pub fn render_container<E: Entity>(&mut self, entity: &E) -> Result<Value, RenderError> {
        let previous = self.options.referencing;
        self.options.referencing = false;
        let result = self.render_entity(entity);
        self.options.referencing = previous;
        result
    }

    /// Render every registered definition into a `components` object.
    ///
    /// A definition's own root is never substituted, but named entities
    /// nested inside it are, which can register further definitions; those
    /// are rendered too until none are left. Partitions are emitted in
    /// `ComponentKind` order, names in registration order.
    pub fn render_definitions(&mut self) -> Result<Map<String, Value>, RenderError> {
        let mut rendered: BTreeMap<ComponentKind, HashMap<String, Value>> = BTreeMap::new();

        loop {
            let pending: Vec<(ComponentKind, String)> = self
                .registry
                .keys()
                .into_iter()
                .filter(|(kind, name)| {
                    !rendered
                        .get(kind)
                        .is_some_and(|partition| partition.contains_key(name))
                })
                .collect();
            if pending.is_empty() {
                break;
            }

            for (kind, name) in pending {
                let Some(entry) = self.registry.get(kind, &name).cloned() else {
                    continue;
                };
                tracing::debug!(kind = %kind, name = %name, "rendering component definition");
                let value = self.render_definition(&entry)?;
                rendered.entry(kind).or_default().insert(name, value);
            }
        }

        let mut components = Map::new();
        for kind in ComponentKind::ALL {
            let Some(mut values) = rendered.remove(&kind) else {
                continue;
            };
            let mut partition = Map::new();
            for name in self.registry.names(kind) {
                if let Some(value) = values.remove(name) {
                    partition.insert(name.to_string(), value);
                }
            }
            components.insert(kind.as_str().to_string(), Value::Object(partition));
        }
        Ok(components)
    }

    fn render_definition(&mut self, entry: &ComponentEntry) -> Result<Value, RenderError> {
        match entry {
            ComponentEntry::Schema(schema) => self.render_entity(schema.as_ref()),
            ComponentEntry::Response(response) => self.render_entity(response.as_ref()),
            ComponentEntry::Parameter(parameter) => self.render_entity(parameter.as_ref()),
            ComponentEntry::RequestBody(body) => self.render_entity(body.as_ref()),
            ComponentEntry::Reference(reference) => self.render_entity(reference),
            ComponentEntry::Raw(value) => Ok(value.clone()),
        }
    }

    fn render_fields<E: Entity>(
        &mut self,
        entity: &E,
        skip: &[&str],
    ) -> Result<Map<String, Value>, RenderError> {
        let mut out = Map::new();
        for slot in entity.fields() {
            if slot.descriptor.internal || skip.contains(&slot.descriptor.name) {
                continue;
            }
            match slot.value.state() {
                SlotState::Unset => {}
                SlotState::RequiredMissing => unreachable!(
                    "required field `{}` of {} reached the renderer without a value",
                    slot.descriptor.name,
                    E::KIND
                ),
                SlotState::Present(value) => {
                    let rendered = value.render(self)?;
                    out.insert(slot.descriptor.wire_name(), rendered);
                }
            }
        }
        Ok(out)
    }

    fn descend<T>(
        &mut self,
        entity: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        if self.depth >= self.options.max_depth {
            return Err(RenderError::DepthExceeded {
                limit: self.options.max_depth,
                entity,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// Render `value` under an existing context.
///
/// # Errors
///
/// Returns `RenderError` if the tree nests deeper than the context allows or
/// holds a non-finite number.
pub fn render<R: Render + ?Sized>(
    value: &R,
    ctx: &mut SerializationContext,
) -> Result<Value, RenderError> {
    value.render(ctx)
}

/// Render `value` with referencing disabled; named entities stay inline.
pub fn render_inline<R: Render + ?Sized>(value: &R) -> Result<Value, RenderError> {
    let mut ctx = SerializationContext::with_options(RenderOptions::inline());
    value.render(&mut ctx)
}

/// Render a whole document.
///
/// With referencing on, the document's own `components` seed a fresh
/// registry, named entities anywhere in the tree are replaced by pointers,
/// and every definition ends up once under `components`.
pub fn render_document(doc: &OpenApi, options: &RenderOptions) -> Result<Value, RenderError> {
    let mut ctx = SerializationContext::with_options(options.clone());
    if !options.referencing {
        return ctx.render_entity(doc);
    }

    if let Some(components) = doc.components() {
        ctx.registry_mut().seed(components);
    }
    let mut fields = ctx.descend(OpenApi::KIND, |ctx| ctx.render_fields(doc, &["components"]))?;
    let mut components = Some(ctx.render_definitions()?).filter(|c| !c.is_empty());

    let mut out = Map::new();
    for descriptor in OpenApi::descriptors() {
        let key = descriptor.wire_name();
        if descriptor.name == "components" {
            if let Some(components) = components.take() {
                out.insert(key, Value::Object(components));
            }
        } else if let Some(value) = fields.remove(&key) {
            out.insert(key, value);
        }
    }
    Ok(out.into())
}

// --- Value impls ---

impl Render for Value {
    fn render(&self, _ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        Ok(self.clone())
    }
}

impl Render for str {
    fn render(&self, _ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        Ok(Value::String(self.to_string()))
    }
}

impl Render for String {
    fn render(&self, _ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        Ok(Value::String(self.clone()))
    }
}

impl Render for bool {
    fn render(&self, _ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        Ok(Value::Bool(*self))
    }
}

macro_rules! render_integer {
    ($($ty:ty),*) => {
        $(
            impl Render for $ty {
                fn render(&self, _ctx: &mut SerializationContext) -> Result<Value, RenderError> {
                    Ok(Value::from(*self))
                }
            }
        )*
    };
}

render_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl Render for f64 {
    fn render(&self, _ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        Number::from_f64(*self)
            .map(Value::Number)
            .ok_or(RenderError::NonFiniteNumber { value: *self })
    }
}

impl Render for f32 {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        f64::from(*self).render(ctx)
    }
}

impl<T: Render> Render for Option<T> {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        match self {
            Some(value) => value.render(ctx),
            None => Ok(Value::Null),
        }
    }
}

impl<T: Render + ?Sized> Render for Box<T> {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        (**self).render(ctx)
    }
}

impl<T: Render + ?Sized> Render for &T {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        (**self).render(ctx)
    }
}

impl<T: Render> Render for [T] {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        self.iter()
            .map(|item| item.render(ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl<T: Render> Render for Vec<T> {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        self.as_slice().render(ctx)
    }
}

impl<T: Render> Render for IndexSet<T> {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        self.iter()
            .map(|item| item.render(ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl<K: RenderKey, V: Render> Render for IndexMap<K, V> {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        render_map(self.iter(), ctx)
    }
}

impl<K: RenderKey, V: Render> Render for BTreeMap<K, V> {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        render_map(self.iter(), ctx)
    }
}

fn render_map<'a, K, V, I>(entries: I, ctx: &mut SerializationContext) -> Result<Value, RenderError>
where
    K: RenderKey + 'a,
    V: Render + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let mut out = Map::new();
    for (key, value) in entries {
        out.insert(key.render_key(), value.render(ctx)?);
    }
    Ok(Value::Object(out))
}

impl RenderKey for String {
    fn render_key(&self) -> String {
        self.clone()
    }
}

impl RenderKey for &str {
    fn render_key(&self) -> String {
        self.to_string()
    }
}

impl RenderKey for u16 {
    fn render_key(&self) -> String {
        self.to_string()
    }
}

impl RenderKey for StatusCode {
    fn render_key(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Builder;
    use crate::field::Field;
    use crate::model::{Info, MediaType, Reference, Response, Schema};
    use serde_json::json;

    fn pet() -> Schema {
        Schema::builder()
            .ref_name("Pet")
            .type_("object")
            .build()
            .unwrap()
    }

    #[test]
    fn scalars_pass_through() {
        let mut ctx = SerializationContext::new();
        assert_eq!(render(&true, &mut ctx).unwrap(), json!(true));
        assert_eq!(render(&42i64, &mut ctx).unwrap(), json!(42));
        assert_eq!(render(&1.5f64, &mut ctx).unwrap(), json!(1.5));
        assert_eq!(render("x", &mut ctx).unwrap(), json!("x"));
        assert_eq!(render(&Value::Null, &mut ctx).unwrap(), Value::Null);
    }

    #[test]
    fn non_finite_number_rejected() {
        let err = render_inline(&f64::NAN).unwrap_err();
        assert!(matches!(err, RenderError::NonFiniteNumber { .. }));
    }

    #[test]
    fn unset_field_is_omitted() {
        let response = Response::builder().description("ok").build().unwrap();
        let value = render_inline(&response).unwrap();
        assert_eq!(value, json!({ "description": "ok" }));
        assert!(value.get("content").is_none());
    }

    #[test]
    fn explicit_null_is_kept() {
        let media = MediaType::builder()
            .schema(Schema::empty())
            .example(Value::Null)
            .build()
            .unwrap();
        let value = render_inline(&media).unwrap();
        assert_eq!(value, json!({ "schema": {}, "example": null }));
    }

    #[test]
    fn internal_name_never_rendered() {
        let value = render_inline(&pet()).unwrap();
        assert_eq!(value, json!({ "type": "object" }));
    }

    #[test]
    fn reference_uses_explicit_wire_name() {
        let value = render_inline(&Reference::to(ComponentKind::Schemas, "Pet")).unwrap();
        assert_eq!(value, json!({ "$ref": "#/components/schemas/Pet" }));
    }

    #[test]
    fn named_component_becomes_reference() {
        let mut ctx = SerializationContext::new();
        let value = render(&pet(), &mut ctx).unwrap();
        assert_eq!(value, json!({ "$ref": "#/components/schemas/Pet" }));
        assert!(ctx.registry().contains(ComponentKind::Schemas, "Pet"));
    }

    #[test]
    fn container_disables_referencing() {
        let mut ctx = SerializationContext::new();
        let value = ctx.render_container(&pet()).unwrap();
        assert_eq!(value, json!({ "type": "object" }));
        assert!(ctx.referencing());
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn mapping_keys_rendered() {
        let mut map = IndexMap::new();
        map.insert(StatusCode::Code(200), "ok".to_string());
        map.insert(StatusCode::Default, "other".to_string());
        let value = render_inline(&map).unwrap();
        assert_eq!(value, json!({ "200": "ok", "default": "other" }));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["200", "default"]);
    }

    #[test]
    fn depth_limit_enforced() {
        let inner = Schema::builder().type_("string").build().unwrap();
        let outer = Schema::builder().items(inner).build().unwrap();
        let mut ctx = SerializationContext::with_options(RenderOptions::inline().max_depth(1));
        let err = render(&outer, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            RenderError::DepthExceeded {
                limit: 1,
                entity: "Schema"
            }
        );
    }

    #[test]
    fn definitions_drain_nested_components() {
        let owner = Schema::builder()
            .ref_name("Owner")
            .type_("object")
            .build()
            .unwrap();
        let pet = Schema::builder()
            .ref_name("Pet")
            .property("owner", owner)
            .build()
            .unwrap();

        let mut ctx = SerializationContext::new();
        render(&pet, &mut ctx).unwrap();
        let components = ctx.render_definitions().unwrap();

        assert_eq!(
            Value::Object(components),
            json!({
                "schemas": {
                    "Pet": {
                        "properties": { "owner": { "$ref": "#/components/schemas/Owner" } }
                    },
                    "Owner": { "type": "object" }
                }
            })
        );
    }

    #[test]
    #[should_panic(expected = "reached the renderer without a value")]
    fn required_marker_at_render_is_a_defect() {
        let Builder(mut info) = Info::builder().title("x");
        info.title = Field::RequiredMissing;
        let _ = render_inline(&info);
    }
}
