//! Entity traits, builders and the `entity!` declaration macro.
//!
//! Every object-model type is declared through `entity!`, which produces:
//!
//! - the struct itself, one [`Field`](crate::field::Field) slot per declared field
//! - a static [`FieldDescriptor`] table in declaration order
//! - `builder()`, per-field getters and per-field setters on [`Builder`]
//! - the [`Entity`] impl, and a [`Render`](crate::render::Render) impl chosen by mode
//!
//! Modes:
//!
//! | Mode | Rendering |
//! |------|-----------|
//! | `plain` | inline, field by field |
//! | `component(Kind)` | replaced by a `$ref` when named and referencing is on |
//! | `container` | inline with referencing switched off for its whole subtree |

use crate::error::ValidationError;
use crate::field::{FieldSlot, SlotState};
use crate::registry::ComponentEntry;
use crate::types::{ComponentKind, FieldDescriptor};

/// A declared object-model type.
pub trait Entity: Sized {
    /// Entity kind used in error messages and logs.
    const KIND: &'static str;

    /// Declared fields, in output order.
    fn descriptors() -> &'static [FieldDescriptor];

    /// Declared fields paired with their current values.
    fn fields(&self) -> Vec<FieldSlot<'_>>;

    /// Local, per-entity validators. Runs after required fields are checked.
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Fail if any required field is still missing, then run local validators.
    fn validate(&self) -> Result<(), ValidationError> {
        for slot in self.fields() {
            if let SlotState::RequiredMissing = slot.value.state() {
                return Err(ValidationError::MissingField {
                    entity: Self::KIND,
                    field: slot.descriptor.wire_name(),
                });
            }
        }
        self.check()
    }
}

/// An entity that can be stored under `components` and pointed to by `$ref`.
pub trait Component: Entity + Clone {
    const COMPONENT: ComponentKind;

    /// Name used for deduplication; never rendered.
    fn ref_name(&self) -> Option<&str>;

    fn into_entry(self) -> ComponentEntry;
}

/// Staging area for an entity whose required fields may not be filled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Builder<E>(pub(crate) E);

impl<E: Entity> Builder<E> {
    /// Validate and hand out the entity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` naming the first required field
    /// that was never supplied, or whatever the entity's local validators report.
    pub fn build(self) -> Result<E, ValidationError> {
        self.0.validate()?;
        Ok(self.0)
    }
}

macro_rules! entity {
    (@init required) => { $crate::field::Field::RequiredMissing };
    (@init skip) => { $crate::field::Field::Unset };
    (@init internal) => { $crate::field::Field::Unset };
    (@init default ($value:expr)) => { $crate::field::Field::Present($value) };

    (@presence required) => { $crate::types::Presence::Required };
    (@presence default) => { $crate::types::Presence::Defaulted };
    (@presence skip) => { $crate::types::Presence::Skippable };
    (@presence internal) => { $crate::types::Presence::Skippable };

    (@internal internal) => { true };
    (@internal $other:ident) => { false };

    (@rename) => { None };
    (@rename $rename:literal) => { Some($rename) };

    (@check) => { None };
    (@check $check:path) => { Some($check) };

    (@render $name:ident plain) => {
        impl $crate::render::Render for $name {
            fn render(
                &self,
                ctx: &mut $crate::render::SerializationContext,
            ) -> Result<serde_json::Value, $crate::error::RenderError> {
                ctx.render_entity(self)
            }
        }
    };
    (@render $name:ident container) => {
        impl $crate::render::Render for $name {
            fn render(
                &self,
                ctx: &mut $crate::render::SerializationContext,
            ) -> Result<serde_json::Value, $crate::error::RenderError> {
                ctx.render_container(self)
            }
        }
    };
    (@render $name:ident component $kind:ident) => {
        impl $crate::entity::Component for $name {
            const COMPONENT: $crate::types::ComponentKind = $crate::types::ComponentKind::$kind;

            fn ref_name(&self) -> Option<&str> {
                self.ref_name.get().map(String::as_str)
            }

            fn into_entry(self) -> $crate::registry::ComponentEntry {
                $crate::registry::ComponentEntry::$name(Box::new(self))
            }
        }

        impl $crate::render::Render for $name {
            fn render(
                &self,
                ctx: &mut $crate::render::SerializationContext,
            ) -> Result<serde_json::Value, $crate::error::RenderError> {
                ctx.render_component(self)
            }
        }
    };

    (
        $(#[$meta:meta])*
        pub struct $name:ident as $mode:ident $( ( $kind:ident ) )? $( [check = $check:path] )? {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty = $presence:ident $( ( $default:expr ) )? $( => $rename:literal )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $( pub(crate) $field: $crate::field::Field<$ty>, )*
        }

        impl $name {
            /// Start building, every field at its declared default.
            pub fn builder() -> $crate::entity::Builder<Self> {
                $crate::entity::Builder(Self {
                    $( $field: entity!(@init $presence $( ($default) )?), )*
                })
            }

            /// Reopen a built entity for changes.
            pub fn edit(self) -> $crate::entity::Builder<Self> {
                $crate::entity::Builder(self)
            }

            /// Copy every field `other` supplies over the value held here.
            pub fn overlay(&mut self, other: &Self) {
                $(
                    if let $crate::field::Field::Present(value) = &other.$field {
                        self.$field = $crate::field::Field::Present(value.clone());
                    }
                )*
            }

            $(
                $(#[$field_meta])*
                pub fn $field(&self) -> Option<&$ty> {
                    self.$field.get()
                }
            )*
        }

        impl $crate::entity::Builder<$name> {
            $(
                pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                    self.0.$field = $crate::field::Field::Present(value.into());
                    self
                }
            )*
        }

        impl $crate::entity::Entity for $name {
            const KIND: &'static str = stringify!($name);

            fn descriptors() -> &'static [$crate::types::FieldDescriptor] {
                const DESCRIPTORS: &[$crate::types::FieldDescriptor] = &[
                    $(
                        $crate::types::FieldDescriptor {
                            name: stringify!($field),
                            rename: entity!(@rename $($rename)?),
                            presence: entity!(@presence $presence),
                            internal: entity!(@internal $presence),
                        },
                    )*
                ];
                DESCRIPTORS
            }

            fn fields(&self) -> Vec<$crate::field::FieldSlot<'_>> {
                let values: Vec<&dyn $crate::field::Slot> = vec![
                    $( &self.$field as &dyn $crate::field::Slot, )*
                ];
                Self::descriptors()
                    .iter()
                    .zip(values)
                    .map(|(descriptor, value)| $crate::field::FieldSlot { descriptor, value })
                    .collect()
            }

            fn check(&self) -> Result<(), $crate::error::ValidationError> {
                let check: Option<fn(&Self) -> Result<(), $crate::error::ValidationError>> =
                    entity!(@check $($check)?);
                match check {
                    Some(check) => check(self),
                    None => Ok(()),
                }
            }
        }

        entity!(@render $name $mode $($kind)?);
    };
}
