//! Field slots and wire-name derivation.

use convert_case::{Case, Casing};

use crate::render::Render;
use crate::types::FieldDescriptor;

/// Value slot of a declared entity field.
///
/// `Unset` means "leave the key out", which is distinct from a present
/// JSON `null`. `RequiredMissing` only exists between `Entity::builder()` and
/// `Builder::build()`; built entities never hold it.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Unset,
    RequiredMissing,
    Present(T),
}

impl<T> Field<T> {
    /// The supplied value, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    /// Take the value out, leaving the slot unset.
    pub fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Field::Unset) {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Present(value),
            None => Field::Unset,
        }
    }
}

/// Type-erased view of a field slot, used by the renderer.
pub enum SlotState<'a> {
    Unset,
    RequiredMissing,
    Present(&'a dyn Render),
}

/// Object-safe access to a `Field<T>` whose value can be rendered.
pub trait Slot {
    fn state(&self) -> SlotState<'_>;
}

impl<T: Render> Slot for Field<T> {
    fn state(&self) -> SlotState<'_> {
        match self {
            Field::Unset => SlotState::Unset,
            Field::RequiredMissing => SlotState::RequiredMissing,
            Field::Present(value) => SlotState::Present(value),
        }
    }
}

/// A declared field paired with its current value.
pub struct FieldSlot<'a> {
    pub descriptor: &'static FieldDescriptor,
    pub value: &'a dyn Slot,
}

/// Derive the wire name for a field identifier.
///
/// A single trailing `_` (used to dodge Rust keywords such as `type` or `in`)
/// is dropped, then `snake_case` becomes `camelCase`.
pub fn wire_name(identifier: &str) -> String {
    let stripped = identifier.strip_suffix('_').unwrap_or(identifier);
    if !stripped.contains('_') {
        return stripped.to_string();
    }
    stripped.to_case(Case::Camel)
}
