//! Core types shared by the object model, the compiler and the renderer.

use std::fmt;

/// OpenAPI version written into documents that don't set one.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// API version written into `info.version` when the caller doesn't supply one.
pub const DEFAULT_API_VERSION: &str = "0.0.1-dev";

/// Default entity nesting limit for a single render pass.
pub const DEFAULT_RENDER_DEPTH: usize = 128;

/// Default nesting limit for nested type compilation.
pub const DEFAULT_COMPILE_DEPTH: usize = 64;

/// How a declared field behaves when the caller doesn't supply a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    /// Must be supplied before the entity is built.
    Required,
    /// Carries a default value that is rendered unless replaced.
    Defaulted,
    /// Omitted from the output unless supplied.
    Skippable,
}

/// Static description of one declared entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Identifier of the field on the Rust side (`request_body`, `in_`).
    pub name: &'static str,
    /// Explicit wire name, overriding the derived one (`$ref`).
    pub rename: Option<&'static str>,
    pub presence: Presence,
    /// Bookkeeping fields (component names) that never reach the output.
    pub internal: bool,
}

impl FieldDescriptor {
    /// Key this field is written under.
    pub fn wire_name(&self) -> String {
        match self.rename {
            Some(name) => name.to_string(),
            None => crate::field::wire_name(self.name),
        }
    }
}

/// Partition of the `components` section a nameable entity is stored in.
///
/// Variants are declared in the order the partitions are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
}

impl ComponentKind {
    /// All partitions in emission order.
    pub const ALL: [ComponentKind; 9] = [
        ComponentKind::Schemas,
        ComponentKind::Responses,
        ComponentKind::Parameters,
        ComponentKind::Examples,
        ComponentKind::RequestBodies,
        ComponentKind::Headers,
        ComponentKind::SecuritySchemes,
        ComponentKind::Links,
        ComponentKind::Callbacks,
    ];

    /// Key of this partition under `components`, also used in reference pointers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Responses => "responses",
            ComponentKind::Parameters => "parameters",
            ComponentKind::Examples => "examples",
            ComponentKind::RequestBodies => "requestBodies",
            ComponentKind::Headers => "headers",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::Links => "links",
            ComponentKind::Callbacks => "callbacks",
        }
    }

    /// Build the `#/components/<kind>/<name>` pointer for `name`.
    ///
    /// `~` and `/` inside the name are escaped per RFC 6901.
    pub fn pointer(&self, name: &str) -> String {
        let escaped = name.replace('~', "~0").replace('/', "~1");
        format!("#/components/{}/{}", self.as_str(), escaped)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Replace named entities with `$ref` pointers into `components`.
    pub referencing: bool,
    /// Maximum entity nesting before the pass is aborted.
    pub max_depth: usize,
}

impl RenderOptions {
    /// Referencing enabled, default depth limit.
    pub fn new() -> Self {
        Self {
            referencing: true,
            max_depth: DEFAULT_RENDER_DEPTH,
        }
    }

    /// Render every entity inline, ignoring component names.
    pub fn inline() -> Self {
        Self::new().referencing(false)
    }

    pub fn referencing(mut self, referencing: bool) -> Self {
        self.referencing = referencing;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for the type-to-schema compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Maximum nesting of member types (array items, properties, union members).
    pub max_depth: usize,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_COMPILE_DEPTH,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new()
    }
}
