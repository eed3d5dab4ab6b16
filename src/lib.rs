//! OpenAPI 3 object model
//!
//! Typed entities for an OpenAPI 3.0 document, a compiler that derives schemas
//! from type descriptors, and a renderer that emits each named definition once
//! under `components` and points at it with `$ref` everywhere else.
//!
//! # Example
//!
//! ```
//! use oas3_model::{
//!     render_document, HttpMethod, Info, MediaType, OpenApi, Operation, PathItem,
//!     RenderOptions, Response, Schema,
//! };
//! use serde_json::json;
//!
//! let pet = Schema::builder()
//!     .ref_name("Pet")
//!     .type_("object")
//!     .property("name", Schema::builder().type_("string").build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! let response = Response::builder()
//!     .description("A pet")
//!     .media_type("application/json", MediaType::builder().schema(pet).build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! let doc = OpenApi::builder()
//!     .info(Info::builder().title("Pets").build().unwrap())
//!     .path(
//!         "/pet",
//!         PathItem::builder()
//!             .method(HttpMethod::Get, Operation::builder().response(200, response).build().unwrap())
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let out = render_document(&doc, &RenderOptions::default()).unwrap();
//! assert_eq!(
//!     out["paths"]["/pet"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
//!     json!({ "$ref": "#/components/schemas/Pet" })
//! );
//! assert_eq!(out["components"]["schemas"]["Pet"]["type"], json!("object"));
//! ```
//!
//! # Field presence
//!
//! | Declared as | Before `build()` | Rendered |
//! |-------------|------------------|----------|
//! | `required` | must be supplied | always |
//! | `default(v)` | `v` | always |
//! | `skip` | unset | only when supplied |
//! | `internal` | unset | never |
//!
//! # Schemas from types
//!
//! ```
//! use oas3_model::{render_inline, Schema, TypeDescriptor};
//! use serde_json::json;
//!
//! let source: TypeDescriptor = "dict[str, list[int]]".parse().unwrap();
//! let schema = oas3_model::compile(&source, &Schema::empty()).unwrap();
//! assert_eq!(
//!     render_inline(&schema).unwrap(),
//!     json!({
//!         "type": "object",
//!         "additionalProperties": {
//!             "type": "array",
//!             "items": { "type": "integer", "format": "int64" }
//!         }
//!     })
//! );
//! ```

#[macro_use]
mod entity;

mod compiler;
mod descriptor;
mod error;
mod field;
mod manifest;
mod model;
mod registry;
mod render;
mod types;

pub use compiler::{compile, string_format, Fallback, SchemaCompiler, PRIMITIVE_TABLE};
pub use descriptor::{
    Aggregate, Describe, Members, Primitive, TypeDescriptor, MAX_EXPRESSION_DEPTH,
};
pub use entity::{Builder, Component, Entity};
pub use error::{CompileError, ManifestError, ParseError, RenderError, ValidationError};
pub use field::{wire_name, Field, FieldSlot, Slot, SlotState};
pub use manifest::{load_manifest, load_manifest_str, Manifest, Route, RouteParam};
pub use model::{
    AdditionalProperties, Components, Contact, ExternalDocs, HttpMethod, Info, License,
    MediaType, OpenApi, Operation, Parameter, ParameterLocation, PathItem, RefOr, Reference,
    RequestBody, Response, Schema, SchemaRef, Server, StatusCode, Tag,
};
pub use registry::{ComponentEntry, ComponentRegistry};
pub use render::{render, render_document, render_inline, Render, RenderKey, SerializationContext};
pub use types::{
    CompileOptions, ComponentKind, FieldDescriptor, Presence, RenderOptions, DEFAULT_API_VERSION,
    DEFAULT_COMPILE_DEPTH, DEFAULT_RENDER_DEPTH, OPENAPI_VERSION,
};
