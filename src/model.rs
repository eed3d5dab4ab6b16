//! OpenAPI 3.0 object model.
//!
//! Entities are pure data. Build them through `X::builder()`; required fields
//! are enforced by `Builder::build`, so a built entity always renders.
//!
//! ```
//! use oas3_model::{render_inline, Response};
//! use serde_json::json;
//!
//! let response = Response::builder().description("ok").build().unwrap();
//! assert_eq!(render_inline(&response).unwrap(), json!({ "description": "ok" }));
//! ```

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::error::{RenderError, ValidationError};
use crate::field::Field;
use crate::render::{Render, SerializationContext};
use crate::types::{ComponentKind, DEFAULT_API_VERSION, OPENAPI_VERSION};

/// A slot that holds either an inline entity or a pointer to one.
#[derive(Debug, Clone, PartialEq)]
pub enum RefOr<T> {
    Ref(Reference),
    Item(T),
}

/// Inline schema or `$ref`.
pub type SchemaRef = RefOr<Box<Schema>>;

impl<T> RefOr<T> {
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            RefOr::Ref(reference) => Some(reference),
            RefOr::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&T> {
        match self {
            RefOr::Ref(_) => None,
            RefOr::Item(item) => Some(item),
        }
    }
}

impl<T> From<Reference> for RefOr<T> {
    fn from(reference: Reference) -> Self {
        RefOr::Ref(reference)
    }
}

impl From<Schema> for SchemaRef {
    fn from(schema: Schema) -> Self {
        RefOr::Item(Box::new(schema))
    }
}

impl From<Response> for RefOr<Response> {
    fn from(response: Response) -> Self {
        RefOr::Item(response)
    }
}

impl From<Parameter> for RefOr<Parameter> {
    fn from(parameter: Parameter) -> Self {
        RefOr::Item(parameter)
    }
}

impl From<RequestBody> for RefOr<RequestBody> {
    fn from(body: RequestBody) -> Self {
        RefOr::Item(body)
    }
}

impl<T: Render> Render for RefOr<T> {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        match self {
            RefOr::Ref(reference) => reference.render(ctx),
            RefOr::Item(item) => item.render(ctx),
        }
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterLocation {
    #[default]
    Query,
    Header,
    Path,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Path => "path",
            ParameterLocation::Cookie => "cookie",
        }
    }

    /// Parse a location name; `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "path" => Some(ParameterLocation::Path),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

impl Render for ParameterLocation {
    fn render(&self, _ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        Ok(Value::String(self.as_str().to_string()))
    }
}

/// Key of the `responses` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Code(u16),
    Default,
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode::Code(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Code(code) => write!(f, "{}", code),
            StatusCode::Default => f.write_str("default"),
        }
    }
}

/// `additionalProperties`: a flag or a schema for the values.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(SchemaRef),
}

impl From<bool> for AdditionalProperties {
    fn from(allowed: bool) -> Self {
        AdditionalProperties::Allowed(allowed)
    }
}

impl From<SchemaRef> for AdditionalProperties {
    fn from(schema: SchemaRef) -> Self {
        AdditionalProperties::Schema(schema)
    }
}

impl From<Schema> for AdditionalProperties {
    fn from(schema: Schema) -> Self {
        AdditionalProperties::Schema(schema.into())
    }
}

impl From<Reference> for AdditionalProperties {
    fn from(reference: Reference) -> Self {
        AdditionalProperties::Schema(reference.into())
    }
}

impl Render for AdditionalProperties {
    fn render(&self, ctx: &mut SerializationContext) -> Result<Value, RenderError> {
        match self {
            AdditionalProperties::Allowed(allowed) => Ok(Value::Bool(*allowed)),
            AdditionalProperties::Schema(schema) => schema.render(ctx),
        }
    }
}

entity! {
    /// Document root.
    pub struct OpenApi as plain {
        openapi: String = default(OPENAPI_VERSION.to_string()),
        info: Info = required,
        servers: Vec<Server> = skip,
        paths: IndexMap<String, PathItem> = required,
        components: Components = skip,
        security: Vec<IndexMap<String, Vec<String>>> = skip,
        tags: Vec<Tag> = skip,
        external_docs: ExternalDocs = skip,
    }
}

impl crate::entity::Builder<OpenApi> {
    /// Add one path, creating the path map on first use.
    pub fn path(mut self, path: impl Into<String>, item: PathItem) -> Self {
        insert_entry(&mut self.0.paths, path.into(), item);
        self
    }
}

/// Insert into a map-valued field, replacing `Unset` or `RequiredMissing`
/// with an empty map first.
fn insert_entry<K: std::hash::Hash + Eq, V>(field: &mut Field<IndexMap<K, V>>, key: K, value: V) {
    if !field.is_present() {
        *field = Field::Present(IndexMap::new());
    }
    if let Some(map) = field.get_mut() {
        map.insert(key, value);
    }
}

entity! {
    /// API metadata.
    pub struct Info as plain {
        title: String = required,
        description: String = skip,
        terms_of_service: String = skip,
        contact: Contact = skip,
        license: License = skip,
        version: String = default(DEFAULT_API_VERSION.to_string()),
    }
}

entity! {
    pub struct Contact as plain {
        name: String = skip,
        url: String = skip,
        email: String = skip,
    }
}

entity! {
    pub struct License as plain {
        name: String = skip,
        url: String = skip,
    }
}

entity! {
    pub struct Server as plain {
        url: String = required,
        description: String = skip,
        variables: IndexMap<String, Value> = skip,
    }
}

entity! {
    pub struct Tag as plain {
        name: String = required,
        description: String = skip,
        external_docs: ExternalDocs = skip,
    }
}

entity! {
    pub struct ExternalDocs as plain {
        url: String = required,
        description: String = skip,
    }
}

entity! {
    /// Operations available on a single path.
    pub struct PathItem as plain {
        summary: String = skip,
        description: String = skip,
        get: Operation = skip,
        put: Operation = skip,
        post: Operation = skip,
        delete: Operation = skip,
        options: Operation = skip,
        head: Operation = skip,
        patch: Operation = skip,
        trace: Operation = skip,
        parameters: Vec<RefOr<Parameter>> = skip,
    }
}

/// HTTP methods a `PathItem` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Parse a method name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "put" => Some(HttpMethod::Put),
            "post" => Some(HttpMethod::Post),
            "delete" => Some(HttpMethod::Delete),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            "patch" => Some(HttpMethod::Patch),
            "trace" => Some(HttpMethod::Trace),
            _ => None,
        }
    }
}

impl crate::entity::Builder<PathItem> {
    /// Set the operation for `method`.
    pub fn method(mut self, method: HttpMethod, operation: Operation) -> Self {
        let slot = match method {
            HttpMethod::Get => &mut self.0.get,
            HttpMethod::Put => &mut self.0.put,
            HttpMethod::Post => &mut self.0.post,
            HttpMethod::Delete => &mut self.0.delete,
            HttpMethod::Options => &mut self.0.options,
            HttpMethod::Head => &mut self.0.head,
            HttpMethod::Patch => &mut self.0.patch,
            HttpMethod::Trace => &mut self.0.trace,
        };
        *slot = Field::Present(operation);
        self
    }
}

entity! {
    pub struct Operation as plain {
        tags: IndexSet<String> = skip,
        summary: String = skip,
        description: String = skip,
        responses: IndexMap<StatusCode, RefOr<Response>> = required,
        operation_id: String = skip,
        parameters: Vec<RefOr<Parameter>> = skip,
        request_body: RefOr<RequestBody> = skip,
        deprecated: bool = skip,
    }
}

impl Operation {
    /// Add tags, creating the tag set when none was supplied. Duplicates are
    /// dropped; first insertion order is kept.
    pub fn add_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.tags.is_present() {
            self.tags = Field::Present(IndexSet::new());
        }
        if let Some(set) = self.tags.get_mut() {
            set.extend(tags.into_iter().map(Into::into));
        }
    }
}

impl crate::entity::Builder<Operation> {
    /// Add one response, creating the map on first use.
    pub fn response(
        mut self,
        status: impl Into<StatusCode>,
        response: impl Into<RefOr<Response>>,
    ) -> Self {
        insert_entry(&mut self.0.responses, status.into(), response.into());
        self
    }
}

entity! {
    pub struct Parameter as component(Parameters) [check = check_parameter] {
        name: String = required,
        in_: ParameterLocation = default(ParameterLocation::Query),
        description: String = skip,
        required: bool = skip,
        deprecated: bool = skip,
        allow_empty_value: bool = skip,
        schema: SchemaRef = skip,
        ref_name: String = internal,
    }
}

fn check_parameter(parameter: &Parameter) -> Result<(), ValidationError> {
    let in_path = parameter.in_.get() == Some(&ParameterLocation::Path);
    if in_path && parameter.required.get() != Some(&true) {
        return Err(ValidationError::Invalid {
            entity: "Parameter",
            field: "required".to_string(),
            message: format!(
                "path parameter '{}' must be marked required",
                parameter.name.get().map(String::as_str).unwrap_or_default()
            ),
        });
    }
    Ok(())
}

entity! {
    pub struct RequestBody as component(RequestBodies) {
        content: IndexMap<String, MediaType> = required,
        description: String = skip,
        required: bool = skip,
        ref_name: String = internal,
    }
}

entity! {
    pub struct Response as component(Responses) {
        description: String = required,
        content: IndexMap<String, MediaType> = skip,
        ref_name: String = internal,
    }
}

impl crate::entity::Builder<Response> {
    /// Add one media type, creating the content map on first use.
    pub fn media_type(mut self, mime: impl Into<String>, media: MediaType) -> Self {
        insert_entry(&mut self.0.content, mime.into(), media);
        self
    }
}

impl crate::entity::Builder<RequestBody> {
    /// Add one media type, creating the content map on first use.
    pub fn media_type(mut self, mime: impl Into<String>, media: MediaType) -> Self {
        insert_entry(&mut self.0.content, mime.into(), media);
        self
    }
}

entity! {
    pub struct MediaType as plain {
        schema: SchemaRef = required,
        example: Value = skip,
    }
}

entity! {
    /// JSON-Schema style data description.
    pub struct Schema as component(Schemas) {
        // Metadata
        title: String = skip,
        description: String = skip,
        default: Value = skip,
        example: Value = skip,
        examples: Vec<Value> = skip,
        deprecated: bool = skip,

        // Validation
        type_: String = skip,
        format: String = skip,
        nullable: bool = skip,
        enum_: Vec<Value> = skip,
        multiple_of: f64 = skip,
        maximum: f64 = skip,
        exclusive_maximum: bool = skip,
        minimum: f64 = skip,
        exclusive_minimum: bool = skip,
        max_length: u64 = skip,
        min_length: u64 = skip,
        pattern: String = skip,
        items: SchemaRef = skip,
        min_items: u64 = skip,
        max_items: u64 = skip,
        unique_items: bool = skip,
        read_only: bool = skip,
        write_only: bool = skip,

        // Composition
        all_of: Vec<SchemaRef> = skip,
        one_of: Vec<SchemaRef> = skip,
        any_of: Vec<SchemaRef> = skip,
        not_: SchemaRef = skip,
        properties: IndexMap<String, SchemaRef> = skip,
        additional_properties: AdditionalProperties = skip,
        required: Vec<String> = skip,

        ref_name: String = internal,
    }
}

impl crate::entity::Builder<Schema> {
    /// Add one property, creating the map on first use.
    pub fn property(mut self, name: impl Into<String>, schema: impl Into<SchemaRef>) -> Self {
        insert_entry(&mut self.0.properties, name.into(), schema.into());
        self
    }
}

impl Schema {
    /// Unconstrained schema (`{}`).
    pub fn empty() -> Self {
        Self::builder().0
    }
}

entity! {
    /// Pointer substituted for a nameable entity.
    pub struct Reference as plain [check = check_reference] {
        ref_: String = required => "$ref",
    }
}

impl Reference {
    /// Pointer to `name` in the `kind` partition of `components`.
    pub fn to(kind: ComponentKind, name: &str) -> Self {
        Reference {
            ref_: Field::Present(kind.pointer(name)),
        }
    }

    /// The pointer string.
    pub fn pointer(&self) -> &str {
        self.ref_.get().map(String::as_str).unwrap_or_default()
    }
}

fn check_reference(reference: &Reference) -> Result<(), ValidationError> {
    match reference.ref_.get() {
        Some(pointer) if pointer.is_empty() => Err(ValidationError::Invalid {
            entity: "Reference",
            field: "$ref".to_string(),
            message: "pointer must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

entity! {
    /// Reusable definitions. Rendered with referencing switched off, so stored
    /// definitions never collapse into pointers to themselves.
    pub struct Components as container {
        schemas: IndexMap<String, SchemaRef> = skip,
        responses: IndexMap<String, RefOr<Response>> = skip,
        parameters: IndexMap<String, RefOr<Parameter>> = skip,
        examples: IndexMap<String, Value> = skip,
        request_bodies: IndexMap<String, RefOr<RequestBody>> = skip,
        headers: IndexMap<String, Value> = skip,
        security_schemes: IndexMap<String, Value> = skip,
        links: IndexMap<String, Value> = skip,
        callbacks: IndexMap<String, Value> = skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::types::Presence;

    fn ok() -> Response {
        Response::builder().description("ok").build().unwrap()
    }

    #[test]
    fn required_field_missing_fails_build() {
        let err = Info::builder().build().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingField { entity: "Info", ref field } if field == "title"
        ));
    }

    #[test]
    fn defaults_are_present() {
        let info = Info::builder().title("Pets").build().unwrap();
        assert_eq!(info.version().map(String::as_str), Some(DEFAULT_API_VERSION));

        let param = Parameter::builder().name("limit").build().unwrap();
        assert_eq!(param.in_(), Some(&ParameterLocation::Query));
    }

    #[test]
    fn descriptors_follow_declaration_order() {
        let names: Vec<_> = Response::descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, ["description", "content", "ref_name"]);

        let descriptor = &Response::descriptors()[2];
        assert!(descriptor.internal);
        assert_eq!(Response::descriptors()[0].presence, Presence::Required);
    }

    #[test]
    fn path_parameter_must_be_required() {
        let err = Parameter::builder()
            .name("id")
            .in_(ParameterLocation::Path)
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { entity: "Parameter", .. }));

        let ok = Parameter::builder()
            .name("id")
            .in_(ParameterLocation::Path)
            .required(true)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn empty_reference_rejected() {
        let err = Reference::builder().ref_("").build().unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { entity: "Reference", .. }));
    }

    #[test]
    fn add_tags_creates_and_dedupes() {
        let mut op = Operation::builder().response(200, ok()).build().unwrap();
        assert!(op.tags().is_none());

        op.add_tags(["pets", "store"]);
        op.add_tags(["pets"]);
        let tags: Vec<_> = op.tags().unwrap().iter().map(String::as_str).collect();
        assert_eq!(tags, ["pets", "store"]);
    }

    #[test]
    fn overlay_copies_supplied_fields_only() {
        let mut base = Schema::builder().type_("string").title("A").build().unwrap();
        let other = Schema::builder().title("B").build().unwrap();
        base.overlay(&other);
        assert_eq!(base.title().map(String::as_str), Some("B"));
        assert_eq!(base.type_().map(String::as_str), Some("string"));
    }

    #[test]
    fn path_item_method_by_name() {
        let op = Operation::builder().response(200, ok()).build().unwrap();
        let method = HttpMethod::parse("POST").unwrap();
        let item = PathItem::builder().method(method, op).build().unwrap();
        assert!(item.post().is_some());
        assert!(item.get().is_none());
        assert_eq!(HttpMethod::parse("fetch"), None);
    }

    #[test]
    fn status_code_display() {
        assert_eq!(StatusCode::from(404).to_string(), "404");
        assert_eq!(StatusCode::Default.to_string(), "default");
    }
}
