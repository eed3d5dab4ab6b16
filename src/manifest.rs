//! Route manifests: a small JSON description of an API that is turned into an
//! [`OpenApi`] document.
//!
//! ```json
//! {
//!   "title": "Pet Store",
//!   "types": { "Pet": "{name: str, tags: list[str]}" },
//!   "routes": [
//!     { "path": "/pets", "method": "get", "response": "list[Pet]" },
//!     { "path": "/pets", "method": "post", "request": "Pet", "response": "Pet", "status": 201 }
//!   ]
//! }
//! ```
//!
//! Each entry of `types` becomes a named schema under `components/schemas`.
//! Type expressions elsewhere may use those names; they resolve to the named
//! schema, which the renderer then replaces with a `$ref`.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

use crate::compiler::{string_format, SchemaCompiler};
use crate::descriptor::TypeDescriptor;
use crate::error::ManifestError;
use crate::model::{
    Components, HttpMethod, Info, MediaType, OpenApi, Operation, Parameter, ParameterLocation,
    PathItem, RefOr, Reference, RequestBody, Response, Schema, SchemaRef,
};
use crate::types::{CompileOptions, ComponentKind};

const JSON: &str = "application/json";

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub title: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Named types, `name → type expression`.
    #[serde(default)]
    pub types: IndexMap<String, String>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub params: Vec<RouteParam>,
    /// JSON request body type.
    #[serde(default)]
    pub request: Option<String>,
    /// JSON response body type.
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub response_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteParam {
    pub name: String,
    #[serde(rename = "in", default = "default_location")]
    pub location: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub ty: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_method() -> String {
    "get".to_string()
}

fn default_status() -> u16 {
    200
}

fn default_location() -> String {
    "query".to_string()
}

fn default_param_type() -> String {
    "str".to_string()
}

/// Load a manifest from a file.
///
/// # Errors
///
/// Returns `ManifestError::FileNotFound` if the file doesn't exist,
/// or `ManifestError::InvalidJson` if it isn't a valid manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_manifest_str(&content)
}

/// Load a manifest from a JSON string.
pub fn load_manifest_str(content: &str) -> Result<Manifest, ManifestError> {
    serde_json::from_str(content).map_err(|source| ManifestError::InvalidJson { source })
}

impl Manifest {
    /// Build the document: named types first, then one operation per route.
    ///
    /// # Errors
    ///
    /// Fails on unparsable or uncompilable type expressions, unknown HTTP
    /// methods or parameter locations, and entities that fail validation.
    pub fn to_document(&self, options: &CompileOptions) -> Result<OpenApi, ManifestError> {
        let named = self.named_schemas(options)?;
        let paths = self.paths(&named, options)?;

        let mut info = Info::builder().title(self.title.clone());
        if let Some(version) = &self.version {
            info = info.version(version.clone());
        }
        if let Some(description) = &self.description {
            info = info.description(description.clone());
        }

        let mut document = OpenApi::builder().info(info.build()?).paths(paths);
        if !named.is_empty() {
            document = document.components(Components::builder().schemas(named).build()?);
        }
        Ok(document.build()?)
    }

    /// Compile `types` in declaration order, each schema carrying its name.
    fn named_schemas(
        &self,
        options: &CompileOptions,
    ) -> Result<IndexMap<String, SchemaRef>, ManifestError> {
        let declared: IndexSet<&str> = self.types.keys().map(String::as_str).collect();
        let mut named: IndexMap<String, SchemaRef> = IndexMap::new();

        for (name, expr) in &self.types {
            let source = parse(name, expr)?;
            let overrides = Schema::builder().ref_name(name.clone()).0;
            let compiled = {
                let fallback = named_types(&declared, &named);
                let compiler = SchemaCompiler::new()
                    .fallback(&fallback)
                    .options(options.clone());
                compiler.compile(&source, &overrides)
            };
            let schema = compiled.map_err(|source| ManifestError::Compile {
                name: name.clone(),
                source,
            })?;
            tracing::debug!(name = %name, "compiled named type");
            named.insert(name.clone(), schema);
        }
        Ok(named)
    }

    fn paths(
        &self,
        named: &IndexMap<String, SchemaRef>,
        options: &CompileOptions,
    ) -> Result<IndexMap<String, PathItem>, ManifestError> {
        let declared: IndexSet<&str> = named.keys().map(String::as_str).collect();
        let fallback = named_types(&declared, named);
        let compiler = SchemaCompiler::new()
            .fallback(&fallback)
            .options(options.clone());
        let compile = |label: String, expr: &str| -> Result<SchemaRef, ManifestError> {
            let source = parse(&label, expr)?;
            compiler
                .compile(&source, &Schema::empty())
                .map_err(|source| ManifestError::Compile { name: label, source })
        };

        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        for route in &self.routes {
            let method = HttpMethod::parse(&route.method).ok_or_else(|| {
                ManifestError::UnknownMethod {
                    path: route.path.clone(),
                    method: route.method.clone(),
                }
            })?;
            let label = format!("{} {}", route.method.to_ascii_uppercase(), route.path);

            let mut response = Response::builder().description(
                route
                    .response_description
                    .clone()
                    .unwrap_or_else(|| "Successful response".to_string()),
            );
            if let Some(expr) = &route.response {
                let schema = compile(format!("{} response", label), expr)?;
                response = response.media_type(JSON, MediaType::builder().schema(schema).build()?);
            }

            let mut operation = Operation::builder().response(route.status, response.build()?);
            if let Some(summary) = &route.summary {
                operation = operation.summary(summary.clone());
            }
            if let Some(description) = &route.description {
                operation = operation.description(description.clone());
            }
            if let Some(operation_id) = &route.operation_id {
                operation = operation.operation_id(operation_id.clone());
            }
            if let Some(expr) = &route.request {
                let schema = compile(format!("{} request", label), expr)?;
                let body = RequestBody::builder()
                    .media_type(JSON, MediaType::builder().schema(schema).build()?)
                    .required(true)
                    .build()?;
                operation = operation.request_body(body);
            }
            if !route.params.is_empty() {
                let parameters = route
                    .params
                    .iter()
                    .map(|param| {
                        let schema = compile(format!("{} parameter {}", label, param.name), &param.ty)?;
                        build_parameter(&route.path, param, schema).map(RefOr::Item)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                operation = operation.parameters(parameters);
            }

            let mut operation = operation.build()?;
            if !route.tags.is_empty() {
                operation.add_tags(route.tags.iter().cloned());
            }

            let item = paths
                .entry(route.path.clone())
                .or_insert_with(|| PathItem::builder().0);
            *item = item.clone().edit().method(method, operation).build()?;
        }
        Ok(paths)
    }
}

fn parse(name: &str, expr: &str) -> Result<TypeDescriptor, ManifestError> {
    expr.parse().map_err(|source| ManifestError::Parse {
        name: name.to_string(),
        source,
    })
}

/// Fallback resolving manifest type names.
///
/// Names compiled so far resolve to their schema; names declared later (or
/// the type being compiled) resolve to a pointer; anything else goes to the
/// string-format fallback.
fn named_types<'a>(
    declared: &'a IndexSet<&'a str>,
    named: &'a IndexMap<String, SchemaRef>,
) -> impl Fn(&TypeDescriptor, &Schema) -> Option<SchemaRef> + 'a {
    move |source: &TypeDescriptor, overrides: &Schema| match source {
        TypeDescriptor::Named(name) => match named.get(name) {
            Some(schema) => Some(schema.clone()),
            None if declared.contains(name.as_str()) => {
                Some(Reference::to(ComponentKind::Schemas, name).into())
            }
            None => string_format(source, overrides),
        },
        _ => None,
    }
}

fn build_parameter(
    path: &str,
    param: &RouteParam,
    schema: SchemaRef,
) -> Result<Parameter, ManifestError> {
    let location =
        ParameterLocation::parse(&param.location).ok_or_else(|| ManifestError::UnknownLocation {
            path: path.to_string(),
            name: param.name.clone(),
            location: param.location.clone(),
        })?;

    let mut parameter = Parameter::builder()
        .name(param.name.clone())
        .in_(location)
        .schema(schema);
    if param.required || location == ParameterLocation::Path {
        parameter = parameter.required(true);
    }
    if let Some(description) = &param.description {
        parameter = parameter.description(description.clone());
    }
    Ok(parameter.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_document;
    use crate::types::RenderOptions;
    use serde_json::json;

    fn document(manifest: &str) -> serde_json::Value {
        let manifest = load_manifest_str(manifest).unwrap();
        let doc = manifest.to_document(&CompileOptions::default()).unwrap();
        render_document(&doc, &RenderOptions::default()).unwrap()
    }

    #[test]
    fn minimal_manifest() {
        let out = document(r#"{ "title": "Empty" }"#);
        assert_eq!(
            out,
            json!({
                "openapi": "3.0.0",
                "info": { "title": "Empty", "version": "0.0.1-dev" },
                "paths": {}
            })
        );
    }

    #[test]
    fn named_types_become_references() {
        let out = document(
            r#"{
                "title": "Pets",
                "version": "1.0.0",
                "types": { "Pet": "{name: str}" },
                "routes": [
                    { "path": "/pets", "response": "list[Pet]", "tags": ["pets", "pets"] }
                ]
            }"#,
        );

        let get = &out["paths"]["/pets"]["get"];
        assert_eq!(get["tags"], json!(["pets"]));
        assert_eq!(
            get["responses"]["200"]["content"]["application/json"]["schema"],
            json!({ "type": "array", "items": { "$ref": "#/components/schemas/Pet" } })
        );
        assert_eq!(
            out["components"]["schemas"]["Pet"],
            json!({ "type": "object", "properties": { "name": { "type": "string" } } })
        );
    }

    #[test]
    fn forward_and_self_references() {
        let out = document(
            r#"{
                "title": "Tree",
                "types": {
                    "Forest": "{trees: list[Tree]}",
                    "Tree": "{children: list[Tree], id: uuid}"
                }
            }"#,
        );
        let schemas = &out["components"]["schemas"];
        assert_eq!(
            schemas["Forest"]["properties"]["trees"]["items"],
            json!({ "$ref": "#/components/schemas/Tree" })
        );
        assert_eq!(
            schemas["Tree"]["properties"]["children"]["items"],
            json!({ "$ref": "#/components/schemas/Tree" })
        );
        assert_eq!(
            schemas["Tree"]["properties"]["id"],
            json!({ "type": "string", "format": "uuid" })
        );
    }

    #[test]
    fn routes_share_path_items() {
        let out = document(
            r#"{
                "title": "Pets",
                "routes": [
                    { "path": "/pets/{id}", "method": "get",
                      "params": [{ "name": "id", "in": "path", "type": "int" }] },
                    { "path": "/pets/{id}", "method": "DELETE", "status": 204 }
                ]
            }"#,
        );
        let item = &out["paths"]["/pets/{id}"];
        assert_eq!(
            item["get"]["parameters"][0],
            json!({
                "name": "id",
                "in": "path",
                "required": true,
                "schema": { "type": "integer", "format": "int64" }
            })
        );
        assert_eq!(
            item["delete"]["responses"]["204"],
            json!({ "description": "Successful response" })
        );
    }

    #[test]
    fn request_body_is_required_json() {
        let out = document(
            r#"{
                "title": "Pets",
                "routes": [{ "path": "/pets", "method": "post", "request": "{name: str}", "status": 201 }]
            }"#,
        );
        assert_eq!(
            out["paths"]["/pets"]["post"]["requestBody"],
            json!({
                "content": {
                    "application/json": {
                        "schema": { "type": "object", "properties": { "name": { "type": "string" } } }
                    }
                },
                "required": true
            })
        );
    }

    #[test]
    fn unknown_method_rejected() {
        let manifest =
            load_manifest_str(r#"{ "title": "x", "routes": [{ "path": "/", "method": "fetch" }] }"#)
                .unwrap();
        let err = manifest.to_document(&CompileOptions::default()).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownMethod { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_type_names_the_route() {
        let manifest = load_manifest_str(
            r#"{ "title": "x", "routes": [{ "path": "/w", "response": "Widget" }] }"#,
        )
        .unwrap();
        let err = manifest.to_document(&CompileOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type 'GET /w response': cannot create schema from type: Widget"
        );
    }

    #[test]
    fn missing_file() {
        let err = load_manifest(Path::new("/nonexistent/routes.json")).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
