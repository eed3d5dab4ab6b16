//! Type-to-schema compiler.
//!
//! Classification runs in a fixed order and the first step that claims the
//! source wins:
//!
//! 1. finished schemas and references pass through unchanged
//! 2. containers: sequences, mappings, unions
//! 3. primitives, via [`PRIMITIVE_TABLE`]
//! 4. explicit property tables
//! 5. plain aggregates (no declared parent)
//! 6. the fallback resolver, if one was supplied
//!
//! A step that does not apply abstains and the next one is tried; only when
//! every step abstains is `CompileError::Unresolved` reported. Failures inside member types are wrapped in
//! `CompileError::Nested` with the path to the member.

use indexmap::IndexMap;

use crate::descriptor::{Aggregate, Describe, Primitive, TypeDescriptor};
use crate::error::CompileError;
use crate::model::{Schema, SchemaRef};
use crate::types::CompileOptions;

/// Schema fragment per primitive category, tested top to bottom.
///
/// `boolean` sits above `integer`: `bool` converts losslessly into every
/// integer type, so `Primitive::is_integral` accepts it too.
pub const PRIMITIVE_TABLE: &[(fn(Primitive) -> bool, &str, Option<&str>)] = &[
    (Primitive::is_textual, "string", None),
    (Primitive::is_boolean, "boolean", None),
    (Primitive::is_integral, "integer", Some("int64")),
    (Primitive::is_floating, "number", Some("double")),
    (Primitive::is_sequence, "array", None),
];

/// Last-resort resolver for sources no built-in step understands.
///
/// Receives the original source and the caller's keyword overrides; its
/// result is used as-is.
pub trait Fallback {
    fn resolve(&self, source: &TypeDescriptor, overrides: &Schema) -> Option<SchemaRef>;
}

impl<F> Fallback for F
where
    F: Fn(&TypeDescriptor, &Schema) -> Option<SchemaRef>,
{
    fn resolve(&self, source: &TypeDescriptor, overrides: &Schema) -> Option<SchemaRef> {
        self(source, overrides)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Passthrough,
    Container,
    Primitive,
    Properties,
    Aggregate,
    Fallback,
}

impl Step {
    const ORDER: [Step; 6] = [
        Step::Passthrough,
        Step::Container,
        Step::Primitive,
        Step::Properties,
        Step::Aggregate,
        Step::Fallback,
    ];
}

/// State of one top-level compilation.
#[derive(Default)]
struct Walk {
    path: Vec<String>,
    /// Aggregates currently being expanded, by name and member table.
    active: Vec<(String, usize)>,
}

impl Walk {
    fn path(&self) -> String {
        if self.path.is_empty() {
            "#".to_string()
        } else {
            self.path.join("/")
        }
    }
}

/// Compiles [`TypeDescriptor`]s into schemas.
///
/// # Example
///
/// ```
/// use oas3_model::{SchemaCompiler, Schema, TypeDescriptor};
///
/// let source: TypeDescriptor = "list[int]".parse().unwrap();
/// let schema = SchemaCompiler::new().compile(&source, &Schema::empty()).unwrap();
/// let schema = schema.as_item().unwrap();
/// assert_eq!(schema.type_().map(String::as_str), Some("array"));
/// ```
#[derive(Default)]
pub struct SchemaCompiler<'f> {
    fallback: Option<&'f dyn Fallback>,
    options: CompileOptions,
}

impl<'f> SchemaCompiler<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult `fallback` when no built-in step applies, at every nesting level.
    pub fn fallback(mut self, fallback: &'f dyn Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile `source`, then apply every keyword `overrides` supplies.
    ///
    /// # Errors
    ///
    /// - `CompileError::Unresolved` if nothing, fallback included, claims `source`
    /// - `CompileError::Nested` if a member type fails
    /// - `CompileError::DepthExceeded` / `CompileError::Cycle` for runaway nesting
    pub fn compile(
        &self,
        source: &TypeDescriptor,
        overrides: &Schema,
    ) -> Result<SchemaRef, CompileError> {
        self.compile_at(source, overrides, &mut Walk::default())
    }

    fn compile_at(
        &self,
        source: &TypeDescriptor,
        overrides: &Schema,
        walk: &mut Walk,
    ) -> Result<SchemaRef, CompileError> {
        if walk.path.len() > self.options.max_depth {
            return Err(CompileError::DepthExceeded {
                limit: self.options.max_depth,
                path: walk.path(),
            });
        }

        for step in Step::ORDER {
            if let Some(schema) = self.apply(step, source, overrides, walk)? {
                return Ok(schema);
            }
            tracing::debug!(?step, source = %source, "classification step abstained");
        }

        Err(CompileError::Unresolved {
            source_type: source.label(),
        })
    }

    /// `Ok(None)` when `step` does not apply to `source`.
    fn apply(
        &self,
        step: Step,
        source: &TypeDescriptor,
        overrides: &Schema,
        walk: &mut Walk,
    ) -> Result<Option<SchemaRef>, CompileError> {
        let schema = match step {
            Step::Passthrough => {
                return Ok(match source {
                    TypeDescriptor::Schema(schema) => Some(schema.clone()),
                    _ => None,
                });
            }
            Step::Fallback => return Ok(self.resolve_fallback(source, overrides)),
            Step::Container => self.container(source, walk)?,
            Step::Primitive => primitive(source),
            Step::Properties => match source {
                TypeDescriptor::Properties(properties) => Some(self.properties(properties, walk)?),
                _ => None,
            },
            Step::Aggregate => match source {
                TypeDescriptor::Aggregate(aggregate) if aggregate.is_plain() => {
                    Some(self.aggregate(aggregate, walk)?)
                }
                _ => None,
            },
        };
        Ok(schema.map(|mut schema| {
            schema.overlay(overrides);
            schema.into()
        }))
    }

    fn container(
        &self,
        source: &TypeDescriptor,
        walk: &mut Walk,
    ) -> Result<Option<Schema>, CompileError> {
        let schema = match source {
            TypeDescriptor::Sequence(item) => {
                let mut builder = Schema::builder().type_("array");
                if let Some(item) = item {
                    builder = builder.items(self.nested("items".into(), item, walk)?);
                }
                builder
            }
            TypeDescriptor::Mapping(pair) => {
                let mut builder = Schema::builder().type_("object");
                if let Some(pair) = pair {
                    let value = self.nested("additionalProperties".into(), &pair.1, walk)?;
                    builder = builder.additional_properties(value);
                }
                builder
            }
            TypeDescriptor::Union(alternatives) if alternatives.is_empty() => Schema::builder(),
            TypeDescriptor::Union(alternatives) => {
                let any_of = alternatives
                    .iter()
                    .enumerate()
                    .map(|(i, alternative)| self.nested(format!("anyOf/{}", i), alternative, walk))
                    .collect::<Result<Vec<_>, _>>()?;
                Schema::builder().any_of(any_of)
            }
            _ => return Ok(None),
        };
        Ok(Some(schema.0))
    }

    fn properties(
        &self,
        properties: &IndexMap<String, TypeDescriptor>,
        walk: &mut Walk,
    ) -> Result<Schema, CompileError> {
        let mut compiled = IndexMap::with_capacity(properties.len());
        for (name, ty) in properties {
            let schema = self.nested(format!("properties/{}", name), ty, walk)?;
            compiled.insert(name.clone(), schema);
        }
        Ok(Schema::builder().type_("object").properties(compiled).0)
    }

    fn aggregate(&self, aggregate: &Aggregate, walk: &mut Walk) -> Result<Schema, CompileError> {
        let (name, members) = aggregate.identity();
        if walk.active.iter().any(|(n, m)| n == name && *m == members) {
            return Err(CompileError::Cycle {
                name: aggregate.name.clone(),
                path: walk.path(),
            });
        }

        walk.active.push((name.to_string(), members));
        let result = self.properties(&aggregate.members(), walk);
        walk.active.pop();

        let mut schema = result?;
        schema.title = crate::field::Field::Present(aggregate.name.clone());
        Ok(schema)
    }

    fn resolve_fallback(&self, source: &TypeDescriptor, overrides: &Schema) -> Option<SchemaRef> {
        let fallback = self.fallback?;
        tracing::debug!(source = %source, "consulting fallback resolver");
        fallback.resolve(source, overrides)
    }

    fn nested(
        &self,
        segment: String,
        source: &TypeDescriptor,
        walk: &mut Walk,
    ) -> Result<SchemaRef, CompileError> {
        walk.path.push(segment);
        let result = self.compile_at(source, &Schema::empty(), walk);
        let segment = walk.path.pop().unwrap_or_default();
        result.map_err(|err| CompileError::nested(&segment, err))
    }
}

fn primitive(source: &TypeDescriptor) -> Option<Schema> {
    let TypeDescriptor::Primitive(primitive) = source else {
        return None;
    };
    let (_, type_, format) = PRIMITIVE_TABLE
        .iter()
        .find(|(matches, _, _)| matches(*primitive))?;

    let mut builder = Schema::builder().type_(*type_);
    if let Some(format) = format {
        builder = builder.format(*format);
    }
    Some(builder.0)
}

/// Compile `source` with default options and no fallback.
pub fn compile(source: &TypeDescriptor, overrides: &Schema) -> Result<SchemaRef, CompileError> {
    SchemaCompiler::new().compile(source, overrides)
}

/// Fallback for well-known string formats named by type expressions:
/// `uuid`, `date`, `date-time`, `byte`, `binary`, `password`.
pub fn string_format(source: &TypeDescriptor, overrides: &Schema) -> Option<SchemaRef> {
    let TypeDescriptor::Named(name) = source else {
        return None;
    };
    let format = match name.as_str() {
        "uuid" | "date" | "date-time" | "byte" | "binary" | "password" => name.as_str(),
        "datetime" => "date-time",
        _ => return None,
    };
    let mut schema = Schema::builder().type_("string").format(format).0;
    schema.overlay(overrides);
    Some(schema.into())
}

impl Schema {
    /// Schema for a Rust type.
    ///
    /// ```
    /// use oas3_model::Schema;
    ///
    /// let schema = Schema::from_type::<Vec<bool>>().unwrap();
    /// let items = schema.as_item().unwrap().items().unwrap();
    /// assert_eq!(items.as_item().unwrap().type_().map(String::as_str), Some("boolean"));
    /// ```
    pub fn from_type<T: Describe + ?Sized>() -> Result<SchemaRef, CompileError> {
        compile(&T::describe(), &Schema::empty())
    }

    /// `type: object` schema from a `name → type` table, with `overrides`
    /// applied on top.
    pub fn from_properties<I, K>(properties: I, overrides: &Schema) -> Result<SchemaRef, CompileError>
    where
        I: IntoIterator<Item = (K, TypeDescriptor)>,
        K: Into<String>,
    {
        let properties = properties
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .collect();
        compile(&TypeDescriptor::Properties(properties), overrides)
    }
}
