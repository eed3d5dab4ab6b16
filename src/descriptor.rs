//! Source type descriptors accepted by the schema compiler.
//!
//! Descriptors come from three places:
//!
//! - built directly (`TypeDescriptor::Sequence(...)`)
//! - derived from Rust types through [`Describe`] (`TypeDescriptor::of::<Vec<i32>>()`)
//! - parsed from a type expression (`"dict[str, list[int]]".parse()`)

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ParseError;
use crate::model::SchemaRef;

/// A source type the compiler can turn into a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A finished schema or reference; compiled as-is.
    Schema(SchemaRef),
    /// A host primitive type.
    Primitive(Primitive),
    /// Homogeneous sequence. `None` leaves the item type open.
    Sequence(Option<Box<TypeDescriptor>>),
    /// String-keyed mapping as `(key, value)`. `None` leaves both open.
    Mapping(Option<Box<(TypeDescriptor, TypeDescriptor)>>),
    /// Any one of the alternatives. No alternatives means "anything".
    Union(Vec<TypeDescriptor>),
    /// Explicit `name → type` property table.
    Properties(IndexMap<String, TypeDescriptor>),
    /// A user-defined record type.
    Aggregate(Aggregate),
    /// A type only a fallback resolver knows about.
    Named(String),
}

impl TypeDescriptor {
    /// Descriptor for a Rust type.
    pub fn of<T: Describe + ?Sized>() -> Self {
        T::describe()
    }

    pub fn sequence_of(item: TypeDescriptor) -> Self {
        TypeDescriptor::Sequence(Some(Box::new(item)))
    }

    pub fn mapping_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Mapping(Some(Box::new((key, value))))
    }

    /// Short label used in error messages.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Schema(_) => f.write_str("schema"),
            TypeDescriptor::Primitive(primitive) => write!(f, "{}", primitive),
            TypeDescriptor::Sequence(None) => f.write_str("list[]"),
            TypeDescriptor::Sequence(Some(item)) => write!(f, "list[{}]", item),
            TypeDescriptor::Mapping(None) => f.write_str("dict[]"),
            TypeDescriptor::Mapping(Some(pair)) => write!(f, "dict[{}, {}]", pair.0, pair.1),
            TypeDescriptor::Union(members) => {
                f.write_str("union[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                f.write_str("]")
            }
            TypeDescriptor::Properties(properties) => {
                f.write_str("{")?;
                for (i, (name, ty)) in properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                f.write_str("}")
            }
            TypeDescriptor::Aggregate(aggregate) => f.write_str(&aggregate.name),
            TypeDescriptor::Named(name) => f.write_str(name),
        }
    }
}

impl From<SchemaRef> for TypeDescriptor {
    fn from(schema: SchemaRef) -> Self {
        TypeDescriptor::Schema(schema)
    }
}

impl From<Primitive> for TypeDescriptor {
    fn from(primitive: Primitive) -> Self {
        TypeDescriptor::Primitive(primitive)
    }
}

impl From<Aggregate> for TypeDescriptor {
    fn from(aggregate: Aggregate) -> Self {
        TypeDescriptor::Aggregate(aggregate)
    }
}

/// Host primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Str,
    Char,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Untyped list.
    List,
    /// Untyped tuple.
    Tuple,
}

impl Primitive {
    pub fn is_textual(self) -> bool {
        matches!(self, Primitive::Str | Primitive::Char)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, Primitive::Bool)
    }

    /// Types that convert losslessly into an integer. `bool` is one of them
    /// (`i64::from(true)`), so check `is_boolean` first.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Primitive::Bool
                | Primitive::I8
                | Primitive::I16
                | Primitive::I32
                | Primitive::I64
                | Primitive::U8
                | Primitive::U16
                | Primitive::U32
                | Primitive::U64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    pub fn is_sequence(self) -> bool {
        matches!(self, Primitive::List | Primitive::Tuple)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::Str => "str",
            Primitive::Char => "char",
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "int",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "float",
            Primitive::List => "list",
            Primitive::Tuple => "tuple",
        };
        f.write_str(name)
    }
}

/// Member list of an aggregate, produced on demand so recursive types can
/// describe themselves.
pub type Members = fn() -> Vec<(String, TypeDescriptor)>;

/// A user-defined record type.
///
/// Only plain aggregates (no declared parent type) are compiled from their
/// members; derived ones are left to the fallback resolver.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub name: String,
    pub parent: Option<String>,
    members: Members,
}

impl Aggregate {
    pub fn plain(name: impl Into<String>, members: Members) -> Self {
        Self {
            name: name.into(),
            parent: None,
            members,
        }
    }

    pub fn derived(name: impl Into<String>, parent: impl Into<String>, members: Members) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            members,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.parent.is_none()
    }

    /// Distinguishes same-named aggregates declared by different types.
    pub(crate) fn identity(&self) -> (&str, usize) {
        (&self.name, self.members as usize)
    }

    /// Public members; names starting with `_` are private.
    pub fn members(&self) -> IndexMap<String, TypeDescriptor> {
        (self.members)()
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .collect()
    }
}

impl PartialEq for Aggregate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.parent == other.parent
    }
}

/// Rust types that know their own descriptor.
pub trait Describe {
    fn describe() -> TypeDescriptor;
}

macro_rules! describe_primitive {
    ($($ty:ty => $primitive:ident),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::Primitive(Primitive::$primitive)
                }
            }
        )*
    };
}

describe_primitive! {
    String => Str,
    str => Str,
    char => Char,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => U64,
    f32 => F32,
    f64 => F64,
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence_of(T::describe())
    }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence_of(T::describe())
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::mapping_of(K::describe(), V::describe())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::mapping_of(K::describe(), V::describe())
    }
}

impl<K: Describe, V: Describe, S> Describe for IndexMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::mapping_of(K::describe(), V::describe())
    }
}

impl Describe for Value {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Union(Vec::new())
    }
}

// --- Type expressions ---

impl FromStr for TypeDescriptor {
    type Err = ParseError;

    /// Parse a type expression.
    ///
    /// ```text
    /// str | int | float | bool | list | tuple | any
    /// list[T] | list[] | dict[K, V] | dict[] | union[A, B, ...]
    /// {name: T, other: U}
    /// <anything else>            → Named
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            src: s,
            pos: 0,
            depth: 0,
        };
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos < s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

/// Deepest bracket or brace nesting a type expression may use.
pub const MAX_EXPRESSION_DEPTH: usize = 128;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn parse_type(&mut self) -> Result<TypeDescriptor, ParseError> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(self.error("type expression nests too deeply"));
        }
        self.depth += 1;
        let ty = self.parse_term();
        self.depth -= 1;
        ty
    }

    fn parse_term(&mut self) -> Result<TypeDescriptor, ParseError> {
        self.skip_whitespace();
        if self.eat('{') {
            return self.parse_properties();
        }

        let start = self.pos;
        let ident = self.ident()?;
        let ty = match ident.to_ascii_lowercase().as_str() {
            "str" | "string" => TypeDescriptor::Primitive(Primitive::Str),
            "int" | "integer" => TypeDescriptor::Primitive(Primitive::I64),
            "float" | "double" | "number" => TypeDescriptor::Primitive(Primitive::F64),
            "bool" | "boolean" => TypeDescriptor::Primitive(Primitive::Bool),
            "tuple" => TypeDescriptor::Primitive(Primitive::Tuple),
            "any" => TypeDescriptor::Union(Vec::new()),
            "list" | "array" => {
                if !self.eat('[') {
                    return Ok(TypeDescriptor::Primitive(Primitive::List));
                }
                let mut params = self.parse_params()?;
                match params.len() {
                    0 => TypeDescriptor::Sequence(None),
                    1 => TypeDescriptor::sequence_of(params.remove(0)),
                    n => return Err(self.error_at(start, format!("list takes 1 parameter, got {}", n))),
                }
            }
            "dict" | "map" => {
                if !self.eat('[') {
                    return Ok(TypeDescriptor::Mapping(None));
                }
                let mut params = self.parse_params()?;
                match params.len() {
                    0 => TypeDescriptor::Mapping(None),
                    2 => {
                        let value = params.remove(1);
                        let key = params.remove(0);
                        TypeDescriptor::mapping_of(key, value)
                    }
                    n => return Err(self.error_at(start, format!("dict takes 2 parameters, got {}", n))),
                }
            }
            "union" => {
                if !self.eat('[') {
                    return Err(self.error("expected '[' after union"));
                }
                TypeDescriptor::Union(self.parse_params()?)
            }
            _ => TypeDescriptor::Named(ident.to_string()),
        };
        Ok(ty)
    }

    /// Comma-separated types up to the closing `]`; the `[` is already consumed.
    fn parse_params(&mut self) -> Result<Vec<TypeDescriptor>, ParseError> {
        let mut params = Vec::new();
        self.skip_whitespace();
        if self.eat(']') {
            return Ok(params);
        }
        loop {
            params.push(self.parse_type()?);
            self.skip_whitespace();
            if self.eat(']') {
                return Ok(params);
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or ']'"));
            }
        }
    }

    /// `name: type` pairs up to the closing `}`; the `{` is already consumed.
    fn parse_properties(&mut self) -> Result<TypeDescriptor, ParseError> {
        let mut properties = IndexMap::new();
        loop {
            self.skip_whitespace();
            if self.eat('}') {
                return Ok(TypeDescriptor::Properties(properties));
            }
            let name = self.ident()?.to_string();
            self.skip_whitespace();
            if !self.eat(':') {
                return Err(self.error("expected ':' after property name"));
            }
            let ty = self.parse_type()?;
            properties.insert(name, ty);
            self.skip_whitespace();
            if !self.eat(',') {
                self.skip_whitespace();
                if self.eat('}') {
                    return Ok(TypeDescriptor::Properties(properties));
                }
                return Err(self.error("expected ',' or '}'"));
            }
        }
    }

    fn ident(&mut self) -> Result<&'a str, ParseError> {
        self.skip_whitespace();
        let src = self.src;
        let start = self.pos;
        let len = src[start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
            .unwrap_or(src.len() - start);
        if len == 0 {
            return Err(self.error("expected a type name"));
        }
        self.pos += len;
        Ok(&src[start..self.pos])
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.src[self.pos..].starts_with(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, message: &str) -> ParseError {
        self.error_at(self.pos, message.to_string())
    }

    fn error_at(&self, position: usize, message: String) -> ParseError {
        ParseError { position, message }
    }
}
