//! GraphQL type representation and generation.
//!
//! - [`TypeRef`] and the definition structs describe generated types
//! - [`TypeRegistry`] holds one definition per name and rejects collisions
//! - [`generate`] derives every type and root operation from a [`Schema`]
//! - [`print_sdl`] renders a registry as GraphQL SDL
//!
//! [`Schema`]: crate::catalog::Schema

mod generator;
mod registry;
mod sdl;

pub use generator::{
    generate, type_prefix, GeneratedSchema, RelationShape, SelectShape, ShapeId, TableTypes,
    MUTATION_SUCCESS_TYPE, ORDER_DIRECTION_TYPE,
};
pub use registry::TypeRegistry;
pub use sdl::print_sdl;

use std::fmt;

/// Names of the built-in scalars, never registered or printed.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Reference to a type, with list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    /// Reference a named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// Wrap a type in a list.
    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    /// Make the type non-null. Already non-null types are returned as is.
    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    /// Whether the outermost wrapper is non-null.
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Whether the type is a list (ignoring non-null).
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::List(_) => true,
            TypeRef::Named(_) => false,
        }
    }

    /// Name of the innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
        }
    }
}

/// An argument or input object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputValueDef {
    pub name: String,
    pub ty: TypeRef,
    pub description: Option<String>,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
        }
    }
}

/// A field of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub args: Vec<InputValueDef>,
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            args: Vec::new(),
            description: None,
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.args.push(InputValueDef::new(name, ty));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn arg(&self, name: &str) -> Option<&InputValueDef> {
        self.args.iter().find(|a| a.name == name)
    }
}

/// Output object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub description: Option<String>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
            description: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Input object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputObjectType {
    pub name: String,
    pub fields: Vec<InputValueDef>,
    pub description: Option<String>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>, fields: Vec<InputValueDef>) -> Self {
        Self {
            name: name.into(),
            fields,
            description: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&InputValueDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
    pub description: Option<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
            description: None,
        }
    }
}

/// Custom scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Any named type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    InputObject(InputObjectType),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar(t) => &t.name,
            TypeDef::Enum(t) => &t.name,
            TypeDef::Object(t) => &t.name,
            TypeDef::InputObject(t) => &t.name,
        }
    }

    /// Kind keyword as used in SDL.
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeDef::Scalar(_) => "scalar",
            TypeDef::Enum(_) => "enum",
            TypeDef::Object(_) => "type",
            TypeDef::InputObject(_) => "input",
        }
    }
}

impl From<ScalarType> for TypeDef {
    fn from(t: ScalarType) -> Self {
        TypeDef::Scalar(t)
    }
}

impl From<EnumType> for TypeDef {
    fn from(t: EnumType) -> Self {
        TypeDef::Enum(t)
    }
}

impl From<ObjectType> for TypeDef {
    fn from(t: ObjectType) -> Self {
        TypeDef::Object(t)
    }
}

impl From<InputObjectType> for TypeDef {
    fn from(t: InputObjectType) -> Self {
        TypeDef::InputObject(t)
    }
}
