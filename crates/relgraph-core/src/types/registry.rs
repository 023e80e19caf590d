//! Type registry with name-based deduplication.

use std::collections::HashMap;

use super::{EnumType, InputObjectType, ObjectType, TypeDef, TypeRef, BUILTIN_SCALARS};
use crate::error::SchemaError;

/// Registered type definitions, in registration order.
///
/// Registering a definition identical to an existing one under the same
/// name is a no-op returning the same reference. A different definition
/// under an existing name fails with [`SchemaError::NameCollision`].
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Vec<TypeDef>,
    index: HashMap<String, usize>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition and return a reference to it.
    pub fn register(&mut self, def: impl Into<TypeDef>) -> Result<TypeRef, SchemaError> {
        let def = def.into();
        let name = def.name().to_string();

        if BUILTIN_SCALARS.contains(&name.as_str()) {
            return Err(SchemaError::NameCollision {
                name,
                detail: "shadows a built-in scalar".to_string(),
            });
        }

        if let Some(&existing) = self.index.get(&name) {
            if self.types[existing] == def {
                return Ok(TypeRef::Named(name));
            }
            return Err(SchemaError::NameCollision {
                detail: format!(
                    "already defined as a different {}",
                    self.types[existing].keyword()
                ),
                name,
            });
        }

        self.index.insert(name.clone(), self.types.len());
        self.types.push(def);
        Ok(TypeRef::Named(name))
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up an object type.
    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        match self.get(name)? {
            TypeDef::Object(t) => Some(t),
            _ => None,
        }
    }

    /// Look up an input object type.
    pub fn input_object(&self, name: &str) -> Option<&InputObjectType> {
        match self.get(name)? {
            TypeDef::InputObject(t) => Some(t),
            _ => None,
        }
    }

    /// Look up an enum type.
    pub fn enumeration(&self, name: &str) -> Option<&EnumType> {
        match self.get(name)? {
            TypeDef::Enum(t) => Some(t),
            _ => None,
        }
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
