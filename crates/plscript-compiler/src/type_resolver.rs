//! Type resolution against the host catalog.
//!
//! This module provides [`TypeResolver`], which turns catalog type metadata
//! into the [`TypeDescriptor`]s the rest of the compiler works with:
//! classification (scalar / composite / pseudo), storage traits, effective
//! collation, array detection, and, for named composite types, the current
//! structural shape, cached for later re-validation.

use plscript_catalog::{Catalog, TypeKind};
use plscript_core::{CompileError, Oid, ShapeId, oids};

type Result<T> = std::result::Result<T, CompileError>;

/// How a resolved type behaves for variable construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// Ordinary scalar: base, enum, range, multirange, or a domain over one.
    Scalar,
    /// Row-shaped: named composite, domain over one, or generic record.
    Composite,
    /// Not concrete; a variable of this type cannot exist.
    Pseudo,
}

/// The parsed form of a type name as the user wrote it.
///
/// Kept only for named composite types, where re-validation after a catalog
/// change may need to re-derive the type from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTypeName {
    pub parts: Vec<String>,
}

impl ParsedTypeName {
    pub fn new(parts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }
}

/// A resolved type, ready to declare variables of.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub oid: Oid,
    pub name: String,
    pub class: TypeClass,
    /// Storage width in bytes; -1 for variable-length types.
    pub len: i16,
    pub by_value: bool,
    /// Effective collation after applying any override.
    pub collation: Option<Oid>,
    /// True array type, or domain over one.
    pub is_array: bool,
    pub typmod: Option<i32>,
    /// What the user wrote, for named composites resolved from source text.
    pub origin_name: Option<ParsedTypeName>,
    /// Structural shape at resolution time; named composites only.
    pub shape: Option<ShapeId>,
}

/// Resolves catalog types to [`TypeDescriptor`]s.
pub struct TypeResolver<'cat> {
    catalog: &'cat dyn Catalog,
}

impl<'cat> TypeResolver<'cat> {
    /// Create a resolver over the given catalog.
    pub fn new(catalog: &'cat dyn Catalog) -> Self {
        Self { catalog }
    }

    /// The catalog this resolver consults.
    pub fn catalog(&self) -> &'cat dyn Catalog {
        self.catalog
    }

    /// Build a descriptor for the type with the given oid.
    ///
    /// `collation` overrides the type's own default collation, but only for
    /// collatable types; it is ignored otherwise. `origin_name` is the
    /// parsed spelling from the source text, kept to support re-validation
    /// of named composite types; pass `None` when the type was identified by
    /// oid to begin with (e.g. argument types).
    pub fn resolve(
        &self,
        oid: Oid,
        typmod: Option<i32>,
        collation: Option<Oid>,
        origin_name: Option<ParsedTypeName>,
    ) -> Result<TypeDescriptor> {
        let meta = self
            .catalog
            .lookup_type(oid)
            .ok_or_else(|| CompileError::internal(format!("catalog lookup failed for type {oid}")))?;

        if !meta.is_defined {
            return Err(CompileError::definition(format!(
                "type \"{}\" is only a shell",
                meta.name
            )));
        }

        let class = match meta.kind {
            TypeKind::Base | TypeKind::Enum | TypeKind::Range | TypeKind::Multirange => {
                TypeClass::Scalar
            }
            TypeKind::Composite => TypeClass::Composite,
            TypeKind::Domain => {
                if self.catalog.type_is_composite(meta.base_type.unwrap_or(Oid::INVALID)) {
                    TypeClass::Composite
                } else {
                    TypeClass::Scalar
                }
            }
            TypeKind::Pseudo => {
                if oid == oids::RECORD {
                    TypeClass::Composite
                } else {
                    TypeClass::Pseudo
                }
            }
        };

        // The override only applies when the type is collatable at all.
        let effective_collation = match (collation, meta.collation) {
            (Some(over), Some(_)) => Some(over),
            (_, own) => own,
        };

        let is_array = match meta.kind {
            TypeKind::Base => meta.element_type.is_some() && !meta.plain_storage,
            TypeKind::Domain => {
                meta.len == -1
                    && !meta.plain_storage
                    && self
                        .catalog
                        .resolve_base_type(oid)
                        .is_some_and(|base| base.element_type.is_some())
            }
            _ => false,
        };

        // Named composites (and domains over them) carry their current shape
        // so later accesses can detect catalog changes, including drops.
        let shape = if class == TypeClass::Composite && oid != oids::RECORD {
            let shape = self.catalog.structural_shape(oid).ok_or_else(|| {
                CompileError::definition(format!("type \"{}\" is not composite", meta.name))
            })?;
            Some(shape)
        } else {
            None
        };

        Ok(TypeDescriptor {
            oid,
            name: meta.name.clone(),
            class,
            len: meta.len,
            by_value: meta.by_value,
            collation: effective_collation,
            is_array,
            typmod,
            origin_name: if shape.is_some() { origin_name } else { None },
            shape,
        })
    }

    /// Build the array type over the given element type.
    ///
    /// An already-array type is returned unchanged; there are no nested
    /// arrays. Typmod and collation carry over from the element type.
    pub fn array_of(&self, dtype: &TypeDescriptor) -> Result<TypeDescriptor> {
        if dtype.is_array {
            return Ok(dtype.clone());
        }

        let array_oid = self.catalog.array_type_of(dtype.oid).ok_or_else(|| {
            CompileError::definition(format!(
                "could not find array type for data type \"{}\"",
                dtype.name
            ))
        })?;

        self.resolve(array_oid, dtype.typmod, dtype.collation, None)
    }

    /// Re-fetch the current structural shape of a composite descriptor.
    ///
    /// Compares against [`TypeDescriptor::shape`] to detect that the
    /// underlying row layout changed since the descriptor was built.
    pub fn current_shape(&self, dtype: &TypeDescriptor) -> Result<ShapeId> {
        self.catalog.structural_shape(dtype.oid).ok_or_else(|| {
            CompileError::definition(format!("type \"{}\" is not composite", dtype.name))
        })
    }
}
