//! Catalog interface for the PLScript compiler.
//!
//! The compiler consults the host database's catalog for type, relation and
//! attribute metadata. This crate defines that boundary as the read-only
//! [`Catalog`] trait together with the metadata records it hands back, plus
//! [`MemoryCatalog`], an in-memory implementation used by tests and
//! embedders.
//!
//! The compiler never writes through this interface. Every lookup returns
//! `Option`; classifying a miss (user-visible definition error versus
//! internal inconsistency) is the caller's decision.

pub mod memory;

pub use memory::MemoryCatalog;

use plscript_core::{Oid, ShapeId};

/// How a type behaves for classification purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Ordinary base type.
    Base,
    /// User-defined enum.
    Enum,
    /// Range over some subtype.
    Range,
    /// Multirange over some subtype.
    Multirange,
    /// Named composite (row) type.
    Composite,
    /// Domain over another type.
    Domain,
    /// Pseudo-type: not a concrete, storable type.
    Pseudo,
}

/// Catalog metadata for one type.
#[derive(Debug, Clone)]
pub struct TypeMetadata {
    pub oid: Oid,
    pub name: String,
    pub kind: TypeKind,
    /// Storage width in bytes; -1 for variable-length types.
    pub len: i16,
    /// Whether values are passed by value rather than by reference.
    pub by_value: bool,
    /// The type's own default collation; `None` for non-collatable types.
    pub collation: Option<Oid>,
    /// False for shell types: created but never fully defined.
    pub is_defined: bool,
    /// For domains, the type this domain is over.
    pub base_type: Option<Oid>,
    /// For true array types, the element type.
    pub element_type: Option<Oid>,
    /// The corresponding array type, when one is registered.
    pub array_type: Option<Oid>,
    /// True when values of the type can never be stored out of line.
    /// Arrays with plain storage are not treated as expandable arrays.
    pub plain_storage: bool,
}

/// Catalog metadata for one relation.
#[derive(Debug, Clone)]
pub struct RelationMetadata {
    pub oid: Oid,
    pub name: String,
    /// The relation's row type, when the relkind has one.
    pub row_type: Option<Oid>,
}

/// Catalog metadata for one relation attribute.
#[derive(Debug, Clone)]
pub struct AttributeMetadata {
    pub name: String,
    pub type_oid: Oid,
    pub typmod: Option<i32>,
    pub collation: Option<Oid>,
}

/// Read-only access to the host database's catalogs.
///
/// Implementations must be safe for concurrent reads; the compiler never
/// mutates catalog state and holds no lookup results across sessions.
pub trait Catalog {
    /// Look up a type by oid.
    fn lookup_type(&self, oid: Oid) -> Option<&TypeMetadata>;

    /// Look up a relation by (possibly schema-qualified) name.
    fn lookup_relation(&self, name: &str) -> Option<&RelationMetadata>;

    /// Look up an attribute of a relation by name.
    fn lookup_attribute(&self, relation: Oid, name: &str) -> Option<&AttributeMetadata>;

    /// Current structural shape of a composite type (or domain over one).
    ///
    /// Returns `None` when the type is not composite. The id changes whenever
    /// the type's field layout changes, including drops.
    fn structural_shape(&self, type_oid: Oid) -> Option<ShapeId>;

    /// The array type registered for the given type, if any.
    fn array_type_of(&self, type_oid: Oid) -> Option<Oid> {
        self.lookup_type(type_oid)?.array_type
    }

    /// Follow a domain chain down to its non-domain base type.
    fn resolve_base_type(&self, oid: Oid) -> Option<&TypeMetadata> {
        let mut meta = self.lookup_type(oid)?;
        // Domains can nest; catalogs guarantee the chain is acyclic, but cap
        // the walk so a corrupt catalog cannot hang compilation.
        for _ in 0..64 {
            match (meta.kind, meta.base_type) {
                (TypeKind::Domain, Some(base)) => meta = self.lookup_type(base)?,
                _ => return Some(meta),
            }
        }
        None
    }

    /// Whether the type is a row type: a named composite, a domain over one,
    /// or the generic record pseudo-type.
    fn type_is_composite(&self, oid: Oid) -> bool {
        oid == plscript_core::oids::RECORD
            || self
                .resolve_base_type(oid)
                .is_some_and(|meta| meta.kind == TypeKind::Composite)
    }
}
