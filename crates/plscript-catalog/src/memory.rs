//! In-memory catalog implementation.
//!
//! [`MemoryCatalog`] backs the compiler's test suite and embedders that have
//! no live database underneath. [`MemoryCatalog::with_builtins`] pre-seeds
//! the types the compiler itself needs to name: the boolean and trigger
//! context scalars, their array types, the pseudo-types and the polymorphic
//! family, plus the validation-mode substitutes for polymorphic parameters.
//!
//! Composite shape identifiers are xxh64 digests over the field layout and a
//! per-type generation counter, so any [`MemoryCatalog::alter_composite`]
//! call yields a fresh [`ShapeId`] even if the old layout is later restored.

use rustc_hash::FxHashMap;
use xxhash_rust::xxh64::Xxh64;

use plscript_core::{Oid, ShapeId, oids};

use crate::{AttributeMetadata, Catalog, RelationMetadata, TypeKind, TypeMetadata};

#[derive(Debug, Clone)]
struct CompositeShape {
    fields: Vec<(String, Oid)>,
    generation: u32,
}

impl CompositeShape {
    fn shape_id(&self) -> ShapeId {
        let mut hasher = Xxh64::new(0);
        hasher.update(&self.generation.to_le_bytes());
        for (name, oid) in &self.fields {
            hasher.update(name.as_bytes());
            hasher.update(&oid.raw().to_le_bytes());
        }
        ShapeId::new(hasher.digest())
    }
}

/// An in-memory, mutable catalog.
///
/// Mutation happens only through the registration helpers below; through the
/// [`Catalog`] trait the contents are read-only, matching the compiler's
/// contract with a live database catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    types: FxHashMap<Oid, TypeMetadata>,
    relations: FxHashMap<String, RelationMetadata>,
    relations_by_oid: FxHashMap<Oid, Vec<AttributeMetadata>>,
    composites: FxHashMap<Oid, CompositeShape>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in types pre-registered.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register_builtins();
        catalog
    }

    /// Register one type, replacing any previous entry for its oid.
    pub fn register_type(&mut self, meta: TypeMetadata) {
        self.types.insert(meta.oid, meta);
    }

    /// Register a shell type: named in the catalog but never defined.
    pub fn register_shell_type(&mut self, oid: Oid, name: &str) {
        self.register_type(TypeMetadata {
            oid,
            name: name.to_string(),
            kind: TypeKind::Base,
            len: -1,
            by_value: false,
            collation: None,
            is_defined: false,
            base_type: None,
            element_type: None,
            array_type: None,
            plain_storage: false,
        });
    }

    /// Register a named composite type with the given field layout.
    pub fn define_composite(&mut self, oid: Oid, name: &str, fields: &[(&str, Oid)]) {
        self.register_type(TypeMetadata {
            oid,
            name: name.to_string(),
            kind: TypeKind::Composite,
            len: -1,
            by_value: false,
            collation: None,
            is_defined: true,
            base_type: None,
            element_type: None,
            array_type: None,
            plain_storage: false,
        });
        self.composites.insert(
            oid,
            CompositeShape {
                fields: fields
                    .iter()
                    .map(|(n, t)| (n.to_string(), *t))
                    .collect(),
                generation: 0,
            },
        );
    }

    /// Register a domain over an existing type.
    pub fn define_domain(&mut self, oid: Oid, name: &str, base: Oid) {
        let base_meta = self
            .types
            .get(&base)
            .expect("domain base type must be registered first")
            .clone();
        self.register_type(TypeMetadata {
            oid,
            name: name.to_string(),
            kind: TypeKind::Domain,
            len: base_meta.len,
            by_value: base_meta.by_value,
            collation: base_meta.collation,
            is_defined: true,
            base_type: Some(base),
            element_type: None,
            array_type: None,
            plain_storage: base_meta.plain_storage,
        });
    }

    /// Register a relation. When `row_type` is given, the matching composite
    /// type is defined alongside it with the same field layout.
    pub fn define_relation(
        &mut self,
        oid: Oid,
        name: &str,
        row_type: Option<Oid>,
        columns: &[(&str, Oid)],
    ) {
        self.relations.insert(
            name.to_string(),
            RelationMetadata {
                oid,
                name: name.to_string(),
                row_type,
            },
        );
        let attributes: Vec<AttributeMetadata> = columns
            .iter()
            .map(|(col, ty)| AttributeMetadata {
                name: col.to_string(),
                type_oid: *ty,
                typmod: None,
                collation: self.types.get(ty).and_then(|m| m.collation),
            })
            .collect();
        self.relations_by_oid.insert(oid, attributes);
        if let Some(row_type) = row_type {
            self.define_composite(row_type, name, columns);
        }
    }

    /// Replace a composite type's field layout, bumping its shape.
    ///
    /// Panics if the oid was never defined as a composite; tests mutate only
    /// types they created.
    pub fn alter_composite(&mut self, oid: Oid, fields: &[(&str, Oid)]) {
        let shape = self
            .composites
            .get_mut(&oid)
            .expect("alter_composite on a type that is not composite");
        shape.fields = fields.iter().map(|(n, t)| (n.to_string(), *t)).collect();
        shape.generation += 1;
    }

    /// The field layout of a composite type.
    pub fn composite_fields(&self, oid: Oid) -> Option<&[(String, Oid)]> {
        self.composites.get(&oid).map(|s| s.fields.as_slice())
    }

    fn register_builtins(&mut self) {
        let scalar = |oid: Oid, name: &str, len: i16, by_value: bool, array: Option<Oid>| {
            TypeMetadata {
                oid,
                name: name.to_string(),
                kind: TypeKind::Base,
                len,
                by_value,
                collation: None,
                is_defined: true,
                base_type: None,
                element_type: None,
                array_type: array,
                plain_storage: len > 0,
            }
        };
        let array_of =
            |oid: Oid, name: &str, element: Oid| TypeMetadata {
                oid,
                name: name.to_string(),
                kind: TypeKind::Base,
                len: -1,
                by_value: false,
                collation: None,
                is_defined: true,
                base_type: None,
                element_type: Some(element),
                array_type: None,
                plain_storage: false,
            };
        let pseudo = |oid: Oid, name: &str| TypeMetadata {
            oid,
            name: name.to_string(),
            kind: TypeKind::Pseudo,
            len: 4,
            by_value: true,
            collation: None,
            is_defined: true,
            base_type: None,
            element_type: None,
            array_type: None,
            plain_storage: true,
        };

        self.register_type(scalar(oids::BOOL, "boolean", 1, true, Some(Oid::new(1000))));
        self.register_type(scalar(oids::INT4, "integer", 4, true, Some(oids::INT4_ARRAY)));
        self.register_type(scalar(oids::OID, "oid", 4, true, Some(Oid::new(1028))));

        let mut name_type = scalar(oids::NAME, "name", 64, false, Some(Oid::new(1003)));
        name_type.collation = Some(oids::DEFAULT_COLLATION);
        self.register_type(name_type);

        let mut text = scalar(oids::TEXT, "text", -1, false, Some(oids::TEXT_ARRAY));
        text.collation = Some(oids::DEFAULT_COLLATION);
        self.register_type(text);

        self.register_type(array_of(Oid::new(1000), "boolean[]", oids::BOOL));
        self.register_type(array_of(Oid::new(1003), "name[]", oids::NAME));
        self.register_type(array_of(Oid::new(1028), "oid[]", oids::OID));
        self.register_type(array_of(oids::INT4_ARRAY, "integer[]", oids::INT4));
        let mut text_array = array_of(oids::TEXT_ARRAY, "text[]", oids::TEXT);
        text_array.collation = Some(oids::DEFAULT_COLLATION);
        self.register_type(text_array);

        let mut int4range = scalar(oids::INT4_RANGE, "int4range", -1, false, None);
        int4range.kind = TypeKind::Range;
        self.register_type(int4range);
        let mut int4multirange = scalar(oids::INT4_MULTIRANGE, "int4multirange", -1, false, None);
        int4multirange.kind = TypeKind::Multirange;
        self.register_type(int4multirange);

        self.register_type(pseudo(oids::VOID, "void"));
        self.register_type(pseudo(oids::RECORD, "record"));
        self.register_type(pseudo(oids::TRIGGER, "trigger"));
        self.register_type(pseudo(oids::EVENT_TRIGGER, "event_trigger"));
        self.register_type(pseudo(oids::ANY_ELEMENT, "anyelement"));
        self.register_type(pseudo(oids::ANY_ARRAY, "anyarray"));
        self.register_type(pseudo(oids::ANY_NONARRAY, "anynonarray"));
        self.register_type(pseudo(oids::ANY_ENUM, "anyenum"));
        self.register_type(pseudo(oids::ANY_RANGE, "anyrange"));
        self.register_type(pseudo(oids::ANY_MULTIRANGE, "anymultirange"));
        self.register_type(pseudo(oids::ANY_COMPATIBLE, "anycompatible"));
        self.register_type(pseudo(oids::ANY_COMPATIBLE_ARRAY, "anycompatiblearray"));
        self.register_type(pseudo(oids::ANY_COMPATIBLE_NONARRAY, "anycompatiblenonarray"));
        self.register_type(pseudo(oids::ANY_COMPATIBLE_RANGE, "anycompatiblerange"));
        self.register_type(pseudo(oids::ANY_COMPATIBLE_MULTIRANGE, "anycompatiblemultirange"));
    }
}

impl Catalog for MemoryCatalog {
    fn lookup_type(&self, oid: Oid) -> Option<&TypeMetadata> {
        self.types.get(&oid)
    }

    fn lookup_relation(&self, name: &str) -> Option<&RelationMetadata> {
        self.relations.get(name)
    }

    fn lookup_attribute(&self, relation: Oid, name: &str) -> Option<&AttributeMetadata> {
        self.relations_by_oid
            .get(&relation)?
            .iter()
            .find(|attr| attr.name == name)
    }

    fn structural_shape(&self, type_oid: Oid) -> Option<ShapeId> {
        let base = self.resolve_base_type(type_oid)?;
        self.composites.get(&base.oid).map(CompositeShape::shape_id)
    }
}
