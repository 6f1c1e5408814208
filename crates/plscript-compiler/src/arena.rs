//! The compile-session datum arena.
//!
//! An append-only, index-addressed store of every [`Datum`] a compile session
//! creates. Ids are permanent: a datum keeps the index it was allocated under
//! for the lifetime of the compiled function, and indices are never reused or
//! renumbered. The arena exists only during one compile; on success its
//! contents are copied into the compiled function, on failure everything is
//! dropped together.

use plscript_core::{CompileError, DatumId};

use crate::datum::{Datum, RecordField};

type Result<T> = std::result::Result<T, CompileError>;

/// Append-only store of compiled datums with stable indices.
#[derive(Debug, Default)]
pub struct DatumArena {
    datums: Vec<Datum>,
    /// High-water mark for [`DatumArena::collect_initializable`].
    checkpoint: usize,
}

impl DatumArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            datums: Vec::with_capacity(128),
            checkpoint: 0,
        }
    }

    /// Append a datum, stamping its permanent id.
    pub fn push(&mut self, datum: Datum) -> DatumId {
        let id = DatumId::new(self.datums.len() as u32);
        self.datums.push(datum);
        id
    }

    /// Number of datums allocated so far.
    pub fn len(&self) -> usize {
        self.datums.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.datums.is_empty()
    }

    /// Look up a datum by id. O(1).
    ///
    /// Ids are only minted by `push`, so an out-of-range id means the caller
    /// mixed up arenas; that is a programming error, not a user error.
    pub fn get(&self, id: DatumId) -> &Datum {
        &self.datums[id.index()]
    }

    /// Mutable lookup by id. O(1).
    pub fn get_mut(&mut self, id: DatumId) -> &mut Datum {
        &mut self.datums[id.index()]
    }

    /// Iterate over all datums with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (DatumId, &Datum)> {
        self.datums
            .iter()
            .enumerate()
            .map(|(i, d)| (DatumId::new(i as u32), d))
    }

    /// Consume the arena, yielding the finished datum array.
    pub fn into_datums(self) -> Vec<Datum> {
        self.datums
    }

    /// Get or create the field datum for `record.name`.
    ///
    /// Requests for the same (record, field name) pair always return the same
    /// id: the parent's intrusive field chain is searched first and a new
    /// field is allocated and linked at the chain head only on a miss. The
    /// field name is not validated against the record's shape here; fields
    /// are materialized for every syntactic reference and checked when the
    /// executor resolves them.
    pub fn build_record_field(&mut self, record: DatumId, name: &str) -> Result<DatumId> {
        let first = match self.get(record) {
            Datum::Record(rec) => rec.first_field,
            other => {
                return Err(CompileError::internal(format!(
                    "record field requested on non-record datum \"{}\"",
                    other.name()
                )));
            }
        };

        let mut next = first;
        while let Some(field_id) = next {
            match self.get(field_id) {
                Datum::RecordField(field) => {
                    debug_assert_eq!(field.parent, record);
                    if field.name == name {
                        return Ok(field_id);
                    }
                    next = field.next_field;
                }
                other => {
                    return Err(CompileError::internal(format!(
                        "field chain of record contains non-field datum \"{}\"",
                        other.name()
                    )));
                }
            }
        }

        let field_id = self.push(Datum::RecordField(RecordField {
            parent: record,
            name: name.to_string(),
            next_field: first,
            known_shape: None,
        }));
        match self.get_mut(record) {
            Datum::Record(rec) => rec.first_field = Some(field_id),
            _ => unreachable!("record variant checked above"),
        }
        Ok(field_id)
    }

    /// Collect the block-initializable datums allocated since the previous
    /// checkpoint, advancing the checkpoint.
    ///
    /// Wrapped around a DECLARE section, this yields exactly the variables
    /// and records that section introduced, so block entry knows what to
    /// initialize. Promises, rows and record fields are skipped; they are
    /// initialized by special-purpose code.
    pub fn collect_initializable(&mut self) -> Vec<DatumId> {
        let ids = self.datums[self.checkpoint..]
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_block_initializable())
            .map(|(i, _)| DatumId::new((self.checkpoint + i) as u32))
            .collect();
        self.checkpoint = self.datums.len();
        ids
    }

    /// Advance the checkpoint without collecting anything.
    pub fn discard_initializable(&mut self) {
        self.checkpoint = self.datums.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::{Record, Variable};
    use crate::type_resolver::{TypeClass, TypeDescriptor};
    use plscript_core::oids;

    fn int_descriptor() -> TypeDescriptor {
        TypeDescriptor {
            oid: oids::INT4,
            name: "integer".into(),
            class: TypeClass::Scalar,
            len: 4,
            by_value: true,
            collation: None,
            is_array: false,
            typmod: None,
            origin_name: None,
            shape: None,
        }
    }

    fn variable(name: &str) -> Datum {
        Datum::Variable(Variable {
            name: name.into(),
            dtype: int_descriptor(),
            not_null: false,
            is_constant: false,
            line: 1,
        })
    }

    fn record(name: &str) -> Datum {
        Datum::Record(Record {
            name: name.into(),
            dtype: None,
            row_type: oids::RECORD,
            first_field: None,
            line: 1,
        })
    }

    #[test]
    fn ids_are_stable_and_monotonic() {
        let mut arena = DatumArena::new();
        let a = arena.push(variable("a"));
        let b = arena.push(variable("b"));
        assert_eq!(a, DatumId::new(0));
        assert_eq!(b, DatumId::new(1));
        assert_eq!(arena.get(a).name(), "a");
        assert_eq!(arena.get(b).name(), "b");
    }

    #[test]
    fn record_field_dedup() {
        let mut arena = DatumArena::new();
        let rec = arena.push(record("r"));

        let f1 = arena.build_record_field(rec, "x").unwrap();
        let f2 = arena.build_record_field(rec, "x").unwrap();
        let f3 = arena.build_record_field(rec, "x").unwrap();
        assert_eq!(f1, f2);
        assert_eq!(f2, f3);
        // exactly one datum allocated for the field
        assert_eq!(arena.len(), 2);

        let other = arena.build_record_field(rec, "y").unwrap();
        assert_ne!(other, f1);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn record_field_chain_links_at_head() {
        let mut arena = DatumArena::new();
        let rec = arena.push(record("r"));
        let fx = arena.build_record_field(rec, "x").unwrap();
        let fy = arena.build_record_field(rec, "y").unwrap();

        match arena.get(rec) {
            Datum::Record(r) => assert_eq!(r.first_field, Some(fy)),
            _ => unreachable!(),
        }
        match arena.get(fy) {
            Datum::RecordField(f) => assert_eq!(f.next_field, Some(fx)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn record_field_on_variable_is_internal_error() {
        let mut arena = DatumArena::new();
        let var = arena.push(variable("v"));
        let err = arena.build_record_field(var, "x").unwrap_err();
        assert!(matches!(err, CompileError::Internal { .. }));
    }

    #[test]
    fn initializable_collection_is_checkpoint_relative() {
        let mut arena = DatumArena::new();
        let a = arena.push(variable("a"));
        let first = arena.collect_initializable();
        assert_eq!(first, vec![a]);

        let rec = arena.push(record("r"));
        let _field = arena.build_record_field(rec, "x").unwrap();
        let row = Datum::Row(crate::datum::Row {
            name: "(unnamed row)".into(),
            members: vec![a],
            shape: vec![],
        });
        arena.push(row);

        // only the record qualifies; the field and row are excluded
        let second = arena.collect_initializable();
        assert_eq!(second, vec![rec]);

        // nothing new since the checkpoint
        assert!(arena.collect_initializable().is_empty());
    }

    #[test]
    fn discard_skips_collection() {
        let mut arena = DatumArena::new();
        arena.push(variable("a"));
        arena.discard_initializable();
        assert!(arena.collect_initializable().is_empty());
    }
}
