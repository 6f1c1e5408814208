//! Compiled symbol records.
//!
//! Every named thing a routine can reference at run time (parameters, local
//! variables, records, record fields, synthesized OUT rows, trigger context
//! promises) compiles to one [`Datum`]. Datums live in the session's
//! [`DatumArena`](crate::arena::DatumArena) and refer to each other only by
//! [`DatumId`], never by reference, so the finished array can be copied into
//! the compiled function without fixup.

use plscript_core::{DatumId, Oid};

use crate::type_resolver::TypeDescriptor;

/// The value the executor supplies for a promise variable on each invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseKind {
    /// Name of the firing trigger.
    TgName,
    /// BEFORE / AFTER / INSTEAD OF.
    TgWhen,
    /// ROW or STATEMENT.
    TgLevel,
    /// INSERT / UPDATE / DELETE / TRUNCATE.
    TgOp,
    /// Oid of the relation the trigger fired on.
    TgRelid,
    /// Unqualified name of that relation. Also serves the legacy
    /// `tg_relname` spelling.
    TgTableName,
    /// Schema of that relation.
    TgTableSchema,
    /// Number of trigger arguments.
    TgNargs,
    /// The trigger argument vector.
    TgArgv,
    /// Event identifier of an event trigger.
    TgEvent,
    /// Command tag that fired an event trigger.
    TgTag,
}

/// A scalar variable.
///
/// The variable's run-time value slot belongs to the executor; the compiler
/// only records the declaration.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub dtype: TypeDescriptor,
    /// Declared NOT NULL: assigning NULL raises at run time.
    pub not_null: bool,
    /// Declared CONSTANT, or injected read-only by the compiler.
    pub is_constant: bool,
    /// Declaration line, 0 for compiler-injected variables.
    pub line: u32,
}

/// A promise: a variable whose value the executor fills in lazily.
#[derive(Debug, Clone)]
pub struct Promise {
    pub var: Variable,
    pub kind: PromiseKind,
}

/// A record variable.
#[derive(Debug, Clone)]
pub struct Record {
    pub name: String,
    /// The declared composite type; `None` when the record is untyped
    /// (declared as generic `record`, or a trigger's `new`/`old`).
    pub dtype: Option<TypeDescriptor>,
    /// The record's row type; the generic record oid when untyped.
    pub row_type: Oid,
    /// Head of the intrusive field chain. Fields link via
    /// [`RecordField::next_field`].
    pub first_field: Option<DatumId>,
    pub line: u32,
}

/// A lazily materialized reference to one field of a [`Record`].
///
/// Built for every syntactic `record.field` reference encountered anywhere
/// in the source text, whether or not the field turns out to exist; the
/// executor validates against the record's current shape.
#[derive(Debug, Clone)]
pub struct RecordField {
    /// The owning record.
    pub parent: DatumId,
    pub name: String,
    /// Next sibling in the parent's chain.
    pub next_field: Option<DatumId>,
    /// Shape of the parent's row type when this field was last resolved;
    /// `None` until first resolution. A mismatch with the current shape
    /// forces re-resolution.
    pub known_shape: Option<plscript_core::ShapeId>,
}

/// One column of a synthesized row's shape.
#[derive(Debug, Clone)]
pub struct RowColumn {
    pub name: String,
    pub type_oid: Oid,
    pub typmod: Option<i32>,
    pub collation: Option<Oid>,
}

/// A fixed-arity tuple over existing member datums.
///
/// Built only to unify multiple OUT parameters (or a procedure's single OUT
/// parameter) into one result datum.
#[derive(Debug, Clone)]
pub struct Row {
    pub name: String,
    /// Member datum ids, in declaration order.
    pub members: Vec<DatumId>,
    /// The synthesized tuple shape, parallel to `members`.
    pub shape: Vec<RowColumn>,
}

impl Row {
    /// The member field names, in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.shape.iter().map(|col| col.name.as_str())
    }
}

/// One compiled symbol record.
#[derive(Debug, Clone)]
pub enum Datum {
    Variable(Variable),
    Promise(Promise),
    Record(Record),
    RecordField(RecordField),
    Row(Row),
}

impl Datum {
    /// The name this datum was declared or synthesized under.
    pub fn name(&self) -> &str {
        match self {
            Datum::Variable(v) => &v.name,
            Datum::Promise(p) => &p.var.name,
            Datum::Record(r) => &r.name,
            Datum::RecordField(f) => &f.name,
            Datum::Row(r) => &r.name,
        }
    }

    /// Whether the executor may clone this datum's state with a flat copy.
    ///
    /// Rows and record fields hold internal structure that is not safely
    /// shallow-copyable, so they are rebuilt instead.
    pub fn is_shallow_copiable(&self) -> bool {
        matches!(
            self,
            Datum::Variable(_) | Datum::Promise(_) | Datum::Record(_)
        )
    }

    /// Whether a DECLARE section that created this datum must initialize it
    /// at block entry. Promises, rows and record fields are initialized by
    /// their own special-purpose code paths.
    pub fn is_block_initializable(&self) -> bool {
        matches!(self, Datum::Variable(_) | Datum::Record(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn copiability_by_variant() {
        let var = Datum::Variable(Variable {
            name: "x".into(),
            dtype: int_descriptor(),
            not_null: false,
            is_constant: false,
            line: 1,
        });
        let row = Datum::Row(Row {
            name: "(unnamed row)".into(),
            members: vec![],
            shape: vec![],
        });
        let field = Datum::RecordField(RecordField {
            parent: DatumId::new(0),
            name: "f".into(),
            next_field: None,
            known_shape: None,
        });

        assert!(var.is_shallow_copiable());
        assert!(!row.is_shallow_copiable());
        assert!(!field.is_shallow_copiable());
    }

    #[test]
    fn initializable_excludes_promises() {
        let promise = Datum::Promise(Promise {
            var: Variable {
                name: "tg_name".into(),
                dtype: int_descriptor(),
                not_null: false,
                is_constant: true,
                line: 0,
            },
            kind: PromiseKind::TgName,
        });
        assert!(!promise.is_block_initializable());
        assert!(promise.is_shallow_copiable());
    }
}
