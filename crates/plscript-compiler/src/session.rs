//! The per-compile session state.
//!
//! One [`CompileSession`] exists per compile, owning the datum arena and the
//! namespace stack exclusively. Nothing here is shared between sessions;
//! concurrent compiles of different routines each get their own value. The
//! session also carries the scanner's identifier-lookup mode and the
//! statement-id counter, the two pieces of mutable state the body parser and
//! the compiler share.

use plscript_core::{CompileError, DatumId, Oid};

use crate::arena::DatumArena;
use crate::datum::{Datum, Promise, PromiseKind, Record, Variable};
use crate::namespace::{ItemKind, NamespaceStack};
use crate::type_resolver::{TypeClass, TypeDescriptor};

type Result<T> = std::result::Result<T, CompileError>;

/// How the scanner should treat identifiers it encounters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierLookup {
    /// Look identifiers up in the namespace as usual.
    #[default]
    Normal,
    /// Inside a DECLARE section: no variable lookup at all.
    Declare,
    /// Inside a SQL expression: only materialize record fields; full
    /// resolution happens when the expression is parsed.
    Expression,
}

/// Mutable state for one compile session.
#[derive(Debug, Default)]
pub struct CompileSession {
    pub arena: DatumArena,
    pub namespace: NamespaceStack,
    pub identifier_lookup: IdentifierLookup,
    next_stmt_id: u32,
}

impl CompileSession {
    /// Create a fresh session with an empty arena and namespace stack.
    pub fn new() -> Self {
        Self {
            arena: DatumArena::new(),
            namespace: NamespaceStack::new(),
            identifier_lookup: IdentifierLookup::Normal,
            next_stmt_id: 0,
        }
    }

    /// Allocate the next statement id. Ids start at 1; 0 is never assigned.
    pub fn next_statement_id(&mut self) -> u32 {
        self.next_stmt_id += 1;
        self.next_stmt_id
    }

    /// How many statement ids have been handed out.
    pub fn statements_created(&self) -> u32 {
        self.next_stmt_id
    }

    /// Build a variable or record datum of the given type.
    ///
    /// Scalar types yield a [`Variable`], composite types a [`Record`].
    /// Pseudo-types cannot be declared: that fails with `UnsupportedType`.
    /// When `add_to_namespace` is set, the datum is bound under `name` in the
    /// innermost scope.
    pub fn build_variable(
        &mut self,
        name: &str,
        line: u32,
        dtype: TypeDescriptor,
        add_to_namespace: bool,
    ) -> Result<DatumId> {
        match dtype.class {
            TypeClass::Scalar => {
                let id = self.arena.push(Datum::Variable(Variable {
                    name: name.to_string(),
                    dtype,
                    not_null: false,
                    is_constant: false,
                    line,
                }));
                if add_to_namespace {
                    self.namespace.add_item(ItemKind::Variable, id, name);
                }
                Ok(id)
            }
            TypeClass::Composite => {
                let row_type = dtype.oid;
                Ok(self.build_record(name, line, Some(dtype), row_type, add_to_namespace))
            }
            TypeClass::Pseudo => Err(CompileError::UnsupportedType {
                message: format!(
                    "variable \"{}\" has pseudo-type {}",
                    name, dtype.name
                ),
            }),
        }
    }

    /// Build a record datum, optionally without a fixed type (generic
    /// `record`, trigger `new`/`old`).
    pub fn build_record(
        &mut self,
        name: &str,
        line: u32,
        dtype: Option<TypeDescriptor>,
        row_type: Oid,
        add_to_namespace: bool,
    ) -> DatumId {
        let id = self.arena.push(Datum::Record(Record {
            name: name.to_string(),
            dtype,
            row_type,
            first_field: None,
            line,
        }));
        if add_to_namespace {
            self.namespace.add_item(ItemKind::Record, id, name);
        }
        id
    }

    /// Build a read-only promise variable and bind it in the current scope.
    pub fn build_promise(
        &mut self,
        name: &str,
        dtype: TypeDescriptor,
        kind: PromiseKind,
    ) -> DatumId {
        let id = self.arena.push(Datum::Promise(Promise {
            var: Variable {
                name: name.to_string(),
                dtype,
                not_null: false,
                is_constant: true,
                line: 0,
            },
            kind,
        }));
        self.namespace.add_item(ItemKind::Variable, id, name);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_resolver::TypeResolver;
    use plscript_catalog::MemoryCatalog;
    use plscript_core::oids;

    #[test]
    fn build_variable_dispatches_on_class() {
        let catalog = MemoryCatalog::with_builtins();
        let resolver = TypeResolver::new(&catalog);
        let mut session = CompileSession::new();
        session.namespace.push_scope(Some("f"));

        let int = resolver.resolve(oids::INT4, None, None, None).unwrap();
        let var = session.build_variable("n", 1, int, true).unwrap();
        assert!(matches!(session.arena.get(var), Datum::Variable(_)));

        let rec_type = resolver.resolve(oids::RECORD, None, None, None).unwrap();
        let rec = session.build_variable("r", 2, rec_type, true).unwrap();
        assert!(matches!(session.arena.get(rec), Datum::Record(_)));

        let void = resolver.resolve(oids::VOID, None, None, None).unwrap();
        let err = session.build_variable("v", 3, void, false).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedType { .. }));
    }

    #[test]
    fn statement_ids_start_at_one() {
        let mut session = CompileSession::new();
        assert_eq!(session.next_statement_id(), 1);
        assert_eq!(session.next_statement_id(), 2);
        assert_eq!(session.statements_created(), 2);
    }
}
