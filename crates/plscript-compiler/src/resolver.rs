//! Identifier resolution for embedded SQL and raw scanner lookups.
//!
//! Two consumers drive this module:
//!
//! - The external SQL expression parser, mid-parse, through the three
//!   [`SqlResolverHooks`] callbacks. [`ExprResolver`] implements them over
//!   the live compile session, translating dotted identifiers into parameter
//!   references and recording every hit in the expression's dependency set.
//! - The scanner, outside expression parsing, through the free functions
//!   below: `parse_word`/`parse_dblword`/`parse_tripword` for bare
//!   identifiers and the `%TYPE`/`%ROWTYPE` helpers. These also materialize
//!   record-field datums for every syntactic field reference, so a durable
//!   datum exists by the time type-checking runs whether or not the field
//!   turns out to be real.

use plscript_core::{CompileError, DatumId, Span};

use crate::datum::Datum;
use crate::expr::SqlExpr;
use crate::namespace::ItemKind;
use crate::session::{CompileSession, IdentifierLookup};
use crate::type_resolver::{ParsedTypeName, TypeDescriptor, TypeResolver};

type Result<T> = std::result::Result<T, CompileError>;

/// What wins when an identifier could be a routine variable or a table
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// A matching variable short-circuits column resolution entirely.
    PreferVariable,
    /// A column already resolved by the host parser is never overridden.
    PreferColumn,
    /// Neither is preferred; both matching is an error.
    #[default]
    Error,
}

/// A dotted column reference handed over by the external parser.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    /// One to three name parts, in source order.
    pub names: Vec<String>,
    /// Whether the reference ends in `.*` (whole-row).
    pub trailing_star: bool,
    pub span: Span,
}

impl ColumnRef {
    /// A plain reference from name parts.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>, span: Span) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            trailing_star: false,
            span,
        }
    }

    /// A whole-row reference (`a.*`, `blk.rec.*`).
    pub fn whole_row(names: impl IntoIterator<Item = impl Into<String>>, span: Span) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            trailing_star: true,
            span,
        }
    }

    /// The dotted spelling, for error messages.
    pub fn joined(&self) -> String {
        self.names.join(".")
    }
}

/// A resolved reference to a datum, returned to the external parser in place
/// of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRef {
    pub datum: DatumId,
    pub span: Span,
}

/// The callback surface the external SQL expression parser drives.
pub trait SqlResolverHooks {
    /// Called before the parser attempts its own column resolution. A
    /// `Some` return makes the parser skip column lookup for this
    /// identifier entirely.
    fn pre_column_ref(&mut self, cref: &ColumnRef) -> Result<Option<ParamRef>>;

    /// Called after the parser attempted column resolution;
    /// `column_found` says whether it succeeded.
    fn post_column_ref(&mut self, cref: &ColumnRef, column_found: bool) -> Result<Option<ParamRef>>;

    /// Called for `$n` parameter tokens. Never errors: an unknown number is
    /// simply not ours to resolve.
    fn param_ref(&mut self, number: u32, span: Span) -> Result<Option<ParamRef>>;
}

/// [`SqlResolverHooks`] over one expression of one compile session.
pub struct ExprResolver<'a> {
    session: &'a mut CompileSession,
    expr: &'a mut SqlExpr,
    policy: ResolutionPolicy,
}

impl<'a> ExprResolver<'a> {
    pub fn new(
        session: &'a mut CompileSession,
        expr: &'a mut SqlExpr,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            session,
            expr,
            policy,
        }
    }

    fn make_param(&mut self, datum: DatumId, span: Span) -> ParamRef {
        self.expr.record_dependency(datum);
        ParamRef { datum, span }
    }

    /// Try to resolve a column reference as a routine variable.
    ///
    /// The allowed syntaxes, mirroring the namespace lookup rules:
    ///
    /// ```text
    /// A        scalar, or whole-row record
    /// A.B      label-qualified scalar or record, or record field
    /// A.B.C    label-qualified record field
    /// A.*      whole-row record
    /// A.B.*    label-qualified whole-row record
    /// ```
    ///
    /// `error_if_no_field` chooses between erroring and quietly returning
    /// `None` when a record matches the leading names but the trailing field
    /// is unknown.
    fn resolve_column_ref(
        &mut self,
        cref: &ColumnRef,
        error_if_no_field: bool,
    ) -> Result<Option<ParamRef>> {
        // Star placeholders block scalar matches without naming a field.
        let names = &cref.names;
        let (name2, name3, colname, nnames_scalar, nnames_wholerow, nnames_field): (
            Option<&str>,
            Option<&str>,
            Option<&str>,
            usize,
            usize,
            usize,
        ) = match (names.len(), cref.trailing_star) {
            (1, false) => (None, None, None, 1, 1, 0),
            (1, true) => (Some("*"), None, None, 0, 1, 0),
            (2, false) => (Some(names[1].as_str()), None, Some(names[1].as_str()), 2, 2, 1),
            (2, true) => (Some(names[1].as_str()), Some("*"), None, 0, 2, 0),
            (3, false) => (
                Some(names[1].as_str()),
                Some(names[2].as_str()),
                Some(names[2].as_str()),
                0,
                0,
                2,
            ),
            // too many names: not ours
            _ => return Ok(None),
        };
        let name1 = names[0].as_str();

        let Some((kind, datum, record_name, names_used)) = self
            .session
            .namespace
            .lookup(name1, name2, name3, false)
            .map(|(item, used)| (item.kind, item.datum, item.name.clone(), used))
        else {
            return Ok(None);
        };

        match kind {
            ItemKind::Variable => {
                if names_used == nnames_scalar {
                    return Ok(Some(self.make_param(datum, cref.span)));
                }
            }
            ItemKind::Record => {
                if names_used == nnames_wholerow {
                    return Ok(Some(self.make_param(datum, cref.span)));
                }
                if names_used == nnames_field {
                    let colname = colname.expect("field position implies a field name");

                    // Search the datums already materialized for this record.
                    // Parse-time lookups build a field datum for every
                    // syntactic reference, so a miss here means the name
                    // never lexed as a plain identifier (e.g. a reserved
                    // keyword) and the reference cannot succeed.
                    let first = match self.session.arena.get(datum) {
                        Datum::Record(rec) => rec.first_field,
                        _ => {
                            return Err(CompileError::internal(
                                "namespace record entry does not reference a record datum",
                            ));
                        }
                    };
                    let mut next = first;
                    while let Some(field_id) = next {
                        match self.session.arena.get(field_id) {
                            Datum::RecordField(field) => {
                                if field.name == colname {
                                    return Ok(Some(self.make_param(field_id, cref.span)));
                                }
                                next = field.next_field;
                            }
                            _ => {
                                return Err(CompileError::internal(
                                    "record field chain contains a non-field datum",
                                ));
                            }
                        }
                    }

                    if error_if_no_field {
                        return Err(CompileError::UndefinedField {
                            record: record_name,
                            field: colname.to_string(),
                            span: cref.span,
                        });
                    }
                }
            }
        }

        // Name shape does not match what the item could be.
        Ok(None)
    }
}

impl SqlResolverHooks for ExprResolver<'_> {
    fn pre_column_ref(&mut self, cref: &ColumnRef) -> Result<Option<ParamRef>> {
        if self.policy == ResolutionPolicy::PreferVariable {
            self.resolve_column_ref(cref, false)
        } else {
            Ok(None)
        }
    }

    fn post_column_ref(&mut self, cref: &ColumnRef, column_found: bool) -> Result<Option<ParamRef>> {
        if self.policy == ResolutionPolicy::PreferVariable {
            // the pre-hook already established there is no variable match
            return Ok(None);
        }
        if self.policy == ResolutionPolicy::PreferColumn && column_found {
            return Ok(None);
        }

        // If a record matches but the field does not, and the host parser
        // found no column either, the reference is doomed: complain about
        // the record here, which beats the host parser's generic message.
        let var = self.resolve_column_ref(cref, !column_found)?;

        if let Some(param) = var {
            if column_found {
                return Err(CompileError::AmbiguousReference {
                    name: cref.joined(),
                    detail: "It could refer to either a routine variable or a table column."
                        .to_string(),
                    span: cref.span,
                });
            }
            return Ok(Some(param));
        }
        Ok(None)
    }

    fn param_ref(&mut self, number: u32, span: Span) -> Result<Option<ParamRef>> {
        let name = format!("${number}");
        let found = self
            .session
            .namespace
            .lookup(&name, None, None, true)
            .map(|(item, _)| item.datum);
        Ok(found.map(|datum| self.make_param(datum, span)))
    }
}

// ============================================================================
// Scanner-side lookups
// ============================================================================

/// Look up a single bare word.
///
/// Recognized only when the scanner context permits lookup and the session is
/// in normal identifier mode; DECLARE sections and SQL expression text leave
/// words alone (expressions resolve later, through the hooks).
pub fn parse_word(session: &CompileSession, word: &str, lookup: bool) -> Option<DatumId> {
    if !lookup || session.identifier_lookup != IdentifierLookup::Normal {
        return None;
    }
    session
        .namespace
        .lookup(word, None, None, false)
        .map(|(item, _)| item.datum)
}

/// Look up `word1.word2`.
///
/// A record match on the first name alone materializes the field datum for
/// `word2`, whether or not the field exists; errors surface when the
/// executor resolves the field against the record's actual shape.
pub fn parse_dblword(session: &mut CompileSession, word1: &str, word2: &str) -> Result<Option<DatumId>> {
    if session.identifier_lookup == IdentifierLookup::Declare {
        return Ok(None);
    }
    let Some((kind, datum, names_used)) = session
        .namespace
        .lookup(word1, Some(word2), None, false)
        .map(|(item, used)| (item.kind, item.datum, used))
    else {
        return Ok(None);
    };

    match kind {
        ItemKind::Variable => Ok(Some(datum)),
        ItemKind::Record => {
            if names_used == 1 {
                // word1 is the record; word2 is a candidate field
                Ok(Some(session.arena.build_record_field(datum, word2)?))
            } else {
                // block-qualified reference to the record itself
                Ok(Some(datum))
            }
        }
    }
}

/// Look up `word1.word2.word3`. Only record fields can need three names.
pub fn parse_tripword(
    session: &mut CompileSession,
    word1: &str,
    word2: &str,
    word3: &str,
) -> Result<Option<DatumId>> {
    if session.identifier_lookup == IdentifierLookup::Declare {
        return Ok(None);
    }
    let Some((kind, datum, names_used)) = session
        .namespace
        .lookup(word1, Some(word2), Some(word3), false)
        .map(|(item, used)| (item.kind, item.datum, used))
    else {
        return Ok(None);
    };

    match kind {
        ItemKind::Record => {
            let field = if names_used == 1 { word2 } else { word3 };
            Ok(Some(session.arena.build_record_field(datum, field)?))
        }
        ItemKind::Variable => Ok(None),
    }
}

// ============================================================================
// %TYPE / %ROWTYPE
// ============================================================================

/// `word%TYPE`: the declared type of an existing variable.
pub fn parse_word_type(session: &CompileSession, ident: &str) -> Result<TypeDescriptor> {
    if let Some((item, _)) = session.namespace.lookup(ident, None, None, false) {
        match session.arena.get(item.datum) {
            Datum::Variable(var) => return Ok(var.dtype.clone()),
            Datum::Promise(promise) => return Ok(promise.var.dtype.clone()),
            Datum::Record(rec) => {
                if let Some(dtype) = &rec.dtype {
                    return Ok(dtype.clone());
                }
            }
            _ => {}
        }
    }
    Err(CompileError::definition(format!(
        "variable \"{ident}\" does not exist"
    )))
}

/// `a.b%TYPE` (or longer): a block-qualified variable's type, else a table
/// column's type.
pub fn parse_cword_type(
    session: &CompileSession,
    resolver: &TypeResolver<'_>,
    idents: &[&str],
) -> Result<TypeDescriptor> {
    let (relation_name, field_name) = if idents.len() == 2 {
        if let Some((item, names_used)) =
            session.namespace.lookup(idents[0], Some(idents[1]), None, false)
        {
            match session.arena.get(item.datum) {
                Datum::Variable(var) => return Ok(var.dtype.clone()),
                Datum::Promise(promise) => return Ok(promise.var.dtype.clone()),
                Datum::Record(rec) if names_used == 2 => {
                    if let Some(dtype) = &rec.dtype {
                        return Ok(dtype.clone());
                    }
                }
                _ => {}
            }
        }
        // Not a variable reference; the first word could be a table name.
        (idents[0].to_string(), idents[1])
    } else {
        // %TYPE applies to variables, not fields of variables, so three or
        // more parts can only be a qualified table column.
        let (field, relation) = idents.split_last().expect("caller supplies at least two parts");
        (relation.join("."), *field)
    };

    let catalog = resolver.catalog();
    let relation = catalog.lookup_relation(&relation_name).ok_or_else(|| {
        CompileError::definition(format!("relation \"{relation_name}\" does not exist"))
    })?;
    let attr = catalog
        .lookup_attribute(relation.oid, field_name)
        .ok_or_else(|| {
            CompileError::definition(format!(
                "column \"{field_name}\" of relation \"{relation_name}\" does not exist"
            ))
        })?;
    resolver.resolve(attr.type_oid, attr.typmod, attr.collation, None)
}

/// `word%ROWTYPE`: the row type of a relation.
pub fn parse_word_rowtype(resolver: &TypeResolver<'_>, ident: &str) -> Result<TypeDescriptor> {
    rowtype_of(resolver, ident, ParsedTypeName::new([ident]))
}

/// `a.b%ROWTYPE`: the row type of a schema-qualified relation.
pub fn parse_cword_rowtype(resolver: &TypeResolver<'_>, idents: &[&str]) -> Result<TypeDescriptor> {
    rowtype_of(
        resolver,
        &idents.join("."),
        ParsedTypeName::new(idents.iter().copied()),
    )
}

fn rowtype_of(
    resolver: &TypeResolver<'_>,
    name: &str,
    origin: ParsedTypeName,
) -> Result<TypeDescriptor> {
    let catalog = resolver.catalog();
    let relation = catalog
        .lookup_relation(name)
        .ok_or_else(|| CompileError::definition(format!("relation \"{name}\" does not exist")))?;
    let row_type = relation.row_type.ok_or_else(|| {
        CompileError::definition(format!(
            "relation \"{name}\" does not have a composite type"
        ))
    })?;
    resolver.resolve(row_type, None, None, Some(origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_resolver::TypeResolver;
    use plscript_catalog::MemoryCatalog;
    use plscript_core::{Oid, oids};

    fn session_with_variables(catalog: &MemoryCatalog) -> (CompileSession, DatumId, DatumId) {
        let resolver = TypeResolver::new(catalog);
        let mut session = CompileSession::new();
        session.namespace.push_scope(Some("f"));

        let int = resolver.resolve(oids::INT4, None, None, None).unwrap();
        let x = session.build_variable("x", 1, int, true).unwrap();
        let rec = session.build_record("r", 1, None, oids::RECORD, true);
        (session, x, rec)
    }

    #[test]
    fn pre_hook_fires_only_under_prefer_variable() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, x, _) = session_with_variables(&catalog);
        let cref = ColumnRef::new(["x"], Span::line(2));

        let mut expr = SqlExpr::new("x + 1");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::PreferVariable);
        let hit = hooks.pre_column_ref(&cref).unwrap().unwrap();
        assert_eq!(hit.datum, x);
        assert!(expr.depends_on(x));

        let mut expr = SqlExpr::new("x + 1");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::Error);
        assert!(hooks.pre_column_ref(&cref).unwrap().is_none());
    }

    #[test]
    fn post_hook_defers_to_columns_under_prefer_column() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, x, _) = session_with_variables(&catalog);
        let cref = ColumnRef::new(["x"], Span::line(2));

        let mut expr = SqlExpr::new("x");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::PreferColumn);
        assert!(hooks.post_column_ref(&cref, true).unwrap().is_none());

        // no column: the variable resolves after all
        let hit = hooks.post_column_ref(&cref, false).unwrap().unwrap();
        assert_eq!(hit.datum, x);
    }

    #[test]
    fn both_matching_is_ambiguous() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, _, _) = session_with_variables(&catalog);
        let cref = ColumnRef::new(["x"], Span::line(2));

        let mut expr = SqlExpr::new("x");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::Error);
        let err = hooks.post_column_ref(&cref, true).unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousReference { .. }));

        // only the variable exists: no ambiguity
        let hit = hooks.post_column_ref(&cref, false).unwrap();
        assert!(hit.is_some());
    }

    #[test]
    fn unknown_field_errors_only_without_column() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, _, _rec) = session_with_variables(&catalog);
        let cref = ColumnRef::new(["r", "ghost"], Span::line(3));

        let mut expr = SqlExpr::new("r.ghost");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::Error);

        // the host parser found a column: quietly stand down
        assert!(hooks.post_column_ref(&cref, true).unwrap().is_none());
        let err = hooks.post_column_ref(&cref, false).unwrap_err();
        match err {
            CompileError::UndefinedField { record, field, .. } => {
                assert_eq!(record, "r");
                assert_eq!(field, "ghost");
            }
            other => panic!("expected UndefinedField, got {other:?}"),
        }
    }

    #[test]
    fn record_field_resolves_after_materialization() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, _, rec) = session_with_variables(&catalog);

        let field = parse_dblword(&mut session, "r", "answer").unwrap().unwrap();
        let cref = ColumnRef::new(["r", "answer"], Span::line(4));

        let mut expr = SqlExpr::new("r.answer");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::Error);
        let hit = hooks.post_column_ref(&cref, false).unwrap().unwrap();
        assert_eq!(hit.datum, field);
        assert!(hooks.expr.depends_on(field));

        // whole-row forms target the record itself
        let star = ColumnRef::whole_row(["r"], Span::line(4));
        let hit = hooks.post_column_ref(&star, false).unwrap().unwrap();
        assert_eq!(hit.datum, rec);
    }

    #[test]
    fn param_hook_sees_innermost_scope_only() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, x, _) = session_with_variables(&catalog);
        session.namespace.add_item(ItemKind::Variable, x, "$1");

        let mut expr = SqlExpr::new("$1 + $2");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::Error);
        let hit = hooks.param_ref(1, Span::line(1)).unwrap().unwrap();
        assert_eq!(hit.datum, x);

        // unknown numbers are not an error
        assert!(hooks.param_ref(2, Span::line(1)).unwrap().is_none());

        // an inner scope hides the binding from the parameter hook
        drop(hooks);
        session.namespace.push_scope(None);
        let mut expr = SqlExpr::new("$1");
        let mut hooks = ExprResolver::new(&mut session, &mut expr, ResolutionPolicy::Error);
        assert!(hooks.param_ref(1, Span::line(1)).unwrap().is_none());
    }

    #[test]
    fn dblword_materializes_fields_once() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, _, _) = session_with_variables(&catalog);

        let first = parse_dblword(&mut session, "r", "f").unwrap().unwrap();
        let second = parse_dblword(&mut session, "r", "f").unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn tripword_handles_label_qualification() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, _, rec) = session_with_variables(&catalog);

        // f.r.field: label-qualified record, third word is the field
        let field = parse_tripword(&mut session, "f", "r", "age").unwrap().unwrap();
        match session.arena.get(field) {
            Datum::RecordField(f) => {
                assert_eq!(f.parent, rec);
                assert_eq!(f.name, "age");
            }
            other => panic!("expected record field, got {other:?}"),
        }
    }

    #[test]
    fn declare_mode_suppresses_lookup() {
        let catalog = MemoryCatalog::with_builtins();
        let (mut session, _, _) = session_with_variables(&catalog);
        session.identifier_lookup = IdentifierLookup::Declare;

        assert!(parse_word(&session, "x", true).is_none());
        assert!(parse_dblword(&mut session, "r", "f").unwrap().is_none());
    }

    #[test]
    fn word_type_finds_variables() {
        let catalog = MemoryCatalog::with_builtins();
        let (session, _, _) = session_with_variables(&catalog);

        let dtype = parse_word_type(&session, "x").unwrap();
        assert_eq!(dtype.oid, oids::INT4);

        let err = parse_word_type(&session, "nope").unwrap_err();
        assert!(matches!(err, CompileError::Definition { .. }));
    }

    #[test]
    fn cword_type_falls_back_to_table_columns() {
        let mut catalog = MemoryCatalog::with_builtins();
        catalog.define_relation(Oid::new(30001), "accounts", None, &[("balance", oids::INT4)]);
        let (session, _, _) = session_with_variables(&catalog);
        let resolver = TypeResolver::new(&catalog);

        // block-qualified variable wins over any table
        let dtype = parse_cword_type(&session, &resolver, &["f", "x"]).unwrap();
        assert_eq!(dtype.oid, oids::INT4);

        let dtype = parse_cword_type(&session, &resolver, &["accounts", "balance"]).unwrap();
        assert_eq!(dtype.oid, oids::INT4);

        let err = parse_cword_type(&session, &resolver, &["accounts", "ghost"]).unwrap_err();
        assert!(err.to_string().contains("column \"ghost\""));
    }

    #[test]
    fn rowtype_requires_a_composite_relation() {
        let mut catalog = MemoryCatalog::with_builtins();
        catalog.define_relation(Oid::new(30001), "accounts", Some(Oid::new(30002)), &[(
            "id",
            oids::INT4,
        )]);
        catalog.define_relation(Oid::new(30003), "an_index", None, &[]);
        let resolver = TypeResolver::new(&catalog);

        let dtype = parse_word_rowtype(&resolver, "accounts").unwrap();
        assert_eq!(dtype.oid, Oid::new(30002));
        assert_eq!(
            dtype.origin_name,
            Some(ParsedTypeName::new(["accounts"]))
        );

        let err = parse_word_rowtype(&resolver, "an_index").unwrap_err();
        assert!(err.to_string().contains("does not have a composite type"));

        let err = parse_word_rowtype(&resolver, "missing").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
