//! The compile state machine.
//!
//! [`FunctionBuilder`] orchestrates one compile session end to end:
//!
//! 1. create the session (arena + namespace, outer scope labeled with the
//!    routine's own name);
//! 2. bind parameters, resolving polymorphic types against the call site;
//! 3. bind the return type, synthesizing a row over OUT parameters;
//! 4. for triggers, inject the fixed context variables instead;
//! 5. hand the body to the external parser, which calls back into the
//!    resolver as it goes;
//! 6. finalize: synthesize the trailing RETURN where control may fall off
//!    the end, and copy the arena out into the immutable compiled function.
//!
//! Any failure discards the whole session; nothing partial is ever handed
//! to the cache.

use rustc_hash::FxHashMap;
use tracing::debug;

use plscript_catalog::{Catalog, TypeKind};
use plscript_core::{CompileError, DatumId, Oid, oids};

use crate::action::{Block, BodyParser, ParseFailure, Statement};
use crate::arena::DatumArena;
use crate::datum::{Datum, PromiseKind, Row, RowColumn};
use crate::function::{
    ArgMode, CallContext, CompiledFunction, FunctionTraits, RoutineKind, RoutineSource,
    TriggerKind, Volatility,
};
use crate::namespace::ItemKind;
use crate::resolver::ResolutionPolicy;
use crate::session::CompileSession;
use crate::type_resolver::{TypeClass, TypeResolver};

type Result<T> = std::result::Result<T, CompileError>;

/// Compiler behavior knobs, fixed per builder.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    /// How identifier conflicts between variables and columns resolve.
    pub resolution_policy: ResolutionPolicy,
    /// Include parameter values when reporting STRICT failures.
    pub print_strict_params: bool,
    /// Promote extra validation warnings at definition time.
    pub extra_warnings: bool,
    /// Promote extra validation errors at definition time.
    pub extra_errors: bool,
}

/// Compiles routines into [`CompiledFunction`]s.
///
/// The builder itself is stateless between compiles; every call owns a fresh
/// [`CompileSession`], so concurrent compiles of different routines are safe.
pub struct FunctionBuilder<'a> {
    catalog: &'a dyn Catalog,
    parser: &'a dyn BodyParser,
    options: CompilerOptions,
}

impl<'a> FunctionBuilder<'a> {
    /// Create a builder over the given catalog and body parser.
    pub fn new(catalog: &'a dyn Catalog, parser: &'a dyn BodyParser) -> Self {
        Self {
            catalog,
            parser,
            options: CompilerOptions::default(),
        }
    }

    /// Replace the default options.
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile one routine for the given invocation context.
    pub fn compile(&self, ctx: &CallContext) -> Result<CompiledFunction> {
        debug!(routine = %ctx.routine.name, trigger = ?ctx.trigger, "compiling routine");
        let function = self.compile_body(ctx).map_err(|err| {
            let line = err.span().map(|s| s.line).unwrap_or(0);
            err.with_context(&ctx.routine.name, line)
        })?;
        debug!(
            routine = %ctx.routine.name,
            datums = function.datum_count(),
            statements = function.nstatements,
            "routine compiled"
        );
        Ok(function)
    }

    /// Compile an anonymous code block.
    ///
    /// A reduced variant of [`FunctionBuilder::compile`]: no parameters, a
    /// fixed void return type, no trigger context. The result is meant for a
    /// single execution and is never registered with the cache.
    pub fn compile_inline(&self, body: &str) -> Result<CompiledFunction> {
        const INLINE_NAME: &str = "inline_code_block";

        debug!("compiling anonymous code block");
        let run = || -> Result<CompiledFunction> {
            let resolver = TypeResolver::new(self.catalog);
            let mut session = CompileSession::new();
            session.namespace.push_scope(Some(INLINE_NAME));

            let mut traits = FunctionTraits::empty();
            let bool_type = resolver.resolve(oids::BOOL, None, None, None)?;
            let found = session.build_variable("found", 0, bool_type, true)?;

            let parsed = self.parse_routine_body(body, &mut session)?;
            let mut action = parsed.action;
            traits.set(FunctionTraits::HAS_EXCEPTION_BLOCK, parsed.has_exception_block);

            // Returning void, control may always fall off the end.
            add_dummy_return(&mut session, &mut action, None);

            let nstatements = session.statements_created();
            let datums = session.arena.into_datums();
            let copiable_count = datums.iter().filter(|d| d.is_shallow_copiable()).count();

            Ok(CompiledFunction {
                signature: INLINE_NAME.to_string(),
                oid: Oid::INVALID,
                trigger: TriggerKind::NotTrigger,
                return_type: oids::VOID,
                return_by_value: true,
                return_len: 4,
                traits,
                input_collation: None,
                datums,
                arg_datums: Vec::new(),
                out_param: None,
                found,
                new_record: None,
                old_record: None,
                action,
                nstatements,
                resolution_policy: self.options.resolution_policy,
                print_strict_params: self.options.print_strict_params,
                extra_warnings: false,
                extra_errors: false,
                copiable_count,
            })
        };
        run().map_err(|err| {
            let line = err.span().map(|s| s.line).unwrap_or(0);
            err.with_context(INLINE_NAME, line)
        })
    }

    fn compile_body(&self, ctx: &CallContext) -> Result<CompiledFunction> {
        let routine = &ctx.routine;
        let resolver = TypeResolver::new(self.catalog);

        // The outermost namespace holds the parameters and the special
        // variables, and is labeled with the routine's own name.
        let mut session = CompileSession::new();
        session.namespace.push_scope(Some(&routine.name));

        let mut traits = FunctionTraits::empty();
        let mut arg_datums: Vec<DatumId> = Vec::new();
        let mut out_args: Vec<DatumId> = Vec::new();
        let mut out_param: Option<DatumId> = None;
        let mut new_record = None;
        let mut old_record = None;
        let return_type: Oid;
        let return_by_value: bool;
        let return_len: i16;

        match ctx.trigger {
            TriggerKind::NotTrigger => {
                let mut arg_types: Vec<Oid> = routine.args.iter().map(|a| a.type_oid).collect();
                resolve_polymorphic_argtypes(
                    &mut arg_types,
                    ctx.call_arg_types.as_deref(),
                    ctx.for_validator,
                    &routine.name,
                )?;

                let mut declared: FxHashMap<String, Vec<ArgMode>> = FxHashMap::default();
                for (i, arg) in routine.args.iter().enumerate() {
                    let positional = format!("${}", i + 1);
                    let dtype =
                        resolver.resolve(arg_types[i], None, routine.input_collation, None)?;

                    // Polymorphic types were replaced above, so a pseudo-type
                    // here is one that can never be a parameter.
                    if dtype.class == TypeClass::Pseudo {
                        return Err(CompileError::UnsupportedType {
                            message: format!(
                                "PLScript functions cannot accept type {}",
                                dtype.name
                            ),
                        });
                    }

                    let declared_name = arg.name.as_deref().filter(|n| !n.is_empty());
                    let refname = declared_name.unwrap_or(&positional);
                    let datum = session.build_variable(refname, 0, dtype, false)?;
                    let item_kind = match session.arena.get(datum) {
                        Datum::Variable(_) => ItemKind::Variable,
                        Datum::Record(_) => ItemKind::Record,
                        other => {
                            return Err(CompileError::internal(format!(
                                "parameter \"{}\" built an unexpected datum variant",
                                other.name()
                            )));
                        }
                    };

                    if arg.mode.is_input() {
                        arg_datums.push(datum);
                    }
                    if arg.mode.is_output() {
                        out_args.push(datum);
                    }

                    add_parameter_name(&mut session, &mut declared, item_kind, datum, &positional, None)?;
                    if let Some(name) = declared_name {
                        add_parameter_name(
                            &mut session,
                            &mut declared,
                            item_kind,
                            datum,
                            name,
                            Some(arg.mode),
                        )?;
                    }
                }

                // One OUT parameter of a function is the output by itself.
                // More than one, or a procedure's single OUT, get a
                // synthesized row over all of them.
                if out_args.len() > 1
                    || (out_args.len() == 1 && routine.kind == RoutineKind::Procedure)
                {
                    let row = build_row_from_members(&session.arena, &out_args)?;
                    out_param = Some(session.arena.push(Datum::Row(row)));
                } else if out_args.len() == 1 {
                    out_param = Some(out_args[0]);
                }

                let mut rettype = routine.return_type;
                if oids::is_polymorphic(rettype) {
                    rettype = if ctx.for_validator {
                        validator_substitute(rettype)
                    } else {
                        ctx.call_return_type.filter(|o| o.is_valid()).ok_or_else(|| {
                            CompileError::UnsupportedType {
                                message: format!(
                                    "could not determine actual return type for polymorphic function \"{}\"",
                                    routine.name
                                ),
                            }
                        })?
                    };
                }

                let ret_meta = self.catalog.lookup_type(rettype).ok_or_else(|| {
                    CompileError::internal(format!("catalog lookup failed for type {rettype}"))
                })?;
                if ret_meta.kind == TypeKind::Pseudo
                    && rettype != oids::VOID
                    && rettype != oids::RECORD
                {
                    if rettype == oids::TRIGGER || rettype == oids::EVENT_TRIGGER {
                        return Err(CompileError::InvalidUsage {
                            message: "trigger functions can only be called as triggers".to_string(),
                        });
                    }
                    return Err(CompileError::UnsupportedType {
                        message: format!("PLScript functions cannot return type {}", ret_meta.name),
                    });
                }

                traits.set(FunctionTraits::RETURNS_SET, routine.returns_set);
                traits.set(
                    FunctionTraits::RETURNS_TUPLE,
                    self.catalog.type_is_composite(rettype),
                );
                traits.set(FunctionTraits::RETURNS_DOMAIN, ret_meta.kind == TypeKind::Domain);
                return_type = rettype;
                return_by_value = ret_meta.by_value;
                return_len = ret_meta.len;

                // A polymorphic return with no OUT parameters gets a "$0"
                // placeholder recording the concrete result type.
                if oids::is_polymorphic(routine.return_type) && out_args.is_empty() {
                    let dtype = resolver.resolve(rettype, None, routine.input_collation, None)?;
                    session.build_variable("$0", 0, dtype, true)?;
                }
            }

            TriggerKind::DmlTrigger => {
                if !routine.args.is_empty() {
                    return Err(CompileError::InvalidDefinition {
                        message: "trigger functions cannot have declared arguments".to_string(),
                        hint: Some(
                            "The arguments of the trigger can be accessed through tg_nargs and tg_argv instead."
                                .to_string(),
                        ),
                    });
                }

                // The actual return type is unknowable until the trigger fires.
                return_type = Oid::INVALID;
                return_by_value = false;
                return_len = -1;
                traits.insert(FunctionTraits::RETURNS_TUPLE);

                new_record = Some(session.build_record("new", 0, None, oids::RECORD, true));
                old_record = Some(session.build_record("old", 0, None, oids::RECORD, true));

                let name_type = resolver.resolve(oids::NAME, None, routine.input_collation, None)?;
                let text_type = resolver.resolve(oids::TEXT, None, routine.input_collation, None)?;
                let oid_type = resolver.resolve(oids::OID, None, None, None)?;
                let int_type = resolver.resolve(oids::INT4, None, None, None)?;
                let text_array_type =
                    resolver.resolve(oids::TEXT_ARRAY, None, routine.input_collation, None)?;

                session.build_promise("tg_name", name_type.clone(), PromiseKind::TgName);
                session.build_promise("tg_when", text_type.clone(), PromiseKind::TgWhen);
                session.build_promise("tg_level", text_type.clone(), PromiseKind::TgLevel);
                session.build_promise("tg_op", text_type, PromiseKind::TgOp);
                session.build_promise("tg_relid", oid_type, PromiseKind::TgRelid);
                // tg_table_name is preferred; tg_relname remains as the
                // legacy spelling of the same promise
                session.build_promise("tg_relname", name_type.clone(), PromiseKind::TgTableName);
                session.build_promise("tg_table_name", name_type.clone(), PromiseKind::TgTableName);
                session.build_promise("tg_table_schema", name_type, PromiseKind::TgTableSchema);
                session.build_promise("tg_nargs", int_type, PromiseKind::TgNargs);
                session.build_promise("tg_argv", text_array_type, PromiseKind::TgArgv);
            }

            TriggerKind::EventTrigger => {
                if !routine.args.is_empty() {
                    return Err(CompileError::InvalidDefinition {
                        message: "event trigger functions cannot have declared arguments"
                            .to_string(),
                        hint: None,
                    });
                }

                return_type = oids::VOID;
                return_by_value = false;
                return_len = -1;
                traits.insert(FunctionTraits::RETURNS_TUPLE);

                let text_type = resolver.resolve(oids::TEXT, None, routine.input_collation, None)?;
                session.build_promise("tg_event", text_type.clone(), PromiseKind::TgEvent);
                session.build_promise("tg_tag", text_type, PromiseKind::TgTag);
            }
        }

        traits.set(
            FunctionTraits::READ_ONLY,
            routine.volatility != Volatility::Volatile,
        );

        // The magic FOUND variable, updated by the executor after every
        // implicit query.
        let bool_type = resolver.resolve(oids::BOOL, None, None, None)?;
        let found = session.build_variable("found", 0, bool_type, true)?;

        let parsed = self.parse_routine_body(&routine.body, &mut session)?;
        let mut action = parsed.action;
        traits.set(FunctionTraits::HAS_EXCEPTION_BLOCK, parsed.has_exception_block);

        // With OUT parameters, a void return or a set return, control may
        // fall off the end without an explicit RETURN.
        if !out_args.is_empty() || return_type == oids::VOID || routine.returns_set {
            add_dummy_return(&mut session, &mut action, out_param);
        }

        let nstatements = session.statements_created();
        let datums = session.arena.into_datums();
        let copiable_count = datums.iter().filter(|d| d.is_shallow_copiable()).count();

        Ok(CompiledFunction {
            signature: format_signature(self.catalog, routine),
            oid: routine.oid,
            trigger: ctx.trigger,
            return_type,
            return_by_value,
            return_len,
            traits,
            input_collation: routine.input_collation,
            datums,
            arg_datums,
            out_param,
            found,
            new_record,
            old_record,
            action,
            nstatements,
            resolution_policy: self.options.resolution_policy,
            print_strict_params: self.options.print_strict_params,
            extra_warnings: ctx.for_validator && self.options.extra_warnings,
            extra_errors: ctx.for_validator && self.options.extra_errors,
            copiable_count,
        })
    }

    fn parse_routine_body(
        &self,
        source: &str,
        session: &mut CompileSession,
    ) -> Result<crate::action::ParsedBody> {
        self.parser.parse(source, session).map_err(|failure| match failure {
            ParseFailure::Syntax(err) => err,
            // The grammar reporting failure without raising an error is a
            // defect in the grammar, not in the user's source.
            ParseFailure::Internal(rc) => {
                CompileError::internal(format!("routine body parser returned {rc}"))
            }
        })
    }
}

/// The arbitrary concrete stand-ins used when validating a definition whose
/// polymorphic types cannot be resolved from a call site.
fn validator_substitute(oid: Oid) -> Oid {
    match oid {
        oids::ANY_ARRAY | oids::ANY_COMPATIBLE_ARRAY => oids::INT4_ARRAY,
        oids::ANY_RANGE | oids::ANY_COMPATIBLE_RANGE => oids::INT4_RANGE,
        oids::ANY_MULTIRANGE | oids::ANY_COMPATIBLE_MULTIRANGE => oids::INT4_MULTIRANGE,
        _ => oids::INT4,
    }
}

/// Replace polymorphic parameter types with concrete ones, in place.
fn resolve_polymorphic_argtypes(
    arg_types: &mut [Oid],
    call_types: Option<&[Oid]>,
    for_validator: bool,
    routine_name: &str,
) -> Result<()> {
    for (i, ty) in arg_types.iter_mut().enumerate() {
        if !oids::is_polymorphic(*ty) {
            continue;
        }
        if for_validator {
            *ty = validator_substitute(*ty);
        } else {
            *ty = call_types
                .and_then(|types| types.get(i).copied())
                .filter(|o| o.is_valid())
                .ok_or_else(|| CompileError::UnsupportedType {
                    message: format!(
                        "could not determine actual argument type for polymorphic function \"{routine_name}\""
                    ),
                })?;
        }
    }
    Ok(())
}

/// Bind a parameter name in the routine's outer scope, rejecting duplicates.
///
/// Names share one namespace, so a parameter list cannot reuse a name, with
/// one documented exception: a single IN and a single OUT parameter may
/// share theirs, as the definition language permits. Both datums exist and
/// both entries are added, so an unqualified reference to the shared name
/// resolves to whichever entry was added later. `mode` is `Some` for
/// declared names and `None` for the `$n` aliases, which can never collide.
fn add_parameter_name(
    session: &mut CompileSession,
    declared: &mut FxHashMap<String, Vec<ArgMode>>,
    kind: ItemKind,
    datum: DatumId,
    name: &str,
    mode: Option<ArgMode>,
) -> Result<()> {
    if session.namespace.lookup(name, None, None, true).is_some() {
        let exempt = matches!(
            (mode, declared.get(name).map(Vec::as_slice)),
            (Some(ArgMode::Out), Some([ArgMode::In])) | (Some(ArgMode::In), Some([ArgMode::Out]))
        );
        if !exempt {
            return Err(CompileError::DuplicateName {
                name: name.to_string(),
            });
        }
    }
    if let Some(mode) = mode {
        declared.entry(name.to_string()).or_default().push(mode);
    }
    session.namespace.add_item(kind, datum, name);
    Ok(())
}

/// Append the synthesized trailing RETURN to a routine body.
fn add_dummy_return(session: &mut CompileSession, action: &mut Block, out_param: Option<DatumId>) {
    // If the outer block has an EXCEPTION clause, the added RETURN must not
    // run under its handlers; if it has a label, EXIT must not skip the
    // RETURN. Wrap the block in a fresh unlabeled one either way.
    if action.has_exception_handlers || action.label.is_some() {
        let inner = std::mem::take(action);
        action.body.push(Statement::Block {
            stmt_id: session.next_statement_id(),
            block: inner,
        });
    }
    if !action.body.last().is_some_and(Statement::is_return) {
        action.body.push(Statement::Return {
            stmt_id: session.next_statement_id(),
            result: out_param,
            expr: None,
        });
    }
}

/// Build the synthesized row datum over a routine's OUT parameters.
fn build_row_from_members(arena: &DatumArena, members: &[DatumId]) -> Result<Row> {
    let mut shape = Vec::with_capacity(members.len());
    for &id in members {
        let column = match arena.get(id) {
            Datum::Variable(var) => RowColumn {
                name: var.name.clone(),
                type_oid: var.dtype.oid,
                typmod: var.dtype.typmod,
                collation: var.dtype.collation,
            },
            Datum::Promise(promise) => RowColumn {
                name: promise.var.name.clone(),
                type_oid: promise.var.dtype.oid,
                typmod: promise.var.dtype.typmod,
                collation: promise.var.dtype.collation,
            },
            Datum::Record(rec) => RowColumn {
                name: rec.name.clone(),
                type_oid: rec.row_type,
                // typmod and collation are unknowable for a whole record
                typmod: None,
                collation: None,
            },
            other => {
                return Err(CompileError::internal(format!(
                    "row member \"{}\" is not a variable or record",
                    other.name()
                )));
            }
        };
        shape.push(column);
    }
    Ok(Row {
        name: "(unnamed row)".to_string(),
        members: members.to_vec(),
        shape,
    })
}

fn format_signature(catalog: &dyn Catalog, routine: &RoutineSource) -> String {
    let args: Vec<String> = routine
        .args
        .iter()
        .filter(|arg| arg.mode.is_input())
        .map(|arg| {
            catalog
                .lookup_type(arg.type_oid)
                .map(|meta| meta.name.clone())
                .unwrap_or_else(|| arg.type_oid.to_string())
        })
        .collect();
    format!("{}({})", routine.name, args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ParsedBody;
    use plscript_catalog::MemoryCatalog;

    /// Parses every body to an empty block, optionally labeled or carrying
    /// exception handlers.
    struct StubParser {
        label: Option<&'static str>,
        with_exception_handlers: bool,
    }

    impl StubParser {
        fn empty() -> Self {
            Self {
                label: None,
                with_exception_handlers: false,
            }
        }
    }

    impl BodyParser for StubParser {
        fn parse(
            &self,
            _source: &str,
            _session: &mut CompileSession,
        ) -> std::result::Result<ParsedBody, ParseFailure> {
            Ok(ParsedBody {
                action: Block {
                    label: self.label.map(str::to_string),
                    body: Vec::new(),
                    has_exception_handlers: self.with_exception_handlers,
                },
                has_exception_block: self.with_exception_handlers,
            })
        }
    }

    fn void_routine(name: &str, args: Vec<crate::function::ArgSpec>) -> RoutineSource {
        RoutineSource {
            oid: Oid::new(40001),
            name: name.to_string(),
            kind: RoutineKind::Function,
            args,
            return_type: oids::VOID,
            returns_set: false,
            volatility: Volatility::Volatile,
            input_collation: None,
            body: "begin end".to_string(),
        }
    }

    #[test]
    fn validator_substitutes_by_family() {
        assert_eq!(validator_substitute(oids::ANY_ELEMENT), oids::INT4);
        assert_eq!(validator_substitute(oids::ANY_ARRAY), oids::INT4_ARRAY);
        assert_eq!(validator_substitute(oids::ANY_RANGE), oids::INT4_RANGE);
        assert_eq!(
            validator_substitute(oids::ANY_COMPATIBLE_MULTIRANGE),
            oids::INT4_MULTIRANGE
        );
    }

    #[test]
    fn polymorphic_args_need_call_types_outside_validation() {
        let mut types = [oids::ANY_ELEMENT];
        let err = resolve_polymorphic_argtypes(&mut types, None, false, "f").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedType { .. }));

        let mut types = [oids::ANY_ELEMENT, oids::TEXT];
        resolve_polymorphic_argtypes(&mut types, Some(&[oids::BOOL, oids::TEXT]), false, "f")
            .unwrap();
        assert_eq!(types, [oids::BOOL, oids::TEXT]);
    }

    #[test]
    fn dummy_return_appends_once() {
        let mut session = CompileSession::new();
        let mut action = Block::default();
        add_dummy_return(&mut session, &mut action, None);
        assert_eq!(action.body.len(), 1);
        assert!(action.body[0].is_return());

        // a body already ending in RETURN is left alone
        add_dummy_return(&mut session, &mut action, None);
        assert_eq!(action.body.len(), 1);
    }

    #[test]
    fn dummy_return_wraps_labeled_and_handled_blocks() {
        let mut session = CompileSession::new();
        let mut action = Block {
            label: Some("outer".to_string()),
            body: Vec::new(),
            has_exception_handlers: false,
        };
        add_dummy_return(&mut session, &mut action, Some(DatumId::new(3)));

        assert!(action.label.is_none());
        assert_eq!(action.body.len(), 2);
        assert!(matches!(&action.body[0], Statement::Block { block, .. } if block.label.as_deref() == Some("outer")));
        match &action.body[1] {
            Statement::Return { result, .. } => assert_eq!(*result, Some(DatumId::new(3))),
            other => panic!("expected trailing return, got {other:?}"),
        }
    }

    #[test]
    fn signature_lists_input_types_only() {
        let catalog = MemoryCatalog::with_builtins();
        let routine = void_routine(
            "f",
            vec![
                crate::function::ArgSpec::named("a", oids::INT4, ArgMode::In),
                crate::function::ArgSpec::named("b", oids::TEXT, ArgMode::Out),
            ],
        );
        assert_eq!(format_signature(&catalog, &routine), "f(integer)");
    }

    #[test]
    fn grammar_contract_violation_is_internal() {
        struct BrokenParser;
        impl BodyParser for BrokenParser {
            fn parse(
                &self,
                _source: &str,
                _session: &mut CompileSession,
            ) -> std::result::Result<ParsedBody, ParseFailure> {
                Err(ParseFailure::Internal(1))
            }
        }

        let catalog = MemoryCatalog::with_builtins();
        let parser = BrokenParser;
        let builder = FunctionBuilder::new(&catalog, &parser);
        let err = builder
            .compile(&CallContext::plain(void_routine("f", vec![])))
            .unwrap_err();
        assert!(matches!(err.root(), CompileError::Internal { .. }));
    }

    #[test]
    fn failures_carry_routine_context() {
        let catalog = MemoryCatalog::with_builtins();
        let parser = StubParser::empty();
        let builder = FunctionBuilder::new(&catalog, &parser);

        let mut routine = void_routine("broken", vec![]);
        routine.return_type = oids::TRIGGER;
        let err = builder.compile(&CallContext::plain(routine)).unwrap_err();
        assert!(err.to_string().contains("compilation of function \"broken\""));
        assert!(matches!(err.root(), CompileError::InvalidUsage { .. }));
    }
}
