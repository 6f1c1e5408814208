//! PLScript compiler core.
//!
//! Compiles source text of the PLScript stored-routine language (functions,
//! procedures, DML and event triggers, and anonymous code blocks) into the
//! in-memory executable form the host database runs. The hard parts live
//! here: namespace resolution across nested lexical blocks, the stable-index
//! datum arena every later execution phase depends on, type resolution
//! against a live catalog, and the identifier-resolution hooks embedded into
//! the host's SQL expression parser.
//!
//! Statement execution, the SQL grammar itself, catalog storage and the
//! compiled-function cache are external collaborators, consumed or exposed
//! only at their trait boundaries.
//!
//! ## Modules
//!
//! - [`action`]: the statement-action tree model and external parser traits
//! - [`arena`]: the compile-session datum arena
//! - [`cache`]: the compiled-function cache boundary
//! - [`conditions`]: exception condition names
//! - [`datum`]: compiled symbol records
//! - [`expr`]: embedded SQL expressions and their dependency sets
//! - [`function`]: routine metadata and the compiled function
//! - [`function_builder`]: the compile state machine
//! - [`namespace`]: lexical scope management
//! - [`resolver`]: identifier resolution hooks and scanner-side lookups
//! - [`session`]: per-compile mutable state
//! - [`type_resolver`]: type resolution against the host catalog

pub mod action;
pub mod arena;
pub mod cache;
pub mod conditions;
pub mod datum;
pub mod expr;
pub mod function;
pub mod function_builder;
pub mod namespace;
pub mod resolver;
pub mod session;
pub mod type_resolver;

pub use action::{Block, BodyParser, ParseFailure, ParsedBody, SqlExprParser, Statement};
pub use arena::DatumArena;
pub use cache::CompileBackend;
pub use conditions::{Condition, ConditionMatch, parse_condition, recognize_condition};
pub use datum::{Datum, Promise, PromiseKind, Record, RecordField, Row, RowColumn, Variable};
pub use expr::SqlExpr;
pub use function::{
    ArgMode, ArgSpec, CallContext, CompiledFunction, FunctionTraits, RoutineKind, RoutineSource,
    TriggerKind, Volatility,
};
pub use function_builder::{CompilerOptions, FunctionBuilder};
pub use namespace::{ItemKind, NamespaceItem, NamespaceStack};
pub use resolver::{
    ColumnRef, ExprResolver, ParamRef, ResolutionPolicy, SqlResolverHooks, parse_cword_rowtype,
    parse_cword_type, parse_dblword, parse_tripword, parse_word, parse_word_rowtype,
    parse_word_type,
};
pub use session::{CompileSession, IdentifierLookup};
pub use type_resolver::{ParsedTypeName, TypeClass, TypeDescriptor, TypeResolver};

// Re-export the leaf types callers need alongside the compiler.
pub use plscript_core::{CompileError, DatumId, Oid, ShapeId, Span, SqlState, oids};
