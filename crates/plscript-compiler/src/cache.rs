//! The compiled-function cache boundary.
//!
//! The cache component lives outside this crate: it decides when a routine
//! needs (re)compiling, owns every [`CompiledFunction`] it stores, and
//! serializes compiles of the same routine. What the compiler contributes is
//! the [`CompileBackend`] pair of entry points the cache calls through:
//! compile on a miss or invalidation, release when an entry is dropped.
//!
//! The compile entry point is safe to invoke concurrently for different
//! routines: each call owns a private session and has no observable side
//! effect beyond its returned value.

use plscript_core::CompileError;

use crate::function::{CallContext, CompiledFunction};
use crate::function_builder::FunctionBuilder;

/// The entry points this compiler registers with the external cache.
pub trait CompileBackend {
    /// Compile the routine for the given invocation context.
    fn compile(&self, ctx: &CallContext) -> Result<CompiledFunction, CompileError>;

    /// Give back a function the cache no longer holds. The compiled form
    /// owns no external resources, so dropping it is all there is to do;
    /// the hook exists so the cache has a single disposal path.
    fn release(&self, function: CompiledFunction);
}

impl CompileBackend for FunctionBuilder<'_> {
    fn compile(&self, ctx: &CallContext) -> Result<CompiledFunction, CompileError> {
        FunctionBuilder::compile(self, ctx)
    }

    fn release(&self, function: CompiledFunction) {
        drop(function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Block, BodyParser, ParseFailure, ParsedBody};
    use crate::function::{RoutineKind, RoutineSource, Volatility};
    use crate::session::CompileSession;
    use plscript_catalog::MemoryCatalog;
    use plscript_core::{Oid, oids};

    struct EmptyParser;

    impl BodyParser for EmptyParser {
        fn parse(
            &self,
            _source: &str,
            _session: &mut CompileSession,
        ) -> Result<ParsedBody, ParseFailure> {
            Ok(ParsedBody {
                action: Block::default(),
                has_exception_block: false,
            })
        }
    }

    #[test]
    fn backend_round_trip() {
        let catalog = MemoryCatalog::with_builtins();
        let parser = EmptyParser;
        let builder = FunctionBuilder::new(&catalog, &parser);
        let backend: &dyn CompileBackend = &builder;

        let routine = RoutineSource {
            oid: Oid::new(40100),
            name: "noop".to_string(),
            kind: RoutineKind::Function,
            args: vec![],
            return_type: oids::VOID,
            returns_set: false,
            volatility: Volatility::Volatile,
            input_collation: None,
            body: "begin end".to_string(),
        };
        let function = backend.compile(&CallContext::plain(routine)).unwrap();
        assert_eq!(function.signature, "noop()");
        backend.release(function);
    }
}
