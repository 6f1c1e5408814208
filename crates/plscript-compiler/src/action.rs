//! The statement-action tree and the external parser boundary.
//!
//! The compiler does not parse routine bodies itself; it hands the source
//! text to an external grammar through [`BodyParser`] and receives back an
//! action tree. The tree is opaque to the compiler except for the block
//! structure this module models: finalization needs to see the outermost
//! block's label and exception handlers to place the synthesized trailing
//! RETURN correctly.
//!
//! Embedded SQL expressions are likewise parsed externally; [`SqlExprParser`]
//! is that boundary, with the identifier-resolution hooks of
//! [`crate::resolver`] injected per call.

use thiserror::Error;

use plscript_core::{CompileError, DatumId};

use crate::expr::SqlExpr;
use crate::resolver::SqlResolverHooks;
use crate::session::CompileSession;

/// One lexical block of statements.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// The block's label, when the source gave one.
    pub label: Option<String>,
    pub body: Vec<Statement>,
    /// Whether the block declares any exception handlers.
    pub has_exception_handlers: bool,
}

/// One statement in a block body.
///
/// The compiler inspects only what finalization needs: nested blocks and
/// RETURN. Everything else a body can contain travels as an opaque SQL
/// statement for the executor.
#[derive(Debug, Clone)]
pub enum Statement {
    /// A nested block.
    Block { stmt_id: u32, block: Block },
    /// RETURN, optionally naming the datum holding the result.
    Return {
        stmt_id: u32,
        result: Option<DatumId>,
        expr: Option<SqlExpr>,
    },
    /// Any other statement, carried opaquely.
    Sql { stmt_id: u32, expr: SqlExpr },
}

impl Statement {
    /// The statement's id, unique within one compiled function.
    pub fn stmt_id(&self) -> u32 {
        match self {
            Statement::Block { stmt_id, .. }
            | Statement::Return { stmt_id, .. }
            | Statement::Sql { stmt_id, .. } => *stmt_id,
        }
    }

    /// Whether this is a RETURN statement.
    pub fn is_return(&self) -> bool {
        matches!(self, Statement::Return { .. })
    }
}

/// What a successful body parse produces.
#[derive(Debug)]
pub struct ParsedBody {
    /// The outermost block of the routine body.
    pub action: Block,
    /// Whether any exception block appears anywhere in the body.
    pub has_exception_block: bool,
}

/// How a body parse can fail.
#[derive(Debug, Error)]
pub enum ParseFailure {
    /// An ordinary syntax error, reported through normal error channels.
    #[error(transparent)]
    Syntax(#[from] CompileError),
    /// The grammar returned a nonzero status without reporting anything:
    /// a defect in the grammar or scanner, not in the user's source.
    #[error("routine body parser returned {0}")]
    Internal(i32),
}

/// The external statement parser/lexer.
///
/// Receives the full routine body plus the live compile session, so the
/// grammar can look identifiers up and materialize record fields while it
/// parses (see [`crate::resolver`]). Statement ids come from
/// [`CompileSession::next_statement_id`].
pub trait BodyParser {
    fn parse(
        &self,
        source: &str,
        session: &mut CompileSession,
    ) -> std::result::Result<ParsedBody, ParseFailure>;
}

/// The external SQL expression parser.
///
/// Parses one embedded expression string, calling back into the supplied
/// hooks for every identifier it cannot resolve as a table column. The
/// output tree belongs to the host database and stays opaque here.
pub trait SqlExprParser {
    type Output;

    fn parse_expression(
        &self,
        text: &str,
        hooks: &mut dyn SqlResolverHooks,
    ) -> std::result::Result<Self::Output, CompileError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_ids_and_return_detection() {
        let ret = Statement::Return {
            stmt_id: 3,
            result: None,
            expr: None,
        };
        let sql = Statement::Sql {
            stmt_id: 4,
            expr: SqlExpr::new("1 + 1"),
        };
        assert_eq!(ret.stmt_id(), 3);
        assert!(ret.is_return());
        assert!(!sql.is_return());
    }
}
