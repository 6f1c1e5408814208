//! PLScript core types.
//!
//! Shared leaf types for the PLScript stored-routine compiler: source spans,
//! the unified compile-error taxonomy, object identifiers, and SQLSTATE
//! condition codes. Everything here is consumed by both the catalog interface
//! and the compiler proper; nothing here depends on either.

pub mod error;
pub mod ids;
pub mod span;
pub mod sqlstate;

pub use error::CompileError;
pub use ids::{DatumId, Oid, ShapeId, oids};
pub use span::Span;
pub use sqlstate::SqlState;
