//! Embedded SQL expressions.
//!
//! A routine body embeds SQL expression strings that the host database's own
//! parser handles. The compiler's side of that handshake is [`SqlExpr`]: the
//! expression text plus the set of datums the expression references, filled
//! in by the identifier-resolution hooks while the external parser runs. The
//! executor uses the dependency set to know which datums to re-evaluate
//! before running the expression.

use rustc_hash::FxHashSet;

use plscript_core::DatumId;

/// One embedded SQL expression and its datum dependencies.
///
/// The dependency set lives as long as the expression itself. It is owned
/// here, not borrowed from any parse-time scratch state, because it outlives
/// every individual parse of the expression text.
#[derive(Debug, Clone, Default)]
pub struct SqlExpr {
    text: String,
    param_deps: FxHashSet<DatumId>,
}

impl SqlExpr {
    /// Create an expression for the given source text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            param_deps: FxHashSet::default(),
        }
    }

    /// The expression source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Record that the expression references a datum.
    pub fn record_dependency(&mut self, datum: DatumId) {
        self.param_deps.insert(datum);
    }

    /// Whether the expression references the given datum.
    pub fn depends_on(&self, datum: DatumId) -> bool {
        self.param_deps.contains(&datum)
    }

    /// Number of distinct datums referenced.
    pub fn dependency_count(&self) -> usize {
        self.param_deps.len()
    }

    /// The referenced datums in ascending id order.
    pub fn dependencies(&self) -> Vec<DatumId> {
        let mut deps: Vec<DatumId> = self.param_deps.iter().copied().collect();
        deps.sort_unstable();
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_deduplicate_and_sort() {
        let mut expr = SqlExpr::new("x + y + x");
        expr.record_dependency(DatumId::new(7));
        expr.record_dependency(DatumId::new(2));
        expr.record_dependency(DatumId::new(7));

        assert_eq!(expr.dependency_count(), 2);
        assert!(expr.depends_on(DatumId::new(2)));
        assert!(!expr.depends_on(DatumId::new(3)));
        assert_eq!(expr.dependencies(), vec![DatumId::new(2), DatumId::new(7)]);
    }
}
