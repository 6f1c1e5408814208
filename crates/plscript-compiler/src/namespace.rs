//! Lexical scope management for routine compilation.
//!
//! This module provides [`NamespaceStack`], the stack of lexical scopes the
//! compiler maintains while walking a routine body. Each scope holds an
//! ordered list of name → datum bindings plus an optional block label.
//! Lookup prefers the innermost match and understands one-, two- and
//! three-part dotted names: a leading component can be a block label (scope
//! qualification) or a record name (field qualification). Scopes never merge;
//! shadowing is purely positional.

use plscript_core::DatumId;

/// What kind of datum a namespace entry binds.
///
/// Only variables and records are ever entered into a namespace; record
/// fields resolve through their parent record and rows are never referenced
/// by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A scalar variable (or promise) slot.
    Variable,
    /// A record variable.
    Record,
}

/// One name → datum binding.
#[derive(Debug, Clone)]
pub struct NamespaceItem {
    pub kind: ItemKind,
    pub datum: DatumId,
    pub name: String,
}

#[derive(Debug, Default)]
struct NamespaceScope {
    label: Option<String>,
    items: Vec<NamespaceItem>,
}

/// The stack of lexical scopes for one compile session.
#[derive(Debug, Default)]
pub struct NamespaceStack {
    scopes: Vec<NamespaceScope>,
}

impl NamespaceStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a new scope, optionally labeled.
    pub fn push_scope(&mut self, label: Option<&str>) {
        self.scopes.push(NamespaceScope {
            label: label.map(str::to_string),
            items: Vec::new(),
        });
    }

    /// Leave the current scope, dropping its bindings.
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Append a binding to the innermost scope.
    ///
    /// Panics if no scope has been pushed; the compiler always pushes the
    /// routine's outer scope before binding anything.
    pub fn add_item(&mut self, kind: ItemKind, datum: DatumId, name: &str) {
        let scope = self
            .scopes
            .last_mut()
            .expect("namespace stack has no scope to add to");
        scope.items.push(NamespaceItem {
            kind,
            datum,
            name: name.to_string(),
        });
    }

    /// Resolve a dotted name against the stack.
    ///
    /// Scopes are scanned innermost-first (only the innermost when
    /// `current_only`), and within a scope newest bindings win. Three
    /// interpretations are tried in order:
    ///
    /// 1. `name1` alone names an item in the scope. A variable is skipped
    ///    here when further name parts remain, since a scalar has no fields;
    ///    a record takes the match and leaves the remaining parts to field
    ///    resolution.
    /// 2. `name1` matches the scope's label and `name2` names an item in it
    ///    (with `name3`, if present, left as a candidate record field).
    /// 3. Nothing in this scope: continue outward.
    ///
    /// Returns the matched item and how many name parts it consumed. Field
    /// existence is never checked here; fields materialize lazily through the
    /// arena.
    pub fn lookup(
        &self,
        name1: &str,
        name2: Option<&str>,
        name3: Option<&str>,
        current_only: bool,
    ) -> Option<(&NamespaceItem, usize)> {
        for scope in self.scopes.iter().rev() {
            for item in scope.items.iter().rev() {
                if item.name == name1
                    && (name2.is_none() || item.kind != ItemKind::Variable)
                {
                    return Some((item, 1));
                }
            }

            if let Some(name2) = name2
                && scope.label.as_deref() == Some(name1)
            {
                for item in scope.items.iter().rev() {
                    if item.name == name2
                        && (name3.is_none() || item.kind != ItemKind::Variable)
                    {
                        return Some((item, 2));
                    }
                }
            }

            if current_only {
                break;
            }
        }
        None
    }
}
