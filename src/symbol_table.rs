//! Lexically scoped name resolution shared by the compiler and (by index
//! discipline) the VM.
//!
//! The root table defines Global symbols; every nested table defines Local
//! symbols. Indices are handed out per table in definition order, which is
//! exactly the slot numbering the VM uses for the globals array and for a
//! frame's local area.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// A single scope's name-to-symbol mapping with an optional enclosing
/// table. The chain is owned: entering a function scope wraps the current
/// table, leaving unwraps it.
#[derive(Debug, Default)]
pub struct SymbolTable {
    store: HashMap<String, Symbol>,
    outer: Option<Box<SymbolTable>>,
    num_definitions: usize,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// A fresh table enclosed by `outer`. Definitions in the new table are
    /// Local; resolution falls through to `outer`.
    pub fn enclosing(outer: SymbolTable) -> SymbolTable {
        SymbolTable {
            store: HashMap::new(),
            outer: Some(Box::new(outer)),
            num_definitions: 0,
        }
    }

    /// Insert `name` at the next free index of this table.
    ///
    /// Re-defining an existing name overwrites the mapping but still
    /// consumes a fresh index; the compiler rejects that case before it
    /// reaches here.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_some() {
            SymbolScope::Local
        } else {
            SymbolScope::Global
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    /// Look up `name` here, then through the outer chain. A symbol found in
    /// an outer table is returned unchanged, scope tag included.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        match self.store.get(name) {
            Some(symbol) => Some(symbol),
            None => self.outer.as_ref().and_then(|outer| outer.resolve(name)),
        }
    }

    /// Whether `name` is defined in this table itself (not an outer).
    pub fn is_defined_locally(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    pub fn has_outer(&self) -> bool {
        self.outer.is_some()
    }

    /// Unwrap the enclosing table, discarding this scope's definitions.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|outer| *outer)
    }

    /// Count of symbols defined in this table only; sizes a function's
    /// local area.
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }
}
