// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The local scope chain: `let` bindings, `as` names, function parameters.
//!
//! Lookup deliberately gathers hits from every layer: two live bindings of
//! the same name are an ambiguity, reported as a group symbol, rather than
//! one shadowing the other.

use std::collections::HashMap;

use crate::catalog::Symbol;

/// Which function symbols a position may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeKind {
    #[default]
    Normal,
    /// Inside a `summarize`/`make-series` aggregate clause.
    Aggregate,
    /// Inside an `evaluate` invocation.
    PlugIn,
}

#[derive(Debug, Default, Clone)]
pub struct LocalScope {
    layers: Vec<HashMap<String, Vec<Symbol>>>,
}

impl LocalScope {
    pub fn new() -> LocalScope {
        LocalScope {
            layers: vec![HashMap::new()],
        }
    }

    pub fn push_layer(&mut self) {
        self.layers.push(HashMap::new());
    }

    pub fn pop_layer(&mut self) {
        self.layers.pop();
        debug_assert!(!self.layers.is_empty(), "the base layer must stay");
    }

    pub fn insert(&mut self, symbol: Symbol) {
        let key = symbol.name().to_ascii_lowercase();
        self.layers
            .last_mut()
            .expect("scope always has a layer")
            .entry(key)
            .or_default()
            .push(symbol);
    }

    /// Every live binding of `name`, across all layers.
    pub fn lookup(&self, name: &str) -> Vec<Symbol> {
        let key = name.to_ascii_lowercase();
        self.layers
            .iter()
            .flat_map(|layer| layer.get(&key).into_iter().flatten())
            .cloned()
            .collect()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.layers
            .iter()
            .flat_map(|layer| layer.values())
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Type, VariableSymbol};

    fn var(name: &str) -> Symbol {
        Symbol::Variable(VariableSymbol::new(name, Type::LONG))
    }

    #[test]
    fn same_name_in_nested_layers_is_ambiguous() {
        let mut scope = LocalScope::new();
        scope.insert(var("x"));
        scope.push_layer();
        scope.insert(var("x"));
        assert_eq!(scope.lookup("x").len(), 2);
        scope.pop_layer();
        assert_eq!(scope.lookup("x").len(), 1);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut scope = LocalScope::new();
        scope.insert(var("Result"));
        assert_eq!(scope.lookup("result").len(), 1);
    }
}
