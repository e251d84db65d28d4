// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Inline expansion of computed-return function bodies.
//!
//! A call to a user-defined or database function whose signature declares a
//! computed return re-parses the body with the function-body grammar and
//! recursively binds it under a derived context: parameters become typed
//! variables (constants when the argument was a literal), and database
//! functions bind under their owning database. Results are memoized per
//! call-site fingerprint; an explicit "currently expanding" set breaks
//! recursion cycles.

use std::sync::Arc;

use tracing::{debug, trace};

use super::cache::CallSiteFingerprint;
use super::scope::{LocalScope, ScopeKind};
use super::semantic::SemanticModel;
use super::Binder;
use crate::catalog::{
    ClusterRef, DatabaseRef, FunctionBodyFacts, FunctionKind, FunctionRef, ParameterTypeKind,
    SignatureRef, Symbol, Type, VariableSymbol,
};
use crate::parser::parse_function_body;
use crate::types::DataValue;

/// The bound form of a function body at one call site.
#[derive(Debug)]
pub struct Expansion {
    pub block: crate::parser::QueryBlock,
    pub model: SemanticModel,
    pub result_type: Type,
}

/// One parameter binding entering an expansion.
#[derive(Debug, Clone)]
pub(super) struct ExpansionArg {
    pub name: String,
    pub ty: Type,
    pub is_constant: bool,
    pub value: Option<DataValue>,
}

impl Binder {
    /// Expand `body` for the given call-site argument bindings, memoized.
    /// Returns `None` when the body cannot be expanded: a parse failure, or
    /// the signature is already expanding somewhere up the stack.
    pub(super) fn expand_body(
        &mut self,
        function: &FunctionRef,
        signature: &SignatureRef,
        body: &str,
        args: &[ExpansionArg],
    ) -> Option<Arc<Expansion>> {
        let fingerprint = fingerprint_of(signature, args);

        if let Some(found) = self.local_cache.borrow().expansions.get(&fingerprint) {
            trace!(function = function.name(), "expansion cache hit (local)");
            return found.clone();
        }
        if function.kind() == FunctionKind::Database {
            if let Some(found) = self.global_cache.expansion(&fingerprint) {
                trace!(function = function.name(), "expansion cache hit (global)");
                return found;
            }
        }

        let key = Arc::as_ptr(signature) as usize;
        if !self.local_cache.borrow_mut().expanding.insert(key) {
            debug!(
                function = function.name(),
                "recursive expansion detected, returning no expansion"
            );
            return None;
        }
        let expansion = self.expand_uncached(function, signature, body, args);
        self.local_cache.borrow_mut().expanding.remove(&key);

        // cache placement follows the body facts: dynamic-scope bodies are
        // never cached, variable-return database functions are shared
        let facts = signature.body_facts().unwrap_or_default();
        if !facts.uses_unqualified_table {
            if function.kind() == FunctionKind::Database && facts.variable_return {
                self.global_cache
                    .record_expansion(fingerprint, expansion.clone());
            } else {
                self.local_cache
                    .borrow_mut()
                    .expansions
                    .insert(fingerprint, expansion.clone());
            }
        }
        expansion
    }

    fn expand_uncached(
        &mut self,
        function: &FunctionRef,
        signature: &SignatureRef,
        body: &str,
        args: &[ExpansionArg],
    ) -> Option<Arc<Expansion>> {
        // grammar failures inside a body are contained: the expansion is
        // simply unavailable
        let block = match parse_function_body(body) {
            Ok(block) => block,
            Err(err) => {
                debug!(
                    function = function.name(),
                    error = %err,
                    "function body failed to parse, expansion unavailable"
                );
                return None;
            }
        };

        let (cluster, database) = self.expansion_context(function);
        let mut scope = LocalScope::new();
        for arg in args {
            let symbol = if arg.is_constant {
                VariableSymbol::constant(arg.name.clone(), arg.ty.clone(), arg.value.clone())
            } else {
                VariableSymbol::new(arg.name.clone(), arg.ty.clone())
            };
            scope.insert(Symbol::Variable(symbol));
        }

        let mut inner = Binder {
            catalog: self.catalog.clone(),
            global_cache: self.global_cache.clone(),
            local_cache: self.local_cache.clone(),
            semantics: SemanticModel::new(&block),
            current_cluster: cluster,
            current_database: database,
            local_scope: scope,
            row_scope: None,
            right_row_scope: None,
            scope_kind: ScopeKind::Normal,
            implicit_argument_type: None,
            open: std::mem::take(&mut self.open),
            body_facts: Some(FunctionBodyFacts::default()),
            cancel: self.cancel.clone(),
            cursor: None,
            captured_symbols: None,
            captured_row_scope: None,
            capture_match: crate::catalog::SymbolMatch::ANY,
            capture_kinds: crate::catalog::FunctionKinds::ALL,
        };
        let result_type = inner.bind_block(&block);
        self.open = inner.open;

        let mut facts = inner.body_facts.unwrap_or_default();
        facts.variable_return = result_type.is_tabular()
            && (facts.uses_unqualified_table || has_tabular_parameter(signature));
        signature.record_body_facts(facts);
        if !facts.variable_return {
            signature.record_fixed_computed_return(Some(result_type.clone()));
        }

        Some(Arc::new(Expansion {
            block,
            model: inner.semantics,
            result_type,
        }))
    }

    /// Bind a body with no owning signature, as pattern mappings do: fresh
    /// local scope with the given bindings, inherited catalog context, no
    /// caching.
    pub(super) fn bind_anonymous_body(&mut self, body: &str, args: &[ExpansionArg]) -> Type {
        let block = match parse_function_body(body) {
            Ok(block) => block,
            Err(err) => {
                debug!(error = %err, "pattern body failed to parse");
                return Type::Error;
            }
        };
        let mut scope = LocalScope::new();
        for arg in args {
            let symbol = if arg.is_constant {
                VariableSymbol::constant(arg.name.clone(), arg.ty.clone(), arg.value.clone())
            } else {
                VariableSymbol::new(arg.name.clone(), arg.ty.clone())
            };
            scope.insert(Symbol::Variable(symbol));
        }
        let mut inner = Binder {
            catalog: self.catalog.clone(),
            global_cache: self.global_cache.clone(),
            local_cache: self.local_cache.clone(),
            semantics: SemanticModel::new(&block),
            current_cluster: self.current_cluster.clone(),
            current_database: self.current_database.clone(),
            local_scope: scope,
            row_scope: None,
            right_row_scope: None,
            scope_kind: ScopeKind::Normal,
            implicit_argument_type: None,
            open: std::mem::take(&mut self.open),
            body_facts: None,
            cancel: self.cancel.clone(),
            cursor: None,
            captured_symbols: None,
            captured_row_scope: None,
            capture_match: crate::catalog::SymbolMatch::ANY,
            capture_kinds: crate::catalog::FunctionKinds::ALL,
        };
        let result = inner.bind_block(&block);
        self.open = inner.open;
        result
    }

    /// Database functions expand under their owning catalog context; local
    /// functions inherit the caller's.
    fn expansion_context(&self, function: &FunctionRef) -> (ClusterRef, DatabaseRef) {
        if function.kind() != FunctionKind::Database {
            return (self.current_cluster.clone(), self.current_database.clone());
        }
        for cluster in self.catalog.clusters() {
            for database in cluster.databases() {
                if database
                    .functions()
                    .iter()
                    .any(|f| Arc::ptr_eq(f, function))
                {
                    return (cluster.clone(), database.clone());
                }
            }
        }
        (self.current_cluster.clone(), self.current_database.clone())
    }

    /// Record a body fact while binding inside an expansion.
    pub(super) fn note_body_fact(&mut self, note: impl FnOnce(&mut FunctionBodyFacts)) {
        if let Some(facts) = &mut self.body_facts {
            note(facts);
        }
    }
}

fn has_tabular_parameter(signature: &SignatureRef) -> bool {
    signature.parameters().iter().any(|p| {
        matches!(
            p.type_kind,
            ParameterTypeKind::Tabular | ParameterTypeKind::SingleColumnTable
        ) || matches!(
            &p.type_kind,
            ParameterTypeKind::Declared(types) if types.iter().any(Type::is_tabular)
        )
    })
}

/// Two call sites with the same signature and the same per-parameter
/// `(name, type, constant-ness, value)` share one expansion.
fn fingerprint_of(signature: &SignatureRef, args: &[ExpansionArg]) -> CallSiteFingerprint {
    CallSiteFingerprint {
        signature: Arc::as_ptr(signature) as usize,
        params: args
            .iter()
            .map(|arg| {
                (
                    arg.name.to_ascii_lowercase(),
                    arg.ty.to_string(),
                    arg.is_constant,
                    arg.value.clone(),
                )
            })
            .collect(),
    }
}
