// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Semantic information attached to syntax nodes.
//!
//! The syntax tree stays immutable; results live in a side table keyed by
//! node id, one entry per bound expression.

use std::sync::Arc;

use super::error::Diagnostic;
use super::expand::Expansion;
use crate::catalog::{Symbol, Type};
use crate::parser::{NodeId, QueryBlock};
use crate::types::DataValue;

/// Everything the binder knows about one expression node.
#[derive(Debug, Clone)]
pub struct SemanticInfo {
    /// The symbol a name or call resolved to, if any.
    pub referenced: Option<Symbol>,
    /// Never "unknown": binding failures yield [`Type::Error`].
    pub result_type: Type,
    pub diagnostics: Vec<Diagnostic>,
    pub is_constant: bool,
    /// The literal value, for constants whose value is statically known.
    pub constant_value: Option<DataValue>,
    /// The expanded body of a computed-return call at this call site.
    pub expansion: Option<Arc<Expansion>>,
}

impl SemanticInfo {
    pub fn of_type(result_type: Type) -> SemanticInfo {
        SemanticInfo {
            referenced: None,
            result_type,
            diagnostics: Vec::new(),
            is_constant: false,
            constant_value: None,
            expansion: None,
        }
    }

    pub fn error() -> SemanticInfo {
        SemanticInfo::of_type(Type::Error)
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> SemanticInfo {
        self.referenced = Some(symbol);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> SemanticInfo {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn constant(mut self, value: Option<DataValue>) -> SemanticInfo {
        self.is_constant = true;
        self.constant_value = value;
        self
    }
}

/// The side table produced by a bind: node id to semantic info.
#[derive(Debug)]
pub struct SemanticModel {
    infos: Vec<Option<SemanticInfo>>,
}

impl SemanticModel {
    pub(super) fn new(block: &QueryBlock) -> SemanticModel {
        SemanticModel {
            infos: vec![None; block.node_count as usize],
        }
    }

    pub(super) fn set(&mut self, node: NodeId, info: SemanticInfo) {
        let slot = node.0 as usize;
        if slot >= self.infos.len() {
            self.infos.resize(slot + 1, None);
        }
        self.infos[slot] = Some(info);
    }

    pub fn info(&self, node: NodeId) -> Option<&SemanticInfo> {
        self.infos.get(node.0 as usize).and_then(|slot| slot.as_ref())
    }

    /// The node's bound type; the error type when the node was never bound.
    pub fn result_type_of(&self, node: NodeId) -> Type {
        self.info(node)
            .map(|info| info.result_type.clone())
            .unwrap_or(Type::Error)
    }

    pub fn referenced_symbol_of(&self, node: NodeId) -> Option<&Symbol> {
        self.info(node).and_then(|info| info.referenced.as_ref())
    }

    pub fn is_constant(&self, node: NodeId) -> bool {
        self.info(node).is_some_and(|info| info.is_constant)
    }

    pub fn expansion_of(&self, node: NodeId) -> Option<&Arc<Expansion>> {
        self.info(node).and_then(|info| info.expansion.as_ref())
    }

    /// All diagnostics in source order.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        let mut all: Vec<&Diagnostic> = self
            .infos
            .iter()
            .flatten()
            .flat_map(|info| info.diagnostics.iter())
            .collect();
        all.sort_by_key(|d| (d.span.start, d.span.end));
        all
    }
}
