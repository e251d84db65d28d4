// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Multi-table probes: find and search.
//!
//! Both evaluate a predicate against a set of candidate tables: the listed
//! `in (...)` tables, the incoming row scope (search only), or every table
//! of the current database. The candidates unify by name for find and by
//! name-and-type for search.

use super::super::error::{Diagnostic, DiagnosticKind};
use super::super::unify::{unify, UnifyStrategy};
use super::super::Binder;
use crate::catalog::{ColumnSymbol, TableRef, TableSymbol, Type};
use crate::parser::{Expr, ExprKind};
use crate::types::ScalarKind;

impl Binder {
    pub(in crate::binder) fn bind_find(
        &mut self,
        tables: Option<&[Expr]>,
        predicate: &Expr,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let candidates = self.candidate_tables(tables, false, diagnostics);
        if candidates.is_empty() {
            return self.empty_table();
        }
        let cacheable = candidates.iter().all(|t| self.is_catalog_table(t));
        let unified = unify(
            UnifyStrategy::ByName,
            &candidates,
            &self.global_cache,
            cacheable,
        );

        let saved = self.row_scope.take();
        self.row_scope = Some(unified.clone());
        let ty = self.bind_expr(predicate);
        self.require_bool(&ty, predicate.span, diagnostics);
        let unified = self.effective_row_scope().unwrap_or(unified);
        self.row_scope = saved;

        let mut columns = vec![ColumnSymbol::scalar("source_", ScalarKind::String)];
        columns.extend(unified.columns().iter().cloned());
        TableSymbol::from_columns("", columns, unified.is_open())
    }

    pub(in crate::binder) fn bind_search(
        &mut self,
        tables: Option<&[Expr]>,
        predicate: &Expr,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let candidates = self.candidate_tables(tables, true, diagnostics);
        if candidates.is_empty() {
            return self.empty_table();
        }
        let cacheable = candidates.iter().all(|t| self.is_catalog_table(t));
        let unified = unify(
            UnifyStrategy::ByNameAndType,
            &candidates,
            &self.global_cache,
            cacheable,
        );

        let saved = self.row_scope.take();
        self.row_scope = Some(unified.clone());
        // a bare string literal is a term search over the whole row; any
        // other predicate must be boolean
        let ty = self.bind_expr(predicate);
        if !matches!(predicate.kind, ExprKind::Literal(crate::parser::Literal::String(_))) {
            self.require_bool(&ty, predicate.span, diagnostics);
        }
        let unified = self.effective_row_scope().unwrap_or(unified);
        self.row_scope = saved;

        let mut columns = vec![ColumnSymbol::scalar("$table", ScalarKind::String)];
        columns.extend(unified.columns().iter().cloned());
        TableSymbol::from_columns("", columns, unified.is_open())
    }

    /// The candidate tables for find/search, in declaration order.
    fn candidate_tables(
        &mut self,
        tables: Option<&[Expr]>,
        allow_row_scope: bool,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<TableRef> {
        if let Some(exprs) = tables {
            let saved = self.row_scope.take();
            let mut out = Vec::new();
            for expr in exprs {
                let ty = self.bind_expr(expr);
                match ty {
                    Type::Table(table) => out.push(table),
                    Type::Error => {}
                    other => diagnostics.push(
                        DiagnosticKind::TypeMismatch {
                            expected: "a tabular expression".into(),
                            actual: other.to_string(),
                        }
                        .with_span(expr.span),
                    ),
                }
            }
            self.row_scope = saved;
            return out;
        }
        if allow_row_scope {
            if let Some(scope) = self.effective_row_scope() {
                return vec![scope];
            }
        }
        self.current_database.tables().to_vec()
    }
}
