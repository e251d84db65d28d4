// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Two-input operators: join, lookup, union.

use super::super::error::{Diagnostic, DiagnosticKind};
use super::super::projection::ProjectionBuilder;
use super::super::unify::UnifyStrategy;
use super::super::Binder;
use crate::catalog::{ColumnSymbol, TableRef, Type};
use crate::parser::{Expr, ExprKind, Ident, JoinOnClause};
use crate::types::ScalarKind;

const JOIN_KINDS: &[&str] = &[
    "inner",
    "innerunique",
    "leftouter",
    "rightouter",
    "fullouter",
    "leftsemi",
    "rightsemi",
    "leftanti",
    "rightanti",
];

const LOOKUP_KINDS: &[&str] = &["leftouter", "inner"];

impl Binder {
    /// `join kind=… (right) on …`: binds the right side as its own
    /// pipeline, then the `on` clauses with both row scopes active, and
    /// merges the output columns with `_1`-style uniquification.
    pub(in crate::binder) fn bind_join(
        &mut self,
        kind: Option<&Ident>,
        right: &Expr,
        on: &[JoinOnClause],
        span: crate::parser::Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let kind_name = self.check_kind(kind, JOIN_KINDS, diagnostics);
        let left = self.input_or_empty();
        let right_table = self.bind_join_side(right, diagnostics);

        if on.is_empty() {
            diagnostics.push(DiagnosticKind::MissingJoinOn.with_span(span));
        }
        let key_names = self.bind_on_clauses(&left, &right_table, on, diagnostics);

        match kind_name.as_deref() {
            Some("leftsemi" | "leftanti") => return left,
            Some("rightsemi" | "rightanti") => return right_table,
            _ => {}
        }

        let mut builder = ProjectionBuilder::new();
        for column in left.columns() {
            builder.declare(column.clone(), Default::default(), true, diagnostics);
        }
        for column in right_table.columns() {
            // equality keys named in simple on-clauses appear once
            if key_names.iter().any(|k| column.matches_name(k)) {
                continue;
            }
            builder.add(column.clone(), false);
        }
        builder.into_table("", left.is_open() || right_table.is_open())
    }

    /// `lookup (right) on …`: a join restricted to leftouter/inner whose
    /// `on` clause is mandatory; right columns extend the left row scope.
    pub(in crate::binder) fn bind_lookup(
        &mut self,
        kind: Option<&Ident>,
        right: &Expr,
        on: &[JoinOnClause],
        span: crate::parser::Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let _ = self.check_kind(kind, LOOKUP_KINDS, diagnostics);
        let left = self.input_or_empty();
        let right_table = self.bind_join_side(right, diagnostics);
        if on.is_empty() {
            diagnostics.push(DiagnosticKind::MissingJoinOn.with_span(span));
        }
        let key_names = self.bind_on_clauses(&left, &right_table, on, diagnostics);

        let mut builder = ProjectionBuilder::new();
        for column in left.columns() {
            builder.declare(column.clone(), Default::default(), true, diagnostics);
        }
        for column in right_table.columns() {
            if key_names.iter().any(|k| column.matches_name(k)) {
                continue;
            }
            builder.add(column.clone(), false);
        }
        builder.into_table("", left.is_open())
    }

    /// `union kind=…`: the row scope plus every listed table, unified by
    /// name-and-type for `outer` (the default) and by intersection for
    /// `inner`.
    pub(in crate::binder) fn bind_union(
        &mut self,
        kind: Option<&Ident>,
        with_source: Option<&Ident>,
        tables: &[Expr],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let strategy = match kind {
            Some(k) if k.eq_ignore_case("inner") => UnifyStrategy::CommonColumns,
            Some(k) if k.eq_ignore_case("outer") || k.name.is_empty() => {
                UnifyStrategy::ByNameAndType
            }
            Some(k) => {
                diagnostics
                    .push(DiagnosticKind::InvalidUnionKind(k.name.clone()).with_span(k.span));
                UnifyStrategy::ByNameAndType
            }
            None => UnifyStrategy::ByNameAndType,
        };

        let mut inputs = Vec::new();
        if let Some(scope) = self.effective_row_scope() {
            inputs.push(scope);
        }
        for table in tables {
            let ty = self.bind_expr(table);
            match ty {
                Type::Table(t) => inputs.push(t),
                Type::Error => {}
                other => diagnostics.push(
                    DiagnosticKind::TypeMismatch {
                        expected: "a tabular expression".into(),
                        actual: other.to_string(),
                    }
                    .with_span(table.span),
                ),
            }
        }
        if inputs.is_empty() {
            return self.empty_table();
        }

        let cacheable = inputs.iter().all(|t| self.is_catalog_table(t));
        let unified = super::super::unify::unify(
            strategy,
            &inputs,
            &self.global_cache,
            cacheable,
        );
        match with_source {
            Some(source) => {
                let mut columns =
                    vec![ColumnSymbol::scalar(source.name.clone(), ScalarKind::String)];
                columns.extend(unified.columns().iter().cloned());
                crate::catalog::TableSymbol::from_columns("", columns, unified.is_open())
            }
            None => unified,
        }
    }

    // ===== shared plumbing =====

    /// Bind a parenthesized right side with no incoming row scope.
    fn bind_join_side(&mut self, right: &Expr, diagnostics: &mut Vec<Diagnostic>) -> TableRef {
        let saved = self.row_scope.take();
        let ty = self.bind_expr(right);
        self.row_scope = saved;
        match ty {
            Type::Table(table) => table,
            Type::Error => self.empty_table(),
            other => {
                diagnostics.push(
                    DiagnosticKind::TypeMismatch {
                        expected: "a tabular expression".into(),
                        actual: other.to_string(),
                    }
                    .with_span(right.span),
                );
                self.empty_table()
            }
        }
    }

    /// Bind `on` clauses with the left scope as the row scope and the right
    /// scope active; returns the simple column names usable for key
    /// deduplication.
    fn bind_on_clauses(
        &mut self,
        left: &TableRef,
        right: &TableRef,
        on: &[JoinOnClause],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<String> {
        let saved_scope = self.row_scope.take();
        let saved_right = self.right_row_scope.take();
        self.row_scope = Some(left.clone());
        self.right_row_scope = Some(right.clone());

        let mut keys = Vec::new();
        for clause in on {
            match &clause.expr.kind {
                // `on Key`: the column must exist on both sides
                ExprKind::Name(ident) => {
                    let on_left = left.column_by_name(&ident.name).is_some();
                    let on_right = right.column_by_name(&ident.name).is_some();
                    if on_left && on_right {
                        keys.push(ident.name.clone());
                        let column = left
                            .column_by_name(&ident.name)
                            .expect("presence checked")
                            .clone();
                        self.set_info(
                            clause.expr.id,
                            super::super::semantic::SemanticInfo::of_type(column.ty().clone())
                                .with_symbol(crate::catalog::Symbol::Column(column)),
                        );
                    } else {
                        self.set_info(
                            clause.expr.id,
                            super::super::semantic::SemanticInfo::error().with_diagnostic(
                                DiagnosticKind::JoinColumnNotOnBothSides(ident.name.clone())
                                    .with_span(ident.span),
                            ),
                        );
                    }
                }
                // `on $left.a == $right.b`
                _ => {
                    let ty = self.bind_expr(&clause.expr);
                    self.require_bool(&ty, clause.expr.span, diagnostics);
                }
            }
        }

        self.row_scope = saved_scope;
        self.right_row_scope = saved_right;
        keys
    }

    fn check_kind(
        &mut self,
        kind: Option<&Ident>,
        allowed: &[&str],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let kind = kind?;
        if allowed.iter().any(|k| kind.eq_ignore_case(k)) {
            Some(kind.name.to_ascii_lowercase())
        } else {
            diagnostics.push(
                DiagnosticKind::InvalidJoinKind(kind.name.clone()).with_span(kind.span),
            );
            None
        }
    }

    /// Stable-identity inputs (tables of the current database) make a
    /// unification cacheable.
    pub(in crate::binder) fn is_catalog_table(&self, table: &TableRef) -> bool {
        self.current_database
            .tables()
            .iter()
            .any(|t| std::sync::Arc::ptr_eq(t, table))
    }
}
