// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Aggregating operators: summarize, make-series, top-nested, top-hitters.
//!
//! Aggregate clauses bind under the aggregate scope kind, where aggregate
//! functions resolve; `by` clauses bind under the normal kind.

use super::super::error::{Diagnostic, DiagnosticKind};
use super::super::projection::ProjectionBuilder;
use super::super::scope::ScopeKind;
use super::super::Binder;
use crate::catalog::{ColumnSymbol, TableRef, TableSymbol};
use crate::parser::{Assignment, Expr, MakeSeriesClause, TopNestedLevel};
use crate::types::ScalarKind;

impl Binder {
    /// Row scope becomes the by-columns followed by the aggregate columns.
    pub(in crate::binder) fn bind_summarize(
        &mut self,
        aggregates: &[Assignment],
        by: &[Assignment],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let mut builder = ProjectionBuilder::new();
        for item in by {
            let ty = self.bind_expr(&item.value);
            let name = self.projection_name(item, "Column1");
            builder.declare(ColumnSymbol::new(name, ty), item.value.span, false, diagnostics);
        }

        let saved = self.scope_kind;
        self.scope_kind = ScopeKind::Aggregate;
        for item in aggregates {
            let ty = self.bind_expr(&item.value);
            let name = self.projection_name(item, "Column1");
            builder.declare(ColumnSymbol::new(name, ty), item.value.span, false, diagnostics);
        }
        self.scope_kind = saved;

        builder.into_table("", false)
    }

    /// Row scope becomes by-columns, series columns (dynamic arrays), and
    /// the axis column.
    #[allow(clippy::too_many_arguments)]
    pub(in crate::binder) fn bind_make_series(
        &mut self,
        clauses: &[MakeSeriesClause],
        on: &Expr,
        from: &Option<Box<Expr>>,
        to: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
        by: &[Assignment],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let mut builder = ProjectionBuilder::new();
        for item in by {
            let ty = self.bind_expr(&item.value);
            let name = self.projection_name(item, "Column1");
            builder.declare(ColumnSymbol::new(name, ty), item.value.span, false, diagnostics);
        }

        let saved = self.scope_kind;
        self.scope_kind = ScopeKind::Aggregate;
        for clause in clauses {
            let agg_ty = self.bind_expr(&clause.aggregate.value);
            if let Some(default) = &clause.default {
                // the fill value must fit the series' element type
                let default_ty = self.bind_expr(default);
                if !default_ty.assignable_to(&agg_ty) {
                    diagnostics.push(
                        DiagnosticKind::TypeMismatch {
                            expected: agg_ty.to_string(),
                            actual: default_ty.to_string(),
                        }
                        .with_span(default.span),
                    );
                }
            }
            let name = self.projection_name(&clause.aggregate, "Column1");
            // series values become arrays over the axis
            builder.declare(
                ColumnSymbol::scalar(name, ScalarKind::Dynamic),
                clause.aggregate.value.span,
                false,
                diagnostics,
            );
        }
        self.scope_kind = saved;

        let axis_ty = self.bind_expr(on);
        if !matches!(
            axis_ty.scalar_kind(),
            Some(k) if k.is_summable()
        ) && !axis_ty.is_error()
        {
            diagnostics.push(
                DiagnosticKind::TypeMismatch {
                    expected: "a summable axis".into(),
                    actual: axis_ty.to_string(),
                }
                .with_span(on.span),
            );
        }
        for bound in [from, to, step].into_iter().flatten() {
            let _ = self.bind_expr(bound);
        }
        let axis_name = self
            .derived_column_name(on)
            .unwrap_or_else(|| "Timestamp".into());
        builder.declare(
            ColumnSymbol::scalar(axis_name, ScalarKind::Dynamic),
            on.span,
            false,
            diagnostics,
        );

        builder.into_table("", false)
    }

    /// Each level contributes its grouping column and its aggregate column.
    pub(in crate::binder) fn bind_top_nested(
        &mut self,
        levels: &[TopNestedLevel],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let mut builder = ProjectionBuilder::new();
        for level in levels {
            if let Some(count) = &level.count {
                let ty = self.bind_expr(count);
                self.require_integer(&ty, count.span, diagnostics);
            }
            let of_ty = self.bind_expr(&level.of.value);
            let of_name = self.projection_name(&level.of, "Column1");
            builder.declare(
                ColumnSymbol::new(of_name.clone(), of_ty),
                level.of.value.span,
                false,
                diagnostics,
            );

            let saved = self.scope_kind;
            self.scope_kind = ScopeKind::Aggregate;
            let agg_ty = self.bind_expr(&level.by.value);
            self.scope_kind = saved;
            let agg_name = match &level.by.name {
                Some(name) => name.name.clone(),
                None => format!("aggregated_{of_name}"),
            };
            builder.declare(
                ColumnSymbol::new(agg_name, agg_ty),
                level.by.value.span,
                false,
                diagnostics,
            );
        }
        builder.into_table("", false)
    }

    /// `top-hitters N of Col [by Sum]`: the column plus an approximation
    /// column.
    pub(in crate::binder) fn bind_top_hitters(
        &mut self,
        count: &Expr,
        of: &Expr,
        by: Option<&Expr>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let count_ty = self.bind_expr(count);
        self.require_integer(&count_ty, count.span, diagnostics);
        let of_ty = self.bind_expr(of);
        let Some(of_name) = self.derived_column_name(of) else {
            diagnostics.push(DiagnosticKind::ColumnRequired.with_span(of.span));
            return self.empty_table();
        };
        let approx = match by {
            Some(by_expr) => {
                let by_ty = self.bind_expr(by_expr);
                if !matches!(by_ty.scalar_kind(), Some(k) if k.is_summable())
                    && !by_ty.is_error()
                {
                    diagnostics.push(
                        DiagnosticKind::TypeMismatch {
                            expected: "a summable value".into(),
                            actual: by_ty.to_string(),
                        }
                        .with_span(by_expr.span),
                    );
                }
                ColumnSymbol::scalar(format!("approximate_sum_{of_name}"), ScalarKind::Long)
            }
            None => ColumnSymbol::scalar(format!("approximate_count_{of_name}"), ScalarKind::Long),
        };
        TableSymbol::from_columns(
            "",
            vec![ColumnSymbol::new(of_name, of_ty), approx],
            false,
        )
    }

    /// The declared name, the derived name, or a positional fallback.
    fn projection_name(&self, item: &Assignment, fallback: &str) -> String {
        item.name
            .as_ref()
            .map(|n| n.name.clone())
            .or_else(|| self.derived_column_name(&item.value))
            .unwrap_or_else(|| fallback.to_string())
    }
}
