// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Binding of pipe-chained query operators.
//!
//! Operators bind strictly left to right: each one sees the previous
//! operator's output as its row scope and produces the next row scope. A
//! failed operator still yields a best-effort row scope so the rest of the
//! pipeline keeps binding.

use tracing::trace;

mod find;
mod join;
mod mv;
mod project;
mod summarize;

use super::error::{Diagnostic, DiagnosticKind};
use super::scope::ScopeKind;
use super::semantic::SemanticInfo;
use super::Binder;
use crate::catalog::{ColumnSymbol, Symbol, TableRef, TableSymbol, Type, VariableSymbol};
use crate::parser::{
    Expr, ExprKind, OpKind, OrderedExpr, PipeOperator, Span, SubPipe,
};
use crate::types::ScalarKind;

const CHART_TYPES: &[&str] = &[
    "table",
    "list",
    "card",
    "barchart",
    "columnchart",
    "piechart",
    "timechart",
    "linechart",
    "anomalychart",
    "areachart",
    "stackedareachart",
    "scatterchart",
    "ladderchart",
    "pivotchart",
];

impl Binder {
    /// Bind `input | operator`, threading the row scope.
    pub(super) fn bind_pipe(&mut self, expr: &Expr) -> Type {
        let ExprKind::Pipe { input, operator } = &expr.kind else {
            unreachable!("caller matched a pipe");
        };
        let input_ty = self.bind_expr(input);
        let mut pipe_diagnostics = Vec::new();
        let input_table = match &input_ty {
            Type::Table(table) => Some(table.clone()),
            Type::Error => None,
            other => {
                pipe_diagnostics.push(
                    DiagnosticKind::TypeMismatch {
                        expected: "a tabular expression".into(),
                        actual: other.to_string(),
                    }
                    .with_span(input.span),
                );
                None
            }
        };

        let saved = self.row_scope.take();
        self.row_scope = input_table;
        self.maybe_capture(operator.span);
        let output = self.bind_operator(operator);
        self.row_scope = saved;

        let mut info = SemanticInfo::of_type(Type::Table(output));
        info.diagnostics = pipe_diagnostics;
        let ty = info.result_type.clone();
        self.set_info(expr.id, info);
        ty
    }

    /// Bind an operator chain whose source is supplied by the caller, as in
    /// `fork`/`partition`/`mv-apply` branches.
    pub(super) fn bind_sub_pipe(&mut self, sub: &SubPipe, input: TableRef) -> TableRef {
        let saved = self.row_scope.take();
        self.row_scope = Some(input);
        let mut output = self.input_or_empty();
        for operator in &sub.operators {
            self.maybe_capture(operator.span);
            output = self.bind_operator(operator);
            self.row_scope = Some(output.clone());
        }
        self.row_scope = saved;
        output
    }

    fn bind_operator(&mut self, op: &PipeOperator) -> TableRef {
        if self.cancel.is_cancelled() {
            return self.input_or_empty();
        }
        trace!(operator = op.kind.name(), "binding query operator");
        let mut diagnostics = Vec::new();
        let output = match &op.kind {
            OpKind::Where { predicate } => self.bind_where(predicate, &mut diagnostics),
            OpKind::Extend { assignments } => self.bind_extend(assignments, &mut diagnostics),
            OpKind::Project { items } => self.bind_project(items, &mut diagnostics),
            OpKind::ProjectAway { names } => self.bind_project_away(names, &mut diagnostics),
            OpKind::ProjectKeep { names } => self.bind_project_keep(names, &mut diagnostics),
            OpKind::ProjectRename { renames } => {
                self.bind_project_rename(renames, &mut diagnostics)
            }
            OpKind::ProjectReorder { names } => {
                self.bind_project_reorder(names, &mut diagnostics)
            }
            OpKind::Summarize { aggregates, by } => {
                self.bind_summarize(aggregates, by, &mut diagnostics)
            }
            OpKind::Distinct { columns } => self.bind_distinct(columns, &mut diagnostics),
            OpKind::Count { .. } => TableSymbol::new("")
                .column("Count", ScalarKind::Long)
                .into_ref(),
            OpKind::Take { count } => self.bind_take(count, &mut diagnostics),
            OpKind::Top { count, by } => self.bind_top(count, by, &mut diagnostics),
            OpKind::TopNested { levels } => self.bind_top_nested(levels, &mut diagnostics),
            OpKind::TopHitters { count, of, by } => {
                self.bind_top_hitters(count, of, by.as_ref(), &mut diagnostics)
            }
            OpKind::Sort { by } => self.bind_sort(by, &mut diagnostics),
            OpKind::Sample { count } => self.bind_take(count, &mut diagnostics),
            OpKind::SampleDistinct { count, of } => {
                self.bind_sample_distinct(count, of, &mut diagnostics)
            }
            OpKind::Serialize { assignments } => {
                self.bind_extend(assignments, &mut diagnostics)
            }
            OpKind::As { name } => {
                let scope = self.input_or_empty();
                self.local_scope.insert(Symbol::Variable(VariableSymbol::new(
                    name.name.clone(),
                    Type::Table(scope.clone()),
                )));
                scope
            }
            OpKind::Join { kind, right, on } => {
                self.bind_join(kind.as_ref(), right, on, op.span, &mut diagnostics)
            }
            OpKind::Lookup { kind, right, on } => {
                self.bind_lookup(kind.as_ref(), right, on, op.span, &mut diagnostics)
            }
            OpKind::Union {
                kind,
                with_source,
                tables,
            } => self.bind_union(kind.as_ref(), with_source.as_ref(), tables, &mut diagnostics),
            OpKind::MvExpand { items, limit } => {
                self.bind_mv_expand(items, limit.as_ref(), &mut diagnostics)
            }
            OpKind::MvApply {
                items,
                limit,
                subquery,
            } => self.bind_mv_apply(items, limit.as_ref(), subquery, &mut diagnostics),
            OpKind::MakeSeries {
                clauses,
                on,
                from,
                to,
                step,
                by,
            } => self.bind_make_series(clauses, on, from, to, step, by, &mut diagnostics),
            OpKind::Fork { branches } => self.bind_fork(branches),
            OpKind::Partition { by, subquery } => {
                self.bind_partition(by, subquery, &mut diagnostics)
            }
            OpKind::Find { tables, predicate } => {
                self.bind_find(tables.as_deref(), predicate, &mut diagnostics)
            }
            OpKind::Search { tables, predicate } => {
                self.bind_search(tables.as_deref(), predicate, &mut diagnostics)
            }
            OpKind::Parse {
                input, pattern, ..
            }
            | OpKind::ParseWhere {
                input, pattern, ..
            } => self.bind_parse(input, pattern, &mut diagnostics),
            OpKind::Reduce { by } => self.bind_reduce(by, &mut diagnostics),
            OpKind::Invoke { call } => self.bind_invoke(call, op.span, &mut diagnostics),
            OpKind::Evaluate { call } => self.bind_evaluate(call, op.span, &mut diagnostics),
            OpKind::Render { chart } => {
                if !CHART_TYPES
                    .iter()
                    .any(|c| chart.eq_ignore_case(c))
                {
                    diagnostics.push(
                        DiagnosticKind::UnknownChartType(chart.name.clone())
                            .with_span(chart.span),
                    );
                }
                self.input_or_empty()
            }
            OpKind::GetSchema => TableSymbol::new("")
                .column("ColumnName", ScalarKind::String)
                .column("ColumnOrdinal", ScalarKind::Long)
                .column("DataType", ScalarKind::String)
                .column("ColumnType", ScalarKind::String)
                .into_ref(),
            OpKind::Consume => TableSymbol::from_columns("", Vec::new(), false),
        };
        let mut info = SemanticInfo::of_type(Type::Table(output.clone()));
        info.diagnostics = diagnostics;
        self.set_info(op.id, info);
        output
    }

    // ===== simple operators =====

    fn bind_where(&mut self, predicate: &Expr, diagnostics: &mut Vec<Diagnostic>) -> TableRef {
        let ty = self.bind_expr(predicate);
        self.require_bool(&ty, predicate.span, diagnostics);
        self.input_or_empty()
    }

    fn bind_take(&mut self, count: &Expr, diagnostics: &mut Vec<Diagnostic>) -> TableRef {
        let ty = self.bind_expr(count);
        self.require_integer(&ty, count.span, diagnostics);
        self.input_or_empty()
    }

    fn bind_top(
        &mut self,
        count: &Expr,
        by: &[OrderedExpr],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let ty = self.bind_expr(count);
        self.require_integer(&ty, count.span, diagnostics);
        for ordered in by {
            let _ = self.bind_expr(&ordered.expr);
        }
        self.input_or_empty()
    }

    fn bind_sort(&mut self, by: &[OrderedExpr], diagnostics: &mut Vec<Diagnostic>) -> TableRef {
        for ordered in by {
            let ty = self.bind_expr(&ordered.expr);
            if let Some(kind) = ty.scalar_kind() {
                if !kind.is_orderable() && kind != ScalarKind::Dynamic {
                    diagnostics.push(
                        DiagnosticKind::TypeMismatch {
                            expected: "an orderable scalar".into(),
                            actual: ty.to_string(),
                        }
                        .with_span(ordered.expr.span),
                    );
                }
            }
        }
        self.input_or_empty()
    }

    fn bind_distinct(&mut self, columns: &[Expr], diagnostics: &mut Vec<Diagnostic>) -> TableRef {
        if columns
            .iter()
            .any(|c| matches!(c.kind, ExprKind::Star))
        {
            for column in columns {
                if matches!(column.kind, ExprKind::Star) {
                    self.set_info(column.id, SemanticInfo::of_type(Type::Void));
                }
            }
            return self.input_or_empty();
        }
        let mut out = Vec::new();
        for column in columns {
            let ty = self.bind_expr(column);
            match self.derived_column_name(column) {
                Some(name) => out.push(ColumnSymbol::new(name, ty)),
                None => diagnostics.push(DiagnosticKind::ColumnRequired.with_span(column.span)),
            }
        }
        TableSymbol::from_columns("", out, false)
    }

    fn bind_sample_distinct(
        &mut self,
        count: &Expr,
        of: &Expr,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let count_ty = self.bind_expr(count);
        self.require_integer(&count_ty, count.span, diagnostics);
        let of_ty = self.bind_expr(of);
        match self.derived_column_name(of) {
            Some(name) => TableSymbol::from_columns(
                "",
                vec![ColumnSymbol::new(name, of_ty)],
                false,
            ),
            None => {
                diagnostics.push(DiagnosticKind::ColumnRequired.with_span(of.span));
                self.empty_table()
            }
        }
    }

    fn bind_reduce(&mut self, by: &Expr, diagnostics: &mut Vec<Diagnostic>) -> TableRef {
        let ty = self.bind_expr(by);
        if !matches!(
            ty.scalar_kind(),
            Some(ScalarKind::String | ScalarKind::Dynamic) | None
        ) {
            diagnostics.push(
                DiagnosticKind::TypeMismatch {
                    expected: "string".into(),
                    actual: ty.to_string(),
                }
                .with_span(by.span),
            );
        }
        TableSymbol::new("")
            .column("Pattern", ScalarKind::String)
            .column("Count", ScalarKind::Long)
            .column("Representative", ScalarKind::String)
            .into_ref()
    }

    fn bind_fork(&mut self, branches: &[(Option<crate::parser::Ident>, SubPipe)]) -> TableRef {
        let input = self.input_or_empty();
        let mut output = input.clone();
        for (name, branch) in branches {
            output = self.bind_sub_pipe(branch, input.clone());
            if let Some(name) = name {
                self.local_scope.insert(Symbol::Variable(VariableSymbol::new(
                    name.name.clone(),
                    Type::Table(output.clone()),
                )));
            }
        }
        output
    }

    fn bind_partition(
        &mut self,
        by: &Expr,
        subquery: &SubPipe,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let key_ty = self.bind_expr(by);
        if !key_ty.is_scalar() && !key_ty.is_error() {
            diagnostics.push(
                DiagnosticKind::TypeMismatch {
                    expected: "a scalar partition key".into(),
                    actual: key_ty.to_string(),
                }
                .with_span(by.span),
            );
        }
        let input = self.input_or_empty();
        self.bind_sub_pipe(subquery, input)
    }

    fn bind_invoke(
        &mut self,
        call: &crate::parser::CallExpr,
        span: Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        self.implicit_argument_type = Some(Type::Table(input.clone()));
        let info = self.bind_call(call, span);
        self.implicit_argument_type = None;
        diagnostics.extend(info.diagnostics.iter().cloned());
        match &info.result_type {
            Type::Table(table) => table.clone(),
            Type::Error => input,
            other => {
                diagnostics.push(
                    DiagnosticKind::TypeMismatch {
                        expected: "a tabular result".into(),
                        actual: other.to_string(),
                    }
                    .with_span(span),
                );
                input
            }
        }
    }

    fn bind_evaluate(
        &mut self,
        call: &crate::parser::CallExpr,
        span: Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let saved = self.scope_kind;
        self.scope_kind = ScopeKind::PlugIn;
        let info = self.bind_call(call, span);
        self.scope_kind = saved;
        diagnostics.extend(info.diagnostics.iter().cloned());
        match &info.result_type {
            Type::Table(table) => table.clone(),
            _ => self.input_or_empty(),
        }
    }

    // ===== helpers shared by the operator files =====

    pub(super) fn input_or_empty(&mut self) -> TableRef {
        self.effective_row_scope()
            .unwrap_or_else(|| self.empty_table())
    }

    pub(super) fn require_bool(
        &mut self,
        ty: &Type,
        span: Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        match ty.scalar_kind() {
            Some(ScalarKind::Bool | ScalarKind::Dynamic) => {}
            _ if ty.is_error() => {}
            _ => diagnostics.push(
                DiagnosticKind::TypeMismatch {
                    expected: "bool".into(),
                    actual: ty.to_string(),
                }
                .with_span(span),
            ),
        }
    }

    pub(super) fn require_integer(
        &mut self,
        ty: &Type,
        span: Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        match ty.scalar_kind() {
            Some(kind) if kind.is_integer() || kind == ScalarKind::Dynamic => {}
            _ if ty.is_error() => {}
            _ => diagnostics.push(
                DiagnosticKind::TypeMismatch {
                    expected: "an integer".into(),
                    actual: ty.to_string(),
                }
                .with_span(span),
            ),
        }
    }
}
