// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Row-multiplying operators: mv-expand, mv-apply, parse.

use super::super::error::{Diagnostic, DiagnosticKind};
use super::super::projection::ProjectionBuilder;
use super::super::Binder;
use crate::catalog::{ColumnRef, ColumnSymbol, TableRef, TableSymbol, Type};
use crate::parser::{Expr, MvExpandItem, ParsePart, SubPipe, TypeExpr};
use crate::types::ScalarKind;

impl Binder {
    /// `mv-expand Col [to typeof(...)]`: expanded columns keep their place
    /// in the row scope with an element type of `dynamic`, or the declared
    /// `typeof` target.
    pub(in crate::binder) fn bind_mv_expand(
        &mut self,
        items: &[MvExpandItem],
        limit: Option<&Expr>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        let expanded = self.bind_mv_items(items, diagnostics);
        if let Some(limit) = limit {
            let ty = self.bind_expr(limit);
            self.require_integer(&ty, limit.span, diagnostics);
        }

        let mut builder = ProjectionBuilder::new();
        for column in input.columns() {
            match expanded.iter().find(|(name, _)| column.matches_name(name)) {
                Some((_, ty)) => builder.declare(
                    column.retyped(ty.clone()),
                    Default::default(),
                    true,
                    diagnostics,
                ),
                None => builder.declare(column.clone(), Default::default(), true, diagnostics),
            }
        }
        // expression items that are not columns of the input append
        for (name, ty) in &expanded {
            if input.column_by_name(name).is_none() {
                builder.add(ColumnSymbol::new(name.clone(), ty.clone()), false);
            }
        }
        builder.into_table(input.name(), input.is_open())
    }

    /// `mv-apply Col on (subquery)`: the subquery binds against a table of
    /// just the expanded items; its output replaces them in the row scope.
    pub(in crate::binder) fn bind_mv_apply(
        &mut self,
        items: &[MvExpandItem],
        limit: Option<&Expr>,
        subquery: &SubPipe,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        let expanded = self.bind_mv_items(items, diagnostics);
        if let Some(limit) = limit {
            let ty = self.bind_expr(limit);
            self.require_integer(&ty, limit.span, diagnostics);
        }

        let inner_input = TableSymbol::from_columns(
            "",
            expanded
                .iter()
                .map(|(name, ty)| ColumnSymbol::new(name.clone(), ty.clone()))
                .collect(),
            false,
        );
        let inner_output = self.bind_sub_pipe(subquery, inner_input);

        let mut builder = ProjectionBuilder::new();
        for column in input.columns() {
            if expanded.iter().any(|(name, _)| column.matches_name(name)) {
                continue;
            }
            builder.declare(column.clone(), Default::default(), true, diagnostics);
        }
        for column in inner_output.columns() {
            builder.add(column.clone(), false);
        }
        builder.into_table("", input.is_open())
    }

    /// Each item must be dynamic-typed (or carry a scalar `typeof` target);
    /// returns the output (name, element type) pairs.
    fn bind_mv_items(
        &mut self,
        items: &[MvExpandItem],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<(String, Type)> {
        let mut expanded = Vec::new();
        for item in items {
            let ty = self.bind_expr(&item.expr);
            if !matches!(ty.scalar_kind(), Some(ScalarKind::Dynamic)) && !ty.is_error() {
                diagnostics.push(
                    DiagnosticKind::TypeMismatch {
                        expected: "dynamic".into(),
                        actual: ty.to_string(),
                    }
                    .with_span(item.expr.span),
                );
            }
            let element_ty = match &item.to_type {
                Some((TypeExpr::Scalar(kind), _)) => Type::Scalar(*kind),
                Some((_, span)) => {
                    diagnostics.push(DiagnosticKind::InvalidTypeExpression.with_span(*span));
                    Type::DYNAMIC
                }
                None => Type::DYNAMIC,
            };
            let name = self
                .derived_column_name(&item.expr)
                .unwrap_or_else(|| "Column1".to_string());
            expanded.push((name, element_ty));
        }
        expanded
    }

    /// `parse Input with 'prefix' Col1:type ...`: pattern columns extend
    /// the row scope; duplicates are diagnosed.
    pub(in crate::binder) fn bind_parse(
        &mut self,
        input_expr: &Expr,
        pattern: &[ParsePart],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let ty = self.bind_expr(input_expr);
        if !matches!(
            ty.scalar_kind(),
            Some(ScalarKind::String | ScalarKind::Dynamic)
        ) && !ty.is_error()
        {
            diagnostics.push(
                DiagnosticKind::TypeMismatch {
                    expected: "string".into(),
                    actual: ty.to_string(),
                }
                .with_span(input_expr.span),
            );
        }

        let input = self.input_or_empty();
        let mut builder = ProjectionBuilder::new();
        for column in input.columns() {
            builder.declare(column.clone(), Default::default(), true, diagnostics);
        }
        for part in pattern {
            if let ParsePart::Column { name, ty } = part {
                let kind = ty.unwrap_or(ScalarKind::String);
                let column: ColumnRef = ColumnSymbol::scalar(name.name.clone(), kind);
                builder.declare(column, name.span, false, diagnostics);
            }
        }
        builder.into_table(input.name(), input.is_open())
    }
}
