// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The project family: extend, project, project-away/keep/rename/reorder.

use super::super::error::{Diagnostic, DiagnosticKind};
use super::super::projection::ProjectionBuilder;
use super::super::semantic::SemanticInfo;
use super::super::Binder;
use crate::catalog::{ColumnSymbol, TableRef, TableSymbol, Type};
use crate::parser::{Assignment, ExprKind, Ident, SortDir, WildName};

impl Binder {
    /// `extend`: the row scope plus each assignment; same-name assignments
    /// replace the existing column.
    pub(in crate::binder) fn bind_extend(
        &mut self,
        assignments: &[Assignment],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        let mut builder = ProjectionBuilder::new();
        for column in input.columns() {
            builder.declare(column.clone(), Default::default(), true, diagnostics);
        }
        for assignment in assignments {
            self.bind_projection_item(assignment, &mut builder, true, diagnostics);
        }
        builder.into_table(input.name(), input.is_open())
    }

    /// `project`: a fresh row scope from the listed items; duplicate names
    /// are diagnosed rather than replaced.
    pub(in crate::binder) fn bind_project(
        &mut self,
        items: &[Assignment],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        let mut builder = ProjectionBuilder::new();
        for item in items {
            if matches!(item.value.kind, ExprKind::Star) && item.name.is_none() {
                // star re-emits every declared and inferred column, replacing
                // any explicit declaration of the same name
                self.set_info(item.value.id, SemanticInfo::of_type(Type::Void));
                for column in input.columns() {
                    builder.declare(column.clone(), item.value.span, true, diagnostics);
                }
                continue;
            }
            self.bind_projection_item(item, &mut builder, false, diagnostics);
        }
        builder.into_table("", false)
    }

    fn bind_projection_item(
        &mut self,
        item: &Assignment,
        builder: &mut ProjectionBuilder,
        replace: bool,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let ty = self.bind_expr(&item.value);
        match &item.name {
            Some(name) => {
                builder.declare(
                    ColumnSymbol::new(name.name.clone(), ty),
                    name.span,
                    replace,
                    diagnostics,
                );
            }
            None => match self.derived_column_name(&item.value) {
                Some(name) => builder.declare(
                    ColumnSymbol::new(name, ty),
                    item.value.span,
                    replace,
                    diagnostics,
                ),
                None => builder.add(ColumnSymbol::new("Column1", ty), false),
            },
        }
    }

    pub(in crate::binder) fn bind_project_away(
        &mut self,
        names: &[WildName],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        self.check_wild_names(&input, names, diagnostics);
        let remaining = input
            .columns()
            .iter()
            .filter(|c| !names.iter().any(|n| n.matches(c.name())))
            .cloned()
            .collect();
        TableSymbol::from_columns("", remaining, input.is_open())
    }

    pub(in crate::binder) fn bind_project_keep(
        &mut self,
        names: &[WildName],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        self.check_wild_names(&input, names, diagnostics);
        let kept = input
            .columns()
            .iter()
            .filter(|c| names.iter().any(|n| n.matches(c.name())))
            .cloned()
            .collect();
        TableSymbol::from_columns("", kept, false)
    }

    /// `project-rename New = Old`: name-to-name only, no expressions.
    pub(in crate::binder) fn bind_project_rename(
        &mut self,
        renames: &[(Ident, Ident)],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        let mut builder = ProjectionBuilder::new();
        for column in input.columns() {
            builder.declare(column.clone(), Default::default(), true, diagnostics);
        }
        for (new, old) in renames {
            if builder.contains(&new.name) && !new.eq_ignore_case(&old.name) {
                diagnostics.push(
                    DiagnosticKind::DuplicateColumnDeclaration(new.name.clone())
                        .with_span(new.span),
                );
                continue;
            }
            if !builder.rename(&old.name, &new.name) {
                diagnostics
                    .push(DiagnosticKind::NameNotDefined(old.name.clone()).with_span(old.span));
            }
        }
        builder.into_table(input.name(), input.is_open())
    }

    /// `project-reorder`: matched columns move to the front in the given
    /// order; the rest keep their relative positions. A wildcard expands
    /// alphabetically when ordered, by appearance otherwise.
    pub(in crate::binder) fn bind_project_reorder(
        &mut self,
        names: &[(WildName, Option<SortDir>)],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TableRef {
        let input = self.input_or_empty();
        let patterns: Vec<WildName> = names.iter().map(|(n, _)| n.clone()).collect();
        self.check_wild_names(&input, &patterns, diagnostics);
        let mut ordered = Vec::new();
        let mut taken = vec![false; input.columns().len()];
        for (pattern, dir) in names {
            let mut matched: Vec<usize> = input
                .columns()
                .iter()
                .enumerate()
                .filter(|(i, c)| !taken[*i] && pattern.matches(c.name()))
                .map(|(i, _)| i)
                .collect();
            match dir {
                Some(SortDir::Asc) => matched.sort_by(|&a, &b| {
                    input.columns()[a].name().cmp(input.columns()[b].name())
                }),
                Some(SortDir::Desc) => matched.sort_by(|&a, &b| {
                    input.columns()[b].name().cmp(input.columns()[a].name())
                }),
                None => {}
            }
            for i in matched {
                taken[i] = true;
                ordered.push(input.columns()[i].clone());
            }
        }
        for (i, column) in input.columns().iter().enumerate() {
            if !taken[i] {
                ordered.push(column.clone());
            }
        }
        TableSymbol::from_columns("", ordered, input.is_open())
    }

    /// Non-wildcard names must name an existing column.
    fn check_wild_names(
        &mut self,
        input: &TableRef,
        names: &[WildName],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for name in names {
            if !name.wildcard && input.column_by_name(&name.prefix.name).is_none() {
                diagnostics.push(
                    DiagnosticKind::NameNotDefined(name.prefix.name.clone())
                        .with_span(name.prefix.span),
                );
            }
        }
    }
}
