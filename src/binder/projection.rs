// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Incremental construction of output row schemas.
//!
//! Every project-like operator drives this builder through a fixed
//! discipline: `declare` for explicitly named columns, `add` for derived
//! ones (with unique-name suffixing), `rename`/`do_not_add` for the rename
//! and consume rules.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::error::{Diagnostic, DiagnosticKind};
use crate::catalog::{ColumnRef, TableRef, TableSymbol, Type};
use crate::parser::Span;

#[derive(Default)]
pub(super) struct ProjectionBuilder {
    columns: Vec<ColumnRef>,
    index: HashMap<String, usize>,
    declared: HashSet<String>,
    do_not_add: HashSet<usize>,
}

impl ProjectionBuilder {
    pub fn new() -> ProjectionBuilder {
        ProjectionBuilder::default()
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnRef> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.columns[i])
    }

    /// Declare a column under its own name. An existing declaration is
    /// replaced in place when `replace` is set, diagnosed otherwise.
    pub fn declare(
        &mut self,
        column: ColumnRef,
        span: Span,
        replace: bool,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let key = column.name().to_ascii_lowercase();
        match self.index.get(&key) {
            Some(&i) => {
                if replace {
                    self.columns[i] = column;
                } else {
                    diagnostics.push(
                        DiagnosticKind::DuplicateColumnDeclaration(column.name().into())
                            .with_span(span),
                    );
                }
            }
            None => {
                self.index.insert(key.clone(), self.columns.len());
                self.columns.push(column);
            }
        }
        self.declared.insert(key);
    }

    /// Add a column, suffixing the name to keep it unique. Columns marked
    /// do-not-add are skipped silently.
    pub fn add(&mut self, column: ColumnRef, do_not_repeat: bool) {
        let identity = Arc::as_ptr(&column) as usize;
        if self.do_not_add.contains(&identity) {
            return;
        }
        if do_not_repeat {
            self.do_not_add.insert(identity);
        }
        let name = self.unique_name(column.name());
        let column = if name == column.name() {
            column
        } else {
            column.renamed(name)
        };
        self.index
            .insert(column.name().to_ascii_lowercase(), self.columns.len());
        self.columns.push(column);
    }

    /// Rename an existing entry. Returns false when `from` is absent.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        let from_key = from.to_ascii_lowercase();
        let Some(i) = self.index.remove(&from_key) else {
            return false;
        };
        self.declared.remove(&from_key);
        let renamed = self.columns[i].renamed(to);
        self.columns[i] = renamed;
        let to_key = to.to_ascii_lowercase();
        self.index.insert(to_key.clone(), i);
        self.declared.insert(to_key);
        true
    }

    /// Mark a source column as consumed, so later `add` calls skip it.
    pub fn do_not_add(&mut self, column: &ColumnRef) {
        self.do_not_add.insert(Arc::as_ptr(column) as usize);
    }

    pub fn into_table(self, name: &str, is_open: bool) -> TableRef {
        TableSymbol::from_columns(name, self.columns, is_open)
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnSymbol;
    use crate::types::ScalarKind;

    fn col(name: &str, kind: ScalarKind) -> ColumnRef {
        ColumnSymbol::scalar(name, kind)
    }

    #[test]
    fn duplicate_declaration_is_diagnosed() {
        let mut b = ProjectionBuilder::new();
        let mut diags = Vec::new();
        b.declare(col("x", ScalarKind::Long), Span::new(0, 1), false, &mut diags);
        b.declare(col("x", ScalarKind::Long), Span::new(2, 3), false, &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags[0].kind,
            DiagnosticKind::DuplicateColumnDeclaration(_)
        ));
    }

    #[test]
    fn replace_updates_type_and_keeps_position() {
        let mut b = ProjectionBuilder::new();
        let mut diags = Vec::new();
        b.declare(col("x", ScalarKind::Long), Span::new(0, 1), true, &mut diags);
        b.declare(col("y", ScalarKind::Long), Span::new(0, 1), true, &mut diags);
        b.declare(col("x", ScalarKind::String), Span::new(2, 3), true, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(b.columns()[0].name(), "x");
        assert_eq!(b.columns()[0].ty(), &Type::STRING);
        assert_eq!(b.columns()[1].name(), "y");
    }

    #[test]
    fn add_suffixes_conflicts() {
        let mut b = ProjectionBuilder::new();
        let mut diags = Vec::new();
        b.declare(col("x", ScalarKind::Long), Span::new(0, 1), false, &mut diags);
        b.add(col("x", ScalarKind::String), false);
        assert_eq!(b.columns()[1].name(), "x_1");
    }

    #[test]
    fn do_not_add_skips_the_exact_column() {
        let mut b = ProjectionBuilder::new();
        let consumed = col("x", ScalarKind::Long);
        b.do_not_add(&consumed);
        b.add(consumed.clone(), false);
        assert!(b.columns().is_empty());
        // a different column value with the same name still adds
        b.add(col("x", ScalarKind::Long), false);
        assert_eq!(b.columns().len(), 1);
    }

    #[test]
    fn rename_moves_the_name() {
        let mut b = ProjectionBuilder::new();
        let mut diags = Vec::new();
        b.declare(col("a", ScalarKind::Long), Span::new(0, 1), false, &mut diags);
        assert!(b.rename("a", "b"));
        assert!(!b.rename("missing", "c"));
        assert_eq!(b.columns()[0].name(), "b");
        assert!(b.contains("b") && !b.contains("a"));
    }
}
