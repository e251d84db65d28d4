// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Column, table, tuple and group symbols.

use std::sync::Arc;

use super::{ColumnRef, Symbol, TableRef, Type};
use crate::types::ScalarKind;

/// A named, typed column. Immutable: renames and retypes return new values.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSymbol {
    name: String,
    ty: Type,
}

impl ColumnSymbol {
    pub fn new(name: impl Into<String>, ty: Type) -> ColumnRef {
        Arc::new(ColumnSymbol {
            name: name.into(),
            ty,
        })
    }

    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> ColumnRef {
        Self::new(name, Type::Scalar(kind))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Case-insensitive name match, per column lookup rules.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn renamed(&self, name: impl Into<String>) -> ColumnRef {
        Arc::new(ColumnSymbol {
            name: name.into(),
            ty: self.ty.clone(),
        })
    }

    pub fn retyped(&self, ty: Type) -> ColumnRef {
        Arc::new(ColumnSymbol {
            name: self.name.clone(),
            ty,
        })
    }
}

/// A table schema: an ordered column list, optionally open.
///
/// Open tables admit undeclared columns; references against them are
/// inferred as `dynamic` by the binder.
#[derive(Debug, Clone)]
pub struct TableSymbol {
    name: String,
    columns: Vec<ColumnRef>,
    is_open: bool,
}

impl TableSymbol {
    pub fn new(name: impl Into<String>) -> TableSymbol {
        TableSymbol {
            name: name.into(),
            columns: Vec::new(),
            is_open: false,
        }
    }

    /// Chainable column declaration, for catalog construction.
    pub fn column(mut self, name: impl Into<String>, kind: ScalarKind) -> TableSymbol {
        self.columns.push(ColumnSymbol::scalar(name, kind));
        self
    }

    pub fn open(mut self) -> TableSymbol {
        self.is_open = true;
        self
    }

    pub fn into_ref(self) -> TableRef {
        Arc::new(self)
    }

    pub fn from_columns(
        name: impl Into<String>,
        columns: Vec<ColumnRef>,
        is_open: bool,
    ) -> TableRef {
        Arc::new(TableSymbol {
            name: name.into(),
            columns,
            is_open,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnRef> {
        self.columns.iter().find(|c| c.matches_name(name))
    }

    /// Table assignability: every column of `target` must exist here with an
    /// assignable type.
    pub fn assignable_to(&self, target: &TableSymbol) -> bool {
        target.columns.iter().all(|want| {
            self.column_by_name(want.name())
                .is_some_and(|have| have.ty().assignable_to(want.ty()))
        })
    }

    /// `(a:long, b:string)`-style schema text, for diagnostics and display.
    pub fn display_schema(&self) -> String {
        use itertools::Itertools;
        format!(
            "({})",
            self.columns
                .iter()
                .map(|c| format!("{}:{}", c.name(), c.ty()))
                .join(", ")
        )
    }
}

/// The value of a whole-row reference such as `$left`.
#[derive(Debug, Clone)]
pub struct TupleSymbol {
    columns: Vec<ColumnRef>,
}

impl TupleSymbol {
    pub fn new(columns: Vec<ColumnRef>) -> Arc<TupleSymbol> {
        Arc::new(TupleSymbol { columns })
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnRef> {
        self.columns.iter().find(|c| c.matches_name(name))
    }
}

/// The result of an ambiguous name lookup. Never a legal invocation result;
/// its expression type is always the error type.
#[derive(Debug, Clone)]
pub struct GroupSymbol {
    name: String,
    members: Vec<Symbol>,
}

impl GroupSymbol {
    pub fn new(name: impl Into<String>, members: Vec<Symbol>) -> Arc<GroupSymbol> {
        Arc::new(GroupSymbol {
            name: name.into(),
            members,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Symbol] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_rename_is_a_new_value() {
        let a = ColumnSymbol::scalar("a", ScalarKind::Long);
        let b = a.renamed("b");
        assert_eq!(a.name(), "a");
        assert_eq!(b.name(), "b");
        assert_eq!(a.ty(), b.ty());
    }

    #[test]
    fn table_lookup_is_case_insensitive() {
        let t = TableSymbol::new("T").column("Value", ScalarKind::Long);
        assert!(t.column_by_name("value").is_some());
        assert_eq!(t.column_by_name("VALUE").unwrap().name(), "Value");
    }

    #[test]
    fn table_subtyping_needs_all_target_columns() {
        let wide = TableSymbol::new("w")
            .column("a", ScalarKind::Long)
            .column("b", ScalarKind::String);
        let narrow = TableSymbol::new("n").column("a", ScalarKind::Long);
        assert!(wide.assignable_to(&narrow));
        assert!(!narrow.assignable_to(&wide));
    }
}
