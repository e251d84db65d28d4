// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! On-demand synthesis of open clusters, databases, tables and inferred
//! columns.
//!
//! These make the binder total over open schemas: any well-formed reference
//! against an open entity yields a usable symbol. All allocations are
//! memoized per binder instance and never enter the shared catalog.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{
    ClusterRef, ClusterSymbol, ColumnRef, ColumnSymbol, DatabaseRef, DatabaseSymbol, TableRef,
    TableSymbol, Type,
};

fn key_of<T>(parent: &Arc<T>, name: &str) -> (usize, String) {
    (Arc::as_ptr(parent) as usize, name.to_ascii_lowercase())
}

#[derive(Default)]
pub(super) struct OpenEntities {
    clusters: HashMap<String, ClusterRef>,
    databases: HashMap<(usize, String), DatabaseRef>,
    tables: HashMap<(usize, String), TableRef>,
    /// Inferred columns, keyed by the root table identity.
    columns: HashMap<(usize, String), ColumnRef>,
    /// Column lists inferred per root table, in inference order.
    inferred: HashMap<usize, Vec<ColumnRef>>,
    /// Maps tables extended with inferred columns back to their root.
    roots: HashMap<usize, usize>,
}

impl OpenEntities {
    pub fn open_cluster(&mut self, name: &str) -> ClusterRef {
        self.clusters
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| ClusterSymbol::new(name).open().into_ref())
            .clone()
    }

    pub fn open_database(&mut self, cluster: &ClusterRef, name: &str) -> DatabaseRef {
        self.databases
            .entry(key_of(cluster, name))
            .or_insert_with(|| DatabaseSymbol::new(name).open().into_ref())
            .clone()
    }

    pub fn open_table(&mut self, database: &DatabaseRef, name: &str) -> TableRef {
        self.tables
            .entry(key_of(database, name))
            .or_insert_with(|| TableSymbol::new(name).open().into_ref())
            .clone()
    }

    /// Infer a `dynamic` column on an open table, memoized so repeated
    /// references see one column identity.
    pub fn inferred_column(&mut self, table: &TableRef, name: &str) -> ColumnRef {
        let root = self.root_of(table);
        let column = self
            .columns
            .entry((root, name.to_ascii_lowercase()))
            .or_insert_with(|| ColumnSymbol::new(name, Type::DYNAMIC))
            .clone();
        let inferred = self.inferred.entry(root).or_default();
        if !inferred.iter().any(|c| Arc::ptr_eq(c, &column)) {
            inferred.push(column.clone());
        }
        column
    }

    fn root_of(&self, table: &TableRef) -> usize {
        let ptr = Arc::as_ptr(table) as usize;
        self.roots.get(&ptr).copied().unwrap_or(ptr)
    }

    /// The table extended with every column inferred against it so far.
    /// Declared columns stay a prefix; inference extends monotonically.
    pub fn absorb_inferred(&mut self, table: &TableRef) -> TableRef {
        if !table.is_open() {
            return table.clone();
        }
        let root = self.root_of(table);
        let inferred = match self.inferred.get(&root) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return table.clone(),
        };
        let mut columns = table.columns().to_vec();
        let mut grew = false;
        for column in inferred {
            if table.column_by_name(column.name()).is_none() {
                columns.push(column);
                grew = true;
            }
        }
        if !grew {
            return table.clone();
        }
        let extended = TableSymbol::from_columns(table.name(), columns, true);
        self.roots
            .insert(Arc::as_ptr(&extended) as usize, root);
        extended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;

    #[test]
    fn synthesis_is_memoized() {
        let mut open = OpenEntities::default();
        let c1 = open.open_cluster("west");
        let c2 = open.open_cluster("West");
        assert!(Arc::ptr_eq(&c1, &c2));
        let d1 = open.open_database(&c1, "db");
        let d2 = open.open_database(&c1, "db");
        assert!(Arc::ptr_eq(&d1, &d2));
    }

    #[test]
    fn inference_extends_the_table_monotonically() {
        let mut open = OpenEntities::default();
        let table = TableSymbol::new("OpenT")
            .column("a", ScalarKind::Long)
            .open()
            .into_ref();
        let foo = open.inferred_column(&table, "foo");
        assert_eq!(foo.ty(), &Type::DYNAMIC);

        let extended = open.absorb_inferred(&table);
        assert_eq!(extended.columns().len(), 2);
        assert_eq!(extended.columns()[0].name(), "a");
        assert_eq!(extended.columns()[1].name(), "foo");

        // inferring against the extended table keys back to the root
        let bar = open.inferred_column(&extended, "bar");
        let extended2 = open.absorb_inferred(&extended);
        assert_eq!(extended2.columns().len(), 3);
        assert_eq!(extended2.columns()[2].name(), bar.name());
    }

    #[test]
    fn closed_tables_never_grow() {
        let mut open = OpenEntities::default();
        let table = TableSymbol::new("T").column("a", ScalarKind::Long).into_ref();
        let same = open.absorb_inferred(&table);
        assert!(Arc::ptr_eq(&table, &same));
    }
}
