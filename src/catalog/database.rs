// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Database and cluster symbols.

use std::sync::Arc;

use super::{ClusterRef, DatabaseRef, FunctionRef, TableRef, TableSymbol};

/// A database: tables plus stored functions, optionally open.
#[derive(Debug, Clone)]
pub struct DatabaseSymbol {
    name: String,
    tables: Vec<TableRef>,
    functions: Vec<FunctionRef>,
    is_open: bool,
}

impl DatabaseSymbol {
    pub fn new(name: impl Into<String>) -> DatabaseSymbol {
        DatabaseSymbol {
            name: name.into(),
            tables: Vec::new(),
            functions: Vec::new(),
            is_open: false,
        }
    }

    pub fn table(mut self, table: TableSymbol) -> DatabaseSymbol {
        self.tables.push(table.into_ref());
        self
    }

    pub fn table_ref(mut self, table: TableRef) -> DatabaseSymbol {
        self.tables.push(table);
        self
    }

    pub fn function(mut self, function: FunctionRef) -> DatabaseSymbol {
        self.functions.push(function);
        self
    }

    pub fn open(mut self) -> DatabaseSymbol {
        self.is_open = true;
        self
    }

    pub fn into_ref(self) -> DatabaseRef {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[TableRef] {
        &self.tables
    }

    pub fn functions(&self) -> &[FunctionRef] {
        &self.functions
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn table_by_name(&self, name: &str) -> Option<&TableRef> {
        self.tables
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FunctionRef> {
        self.functions
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

/// A cluster: a list of databases, optionally open.
#[derive(Debug, Clone)]
pub struct ClusterSymbol {
    name: String,
    databases: Vec<DatabaseRef>,
    is_open: bool,
}

impl ClusterSymbol {
    pub fn new(name: impl Into<String>) -> ClusterSymbol {
        ClusterSymbol {
            name: name.into(),
            databases: Vec::new(),
            is_open: false,
        }
    }

    pub fn database(mut self, database: DatabaseSymbol) -> ClusterSymbol {
        self.databases.push(database.into_ref());
        self
    }

    pub fn database_ref(mut self, database: DatabaseRef) -> ClusterSymbol {
        self.databases.push(database);
        self
    }

    pub fn open(mut self) -> ClusterSymbol {
        self.is_open = true;
        self
    }

    pub fn into_ref(self) -> ClusterRef {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn databases(&self) -> &[DatabaseRef] {
        &self.databases
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn database_by_name(&self, name: &str) -> Option<&DatabaseRef> {
        self.databases
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
    }
}
