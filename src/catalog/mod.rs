// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The symbol model: immutable descriptors for every named thing the binder
//! can resolve, plus the catalog snapshot that owns the global ones.
//!
//! Catalog symbols live for the lifetime of the snapshot and are shared via
//! `Arc` across bindings; identity comparisons use pointer equality.

use std::collections::HashMap;
use std::sync::Arc;

mod builtins;
mod database;
mod function;
mod table;

pub use self::database::{ClusterSymbol, DatabaseSymbol};
pub use self::function::{
    ArgumentKind, CustomReturnArgs, CustomReturnFn, FunctionBodyFacts, FunctionKind,
    FunctionSymbol, OperatorKind, OperatorSymbol, Parameter, ParameterTypeKind, PatternSignature,
    PatternSymbol, ResultNameKind, ReturnTypeKind, Signature, VariableSymbol,
};
pub use self::table::{ColumnSymbol, GroupSymbol, TableSymbol, TupleSymbol};

use crate::types::ScalarKind;

pub type ColumnRef = Arc<ColumnSymbol>;
pub type TableRef = Arc<TableSymbol>;
pub type TupleRef = Arc<TupleSymbol>;
pub type GroupRef = Arc<GroupSymbol>;
pub type ClusterRef = Arc<ClusterSymbol>;
pub type DatabaseRef = Arc<DatabaseSymbol>;
pub type FunctionRef = Arc<FunctionSymbol>;
pub type OperatorRef = Arc<OperatorSymbol>;
pub type PatternRef = Arc<PatternSymbol>;
pub type VariableRef = Arc<VariableSymbol>;
pub type SignatureRef = Arc<Signature>;

pub const DEFAULT_CLUSTER_NAME: &str = "local";
pub const DEFAULT_DATABASE_NAME: &str = "default";

/// Any named symbol the binder can reference from an expression.
#[derive(Debug, Clone)]
pub enum Symbol {
    Column(ColumnRef),
    Table(TableRef),
    Tuple(TupleRef),
    Group(GroupRef),
    Cluster(ClusterRef),
    Database(DatabaseRef),
    Function(FunctionRef),
    Pattern(PatternRef),
    Variable(VariableRef),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Self::Column(c) => c.name(),
            Self::Table(t) => t.name(),
            Self::Tuple(_) => "",
            Self::Group(g) => g.name(),
            Self::Cluster(c) => c.name(),
            Self::Database(d) => d.name(),
            Self::Function(f) => f.name(),
            Self::Pattern(p) => p.name(),
            Self::Variable(v) => v.name(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Column(_) => "column",
            Self::Table(_) => "table",
            Self::Tuple(_) => "tuple",
            Self::Group(_) => "group",
            Self::Cluster(_) => "cluster",
            Self::Database(_) => "database",
            Self::Function(_) => "function",
            Self::Pattern(_) => "pattern",
            Self::Variable(_) => "variable",
        }
    }

    /// The type this symbol has when referenced as an expression.
    pub fn result_type(&self) -> Type {
        match self {
            Self::Column(c) => c.ty().clone(),
            Self::Table(t) => Type::Table(t.clone()),
            Self::Tuple(t) => Type::Tuple(t.clone()),
            // ambiguity has no type; consumers see the error type
            Self::Group(_) => Type::Error,
            Self::Cluster(c) => Type::Cluster(c.clone()),
            Self::Database(d) => Type::Database(d.clone()),
            Self::Function(f) => Type::Lambda(f.clone()),
            Self::Pattern(_) => Type::Error,
            Self::Variable(v) => v.ty().clone(),
        }
    }
}

/// The type attached to every bound expression.
///
/// Never null after binding: unknown is represented by `Error`, which
/// propagates without producing cascading diagnostics.
#[derive(Debug, Clone)]
pub enum Type {
    Scalar(ScalarKind),
    Table(TableRef),
    Tuple(TupleRef),
    Cluster(ClusterRef),
    Database(DatabaseRef),
    /// A function value, as produced by naming a function without calling it.
    Lambda(FunctionRef),
    Void,
    Error,
}

impl Type {
    pub const BOOL: Type = Type::Scalar(ScalarKind::Bool);
    pub const INT: Type = Type::Scalar(ScalarKind::Int);
    pub const LONG: Type = Type::Scalar(ScalarKind::Long);
    pub const REAL: Type = Type::Scalar(ScalarKind::Real);
    pub const DECIMAL: Type = Type::Scalar(ScalarKind::Decimal);
    pub const STRING: Type = Type::Scalar(ScalarKind::String);
    pub const DATETIME: Type = Type::Scalar(ScalarKind::DateTime);
    pub const TIMESPAN: Type = Type::Scalar(ScalarKind::Timespan);
    pub const GUID: Type = Type::Scalar(ScalarKind::Guid);
    pub const DYNAMIC: Type = Type::Scalar(ScalarKind::Dynamic);

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Table(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Assignability with promotion; `dynamic` converts in both directions,
    /// and the error type converts to anything to avoid cascades.
    pub fn assignable_to(&self, target: &Type) -> bool {
        match (self, target) {
            (Self::Error, _) | (_, Self::Error) => true,
            (Self::Scalar(a), Self::Scalar(b)) => {
                a == b
                    || a.widens_to(*b)
                    || *a == ScalarKind::Dynamic
                    || *b == ScalarKind::Dynamic
            }
            (Self::Table(a), Self::Table(b)) => a.assignable_to(b),
            _ => self == target,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Table(a), Self::Table(b)) => Arc::ptr_eq(a, b),
            (Self::Tuple(a), Self::Tuple(b)) => Arc::ptr_eq(a, b),
            (Self::Cluster(a), Self::Cluster(b)) => Arc::ptr_eq(a, b),
            (Self::Database(a), Self::Database(b)) => Arc::ptr_eq(a, b),
            (Self::Lambda(a), Self::Lambda(b)) => Arc::ptr_eq(a, b),
            (Self::Void, Self::Void) => true,
            (Self::Error, Self::Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(kind) => f.write_str(kind.name()),
            Self::Table(t) => write!(f, "table {}", t.display_schema()),
            Self::Tuple(_) => f.write_str("tuple"),
            Self::Cluster(c) => write!(f, "cluster({:?})", c.name()),
            Self::Database(d) => write!(f, "database({:?})", d.name()),
            Self::Lambda(l) => write!(f, "function {}", l.name()),
            Self::Void => f.write_str("void"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// What kinds of symbol a lookup will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolMatch(u32);

impl SymbolMatch {
    pub const COLUMN: SymbolMatch = SymbolMatch(1 << 0);
    pub const TABLE: SymbolMatch = SymbolMatch(1 << 1);
    pub const DATABASE: SymbolMatch = SymbolMatch(1 << 2);
    pub const CLUSTER: SymbolMatch = SymbolMatch(1 << 3);
    pub const FUNCTION: SymbolMatch = SymbolMatch(1 << 4);
    pub const LOCAL: SymbolMatch = SymbolMatch(1 << 5);
    pub const ANY: SymbolMatch = SymbolMatch(u32::MAX);

    pub fn contains(self, other: SymbolMatch) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn accepts(self, symbol: &Symbol) -> bool {
        match symbol {
            Symbol::Column(_) | Symbol::Tuple(_) => self.contains(Self::COLUMN),
            Symbol::Table(_) => self.contains(Self::TABLE),
            Symbol::Database(_) => self.contains(Self::DATABASE),
            Symbol::Cluster(_) => self.contains(Self::CLUSTER),
            Symbol::Function(_) | Symbol::Pattern(_) => self.contains(Self::FUNCTION),
            Symbol::Variable(_) => self.contains(Self::LOCAL),
            Symbol::Group(_) => true,
        }
    }
}

impl std::ops::BitOr for SymbolMatch {
    type Output = SymbolMatch;
    fn bitor(self, rhs: SymbolMatch) -> SymbolMatch {
        SymbolMatch(self.0 | rhs.0)
    }
}

/// Which function origins `symbols_in_scope` should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionKinds(u32);

impl FunctionKinds {
    pub const BUILT_IN: FunctionKinds = FunctionKinds(1 << 0);
    pub const DATABASE: FunctionKinds = FunctionKinds(1 << 1);
    pub const LOCAL: FunctionKinds = FunctionKinds(1 << 2);
    pub const ALL: FunctionKinds = FunctionKinds(u32::MAX);
    pub const NONE: FunctionKinds = FunctionKinds(0);

    pub fn includes(self, kind: FunctionKind) -> bool {
        let bit = match kind {
            FunctionKind::BuiltIn => Self::BUILT_IN,
            FunctionKind::Database => Self::DATABASE,
            FunctionKind::Local => Self::LOCAL,
        };
        self.0 & bit.0 != 0
    }
}

impl std::ops::BitOr for FunctionKinds {
    type Output = FunctionKinds;
    fn bitor(self, rhs: FunctionKinds) -> FunctionKinds {
        FunctionKinds(self.0 | rhs.0)
    }
}

/// An immutable catalog snapshot: clusters and databases plus the built-in
/// operator, function, aggregate and plug-in library.
pub struct Catalog {
    clusters: Vec<ClusterRef>,
    default_cluster: ClusterRef,
    default_database: DatabaseRef,
    operators: HashMap<OperatorKind, OperatorRef>,
    scalar_functions: Vec<FunctionRef>,
    aggregates: Vec<FunctionRef>,
    plugins: Vec<FunctionRef>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn clusters(&self) -> &[ClusterRef] {
        &self.clusters
    }

    pub fn default_cluster(&self) -> &ClusterRef {
        &self.default_cluster
    }

    pub fn default_database(&self) -> &DatabaseRef {
        &self.default_database
    }

    pub fn cluster_by_name(&self, name: &str) -> Option<&ClusterRef> {
        self.clusters
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn operator(&self, kind: OperatorKind) -> &OperatorRef {
        self.operators
            .get(&kind)
            .expect("every operator kind is installed at build time")
    }

    pub fn builtin_function(&self, name: &str) -> Option<&FunctionRef> {
        self.scalar_functions
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn aggregate(&self, name: &str) -> Option<&FunctionRef> {
        self.aggregates
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn plugin(&self, name: &str) -> Option<&FunctionRef> {
        self.plugins
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn builtin_functions(&self) -> &[FunctionRef] {
        &self.scalar_functions
    }

    pub fn aggregates(&self) -> &[FunctionRef] {
        &self.aggregates
    }

    pub fn plugins(&self) -> &[FunctionRef] {
        &self.plugins
    }
}

/// Fluent construction of catalog snapshots, mainly for embedders and tests.
#[derive(Default)]
pub struct CatalogBuilder {
    tables: Vec<TableRef>,
    functions: Vec<FunctionRef>,
    database_open: bool,
    databases: Vec<DatabaseRef>,
    clusters: Vec<ClusterRef>,
}

impl CatalogBuilder {
    /// Add a table to the default database.
    pub fn table(mut self, table: TableSymbol) -> CatalogBuilder {
        self.tables.push(table.into_ref());
        self
    }

    pub fn table_ref(mut self, table: TableRef) -> CatalogBuilder {
        self.tables.push(table);
        self
    }

    /// Add a stored function to the default database.
    pub fn function(mut self, function: FunctionSymbol) -> CatalogBuilder {
        self.functions
            .push(function.kind_of(FunctionKind::Database).into_ref());
        self
    }

    /// Mark the default database as open.
    pub fn open_database(mut self) -> CatalogBuilder {
        self.database_open = true;
        self
    }

    /// Add a further database to the default cluster.
    pub fn database(mut self, database: DatabaseSymbol) -> CatalogBuilder {
        self.databases.push(database.into_ref());
        self
    }

    /// Add a further cluster.
    pub fn cluster(mut self, cluster: ClusterSymbol) -> CatalogBuilder {
        self.clusters.push(cluster.into_ref());
        self
    }

    pub fn build(self) -> Catalog {
        let mut default_db = DatabaseSymbol::new(DEFAULT_DATABASE_NAME);
        if self.database_open {
            default_db = default_db.open();
        }
        for table in self.tables {
            default_db = default_db.table_ref(table);
        }
        for function in self.functions {
            default_db = default_db.function(function);
        }
        let default_database = default_db.into_ref();

        let mut default_cluster =
            ClusterSymbol::new(DEFAULT_CLUSTER_NAME).database_ref(default_database.clone());
        for db in self.databases {
            default_cluster = default_cluster.database_ref(db);
        }
        let default_cluster = default_cluster.into_ref();

        let mut clusters = vec![default_cluster.clone()];
        clusters.extend(self.clusters);

        Catalog {
            clusters,
            default_cluster,
            default_database,
            operators: builtins::operators(),
            scalar_functions: builtins::scalar_functions(),
            aggregates: builtins::aggregates(),
            plugins: builtins::plugins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_wires_default_entities() {
        let catalog = Catalog::builder()
            .table(TableSymbol::new("T").column("x", ScalarKind::Long))
            .build();
        assert_eq!(catalog.default_cluster().name(), DEFAULT_CLUSTER_NAME);
        assert_eq!(catalog.default_database().name(), DEFAULT_DATABASE_NAME);
        assert!(catalog.default_database().table_by_name("t").is_some());
        assert!(catalog.builtin_function("strcat").is_some());
        assert!(catalog.aggregate("sum").is_some());
    }

    #[test]
    fn type_equality_is_identity_for_tables() {
        let t1 = TableSymbol::new("T").column("x", ScalarKind::Long).into_ref();
        let t2 = TableSymbol::new("T").column("x", ScalarKind::Long).into_ref();
        assert_eq!(Type::Table(t1.clone()), Type::Table(t1.clone()));
        assert_ne!(Type::Table(t1), Type::Table(t2));
        assert_eq!(Type::LONG, Type::LONG);
    }

    #[test]
    fn dynamic_converts_both_ways() {
        assert!(Type::DYNAMIC.assignable_to(&Type::LONG));
        assert!(Type::LONG.assignable_to(&Type::DYNAMIC));
        assert!(!Type::STRING.assignable_to(&Type::LONG));
    }
}
