// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The semantic binder.
//!
//! The binder walks an immutable syntax tree, resolves every name against
//! the catalog snapshot and the scopes in effect, selects overloads, infers
//! row schemas through piped operators, and attaches a [`SemanticInfo`] to
//! each expression node. Semantic failures never abort the walk: they become
//! diagnostics and binding continues with best-effort types.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

mod cache;
mod error;
mod expand;
mod expr;
mod matcher;
mod open;
mod projection;
mod query;
mod return_type;
mod scope;
mod semantic;
mod unify;

pub use self::cache::GlobalBindingCache;
pub use self::error::{Diagnostic, DiagnosticKind};
pub use self::expand::Expansion;
pub use self::scope::ScopeKind;
pub use self::semantic::{SemanticInfo, SemanticModel};
pub use self::unify::UnifyStrategy;

use self::cache::LocalBindingCache;
use self::open::OpenEntities;
use self::scope::LocalScope;
use crate::catalog::{
    Catalog, ClusterRef, DatabaseRef, FunctionBodyFacts, FunctionKinds, FunctionRef, Parameter,
    ParameterTypeKind, PatternSignature, PatternSymbol, ReturnTypeKind, Signature, Symbol,
    SymbolMatch, TableRef, TableSymbol, TupleRef, TupleSymbol, Type, VariableSymbol,
};
use crate::parser::{
    FunctionDecl, LetValue, NodeId, ParamDecl, QueryBlock, Span, Statement, StatementKind,
    TypeExpr,
};

/// A cooperatively-checked cancellation token. Binding checks it at
/// statement- and operator-level rules and aborts with partial semantic
/// info.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for [`Binder::bind_with`].
#[derive(Default)]
pub struct BindOptions {
    pub cancellation: CancellationToken,
    /// Share a cache across bindings of the same catalog. A fresh cache is
    /// used when absent.
    pub global_cache: Option<Arc<GlobalBindingCache>>,
}

pub struct Binder {
    catalog: Arc<Catalog>,
    global_cache: Arc<GlobalBindingCache>,
    local_cache: Rc<RefCell<LocalBindingCache>>,
    semantics: SemanticModel,

    current_cluster: ClusterRef,
    current_database: DatabaseRef,
    local_scope: LocalScope,
    row_scope: Option<TableRef>,
    right_row_scope: Option<TableRef>,
    scope_kind: ScopeKind,
    /// Set while binding `invoke`, consumed by the next call binding.
    implicit_argument_type: Option<Type>,

    open: OpenEntities,
    /// Accumulates body facts while binding an inline expansion.
    body_facts: Option<FunctionBodyFacts>,
    cancel: CancellationToken,

    /// Cursor services for `symbols_in_scope` / `row_scope_at`.
    cursor: Option<u32>,
    captured_symbols: Option<Vec<Symbol>>,
    captured_row_scope: Option<Option<TableRef>>,
    capture_match: SymbolMatch,
    capture_kinds: FunctionKinds,
}

impl Binder {
    /// Bind a whole query block and return the semantic side table.
    pub fn bind(block: &QueryBlock, catalog: Arc<Catalog>) -> SemanticModel {
        Self::bind_with(block, catalog, BindOptions::default())
    }

    pub fn bind_with(
        block: &QueryBlock,
        catalog: Arc<Catalog>,
        options: BindOptions,
    ) -> SemanticModel {
        let mut binder = Binder::new(block, catalog, options);
        binder.bind_block(block);
        binder.semantics
    }

    /// The declared or computed return type of a function's first signature.
    /// Computed bodies are expanded under the parameters' declared types.
    pub fn computed_return_type(function: &FunctionRef, catalog: Arc<Catalog>) -> Type {
        let empty = QueryBlock {
            statements: Vec::new(),
            node_count: 0,
        };
        let mut binder = Binder::new(&empty, catalog, BindOptions::default());
        binder.declared_expansion_type(function)
    }

    /// The symbols visible at `offset`, filtered by symbol and function
    /// kind masks.
    pub fn symbols_in_scope(
        block: &QueryBlock,
        offset: u32,
        catalog: Arc<Catalog>,
        matching: SymbolMatch,
        function_kinds: FunctionKinds,
        cancellation: CancellationToken,
    ) -> Vec<Symbol> {
        let mut binder = Binder::new(
            block,
            catalog,
            BindOptions {
                cancellation,
                global_cache: None,
            },
        );
        binder.cursor = Some(offset);
        binder.capture_match = matching;
        binder.capture_kinds = function_kinds;
        binder.bind_block(block);
        binder.captured_symbols.unwrap_or_default()
    }

    /// The row scope in effect at `offset`, if the position is inside a
    /// piped query.
    pub fn row_scope_at(
        block: &QueryBlock,
        offset: u32,
        catalog: Arc<Catalog>,
        cancellation: CancellationToken,
    ) -> Option<TableRef> {
        let mut binder = Binder::new(
            block,
            catalog,
            BindOptions {
                cancellation,
                global_cache: None,
            },
        );
        binder.cursor = Some(offset);
        binder.bind_block(block);
        binder.captured_row_scope.flatten()
    }

    fn new(block: &QueryBlock, catalog: Arc<Catalog>, options: BindOptions) -> Binder {
        let current_cluster = catalog.default_cluster().clone();
        let current_database = catalog.default_database().clone();
        Binder {
            global_cache: options.global_cache.unwrap_or_default(),
            local_cache: Rc::new(RefCell::new(LocalBindingCache::default())),
            semantics: SemanticModel::new(block),
            current_cluster,
            current_database,
            local_scope: LocalScope::new(),
            row_scope: None,
            right_row_scope: None,
            scope_kind: ScopeKind::Normal,
            implicit_argument_type: None,
            open: OpenEntities::default(),
            body_facts: None,
            cancel: options.cancellation,
            cursor: None,
            captured_symbols: None,
            captured_row_scope: None,
            capture_match: SymbolMatch::ANY,
            capture_kinds: FunctionKinds::ALL,
            catalog,
        }
    }

    /// Statements bind in order; `let` and `declare pattern` add to the
    /// local scope seen by the rest of the block. The last statement's type
    /// is the block's result type.
    fn bind_block(&mut self, block: &QueryBlock) -> Type {
        let mut result = Type::Void;
        for statement in &block.statements {
            if self.cancel.is_cancelled() {
                debug!("binding cancelled, leaving partial semantic info");
                break;
            }
            result = self.bind_statement(statement);
        }
        result
    }

    fn bind_statement(&mut self, statement: &Statement) -> Type {
        self.maybe_capture(statement.span);
        match &statement.kind {
            StatementKind::Let { name, value } => {
                let ty = match value {
                    LetValue::Scalar(expr) => {
                        let ty = self.bind_expr(expr);
                        let info = self.semantics.info(expr.id);
                        let symbol = if info.is_some_and(|i| i.is_constant) {
                            VariableSymbol::constant(
                                name.name.clone(),
                                ty.clone(),
                                info.and_then(|i| i.constant_value.clone()),
                            )
                        } else {
                            VariableSymbol::new(name.name.clone(), ty.clone())
                        };
                        self.local_scope.insert(Symbol::Variable(symbol));
                        ty
                    }
                    LetValue::Function(decl) => {
                        let function = self.declare_function(&name.name, decl);
                        let ty = Type::Lambda(function.clone());
                        self.local_scope.insert(Symbol::Function(function));
                        ty
                    }
                };
                self.set_info(statement.id, SemanticInfo::of_type(ty.clone()));
                ty
            }
            StatementKind::DeclarePattern { name, decl } => {
                let ty = self.declare_pattern(statement, name, decl);
                self.set_info(statement.id, SemanticInfo::of_type(ty.clone()));
                ty
            }
            StatementKind::Query(expr) => {
                let ty = self.bind_expr(expr);
                self.set_info(statement.id, SemanticInfo::of_type(ty.clone()));
                ty
            }
        }
    }

    /// Build a local function symbol from a `let name = (params) { body }`.
    fn declare_function(&mut self, name: &str, decl: &FunctionDecl) -> FunctionRef {
        let params = decl
            .params
            .iter()
            .map(|p| self.declare_parameter(p))
            .collect();
        let signature = Signature::new(
            ReturnTypeKind::Computed {
                body: decl.body.clone(),
            },
            params,
        );
        Arc::new(
            crate::catalog::FunctionSymbol::new(name, vec![signature])
                .kind_of(crate::catalog::FunctionKind::Local),
        )
    }

    fn declare_parameter(&mut self, decl: &ParamDecl) -> Parameter {
        let mut param = match &decl.ty {
            TypeExpr::Scalar(kind) => Parameter::scalar(decl.name.name.clone(), *kind),
            TypeExpr::Table(columns) => {
                let table = columns
                    .iter()
                    .fold(TableSymbol::new(decl.name.name.clone()), |t, (n, k)| {
                        t.column(n.clone(), *k)
                    })
                    .into_ref();
                Parameter::new(
                    decl.name.name.clone(),
                    ParameterTypeKind::Declared(vec![Type::Table(table)]),
                )
            }
            TypeExpr::OpenTable => {
                Parameter::new(decl.name.name.clone(), ParameterTypeKind::Tabular)
            }
        };
        if let Some(default) = &decl.default {
            let _ = self.bind_expr(default);
            let value = self
                .semantics
                .info(default.id)
                .and_then(|i| i.constant_value.clone());
            if let Some(value) = value {
                param = param.with_default(value);
            } else {
                param.is_optional = true;
            }
        }
        param
    }

    fn declare_pattern(
        &mut self,
        statement: &Statement,
        name: &crate::parser::Ident,
        decl: &crate::parser::PatternDecl,
    ) -> Type {
        let mut parameters = Vec::new();
        for p in &decl.params {
            match &p.ty {
                TypeExpr::Scalar(kind) => parameters.push((p.name.name.clone(), *kind)),
                _ => {
                    let info = SemanticInfo::error().with_diagnostic(
                        DiagnosticKind::InvalidTypeExpression.with_span(p.name.span),
                    );
                    self.set_info(statement.id, info);
                    return Type::Error;
                }
            }
        }
        let signatures = decl
            .mappings
            .iter()
            .map(|m| PatternSignature {
                values: m.values.iter().map(|l| l.to_value()).collect(),
                path_value: m.path_value.as_ref().map(|l| l.to_value()),
                body: m.body.clone(),
            })
            .collect();
        let pattern = PatternSymbol::new(
            name.name.clone(),
            parameters,
            decl.path.as_ref().map(|p| p.name.clone()),
            signatures,
        );
        self.local_scope.insert(Symbol::Pattern(pattern));
        Type::Void
    }

    // ===== shared helpers =====

    pub(crate) fn set_info(&mut self, node: NodeId, info: SemanticInfo) {
        self.semantics.set(node, info);
    }

    pub(crate) fn result_type_of(&self, node: NodeId) -> Type {
        self.semantics.result_type_of(node)
    }

    /// An empty closed table, the best-effort row scope after a failed
    /// operator.
    fn empty_table(&self) -> TableRef {
        TableSymbol::from_columns("", Vec::new(), false)
    }

    /// The current row scope with any columns inferred against it so far.
    fn effective_row_scope(&mut self) -> Option<TableRef> {
        let scope = self.row_scope.clone()?;
        Some(self.open.absorb_inferred(&scope))
    }

    fn row_tuple(&self, table: &TableRef) -> TupleRef {
        TupleSymbol::new(table.columns().to_vec())
    }

    /// Record the cursor position's scope when the span contains it.
    fn maybe_capture(&mut self, span: Span) {
        let Some(offset) = self.cursor else { return };
        // a position at the very start of a span belongs to the preceding
        // token, hence the exclusive lower bound
        if span.start < offset && offset <= span.end || span.contains(offset) && span.start == 0 {
            self.captured_row_scope = Some(self.row_scope.clone());
            self.captured_symbols = Some(self.collect_symbols_in_scope());
        }
    }

    fn collect_symbols_in_scope(&self) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        if let Some(scope) = &self.row_scope {
            for column in scope.columns() {
                symbols.push(Symbol::Column(column.clone()));
            }
        }
        if let Some(scope) = &self.right_row_scope {
            for column in scope.columns() {
                symbols.push(Symbol::Column(column.clone()));
            }
        }
        for symbol in self.local_scope.symbols() {
            if let Symbol::Function(f) = symbol {
                if !self.capture_kinds.includes(f.kind()) {
                    continue;
                }
            }
            symbols.push(symbol.clone());
        }
        for table in self.current_database.tables() {
            symbols.push(Symbol::Table(table.clone()));
        }
        for function in self.current_database.functions() {
            if self.capture_kinds.includes(crate::catalog::FunctionKind::Database) {
                symbols.push(Symbol::Function(function.clone()));
            }
        }
        for database in self.current_cluster.databases() {
            symbols.push(Symbol::Database(database.clone()));
        }
        if self
            .capture_kinds
            .includes(crate::catalog::FunctionKind::BuiltIn)
        {
            let functions: &[FunctionRef] = match self.scope_kind {
                ScopeKind::Aggregate => self.catalog.aggregates(),
                ScopeKind::PlugIn => self.catalog.plugins(),
                ScopeKind::Normal => self.catalog.builtin_functions(),
            };
            for function in functions {
                symbols.push(Symbol::Function(function.clone()));
            }
        }
        symbols.retain(|s| self.capture_match.accepts(s));
        symbols
    }

    /// The declared-types expansion used by [`Binder::computed_return_type`].
    fn declared_expansion_type(&mut self, function: &FunctionRef) -> Type {
        let Some(signature) = function.signatures().first().cloned() else {
            return Type::Error;
        };
        match signature.return_kind() {
            ReturnTypeKind::Declared(ty) => ty.clone(),
            ReturnTypeKind::Computed { body } => {
                let args: Vec<expand::ExpansionArg> = signature
                    .parameters()
                    .iter()
                    .map(|p| expand::ExpansionArg {
                        name: p.name.clone(),
                        ty: declared_parameter_type(p),
                        is_constant: false,
                        value: None,
                    })
                    .collect();
                let body = body.clone();
                match self.expand_body(function, &signature, &body, &args) {
                    Some(expansion) => expansion.result_type.clone(),
                    None => Type::Error,
                }
            }
            _ => Type::Error,
        }
    }
}

/// The type a parameter contributes to a declared-types expansion.
fn declared_parameter_type(param: &Parameter) -> Type {
    match &param.type_kind {
        ParameterTypeKind::Declared(types) => types.first().cloned().unwrap_or(Type::Error),
        ParameterTypeKind::Tabular | ParameterTypeKind::SingleColumnTable => {
            Type::Table(TableSymbol::new("").open().into_ref())
        }
        _ => Type::DYNAMIC,
    }
}
