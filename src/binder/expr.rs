// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Expression binding: literals, name references, paths, operators, calls.

use std::sync::Arc;

use super::error::DiagnosticKind;
use super::matcher::{self, ArgumentInfo, MatchResult};
use super::return_type::CallContext;
use super::scope::ScopeKind;
use super::semantic::SemanticInfo;
use super::Binder;
use crate::catalog::{
    FunctionRef, GroupSymbol, OperatorKind, PatternRef, ResultNameKind, ReturnTypeKind,
    SignatureRef, Symbol, TableSymbol, Type,
};
use crate::parser::{
    Arg, BinaryOp, CallExpr, Expr, ExprKind, Ident, InOp, Literal, Span, TypeExpr, UnaryOp,
};
use crate::types::{DataValue, ScalarKind};

impl Binder {
    /// Bind one expression, attach its semantic info, and return its type.
    pub(super) fn bind_expr(&mut self, expr: &Expr) -> Type {
        let info = match &expr.kind {
            ExprKind::Literal(literal) => bind_literal(literal),
            ExprKind::Name(ident) => self.resolve_name_expr(ident, expr.span),
            // valid only in argument and projection positions, which handle
            // it before binding; reaching here is fine and typeless
            ExprKind::Star => SemanticInfo::of_type(Type::Void),
            ExprKind::Path { left, name } => self.bind_path(left, name, expr.span),
            ExprKind::Element { left, index } => self.bind_element(left, index),
            ExprKind::Unary { op, operand } => self.bind_unary(*op, operand, expr.span),
            ExprKind::Binary { op, left, right } => self.bind_binary(*op, left, right, expr.span),
            ExprKind::In { op, left, list } => self.bind_in(*op, left, list, expr.span),
            ExprKind::Between {
                negated,
                expr: value,
                low,
                high,
            } => self.bind_between(*negated, value, low, high, expr.span),
            ExprKind::Call(call) => self.bind_call(call, expr.span),
            ExprKind::Pipe { .. } => return self.bind_pipe(expr),
            ExprKind::Datatable { columns, values } => self.bind_datatable(columns, values),
            ExprKind::Range {
                name,
                from,
                to,
                step,
            } => self.bind_range(name, from, to, step),
            ExprKind::Print { items } => self.bind_print(items),
            ExprKind::TypeOf(_) => {
                SemanticInfo::of_type(Type::Scalar(ScalarKind::Type)).constant(None)
            }
            ExprKind::Paren(inner) => {
                let _ = self.bind_expr(inner);
                let inner_info = self
                    .semantics
                    .info(inner.id)
                    .cloned()
                    .unwrap_or_else(SemanticInfo::error);
                SemanticInfo {
                    diagnostics: Vec::new(),
                    ..inner_info
                }
            }
        };
        let ty = info.result_type.clone();
        self.set_info(expr.id, info);
        ty
    }

    // ===== names =====

    /// Resolve a bare name used as an expression, in the fixed lookup
    /// order: row scope, right row scope, local scope, zero-argument
    /// database functions, other members of the current database, the
    /// current cluster's databases, built-in functions, then open-column
    /// inference.
    fn resolve_name_expr(&mut self, ident: &Ident, span: Span) -> SemanticInfo {
        let name = ident.name.as_str();

        // whole-row references are only valid while a join is in scope
        if name == "$left" || name == "$right" {
            let scope = if name == "$left" {
                self.row_scope.clone()
            } else {
                self.right_row_scope.clone()
            };
            return match (scope, self.right_row_scope.is_some()) {
                (Some(table), true) => {
                    let tuple = self.row_tuple(&table);
                    SemanticInfo::of_type(Type::Tuple(tuple.clone()))
                        .with_symbol(Symbol::Tuple(tuple))
                }
                _ => SemanticInfo::error().with_diagnostic(
                    DiagnosticKind::NameNotDefined(name.into()).with_span(span),
                ),
            };
        }

        let hits = self.name_hits(name);
        match hits.len() {
            0 => {
                if let Some(scope) = self.row_scope.clone() {
                    if scope.is_open() {
                        let column = self.open.inferred_column(&scope, name);
                        return SemanticInfo::of_type(column.ty().clone())
                            .with_symbol(Symbol::Column(column));
                    }
                }
                SemanticInfo::error()
                    .with_diagnostic(DiagnosticKind::NameNotDefined(name.into()).with_span(span))
            }
            1 => self.single_hit(hits.into_iter().next().expect("len checked"), span),
            _ => {
                let group = GroupSymbol::new(name, hits);
                SemanticInfo::error()
                    .with_symbol(Symbol::Group(group))
                    .with_diagnostic(DiagnosticKind::AmbiguousName(name.into()).with_span(span))
            }
        }
    }

    /// The first non-empty step of the lookup order wins; multiple hits in
    /// one step are an ambiguity.
    fn name_hits(&mut self, name: &str) -> Vec<Symbol> {
        if let Some(scope) = &self.row_scope {
            if let Some(column) = scope.column_by_name(name) {
                return vec![Symbol::Column(column.clone())];
            }
        }
        if let Some(scope) = &self.right_row_scope {
            if let Some(column) = scope.column_by_name(name) {
                return vec![Symbol::Column(column.clone())];
            }
        }
        let locals = self.local_scope.lookup(name);
        if !locals.is_empty() {
            return locals;
        }
        // zero-argument database functions are their own step: they win
        // outright over other same-named members of the database
        if let Some(function) = self.current_database.function_by_name(name) {
            if function.min_argument_count() == 0 {
                return vec![Symbol::Function(function.clone())];
            }
        }
        let mut db_hits = Vec::new();
        if let Some(table) = self.current_database.table_by_name(name) {
            db_hits.push(Symbol::Table(table.clone()));
        }
        if let Some(function) = self.current_database.function_by_name(name) {
            db_hits.push(Symbol::Function(function.clone()));
        }
        if !db_hits.is_empty() {
            return db_hits;
        }
        if let Some(database) = self.current_cluster.database_by_name(name) {
            return vec![Symbol::Database(database.clone())];
        }
        if let Some(function) = self.find_builtin(name) {
            return vec![Symbol::Function(function)];
        }
        Vec::new()
    }

    fn find_builtin(&self, name: &str) -> Option<FunctionRef> {
        match self.scope_kind {
            ScopeKind::Aggregate => self
                .catalog
                .aggregate(name)
                .or_else(|| self.catalog.builtin_function(name))
                .cloned(),
            ScopeKind::PlugIn => self
                .catalog
                .plugin(name)
                .or_else(|| self.catalog.builtin_function(name))
                .cloned(),
            ScopeKind::Normal => self.catalog.builtin_function(name).cloned(),
        }
    }

    fn single_hit(&mut self, symbol: Symbol, span: Span) -> SemanticInfo {
        match &symbol {
            Symbol::Function(function) => {
                // a bare function name invokes its zero-argument signature
                // when one exists
                if function.min_argument_count() == 0 {
                    let function = function.clone();
                    let context = self.call_context();
                    self.bind_function_invocation(&function, context, &[], span)
                } else {
                    SemanticInfo::error()
                        .with_symbol(symbol.clone())
                        .with_diagnostic(
                            DiagnosticKind::NameRequiresArgumentList(
                                function.name().to_string(),
                            )
                            .with_span(span),
                        )
                }
            }
            Symbol::Pattern(pattern) => SemanticInfo::error()
                .with_symbol(symbol.clone())
                .with_diagnostic(
                    DiagnosticKind::NameRequiresArgumentList(pattern.name().to_string())
                        .with_span(span),
                ),
            Symbol::Variable(variable) if variable.is_constant() => {
                SemanticInfo::of_type(variable.ty().clone())
                    .with_symbol(symbol.clone())
                    .constant(variable.constant_value().cloned())
            }
            _ => SemanticInfo::of_type(symbol.result_type()).with_symbol(symbol),
        }
    }

    // ===== paths and elements =====

    fn bind_path(&mut self, left: &Expr, name: &Ident, span: Span) -> SemanticInfo {
        // a pattern invocation followed by a path member selects by both
        // argument values and path value, as one unit
        if let ExprKind::Call(call) = &left.kind {
            if let Some(pattern) = self.callee_pattern(call) {
                let info = self.bind_pattern_call(&pattern, call, Some(name), span);
                self.set_info(
                    left.id,
                    SemanticInfo::of_type(info.result_type.clone())
                        .with_symbol(Symbol::Pattern(pattern)),
                );
                return info;
            }
        }

        let left_ty = self.bind_expr(left);
        match left_ty {
            Type::Error => SemanticInfo::error(),
            Type::Database(db) => {
                if let Some(table) = db.table_by_name(&name.name) {
                    return SemanticInfo::of_type(Type::Table(table.clone()))
                        .with_symbol(Symbol::Table(table.clone()));
                }
                if let Some(function) = db.function_by_name(&name.name) {
                    let function = function.clone();
                    if function.min_argument_count() == 0 {
                        let context = CallContext {
                            cluster: self.current_cluster.clone(),
                            database: db.clone(),
                        };
                        return self.bind_function_invocation(&function, context, &[], span);
                    }
                    return SemanticInfo::error()
                        .with_symbol(Symbol::Function(function.clone()))
                        .with_diagnostic(
                            DiagnosticKind::NameRequiresArgumentList(
                                function.name().to_string(),
                            )
                            .with_span(name.span),
                        );
                }
                if db.is_open() {
                    let table = self.open.open_table(&db, &name.name);
                    return SemanticInfo::of_type(Type::Table(table.clone()))
                        .with_symbol(Symbol::Table(table));
                }
                SemanticInfo::error().with_diagnostic(
                    DiagnosticKind::NameNotDefined(name.name.clone()).with_span(name.span),
                )
            }
            Type::Cluster(cluster) => {
                if let Some(db) = cluster.database_by_name(&name.name) {
                    return SemanticInfo::of_type(Type::Database(db.clone()))
                        .with_symbol(Symbol::Database(db.clone()));
                }
                if cluster.is_open() {
                    let db = self.open.open_database(&cluster, &name.name);
                    return SemanticInfo::of_type(Type::Database(db.clone()))
                        .with_symbol(Symbol::Database(db));
                }
                SemanticInfo::error().with_diagnostic(
                    DiagnosticKind::NameNotDefined(name.name.clone()).with_span(name.span),
                )
            }
            Type::Tuple(tuple) => match tuple.column_by_name(&name.name) {
                Some(column) => SemanticInfo::of_type(column.ty().clone())
                    .with_symbol(Symbol::Column(column.clone())),
                None => SemanticInfo::error().with_diagnostic(
                    DiagnosticKind::NameNotDefined(name.name.clone()).with_span(name.span),
                ),
            },
            Type::Scalar(ScalarKind::Dynamic) => SemanticInfo::of_type(Type::DYNAMIC),
            _ => SemanticInfo::error().with_diagnostic(
                DiagnosticKind::NameNotDefined(name.name.clone()).with_span(name.span),
            ),
        }
    }

    fn bind_element(&mut self, left: &Expr, index: &Expr) -> SemanticInfo {
        let left_ty = self.bind_expr(left);
        let _ = self.bind_expr(index);
        match left_ty {
            Type::Error => SemanticInfo::error(),
            Type::Scalar(ScalarKind::Dynamic) => SemanticInfo::of_type(Type::DYNAMIC),
            other => SemanticInfo::error().with_diagnostic(
                DiagnosticKind::TypeMismatch {
                    expected: "dynamic".into(),
                    actual: other.to_string(),
                }
                .with_span(left.span),
            ),
        }
    }

    // ===== operators =====

    fn bind_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> SemanticInfo {
        let kind = match op {
            UnaryOp::Plus => OperatorKind::UnaryPlus,
            UnaryOp::Minus => OperatorKind::UnaryMinus,
        };
        self.bind_operator_call(kind, &[operand], span)
    }

    fn bind_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> SemanticInfo {
        self.bind_operator_call(binary_operator_kind(op), &[left, right], span)
    }

    fn bind_in(&mut self, op: InOp, left: &Expr, list: &[Expr], span: Span) -> SemanticInfo {
        let kind = match op {
            InOp::In => OperatorKind::In,
            InOp::NotIn => OperatorKind::NotIn,
            InOp::InCs => OperatorKind::InCs,
            InOp::NotInCs => OperatorKind::NotInCs,
            InOp::HasAny => OperatorKind::HasAny,
        };
        let mut exprs: Vec<&Expr> = vec![left];
        exprs.extend(list.iter());
        self.bind_operator_call(kind, &exprs, span)
    }

    fn bind_between(
        &mut self,
        negated: bool,
        value: &Expr,
        low: &Expr,
        high: &Expr,
        span: Span,
    ) -> SemanticInfo {
        let kind = if negated {
            OperatorKind::NotBetween
        } else {
            OperatorKind::Between
        };
        self.bind_operator_call(kind, &[value, low, high], span)
    }

    pub(super) fn bind_operator_call(
        &mut self,
        kind: OperatorKind,
        operands: &[&Expr],
        span: Span,
    ) -> SemanticInfo {
        let args: Vec<ArgumentInfo> = operands
            .iter()
            .map(|e| self.make_arg_info(e, None))
            .collect();
        if args.iter().any(|a| a.ty.is_error()) {
            return SemanticInfo::error();
        }
        let operator = self.catalog.operator(kind).clone();
        let mut info = self.bind_with_signatures(
            operator.kind().display(),
            operator.signatures(),
            &args,
            false,
            false,
            self.call_context(),
            span,
        );
        info.is_constant = args.iter().all(|a| a.is_constant) && !args.is_empty();
        info
    }

    // ===== calls =====

    pub(super) fn bind_call(&mut self, call: &CallExpr, span: Span) -> SemanticInfo {
        if let Some(pattern) = self.callee_pattern(call) {
            return self.bind_pattern_call(&pattern, call, None, span);
        }
        match self.resolve_callee(call, span) {
            Ok((function, context)) => {
                self.bind_function_invocation(&function, context, &call.args, span)
            }
            Err(info) => info,
        }
    }

    /// The pattern a call's callee names, when it does.
    fn callee_pattern(&self, call: &CallExpr) -> Option<PatternRef> {
        let ident = call.simple_name()?;
        let hits = self.local_scope.lookup(&ident.name);
        match hits.as_slice() {
            [Symbol::Pattern(pattern)] => Some(pattern.clone()),
            _ => None,
        }
    }

    fn resolve_callee(
        &mut self,
        call: &CallExpr,
        span: Span,
    ) -> Result<(FunctionRef, CallContext), SemanticInfo> {
        if let Some(ident) = call.simple_name() {
            let name = ident.name.as_str();
            // body facts for the dynamic-scope special functions
            match name {
                "table" => self.note_body_fact(|f| f.uses_unqualified_table = true),
                "database" => self.note_body_fact(|f| f.uses_database = true),
                "cluster" => self.note_body_fact(|f| f.uses_cluster = true),
                _ => {}
            }
            return match self.resolve_function_name(name) {
                Some(function) => Ok((function, self.call_context())),
                None => {
                    let kind = match self.scope_kind {
                        ScopeKind::Aggregate => {
                            DiagnosticKind::AggregateNotDefined(name.to_string())
                        }
                        _ => DiagnosticKind::FunctionNotDefined(name.to_string()),
                    };
                    Err(SemanticInfo::error().with_diagnostic(kind.with_span(ident.span)))
                }
            };
        }

        // dotted callee: the path's left side supplies the catalog context
        let ExprKind::Path { left, name } = &call.callee.kind else {
            return Err(SemanticInfo::error().with_diagnostic(
                DiagnosticKind::NotAFunction(String::new()).with_span(call.callee.span),
            ));
        };
        let left_ty = self.bind_expr(left);
        match left_ty {
            Type::Error => Err(SemanticInfo::error()),
            Type::Cluster(cluster) if name.eq_ignore_case("database") => {
                self.note_body_fact(|f| f.uses_database = true);
                let function = self
                    .catalog
                    .builtin_function("database")
                    .expect("database() is always installed")
                    .clone();
                Ok((
                    function,
                    CallContext {
                        cluster,
                        database: self.current_database.clone(),
                    },
                ))
            }
            Type::Database(database) if name.eq_ignore_case("table") => {
                self.note_body_fact(|f| f.uses_qualified_table = true);
                let function = self
                    .catalog
                    .builtin_function("table")
                    .expect("table() is always installed")
                    .clone();
                Ok((
                    function,
                    CallContext {
                        cluster: self.current_cluster.clone(),
                        database,
                    },
                ))
            }
            Type::Database(database) => match database.function_by_name(&name.name) {
                Some(function) => Ok((
                    function.clone(),
                    CallContext {
                        cluster: self.current_cluster.clone(),
                        database: database.clone(),
                    },
                )),
                None => Err(SemanticInfo::error().with_diagnostic(
                    DiagnosticKind::FunctionNotDefined(name.name.clone()).with_span(name.span),
                )),
            },
            _ => Err(SemanticInfo::error().with_diagnostic(
                DiagnosticKind::NotAFunction(name.name.clone()).with_span(span),
            )),
        }
    }

    /// Function-position name search: local scope, database functions,
    /// then built-ins appropriate to the scope kind. Aggregates and
    /// plug-ins are found in any scope so misuse gets a precise diagnostic.
    fn resolve_function_name(&mut self, name: &str) -> Option<FunctionRef> {
        for symbol in self.local_scope.lookup(name) {
            match symbol {
                Symbol::Function(function) => return Some(function),
                Symbol::Variable(variable) => {
                    if let Type::Lambda(function) = variable.ty() {
                        return Some(function.clone());
                    }
                }
                _ => {}
            }
        }
        if let Some(function) = self.current_database.function_by_name(name) {
            return Some(function.clone());
        }
        self.find_builtin(name)
            .or_else(|| self.catalog.aggregate(name).cloned())
            .or_else(|| self.catalog.plugin(name).cloned())
    }

    pub(super) fn bind_function_invocation(
        &mut self,
        function: &FunctionRef,
        context: CallContext,
        args_ast: &[Arg],
        span: Span,
    ) -> SemanticInfo {
        let mut pre = Vec::new();
        if function.is_aggregate() && self.scope_kind != ScopeKind::Aggregate {
            pre.push(
                DiagnosticKind::AggregateNotAllowed(function.name().to_string()).with_span(span),
            );
        }
        if function.is_plugin() && self.scope_kind != ScopeKind::PlugIn {
            pre.push(
                DiagnosticKind::PluginNotAllowed(function.name().to_string()).with_span(span),
            );
        }

        // aggregate arguments bind in normal scope, so aggregates cannot
        // nest inside their own arguments
        let saved_kind = self.scope_kind;
        if function.is_aggregate() || function.is_plugin() {
            self.scope_kind = ScopeKind::Normal;
        }
        let mut args: Vec<ArgumentInfo> = Vec::with_capacity(args_ast.len() + 1);
        if let Some(ty) = self.implicit_argument_type.take() {
            args.push(ArgumentInfo::of_type(ty, span));
        }
        for arg in args_ast {
            let name = arg.name.as_ref().map(|i| i.name.clone());
            args.push(self.make_arg_info(&arg.value, name));
        }
        self.scope_kind = saved_kind;

        if args.iter().any(|a| a.ty.is_error()) {
            return SemanticInfo::error().with_symbol(Symbol::Function(function.clone()));
        }

        let mut info = self.bind_with_signatures(
            function.name(),
            function.signatures(),
            &args,
            function.named_arguments_allowed(),
            !function.is_builtin(),
            context,
            span,
        );
        for diagnostic in pre {
            info.diagnostics.push(diagnostic);
        }
        if let Some((result_type, expansion)) = self.maybe_expand(function, &args) {
            info.result_type = result_type;
            info.expansion = expansion;
        }
        info.referenced = Some(Symbol::Function(function.clone()));
        info.is_constant =
            function.constant_foldable() && !args.is_empty() && args.iter().all(|a| a.is_constant);
        info
    }

    /// Shared overload selection for functions and operators.
    #[allow(clippy::too_many_arguments)]
    fn bind_with_signatures(
        &mut self,
        name: &str,
        signatures: &[SignatureRef],
        args: &[ArgumentInfo],
        named_allowed: bool,
        user_defined: bool,
        context: CallContext,
        span: Span,
    ) -> SemanticInfo {
        let mut diagnostics = Vec::new();
        let (selected, result_type) = match matcher::best_matching(signatures, args) {
            MatchResult::Best(sig) => {
                matcher::check_signature(
                    name,
                    &sig,
                    args,
                    named_allowed,
                    user_defined,
                    span,
                    &mut diagnostics,
                );
                let ty = self.resolve_return_type(&sig, args, &context, span, &mut diagnostics);
                (Some(sig), ty)
            }
            MatchResult::Ambiguous(ties) => {
                // identical declared returns across the ties still give a
                // usable type; disagreement is an error
                let mut types = ties.iter().map(|sig| {
                    self.resolve_return_type(sig, args, &context, span, &mut Vec::new())
                });
                let first = types.next().unwrap_or(Type::Error);
                let ty = if types.all(|t| t == first) {
                    first
                } else {
                    diagnostics
                        .push(DiagnosticKind::AmbiguousCall(name.to_string()).with_span(span));
                    Type::Error
                };
                (ties.into_iter().next(), ty)
            }
            MatchResult::NoMatch(candidates) => match candidates.first().cloned() {
                Some(sig) => {
                    matcher::check_signature(
                        name,
                        &sig,
                        args,
                        named_allowed,
                        user_defined,
                        span,
                        &mut diagnostics,
                    );
                    if diagnostics.is_empty() {
                        diagnostics.push(
                            DiagnosticKind::WrongNumberOfArguments {
                                name: name.to_string(),
                                min: sig.min_args(),
                                max: sig.max_args(),
                                actual: args.len(),
                            }
                            .with_span(span),
                        );
                    }
                    (Some(sig), Type::Error)
                }
                None => (None, Type::Error),
            },
        };
        let _ = selected;
        let mut info = SemanticInfo::of_type(result_type);
        info.diagnostics = diagnostics;
        info
    }

    /// Expand a computed-return signature at this call site, unless its
    /// cached body facts already pin a fixed return type.
    fn maybe_expand(
        &mut self,
        function: &FunctionRef,
        args: &[ArgumentInfo],
    ) -> Option<(Type, Option<Arc<super::Expansion>>)> {
        let sig = function
            .signatures()
            .iter()
            .find(|s| matches!(s.return_kind(), ReturnTypeKind::Computed { .. }))?
            .clone();
        let ReturnTypeKind::Computed { body } = sig.return_kind() else {
            return None;
        };
        let expansion_args = self.expansion_args(&sig, args);
        let body = body.clone();
        match self.expand_body(function, &sig, &body, &expansion_args) {
            Some(expansion) => Some((expansion.result_type.clone(), Some(expansion))),
            // no expansion (cycle or parse failure): the cached fixed
            // return type from an earlier expansion, else best-effort
            // dynamic
            None => {
                let fallback = match sig.fixed_computed_return() {
                    Some(Some(ty)) => ty.clone(),
                    _ => Type::DYNAMIC,
                };
                Some((fallback, None))
            }
        }
    }

    fn expansion_args(
        &self,
        sig: &SignatureRef,
        args: &[ArgumentInfo],
    ) -> Vec<super::expand::ExpansionArg> {
        let map = matcher::map_args(sig, args);
        sig.parameters()
            .iter()
            .enumerate()
            .map(|(p, param)| {
                let arg = map
                    .iter()
                    .position(|m| *m == Some(p))
                    .and_then(|i| args.get(i));
                match arg {
                    Some(arg) => super::expand::ExpansionArg {
                        name: param.name.clone(),
                        ty: arg.ty.clone(),
                        is_constant: arg.is_constant,
                        value: arg.value.clone(),
                    },
                    None => super::expand::ExpansionArg {
                        name: param.name.clone(),
                        ty: param
                            .default_value
                            .as_ref()
                            .and_then(|v| v.scalar_kind())
                            .map(Type::Scalar)
                            .unwrap_or_else(|| super::declared_parameter_type(param)),
                        is_constant: param.default_value.is_some(),
                        value: param.default_value.clone(),
                    },
                }
            })
            .collect()
    }

    // ===== patterns =====

    fn bind_pattern_call(
        &mut self,
        pattern: &PatternRef,
        call: &CallExpr,
        path: Option<&Ident>,
        span: Span,
    ) -> SemanticInfo {
        let mut diagnostics = Vec::new();
        if call.args.len() != pattern.parameters().len() {
            diagnostics.push(
                DiagnosticKind::WrongNumberOfArguments {
                    name: pattern.name().to_string(),
                    min: pattern.parameters().len(),
                    max: pattern.parameters().len(),
                    actual: call.args.len(),
                }
                .with_span(span),
            );
        }
        let mut values = Vec::new();
        for (arg, (_, expected)) in call.args.iter().zip(pattern.parameters()) {
            let ty = self.bind_expr(&arg.value);
            let value = self
                .semantics
                .info(arg.value.id)
                .and_then(|i| i.constant_value.clone());
            match value {
                Some(value) => {
                    if ty != Type::Scalar(*expected) && !ty.assignable_to(&Type::Scalar(*expected))
                    {
                        diagnostics.push(
                            DiagnosticKind::TypeMismatch {
                                expected: expected.name().into(),
                                actual: ty.to_string(),
                            }
                            .with_span(arg.value.span),
                        );
                    }
                    values.push(value);
                }
                None => diagnostics
                    .push(DiagnosticKind::LiteralRequired.with_span(arg.value.span)),
            }
        }
        if !diagnostics.is_empty() {
            let mut info = SemanticInfo::error().with_symbol(Symbol::Pattern(pattern.clone()));
            info.diagnostics = diagnostics;
            return info;
        }

        let path_value = path.map(|i| DataValue::String(i.name.clone()));
        match pattern.find_match(&values, path_value.as_ref()) {
            Some(mapping) => {
                let body = mapping.body.clone();
                let constants: Vec<super::expand::ExpansionArg> = pattern
                    .parameters()
                    .iter()
                    .zip(&values)
                    .map(|((name, kind), value)| super::expand::ExpansionArg {
                        name: name.clone(),
                        ty: Type::Scalar(*kind),
                        is_constant: true,
                        value: Some(value.clone()),
                    })
                    .collect();
                let ty = self.bind_anonymous_body(&body, &constants);
                SemanticInfo::of_type(ty).with_symbol(Symbol::Pattern(pattern.clone()))
            }
            None => SemanticInfo::error()
                .with_symbol(Symbol::Pattern(pattern.clone()))
                .with_diagnostic(
                    DiagnosticKind::MissingPatternMatch(pattern.name().to_string())
                        .with_span(span),
                ),
        }
    }

    // ===== literal-shaped table expressions =====

    fn bind_datatable(
        &mut self,
        columns: &[(Ident, ScalarKind)],
        values: &[Expr],
    ) -> SemanticInfo {
        if columns.is_empty() {
            return SemanticInfo::error();
        }
        let mut info_diags = Vec::new();
        let table = columns
            .iter()
            .fold(TableSymbol::new(""), |t, (name, kind)| {
                t.column(name.name.clone(), *kind)
            })
            .into_ref();
        for (i, value) in values.iter().enumerate() {
            let ty = self.bind_expr(value);
            let (_, expected) = &columns[i % columns.len()];
            let target = Type::Scalar(*expected);
            let widened_ok = match (ty.scalar_kind(), *expected) {
                (Some(a), b) => a == b || a.widens_to(b) || b.widens_to(a) || b == ScalarKind::Dynamic || a == ScalarKind::Dynamic,
                _ => ty.is_error(),
            };
            if !widened_ok {
                info_diags.push(
                    DiagnosticKind::TypeMismatch {
                        expected: target.to_string(),
                        actual: ty.to_string(),
                    }
                    .with_span(value.span),
                );
            }
        }
        let mut info = SemanticInfo::of_type(Type::Table(table));
        info.diagnostics = info_diags;
        info
    }

    fn bind_range(&mut self, name: &Ident, from: &Expr, to: &Expr, step: &Expr) -> SemanticInfo {
        let from_ty = self.bind_expr(from);
        let to_ty = self.bind_expr(to);
        let step_ty = self.bind_expr(step);
        let mut diagnostics = Vec::new();
        let column_kind = match (
            from_ty.scalar_kind(),
            to_ty.scalar_kind(),
            step_ty.scalar_kind(),
        ) {
            (Some(ScalarKind::DateTime), _, _) => ScalarKind::DateTime,
            (Some(ScalarKind::Timespan), _, _) => ScalarKind::Timespan,
            (Some(a), Some(b), Some(c))
                if a.is_numeric() && b.is_numeric() && c.is_numeric() =>
            {
                // integral bounds produce long rows regardless of literal width
                match crate::types::widest_numeric([a, b, c]) {
                    Some(kind) if kind.is_integer() => ScalarKind::Long,
                    Some(kind) => kind,
                    None => ScalarKind::Long,
                }
            }
            _ => {
                if !from_ty.is_error() && !to_ty.is_error() && !step_ty.is_error() {
                    diagnostics.push(
                        DiagnosticKind::TypeMismatch {
                            expected: "a number, datetime or timespan".into(),
                            actual: from_ty.to_string(),
                        }
                        .with_span(from.span),
                    );
                }
                ScalarKind::Long
            }
        };
        let table = TableSymbol::new("")
            .column(name.name.clone(), column_kind)
            .into_ref();
        let mut info = SemanticInfo::of_type(Type::Table(table));
        info.diagnostics = diagnostics;
        info
    }

    fn bind_print(&mut self, items: &[crate::parser::Assignment]) -> SemanticInfo {
        let mut table = TableSymbol::new("");
        for (i, item) in items.iter().enumerate() {
            let ty = self.bind_expr(&item.value);
            let name = item
                .name
                .as_ref()
                .map(|n| n.name.clone())
                .or_else(|| self.derived_column_name(&item.value))
                .unwrap_or_else(|| format!("print_{i}"));
            let kind = ty.scalar_kind().unwrap_or(ScalarKind::Dynamic);
            table = table.column(name, kind);
        }
        SemanticInfo::of_type(Type::Table(table.into_ref()))
    }

    // ===== argument plumbing =====

    pub(super) fn make_arg_info(&mut self, expr: &Expr, name: Option<String>) -> ArgumentInfo {
        if matches!(expr.kind, ExprKind::Star) {
            self.set_info(expr.id, SemanticInfo::of_type(Type::Void));
            let mut info = ArgumentInfo::of_type(Type::Void, expr.span);
            info.is_star = true;
            info.name = name;
            return info;
        }
        let ty = self.bind_expr(expr);
        let semantic = self.semantics.info(expr.id);
        let mut info = ArgumentInfo::of_type(ty, expr.span);
        info.name = name;
        info.is_constant = semantic.is_some_and(|i| i.is_constant);
        info.value = semantic.and_then(|i| i.constant_value.clone());
        info.is_column = matches!(
            semantic.and_then(|i| i.referenced.as_ref()),
            Some(Symbol::Column(_))
        );
        info.is_literal = matches!(expr.kind, ExprKind::Literal(_))
            || matches!(
                &expr.kind,
                ExprKind::Unary { op: UnaryOp::Minus, operand }
                    if matches!(operand.kind, ExprKind::Literal(_))
            );
        if let ExprKind::TypeOf(type_expr) = &expr.kind {
            info.type_literal = Some(type_expr_to_type(type_expr));
        }
        info
    }

    /// The output column name an expression produces in projection-like
    /// positions, when one can be derived.
    pub(super) fn derived_column_name(&self, expr: &Expr) -> Option<String> {
        match &expr.kind {
            ExprKind::Name(ident) => Some(ident.name.clone()),
            ExprKind::Path { name, .. } => Some(name.name.clone()),
            ExprKind::Paren(inner) => self.derived_column_name(inner),
            ExprKind::Call(call) => {
                let Some(Symbol::Function(function)) =
                    self.semantics.referenced_symbol_of(expr.id)
                else {
                    return None;
                };
                let first_arg = call
                    .args
                    .first()
                    .and_then(|arg| self.derived_column_name(&arg.value));
                match function.result_name_kind() {
                    ResultNameKind::None => None,
                    ResultNameKind::PrefixOnly => {
                        function.result_name_prefix().map(|p| format!("{p}_"))
                    }
                    ResultNameKind::PrefixAndFirstArgument => {
                        let prefix = function.result_name_prefix()?;
                        Some(match first_arg {
                            Some(arg) => format!("{prefix}_{arg}"),
                            None => format!("{prefix}_"),
                        })
                    }
                    ResultNameKind::FirstArgument | ResultNameKind::OnlyArgument => first_arg,
                }
            }
            _ => None,
        }
    }
}

fn bind_literal(literal: &Literal) -> SemanticInfo {
    SemanticInfo::of_type(Type::Scalar(literal.scalar_kind())).constant(Some(literal.to_value()))
}

pub(super) fn type_expr_to_type(type_expr: &TypeExpr) -> Type {
    match type_expr {
        TypeExpr::Scalar(kind) => Type::Scalar(*kind),
        TypeExpr::Table(columns) => Type::Table(
            columns
                .iter()
                .fold(TableSymbol::new(""), |t, (n, k)| t.column(n.clone(), *k))
                .into_ref(),
        ),
        TypeExpr::OpenTable => Type::Table(TableSymbol::new("").open().into_ref()),
    }
}

fn binary_operator_kind(op: BinaryOp) -> OperatorKind {
    match op {
        BinaryOp::Add => OperatorKind::Add,
        BinaryOp::Subtract => OperatorKind::Subtract,
        BinaryOp::Multiply => OperatorKind::Multiply,
        BinaryOp::Divide => OperatorKind::Divide,
        BinaryOp::Modulo => OperatorKind::Modulo,
        BinaryOp::Equal => OperatorKind::Equal,
        BinaryOp::NotEqual => OperatorKind::NotEqual,
        BinaryOp::Less => OperatorKind::Less,
        BinaryOp::LessOrEqual => OperatorKind::LessOrEqual,
        BinaryOp::Greater => OperatorKind::Greater,
        BinaryOp::GreaterOrEqual => OperatorKind::GreaterOrEqual,
        BinaryOp::EqualTilde => OperatorKind::EqualTilde,
        BinaryOp::BangTilde => OperatorKind::BangTilde,
        BinaryOp::MatchRegex => OperatorKind::MatchRegex,
        BinaryOp::Contains => OperatorKind::Contains,
        BinaryOp::NotContains => OperatorKind::NotContains,
        BinaryOp::ContainsCs => OperatorKind::ContainsCs,
        BinaryOp::NotContainsCs => OperatorKind::NotContainsCs,
        BinaryOp::StartsWith => OperatorKind::StartsWith,
        BinaryOp::NotStartsWith => OperatorKind::NotStartsWith,
        BinaryOp::StartsWithCs => OperatorKind::StartsWithCs,
        BinaryOp::NotStartsWithCs => OperatorKind::NotStartsWithCs,
        BinaryOp::EndsWith => OperatorKind::EndsWith,
        BinaryOp::NotEndsWith => OperatorKind::NotEndsWith,
        BinaryOp::EndsWithCs => OperatorKind::EndsWithCs,
        BinaryOp::NotEndsWithCs => OperatorKind::NotEndsWithCs,
        BinaryOp::Has => OperatorKind::Has,
        BinaryOp::NotHas => OperatorKind::NotHas,
        BinaryOp::HasCs => OperatorKind::HasCs,
        BinaryOp::NotHasCs => OperatorKind::NotHasCs,
        BinaryOp::HasPrefix => OperatorKind::HasPrefix,
        BinaryOp::NotHasPrefix => OperatorKind::NotHasPrefix,
        BinaryOp::HasSuffix => OperatorKind::HasSuffix,
        BinaryOp::NotHasSuffix => OperatorKind::NotHasSuffix,
        BinaryOp::Like => OperatorKind::Like,
        BinaryOp::NotLike => OperatorKind::NotLike,
        BinaryOp::LikeCs => OperatorKind::LikeCs,
        BinaryOp::NotLikeCs => OperatorKind::NotLikeCs,
        BinaryOp::And => OperatorKind::And,
        BinaryOp::Or => OperatorKind::Or,
    }
}
