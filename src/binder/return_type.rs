// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Resolution of a selected signature's return type.

use super::error::{Diagnostic, DiagnosticKind};
use super::matcher::{self, ArgumentInfo};
use super::Binder;
use crate::catalog::{
    ClusterRef, CustomReturnArgs, DatabaseRef, ReturnTypeKind, Signature, Type,
};
use crate::parser::Span;
use crate::types::{widest_numeric, DataValue};

/// The catalog entities a call resolves names against: the dotted path's
/// cluster/database when present, the binder's current ones otherwise.
#[derive(Clone)]
pub(super) struct CallContext {
    pub cluster: ClusterRef,
    pub database: DatabaseRef,
}

impl Binder {
    pub(super) fn call_context(&self) -> CallContext {
        CallContext {
            cluster: self.current_cluster.clone(),
            database: self.current_database.clone(),
        }
    }

    /// Resolve every return kind except `Computed`, which the caller routes
    /// through inline expansion.
    pub(super) fn resolve_return_type(
        &mut self,
        sig: &Signature,
        args: &[ArgumentInfo],
        context: &CallContext,
        call_span: Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Type {
        let map = matcher::map_args(sig, args);
        let arg_for_param = |p: usize| -> Option<&ArgumentInfo> {
            map.iter()
                .position(|m| *m == Some(p))
                .and_then(|i| args.get(i))
        };
        match sig.return_kind() {
            ReturnTypeKind::Declared(ty) => ty.clone(),
            ReturnTypeKind::Computed { .. } => Type::Error,
            ReturnTypeKind::Parameter0 => param_type(arg_for_param(0)),
            ReturnTypeKind::Parameter1 => param_type(arg_for_param(1)),
            ReturnTypeKind::Parameter2 => param_type(arg_for_param(2)),
            ReturnTypeKind::ParameterN => {
                let last = sig.parameters().len().saturating_sub(1);
                // a repeatable tail maps several arguments; the final one wins
                let ty = args
                    .iter()
                    .enumerate()
                    .rev()
                    .find(|(i, _)| map.get(*i).copied().flatten() == Some(last))
                    .map(|(_, arg)| arg.ty.clone());
                ty.unwrap_or(Type::Error)
            }
            ReturnTypeKind::ParameterNLiteral => {
                match args.last().and_then(|arg| arg.type_literal.clone()) {
                    Some(ty) => ty,
                    None => {
                        diagnostics.push(
                            DiagnosticKind::InvalidTypeExpression.with_span(call_span),
                        );
                        Type::Error
                    }
                }
            }
            ReturnTypeKind::Parameter0Promoted => match param_type(arg_for_param(0)) {
                Type::Scalar(kind) => Type::Scalar(kind.promoted()),
                other => other,
            },
            ReturnTypeKind::Common => {
                let common = matcher::common_type_for(sig, args, &map);
                common.map(Type::Scalar).unwrap_or(Type::Error)
            }
            ReturnTypeKind::Widest => {
                let widest = widest_numeric(args.iter().filter_map(|a| a.ty.scalar_kind()));
                widest.map(Type::Scalar).unwrap_or(Type::Error)
            }
            ReturnTypeKind::Parameter0Cluster => {
                self.note_body_fact(|facts| facts.uses_cluster = true);
                match literal_string(arg_for_param(0)) {
                    Some(name) => match self.catalog.cluster_by_name(&name) {
                        Some(cluster) => Type::Cluster(cluster.clone()),
                        // unknown clusters synthesize open ones: the binder
                        // stays total over names outside the snapshot
                        None => Type::Cluster(self.open.open_cluster(&name)),
                    },
                    None => Type::Error,
                }
            }
            ReturnTypeKind::Parameter0Database => {
                self.note_body_fact(|facts| facts.uses_database = true);
                match literal_string(arg_for_param(0)) {
                    Some(name) => match context.cluster.database_by_name(&name) {
                        Some(database) => Type::Database(database.clone()),
                        None if context.cluster.is_open() => {
                            let cluster = context.cluster.clone();
                            Type::Database(self.open.open_database(&cluster, &name))
                        }
                        None => {
                            diagnostics.push(
                                DiagnosticKind::NameNotDefined(name).with_span(call_span),
                            );
                            Type::Error
                        }
                    },
                    // `database()` with no argument is the context database
                    None if args.is_empty() => Type::Database(context.database.clone()),
                    None => Type::Error,
                }
            }
            ReturnTypeKind::Parameter0Table => {
                match literal_string(arg_for_param(0)) {
                    Some(name) => match context.database.table_by_name(&name) {
                        Some(table) => Type::Table(table.clone()),
                        None if context.database.is_open() => {
                            let database = context.database.clone();
                            Type::Table(self.open.open_table(&database, &name))
                        }
                        None => {
                            diagnostics.push(
                                DiagnosticKind::NameNotDefined(name).with_span(call_span),
                            );
                            Type::Error
                        }
                    },
                    None => {
                        diagnostics.push(
                            DiagnosticKind::NonEmptyLiteralRequired.with_span(call_span),
                        );
                        Type::Error
                    }
                }
            }
            ReturnTypeKind::Custom(custom) => {
                let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
                let arg_values: Vec<Option<DataValue>> =
                    args.iter().map(|a| a.value.clone()).collect();
                let scope = self.row_scope.clone();
                custom(&CustomReturnArgs {
                    arg_types: &arg_types,
                    arg_values: &arg_values,
                    row_scope: scope.as_ref(),
                })
            }
        }
    }
}

fn param_type(arg: Option<&ArgumentInfo>) -> Type {
    arg.map(|a| a.ty.clone()).unwrap_or(Type::Error)
}

fn literal_string(arg: Option<&ArgumentInfo>) -> Option<String> {
    match arg?.value.as_ref()? {
        DataValue::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
