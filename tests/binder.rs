// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! End-to-end binding scenarios over the public entry points.

use std::sync::Arc;

use lucent::binder::{Binder, DiagnosticKind, SemanticModel};
use lucent::catalog::{Catalog, TableSymbol, Type};
use lucent::parser::{parse_query, QueryBlock};
use lucent::types::ScalarKind;

fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .table(TableSymbol::new("T").column("c", ScalarKind::Int))
            .table(
                TableSymbol::new("U")
                    .column("x", ScalarKind::Long)
                    .column("s", ScalarKind::String),
            )
            .table(TableSymbol::new("OpenT").open())
            .build(),
    )
}

fn bind(src: &str) -> (QueryBlock, SemanticModel) {
    let block = parse_query(src).expect("the query should parse");
    let model = Binder::bind(&block, catalog());
    (block, model)
}

fn last_type(block: &QueryBlock, model: &SemanticModel) -> Type {
    let last = block.statements.last().expect("at least one statement");
    model.result_type_of(last.id)
}

fn table_schema(ty: &Type) -> Vec<(String, String)> {
    match ty {
        Type::Table(table) => table
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.ty().to_string()))
            .collect(),
        other => panic!("expected a table, got {other}"),
    }
}

#[test]
fn where_preserves_row_scope() {
    let (block, model) = bind("T | where c * c >= 2");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    assert_eq!(table_schema(&ty), vec![("c".to_string(), "int".to_string())]);
}

#[test]
fn range_extend_summarize_chain() {
    let (block, model) = bind(
        "range x from 1 to 10 step 1 \
         | extend Text = '1234567890' \
         | summarize Total = sum(estimate_data_size(*))",
    );
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    assert_eq!(
        table_schema(&ty),
        vec![("Total".to_string(), "long".to_string())]
    );
}

#[test]
fn datatable_as_introduces_local_symbol() {
    let (block, model) = bind("datatable (c:int) [-1, 0, 1, 2, 3] | as Result; Result | count");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    // the first statement's row scope is the declared schema
    let first = model.result_type_of(block.statements[0].id);
    assert_eq!(
        table_schema(&first),
        vec![("c".to_string(), "int".to_string())]
    );
    // Result resolves downstream
    let last = last_type(&block, &model);
    assert_eq!(
        table_schema(&last),
        vec![("Count".to_string(), "long".to_string())]
    );
}

#[test]
fn duplicate_let_names_are_ambiguous() {
    let (_, model) = bind("let v = 1; let v = 2; print y = v");
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::AmbiguousName(_))));
}

#[test]
fn open_table_infers_dynamic_columns() {
    let (block, model) = bind("OpenT | where foo == 1");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    let schema = table_schema(&ty);
    assert!(
        schema.contains(&("foo".to_string(), "dynamic".to_string())),
        "row scope should grow to include the inferred column: {schema:?}"
    );
}

#[test]
fn unknown_names_are_diagnosed_not_thrown() {
    let (block, model) = bind("T | where nosuch > 1");
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(&d.kind, DiagnosticKind::NameNotDefined(n) if n == "nosuch")));
    // the operator still produces a best-effort row scope
    let ty = last_type(&block, &model);
    assert!(matches!(ty, Type::Table(_)));
}

#[test]
fn error_types_do_not_cascade() {
    let (_, model) = bind("T | where nosuch * 2 > 1");
    // one root-cause diagnostic, no follow-on operator complaints
    assert_eq!(model.diagnostics().len(), 1, "{:?}", model.diagnostics());
}

#[test]
fn comparison_needs_comparable_types() {
    let (_, model) = bind("U | where s > 5");
    assert!(!model.diagnostics().is_empty());
}

#[test]
fn where_predicate_must_be_bool() {
    let (_, model) = bind("T | where c + 1");
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(&d.kind, DiagnosticKind::TypeMismatch { expected, .. } if expected == "bool")));
}

#[test]
fn bare_function_name_requires_argument_list() {
    let (_, model) = bind("print strlen");
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::NameRequiresArgumentList(_))));
}

#[test]
fn zero_argument_functions_invoke_without_parens() {
    let (block, model) = bind("print now");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    assert_eq!(
        table_schema(&ty),
        vec![("now".to_string(), "datetime".to_string())]
    );
}

#[test]
fn aggregates_outside_summarize_are_rejected() {
    let (_, model) = bind("T | where sum(c) > 1");
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::AggregateNotAllowed(_))));
}

#[test]
fn dotted_paths_reach_open_entities() {
    let (block, model) = bind("cluster('remote').database('db').T2 | where z == 1");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    let schema = table_schema(&ty);
    assert!(schema.contains(&("z".to_string(), "dynamic".to_string())));
}

#[test]
fn table_function_resolves_in_current_database() {
    let (block, model) = bind("table('U') | count");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    assert_eq!(
        table_schema(&ty),
        vec![("Count".to_string(), "long".to_string())]
    );
}

#[test]
fn let_bound_table_is_usable_as_source() {
    let (block, model) = bind("let Src = T; Src | where c == 1");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    assert_eq!(table_schema(&ty), vec![("c".to_string(), "int".to_string())]);
}

#[test]
fn constants_fold_through_let() {
    let (block, model) = bind("let limit = 10; T | take limit");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let _ = block;
}

#[test]
fn row_scope_at_matches_full_bind() {
    let src = "T | where c == 1 | project c";
    let block = parse_query(src).unwrap();
    let offset = src.find("c == 1").unwrap() as u32;
    let scope = Binder::row_scope_at(&block, offset, catalog(), Default::default())
        .expect("a row scope inside the pipe");
    assert_eq!(scope.columns().len(), 1);
    assert_eq!(scope.columns()[0].name(), "c");
}

#[test]
fn symbols_in_scope_sees_columns_and_functions() {
    use lucent::catalog::{FunctionKinds, SymbolMatch};
    let src = "T | where c == 1";
    let block = parse_query(src).unwrap();
    let offset = src.find('c').unwrap() as u32 + 1;
    let symbols = Binder::symbols_in_scope(
        &block,
        offset,
        catalog(),
        SymbolMatch::ANY,
        FunctionKinds::ALL,
        Default::default(),
    );
    let names: Vec<&str> = symbols.iter().map(|s| s.name()).collect();
    assert!(names.contains(&"c"), "columns in scope: {names:?}");
    assert!(names.contains(&"T"), "tables in scope: {names:?}");
    assert!(names.contains(&"strcat"), "built-ins in scope: {names:?}");
}

#[test]
fn search_output_prefixes_source_table_column() {
    let (block, model) = bind("U | search 'needle'");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    let schema = table_schema(&ty);
    assert_eq!(schema[0].0, "$table");
    assert!(schema.contains(&("x".to_string(), "long".to_string())));
    assert!(schema.contains(&("s".to_string(), "string".to_string())));
}

#[test]
fn find_output_prefixes_source_column() {
    let (block, model) = bind("find in (T, U) where c == 1 or x == 2");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let ty = last_type(&block, &model);
    let schema = table_schema(&ty);
    assert_eq!(schema[0].0, "source_");
    assert!(schema.contains(&("c".to_string(), "int".to_string())));
}

#[test]
fn sibling_database_resolves_by_bare_name() {
    use lucent::catalog::DatabaseSymbol;
    let catalog = Arc::new(
        Catalog::builder()
            .table(TableSymbol::new("T").column("c", ScalarKind::Int))
            .database(
                DatabaseSymbol::new("Archive")
                    .table(TableSymbol::new("Events").column("id", ScalarKind::Long)),
            )
            .build(),
    );
    let block = parse_query("Archive.Events | count").unwrap();
    let model = Binder::bind(&block, catalog);
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let last = block.statements.last().unwrap();
    assert_eq!(
        table_schema(&model.result_type_of(last.id)),
        vec![("Count".to_string(), "long".to_string())]
    );
}

#[test]
fn zero_arg_function_wins_over_same_named_table() {
    use lucent::catalog::{FunctionSymbol, ReturnTypeKind, Signature};
    let catalog = Arc::new(
        Catalog::builder()
            .table(TableSymbol::new("T").column("a", ScalarKind::Long))
            .table(TableSymbol::new("Snapshot").column("stale", ScalarKind::Bool))
            .function(FunctionSymbol::new(
                "Snapshot",
                vec![Signature::new(
                    ReturnTypeKind::Computed {
                        body: "{ T | project a }".into(),
                    },
                    vec![],
                )],
            ))
            .build(),
    );
    let block = parse_query("Snapshot | where a > 0").unwrap();
    let model = Binder::bind(&block, catalog);
    // the zero-argument function outranks the table; no ambiguity
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let last = block.statements.last().unwrap();
    assert_eq!(
        table_schema(&model.result_type_of(last.id)),
        vec![("a".to_string(), "long".to_string())]
    );
}

#[test]
fn cancellation_stops_early_without_panicking() {
    use lucent::binder::{BindOptions, CancellationToken};
    let block = parse_query("T | where c == 1 | project c").unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let model = Binder::bind_with(
        &block,
        catalog(),
        BindOptions {
            cancellation: token,
            global_cache: None,
        },
    );
    // partial info only: the statement was never bound
    let last = block.statements.last().unwrap();
    assert!(model.info(last.id).is_none());
}
