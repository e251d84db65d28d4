// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Inline expansion of user-defined and database functions, and pattern
//! invocation.

use std::sync::Arc;

use lucent::binder::{Binder, DiagnosticKind, SemanticModel};
use lucent::catalog::{Catalog, FunctionSymbol, ReturnTypeKind, Signature, TableSymbol, Type};
use lucent::parser::{parse_query, ExprKind, QueryBlock, StatementKind};
use lucent::types::ScalarKind;

fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .table(
                TableSymbol::new("T")
                    .column("a", ScalarKind::Long)
                    .column("c", ScalarKind::String),
            )
            .table(
                TableSymbol::new("T2")
                    .column("a", ScalarKind::Long)
                    .column("d", ScalarKind::Real),
            )
            .function(FunctionSymbol::new(
                "Rec",
                vec![Signature::new(
                    ReturnTypeKind::Computed {
                        body: "{ Rec() }".into(),
                    },
                    vec![],
                )],
            ))
            .function(FunctionSymbol::new(
                "Ping",
                vec![Signature::new(
                    ReturnTypeKind::Computed {
                        body: "{ Pong() }".into(),
                    },
                    vec![],
                )],
            ))
            .function(FunctionSymbol::new(
                "Pong",
                vec![Signature::new(
                    ReturnTypeKind::Computed {
                        body: "{ Ping() }".into(),
                    },
                    vec![],
                )],
            ))
            .function(FunctionSymbol::new(
                "TopA",
                vec![Signature::new(
                    ReturnTypeKind::Computed {
                        body: "{ T | project a }".into(),
                    },
                    vec![],
                )],
            ))
            .build(),
    )
}

fn bind(src: &str) -> (QueryBlock, SemanticModel) {
    let block = parse_query(src).expect("the query should parse");
    let model = Binder::bind(&block, catalog());
    (block, model)
}

fn last_schema(block: &QueryBlock, model: &SemanticModel) -> Vec<(String, String)> {
    let last = block.statements.last().unwrap();
    match model.result_type_of(last.id) {
        Type::Table(table) => table
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.ty().to_string()))
            .collect(),
        other => panic!("expected a table, got {other}"),
    }
}

#[test]
fn tabular_parameter_binds_to_the_actual_argument() {
    let (block, model) = bind("let f = (t:(a:long)) { t | project a, b = a + 1 }; f(T)");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(
        last_schema(&block, &model),
        vec![
            ("a".to_string(), "long".to_string()),
            ("b".to_string(), "long".to_string()),
        ]
    );
}

#[test]
fn distinct_argument_schemas_expand_separately() {
    // the body's schema depends on the argument: T leaves c, T2 leaves d
    let (block, model) = bind("let f = (t:(a:long)) { t | project-away a }; f(T)");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(
        last_schema(&block, &model),
        vec![("c".to_string(), "string".to_string())]
    );

    let (block, model) = bind("let f = (t:(a:long)) { t | project-away a }; f(T2)");
    assert_eq!(
        last_schema(&block, &model),
        vec![("d".to_string(), "real".to_string())]
    );
}

#[test]
fn identical_call_sites_share_one_expansion() {
    let (block, model) = bind("let f = (x:long) { x + 1 }; print a = f(1), b = f(1), c = f(2)");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let StatementKind::Query(expr) = &block.statements[1].kind else {
        panic!("expected the print statement");
    };
    let ExprKind::Print { items } = &expr.kind else {
        panic!("expected print");
    };
    let expansions: Vec<_> = items
        .iter()
        .map(|item| {
            model
                .expansion_of(item.value.id)
                .expect("calls to computed functions carry expansions")
                .clone()
        })
        .collect();
    assert!(
        Arc::ptr_eq(&expansions[0], &expansions[1]),
        "same fingerprint must share the expansion"
    );
    assert!(
        !Arc::ptr_eq(&expansions[0], &expansions[2]),
        "a different constant is a different fingerprint"
    );
}

#[test]
fn scalar_bodies_compute_scalar_returns() {
    let (block, model) = bind("let f = (x:long) { x * 10 }; T | extend big = f(a)");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let schema = last_schema(&block, &model);
    assert!(schema.contains(&("big".to_string(), "long".to_string())));
}

#[test]
fn self_recursion_terminates_with_best_effort_type() {
    let (block, model) = bind("print r = Rec()");
    // the inner probe returns no expansion; the outer still yields a type
    let last = block.statements.last().unwrap();
    assert!(matches!(model.result_type_of(last.id), Type::Table(_)));
    let _ = model.diagnostics();
}

#[test]
fn mutual_recursion_terminates() {
    let (block, model) = bind("print r = Ping()");
    let last = block.statements.last().unwrap();
    assert!(matches!(model.result_type_of(last.id), Type::Table(_)));
}

#[test]
fn database_function_bodies_bind_in_their_database() {
    let (block, model) = bind("TopA() | where a > 0");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(
        last_schema(&block, &model),
        vec![("a".to_string(), "long".to_string())]
    );
}

#[test]
fn computed_return_type_entry_point() {
    let catalog = catalog();
    let function = catalog
        .default_database()
        .function_by_name("TopA")
        .unwrap()
        .clone();
    let ty = Binder::computed_return_type(&function, catalog.clone());
    let Type::Table(table) = ty else {
        panic!("expected a tabular return");
    };
    assert_eq!(table.columns().len(), 1);
    assert_eq!(table.columns()[0].name(), "a");
}

#[test]
fn named_arguments_route_to_parameters() {
    let (block, model) =
        bind("let f = (a:long, b:string) { strcat(b, tostring(a)) }; print r = f(1, b='x')");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let schema = last_schema(&block, &model);
    assert_eq!(schema, vec![("r".to_string(), "string".to_string())]);
}

#[test]
fn unnamed_after_out_of_order_named_is_diagnosed() {
    let (_, model) = bind("let f = (a:long, b:string) { strcat(b, tostring(a)) }; print r = f(b='x', 1)");
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::UnnamedArgumentAfterOutOfOrder)));
}

#[test]
fn named_arguments_are_rejected_for_builtins() {
    let (_, model) = bind("print r = strcat(arg='a')");
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::NamedArgumentsNotSupported(_))));
}

#[test]
fn default_parameter_values_fill_missing_arguments() {
    let (block, model) = bind("let f = (x:long, pad:long = 3) { x * pad }; print r = f(2)");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(
        last_schema(&block, &model),
        vec![("r".to_string(), "long".to_string())]
    );
}

#[test]
fn broken_function_bodies_are_contained() {
    let (block, model) = bind("let f = (x:long) { | | }; print r = f(1)");
    // the parse failure is swallowed; the call falls back without panicking
    let last = block.statements.last().unwrap();
    assert!(matches!(model.result_type_of(last.id), Type::Table(_)));
}

#[test]
fn patterns_select_bodies_by_literal_values() {
    let src = "declare pattern app = (name:string)[scope] {\
                   ('a') = { datatable (x:long) [1] };\
                   ('b').('s') = { datatable (y:string) ['h'] };\
               };\
               app('a') | count";
    let (block, model) = bind(src);
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(
        last_schema(&block, &model),
        vec![("Count".to_string(), "long".to_string())]
    );
}

#[test]
fn patterns_match_path_values() {
    let src = "declare pattern app = (name:string)[scope] {\
                   ('a') = { datatable (x:long) [1] };\
                   ('b').('s') = { datatable (y:string) ['h'] };\
               };\
               app('b').s";
    let (block, model) = bind(src);
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(
        last_schema(&block, &model),
        vec![("y".to_string(), "string".to_string())]
    );
}

#[test]
fn missing_pattern_mapping_is_diagnosed() {
    let src = "declare pattern app = (name:string) {\
                   ('a') = { datatable (x:long) [1] };\
               };\
               app('zz')";
    let (_, model) = bind(src);
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::MissingPatternMatch(_))));
}

#[test]
fn pattern_arguments_must_be_literals() {
    let src = "declare pattern app = (name:string) {\
                   ('a') = { datatable (x:long) [1] };\
               };\
               T | extend v = app(c)";
    let (_, model) = bind(src);
    assert!(model
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::LiteralRequired)));
}
