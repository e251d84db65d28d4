// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Row-scope transformations of the individual query operators.

use std::sync::Arc;

use lucent::binder::{Binder, DiagnosticKind, SemanticModel};
use lucent::catalog::{Catalog, TableSymbol, Type};
use lucent::parser::{parse_query, QueryBlock};
use lucent::types::ScalarKind;

fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .table(
                TableSymbol::new("T")
                    .column("x", ScalarKind::Long)
                    .column("s", ScalarKind::String)
                    .column("d", ScalarKind::Dynamic),
            )
            .table(
                TableSymbol::new("U")
                    .column("x", ScalarKind::Long)
                    .column("u", ScalarKind::Real),
            )
            .table(
                TableSymbol::new("V")
                    .column("x", ScalarKind::Long)
                    .column("s", ScalarKind::Bool),
            )
            .build(),
    )
}

fn bind(src: &str) -> (QueryBlock, SemanticModel) {
    let block = parse_query(src).expect("the query should parse");
    let model = Binder::bind(&block, catalog());
    (block, model)
}

fn schema(src: &str) -> Vec<(String, String)> {
    let (block, model) = bind(src);
    let diags = model.diagnostics();
    assert!(diags.is_empty(), "unexpected diagnostics for {src:?}: {diags:?}");
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

fn diagnostics_of(src: &str) -> Vec<DiagnosticKind> {
    let (_, model) = bind(src);
    model.diagnostics().iter().map(|d| d.kind.clone()).collect()
}

fn cols(schema: &[(String, String)]) -> Vec<&str> {
    schema.iter().map(|(n, _)| n.as_str()).collect()
}

#[test]
fn project_builds_a_fresh_scope() {
    assert_eq!(
        schema("T | project s, doubled = x * 2"),
        vec![
            ("s".to_string(), "string".to_string()),
            ("doubled".to_string(), "long".to_string()),
        ]
    );
}

#[test]
fn project_star_re_emits_all_columns() {
    assert_eq!(cols(&schema("T | project *")), vec!["x", "s", "d"]);
}

#[test]
fn project_duplicate_names_are_diagnosed() {
    assert!(diagnostics_of("T | project a = x, a = s")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::DuplicateColumnDeclaration(_))));
}

#[test]
fn extend_replaces_same_name_columns() {
    let schema = schema("T | extend s = 1");
    assert_eq!(cols(&schema), vec!["x", "s", "d"]);
    assert_eq!(schema[1].1, "long");
}

#[test]
fn project_away_and_keep_honor_wildcards() {
    assert_eq!(cols(&schema("T | project-away s")), vec!["x", "d"]);
    assert_eq!(cols(&schema("T | project-keep s, d")), vec!["s", "d"]);
    assert_eq!(cols(&schema("T | project-away x*")), vec!["s", "d"]);
}

#[test]
fn project_rename_moves_names() {
    let schema = schema("T | project-rename value = x");
    assert_eq!(cols(&schema), vec!["value", "s", "d"]);
    assert!(diagnostics_of("T | project-rename y = missing")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::NameNotDefined(_))));
}

#[test]
fn project_reorder_moves_matches_to_front() {
    assert_eq!(cols(&schema("T | project-reorder d, s")), vec!["d", "s", "x"]);
}

#[test]
fn summarize_combines_by_and_aggregates() {
    assert_eq!(
        schema("T | summarize Total = sum(x), count() by s"),
        vec![
            ("s".to_string(), "string".to_string()),
            ("Total".to_string(), "long".to_string()),
            ("count_".to_string(), "long".to_string()),
        ]
    );
}

#[test]
fn summarize_derives_aggregate_names() {
    assert_eq!(
        schema("T | summarize sum(x) by s"),
        vec![
            ("s".to_string(), "string".to_string()),
            ("sum_x".to_string(), "long".to_string()),
        ]
    );
}

#[test]
fn distinct_projects_the_listed_columns() {
    assert_eq!(cols(&schema("T | distinct s")), vec!["s"]);
    assert_eq!(cols(&schema("T | distinct *")), vec!["x", "s", "d"]);
}

#[test]
fn count_yields_a_single_long() {
    assert_eq!(
        schema("T | count"),
        vec![("Count".to_string(), "long".to_string())]
    );
}

#[test]
fn take_requires_an_integer() {
    assert!(diagnostics_of("T | take 'ten'")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::TypeMismatch { .. })));
}

#[test]
fn join_merges_and_uniquifies() {
    // x is the equality key and stays single; u comes from the right
    assert_eq!(
        cols(&schema("T | join kind=inner (U) on x")),
        vec!["x", "s", "d", "u"]
    );
}

#[test]
fn join_without_on_is_diagnosed() {
    assert!(diagnostics_of("T | join kind=inner (U)")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::MissingJoinOn)));
}

#[test]
fn join_kind_is_validated() {
    assert!(diagnostics_of("T | join kind=sideways (U) on x")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::InvalidJoinKind(_))));
}

#[test]
fn semi_joins_keep_one_side() {
    assert_eq!(cols(&schema("T | join kind=leftsemi (U) on x")), vec!["x", "s", "d"]);
    assert_eq!(cols(&schema("T | join kind=rightsemi (U) on x")), vec!["x", "u"]);
}

#[test]
fn join_on_requires_both_sides() {
    assert!(diagnostics_of("T | join kind=inner (U) on s")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::JoinColumnNotOnBothSides(_))));
}

#[test]
fn dollar_left_and_right_resolve_in_join_on() {
    let schema = schema("T | join kind=inner (U) on $left.x == $right.x");
    assert!(cols(&schema).contains(&"u"));
}

#[test]
fn union_outer_splits_conflicting_types() {
    // T.s is string, V.s is bool: name-and-type unification splits them
    let schema = schema("T | union V");
    let names = cols(&schema);
    assert!(names.contains(&"x"));
    assert!(names.contains(&"s_string"));
    assert!(names.contains(&"s_bool"));
}

#[test]
fn union_inner_intersects() {
    assert_eq!(cols(&schema("T | union kind=inner V")), vec!["x", "s"]);
}

#[test]
fn union_withsource_prepends_column() {
    assert_eq!(cols(&schema("T | union withsource=Origin U"))[0], "Origin");
}

#[test]
fn mv_expand_retypes_the_expanded_column() {
    let schema1 = schema("T | mv-expand d to typeof(long)");
    assert!(schema1.contains(&("d".to_string(), "long".to_string())));
    let schema2 = schema("T | mv-expand d");
    assert!(schema2.contains(&("d".to_string(), "dynamic".to_string())));
}

#[test]
fn mv_expand_requires_dynamic_input() {
    assert!(diagnostics_of("T | mv-expand s")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::TypeMismatch { .. })));
}

#[test]
fn mv_apply_runs_a_subquery_over_the_expansion() {
    let schema = schema("T | mv-apply d to typeof(long) on (summarize Inner = sum(d))");
    assert_eq!(cols(&schema), vec!["x", "s", "Inner"]);
}

#[test]
fn make_series_checks_default_against_the_series_type() {
    assert!(diagnostics_of(
        "T | make-series Total = sum(x) default = 'zero' on x from 1 to 10 step 1 by s"
    )
    .iter()
    .any(|d| matches!(d, DiagnosticKind::TypeMismatch { .. })));
    assert!(diagnostics_of(
        "T | make-series Total = sum(x) default = 0 on x from 1 to 10 step 1 by s"
    )
    .is_empty());
}

#[test]
fn make_series_produces_series_and_axis() {
    let schema = schema("T | make-series Total = sum(x) on x from 1 to 10 step 1 by s");
    assert_eq!(
        schema,
        vec![
            ("s".to_string(), "string".to_string()),
            ("Total".to_string(), "dynamic".to_string()),
            ("x".to_string(), "dynamic".to_string()),
        ]
    );
}

#[test]
fn parse_extends_with_pattern_columns() {
    let schema = schema("T | parse s with 'err=' Code:long ' at ' Where");
    assert_eq!(cols(&schema), vec!["x", "s", "d", "Code", "Where"]);
    assert!(schema.contains(&("Code".to_string(), "long".to_string())));
    assert!(schema.contains(&("Where".to_string(), "string".to_string())));
}

#[test]
fn fork_binds_each_branch_from_the_input() {
    let schema = schema("T | fork a = (where x > 1 | count) (project s)");
    assert_eq!(cols(&schema), vec!["s"]);
}

#[test]
fn partition_output_is_the_subquery_output() {
    assert_eq!(
        cols(&schema("T | partition by s (summarize Max = max(x))")),
        vec!["Max"]
    );
}

#[test]
fn top_nested_stacks_level_columns() {
    let schema = schema("T | top-nested 3 of s by sum(x), top-nested 2 of x by count()");
    assert_eq!(cols(&schema), vec!["s", "aggregated_s", "x", "aggregated_x"]);
}

#[test]
fn top_hitters_approximates() {
    assert_eq!(
        cols(&schema("T | top-hitters 5 of s")),
        vec!["s", "approximate_count_s"]
    );
    assert_eq!(
        cols(&schema("T | top-hitters 5 of s by x")),
        vec!["s", "approximate_sum_s"]
    );
}

#[test]
fn sample_distinct_keeps_the_single_column() {
    assert_eq!(cols(&schema("T | sample-distinct 5 of s")), vec!["s"]);
}

#[test]
fn getschema_has_the_fixed_shape() {
    assert_eq!(
        cols(&schema("T | getschema")),
        vec!["ColumnName", "ColumnOrdinal", "DataType", "ColumnType"]
    );
}

#[test]
fn reduce_has_the_fixed_shape() {
    assert_eq!(
        cols(&schema("T | reduce by s")),
        vec!["Pattern", "Count", "Representative"]
    );
}

#[test]
fn render_validates_chart_types() {
    assert_eq!(cols(&schema("T | render barchart")), vec!["x", "s", "d"]);
    assert!(diagnostics_of("T | render wiggles")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::UnknownChartType(_))));
}

#[test]
fn evaluate_runs_plugins() {
    assert_eq!(
        cols(&schema("T | evaluate narrow()")),
        vec!["Row", "Column", "Value"]
    );
}

#[test]
fn plugins_require_evaluate() {
    assert!(diagnostics_of("T | where narrow() == 1")
        .iter()
        .any(|d| matches!(
            d,
            DiagnosticKind::FunctionNotDefined(_) | DiagnosticKind::PluginNotAllowed(_)
        )));
}

#[test]
fn bag_unpack_opens_the_schema() {
    let (block, model) = bind("T | evaluate bag_unpack(d) | where unpacked == 3");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let last = block.statements.last().unwrap();
    let Type::Table(table) = model.result_type_of(last.id) else {
        panic!("expected a table");
    };
    assert!(table.is_open());
    assert!(table.column_by_name("unpacked").is_some());
}

#[test]
fn sort_and_serialize_keep_the_scope() {
    assert_eq!(cols(&schema("T | sort by x desc nulls last")), vec!["x", "s", "d"]);
    assert_eq!(cols(&schema("T | serialize rn = row_number()")), vec!["x", "s", "d", "rn"]);
}

#[test]
fn in_accepts_lists_and_single_column_tables() {
    assert!(diagnostics_of("T | where x in (1, 2, 3)").is_empty());
    assert!(diagnostics_of("T | where x in ((U | project x))").is_empty());
}

#[test]
fn string_predicates_bind_over_strings() {
    assert!(diagnostics_of("T | where s has 'x' and s !contains 'y'").is_empty());
    assert!(diagnostics_of("T | where s matches regex 'a+'").is_empty());
    assert!(diagnostics_of("T | where x between (1 .. 10)").is_empty());
}

#[test]
fn invoke_passes_the_input_as_first_argument() {
    let schema = schema("let f = (t:(*), n:long) { t | take n }; T | invoke f(10)");
    assert_eq!(cols(&schema), vec!["x", "s", "d"]);
}

#[test]
fn lookup_requires_on_and_extends_left() {
    assert_eq!(
        cols(&schema("T | lookup (U) on x")),
        vec!["x", "s", "d", "u"]
    );
    assert!(diagnostics_of("T | lookup (U)")
        .iter()
        .any(|d| matches!(d, DiagnosticKind::MissingJoinOn)));
}
