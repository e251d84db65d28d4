// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The built-in operator, scalar-function, aggregate and plug-in library.

use std::collections::HashMap;
use std::sync::Arc;

use super::function::{
    FunctionSymbol, OperatorKind, OperatorSymbol, Parameter, ParameterTypeKind, ResultNameKind,
    ReturnTypeKind, Signature,
};
use super::{ColumnSymbol, CustomReturnArgs, FunctionRef, OperatorRef, TableSymbol, Type};
use crate::types::ScalarKind;

fn declared(kind: ScalarKind) -> ReturnTypeKind {
    ReturnTypeKind::Declared(Type::Scalar(kind))
}

fn scalar(name: &str, kind: ScalarKind) -> Parameter {
    Parameter::scalar(name, kind)
}

fn of_kind(name: &str, kind: ParameterTypeKind) -> Parameter {
    Parameter::new(name, kind)
}

const MAX_REPEATED_ARGS: usize = 64;

/// Arithmetic over numbers plus the datetime/timespan special cases.
fn arithmetic(kind: OperatorKind) -> OperatorRef {
    use ScalarKind::*;
    let mut signatures = vec![Signature::new(
        ReturnTypeKind::Widest,
        vec![
            of_kind("left", ParameterTypeKind::Number),
            of_kind("right", ParameterTypeKind::Number),
        ],
    )];
    match kind {
        OperatorKind::Add => {
            signatures.push(Signature::new(
                declared(DateTime),
                vec![scalar("left", DateTime), scalar("right", Timespan)],
            ));
            signatures.push(Signature::new(
                declared(DateTime),
                vec![scalar("left", Timespan), scalar("right", DateTime)],
            ));
            signatures.push(Signature::new(
                declared(Timespan),
                vec![scalar("left", Timespan), scalar("right", Timespan)],
            ));
        }
        OperatorKind::Subtract => {
            signatures.push(Signature::new(
                declared(DateTime),
                vec![scalar("left", DateTime), scalar("right", Timespan)],
            ));
            signatures.push(Signature::new(
                declared(Timespan),
                vec![scalar("left", DateTime), scalar("right", DateTime)],
            ));
            signatures.push(Signature::new(
                declared(Timespan),
                vec![scalar("left", Timespan), scalar("right", Timespan)],
            ));
        }
        _ => {}
    }
    OperatorSymbol::new(kind, signatures)
}

fn unary(kind: OperatorKind) -> OperatorRef {
    OperatorSymbol::new(
        kind,
        vec![
            Signature::new(
                ReturnTypeKind::Parameter0,
                vec![of_kind("operand", ParameterTypeKind::Number)],
            ),
            Signature::new(
                declared(ScalarKind::Timespan),
                vec![scalar("operand", ScalarKind::Timespan)],
            ),
        ],
    )
}

fn equality(kind: OperatorKind) -> OperatorRef {
    OperatorSymbol::new(
        kind,
        vec![Signature::new(
            declared(ScalarKind::Bool),
            vec![
                of_kind("left", ParameterTypeKind::CommonScalarOrDynamic),
                of_kind("right", ParameterTypeKind::CommonScalarOrDynamic),
            ],
        )],
    )
}

fn ordering(kind: OperatorKind) -> OperatorRef {
    OperatorSymbol::new(
        kind,
        vec![Signature::new(
            declared(ScalarKind::Bool),
            vec![
                of_kind("left", ParameterTypeKind::CommonScalar),
                of_kind("right", ParameterTypeKind::CommonScalar),
            ],
        )],
    )
}

fn string_predicate(kind: OperatorKind) -> OperatorRef {
    OperatorSymbol::new(
        kind,
        vec![Signature::new(
            declared(ScalarKind::Bool),
            vec![
                of_kind("text", ParameterTypeKind::StringOrDynamic),
                of_kind("lookup", ParameterTypeKind::StringOrDynamic),
            ],
        )],
    )
}

fn set_membership(kind: OperatorKind) -> OperatorRef {
    OperatorSymbol::new(
        kind,
        vec![
            Signature::new(
                declared(ScalarKind::Bool),
                vec![
                    of_kind("value", ParameterTypeKind::CommonScalarOrDynamic),
                    of_kind("candidate", ParameterTypeKind::CommonScalarOrDynamic),
                ],
            )
            .with_repeat(MAX_REPEATED_ARGS),
            Signature::new(
                declared(ScalarKind::Bool),
                vec![
                    of_kind("value", ParameterTypeKind::AnyScalar),
                    of_kind("candidates", ParameterTypeKind::SingleColumnTable),
                ],
            ),
        ],
    )
}

pub(super) fn operators() -> HashMap<OperatorKind, OperatorRef> {
    use OperatorKind::*;
    let mut map = HashMap::new();
    for op in [
        arithmetic(Add),
        arithmetic(Subtract),
        arithmetic(Multiply),
        arithmetic(Divide),
        arithmetic(Modulo),
        unary(UnaryPlus),
        unary(UnaryMinus),
        equality(Equal),
        equality(NotEqual),
        equality(EqualTilde),
        equality(BangTilde),
        ordering(Less),
        ordering(LessOrEqual),
        ordering(Greater),
        ordering(GreaterOrEqual),
        string_predicate(MatchRegex),
        string_predicate(Contains),
        string_predicate(NotContains),
        string_predicate(ContainsCs),
        string_predicate(NotContainsCs),
        string_predicate(StartsWith),
        string_predicate(NotStartsWith),
        string_predicate(StartsWithCs),
        string_predicate(NotStartsWithCs),
        string_predicate(EndsWith),
        string_predicate(NotEndsWith),
        string_predicate(EndsWithCs),
        string_predicate(NotEndsWithCs),
        string_predicate(Has),
        string_predicate(NotHas),
        string_predicate(HasCs),
        string_predicate(NotHasCs),
        string_predicate(HasPrefix),
        string_predicate(NotHasPrefix),
        string_predicate(HasSuffix),
        string_predicate(NotHasSuffix),
        string_predicate(Like),
        string_predicate(NotLike),
        string_predicate(LikeCs),
        string_predicate(NotLikeCs),
        set_membership(In),
        set_membership(NotIn),
        set_membership(InCs),
        set_membership(NotInCs),
        set_membership(HasAny),
        OperatorSymbol::new(
            Between,
            vec![Signature::new(
                declared(ScalarKind::Bool),
                vec![
                    of_kind("value", ParameterTypeKind::CommonScalar),
                    of_kind("low", ParameterTypeKind::CommonScalar),
                    of_kind("high", ParameterTypeKind::CommonScalar),
                ],
            )],
        ),
        OperatorSymbol::new(
            NotBetween,
            vec![Signature::new(
                declared(ScalarKind::Bool),
                vec![
                    of_kind("value", ParameterTypeKind::CommonScalar),
                    of_kind("low", ParameterTypeKind::CommonScalar),
                    of_kind("high", ParameterTypeKind::CommonScalar),
                ],
            )],
        ),
        OperatorSymbol::new(
            And,
            vec![Signature::new(
                declared(ScalarKind::Bool),
                vec![scalar("left", ScalarKind::Bool), scalar("right", ScalarKind::Bool)],
            )],
        ),
        OperatorSymbol::new(
            Or,
            vec![Signature::new(
                declared(ScalarKind::Bool),
                vec![scalar("left", ScalarKind::Bool), scalar("right", ScalarKind::Bool)],
            )],
        ),
        OperatorSymbol::new(
            Search,
            vec![Signature::new(
                declared(ScalarKind::Bool),
                vec![of_kind("term", ParameterTypeKind::StringOrDynamic)],
            )],
        ),
    ] {
        map.insert(op.kind(), op);
    }
    map
}

pub(super) fn scalar_functions() -> Vec<FunctionRef> {
    use ParameterTypeKind::*;
    use ScalarKind::*;

    let mut fns = Vec::new();
    let mut add = |f: FunctionSymbol| fns.push(f.into_ref());

    add(FunctionSymbol::new(
        "not",
        vec![Signature::new(declared(Bool), vec![scalar("expr", Bool)])],
    )
    .foldable());

    for name in ["iff", "iif"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                ReturnTypeKind::Common,
                vec![
                    scalar("predicate", Bool),
                    of_kind("ifTrue", CommonScalarOrDynamic),
                    of_kind("ifFalse", CommonScalarOrDynamic),
                ],
            )],
        )
        .foldable());
    }

    add(FunctionSymbol::new(
        "case",
        vec![Signature::new(
            ReturnTypeKind::Common,
            vec![
                scalar("predicate", Bool),
                of_kind("then", CommonScalarOrDynamic),
            ],
        )
        .with_repeat(MAX_REPEATED_ARGS)],
    )
    .foldable());

    for name in ["isempty", "isnotempty", "isnull", "isnotnull"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                declared(Bool),
                vec![of_kind("value", AnyScalar)],
            )],
        )
        .foldable());
    }

    add(FunctionSymbol::new(
        "coalesce",
        vec![Signature::new(
            ReturnTypeKind::Common,
            vec![of_kind("value", CommonScalarOrDynamic)],
        )
        .with_repeat(MAX_REPEATED_ARGS)],
    )
    .foldable());

    add(FunctionSymbol::new(
        "strlen",
        vec![Signature::new(declared(Long), vec![scalar("text", String)])],
    )
    .foldable());

    add(FunctionSymbol::new(
        "strcat",
        vec![Signature::new(
            declared(String),
            vec![of_kind("arg", StringOrDynamic)],
        )
        .with_repeat(MAX_REPEATED_ARGS)],
    )
    .foldable()
    .result_prefix("strcat"));

    add(FunctionSymbol::new(
        "substring",
        vec![Signature::new(
            declared(String),
            vec![
                scalar("text", String),
                of_kind("start", Integer),
                of_kind("length", Integer).optional(),
            ],
        )],
    )
    .foldable());

    for name in ["toupper", "tolower"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(declared(String), vec![scalar("text", String)])],
        )
        .foldable());
    }

    add(FunctionSymbol::new(
        "split",
        vec![Signature::new(
            declared(Dynamic),
            vec![
                scalar("text", String),
                scalar("delimiter", String),
                of_kind("index", Integer).optional(),
            ],
        )],
    )
    .foldable());

    add(FunctionSymbol::new(
        "indexof",
        vec![Signature::new(
            declared(Long),
            vec![
                scalar("text", String),
                scalar("lookup", String),
                of_kind("start", Integer).optional(),
                of_kind("length", Integer).optional(),
                of_kind("occurrence", Integer).optional(),
            ],
        )],
    )
    .foldable());

    add(FunctionSymbol::new(
        "trim",
        vec![Signature::new(
            declared(String),
            vec![scalar("regex", String).literal(), scalar("text", String)],
        )],
    )
    .foldable());

    add(FunctionSymbol::new(
        "replace_string",
        vec![Signature::new(
            declared(String),
            vec![
                scalar("text", String),
                scalar("lookup", String),
                scalar("rewrite", String),
            ],
        )],
    )
    .foldable());

    let conversions: &[(&str, ScalarKind)] = &[
        ("tostring", String),
        ("toint", Int),
        ("tolong", Long),
        ("toreal", Real),
        ("todouble", Real),
        ("todecimal", Decimal),
        ("tobool", Bool),
        ("todatetime", DateTime),
        ("totimespan", Timespan),
        ("toguid", Guid),
    ];
    for (name, kind) in conversions {
        add(FunctionSymbol::new(
            *name,
            vec![Signature::new(
                declared(*kind),
                vec![of_kind("value", AnyScalar)],
            )],
        )
        .foldable());
    }

    for name in ["todynamic", "parse_json"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                declared(Dynamic),
                vec![of_kind("value", StringOrDynamic)],
            )],
        )
        .foldable());
    }

    // volatile, so never constant-folded
    add(FunctionSymbol::new(
        "now",
        vec![Signature::new(
            declared(DateTime),
            vec![scalar("offset", Timespan).optional()],
        )],
    ));

    add(FunctionSymbol::new(
        "ago",
        vec![Signature::new(
            declared(DateTime),
            vec![scalar("offset", Timespan)],
        )],
    ));

    for name in ["startofday", "endofday"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                declared(DateTime),
                vec![
                    scalar("date", DateTime),
                    of_kind("offset", Integer).optional(),
                ],
            )],
        )
        .foldable());
    }

    for name in ["bin", "floor"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                ReturnTypeKind::Parameter0,
                vec![
                    of_kind("value", Summable),
                    of_kind("roundTo", Summable),
                ],
            )],
        )
        .foldable()
        .result_name(ResultNameKind::FirstArgument));
    }

    add(FunctionSymbol::new(
        "abs",
        vec![
            Signature::new(
                ReturnTypeKind::Parameter0,
                vec![of_kind("value", Number)],
            ),
            Signature::new(declared(Timespan), vec![scalar("value", Timespan)]),
        ],
    )
    .foldable());

    add(FunctionSymbol::new(
        "ceiling",
        vec![Signature::new(
            ReturnTypeKind::Parameter0,
            vec![of_kind("value", Number)],
        )],
    )
    .foldable());

    for name in ["exp", "log", "log2", "log10", "sqrt"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                declared(Real),
                vec![of_kind("value", Number)],
            )],
        )
        .foldable());
    }

    add(FunctionSymbol::new(
        "pow",
        vec![Signature::new(
            declared(Real),
            vec![of_kind("base", Number), of_kind("exponent", Number)],
        )],
    )
    .foldable());

    add(FunctionSymbol::new(
        "round",
        vec![Signature::new(
            ReturnTypeKind::Parameter0,
            vec![
                of_kind("value", Number),
                of_kind("precision", Integer).optional(),
            ],
        )],
    )
    .foldable());

    add(FunctionSymbol::new(
        "sign",
        vec![Signature::new(
            declared(Real),
            vec![of_kind("value", Number)],
        )],
    )
    .foldable());

    for name in ["min_of", "max_of"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                ReturnTypeKind::Common,
                vec![
                    of_kind("first", CommonScalar),
                    of_kind("rest", CommonScalar),
                ],
            )
            .with_repeat(MAX_REPEATED_ARGS)],
        )
        .foldable());
    }

    add(FunctionSymbol::new(
        "array_length",
        vec![Signature::new(
            declared(Long),
            vec![scalar("array", Dynamic)],
        )],
    )
    .foldable());

    add(FunctionSymbol::new(
        "bag_keys",
        vec![Signature::new(
            declared(Dynamic),
            vec![scalar("bag", Dynamic)],
        )],
    )
    .foldable());

    for name in ["pack", "bag_pack"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                declared(Dynamic),
                vec![scalar("key", String), of_kind("value", AnyScalar)],
            )
            .with_repeat(MAX_REPEATED_ARGS)],
        )
        .foldable());
    }

    add(FunctionSymbol::new(
        "pack_array",
        vec![Signature::new(
            declared(Dynamic),
            vec![of_kind("value", AnyScalar)],
        )
        .with_repeat(MAX_REPEATED_ARGS)],
    )
    .foldable());

    add(FunctionSymbol::new(
        "estimate_data_size",
        vec![
            Signature::new(
                declared(Long),
                vec![of_kind("column", AnyScalar)],
            )
            .with_repeat(MAX_REPEATED_ARGS),
            Signature::new(
                declared(Long),
                vec![of_kind("columns", AnyScalar).star()],
            ),
        ],
    ));

    add(FunctionSymbol::new(
        "row_number",
        vec![Signature::new(
            declared(Long),
            vec![of_kind("startingIndex", Integer).optional()],
        )],
    ));

    // the first column of the subquery's output is the scalar result
    add(FunctionSymbol::new(
        "toscalar",
        vec![Signature::new(
            ReturnTypeKind::Custom(Arc::new(|args: &CustomReturnArgs<'_>| {
                match args.arg_types.first() {
                    Some(super::Type::Table(table)) => table
                        .columns()
                        .first()
                        .map(|c| c.ty().clone())
                        .unwrap_or(super::Type::DYNAMIC),
                    _ => super::Type::Error,
                }
            })),
            vec![Parameter::tabular("query")],
        )],
    ));

    add(FunctionSymbol::new(
        "materialize",
        vec![Signature::new(
            ReturnTypeKind::Parameter0,
            vec![Parameter::tabular("expression")],
        )],
    ));

    add(FunctionSymbol::new(
        "table",
        vec![Signature::new(
            ReturnTypeKind::Parameter0Table,
            vec![scalar("name", String).literal_not_empty()],
        )],
    ));

    add(FunctionSymbol::new(
        "database",
        vec![Signature::new(
            ReturnTypeKind::Parameter0Database,
            vec![scalar("name", String).literal().optional()],
        )],
    ));

    add(FunctionSymbol::new(
        "cluster",
        vec![Signature::new(
            ReturnTypeKind::Parameter0Cluster,
            vec![scalar("name", String).literal_not_empty()],
        )],
    ));

    fns
}

pub(super) fn aggregates() -> Vec<FunctionRef> {
    use ParameterTypeKind::*;
    use ScalarKind::*;

    let mut fns = Vec::new();
    let mut add = |f: FunctionSymbol| fns.push(f.aggregate().into_ref());

    add(FunctionSymbol::new(
        "count",
        vec![Signature::new(declared(Long), vec![])],
    )
    .result_prefix("count")
    .result_name(ResultNameKind::PrefixOnly));

    add(FunctionSymbol::new(
        "countif",
        vec![Signature::new(
            declared(Long),
            vec![scalar("predicate", Bool)],
        )],
    )
    .result_prefix("countif"));

    add(FunctionSymbol::new(
        "dcount",
        vec![Signature::new(
            declared(Long),
            vec![
                of_kind("value", AnyScalar),
                of_kind("accuracy", Integer).optional(),
            ],
        )],
    )
    .result_prefix("dcount"));

    add(FunctionSymbol::new(
        "sum",
        vec![Signature::new(
            ReturnTypeKind::Parameter0Promoted,
            vec![of_kind("value", Summable)],
        )],
    )
    .result_prefix("sum"));

    add(FunctionSymbol::new(
        "sumif",
        vec![Signature::new(
            ReturnTypeKind::Parameter0Promoted,
            vec![of_kind("value", Summable), scalar("predicate", Bool)],
        )],
    )
    .result_prefix("sumif"));

    add(FunctionSymbol::new(
        "avg",
        vec![
            Signature::new(declared(Real), vec![of_kind("value", Number)]),
            Signature::new(declared(DateTime), vec![scalar("value", DateTime)]),
            Signature::new(declared(Timespan), vec![scalar("value", Timespan)]),
        ],
    )
    .result_prefix("avg"));

    for name in ["min", "max"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                ReturnTypeKind::Parameter0,
                vec![of_kind("value", AnyScalar)],
            )],
        )
        .result_prefix(name));
    }

    for name in ["minif", "maxif"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                ReturnTypeKind::Parameter0,
                vec![of_kind("value", AnyScalar), scalar("predicate", Bool)],
            )],
        )
        .result_prefix(name));
    }

    for name in ["take_any", "any"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                ReturnTypeKind::Parameter0,
                vec![of_kind("value", AnyScalar)],
            )],
        )
        .result_name(ResultNameKind::OnlyArgument));
    }

    for name in ["arg_max", "arg_min"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                ReturnTypeKind::ParameterN,
                vec![
                    of_kind("extremum", AnyScalar),
                    of_kind("returned", AnyScalar),
                ],
            )
            .with_repeat(MAX_REPEATED_ARGS)],
        )
        .result_prefix(name));
    }

    add(FunctionSymbol::new(
        "make_list",
        vec![Signature::new(
            declared(Dynamic),
            vec![
                of_kind("value", AnyScalar),
                of_kind("maxSize", Integer).optional(),
            ],
        )],
    )
    .result_prefix("list"));

    add(FunctionSymbol::new(
        "make_set",
        vec![Signature::new(
            declared(Dynamic),
            vec![
                of_kind("value", AnyScalar),
                of_kind("maxSize", Integer).optional(),
            ],
        )],
    )
    .result_prefix("set"));

    add(FunctionSymbol::new(
        "make_bag",
        vec![Signature::new(
            declared(Dynamic),
            vec![
                scalar("bag", Dynamic),
                of_kind("maxSize", Integer).optional(),
            ],
        )],
    )
    .result_prefix("bag"));

    add(FunctionSymbol::new(
        "percentile",
        vec![Signature::new(
            ReturnTypeKind::Parameter0,
            vec![of_kind("value", Number), of_kind("percentile", Number).constant()],
        )],
    )
    .result_prefix("percentile"));

    for name in ["stdev", "variance"] {
        add(FunctionSymbol::new(
            name,
            vec![Signature::new(
                declared(Real),
                vec![of_kind("value", Number)],
            )],
        )
        .result_prefix(name));
    }

    add(FunctionSymbol::new(
        "hll",
        vec![Signature::new(
            declared(Dynamic),
            vec![
                of_kind("value", AnyScalar),
                of_kind("accuracy", Integer).optional(),
            ],
        )],
    )
    .result_prefix("hll"));

    add(FunctionSymbol::new(
        "count_distinct",
        vec![Signature::new(
            declared(Long),
            vec![of_kind("value", AnyScalar)],
        )],
    )
    .result_prefix("count_distinct"));

    fns
}

pub(super) fn plugins() -> Vec<FunctionRef> {
    let mut fns = Vec::new();
    let mut add = |f: FunctionSymbol| fns.push(f.plugin().into_ref());

    // without a typeof hint the unpacked schema is unknowable statically, so
    // the output is an open table that infers columns on reference
    add(FunctionSymbol::new(
        "bag_unpack",
        vec![Signature::new(
            ReturnTypeKind::Custom(Arc::new(|args: &CustomReturnArgs<'_>| {
                let retained: Vec<_> = args
                    .row_scope
                    .map(|t| t.columns().to_vec())
                    .unwrap_or_default();
                Type::Table(TableSymbol::from_columns("bag_unpack", retained, true))
            })),
            vec![
                Parameter::scalar("column", ScalarKind::Dynamic).column(),
                Parameter::scalar("prefix", ScalarKind::String)
                    .literal()
                    .optional(),
            ],
        )],
    ));

    add(FunctionSymbol::new(
        "pivot",
        vec![Signature::new(
            ReturnTypeKind::Custom(Arc::new(|args: &CustomReturnArgs<'_>| {
                let retained: Vec<_> = args
                    .row_scope
                    .map(|t| t.columns().to_vec())
                    .unwrap_or_default();
                Type::Table(TableSymbol::from_columns("pivot", retained, true))
            })),
            vec![
                Parameter::new("pivotColumn", ParameterTypeKind::AnyScalar).column(),
                Parameter::new("aggregate", ParameterTypeKind::AnyScalar).optional(),
            ],
        )],
    ));

    add(FunctionSymbol::new(
        "narrow",
        vec![Signature::new(
            ReturnTypeKind::Declared(Type::Table(TableSymbol::from_columns(
                "narrow",
                vec![
                    ColumnSymbol::scalar("Row", ScalarKind::Long),
                    ColumnSymbol::scalar("Column", ScalarKind::String),
                    ColumnSymbol::scalar("Value", ScalarKind::String),
                ],
                false,
            ))),
            vec![],
        )],
    ));

    fns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_table_is_complete() {
        let ops = operators();
        for kind in [
            OperatorKind::Add,
            OperatorKind::Equal,
            OperatorKind::Has,
            OperatorKind::In,
            OperatorKind::Between,
            OperatorKind::And,
            OperatorKind::Search,
        ] {
            assert!(ops.contains_key(&kind), "missing operator {kind:?}");
        }
    }

    #[test]
    fn aggregates_are_flagged() {
        for f in aggregates() {
            assert!(f.is_aggregate(), "{} must be an aggregate", f.name());
        }
    }

    #[test]
    fn sum_promotes_its_argument() {
        let aggs = aggregates();
        let sum = aggs.iter().find(|f| f.name() == "sum").unwrap();
        assert!(matches!(
            sum.signatures()[0].return_kind(),
            ReturnTypeKind::Parameter0Promoted
        ));
    }
}
