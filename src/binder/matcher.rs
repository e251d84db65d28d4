// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Overload resolution over function and operator signature sets.

use itertools::Itertools;

use super::error::{Diagnostic, DiagnosticKind};
use crate::catalog::{
    ArgumentKind, Parameter, ParameterTypeKind, Signature, SignatureRef, Type,
};
use crate::parser::Span;
use crate::types::{DataValue, ScalarKind};

/// How well an argument fits its parameter. Order matters: higher is a
/// better match, and overload ranking compares these per argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum MatchKind {
    None,
    NotType,
    Scalar,
    Summable,
    Number,
    Compatible,
    Promoted,
    Tabular,
    Table,
    Database,
    Cluster,
    OneOfTwo,
    Exact,
}

/// A bound argument as the matcher sees it.
#[derive(Debug, Clone)]
pub(super) struct ArgumentInfo {
    pub ty: Type,
    pub span: Span,
    /// Set for `name = value` named arguments.
    pub name: Option<String>,
    pub is_star: bool,
    pub is_constant: bool,
    pub value: Option<DataValue>,
    pub is_column: bool,
    pub is_literal: bool,
    /// Set when the argument is a `typeof(...)` literal.
    pub type_literal: Option<Type>,
}

impl ArgumentInfo {
    pub fn of_type(ty: Type, span: Span) -> ArgumentInfo {
        ArgumentInfo {
            ty,
            span,
            name: None,
            is_star: false,
            is_constant: false,
            value: None,
            is_column: false,
            is_literal: false,
            type_literal: None,
        }
    }
}

pub(super) enum MatchResult {
    Best(SignatureRef),
    /// More than one signature survived tie-breaking.
    Ambiguous(Vec<SignatureRef>),
    /// Nothing matched; carries the arity-filtered candidates for
    /// diagnostics.
    NoMatch(Vec<SignatureRef>),
}

/// Map argument positions to parameter indices, routing named arguments.
/// Unresolvable names map to `None`; the check pass diagnoses them.
pub(super) fn map_args(sig: &Signature, args: &[ArgumentInfo]) -> Vec<Option<usize>> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| match &arg.name {
            Some(name) => sig.parameter_index_by_name(name),
            None => sig.parameter_for_arg(i).map(|_| i.min(sig.parameters().len() - 1)),
        })
        .collect()
}

/// Overload selection per the ranking rules: arity filter, per-argument
/// match kinds, match count, then pairwise strictly-better comparison.
///
/// Deterministic: the outcome does not depend on candidate order.
pub(super) fn best_matching(
    signatures: &[SignatureRef],
    args: &[ArgumentInfo],
) -> MatchResult {
    let candidates = arity_filter(signatures, args.len());
    if candidates.len() == 1 {
        return MatchResult::Best(candidates[0].clone());
    }

    let scored: Vec<(SignatureRef, Vec<MatchKind>)> = candidates
        .iter()
        .map(|sig| {
            let scores = score_signature(sig, args);
            (sig.clone(), scores)
        })
        .collect();

    let best_count = scored
        .iter()
        .map(|(_, scores)| match_count(scores))
        .max()
        .unwrap_or(0);
    if best_count == 0 {
        return MatchResult::NoMatch(candidates);
    }
    let finalists: Vec<&(SignatureRef, Vec<MatchKind>)> = scored
        .iter()
        .filter(|(_, scores)| match_count(scores) == best_count)
        .collect();
    if finalists.len() == 1 {
        return MatchResult::Best(finalists[0].0.clone());
    }

    let mut unique_best: Option<&(SignatureRef, Vec<MatchKind>)> = None;
    for cand in &finalists {
        if finalists
            .iter()
            .filter(|other| !SignatureRef::ptr_eq(&cand.0, &other.0))
            .all(|other| strictly_better(&cand.1, &other.1, args.len()))
        {
            unique_best = Some(cand);
            break;
        }
    }
    match unique_best {
        Some((sig, _)) => MatchResult::Best(sig.clone()),
        None => MatchResult::Ambiguous(finalists.into_iter().map(|(s, _)| s.clone()).collect()),
    }
}

fn arity_filter(signatures: &[SignatureRef], argc: usize) -> Vec<SignatureRef> {
    let in_range: Vec<SignatureRef> = signatures
        .iter()
        .filter(|s| (s.min_args()..=s.max_args()).contains(&argc))
        .cloned()
        .collect();
    if !in_range.is_empty() {
        return in_range;
    }
    // nothing fits: prefer the signatures whose minimum is closest, falling
    // back to everything with the largest maximum
    if let Some(closest) = signatures
        .iter()
        .map(|s| s.min_args().abs_diff(argc))
        .min()
    {
        let close: Vec<SignatureRef> = signatures
            .iter()
            .filter(|s| s.min_args().abs_diff(argc) == closest)
            .cloned()
            .collect();
        if !close.is_empty() {
            return close;
        }
    }
    let max = signatures.iter().map(|s| s.max_args()).max().unwrap_or(0);
    signatures
        .iter()
        .filter(|s| s.max_args() == max)
        .cloned()
        .collect()
}

fn match_count(scores: &[MatchKind]) -> usize {
    scores.iter().filter(|&&k| k > MatchKind::None).count()
}

/// `s1` beats `s2` when it matches all arguments and `s2` does not, or when
/// it is at least as good everywhere and strictly better somewhere.
fn strictly_better(s1: &[MatchKind], s2: &[MatchKind], argc: usize) -> bool {
    let all1 = s1.iter().take(argc).all(|&k| k > MatchKind::None);
    let all2 = s2.iter().take(argc).all(|&k| k > MatchKind::None);
    if all1 != all2 {
        return all1;
    }
    let mut any_better = false;
    for (a, b) in s1.iter().zip(s2) {
        if a > b {
            any_better = true;
        } else if a < b {
            return false;
        }
    }
    any_better
}

pub(super) fn score_signature(sig: &Signature, args: &[ArgumentInfo]) -> Vec<MatchKind> {
    let map = map_args(sig, args);
    let common = common_type_for(sig, args, &map);
    args.iter()
        .enumerate()
        .map(|(i, arg)| {
            let Some(param_index) = map[i] else {
                return MatchKind::None;
            };
            let Some(param) = sig.parameter_for_arg(param_index) else {
                return MatchKind::None;
            };
            classify(param, arg, sig, args, &map, common)
        })
        .collect()
}

/// The common scalar type over the arguments of common-kind parameters.
pub(super) fn common_type_for(
    sig: &Signature,
    args: &[ArgumentInfo],
    map: &[Option<usize>],
) -> Option<ScalarKind> {
    let kinds = args.iter().enumerate().filter_map(|(i, arg)| {
        let param = sig.parameter_for_arg((*map.get(i)?)?)?;
        if param.type_kind.is_common() {
            arg.ty.scalar_kind()
        } else {
            None
        }
    });
    common_scalar_type(kinds)
}

/// The "best" common kind: a non-dynamic scalar beats dynamic, and a wider
/// candidate beats the current. Returns `None` on irreconcilable kinds.
pub(super) fn common_scalar_type(
    kinds: impl IntoIterator<Item = ScalarKind>,
) -> Option<ScalarKind> {
    let mut best: Option<ScalarKind> = None;
    for kind in kinds {
        best = Some(match best {
            None => kind,
            Some(cur) if cur == kind => cur,
            Some(ScalarKind::Dynamic) => kind,
            Some(cur) if kind == ScalarKind::Dynamic => cur,
            Some(cur) if cur.widens_to(kind) => kind,
            Some(cur) if kind.widens_to(cur) => cur,
            Some(_) => return None,
        });
    }
    best
}

fn classify(
    param: &Parameter,
    arg: &ArgumentInfo,
    sig: &Signature,
    args: &[ArgumentInfo],
    map: &[Option<usize>],
    common: Option<ScalarKind>,
) -> MatchKind {
    use MatchKind::*;

    // error operands fit silently; the root cause is already diagnosed
    if arg.ty.is_error() {
        return Exact;
    }
    if arg.is_star {
        return if param.arg_kind == ArgumentKind::Star {
            Exact
        } else {
            None
        };
    }
    if param.arg_kind == ArgumentKind::Star {
        return None;
    }

    let scalar = arg.ty.scalar_kind();
    match &param.type_kind {
        ParameterTypeKind::Declared(types) => {
            let one_of_two = types.len() >= 2;
            if types.iter().any(|t| *t == arg.ty) {
                return if one_of_two { OneOfTwo } else { Exact };
            }
            for target in types {
                if let (Some(a), Some(b)) = (scalar, target.scalar_kind()) {
                    if a.widens_to(b) {
                        return Promoted;
                    }
                    if b.widens_to(a)
                        || a == ScalarKind::Dynamic
                        || b == ScalarKind::Dynamic
                    {
                        return Compatible;
                    }
                }
                if let (Type::Table(have), Type::Table(want)) = (&arg.ty, target) {
                    if have.assignable_to(want) {
                        return Table;
                    }
                }
            }
            if scalar.is_some() && types.iter().any(|t| t.is_scalar()) {
                NotType
            } else {
                None
            }
        }
        ParameterTypeKind::AnyScalar => match scalar {
            Some(_) => Scalar,
            _ => None,
        },
        ParameterTypeKind::Integer => match scalar {
            Some(k) if k.is_integer() => Number,
            Some(ScalarKind::Dynamic) => Compatible,
            Some(_) => NotType,
            _ => None,
        },
        ParameterTypeKind::RealOrDecimal => match scalar {
            Some(ScalarKind::Real | ScalarKind::Decimal) => Number,
            Some(ScalarKind::Dynamic) => Compatible,
            Some(_) => NotType,
            _ => None,
        },
        ParameterTypeKind::StringOrDynamic => match scalar {
            Some(ScalarKind::String | ScalarKind::Dynamic) => Scalar,
            Some(_) => NotType,
            _ => None,
        },
        ParameterTypeKind::IntegerOrDynamic => match scalar {
            Some(k) if k.is_integer() => Number,
            Some(ScalarKind::Dynamic) => Compatible,
            Some(_) => NotType,
            _ => None,
        },
        ParameterTypeKind::Number => match scalar {
            Some(k) if k.is_numeric() => Number,
            Some(ScalarKind::Dynamic) => Compatible,
            Some(_) => NotType,
            _ => None,
        },
        ParameterTypeKind::Summable => match scalar {
            Some(k) if k.is_summable() => Summable,
            Some(ScalarKind::Dynamic) => Compatible,
            Some(_) => NotType,
            _ => None,
        },
        ParameterTypeKind::NotBool => match scalar {
            Some(ScalarKind::Bool) => NotType,
            Some(_) => Scalar,
            _ => None,
        },
        ParameterTypeKind::NotRealOrBool => match scalar {
            Some(ScalarKind::Real | ScalarKind::Bool) => NotType,
            Some(_) => Scalar,
            _ => None,
        },
        ParameterTypeKind::NotDynamic => match scalar {
            Some(ScalarKind::Dynamic) => NotType,
            Some(_) => Scalar,
            _ => None,
        },
        ParameterTypeKind::Tabular => match arg.ty {
            Type::Table(_) => Tabular,
            _ => None,
        },
        ParameterTypeKind::SingleColumnTable => match &arg.ty {
            Type::Table(t) if t.columns().len() == 1 => Table,
            Type::Table(_) => Tabular,
            _ => None,
        },
        ParameterTypeKind::Database => match arg.ty {
            Type::Database(_) => Database,
            _ => None,
        },
        ParameterTypeKind::Cluster => match arg.ty {
            Type::Cluster(_) => Cluster,
            _ => None,
        },
        ParameterTypeKind::Parameter0 => classify_against_indexed(0, arg, sig, args, map),
        ParameterTypeKind::Parameter1 => classify_against_indexed(1, arg, sig, args, map),
        ParameterTypeKind::Parameter2 => classify_against_indexed(2, arg, sig, args, map),
        kind @ (ParameterTypeKind::CommonScalar
        | ParameterTypeKind::CommonScalarOrDynamic
        | ParameterTypeKind::CommonNumber
        | ParameterTypeKind::CommonSummable) => {
            let Some(k) = scalar else { return None };
            match kind {
                ParameterTypeKind::CommonNumber
                    if !k.is_numeric() && k != ScalarKind::Dynamic =>
                {
                    return NotType;
                }
                ParameterTypeKind::CommonSummable
                    if !k.is_summable() && k != ScalarKind::Dynamic =>
                {
                    return NotType;
                }
                ParameterTypeKind::CommonScalar if k == ScalarKind::Dynamic => {
                    return Compatible;
                }
                _ => {}
            }
            match common {
                Some(c) if c == k => Exact,
                Some(c) if k.widens_to(c) => Promoted,
                Some(c) if k == ScalarKind::Dynamic || c == ScalarKind::Dynamic => Compatible,
                Some(_) => NotType,
                Option::None => NotType,
            }
        }
    }
}

fn classify_against_indexed(
    index: usize,
    arg: &ArgumentInfo,
    _sig: &Signature,
    args: &[ArgumentInfo],
    map: &[Option<usize>],
) -> MatchKind {
    use MatchKind::*;
    let Some(other) = map
        .iter()
        .position(|p| *p == Some(index))
        .and_then(|i| args.get(i))
    else {
        return None;
    };
    if arg.ty == other.ty {
        return Exact;
    }
    match (arg.ty.scalar_kind(), other.ty.scalar_kind()) {
        (Some(a), Some(b)) if a.widens_to(b) => Promoted,
        (Some(a), Some(b)) if b.widens_to(a) => Compatible,
        (Some(ScalarKind::Dynamic), Some(_)) | (Some(_), Some(ScalarKind::Dynamic)) => Compatible,
        (Some(_), Some(_)) => NotType,
        _ => None,
    }
}

/// Validate the selected signature: argument counts, named-argument rules,
/// per-parameter type and shape requirements, accepted literal values, and
/// missing required parameters.
#[allow(clippy::too_many_arguments)]
pub(super) fn check_signature(
    function_name: &str,
    sig: &Signature,
    args: &[ArgumentInfo],
    named_allowed: bool,
    user_defined: bool,
    call_span: Span,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if args.len() < sig.min_args() || args.len() > sig.max_args() {
        diagnostics.push(
            DiagnosticKind::WrongNumberOfArguments {
                name: function_name.into(),
                min: sig.min_args(),
                max: sig.max_args(),
                actual: args.len(),
            }
            .with_span(call_span),
        );
    }

    check_named_arguments(function_name, sig, args, named_allowed, diagnostics);

    let map = map_args(sig, args);
    let common = common_type_for(sig, args, &map);
    let mut star_seen = false;
    for (i, arg) in args.iter().enumerate() {
        if arg.is_star && i + 1 < args.len() {
            if !star_seen {
                diagnostics.push(DiagnosticKind::StarMustBeLast.with_span(arg.span));
            }
            star_seen = true;
        }
        if arg.ty.is_error() {
            continue;
        }
        let Some(param) = map[i].and_then(|p| sig.parameter_for_arg(p)) else {
            continue;
        };
        if uses_default_indicator(param, arg) {
            continue;
        }
        let kind = classify(param, arg, sig, args, &map, common);
        if kind == MatchKind::None || kind == MatchKind::NotType {
            // the error kind depends on the parameter's shape requirement
            if param.arg_kind == ArgumentKind::Star {
                diagnostics.push(DiagnosticKind::StarNotAllowed.with_span(arg.span));
            } else {
                diagnostics.push(
                    DiagnosticKind::WrongArgumentType {
                        function: function_name.into(),
                        argument: param.name.clone(),
                        expected: describe_parameter(param),
                        actual: arg.ty.to_string(),
                    }
                    .with_span(arg.span),
                );
            }
            continue;
        }
        // user-defined functions accept compatible conversions; built-ins
        // accept only identity or promotion
        if !user_defined && kind == MatchKind::Compatible {
            if let Some(ScalarKind::Dynamic) = arg.ty.scalar_kind() {
                // dynamic narrows implicitly everywhere
            } else if matches!(param.type_kind, ParameterTypeKind::Declared(_)) {
                diagnostics.push(
                    DiagnosticKind::WrongArgumentType {
                        function: function_name.into(),
                        argument: param.name.clone(),
                        expected: describe_parameter(param),
                        actual: arg.ty.to_string(),
                    }
                    .with_span(arg.span),
                );
                continue;
            }
        }
        match param.arg_kind {
            ArgumentKind::Expression | ArgumentKind::Star => {}
            ArgumentKind::Column => {
                if !arg.is_column {
                    diagnostics.push(DiagnosticKind::ColumnRequired.with_span(arg.span));
                }
            }
            ArgumentKind::Constant => {
                if !arg.is_constant {
                    diagnostics.push(DiagnosticKind::ConstantRequired.with_span(arg.span));
                }
            }
            ArgumentKind::Literal => {
                if !arg.is_literal {
                    diagnostics.push(DiagnosticKind::LiteralRequired.with_span(arg.span));
                }
            }
            ArgumentKind::LiteralNotEmpty => {
                if !arg.is_literal {
                    diagnostics.push(DiagnosticKind::LiteralRequired.with_span(arg.span));
                } else if arg.value.as_ref().is_some_and(DataValue::is_empty_string) {
                    diagnostics
                        .push(DiagnosticKind::NonEmptyLiteralRequired.with_span(arg.span));
                }
            }
        }
        if !param.accepted_values.is_empty() {
            if let Some(value) = &arg.value {
                let ok = param
                    .accepted_values
                    .iter()
                    .any(|v| value.matches_accepted(v, param.values_case_sensitive));
                if !ok {
                    diagnostics.push(
                        DiagnosticKind::ValueNotAllowed {
                            value: value.to_string(),
                            allowed: param.accepted_values.iter().join(", "),
                        }
                        .with_span(arg.span),
                    );
                }
            }
        }
    }

    for (p, param) in sig.parameters().iter().enumerate() {
        if param.is_optional {
            continue;
        }
        let supplied = map.iter().any(|m| *m == Some(p));
        if !supplied && args.len() <= sig.max_args() && args.len() >= sig.min_args() {
            diagnostics.push(
                DiagnosticKind::MissingRequiredParameter {
                    function: function_name.into(),
                    parameter: param.name.clone(),
                }
                .with_span(call_span),
            );
        }
    }
}

fn check_named_arguments(
    function_name: &str,
    sig: &Signature,
    args: &[ArgumentInfo],
    named_allowed: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut seen: Vec<&str> = Vec::new();
    let mut out_of_order = false;
    for (i, arg) in args.iter().enumerate() {
        match &arg.name {
            Some(name) => {
                if !named_allowed {
                    diagnostics.push(
                        DiagnosticKind::NamedArgumentsNotSupported(function_name.into())
                            .with_span(arg.span),
                    );
                    continue;
                }
                if seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                    diagnostics.push(
                        DiagnosticKind::DuplicateNamedArgument(name.clone()).with_span(arg.span),
                    );
                }
                seen.push(name);
                match sig.parameter_index_by_name(name) {
                    Some(p) => {
                        if p != i {
                            out_of_order = true;
                        }
                    }
                    None => diagnostics.push(
                        DiagnosticKind::UnknownNamedArgument {
                            function: function_name.into(),
                            name: name.clone(),
                        }
                        .with_span(arg.span),
                    ),
                }
            }
            None => {
                if out_of_order {
                    diagnostics.push(
                        DiagnosticKind::UnnamedArgumentAfterOutOfOrder.with_span(arg.span),
                    );
                }
            }
        }
    }
}

fn uses_default_indicator(param: &Parameter, arg: &ArgumentInfo) -> bool {
    match (&param.default_value_indicator, &arg.value) {
        (Some(indicator), Some(DataValue::String(s))) => s == indicator,
        _ => false,
    }
}

fn describe_parameter(param: &Parameter) -> String {
    match &param.type_kind {
        ParameterTypeKind::Declared(types) => types.iter().join(" or "),
        ParameterTypeKind::AnyScalar => "a scalar value".into(),
        ParameterTypeKind::Integer => "an integer".into(),
        ParameterTypeKind::RealOrDecimal => "real or decimal".into(),
        ParameterTypeKind::StringOrDynamic => "string or dynamic".into(),
        ParameterTypeKind::IntegerOrDynamic => "an integer or dynamic".into(),
        ParameterTypeKind::Number => "a number".into(),
        ParameterTypeKind::Summable => "a summable value".into(),
        ParameterTypeKind::Tabular => "a tabular expression".into(),
        ParameterTypeKind::SingleColumnTable => "a single-column table".into(),
        ParameterTypeKind::Database => "a database".into(),
        ParameterTypeKind::Cluster => "a cluster".into(),
        ParameterTypeKind::NotBool => "a non-bool scalar".into(),
        ParameterTypeKind::NotRealOrBool => "a scalar other than real or bool".into(),
        ParameterTypeKind::NotDynamic => "a non-dynamic scalar".into(),
        ParameterTypeKind::Parameter0 => "the type of the first argument".into(),
        ParameterTypeKind::Parameter1 => "the type of the second argument".into(),
        ParameterTypeKind::Parameter2 => "the type of the third argument".into(),
        ParameterTypeKind::CommonScalar
        | ParameterTypeKind::CommonScalarOrDynamic
        | ParameterTypeKind::CommonNumber
        | ParameterTypeKind::CommonSummable => "a common scalar type".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReturnTypeKind;

    fn arg(ty: Type) -> ArgumentInfo {
        ArgumentInfo::of_type(ty, Span::new(0, 0))
    }

    fn sig(params: Vec<Parameter>) -> SignatureRef {
        Signature::new(ReturnTypeKind::Declared(Type::BOOL), params).into_ref()
    }

    #[test]
    fn exact_beats_promoted() {
        let long_sig = sig(vec![Parameter::scalar("v", ScalarKind::Long)]);
        let real_sig = sig(vec![Parameter::scalar("v", ScalarKind::Real)]);
        let result = best_matching(
            &[real_sig.clone(), long_sig.clone()],
            &[arg(Type::LONG)],
        );
        match result {
            MatchResult::Best(best) => assert!(SignatureRef::ptr_eq(&best, &long_sig)),
            _ => panic!("expected a unique best match"),
        }
    }

    #[test]
    fn selection_is_order_independent() {
        let long_sig = sig(vec![Parameter::scalar("v", ScalarKind::Long)]);
        let real_sig = sig(vec![Parameter::scalar("v", ScalarKind::Real)]);
        for order in [
            vec![long_sig.clone(), real_sig.clone()],
            vec![real_sig.clone(), long_sig.clone()],
        ] {
            match best_matching(&order, &[arg(Type::INT)]) {
                MatchResult::Best(best) => {
                    assert!(SignatureRef::ptr_eq(&best, &long_sig));
                }
                _ => panic!("expected a unique best match"),
            }
        }
    }

    #[test]
    fn identical_scores_are_ambiguous() {
        let s1 = sig(vec![Parameter::scalar("v", ScalarKind::Long)]);
        let s2 = sig(vec![Parameter::scalar("w", ScalarKind::Long)]);
        match best_matching(&[s1, s2], &[arg(Type::LONG)]) {
            MatchResult::Ambiguous(ties) => assert_eq!(ties.len(), 2),
            _ => panic!("expected ambiguity"),
        }
    }

    #[test]
    fn common_type_prefers_non_dynamic_and_wider() {
        assert_eq!(
            common_scalar_type([ScalarKind::Dynamic, ScalarKind::Long]),
            Some(ScalarKind::Long)
        );
        assert_eq!(
            common_scalar_type([ScalarKind::Int, ScalarKind::Long]),
            Some(ScalarKind::Long)
        );
        assert_eq!(
            common_scalar_type([ScalarKind::String, ScalarKind::Long]),
            None
        );
    }

    #[test]
    fn named_argument_rules() {
        let s = Signature::new(
            ReturnTypeKind::Declared(Type::BOOL),
            vec![
                Parameter::scalar("a", ScalarKind::Long),
                Parameter::scalar("b", ScalarKind::Long).optional(),
                Parameter::scalar("c", ScalarKind::Long).optional(),
            ],
        );
        // c named out of order, then an unnamed argument follows
        let mut c = arg(Type::LONG);
        c.name = Some("c".into());
        let unnamed = arg(Type::LONG);
        let mut diags = Vec::new();
        check_signature(
            "f",
            &s,
            &[c, unnamed],
            true,
            true,
            Span::new(0, 1),
            &mut diags,
        );
        assert!(diags
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::UnnamedArgumentAfterOutOfOrder)));
    }

    #[test]
    fn star_must_be_last() {
        let s = Signature::new(
            ReturnTypeKind::Declared(Type::LONG),
            vec![Parameter::new("cols", ParameterTypeKind::AnyScalar).star()],
        );
        let mut star = arg(Type::Void);
        star.is_star = true;
        let mut diags = Vec::new();
        check_signature(
            "f",
            &s,
            &[star, arg(Type::LONG)],
            false,
            false,
            Span::new(0, 1),
            &mut diags,
        );
        assert!(diags
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::StarMustBeLast)));
    }
}
