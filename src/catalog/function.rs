// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Function, operator, pattern and variable symbols, and their signatures.

use std::sync::{Arc, OnceLock};

use super::{TableRef, Type};
use crate::types::{DataValue, ScalarKind};

/// How a parameter constrains its argument's type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterTypeKind {
    /// One or more accepted declared types.
    Declared(Vec<Type>),
    AnyScalar,
    Integer,
    RealOrDecimal,
    StringOrDynamic,
    IntegerOrDynamic,
    Number,
    Summable,
    Tabular,
    SingleColumnTable,
    Database,
    Cluster,
    NotBool,
    NotRealOrBool,
    NotDynamic,
    /// The argument must have the same type as the argument bound to the
    /// indexed parameter.
    Parameter0,
    Parameter1,
    Parameter2,
    CommonScalar,
    CommonScalarOrDynamic,
    CommonNumber,
    CommonSummable,
}

impl ParameterTypeKind {
    /// Whether this kind participates in the common-type computation.
    pub fn is_common(&self) -> bool {
        matches!(
            self,
            Self::CommonScalar
                | Self::CommonScalarOrDynamic
                | Self::CommonNumber
                | Self::CommonSummable
        )
    }
}

/// What shape of argument expression a parameter requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Any expression.
    Expression,
    /// A column reference.
    Column,
    /// A constant expression.
    Constant,
    /// A literal value.
    Literal,
    /// A literal value that is not the empty string.
    LiteralNotEmpty,
    /// The `*` expression.
    Star,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_kind: ParameterTypeKind,
    pub arg_kind: ArgumentKind,
    pub default_value: Option<DataValue>,
    /// When non-empty, the argument literal must be one of these.
    pub accepted_values: Vec<DataValue>,
    pub values_case_sensitive: bool,
    pub is_optional: bool,
    /// A sentinel literal meaning "use the default" when passed explicitly.
    pub default_value_indicator: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_kind: ParameterTypeKind) -> Parameter {
        Parameter {
            name: name.into(),
            type_kind,
            arg_kind: ArgumentKind::Expression,
            default_value: None,
            accepted_values: Vec::new(),
            values_case_sensitive: false,
            is_optional: false,
            default_value_indicator: None,
        }
    }

    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Parameter {
        Parameter::new(name, ParameterTypeKind::Declared(vec![Type::Scalar(kind)]))
    }

    pub fn tabular(name: impl Into<String>) -> Parameter {
        Parameter::new(name, ParameterTypeKind::Tabular)
    }

    pub fn optional(mut self) -> Parameter {
        self.is_optional = true;
        self
    }

    pub fn constant(mut self) -> Parameter {
        self.arg_kind = ArgumentKind::Constant;
        self
    }

    pub fn literal(mut self) -> Parameter {
        self.arg_kind = ArgumentKind::Literal;
        self
    }

    pub fn literal_not_empty(mut self) -> Parameter {
        self.arg_kind = ArgumentKind::LiteralNotEmpty;
        self
    }

    pub fn column(mut self) -> Parameter {
        self.arg_kind = ArgumentKind::Column;
        self
    }

    pub fn star(mut self) -> Parameter {
        self.arg_kind = ArgumentKind::Star;
        self
    }

    pub fn with_default(mut self, value: DataValue) -> Parameter {
        self.default_value = Some(value);
        self.is_optional = true;
        self
    }

    pub fn with_values(mut self, values: Vec<DataValue>, case_sensitive: bool) -> Parameter {
        self.accepted_values = values;
        self.values_case_sensitive = case_sensitive;
        self
    }
}

/// Everything a custom return-type rule may inspect.
pub struct CustomReturnArgs<'a> {
    pub arg_types: &'a [Type],
    pub arg_values: &'a [Option<DataValue>],
    pub row_scope: Option<&'a TableRef>,
}

pub type CustomReturnFn = Arc<dyn Fn(&CustomReturnArgs<'_>) -> Type + Send + Sync>;

/// How a signature's return type is derived.
#[derive(Clone)]
pub enum ReturnTypeKind {
    Declared(Type),
    /// Derived by binding the body text at each call site.
    Computed { body: String },
    /// Copy the type of the argument bound to the indexed parameter.
    Parameter0,
    Parameter1,
    Parameter2,
    /// The type of the last parameter's argument.
    ParameterN,
    /// The last parameter's argument is a `typeof` literal naming the type.
    ParameterNLiteral,
    /// Parameter 0's type widened one step in the scalar lattice.
    Parameter0Promoted,
    /// The common type across common-kind parameters.
    Common,
    /// The widest numeric type among the arguments.
    Widest,
    /// Parameter 0 is a string literal naming a cluster.
    Parameter0Cluster,
    /// Parameter 0 is a string literal naming a database.
    Parameter0Database,
    /// Parameter 0 is a string literal naming a table.
    Parameter0Table,
    Custom(CustomReturnFn),
}

impl std::fmt::Debug for ReturnTypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Declared(ty) => write!(f, "Declared({ty})"),
            Self::Computed { .. } => write!(f, "Computed"),
            Self::Parameter0 => write!(f, "Parameter0"),
            Self::Parameter1 => write!(f, "Parameter1"),
            Self::Parameter2 => write!(f, "Parameter2"),
            Self::ParameterN => write!(f, "ParameterN"),
            Self::ParameterNLiteral => write!(f, "ParameterNLiteral"),
            Self::Parameter0Promoted => write!(f, "Parameter0Promoted"),
            Self::Common => write!(f, "Common"),
            Self::Widest => write!(f, "Widest"),
            Self::Parameter0Cluster => write!(f, "Parameter0Cluster"),
            Self::Parameter0Database => write!(f, "Parameter0Database"),
            Self::Parameter0Table => write!(f, "Parameter0Table"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Which references a computed function body makes, discovered during its
/// first expansion. Drives expansion cache placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionBodyFacts {
    pub uses_cluster: bool,
    pub uses_database: bool,
    pub uses_qualified_table: bool,
    pub uses_unqualified_table: bool,
    pub variable_return: bool,
}

impl FunctionBodyFacts {
    pub fn any_dynamic_scope(&self) -> bool {
        self.uses_unqualified_table
    }
}

/// One overload of a function or operator.
#[derive(Debug)]
pub struct Signature {
    parameters: Vec<Parameter>,
    /// When set, the last parameter may be repeated.
    repeatable: bool,
    min_args: usize,
    max_args: usize,
    return_kind: ReturnTypeKind,
    body_facts: OnceLock<FunctionBodyFacts>,
    /// Cached computed return type for bodies whose type does not depend on
    /// the call site.
    fixed_computed_return: OnceLock<Option<Type>>,
}

pub type SignatureRef = Arc<Signature>;

impl Signature {
    pub fn new(return_kind: ReturnTypeKind, parameters: Vec<Parameter>) -> Signature {
        let min_args = parameters.iter().filter(|p| !p.is_optional).count();
        let max_args = parameters.len();
        Signature {
            parameters,
            repeatable: false,
            min_args,
            max_args,
            return_kind,
            body_facts: OnceLock::new(),
            fixed_computed_return: OnceLock::new(),
        }
    }

    /// Allow the last parameter to repeat up to `max_args` arguments.
    pub fn with_repeat(mut self, max_args: usize) -> Signature {
        self.repeatable = true;
        self.max_args = max_args;
        self
    }

    pub fn into_ref(self) -> SignatureRef {
        Arc::new(self)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn max_args(&self) -> usize {
        self.max_args
    }

    pub fn return_kind(&self) -> &ReturnTypeKind {
        &self.return_kind
    }

    /// The parameter an argument position maps to, accounting for a
    /// repeatable tail.
    pub fn parameter_for_arg(&self, index: usize) -> Option<&Parameter> {
        if index < self.parameters.len() {
            self.parameters.get(index)
        } else if self.repeatable {
            self.parameters.last()
        } else {
            None
        }
    }

    pub fn parameter_index_by_name(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn body_facts(&self) -> Option<FunctionBodyFacts> {
        self.body_facts.get().copied()
    }

    pub fn record_body_facts(&self, facts: FunctionBodyFacts) {
        let _ = self.body_facts.set(facts);
    }

    pub fn fixed_computed_return(&self) -> Option<&Option<Type>> {
        self.fixed_computed_return.get()
    }

    pub fn record_fixed_computed_return(&self, ty: Option<Type>) {
        let _ = self.fixed_computed_return.set(ty);
    }
}

/// Where a function symbol came from; `symbols_in_scope` filters on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    BuiltIn,
    Database,
    Local,
}

/// How an invocation derives its output column name in projection contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultNameKind {
    #[default]
    None,
    /// `prefix_firstarg`, e.g. `sum_x`.
    PrefixAndFirstArgument,
    /// The prefix alone, e.g. `count_`.
    PrefixOnly,
    /// The first argument's column name, e.g. `bin(x, 1)` names `x`.
    FirstArgument,
    /// The sole argument's column name.
    OnlyArgument,
}

/// A named collection of signatures: built-in or user/database function,
/// aggregate, or plug-in.
#[derive(Debug)]
pub struct FunctionSymbol {
    name: String,
    signatures: Vec<SignatureRef>,
    kind: FunctionKind,
    is_aggregate: bool,
    is_plugin: bool,
    constant_foldable: bool,
    result_name_prefix: Option<String>,
    result_name_kind: ResultNameKind,
}

pub type FunctionRef = Arc<FunctionSymbol>;

impl FunctionSymbol {
    pub fn new(name: impl Into<String>, signatures: Vec<Signature>) -> FunctionSymbol {
        FunctionSymbol {
            name: name.into(),
            signatures: signatures.into_iter().map(Signature::into_ref).collect(),
            kind: FunctionKind::BuiltIn,
            is_aggregate: false,
            is_plugin: false,
            constant_foldable: false,
            result_name_prefix: None,
            result_name_kind: ResultNameKind::None,
        }
    }

    pub fn kind_of(mut self, kind: FunctionKind) -> FunctionSymbol {
        self.kind = kind;
        self
    }

    pub fn aggregate(mut self) -> FunctionSymbol {
        self.is_aggregate = true;
        self
    }

    pub fn plugin(mut self) -> FunctionSymbol {
        self.is_plugin = true;
        self
    }

    pub fn foldable(mut self) -> FunctionSymbol {
        self.constant_foldable = true;
        self
    }

    pub fn result_prefix(mut self, prefix: impl Into<String>) -> FunctionSymbol {
        self.result_name_prefix = Some(prefix.into());
        if self.result_name_kind == ResultNameKind::None {
            self.result_name_kind = ResultNameKind::PrefixAndFirstArgument;
        }
        self
    }

    pub fn result_name(mut self, kind: ResultNameKind) -> FunctionSymbol {
        self.result_name_kind = kind;
        self
    }

    pub fn into_ref(self) -> FunctionRef {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signatures(&self) -> &[SignatureRef] {
        &self.signatures
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn is_aggregate(&self) -> bool {
        self.is_aggregate
    }

    pub fn is_plugin(&self) -> bool {
        self.is_plugin
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == FunctionKind::BuiltIn
    }

    pub fn constant_foldable(&self) -> bool {
        self.constant_foldable
    }

    pub fn result_name_prefix(&self) -> Option<&str> {
        self.result_name_prefix.as_deref()
    }

    pub fn result_name_kind(&self) -> ResultNameKind {
        self.result_name_kind
    }

    /// Named arguments are accepted for user-defined functions only.
    pub fn named_arguments_allowed(&self) -> bool {
        !self.is_builtin()
    }

    pub fn min_argument_count(&self) -> usize {
        self.signatures
            .iter()
            .map(|s| s.min_args())
            .min()
            .unwrap_or(0)
    }
}

/// Built-in operator identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    UnaryPlus,
    UnaryMinus,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    EqualTilde,
    BangTilde,
    MatchRegex,
    Contains,
    NotContains,
    ContainsCs,
    NotContainsCs,
    StartsWith,
    NotStartsWith,
    StartsWithCs,
    NotStartsWithCs,
    EndsWith,
    NotEndsWith,
    EndsWithCs,
    NotEndsWithCs,
    Has,
    NotHas,
    HasCs,
    NotHasCs,
    HasPrefix,
    NotHasPrefix,
    HasSuffix,
    NotHasSuffix,
    Like,
    NotLike,
    LikeCs,
    NotLikeCs,
    In,
    NotIn,
    InCs,
    NotInCs,
    Between,
    NotBetween,
    HasAny,
    And,
    Or,
    Search,
}

impl OperatorKind {
    /// The operator's source spelling, used in diagnostics and result names.
    pub fn display(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::UnaryPlus => "+",
            Self::UnaryMinus => "-",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::EqualTilde => "=~",
            Self::BangTilde => "!~",
            Self::MatchRegex => "matches regex",
            Self::Contains => "contains",
            Self::NotContains => "!contains",
            Self::ContainsCs => "contains_cs",
            Self::NotContainsCs => "!contains_cs",
            Self::StartsWith => "startswith",
            Self::NotStartsWith => "!startswith",
            Self::StartsWithCs => "startswith_cs",
            Self::NotStartsWithCs => "!startswith_cs",
            Self::EndsWith => "endswith",
            Self::NotEndsWith => "!endswith",
            Self::EndsWithCs => "endswith_cs",
            Self::NotEndsWithCs => "!endswith_cs",
            Self::Has => "has",
            Self::NotHas => "!has",
            Self::HasCs => "has_cs",
            Self::NotHasCs => "!has_cs",
            Self::HasPrefix => "hasprefix",
            Self::NotHasPrefix => "!hasprefix",
            Self::HasSuffix => "hassuffix",
            Self::NotHasSuffix => "!hassuffix",
            Self::Like => "like",
            Self::NotLike => "!like",
            Self::LikeCs => "like_cs",
            Self::NotLikeCs => "!like_cs",
            Self::In => "in",
            Self::NotIn => "!in",
            Self::InCs => "in~",
            Self::NotInCs => "!in~",
            Self::Between => "between",
            Self::NotBetween => "!between",
            Self::HasAny => "has_any",
            Self::And => "and",
            Self::Or => "or",
            Self::Search => "search",
        }
    }

    /// A name fragment usable in derived result column names.
    pub fn result_name_fragment(&self) -> &'static str {
        match self {
            Self::Add | Self::UnaryPlus => "plus",
            Self::Subtract | Self::UnaryMinus => "minus",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Modulo => "modulo",
            Self::Equal | Self::EqualTilde => "equal",
            Self::NotEqual | Self::BangTilde => "notequal",
            Self::Less => "less",
            Self::LessOrEqual => "lessorequal",
            Self::Greater => "greater",
            Self::GreaterOrEqual => "greaterorequal",
            Self::MatchRegex => "matchesregex",
            Self::Contains | Self::ContainsCs => "contains",
            Self::NotContains | Self::NotContainsCs => "notcontains",
            Self::StartsWith | Self::StartsWithCs => "startswith",
            Self::NotStartsWith | Self::NotStartsWithCs => "notstartswith",
            Self::EndsWith | Self::EndsWithCs => "endswith",
            Self::NotEndsWith | Self::NotEndsWithCs => "notendswith",
            Self::Has | Self::HasCs => "has",
            Self::NotHas | Self::NotHasCs => "nothas",
            Self::HasPrefix | Self::NotHasPrefix => "hasprefix",
            Self::HasSuffix | Self::NotHasSuffix => "hassuffix",
            Self::Like | Self::LikeCs => "like",
            Self::NotLike | Self::NotLikeCs => "notlike",
            Self::In | Self::InCs => "in",
            Self::NotIn | Self::NotInCs => "notin",
            Self::Between => "between",
            Self::NotBetween => "notbetween",
            Self::HasAny => "hasany",
            Self::And => "and",
            Self::Or => "or",
            Self::Search => "search",
        }
    }
}

/// A built-in operator: an identity plus its overloads.
#[derive(Debug)]
pub struct OperatorSymbol {
    kind: OperatorKind,
    signatures: Vec<SignatureRef>,
}

pub type OperatorRef = Arc<OperatorSymbol>;

impl OperatorSymbol {
    pub fn new(kind: OperatorKind, signatures: Vec<Signature>) -> OperatorRef {
        Arc::new(OperatorSymbol {
            kind,
            signatures: signatures.into_iter().map(Signature::into_ref).collect(),
        })
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn signatures(&self) -> &[SignatureRef] {
        &self.signatures
    }
}

/// One mapping of a pattern declaration: literal argument values to a body.
#[derive(Debug, Clone)]
pub struct PatternSignature {
    pub values: Vec<DataValue>,
    pub path_value: Option<DataValue>,
    pub body: String,
}

/// A declared pattern: invoked with literal arguments, optionally followed
/// by a path member access.
#[derive(Debug, Clone)]
pub struct PatternSymbol {
    name: String,
    parameters: Vec<(String, ScalarKind)>,
    path_parameter: Option<String>,
    signatures: Vec<PatternSignature>,
}

pub type PatternRef = Arc<PatternSymbol>;

impl PatternSymbol {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<(String, ScalarKind)>,
        path_parameter: Option<String>,
        signatures: Vec<PatternSignature>,
    ) -> PatternRef {
        Arc::new(PatternSymbol {
            name: name.into(),
            parameters,
            path_parameter,
            signatures,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[(String, ScalarKind)] {
        &self.parameters
    }

    pub fn path_parameter(&self) -> Option<&str> {
        self.path_parameter.as_deref()
    }

    pub fn signatures(&self) -> &[PatternSignature] {
        &self.signatures
    }

    /// The mapping whose literal values equal the invocation's arguments.
    pub fn find_match(
        &self,
        values: &[DataValue],
        path: Option<&DataValue>,
    ) -> Option<&PatternSignature> {
        self.signatures.iter().find(|sig| {
            sig.values.as_slice() == values
                && match (&sig.path_value, path) {
                    (None, None) => true,
                    (Some(want), Some(have)) => want == have,
                    _ => false,
                }
        })
    }
}

/// A let-bound name: a typed value, possibly a compile-time constant.
#[derive(Debug, Clone)]
pub struct VariableSymbol {
    name: String,
    ty: Type,
    is_constant: bool,
    constant_value: Option<DataValue>,
}

pub type VariableRef = Arc<VariableSymbol>;

impl VariableSymbol {
    pub fn new(name: impl Into<String>, ty: Type) -> VariableRef {
        Arc::new(VariableSymbol {
            name: name.into(),
            ty,
            is_constant: false,
            constant_value: None,
        })
    }

    pub fn constant(
        name: impl Into<String>,
        ty: Type,
        value: Option<DataValue>,
    ) -> VariableRef {
        Arc::new(VariableSymbol {
            name: name.into(),
            ty,
            is_constant: true,
            constant_value: value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    pub fn constant_value(&self) -> Option<&DataValue> {
        self.constant_value.as_ref()
    }
}
