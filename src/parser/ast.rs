// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The immutable syntax tree.
//!
//! Node ids are dense indices assigned by the parser, so a binding pass can
//! use a flat side table. Every composite node records a span covering its
//! children.

use chrono::Duration;

use super::Span;
use crate::types::{DataValue, ScalarKind};

/// Identity of a syntax node within one parsed tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parsed top-level input: `;`-separated statements, usually ending in a
/// query expression.
#[derive(Debug, Clone)]
pub struct QueryBlock {
    pub statements: Vec<Statement>,
    /// Total number of node ids assigned while parsing this tree.
    pub node_count: u32,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub id: NodeId,
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    /// `let name = expr;` or `let name = (params) { body };`
    Let { name: Ident, value: LetValue },
    /// `declare pattern name = (params)[path] { body };`
    DeclarePattern { name: Ident, decl: PatternDecl },
    Query(Expr),
}

#[derive(Debug, Clone)]
pub enum LetValue {
    Scalar(Expr),
    Function(FunctionDecl),
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub params: Vec<ParamDecl>,
    /// Body text including the braces, re-parsed on inline expansion.
    pub body: String,
    pub body_span: Span,
}

#[derive(Debug, Clone)]
pub struct PatternDecl {
    pub params: Vec<ParamDecl>,
    pub path: Option<Ident>,
    pub mappings: Vec<PatternMapping>,
}

/// One `('value').('path') = { body }` entry of a pattern declaration.
#[derive(Debug, Clone)]
pub struct PatternMapping {
    pub values: Vec<Literal>,
    pub path_value: Option<Literal>,
    pub body: String,
    pub body_span: Span,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub default: Option<Expr>,
}

/// A type as written in source: a scalar name, a table schema, or `(*)`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Scalar(ScalarKind),
    Table(Vec<(String, ScalarKind)>),
    OpenTable,
}

/// A name with its source span, case-preserving.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// A name reference, possibly `$left`/`$right`.
    Name(Ident),
    /// `*` in argument or projection position.
    Star,
    /// `left.name` member access.
    Path { left: Box<Expr>, name: Ident },
    /// `left["key"]` element access.
    Element { left: Box<Expr>, index: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `x in (a, b, c)` and its negated / case-insensitive forms.
    In { op: InOp, left: Box<Expr>, list: Vec<Expr> },
    /// `x between (lo .. hi)`.
    Between { negated: bool, expr: Box<Expr>, low: Box<Expr>, high: Box<Expr> },
    Call(CallExpr),
    /// `input | operator`.
    Pipe { input: Box<Expr>, operator: Box<PipeOperator> },
    /// `datatable (a:long, b:string) [1, 'x', ...]`.
    Datatable { columns: Vec<(Ident, ScalarKind)>, values: Vec<Expr> },
    /// `range x from a to b step c`.
    Range { name: Ident, from: Box<Expr>, to: Box<Expr>, step: Box<Expr> },
    /// `print [name =] expr, ...`.
    Print { items: Vec<Assignment> },
    /// `typeof(long)` or `typeof(a:long, b:string)`.
    TypeOf(TypeExpr),
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Long(i64),
    Real(f64),
    Decimal(rust_decimal::Decimal),
    String(String),
    DateTime(chrono::DateTime<chrono::Utc>),
    Timespan(Duration),
    Guid(String),
    Dynamic(String),
    Null,
}

impl Literal {
    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Long(_) => ScalarKind::Long,
            Self::Real(_) => ScalarKind::Real,
            Self::Decimal(_) => ScalarKind::Decimal,
            Self::String(_) => ScalarKind::String,
            Self::DateTime(_) => ScalarKind::DateTime,
            Self::Timespan(_) => ScalarKind::Timespan,
            Self::Guid(_) => ScalarKind::Guid,
            Self::Dynamic(_) => ScalarKind::Dynamic,
            Self::Null => ScalarKind::Dynamic,
        }
    }

    pub fn to_value(&self) -> DataValue {
        match self {
            Self::Bool(v) => DataValue::Bool(*v),
            Self::Int(v) => DataValue::Int(*v),
            Self::Long(v) => DataValue::Long(*v),
            Self::Real(v) => DataValue::Real(*v),
            Self::Decimal(v) => DataValue::Decimal(*v),
            Self::String(v) => DataValue::String(v.clone()),
            Self::DateTime(v) => DataValue::DateTime(*v),
            Self::Timespan(v) => DataValue::Timespan(*v),
            Self::Guid(v) => DataValue::Guid(v.clone()),
            Self::Dynamic(v) => DataValue::Dynamic(v.clone()),
            Self::Null => DataValue::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
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
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InOp {
    In,
    NotIn,
    InCs,
    NotInCs,
    HasAny,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    /// The called name, or a dotted path ending in a name.
    pub callee: Box<Expr>,
    pub args: Vec<Arg>,
}

impl CallExpr {
    /// The simple name of the callee, if it is an unqualified name.
    pub fn simple_name(&self) -> Option<&Ident> {
        match &self.callee.kind {
            ExprKind::Name(ident) => Some(ident),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Arg {
    /// Set for `name = value` named arguments.
    pub name: Option<Ident>,
    pub value: Expr,
}

/// `name = expr` or a bare expression in projection-like positions.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub name: Option<Ident>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone)]
pub struct OrderedExpr {
    pub expr: Expr,
    pub dir: Option<SortDir>,
    pub nulls: Option<NullsOrder>,
}

/// A column name pattern in `project-away`-like lists: `Name` or `Prefix*`.
#[derive(Debug, Clone)]
pub struct WildName {
    pub prefix: Ident,
    pub wildcard: bool,
}

impl WildName {
    pub fn matches(&self, name: &str) -> bool {
        if self.wildcard {
            let p = self.prefix.name.as_bytes();
            let n = name.as_bytes();
            n.len() >= p.len() && n[..p.len()].eq_ignore_ascii_case(p)
        } else {
            self.prefix.eq_ignore_case(name)
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipeOperator {
    pub id: NodeId,
    pub span: Span,
    pub kind: OpKind,
}

/// An operator pipeline with the source elided; the input row scope is
/// supplied by the enclosing operator (`fork`, `partition`, `mv-apply`).
#[derive(Debug, Clone)]
pub struct SubPipe {
    pub operators: Vec<PipeOperator>,
}

#[derive(Debug, Clone)]
pub struct JoinOnClause {
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct MvExpandItem {
    pub expr: Expr,
    pub to_type: Option<(TypeExpr, Span)>,
}

#[derive(Debug, Clone)]
pub enum ParsePart {
    Str(String),
    Column { name: Ident, ty: Option<ScalarKind> },
    Star,
}

#[derive(Debug, Clone)]
pub struct TopNestedLevel {
    pub count: Option<Expr>,
    pub of: Assignment,
    pub by: Assignment,
}

#[derive(Debug, Clone)]
pub struct MakeSeriesClause {
    pub aggregate: Assignment,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum OpKind {
    Where { predicate: Expr },
    Extend { assignments: Vec<Assignment> },
    Project { items: Vec<Assignment> },
    ProjectAway { names: Vec<WildName> },
    ProjectKeep { names: Vec<WildName> },
    ProjectRename { renames: Vec<(Ident, Ident)> },
    ProjectReorder { names: Vec<(WildName, Option<SortDir>)> },
    Summarize { aggregates: Vec<Assignment>, by: Vec<Assignment> },
    Distinct { columns: Vec<Expr> },
    Count { as_name: Option<Ident> },
    Take { count: Expr },
    Top { count: Expr, by: Vec<OrderedExpr> },
    TopNested { levels: Vec<TopNestedLevel> },
    TopHitters { count: Expr, of: Expr, by: Option<Expr> },
    Sort { by: Vec<OrderedExpr> },
    Sample { count: Expr },
    SampleDistinct { count: Expr, of: Expr },
    Serialize { assignments: Vec<Assignment> },
    As { name: Ident },
    Join {
        kind: Option<Ident>,
        right: Box<Expr>,
        on: Vec<JoinOnClause>,
    },
    Lookup {
        kind: Option<Ident>,
        right: Box<Expr>,
        on: Vec<JoinOnClause>,
    },
    Union {
        kind: Option<Ident>,
        with_source: Option<Ident>,
        tables: Vec<Expr>,
    },
    MvExpand { items: Vec<MvExpandItem>, limit: Option<Expr> },
    MvApply {
        items: Vec<MvExpandItem>,
        limit: Option<Expr>,
        subquery: SubPipe,
    },
    MakeSeries {
        clauses: Vec<MakeSeriesClause>,
        on: Box<Expr>,
        from: Option<Box<Expr>>,
        to: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
        by: Vec<Assignment>,
    },
    Fork { branches: Vec<(Option<Ident>, SubPipe)> },
    Partition { by: Box<Expr>, subquery: SubPipe },
    Find { tables: Option<Vec<Expr>>, predicate: Box<Expr> },
    Search { tables: Option<Vec<Expr>>, predicate: Box<Expr> },
    Parse {
        kind: Option<Ident>,
        input: Box<Expr>,
        pattern: Vec<ParsePart>,
    },
    ParseWhere {
        kind: Option<Ident>,
        input: Box<Expr>,
        pattern: Vec<ParsePart>,
    },
    Reduce { by: Box<Expr> },
    Invoke { call: CallExpr },
    Evaluate { call: CallExpr },
    Render { chart: Ident },
    GetSchema,
    Consume,
}

impl OpKind {
    /// The operator's name as written in source, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Where { .. } => "where",
            Self::Extend { .. } => "extend",
            Self::Project { .. } => "project",
            Self::ProjectAway { .. } => "project-away",
            Self::ProjectKeep { .. } => "project-keep",
            Self::ProjectRename { .. } => "project-rename",
            Self::ProjectReorder { .. } => "project-reorder",
            Self::Summarize { .. } => "summarize",
            Self::Distinct { .. } => "distinct",
            Self::Count { .. } => "count",
            Self::Take { .. } => "take",
            Self::Top { .. } => "top",
            Self::TopNested { .. } => "top-nested",
            Self::TopHitters { .. } => "top-hitters",
            Self::Sort { .. } => "sort",
            Self::Sample { .. } => "sample",
            Self::SampleDistinct { .. } => "sample-distinct",
            Self::Serialize { .. } => "serialize",
            Self::As { .. } => "as",
            Self::Join { .. } => "join",
            Self::Lookup { .. } => "lookup",
            Self::Union { .. } => "union",
            Self::MvExpand { .. } => "mv-expand",
            Self::MvApply { .. } => "mv-apply",
            Self::MakeSeries { .. } => "make-series",
            Self::Fork { .. } => "fork",
            Self::Partition { .. } => "partition",
            Self::Find { .. } => "find",
            Self::Search { .. } => "search",
            Self::Parse { .. } => "parse",
            Self::ParseWhere { .. } => "parse-where",
            Self::Reduce { .. } => "reduce",
            Self::Invoke { .. } => "invoke",
            Self::Evaluate { .. } => "evaluate",
            Self::Render { .. } => "render",
            Self::GetSchema => "getschema",
            Self::Consume => "consume",
        }
    }
}
