// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Diagnostics produced during binding.
//!
//! The binder never returns an error to its caller for semantic problems:
//! every failure becomes a [`Diagnostic`] attached to a node's semantic
//! info, and binding continues with a best-effort result.

use crate::parser::Span;

/// A semantic problem anchored to a source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    #[error("{0:?} is not defined")]
    NameNotDefined(String),
    #[error("the function {0:?} is not defined")]
    FunctionNotDefined(String),
    #[error("the aggregate function {0:?} is not defined")]
    AggregateNotDefined(String),
    #[error("{0:?} refers to more than one item")]
    AmbiguousName(String),
    #[error("the call to {0:?} is ambiguous")]
    AmbiguousCall(String),
    #[error("{name:?} expects between {min} and {max} arguments, got {actual}")]
    WrongNumberOfArguments {
        name: String,
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("{function:?} argument {argument:?} expects {expected}, got {actual}")]
    WrongArgumentType {
        function: String,
        argument: String,
        expected: String,
        actual: String,
    },
    #[error("expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("a literal value is required")]
    LiteralRequired,
    #[error("a non-empty literal value is required")]
    NonEmptyLiteralRequired,
    #[error("a constant expression is required")]
    ConstantRequired,
    #[error("a column reference is required")]
    ColumnRequired,
    #[error("{0:?} is not a function")]
    NotAFunction(String),
    #[error("the function {0:?} requires an argument list")]
    NameRequiresArgumentList(String),
    #[error("the aggregate function {0:?} is not allowed in this context")]
    AggregateNotAllowed(String),
    #[error("the plug-in function {0:?} can only be invoked by `evaluate`")]
    PluginNotAllowed(String),
    #[error("a column named {0:?} is already declared")]
    DuplicateColumnDeclaration(String),
    #[error("no pattern mapping matches the arguments of {0:?}")]
    MissingPatternMatch(String),
    #[error("not a well-formed type expression")]
    InvalidTypeExpression,
    #[error("a star expression is not allowed here")]
    StarNotAllowed,
    #[error("a star expression must be the last argument")]
    StarMustBeLast,
    #[error("{function:?} has no parameter named {name:?}")]
    UnknownNamedArgument { function: String, name: String },
    #[error("the parameter {0:?} is given more than once")]
    DuplicateNamedArgument(String),
    #[error("unnamed arguments may not follow out-of-order named arguments")]
    UnnamedArgumentAfterOutOfOrder,
    #[error("{0:?} does not accept named arguments")]
    NamedArgumentsNotSupported(String),
    #[error("the join requires an `on` clause")]
    MissingJoinOn,
    #[error("{function:?} is missing the required parameter {parameter:?}")]
    MissingRequiredParameter { function: String, parameter: String },
    #[error("the value {value:?} is not one of the accepted values {allowed:?}")]
    ValueNotAllowed { value: String, allowed: String },
    #[error("{0:?} is not a valid join kind")]
    InvalidJoinKind(String),
    #[error("{0:?} is not a valid union kind")]
    InvalidUnionKind(String),
    #[error("{0:?} is not a known chart type")]
    UnknownChartType(String),
    #[error("the expression must be tabular to start a pipe")]
    InputNotTabular,
    #[error("the column {0:?} is not present on both sides of the join")]
    JoinColumnNotOnBothSides(String),
}

impl DiagnosticKind {
    pub fn with_span(self, span: Span) -> Diagnostic {
        Diagnostic { kind: self, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_format_like_messages() {
        let d = DiagnosticKind::NameNotDefined("foo".into()).with_span(Span::new(0, 3));
        assert_eq!(d.message(), "\"foo\" is not defined");
        let d = DiagnosticKind::WrongNumberOfArguments {
            name: "substring".into(),
            min: 2,
            max: 3,
            actual: 1,
        }
        .with_span(Span::new(0, 9));
        assert!(d.message().contains("between 2 and 3"));
    }
}
