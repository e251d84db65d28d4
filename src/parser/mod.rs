// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The lexer and recursive-descent parser for the query language.
//!
//! The binder treats the produced tree as immutable input: every node
//! carries a [`NodeId`] and a byte-offset [`Span`], and semantic results are
//! attached through a side table keyed by node id rather than by mutating
//! the tree.

mod ast;
mod grammar;
mod token;

pub use self::ast::*;
pub use self::grammar::{parse_function_body, parse_query};
pub use self::token::{tokenize, Span, Token, TokenKind};

/// The error type of parse operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at offset {}", span.start)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("expected {expected}, found {found}")]
    ExpectedFound { expected: &'static str, found: String },
    #[error("unknown query operator {0:?}")]
    UnknownOperator(String),
    #[error("unknown type name {0:?}")]
    UnknownType(String),
    #[error("invalid numeric literal {0:?}")]
    InvalidNumber(String),
    #[error("unexpected end of input")]
    UnexpectedEnd,
}

impl ParseErrorKind {
    pub fn with_span(self, span: Span) -> ParseError {
        ParseError { kind: self, span }
    }
}
