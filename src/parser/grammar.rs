// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The recursive-descent grammar.
//!
//! Query operators are contextual keywords: they are only recognized right
//! after a `|`. Hyphenated operator names (`project-away`, `mv-expand`) are
//! merged from adjacent tokens here, not in the lexer.

use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::ast::*;
use super::token::{tokenize, Span, Token, TokenKind};
use super::{ParseError, ParseErrorKind};
use crate::types::ScalarKind;

/// Parse a top-level query block: statements separated by `;`.
pub fn parse_query(src: &str) -> Result<QueryBlock, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        next_id: 0,
    };
    parser.parse_block()
}

/// Parse a function body: `{ statements; expr }`, braces included.
///
/// Used by inline expansion; the resulting tree has its own node-id space.
pub fn parse_function_body(src: &str) -> Result<QueryBlock, ParseError> {
    let trimmed = src.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);
    parse_query(inner)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
}

impl<'a> Parser<'a> {
    fn parse_block(&mut self) -> Result<QueryBlock, ParseError> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.parse_statement()?);
            if !self.eat(&TokenKind::Semicolon) && !self.at_end() {
                return Err(self.expected("`;` or end of input"));
            }
        }
        Ok(QueryBlock {
            statements,
            node_count: self.next_id,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.peek_span();
        if self.at_ident("let") && matches!(self.kind_at(1), Some(TokenKind::Ident(_))) {
            self.advance();
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Eq, "`=`")?;
            let value = if self.lambda_ahead() {
                LetValue::Function(self.parse_function_decl()?)
            } else {
                LetValue::Scalar(self.parse_pipe_expr()?)
            };
            return Ok(Statement {
                id: self.id(),
                span: start.to(self.prev_span()),
                kind: StatementKind::Let { name, value },
            });
        }
        if self.at_ident("declare") && self.ident_at(1, "pattern") {
            self.advance();
            self.advance();
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Eq, "`=`")?;
            let decl = self.parse_pattern_decl()?;
            return Ok(Statement {
                id: self.id(),
                span: start.to(self.prev_span()),
                kind: StatementKind::DeclarePattern { name, decl },
            });
        }
        let expr = self.parse_pipe_expr()?;
        Ok(Statement {
            id: self.id(),
            span: expr.span,
            kind: StatementKind::Query(expr),
        })
    }

    /// True when `(` opens a lambda parameter list followed by `{`.
    fn lambda_ahead(&self) -> bool {
        if !matches!(self.kind_at(0), Some(TokenKind::LParen)) {
            return false;
        }
        let mut depth = 0usize;
        for (i, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(self.pos + i + 1).map(|t| &t.kind),
                            Some(TokenKind::LBrace)
                        );
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn parse_function_decl(&mut self) -> Result<FunctionDecl, ParseError> {
        let params = self.parse_param_decls()?;
        let (body, body_span) = self.parse_braced_body()?;
        Ok(FunctionDecl {
            params,
            body,
            body_span,
        })
    }

    fn parse_pattern_decl(&mut self) -> Result<PatternDecl, ParseError> {
        let params = self.parse_param_decls()?;
        let path = if self.eat(&TokenKind::LBracket) {
            let path = self.expect_ident()?;
            self.expect(&TokenKind::RBracket, "`]`")?;
            Some(path)
        } else {
            None
        };
        self.expect(&TokenKind::LBrace, "`{`")?;
        let mut mappings = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            mappings.push(self.parse_pattern_mapping()?);
        }
        Ok(PatternDecl {
            params,
            path,
            mappings,
        })
    }

    /// `('value', ...).('path') = { body };`
    fn parse_pattern_mapping(&mut self) -> Result<PatternMapping, ParseError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut values = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            values.push(self.parse_literal()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "`)` or `,`")?;
                break;
            }
        }
        let path_value = if self.eat(&TokenKind::Dot) {
            self.expect(&TokenKind::LParen, "`(`")?;
            let value = self.parse_literal()?;
            self.expect(&TokenKind::RParen, "`)`")?;
            Some(value)
        } else {
            None
        };
        self.expect(&TokenKind::Eq, "`=`")?;
        let (body, body_span) = self.parse_braced_body()?;
        let _ = self.eat(&TokenKind::Semicolon);
        Ok(PatternMapping {
            values,
            path_value,
            body,
            body_span,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let literal = match self.kind_at(0).cloned() {
            Some(TokenKind::String(s)) => Literal::String(s),
            Some(TokenKind::Long(v)) => Literal::Long(v),
            Some(TokenKind::Real(v)) => Literal::Real(v),
            Some(TokenKind::Duration(d)) => Literal::Timespan(d),
            Some(TokenKind::Ident(word)) if word == "true" || word == "false" => {
                Literal::Bool(word == "true")
            }
            _ => return Err(self.expected("a literal")),
        };
        self.advance();
        Ok(literal)
    }

    fn parse_param_decls(&mut self) -> Result<Vec<ParamDecl>, ParseError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon, "`:`")?;
            let ty = self.parse_type_expr()?;
            let default = if self.eat(&TokenKind::Eq) {
                Some(self.parse_or_expr()?)
            } else {
                None
            };
            params.push(ParamDecl { name, ty, default });
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "`)` or `,`")?;
                break;
            }
        }
        Ok(params)
    }

    /// A scalar type name, `(*)`, or a table schema `(a:long, b:string)`.
    fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        if self.eat(&TokenKind::LParen) {
            if self.eat(&TokenKind::Star) {
                self.expect(&TokenKind::RParen, "`)`")?;
                return Ok(TypeExpr::OpenTable);
            }
            let mut columns = Vec::new();
            while !self.eat(&TokenKind::RParen) {
                let name = self.expect_ident()?;
                self.expect(&TokenKind::Colon, "`:`")?;
                let kind = self.expect_scalar_type()?;
                columns.push((name.name, kind));
                if !self.eat(&TokenKind::Comma) {
                    self.expect(&TokenKind::RParen, "`)` or `,`")?;
                    break;
                }
            }
            return Ok(TypeExpr::Table(columns));
        }
        Ok(TypeExpr::Scalar(self.expect_scalar_type()?))
    }

    fn expect_scalar_type(&mut self) -> Result<ScalarKind, ParseError> {
        let ident = self.expect_ident()?;
        ScalarKind::from_name(&ident.name)
            .ok_or_else(|| ParseErrorKind::UnknownType(ident.name.clone()).with_span(ident.span))
    }

    /// Consume a `{ ... }` body, returning its raw text for later re-parse.
    fn parse_braced_body(&mut self) -> Result<(String, Span), ParseError> {
        let open = self.peek_span();
        self.expect(&TokenKind::LBrace, "`{`")?;
        let mut depth = 1usize;
        let mut close = open;
        while depth > 0 {
            let token = self
                .next()
                .ok_or_else(|| ParseErrorKind::UnexpectedEnd.with_span(open))?;
            match token.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    close = token.span;
                }
                _ => {}
            }
        }
        let span = open.to(close);
        let text = self.src[span.start as usize..span.end as usize].to_string();
        Ok((text, span))
    }

    // ===== expressions =====

    fn parse_pipe_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_or_expr()?;
        while self.eat(&TokenKind::Pipe) {
            let operator = self.parse_operator()?;
            let span = expr.span.to(self.prev_span());
            let id = self.id();
            expr = Expr {
                id,
                span,
                kind: ExprKind::Pipe {
                    input: Box::new(expr),
                    operator: Box::new(operator),
                },
            };
        }
        Ok(expr)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.at_ident("or") {
            self.advance();
            let right = self.parse_and_expr()?;
            left = self.binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_predicate()?;
        while self.at_ident("and") {
            self.advance();
            let right = self.parse_predicate()?;
            left = self.binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_predicate(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        if let Some(op) = self.peek_comparison() {
            self.advance_comparison(op);
            let right = self.parse_additive()?;
            return Ok(self.binary(op, left, right));
        }
        if let Some(op) = self.peek_word_operator()? {
            let right = self.parse_additive()?;
            return Ok(self.binary(op, left, right));
        }
        if let Some(op) = self.peek_in_operator() {
            self.expect(&TokenKind::LParen, "`(`")?;
            let mut list = Vec::new();
            while !self.eat(&TokenKind::RParen) {
                list.push(self.parse_or_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    self.expect(&TokenKind::RParen, "`)` or `,`")?;
                    break;
                }
            }
            let span = left.span.to(self.prev_span());
            let id = self.id();
            return Ok(Expr {
                id,
                span,
                kind: ExprKind::In {
                    op,
                    left: Box::new(left),
                    list,
                },
            });
        }
        if let Some(negated) = self.peek_between() {
            self.expect(&TokenKind::LParen, "`(`")?;
            let low = self.parse_additive()?;
            self.expect(&TokenKind::DotDot, "`..`")?;
            let high = self.parse_additive()?;
            self.expect(&TokenKind::RParen, "`)`")?;
            let span = left.span.to(self.prev_span());
            let id = self.id();
            return Ok(Expr {
                id,
                span,
                kind: ExprKind::Between {
                    negated,
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                },
            });
        }
        Ok(left)
    }

    fn peek_comparison(&self) -> Option<BinaryOp> {
        Some(match self.kind_at(0)? {
            TokenKind::EqEq => BinaryOp::Equal,
            TokenKind::BangEq => BinaryOp::NotEqual,
            TokenKind::Lt => BinaryOp::Less,
            TokenKind::LtEq => BinaryOp::LessOrEqual,
            TokenKind::Gt => BinaryOp::Greater,
            TokenKind::GtEq => BinaryOp::GreaterOrEqual,
            TokenKind::EqTilde => BinaryOp::EqualTilde,
            TokenKind::BangTilde => BinaryOp::BangTilde,
            _ => return None,
        })
    }

    fn advance_comparison(&mut self, _op: BinaryOp) {
        self.advance();
    }

    /// Word-shaped string operators, including `!`-negated forms and
    /// `matches regex`.
    fn peek_word_operator(&mut self) -> Result<Option<BinaryOp>, ParseError> {
        let (negated, offset) = if matches!(self.kind_at(0), Some(TokenKind::Bang))
            && self.adjacent(0, 1)
            && matches!(self.kind_at(1), Some(TokenKind::Ident(_)))
        {
            (true, 1)
        } else {
            (false, 0)
        };
        let Some(TokenKind::Ident(word)) = self.kind_at(offset) else {
            return Ok(None);
        };
        let op = match (word.as_str(), negated) {
            ("contains", false) => BinaryOp::Contains,
            ("contains", true) => BinaryOp::NotContains,
            ("contains_cs", false) => BinaryOp::ContainsCs,
            ("contains_cs", true) => BinaryOp::NotContainsCs,
            ("startswith", false) => BinaryOp::StartsWith,
            ("startswith", true) => BinaryOp::NotStartsWith,
            ("startswith_cs", false) => BinaryOp::StartsWithCs,
            ("startswith_cs", true) => BinaryOp::NotStartsWithCs,
            ("endswith", false) => BinaryOp::EndsWith,
            ("endswith", true) => BinaryOp::NotEndsWith,
            ("endswith_cs", false) => BinaryOp::EndsWithCs,
            ("endswith_cs", true) => BinaryOp::NotEndsWithCs,
            ("has", false) => BinaryOp::Has,
            ("has", true) => BinaryOp::NotHas,
            ("has_cs", false) => BinaryOp::HasCs,
            ("has_cs", true) => BinaryOp::NotHasCs,
            ("hasprefix", false) => BinaryOp::HasPrefix,
            ("hasprefix", true) => BinaryOp::NotHasPrefix,
            ("hassuffix", false) => BinaryOp::HasSuffix,
            ("hassuffix", true) => BinaryOp::NotHasSuffix,
            ("like", false) => BinaryOp::Like,
            ("like", true) => BinaryOp::NotLike,
            ("like_cs", false) => BinaryOp::LikeCs,
            ("like_cs", true) => BinaryOp::NotLikeCs,
            ("matches", false) if self.ident_at(offset + 1, "regex") => {
                self.advance(); // matches
                self.advance(); // regex
                return Ok(Some(BinaryOp::MatchRegex));
            }
            _ => return Ok(None),
        };
        if negated {
            self.advance();
        }
        self.advance();
        Ok(Some(op))
    }

    fn peek_in_operator(&mut self) -> Option<InOp> {
        let (negated, offset) = if matches!(self.kind_at(0), Some(TokenKind::Bang))
            && self.adjacent(0, 1)
        {
            (true, 1)
        } else {
            (false, 0)
        };
        match self.kind_at(offset)? {
            TokenKind::Ident(word) if word == "in" => {
                let tilde =
                    matches!(self.kind_at(offset + 1), Some(TokenKind::Tilde))
                        && self.adjacent(offset, offset + 1);
                let op = match (negated, tilde) {
                    (false, false) => InOp::In,
                    (true, false) => InOp::NotIn,
                    (false, true) => InOp::InCs,
                    (true, true) => InOp::NotInCs,
                };
                for _ in 0..(offset + 1 + usize::from(tilde)) {
                    self.advance();
                }
                Some(op)
            }
            TokenKind::Ident(word) if word == "has_any" && !negated => {
                self.advance();
                Some(InOp::HasAny)
            }
            _ => None,
        }
    }

    fn peek_between(&mut self) -> Option<bool> {
        let (negated, offset) = if matches!(self.kind_at(0), Some(TokenKind::Bang))
            && self.adjacent(0, 1)
        {
            (true, 1)
        } else {
            (false, 0)
        };
        if self.ident_at(offset, "between") {
            for _ in 0..=offset {
                self.advance();
            }
            Some(negated)
        } else {
            None
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind_at(0) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.kind_at(0) {
                Some(TokenKind::Star) => BinaryOp::Multiply,
                Some(TokenKind::Slash) => BinaryOp::Divide,
                Some(TokenKind::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span();
        let op = match self.kind_at(0) {
            Some(TokenKind::Plus) => Some(UnaryOp::Plus),
            Some(TokenKind::Minus) => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            let id = self.id();
            return Ok(Expr {
                id,
                span,
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let name = self.expect_ident()?;
                let span = expr.span.to(name.span);
                let id = self.id();
                expr = Expr {
                    id,
                    span,
                    kind: ExprKind::Path {
                        left: Box::new(expr),
                        name,
                    },
                };
            } else if matches!(self.kind_at(0), Some(TokenKind::LParen))
                && matches!(expr.kind, ExprKind::Name(_) | ExprKind::Path { .. })
            {
                let args = self.parse_call_args()?;
                let span = expr.span.to(self.prev_span());
                let id = self.id();
                expr = Expr {
                    id,
                    span,
                    kind: ExprKind::Call(CallExpr {
                        callee: Box::new(expr),
                        args,
                    }),
                };
            } else if matches!(self.kind_at(0), Some(TokenKind::LBracket)) {
                self.advance();
                let index = self.parse_or_expr()?;
                self.expect(&TokenKind::RBracket, "`]`")?;
                let span = expr.span.to(self.prev_span());
                let id = self.id();
                expr = Expr {
                    id,
                    span,
                    kind: ExprKind::Element {
                        left: Box::new(expr),
                        index: Box::new(index),
                    },
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            let name = if matches!(self.kind_at(0), Some(TokenKind::Ident(_)))
                && matches!(self.kind_at(1), Some(TokenKind::Eq))
            {
                let ident = self.expect_ident()?;
                self.advance(); // =
                Some(ident)
            } else {
                None
            };
            let value = if matches!(self.kind_at(0), Some(TokenKind::Star)) {
                let span = self.peek_span();
                self.advance();
                let id = self.id();
                Expr {
                    id,
                    span,
                    kind: ExprKind::Star,
                }
            } else {
                self.parse_pipe_expr()?
            };
            args.push(Arg { name, value });
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "`)` or `,`")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span();
        let Some(kind) = self.kind_at(0).cloned() else {
            return Err(ParseErrorKind::UnexpectedEnd.with_span(self.prev_span()));
        };
        match kind {
            TokenKind::Long(v) => {
                self.advance();
                Ok(self.literal(start, Literal::Long(v)))
            }
            TokenKind::Real(v) => {
                self.advance();
                Ok(self.literal(start, Literal::Real(v)))
            }
            TokenKind::Duration(d) => {
                self.advance();
                Ok(self.literal(start, Literal::Timespan(d)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(self.literal(start, Literal::String(s)))
            }
            TokenKind::Star => {
                self.advance();
                let id = self.id();
                Ok(Expr {
                    id,
                    span: start,
                    kind: ExprKind::Star,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_pipe_expr()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                let span = start.to(self.prev_span());
                let id = self.id();
                Ok(Expr {
                    id,
                    span,
                    kind: ExprKind::Paren(Box::new(inner)),
                })
            }
            TokenKind::Ident(word) => self.parse_ident_primary(start, word),
            other => Err(ParseErrorKind::ExpectedFound {
                expected: "an expression",
                found: format!("{other:?}"),
            }
            .with_span(start)),
        }
    }

    fn parse_ident_primary(&mut self, start: Span, word: String) -> Result<Expr, ParseError> {
        match word.as_str() {
            "true" | "false" => {
                self.advance();
                return Ok(self.literal(start, Literal::Bool(word == "true")));
            }
            "datatable" if matches!(self.kind_at(1), Some(TokenKind::LParen)) => {
                return self.parse_datatable(start);
            }
            "range"
                if matches!(self.kind_at(1), Some(TokenKind::Ident(_)))
                    && self.ident_at(2, "from") =>
            {
                return self.parse_range(start);
            }
            "print" => {
                self.advance();
                let items = self.parse_assignments()?;
                let span = start.to(self.prev_span());
                let id = self.id();
                return Ok(Expr {
                    id,
                    span,
                    kind: ExprKind::Print { items },
                });
            }
            "typeof" if matches!(self.kind_at(1), Some(TokenKind::LParen)) => {
                self.advance();
                self.advance();
                let ty = if self.eat(&TokenKind::Star) {
                    TypeExpr::OpenTable
                } else if matches!(self.kind_at(1), Some(TokenKind::Colon)) {
                    let mut columns = Vec::new();
                    loop {
                        let name = self.expect_ident()?;
                        self.expect(&TokenKind::Colon, "`:`")?;
                        let kind = self.expect_scalar_type()?;
                        columns.push((name.name, kind));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    TypeExpr::Table(columns)
                } else {
                    TypeExpr::Scalar(self.expect_scalar_type()?)
                };
                self.expect(&TokenKind::RParen, "`)`")?;
                let span = start.to(self.prev_span());
                let id = self.id();
                return Ok(Expr {
                    id,
                    span,
                    kind: ExprKind::TypeOf(ty),
                });
            }
            "int" | "long" | "real" | "double" | "decimal" | "datetime" | "date" | "timespan"
            | "time" | "guid" | "uuid" | "dynamic"
                if matches!(self.kind_at(1), Some(TokenKind::LParen)) =>
            {
                return self.parse_typed_literal(start, &word);
            }
            _ => {}
        }
        let ident = self.expect_ident()?;
        let id = self.id();
        Ok(Expr {
            id,
            span: ident.span,
            kind: ExprKind::Name(ident),
        })
    }

    /// `name(...)`-shaped literals: the parenthesized text is re-read from
    /// the source so datetime and guid bodies need no special lexing.
    fn parse_typed_literal(&mut self, start: Span, name: &str) -> Result<Expr, ParseError> {
        self.advance(); // name
        let open = self.peek_span();
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut depth = 1usize;
        let mut close = open;
        while depth > 0 {
            let token = self
                .next()
                .ok_or_else(|| ParseErrorKind::UnexpectedEnd.with_span(open))?;
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    close = token.span;
                }
                _ => {}
            }
        }
        let raw = self.src[open.end as usize..close.start as usize].trim();
        let text = raw
            .strip_prefix(['\'', '"'])
            .and_then(|s| s.strip_suffix(['\'', '"']))
            .unwrap_or(raw);
        let span = start.to(close);
        let literal = match name {
            "int" => Literal::Int(
                text.parse()
                    .map_err(|_| ParseErrorKind::InvalidNumber(text.into()).with_span(span))?,
            ),
            "long" => Literal::Long(
                text.parse()
                    .map_err(|_| ParseErrorKind::InvalidNumber(text.into()).with_span(span))?,
            ),
            "real" | "double" => Literal::Real(
                text.parse()
                    .map_err(|_| ParseErrorKind::InvalidNumber(text.into()).with_span(span))?,
            ),
            "decimal" => Literal::Decimal(
                text.parse()
                    .map_err(|_| ParseErrorKind::InvalidNumber(text.into()).with_span(span))?,
            ),
            "datetime" | "date" => Literal::DateTime(
                parse_datetime(text)
                    .ok_or_else(|| ParseErrorKind::InvalidNumber(text.into()).with_span(span))?,
            ),
            "timespan" | "time" => Literal::Timespan(
                parse_timespan(text)
                    .ok_or_else(|| ParseErrorKind::InvalidNumber(text.into()).with_span(span))?,
            ),
            "guid" | "uuid" => Literal::Guid(text.to_string()),
            "dynamic" => Literal::Dynamic(raw.to_string()),
            _ => unreachable!("caller matched the literal name"),
        };
        let id = self.id();
        Ok(Expr {
            id,
            span,
            kind: ExprKind::Literal(literal),
        })
    }

    fn parse_datatable(&mut self, start: Span) -> Result<Expr, ParseError> {
        self.advance(); // datatable
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut columns = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon, "`:`")?;
            let kind = self.expect_scalar_type()?;
            columns.push((name, kind));
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "`)` or `,`")?;
                break;
            }
        }
        self.expect(&TokenKind::LBracket, "`[`")?;
        let mut values = Vec::new();
        while !self.eat(&TokenKind::RBracket) {
            values.push(self.parse_or_expr()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBracket, "`]` or `,`")?;
                break;
            }
        }
        let span = start.to(self.prev_span());
        let id = self.id();
        Ok(Expr {
            id,
            span,
            kind: ExprKind::Datatable { columns, values },
        })
    }

    fn parse_range(&mut self, start: Span) -> Result<Expr, ParseError> {
        self.advance(); // range
        let name = self.expect_ident()?;
        self.expect_keyword("from")?;
        let from = self.parse_additive()?;
        self.expect_keyword("to")?;
        let to = self.parse_additive()?;
        self.expect_keyword("step")?;
        let step = self.parse_additive()?;
        let span = start.to(self.prev_span());
        let id = self.id();
        Ok(Expr {
            id,
            span,
            kind: ExprKind::Range {
                name,
                from: Box::new(from),
                to: Box::new(to),
                step: Box::new(step),
            },
        })
    }

    // ===== query operators =====

    fn parse_operator(&mut self) -> Result<PipeOperator, ParseError> {
        let start = self.peek_span();
        let name = self.parse_operator_name()?;
        let kind = match name.as_str() {
            "where" | "filter" => OpKind::Where {
                predicate: self.parse_or_expr()?,
            },
            "extend" => OpKind::Extend {
                assignments: self.parse_assignments()?,
            },
            "project" => OpKind::Project {
                items: self.parse_assignments()?,
            },
            "project-away" => OpKind::ProjectAway {
                names: self.parse_wild_names()?,
            },
            "project-keep" => OpKind::ProjectKeep {
                names: self.parse_wild_names()?,
            },
            "project-rename" => {
                let mut renames = Vec::new();
                loop {
                    let new = self.expect_ident()?;
                    self.expect(&TokenKind::Eq, "`=`")?;
                    let old = self.expect_ident()?;
                    renames.push((new, old));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                OpKind::ProjectRename { renames }
            }
            "project-reorder" => {
                let mut names = Vec::new();
                loop {
                    let name = self.parse_wild_name()?;
                    let dir = self.parse_sort_dir();
                    names.push((name, dir));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                OpKind::ProjectReorder { names }
            }
            "summarize" => {
                let mut aggregates = Vec::new();
                if !self.at_ident("by") {
                    aggregates = self.parse_assignments()?;
                }
                let by = if self.at_ident("by") {
                    self.advance();
                    self.parse_assignments()?
                } else {
                    Vec::new()
                };
                OpKind::Summarize { aggregates, by }
            }
            "distinct" => {
                let mut columns = Vec::new();
                loop {
                    columns.push(if matches!(self.kind_at(0), Some(TokenKind::Star)) {
                        let span = self.peek_span();
                        self.advance();
                        let id = self.id();
                        Expr {
                            id,
                            span,
                            kind: ExprKind::Star,
                        }
                    } else {
                        self.parse_or_expr()?
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                OpKind::Distinct { columns }
            }
            "count" => OpKind::Count { as_name: None },
            "take" | "limit" => OpKind::Take {
                count: self.parse_or_expr()?,
            },
            "top" => {
                let count = self.parse_additive()?;
                self.expect_keyword("by")?;
                OpKind::Top {
                    count,
                    by: self.parse_ordered_exprs()?,
                }
            }
            "top-nested" => {
                let mut levels = vec![self.parse_top_nested_level()?];
                while self.eat(&TokenKind::Comma) {
                    // each level repeats the operator name
                    let next = self.parse_operator_name()?;
                    if next != "top-nested" {
                        return Err(ParseErrorKind::Expected("`top-nested`")
                            .with_span(self.prev_span()));
                    }
                    levels.push(self.parse_top_nested_level()?);
                }
                OpKind::TopNested { levels }
            }
            "top-hitters" => {
                let count = self.parse_additive()?;
                self.expect_keyword("of")?;
                let of = self.parse_additive()?;
                let by = if self.at_ident("by") {
                    self.advance();
                    Some(self.parse_or_expr()?)
                } else {
                    None
                };
                OpKind::TopHitters { count, of, by }
            }
            "sort" | "order" => {
                self.expect_keyword("by")?;
                OpKind::Sort {
                    by: self.parse_ordered_exprs()?,
                }
            }
            "sample" => OpKind::Sample {
                count: self.parse_or_expr()?,
            },
            "sample-distinct" => {
                let count = self.parse_additive()?;
                self.expect_keyword("of")?;
                OpKind::SampleDistinct {
                    count,
                    of: self.parse_or_expr()?,
                }
            }
            "serialize" => {
                let assignments = if self.at_operator_boundary() {
                    Vec::new()
                } else {
                    self.parse_assignments()?
                };
                OpKind::Serialize { assignments }
            }
            "as" => OpKind::As {
                name: self.expect_ident()?,
            },
            "join" => {
                let kind = self.parse_kind_parameter()?;
                let right = self.parse_parenthesized_expr()?;
                let on = self.parse_join_on()?;
                OpKind::Join {
                    kind,
                    right: Box::new(right),
                    on,
                }
            }
            "lookup" => {
                let kind = self.parse_kind_parameter()?;
                let right = self.parse_parenthesized_expr()?;
                let on = self.parse_join_on()?;
                OpKind::Lookup {
                    kind,
                    right: Box::new(right),
                    on,
                }
            }
            "union" => {
                let kind = self.parse_kind_parameter()?;
                let with_source = if self.at_ident("withsource") {
                    self.advance();
                    self.expect(&TokenKind::Eq, "`=`")?;
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                let mut tables = vec![self.parse_union_operand()?];
                while self.eat(&TokenKind::Comma) {
                    tables.push(self.parse_union_operand()?);
                }
                OpKind::Union {
                    kind,
                    with_source,
                    tables,
                }
            }
            "mv-expand" => {
                let items = self.parse_mv_items()?;
                let limit = self.parse_limit_clause()?;
                OpKind::MvExpand { items, limit }
            }
            "mv-apply" => {
                let items = self.parse_mv_items()?;
                let limit = self.parse_limit_clause()?;
                self.expect_keyword("on")?;
                self.expect(&TokenKind::LParen, "`(`")?;
                let subquery = self.parse_sub_pipe()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                OpKind::MvApply {
                    items,
                    limit,
                    subquery,
                }
            }
            "make-series" => self.parse_make_series()?,
            "fork" => {
                let mut branches = Vec::new();
                loop {
                    let name = if matches!(self.kind_at(0), Some(TokenKind::Ident(_)))
                        && matches!(self.kind_at(1), Some(TokenKind::Eq))
                    {
                        let ident = self.expect_ident()?;
                        self.advance();
                        Some(ident)
                    } else {
                        None
                    };
                    if !matches!(self.kind_at(0), Some(TokenKind::LParen)) {
                        if branches.is_empty() {
                            return Err(self.expected("`(`"));
                        }
                        break;
                    }
                    self.advance();
                    let pipe = self.parse_sub_pipe()?;
                    self.expect(&TokenKind::RParen, "`)`")?;
                    branches.push((name, pipe));
                }
                OpKind::Fork { branches }
            }
            "partition" => {
                self.expect_keyword("by")?;
                let by = self.parse_additive()?;
                self.expect(&TokenKind::LParen, "`(`")?;
                let subquery = self.parse_sub_pipe()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                OpKind::Partition {
                    by: Box::new(by),
                    subquery,
                }
            }
            "find" => {
                let tables = self.parse_in_tables()?;
                self.expect_keyword("where")?;
                OpKind::Find {
                    tables,
                    predicate: Box::new(self.parse_or_expr()?),
                }
            }
            "search" => {
                let kind = self.parse_kind_parameter()?;
                let _ = kind; // only the default search kind affects binding
                let tables = self.parse_in_tables()?;
                OpKind::Search {
                    tables,
                    predicate: Box::new(self.parse_or_expr()?),
                }
            }
            "parse" | "parse-where" => {
                let kind = self.parse_kind_parameter()?;
                let input = self.parse_additive()?;
                self.expect_keyword("with")?;
                let pattern = self.parse_parse_pattern()?;
                if name == "parse" {
                    OpKind::Parse {
                        kind,
                        input: Box::new(input),
                        pattern,
                    }
                } else {
                    OpKind::ParseWhere {
                        kind,
                        input: Box::new(input),
                        pattern,
                    }
                }
            }
            "reduce" => {
                self.expect_keyword("by")?;
                OpKind::Reduce {
                    by: Box::new(self.parse_or_expr()?),
                }
            }
            "invoke" => {
                let call = self.parse_operator_call()?;
                OpKind::Invoke { call }
            }
            "evaluate" => {
                let call = self.parse_operator_call()?;
                OpKind::Evaluate { call }
            }
            "render" => OpKind::Render {
                chart: self.expect_ident()?,
            },
            "getschema" => OpKind::GetSchema,
            "consume" => OpKind::Consume,
            other => {
                return Err(ParseErrorKind::UnknownOperator(other.into()).with_span(start));
            }
        };
        Ok(PipeOperator {
            id: self.id(),
            span: start.to(self.prev_span()),
            kind,
        })
    }

    /// Read an operator name, merging `a - b` into `a-b` when the tokens
    /// are adjacent in source.
    fn parse_operator_name(&mut self) -> Result<String, ParseError> {
        let first = self.expect_ident()?;
        let mergeable = matches!(
            first.name.as_str(),
            "project" | "mv" | "make" | "top" | "sample" | "parse"
        );
        if mergeable
            && matches!(self.kind_at(0), Some(TokenKind::Minus))
            && self.adjacent_to_prev(0)
            && matches!(self.kind_at(1), Some(TokenKind::Ident(_)))
            && self.adjacent(0, 1)
        {
            self.advance(); // -
            let second = self.expect_ident()?;
            return Ok(format!("{}-{}", first.name, second.name));
        }
        Ok(first.name)
    }

    fn parse_top_nested_level(&mut self) -> Result<TopNestedLevel, ParseError> {
        let count = if matches!(self.kind_at(0), Some(TokenKind::Long(_))) {
            Some(self.parse_additive()?)
        } else {
            None
        };
        self.expect_keyword("of")?;
        let of = self.parse_assignment()?;
        self.expect_keyword("by")?;
        let by = self.parse_assignment()?;
        Ok(TopNestedLevel { count, of, by })
    }

    fn parse_make_series(&mut self) -> Result<OpKind, ParseError> {
        let mut clauses = Vec::new();
        loop {
            let aggregate = self.parse_assignment()?;
            let default = if self.at_ident("default") {
                self.advance();
                self.expect(&TokenKind::Eq, "`=`")?;
                Some(self.parse_or_expr()?)
            } else {
                None
            };
            clauses.push(MakeSeriesClause { aggregate, default });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_keyword("on")?;
        let on = self.parse_additive()?;
        let (mut from, mut to, mut step) = (None, None, None);
        if self.at_ident("from") {
            self.advance();
            from = Some(Box::new(self.parse_additive()?));
        }
        if self.at_ident("to") {
            self.advance();
            to = Some(Box::new(self.parse_additive()?));
        }
        if self.at_ident("step") {
            self.advance();
            step = Some(Box::new(self.parse_additive()?));
        }
        let by = if self.at_ident("by") {
            self.advance();
            self.parse_assignments()?
        } else {
            Vec::new()
        };
        Ok(OpKind::MakeSeries {
            clauses,
            on: Box::new(on),
            from,
            to,
            step,
            by,
        })
    }

    fn parse_operator_call(&mut self) -> Result<CallExpr, ParseError> {
        let callee = self.parse_postfix()?;
        match callee.kind {
            ExprKind::Call(call) => Ok(call),
            _ => Err(self.expected("a function call")),
        }
    }

    fn parse_in_tables(&mut self) -> Result<Option<Vec<Expr>>, ParseError> {
        if !self.at_ident("in") {
            return Ok(None);
        }
        self.advance();
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut tables = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            tables.push(self.parse_pipe_expr()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "`)` or `,`")?;
                break;
            }
        }
        Ok(Some(tables))
    }

    fn parse_parse_pattern(&mut self) -> Result<Vec<ParsePart>, ParseError> {
        let mut parts = Vec::new();
        loop {
            match self.kind_at(0) {
                Some(TokenKind::Star) => {
                    self.advance();
                    parts.push(ParsePart::Star);
                }
                Some(TokenKind::String(_)) => {
                    let Some(TokenKind::String(s)) = self.kind_at(0).cloned() else {
                        unreachable!()
                    };
                    self.advance();
                    parts.push(ParsePart::Str(s));
                }
                Some(TokenKind::Ident(_)) => {
                    let name = self.expect_ident()?;
                    let ty = if self.eat(&TokenKind::Colon) {
                        Some(self.expect_scalar_type()?)
                    } else {
                        None
                    };
                    parts.push(ParsePart::Column { name, ty });
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            return Err(self.expected("a parse pattern"));
        }
        Ok(parts)
    }

    fn parse_mv_items(&mut self) -> Result<Vec<MvExpandItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_or_expr()?;
            let to_type = if self.at_ident("to") {
                self.advance();
                let start = self.peek_span();
                self.expect_keyword("typeof")?;
                self.expect(&TokenKind::LParen, "`(`")?;
                let ty = self.parse_typeof_body()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Some((ty, start.to(self.prev_span())))
            } else {
                None
            };
            items.push(MvExpandItem { expr, to_type });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_typeof_body(&mut self) -> Result<TypeExpr, ParseError> {
        if self.eat(&TokenKind::Star) {
            return Ok(TypeExpr::OpenTable);
        }
        if matches!(self.kind_at(1), Some(TokenKind::Colon)) {
            let mut columns = Vec::new();
            loop {
                let name = self.expect_ident()?;
                self.expect(&TokenKind::Colon, "`:`")?;
                let kind = self.expect_scalar_type()?;
                columns.push((name.name, kind));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            return Ok(TypeExpr::Table(columns));
        }
        Ok(TypeExpr::Scalar(self.expect_scalar_type()?))
    }

    fn parse_limit_clause(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.at_ident("limit") {
            self.advance();
            Ok(Some(self.parse_or_expr()?))
        } else {
            Ok(None)
        }
    }

    fn parse_sub_pipe(&mut self) -> Result<SubPipe, ParseError> {
        // leading `|` is allowed but not required
        let _ = self.eat(&TokenKind::Pipe);
        let mut operators = vec![self.parse_operator()?];
        while self.eat(&TokenKind::Pipe) {
            operators.push(self.parse_operator()?);
        }
        Ok(SubPipe { operators })
    }

    fn parse_kind_parameter(&mut self) -> Result<Option<Ident>, ParseError> {
        if self.at_ident("kind") && matches!(self.kind_at(1), Some(TokenKind::Eq)) {
            self.advance();
            self.advance();
            Ok(Some(self.expect_ident()?))
        } else {
            Ok(None)
        }
    }

    fn parse_parenthesized_expr(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let inner = self.parse_pipe_expr()?;
        self.expect(&TokenKind::RParen, "`)`")?;
        Ok(inner)
    }

    fn parse_union_operand(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.kind_at(0), Some(TokenKind::LParen)) {
            self.parse_parenthesized_expr()
        } else {
            self.parse_postfix()
        }
    }

    fn parse_join_on(&mut self) -> Result<Vec<JoinOnClause>, ParseError> {
        if !self.at_ident("on") {
            return Ok(Vec::new());
        }
        self.advance();
        let mut clauses = vec![JoinOnClause {
            expr: self.parse_or_expr()?,
        }];
        while self.eat(&TokenKind::Comma) {
            clauses.push(JoinOnClause {
                expr: self.parse_or_expr()?,
            });
        }
        Ok(clauses)
    }

    fn parse_ordered_exprs(&mut self) -> Result<Vec<OrderedExpr>, ParseError> {
        let mut exprs = Vec::new();
        loop {
            let expr = self.parse_or_expr()?;
            let dir = self.parse_sort_dir();
            let nulls = if self.at_ident("nulls") {
                self.advance();
                if self.at_ident("first") {
                    self.advance();
                    Some(NullsOrder::First)
                } else if self.at_ident("last") {
                    self.advance();
                    Some(NullsOrder::Last)
                } else {
                    return Err(self.expected("`first` or `last`"));
                }
            } else {
                None
            };
            exprs.push(OrderedExpr { expr, dir, nulls });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    fn parse_sort_dir(&mut self) -> Option<SortDir> {
        if self.at_ident("asc") {
            self.advance();
            Some(SortDir::Asc)
        } else if self.at_ident("desc") {
            self.advance();
            Some(SortDir::Desc)
        } else {
            None
        }
    }

    fn parse_wild_names(&mut self) -> Result<Vec<WildName>, ParseError> {
        let mut names = vec![self.parse_wild_name()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.parse_wild_name()?);
        }
        Ok(names)
    }

    fn parse_wild_name(&mut self) -> Result<WildName, ParseError> {
        let prefix = self.expect_ident()?;
        let wildcard = matches!(self.kind_at(0), Some(TokenKind::Star))
            && self.adjacent_to_prev(0);
        if wildcard {
            self.advance();
        }
        Ok(WildName { prefix, wildcard })
    }

    fn parse_assignments(&mut self) -> Result<Vec<Assignment>, ParseError> {
        let mut assignments = vec![self.parse_assignment()?];
        while self.eat(&TokenKind::Comma) {
            assignments.push(self.parse_assignment()?);
        }
        Ok(assignments)
    }

    fn parse_assignment(&mut self) -> Result<Assignment, ParseError> {
        let name = if matches!(self.kind_at(0), Some(TokenKind::Ident(_)))
            && matches!(self.kind_at(1), Some(TokenKind::Eq))
        {
            let ident = self.expect_ident()?;
            self.advance(); // =
            Some(ident)
        } else {
            None
        };
        let value = if matches!(self.kind_at(0), Some(TokenKind::Star)) && name.is_none() {
            let span = self.peek_span();
            self.advance();
            let id = self.id();
            Expr {
                id,
                span,
                kind: ExprKind::Star,
            }
        } else {
            self.parse_or_expr()?
        };
        Ok(Assignment { name, value })
    }

    /// True when the next token ends the current operator clause.
    fn at_operator_boundary(&self) -> bool {
        matches!(
            self.kind_at(0),
            None | Some(TokenKind::Pipe | TokenKind::Semicolon | TokenKind::RParen)
        )
    }

    // ===== plumbing =====

    fn id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn literal(&mut self, span: Span, literal: Literal) -> Expr {
        let id = self.id();
        Expr {
            id,
            span,
            kind: ExprKind::Literal(literal),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.to(right.span);
        let id = self.id();
        Expr {
            id,
            span,
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| self.prev_span())
    }

    fn prev_span(&self) -> Span {
        self.tokens
            .get(self.pos.wrapping_sub(1))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    /// Whether tokens at the two offsets touch in source, with no trivia
    /// between them.
    fn adjacent(&self, a: usize, b: usize) -> bool {
        match (self.tokens.get(self.pos + a), self.tokens.get(self.pos + b)) {
            (Some(x), Some(y)) => x.span.end == y.span.start,
            _ => false,
        }
    }

    fn adjacent_to_prev(&self, offset: usize) -> bool {
        match (
            self.tokens.get(self.pos.wrapping_sub(1)),
            self.tokens.get(self.pos + offset),
        ) {
            (Some(x), Some(y)) => x.span.end == y.span.start,
            _ => false,
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.kind_at(0) == Some(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &'static str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    fn expect_keyword(&mut self, word: &'static str) -> Result<(), ParseError> {
        if self.at_ident(word) {
            self.advance();
            Ok(())
        } else {
            Err(ParseErrorKind::Expected(word).with_span(self.peek_span()))
        }
    }

    fn at_ident(&self, text: &str) -> bool {
        matches!(self.kind_at(0), Some(TokenKind::Ident(s)) if s == text)
    }

    fn ident_at(&self, offset: usize, text: &str) -> bool {
        matches!(self.kind_at(offset), Some(TokenKind::Ident(s)) if s == text)
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        match self.kind_at(0).cloned() {
            Some(TokenKind::Ident(name)) => {
                let span = self.peek_span();
                self.advance();
                Ok(Ident { name, span })
            }
            _ => Err(self.expected("an identifier")),
        }
    }

    fn expected(&self, what: &'static str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(token) => ParseErrorKind::ExpectedFound {
                expected: what,
                found: format!("{:?}", token.kind),
            }
            .with_span(token.span),
            None => ParseErrorKind::UnexpectedEnd.with_span(self.prev_span()),
        }
    }
}

fn parse_datetime(text: &str) -> Option<chrono::DateTime<Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// `d.hh:mm:ss`, `hh:mm:ss`, or a postfix form like `1d` / `90s`.
fn parse_timespan(text: &str) -> Option<Duration> {
    if let Some(rest) = text.strip_suffix("ms") {
        if let Ok(n) = rest.parse::<i64>() {
            return Some(Duration::milliseconds(n));
        }
    }
    if text.len() > 1 {
        let (head, tail) = text.split_at(text.len() - 1);
        if let Ok(n) = head.parse::<i64>() {
            return match tail {
                "d" => Some(Duration::days(n)),
                "h" => Some(Duration::hours(n)),
                "m" => Some(Duration::minutes(n)),
                "s" => Some(Duration::seconds(n)),
                _ => None,
            };
        }
    }
    let (days, clock) = match text.split_once('.') {
        Some((d, rest)) if d.chars().all(|c| c.is_ascii_digit()) && rest.contains(':') => {
            (d.parse::<i64>().ok()?, rest)
        }
        _ => (0, text),
    };
    let parts: Vec<&str> = clock.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let hours: i64 = parts[0].parse().ok()?;
    let minutes: i64 = parts[1].parse().ok()?;
    let seconds: i64 = if parts.len() == 3 {
        parts[2].parse().ok()?
    } else {
        0
    };
    Some(
        Duration::days(days)
            + Duration::hours(hours)
            + Duration::minutes(minutes)
            + Duration::seconds(seconds),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_expr(block: &QueryBlock) -> &Expr {
        match &block.statements.last().unwrap().kind {
            StatementKind::Query(expr) => expr,
            other => panic!("expected query statement, got {other:?}"),
        }
    }

    #[test]
    fn parse_simple_pipeline() {
        let block = parse_query("T | where c * c >= 2 | project c").unwrap();
        let expr = query_expr(&block);
        let ExprKind::Pipe { input, operator } = &expr.kind else {
            panic!("expected pipe");
        };
        assert!(matches!(operator.kind, OpKind::Project { .. }));
        let ExprKind::Pipe { operator, .. } = &input.kind else {
            panic!("expected inner pipe");
        };
        assert!(matches!(operator.kind, OpKind::Where { .. }));
    }

    #[test]
    fn parse_hyphenated_operators() {
        let block = parse_query("T | project-away a*, b | mv-expand c to typeof(long)").unwrap();
        let expr = query_expr(&block);
        let ExprKind::Pipe { input, operator } = &expr.kind else {
            panic!("expected pipe");
        };
        let OpKind::MvExpand { items, .. } = &operator.kind else {
            panic!("expected mv-expand, got {:?}", operator.kind.name());
        };
        assert!(items[0].to_type.is_some());
        let ExprKind::Pipe { operator, .. } = &input.kind else {
            panic!("expected inner pipe");
        };
        let OpKind::ProjectAway { names } = &operator.kind else {
            panic!("expected project-away");
        };
        assert!(names[0].wildcard);
        assert!(!names[1].wildcard);
    }

    #[test]
    fn parse_let_function() {
        let block = parse_query("let f = (t:(a:long), x:long) { t | project a }; f(T, 1)").unwrap();
        assert_eq!(block.statements.len(), 2);
        let StatementKind::Let { name, value } = &block.statements[0].kind else {
            panic!("expected let");
        };
        assert_eq!(name.name, "f");
        let LetValue::Function(decl) = value else {
            panic!("expected function decl");
        };
        assert_eq!(decl.params.len(), 2);
        assert_eq!(
            decl.params[0].ty,
            TypeExpr::Table(vec![("a".into(), ScalarKind::Long)])
        );
        assert!(decl.body.starts_with('{') && decl.body.ends_with('}'));
    }

    #[test]
    fn parse_summarize_by() {
        let block = parse_query("T | summarize Total = sum(x), count() by y, z").unwrap();
        let expr = query_expr(&block);
        let ExprKind::Pipe { operator, .. } = &expr.kind else {
            panic!("expected pipe");
        };
        let OpKind::Summarize { aggregates, by } = &operator.kind else {
            panic!("expected summarize");
        };
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].name.as_ref().unwrap().name, "Total");
        assert_eq!(by.len(), 2);
    }

    #[test]
    fn parse_join_on() {
        let block =
            parse_query("T | join kind=inner (U | where b > 0) on k, $left.a == $right.a").unwrap();
        let expr = query_expr(&block);
        let ExprKind::Pipe { operator, .. } = &expr.kind else {
            panic!("expected pipe");
        };
        let OpKind::Join { kind, on, .. } = &operator.kind else {
            panic!("expected join");
        };
        assert_eq!(kind.as_ref().unwrap().name, "inner");
        assert_eq!(on.len(), 2);
    }

    #[test]
    fn parse_range_and_print() {
        let block = parse_query("range x from 1 to 10 step 1").unwrap();
        assert!(matches!(
            query_expr(&block).kind,
            ExprKind::Range { .. }
        ));
        let block = parse_query("print a = 1, 'hello'").unwrap();
        let ExprKind::Print { items } = &query_expr(&block).kind else {
            panic!("expected print");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn parse_datatable_literal() {
        let block = parse_query("datatable (c:int) [-1, 0, 1, 2, 3] | as Result").unwrap();
        let expr = query_expr(&block);
        let ExprKind::Pipe { input, operator } = &expr.kind else {
            panic!("expected pipe");
        };
        assert!(matches!(operator.kind, OpKind::As { .. }));
        let ExprKind::Datatable { columns, values } = &input.kind else {
            panic!("expected datatable");
        };
        assert_eq!(columns.len(), 1);
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn parse_typed_literals() {
        let block = parse_query("print int(4), datetime(2024-01-02), time(1.02:03:04)").unwrap();
        let ExprKind::Print { items } = &query_expr(&block).kind else {
            panic!("expected print");
        };
        assert!(matches!(
            items[0].value.kind,
            ExprKind::Literal(Literal::Int(4))
        ));
        assert!(matches!(
            items[1].value.kind,
            ExprKind::Literal(Literal::DateTime(_))
        ));
        let ExprKind::Literal(Literal::Timespan(d)) = &items[2].value.kind else {
            panic!("expected timespan");
        };
        assert_eq!(
            *d,
            Duration::days(1) + Duration::hours(2) + Duration::minutes(3) + Duration::seconds(4)
        );
    }

    #[test]
    fn parse_string_operators() {
        let block = parse_query("T | where s has 'x' and s !contains 'y' or s in~ ('a', 'b')")
            .unwrap();
        assert!(matches!(
            query_expr(&block).kind,
            ExprKind::Pipe { .. }
        ));
    }

    #[test]
    fn parse_fork_branches() {
        let block = parse_query("T | fork a = (where x > 1 | count) (take 10)").unwrap();
        let ExprKind::Pipe { operator, .. } = &query_expr(&block).kind else {
            panic!("expected pipe");
        };
        let OpKind::Fork { branches } = &operator.kind else {
            panic!("expected fork");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].0.as_ref().unwrap().name, "a");
        assert!(branches[1].0.is_none());
    }

    #[test]
    fn spans_nest() {
        let src = "T | where c >= 2";
        let block = parse_query(src).unwrap();
        let expr = query_expr(&block);
        let ExprKind::Pipe { input, operator } = &expr.kind else {
            panic!("expected pipe");
        };
        assert!(expr.span.start <= input.span.start);
        assert!(operator.span.end <= expr.span.end);
    }
}
