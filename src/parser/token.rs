// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! The hand-written lexer.

use chrono::Duration;

use super::{ParseError, ParseErrorKind};

/// A half-open byte range into the source text.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Span {
        Span { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }

    pub fn contains(self, offset: u32) -> bool {
        self.start <= offset && offset <= self.end
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// An identifier or word operator (`and`, `contains`, ...). Bracketed
    /// identifiers `['like this']` also lex as `Ident`.
    Ident(String),
    Long(i64),
    Real(f64),
    String(String),
    /// A postfix duration literal such as `1d` or `90s`.
    Duration(Duration),
    Pipe,
    Eq,
    EqEq,
    BangEq,
    EqTilde,
    BangTilde,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    DotDot,
    Colon,
    Bang,
    Tilde,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_ident(&self, text: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s == text)
    }
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

/// Tokenize the whole input. Whitespace and `//` comments are dropped.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        let kind = match b {
            b'0'..=b'9' => return self.lex_number(start).map(Some),
            b'\'' | b'"' => return self.lex_string(start, false).map(Some),
            b'@' if matches!(self.peek_at(1), Some(b'\'' | b'"')) => {
                self.pos += 1;
                return self.lex_string(start, true).map(Some);
            }
            b'[' if self.peek_at(1) == Some(b'\'') => return self.lex_bracketed(start).map(Some),
            b'_' | b'$' | b'a'..=b'z' | b'A'..=b'Z' => return self.lex_ident(start).map(Some),
            b'|' => {
                self.pos += 1;
                TokenKind::Pipe
            }
            b'=' => {
                self.pos += 1;
                match self.peek() {
                    Some(b'=') => {
                        self.pos += 1;
                        TokenKind::EqEq
                    }
                    Some(b'~') => {
                        self.pos += 1;
                        TokenKind::EqTilde
                    }
                    _ => TokenKind::Eq,
                }
            }
            b'!' => {
                self.pos += 1;
                match self.peek() {
                    Some(b'=') => {
                        self.pos += 1;
                        TokenKind::BangEq
                    }
                    Some(b'~') => {
                        self.pos += 1;
                        TokenKind::BangTilde
                    }
                    _ => TokenKind::Bang,
                }
            }
            b'<' => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::LtEq
                } else if self.peek() == Some(b'>') {
                    self.pos += 1;
                    TokenKind::BangEq
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            b'+' => {
                self.pos += 1;
                TokenKind::Plus
            }
            b'-' => {
                self.pos += 1;
                TokenKind::Minus
            }
            b'*' => {
                self.pos += 1;
                TokenKind::Star
            }
            b'/' => {
                self.pos += 1;
                TokenKind::Slash
            }
            b'%' => {
                self.pos += 1;
                TokenKind::Percent
            }
            b'(' => {
                self.pos += 1;
                TokenKind::LParen
            }
            b')' => {
                self.pos += 1;
                TokenKind::RParen
            }
            b'[' => {
                self.pos += 1;
                TokenKind::LBracket
            }
            b']' => {
                self.pos += 1;
                TokenKind::RBracket
            }
            b'{' => {
                self.pos += 1;
                TokenKind::LBrace
            }
            b'}' => {
                self.pos += 1;
                TokenKind::RBrace
            }
            b',' => {
                self.pos += 1;
                TokenKind::Comma
            }
            b';' => {
                self.pos += 1;
                TokenKind::Semicolon
            }
            b'.' => {
                self.pos += 1;
                if self.peek() == Some(b'.') {
                    self.pos += 1;
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            b':' => {
                self.pos += 1;
                TokenKind::Colon
            }
            b'~' => {
                self.pos += 1;
                TokenKind::Tilde
            }
            other => {
                return Err(ParseErrorKind::UnexpectedChar(other as char)
                    .with_span(Span::new(start as u32, start as u32 + 1)))
            }
        };
        Ok(Some(Token {
            kind,
            span: self.span_from(start),
        }))
    }

    fn lex_ident(&mut self, start: usize) -> Result<Token, ParseError> {
        while let Some(b) = self.peek() {
            if b == b'_' || b == b'$' || b.is_ascii_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.src[start..self.pos].to_string();
        Ok(Token {
            kind: TokenKind::Ident(text),
            span: self.span_from(start),
        })
    }

    /// `['escaped name']` lexes to a single identifier token.
    fn lex_bracketed(&mut self, start: usize) -> Result<Token, ParseError> {
        self.pos += 1; // [
        let inner = self.lex_string(self.pos, false)?;
        let TokenKind::String(name) = inner.kind else {
            unreachable!()
        };
        if self.peek() != Some(b']') {
            return Err(ParseErrorKind::Expected("`]`").with_span(self.span_from(start)));
        }
        self.pos += 1;
        Ok(Token {
            kind: TokenKind::Ident(name),
            span: self.span_from(start),
        })
    }

    fn lex_string(&mut self, start: usize, raw: bool) -> Result<Token, ParseError> {
        let quote = self.bump().expect("caller checked quote");
        let mut value = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(
                        ParseErrorKind::UnterminatedString.with_span(self.span_from(start))
                    )
                }
                Some(b) if b == quote => break,
                Some(b'\\') if !raw => match self.bump() {
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'r') => value.push('\r'),
                    Some(b'\\') => value.push('\\'),
                    Some(b'\'') => value.push('\''),
                    Some(b'"') => value.push('"'),
                    Some(other) => value.push(other as char),
                    None => {
                        return Err(
                            ParseErrorKind::UnterminatedString.with_span(self.span_from(start))
                        )
                    }
                },
                Some(b) => value.push(b as char),
            }
        }
        Ok(Token {
            kind: TokenKind::String(value),
            span: self.span_from(start),
        })
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, ParseError> {
        let mut saw_dot = false;
        let mut saw_exp = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                // `1..2` is a range, not a real literal
                b'.' if !saw_dot && !saw_exp && self.peek_at(1) != Some(b'.') => {
                    saw_dot = true;
                    self.pos += 1;
                }
                b'e' | b'E' if !saw_exp && self.peek_at(1).is_some_and(is_exp_start) => {
                    saw_exp = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'+' | b'-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let digits = &self.src[start..self.pos];
        // postfix duration suffix: 1d, 2h, 5m, 90s, 100ms
        if !saw_dot && !saw_exp {
            if let Some(token) = self.lex_duration_suffix(start, digits)? {
                return Ok(token);
            }
        }
        let kind = if saw_dot || saw_exp {
            let v: f64 = digits
                .parse()
                .map_err(|_| invalid_number(digits, self.span_from(start)))?;
            TokenKind::Real(v)
        } else {
            let v: i64 = digits
                .parse()
                .map_err(|_| invalid_number(digits, self.span_from(start)))?;
            TokenKind::Long(v)
        };
        Ok(Token {
            kind,
            span: self.span_from(start),
        })
    }

    fn lex_duration_suffix(
        &mut self,
        start: usize,
        digits: &str,
    ) -> Result<Option<Token>, ParseError> {
        let suffix_start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphabetic() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let suffix = &self.src[suffix_start..self.pos];
        let n: i64 = digits
            .parse()
            .map_err(|_| invalid_number(digits, self.span_from(start)))?;
        let duration = match suffix {
            "" => {
                self.pos = suffix_start;
                return Ok(None);
            }
            "d" => Duration::days(n),
            "h" => Duration::hours(n),
            "m" => Duration::minutes(n),
            "s" => Duration::seconds(n),
            "ms" => Duration::milliseconds(n),
            _ => {
                self.pos = suffix_start;
                return Ok(None);
            }
        };
        Ok(Some(Token {
            kind: TokenKind::Duration(duration),
            span: self.span_from(start),
        }))
    }
}

fn is_exp_start(b: u8) -> bool {
    b.is_ascii_digit() || b == b'+' || b == b'-'
}

fn invalid_number(text: &str, span: Span) -> ParseError {
    ParseErrorKind::InvalidNumber(text.into()).with_span(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_pipeline() {
        assert_eq!(
            kinds("T | where c >= 2"),
            vec![
                TokenKind::Ident("T".into()),
                TokenKind::Pipe,
                TokenKind::Ident("where".into()),
                TokenKind::Ident("c".into()),
                TokenKind::GtEq,
                TokenKind::Long(2),
            ]
        );
    }

    #[test]
    fn lex_strings() {
        assert_eq!(
            kinds(r#"'a\'b' "c" @'d\e'"#),
            vec![
                TokenKind::String("a'b".into()),
                TokenKind::String("c".into()),
                TokenKind::String(r"d\e".into()),
            ]
        );
    }

    #[test]
    fn lex_bracketed_ident() {
        assert_eq!(
            kinds("['my column'] == 1"),
            vec![
                TokenKind::Ident("my column".into()),
                TokenKind::EqEq,
                TokenKind::Long(1),
            ]
        );
    }

    #[test]
    fn lex_numbers_and_durations() {
        assert_eq!(
            kinds("1 1.5 2e3 1d 90s 1..3"),
            vec![
                TokenKind::Long(1),
                TokenKind::Real(1.5),
                TokenKind::Real(2e3),
                TokenKind::Duration(Duration::days(1)),
                TokenKind::Duration(Duration::seconds(90)),
                TokenKind::Long(1),
                TokenKind::DotDot,
                TokenKind::Long(3),
            ]
        );
    }

    #[test]
    fn lex_comments() {
        assert_eq!(
            kinds("1 // comment\n2"),
            vec![TokenKind::Long(1), TokenKind::Long(2)]
        );
    }

    #[test]
    fn lex_tilde_operators() {
        assert_eq!(
            kinds("a =~ b !~ c !in d"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::EqTilde,
                TokenKind::Ident("b".into()),
                TokenKind::BangTilde,
                TokenKind::Ident("c".into()),
                TokenKind::Bang,
                TokenKind::Ident("in".into()),
                TokenKind::Ident("d".into()),
            ]
        );
    }
}
