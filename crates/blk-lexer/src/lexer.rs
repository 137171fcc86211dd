//! Core blk lexer: converts source text to a token stream.
//!
//! - Rows and columns are 1-based and counted in characters
//! - Whitespace, newlines included, separates tokens and is never emitted
//! - `#` starts a comment that runs to the end of the line
//! - String literals are kept verbatim, without their quotes
//! - Error recovery: collects up to [`blk_types::MAX_ERRORS`] errors

use blk_types::{BlkError, CompileErrors, ErrorCode, SourceFile, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// The blk lexer.
pub struct Lexer<'src> {
    source: Vec<char>,
    source_file: &'src SourceFile,
    /// Current char offset into `source`.
    pos: usize,
    line: u32,
    col: u32,
    errors: CompileErrors,
}

/// Result of lexing: tokens + any errors collected.
#[derive(Debug)]
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.chars().collect(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.total_errors >= MAX_ERRORS {
                break;
            }
            let token = self.scan();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, "", self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume the next char if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn text_from(&self, start: usize) -> String {
        self.source[start..self.pos].iter().collect()
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = BlkError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = BlkError::new(&self.source_file.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            if self.peek() != Some('#') {
                break;
            }
            while self.peek().is_some_and(|ch| ch != '\n') {
                self.advance();
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan(&mut self) -> Token {
        self.skip_trivia();

        if self.errors.total_errors >= MAX_ERRORS {
            return Token::new(TokenKind::Eof, "", self.current_span());
        }

        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col;

        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, "", self.current_span());
        };

        let kind = match ch {
            '"' => return self.scan_string(start_line, start_col),
            c if c.is_ascii_digit() => return self.scan_number(start, start_line, start_col),
            c if c.is_alphabetic() || c == '_' => {
                return self.scan_identifier(start, start_line, start_col)
            }

            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '?' => TokenKind::Question,

            ':' => {
                if self.eat(':') {
                    TokenKind::Bind
                } else if self.eat('=') {
                    TokenKind::Walrus
                } else {
                    TokenKind::Colon
                }
            }
            '.' => {
                if self.eat('.') {
                    TokenKind::Range
                } else {
                    TokenKind::Dot
                }
            }
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => self.with_assign(TokenKind::Star, TokenKind::StarEq),
            '/' => self.with_assign(TokenKind::Slash, TokenKind::SlashEq),
            '%' => self.with_assign(TokenKind::Percent, TokenKind::PercentEq),
            '!' => self.with_assign(TokenKind::Bang, TokenKind::BangEq),
            '<' => self.with_assign(TokenKind::Less, TokenKind::LessEq),
            '>' => self.with_assign(TokenKind::Greater, TokenKind::GreaterEq),
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else if self.eat('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Eq
                }
            }
            '&' | '|' => {
                if self.eat(ch) {
                    if ch == '&' {
                        TokenKind::AndAnd
                    } else {
                        TokenKind::OrOr
                    }
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("Unexpected character '{ch}'"),
                        span,
                        format!("Use '{ch}{ch}' for the logical operator"),
                    );
                    return self.scan();
                }
            }

            _ => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Unexpected character '{ch}'"),
                    span,
                );
                // Error recovery: skip the character and try again
                return self.scan();
            }
        };

        Token::new(
            kind,
            self.text_from(start),
            self.span_from(start_line, start_col),
        )
    }

    fn with_assign(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.eat('=') {
            assign
        } else {
            plain
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // `1..3` is a range, not a float
        let mut kind = TokenKind::Int;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            kind = TokenKind::Float;
        }

        Token::new(
            kind,
            self.text_from(start),
            self.span_from(start_line, start_col),
        )
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = self.text_from(start);
        let kind = TokenKind::from_keyword(&text).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, self.span_from(start_line, start_col))
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal starting after the opening `"`.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Token {
        let content_start = self.pos;

        loop {
            match self.peek() {
                None | Some('\n') => {
                    let text = self.text_from(content_start);
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED,
                        "Unterminated string literal",
                        span,
                        "Close the string with '\"' on the same line",
                    );
                    return Token::new(TokenKind::StringLiteral, text, span);
                }
                Some('"') => {
                    let text = self.text_from(content_start);
                    self.advance();
                    return Token::new(
                        TokenKind::StringLiteral,
                        text,
                        self.span_from(start_line, start_col),
                    );
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}
