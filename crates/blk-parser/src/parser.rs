//! Core parser infrastructure: token cursor, error reporting, helpers.

use blk_lexer::token::{Token, TokenKind};
use blk_types::{BlkError, CompileErrors, ErrorCode, SourceFile, Span, TypeDescriptor};

/// The blk type-annotation parser.
///
/// Consumes a token stream produced by the lexer and builds a
/// [`TypeDescriptor`]. Errors are collected rather than returned early.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    errors: CompileErrors,
    /// Current type nesting depth.
    pub(crate) type_depth: usize,
}

/// Result of parsing.
#[derive(Debug)]
pub struct ParseResult {
    pub ty: Option<TypeDescriptor>,
    pub errors: CompileErrors,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        let mut tokens = tokens;
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map_or(Span::point(1, 1), |t| t.span);
            tokens.push(Token::new(TokenKind::Eof, "", end));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: CompileErrors::empty(),
            type_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing. Past the end this is the
    /// trailing `Eof`.
    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = BlkError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the whole token stream as a single type annotation.
    pub fn parse(mut self) -> ParseResult {
        let ty = self.parse_type();
        if ty.is_some() && !self.at_end() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("unexpected '{}' after type", self.peek().text),
            );
        }
        ParseResult {
            ty,
            errors: self.errors,
        }
    }
}
