//! Positional diagnostics rendered against the token stream.
//!
//! A diagnostic shows up to three source rows around the offending token
//! (the nearest populated row before it, its own row, the nearest populated
//! row after it) with a caret line under the token. Rows are rebuilt from
//! the tokens, not from the raw source, so the collector only needs the
//! token stream of a file.
//!
//! ```text
//! main.blk:2:11:
//!
//! 1     let input := 1
//! 2     set input 3
//!                 ^
//! 3     input
//! expected ':=' after 'input'
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use blk_lexer::{Token, TokenKind};
use blk_types::{CompileErrors, ErrorCode, Severity, Span};
use serde::Serialize;

const GRAY: &str = "\x1b[1;90m";
const RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

/// Spaces between the row number and the row text.
const GUTTER: usize = 4;

/// Rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit terminal color escapes.
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { color: true }
    }
}

/// One rendered error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub severity: Severity,
    pub file: String,
    pub row: u32,
    pub col: u32,
    /// The caller's message, as given.
    pub message: String,
    /// Header, context rows, caret line and message.
    pub rendered: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Accumulates diagnostics for one file.
///
/// Diagnostics are kept sorted by rendered text and deduplicated on it, so
/// reporting the same error twice at the same token leaves one entry.
pub struct ErrorCollector<'src> {
    file: String,
    tokens: &'src [Token],
    options: RenderOptions,
    errors: Vec<Diagnostic>,
}

impl<'src> ErrorCollector<'src> {
    pub fn new(file: impl Into<String>, tokens: &'src [Token]) -> Self {
        Self::with_options(file, tokens, RenderOptions::default())
    }

    pub fn with_options(file: impl Into<String>, tokens: &'src [Token], options: RenderOptions) -> Self {
        Self {
            file: file.into(),
            tokens,
            options,
            errors: Vec::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render `message` against `token`.
    pub fn render(&self, token: &Token, message: &str) -> String {
        let (gray, red, reset) = if self.options.color {
            (GRAY, RED, RESET)
        } else {
            ("", "", "")
        };

        let mut out = String::new();
        let _ = write!(
            out,
            "{gray}{}:{}:{}:{reset}\n\n",
            self.file,
            token.row(),
            token.col()
        );

        let rows = self.rows();
        let target = token.row();
        let prev = rows.range(..target).next_back().map(|(row, _)| *row);
        let next = rows
            .range(target.saturating_add(1)..)
            .next()
            .map(|(row, _)| *row);

        for row in [prev, Some(target), next].into_iter().flatten() {
            let content = rows
                .get(&row)
                .map(|toks| reconstruct_row(toks))
                .unwrap_or_default();
            let row_label = row.to_string();
            let _ = writeln!(out, "{row_label}{}{content}", " ".repeat(GUTTER));

            if row == target {
                let indent = row_label.len() + GUTTER + token.col() as usize;
                let carets = token.width().max(1);
                let _ = writeln!(out, "{}{red}{}{reset}", " ".repeat(indent), "^".repeat(carets));
            }
        }

        out.push_str(message);
        out
    }

    /// Tokens grouped by row, in stream order within each row. The end of
    /// input marker carries no text and is left out.
    fn rows(&self) -> BTreeMap<u32, Vec<&'src Token>> {
        let mut rows: BTreeMap<u32, Vec<&Token>> = BTreeMap::new();
        for tok in self.tokens.iter().filter(|t| t.kind != TokenKind::Eof) {
            rows.entry(tok.row()).or_default().push(tok);
        }
        rows
    }

    // ── Collection ────────────────────────────────────────────────────────────

    /// Build a diagnostic for `token` without recording it.
    pub fn error(&self, token: &Token, message: impl Into<String>) -> Diagnostic {
        self.build(None, token, message.into())
    }

    pub fn error_with_code(
        &self,
        code: ErrorCode,
        token: &Token,
        message: impl Into<String>,
    ) -> Diagnostic {
        self.build(Some(code), token, message.into())
    }

    fn build(&self, code: Option<ErrorCode>, token: &Token, message: String) -> Diagnostic {
        let rendered = self.render(token, &message);
        Diagnostic {
            code,
            severity: Severity::Error,
            file: self.file.clone(),
            row: token.row(),
            col: token.col(),
            message,
            rendered,
        }
    }

    /// Record a diagnostic unless one with identical rendered text exists.
    /// Returns whether it was inserted.
    pub fn add(&mut self, diagnostic: Diagnostic) -> bool {
        match self
            .errors
            .binary_search_by(|d| d.rendered.as_str().cmp(diagnostic.rendered.as_str()))
        {
            Ok(_) => {
                tracing::debug!(
                    file = %self.file,
                    row = diagnostic.row,
                    col = diagnostic.col,
                    "dropping duplicate diagnostic"
                );
                false
            }
            Err(idx) => {
                self.errors.insert(idx, diagnostic);
                true
            }
        }
    }

    /// `add(error(token, message))`.
    pub fn report(&mut self, token: &Token, message: impl Into<String>) -> bool {
        let diagnostic = self.error(token, message);
        self.add(diagnostic)
    }

    pub fn report_with_code(
        &mut self,
        code: ErrorCode,
        token: &Token,
        message: impl Into<String>,
    ) -> bool {
        let diagnostic = self.error_with_code(code, token, message);
        self.add(diagnostic)
    }

    /// Re-render errors collected by the lexer or parser of this file.
    ///
    /// Each error is anchored on the token starting at its span; when no
    /// token starts there a zero-width marker at that position is used.
    pub fn absorb(&mut self, errors: &CompileErrors) -> usize {
        let mut inserted = 0;
        for err in &errors.errors {
            let anchor = self
                .token_at(err.span)
                .cloned()
                .unwrap_or_else(|| Token::new(TokenKind::Eof, "", Span::point(err.span.row(), err.span.col())));
            if self.report_with_code(err.code, &anchor, err.message.clone()) {
                inserted += 1;
            }
        }
        inserted
    }

    fn token_at(&self, span: Span) -> Option<&'src Token> {
        self.tokens
            .iter()
            .find(|t| t.row() == span.row() && t.col() == span.col())
    }

    // ── Access ────────────────────────────────────────────────────────────────

    /// All recorded diagnostics, sorted by rendered text.
    pub fn get_errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<Diagnostic> {
        self.errors
    }

    /// Serialize all diagnostics as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.errors)
    }
}

/// Lay a row's tokens out at their recorded columns. The cursor starts at
/// column 0 and string literals get their quotes back.
fn reconstruct_row(tokens: &[&Token]) -> String {
    let mut line = String::new();
    let mut cursor = 0usize;
    for tok in tokens {
        let col = tok.col() as usize;
        if col > cursor {
            line.push_str(&" ".repeat(col - cursor));
        }
        let width = if tok.kind == TokenKind::StringLiteral {
            line.push('"');
            line.push_str(&tok.text);
            line.push('"');
            tok.width() + 2
        } else {
            line.push_str(&tok.text);
            tok.width()
        };
        cursor = col + width;
    }
    line
}
