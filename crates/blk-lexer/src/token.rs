//! Token types for the blk lexer.
//!
//! A [`Token`] keeps its literal text next to its kind so that diagnostics
//! can replay a source row from tokens alone.

use blk_types::Span;
use std::fmt;

/// Reserved identifiers. `true` and `false` lex to boolean literal kinds.
pub const ALL_KEYWORDS: &[&str] = &[
    "let", "const", "struct", "enum", "if", "else", "match", "fn", "for", "in", "while",
    "import", "return", "skip", "true", "false",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the blk lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text. String literals store their contents without quotes;
    /// [`TokenKind::Eof`] has empty text.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// 1-based row.
    pub fn row(&self) -> u32 {
        self.span.row()
    }

    /// 1-based column.
    pub fn col(&self) -> u32 {
        self.span.col()
    }

    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }

    /// Width of the literal text in characters.
    pub fn width(&self) -> usize {
        self.text.chars().count()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    Int,
    Float,
    /// `"hello"`; the token text is `hello`.
    StringLiteral,
    True,
    False,

    Identifier,

    // ── Keywords ──────────────────────────────────────────────
    Let,
    Const,
    Struct,
    Enum,
    If,
    Else,
    Match,
    Fn,
    For,
    In,
    While,
    Import,
    Return,
    Skip,

    // ── Operators ─────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    EqEq,
    BangEq,
    Bang,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    AndAnd,
    OrOr,
    Eq,
    /// `::`
    Bind,
    /// `:=`
    Walrus,
    Arrow,
    FatArrow,
    Question,

    // ── Punctuation ───────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    /// `..`
    Range,

    Eof,
}

impl TokenKind {
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "struct" => TokenKind::Struct,
            "enum" => TokenKind::Enum,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "match" => TokenKind::Match,
            "fn" => TokenKind::Fn,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "import" => TokenKind::Import,
            "return" => TokenKind::Return,
            "skip" => TokenKind::Skip,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::Const
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Match
                | TokenKind::Fn
                | TokenKind::For
                | TokenKind::In
                | TokenKind::While
                | TokenKind::Import
                | TokenKind::Return
                | TokenKind::Skip
                | TokenKind::True
                | TokenKind::False
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::StringLiteral
                | TokenKind::True
                | TokenKind::False
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Int => "integer",
            TokenKind::Float => "float",
            TokenKind::StringLiteral => "string",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Identifier => "identifier",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Struct => "struct",
            TokenKind::Enum => "enum",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Match => "match",
            TokenKind::Fn => "fn",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::While => "while",
            TokenKind::Import => "import",
            TokenKind::Return => "return",
            TokenKind::Skip => "skip",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Bang => "!",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Eq => "=",
            TokenKind::Bind => "::",
            TokenKind::Walrus => ":=",
            TokenKind::Arrow => "->",
            TokenKind::FatArrow => "=>",
            TokenKind::Question => "?",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Range => "..",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
