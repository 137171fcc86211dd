//! Text bridge between flattened types and descriptor trees.
//!
//! Types sometimes arrive as their rendered text (symbol tables store them
//! flat). These helpers lex and parse that text back into a tree, and hook
//! the compatibility checks up to the diagnostic collector.

use blk_lexer::{Lexer, Token};
use blk_parser::Parser;
use blk_types::{
    check_compatible, BlkError, CompileErrors, ErrorCode, NodeType, SourceFile, Span,
    TypeDescriptor,
};

use crate::diagnostic::ErrorCollector;

/// File name used for errors raised while re-parsing type text.
pub const TYPE_SOURCE_NAME: &str = "<type>";

/// Lex and parse `text` as a single type annotation.
pub fn parse_type_text(text: &str) -> Result<TypeDescriptor, CompileErrors> {
    let source = SourceFile::new(TYPE_SOURCE_NAME, text);
    let lexed = Lexer::new(&source).lex();
    let mut errors = lexed.errors;
    let parsed = Parser::new(lexed.tokens, &source).parse();
    errors.extend(parsed.errors);

    match parsed.ty {
        Some(ty) if !errors.has_errors() => Ok(ty),
        _ => Err(errors),
    }
}

/// Round-trip a descriptor through its textual form.
pub fn reparse(ty: &TypeDescriptor) -> Result<TypeDescriptor, CompileErrors> {
    parse_type_text(&ty.to_string())
}

/// Parse `text` and require a node type.
pub fn parse_to_node_type(text: &str) -> Result<NodeType, CompileErrors> {
    match parse_type_text(text)? {
        TypeDescriptor::Node(node) => Ok(node),
        TypeDescriptor::Map(map) => {
            let mut errors = CompileErrors::empty();
            errors.push_error(BlkError::new(
                TYPE_SOURCE_NAME,
                ErrorCode::TYPE_MISMATCH,
                format!("expected an element or scalar type, found `{map}`"),
                Span::point(1, 1),
                text,
            ));
            Err(errors)
        }
    }
}

/// Check an inferred type against a declared one and report a mismatch at
/// `token`. Returns `true` when the types are compatible.
pub fn check_declared(
    collector: &mut ErrorCollector<'_>,
    token: &Token,
    declared: &TypeDescriptor,
    inferred: &TypeDescriptor,
) -> bool {
    match check_compatible(declared, inferred) {
        Ok(()) => true,
        Err(err) => {
            collector.report_with_code(ErrorCode::TYPE_MISMATCH, token, err.to_string());
            false
        }
    }
}
