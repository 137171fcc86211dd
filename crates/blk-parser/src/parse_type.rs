//! Type annotation parsing.

use blk_lexer::token::TokenKind;
use blk_types::ty::MAP_KIND;
use blk_types::{ErrorCode, MapType, NodeType, TypeDescriptor, MAX_TYPE_DEPTH};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse a type annotation.
    ///
    /// ```ebnf
    /// Type = "[" [ Int ] "]" Type
    ///      | "map" [ "(" [ Type ] "," [ Type ] ")" ]
    ///      | Identifier [ "(" Type ")" ] ;
    /// ```
    ///
    /// `[]T` is the same as `array(T)`. Element types must be node types.
    pub fn parse_type(&mut self) -> Option<TypeDescriptor> {
        if self.type_depth >= MAX_TYPE_DEPTH {
            self.error_at_current(
                ErrorCode::UNKNOWN_TYPE,
                format!("type nesting exceeds {MAX_TYPE_DEPTH} levels"),
            );
            return None;
        }
        self.type_depth += 1;
        let ty = self.parse_type_inner();
        self.type_depth -= 1;
        ty
    }

    fn parse_type_inner(&mut self) -> Option<TypeDescriptor> {
        match self.peek_kind() {
            TokenKind::LBracket => {
                self.advance();
                let size = if self.check(TokenKind::Int) {
                    Some(self.advance().text)
                } else {
                    None
                };
                self.expect(TokenKind::RBracket)?;
                let child = self.parse_element_type()?;
                let node = match size {
                    Some(size) => NodeType::sized_array(size, child),
                    None => NodeType::array(child),
                };
                Some(node.into())
            }
            TokenKind::Identifier if self.peek().text == MAP_KIND => {
                self.advance();
                self.parse_map_params()
            }
            TokenKind::Identifier => {
                let mut node = NodeType::scalar(self.advance().text);
                if self.eat(TokenKind::LParen) {
                    let child = self.parse_element_type()?;
                    self.expect(TokenKind::RParen)?;
                    node = node.with_child(child);
                }
                Some(node.into())
            }
            _ => {
                let found = match self.peek_kind() {
                    TokenKind::Eof => "end of file".to_string(),
                    _ => self.peek().text.clone(),
                };
                self.error_at_current(ErrorCode::UNKNOWN_TYPE, format!("expected type, got '{found}'"));
                None
            }
        }
    }

    fn parse_element_type(&mut self) -> Option<NodeType> {
        let span = self.current_span();
        match self.parse_type()? {
            TypeDescriptor::Node(node) => Some(node),
            TypeDescriptor::Map(map) => {
                self.error_at(
                    ErrorCode::UNKNOWN_TYPE,
                    format!("`{map}` cannot be used as an element type"),
                    span,
                );
                None
            }
        }
    }

    /// `map` has been consumed. Either side inside the parentheses may be left
    /// out: `map(string, )`.
    fn parse_map_params(&mut self) -> Option<TypeDescriptor> {
        let mut map = MapType::default();
        if self.eat(TokenKind::LParen) {
            if !self.check(TokenKind::Comma) {
                map.left = Some(Box::new(self.parse_type()?));
            }
            self.expect(TokenKind::Comma)?;
            if !self.check(TokenKind::RParen) {
                map.right = Some(Box::new(self.parse_type()?));
            }
            self.expect(TokenKind::RParen)?;
        }
        Some(map.into())
    }
}
