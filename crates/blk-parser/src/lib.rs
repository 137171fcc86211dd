//! blk parser: converts a token stream into a type descriptor.

mod parse_type;
mod parser;

pub use parser::{ParseResult, Parser};
