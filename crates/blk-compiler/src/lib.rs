//! blk compiler support: diagnostics and the type text bridge.
//!
//! ```text
//! blk source → Lexer → tokens ─┬→ Parser (type annotations) → TypeDescriptor
//!                              └→ ErrorCollector (rendered diagnostics)
//! ```

pub mod bridge;
pub mod diagnostic;

pub use bridge::{check_declared, parse_to_node_type, parse_type_text, reparse};
pub use diagnostic::{Diagnostic, ErrorCollector, RenderOptions};
