//! Shared types for the blk toolchain.
//!
//! This crate defines source spans, structured compile errors, type
//! descriptors and the structural compatibility checks run over them.

mod error;
mod span;
pub mod compat;
pub mod ty;

pub use compat::{
    check_compatible, deep_equal_map, deep_equal_node, MapSide, MismatchReason, Side, TypeError,
    MAX_TYPE_DEPTH,
};
pub use error::{BlkError, CompileErrors, ErrorCategory, ErrorCode, Severity, MAX_ERRORS};
pub use span::{SourceFile, Span};
pub use ty::{count_child_types, MapType, NodeType, TypeDescriptor};

/// Result type used throughout the blk front end.
pub type Result<T> = std::result::Result<T, BlkError>;
