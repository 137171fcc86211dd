//! Runtime error types for the blk evaluator core.

use blk_types::ErrorCode;
use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised by environment and value operations.
///
/// Builtin functions do not use this type directly: they hand failures back
/// to the script as [`Value::Error`](crate::Value::Error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// `name` already has a binding in the current scope
    #[error("`{name}` is already declared in this scope")]
    Redeclaration { name: String },
    /// No scope in the chain binds `name`
    #[error("unresolved name `{name}`")]
    UnresolvedName { name: String },
    /// A value of this kind cannot key a map
    #[error("unusable as hash key: {kind}, consider one of those types (boolean, integer, float, string)")]
    UnhashableKey { kind: ValueKind },
    /// Operation applied to a value of the wrong kind
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl EvalError {
    /// Error code used when the error is reported as a diagnostic.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Redeclaration { .. } => ErrorCode::ALREADY_DECLARED,
            Self::UnresolvedName { .. } => ErrorCode::UNRESOLVED_NAME,
            Self::UnhashableKey { .. } => ErrorCode::UNHASHABLE_KEY,
            Self::TypeMismatch(_) => ErrorCode::TYPE_MISMATCH,
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
