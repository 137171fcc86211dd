//! blk runtime core: the value model, scoped environments and builtins.
//!
//! ```text
//! evaluator ──define/resolve──▶ Environment ──▶ Binding { Value, flags }
//!                                   │
//!                                   └── root scope: builtins (len, copy, hashmap, ..)
//! ```

pub mod builtins;
pub mod env;
pub mod error;
pub mod value;

pub use env::{Defined, Environment};
pub use error::{EvalError, EvalResult};
pub use value::{
    cast, Binding, BuiltinFn, Function, FunctionBody, HashKey, HashPair, MapRef, Module, Value,
    ValueKind,
};
