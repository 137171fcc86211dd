//! Runtime values.
//!
//! [`Value`] is a closed union. Primitives are held by value; arrays, maps and
//! structs are shared through `Rc<RefCell<..>>`, so cloning a `Value` with
//! [`Clone::clone`] produces an alias that observes later mutation. Use
//! [`Value::clone_value`] for an independent copy of arrays and maps.

use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};

// ══════════════════════════════════════════════════════════════════════════════
// Kinds
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Integer,
    Boolean,
    Float,
    String,
    ReturnValue,
    Function,
    Array,
    Map,
    Struct,
    Error,
    BuiltinFunction,
    BuiltinConstant,
    BuiltinModule,
    Binding,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Boolean => "BOOLEAN",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::ReturnValue => "RETURN_VALUE",
            Self::Function => "FUNCTION",
            Self::Array => "ARRAY",
            Self::Map => "MAP",
            Self::Struct => "STRUCT",
            Self::Error => "ERROR",
            Self::BuiltinFunction => "BUILTIN_FUNCTION",
            Self::BuiltinConstant => "BUILTIN_CONSTANT",
            Self::BuiltinModule => "BUILTIN_MODULE",
            Self::Binding => "BINDING",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Value
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Float(f64),
    String(String),
    /// Result of a `return` statement, unwound by the caller.
    ReturnValue(Box<Value>),
    Function(Rc<Function>),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(MapRef),
    /// Fields and methods by name.
    Struct(Rc<RefCell<BTreeMap<String, Value>>>),
    Error(Rc<str>),
    BuiltinFunction(BuiltinFn),
    BuiltinConstant(Box<Value>),
    BuiltinModule(Rc<Module>),
    /// Storage metadata carried as a value, e.g. the elements of a const array.
    Binding(Box<Binding>),
}

/// A stored value plus its mutability and provenance.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub is_mutable: bool,
    pub is_builtin: bool,
}

impl Binding {
    pub fn mutable(value: Value) -> Self {
        Self {
            value,
            is_mutable: true,
            is_builtin: false,
        }
    }

    pub fn immutable(value: Value) -> Self {
        Self {
            value,
            is_mutable: false,
            is_builtin: false,
        }
    }

    pub fn builtin(value: Value) -> Self {
        Self {
            value,
            is_mutable: false,
            is_builtin: true,
        }
    }
}

/// Unwrap a [`Value::Binding`] to its inner value and mutability. Any other
/// value passes through as immutable.
pub fn cast(value: &Value) -> (Value, bool) {
    match value {
        Value::Binding(binding) => (binding.value.clone(), binding.is_mutable),
        other => (other.clone(), false),
    }
}

impl Value {
    // ── Constructors ──────────────────────────────────────────────────────────

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn error(message: impl AsRef<str>) -> Self {
        Value::Error(Rc::from(message.as_ref()))
    }

    pub fn structure(fields: BTreeMap<String, Value>) -> Self {
        Value::Struct(Rc::new(RefCell::new(fields)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::ReturnValue(_) => ValueKind::ReturnValue,
            Value::Function(_) => ValueKind::Function,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::Struct(_) => ValueKind::Struct,
            Value::Error(_) => ValueKind::Error,
            Value::BuiltinFunction(_) => ValueKind::BuiltinFunction,
            Value::BuiltinConstant(_) => ValueKind::BuiltinConstant,
            Value::BuiltinModule(_) => ValueKind::BuiltinModule,
            Value::Binding(_) => ValueKind::Binding,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The value under any number of binding wrappers.
    pub fn unwrap_binding(&self) -> &Value {
        let mut current = self;
        while let Value::Binding(binding) = current {
            current = &binding.value;
        }
        current
    }

    /// Strip one `ReturnValue` layer.
    pub fn unwrap_return(self) -> Value {
        match self {
            Value::ReturnValue(inner) => *inner,
            other => other,
        }
    }

    // ── Equality ──────────────────────────────────────────────────────────────

    /// Shallow equality: primitives compare by kind and raw value; every
    /// other pairing is unequal, even two aliases of one array.
    pub fn equals(&self, other: &Value) -> bool {
        match (self.unwrap_binding(), other.unwrap_binding()) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Structural equality over arrays and maps. Primitives defer to
    /// [`Value::equals`].
    pub fn deep_equals(&self, other: &Value) -> bool {
        match (self.unwrap_binding(), other.unwrap_binding()) {
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_equals(y))
            }
            (Value::Map(a), Value::Map(b)) => a.deep_equals(b),
            (a, b) => a.equals(b),
        }
    }

    // ── Copying ───────────────────────────────────────────────────────────────

    /// Independent copy of arrays and maps (recursively); aliases for
    /// everything else.
    pub fn clone_value(&self) -> Value {
        match self {
            Value::Integer(_) | Value::Boolean(_) | Value::Float(_) | Value::String(_) => {
                self.clone()
            }
            Value::Array(items) => {
                let items = items.borrow();
                let mut copy = Vec::with_capacity(items.len());
                for item in items.iter() {
                    copy.push(item.clone_value());
                }
                Value::array(copy)
            }
            Value::Map(map) => Value::Map(map.clone_deep()),
            Value::Binding(binding) => Value::Binding(Box::new(Binding {
                value: binding.value.clone_value(),
                is_mutable: binding.is_mutable,
                is_builtin: binding.is_builtin,
            })),
            Value::ReturnValue(_)
            | Value::Function(_)
            | Value::Struct(_)
            | Value::Error(_)
            | Value::BuiltinFunction(_)
            | Value::BuiltinConstant(_)
            | Value::BuiltinModule(_) => self.clone(),
        }
    }

    // ── Hashing ───────────────────────────────────────────────────────────────

    pub fn hash_key(&self) -> EvalResult<HashKey> {
        let (kind, value) = match self {
            Value::Integer(i) => (ValueKind::Integer, *i as f64),
            Value::Boolean(b) => (ValueKind::Boolean, if *b { 1.0 } else { 0.0 }),
            // -0.0 == 0.0, so both zeros share one key.
            Value::Float(f) => (ValueKind::Float, if *f == 0.0 { 0.0 } else { *f }),
            Value::String(s) => (ValueKind::String, fnv1a_64(s.as_bytes()) as f64),
            other => return Err(EvalError::UnhashableKey { kind: other.kind() }),
        };
        Ok(HashKey { kind, value })
    }

    // ── Display ───────────────────────────────────────────────────────────────

    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Float(x) => write!(f, "{x:.6}"),
            Value::String(s) => f.write_str(s),
            Value::ReturnValue(inner) | Value::BuiltinConstant(inner) => write!(f, "{inner}"),
            Value::Function(func) => write!(f, "fn({})", func.params.join(", ")),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, pair) in map.pairs().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                f.write_str("}")
            }
            Value::Struct(fields) => {
                f.write_str("struct{")?;
                for (i, (name, value)) in fields.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Error(msg) => write!(f, "ERROR: {msg}"),
            Value::BuiltinFunction(func) => write!(f, "builtin function {}", func.name),
            Value::BuiltinModule(module) => write!(f, "module {}", module.name),
            Value::Binding(binding) => write!(f, "{}", binding.value),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions & modules
// ══════════════════════════════════════════════════════════════════════════════

/// A user function closing over its defining scope.
pub struct Function {
    pub params: Vec<String>,
    pub body: FunctionBody,
    pub env: Environment,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured scope may hold this function; don't walk it.
        f.debug_struct("Function")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Opaque handle to a function body owned by the evaluator's AST.
#[derive(Clone)]
pub struct FunctionBody(Rc<dyn Any>);

impl FunctionBody {
    pub fn new<T: Any>(body: T) -> Self {
        Self(Rc::new(body))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FunctionBody(..)")
    }
}

pub type NativeFn = dyn Fn(&[Value]) -> Value;

/// A native function callable from scripts.
#[derive(Clone)]
pub struct BuiltinFn {
    pub name: String,
    func: Rc<NativeFn>,
}

impl BuiltinFn {
    pub fn new(name: impl Into<String>, func: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFn({})", self.name)
    }
}

/// A named table of builtin members, e.g. `hashmap.keys`.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub members: BTreeMap<String, Value>,
}

impl Module {
    pub fn get(&self, member: &str) -> Option<&Value> {
        self.members.get(member)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Map keys
// ══════════════════════════════════════════════════════════════════════════════

/// Map key: the key's kind plus a numeric projection of its value.
///
/// Strings project through a 64-bit FNV-1a digest widened to `f64`, so two
/// strings whose digests agree above the mantissa collide.
#[derive(Debug, Clone, Copy)]
pub struct HashKey {
    pub kind: ValueKind,
    pub value: f64,
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value.to_bits() == other.value.to_bits()
    }
}

impl Eq for HashKey {}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.value.to_bits().hash(state);
    }
}

impl PartialOrd for HashKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.value.total_cmp(&other.value))
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(PRIME)
    })
}

/// The original key next to its value.
#[derive(Debug, Clone)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// Shared handle to a map's pairs.
#[derive(Debug, Clone, Default)]
pub struct MapRef(Rc<RefCell<HashMap<HashKey, HashPair>>>);

impl MapRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Rc::new(RefCell::new(HashMap::with_capacity(capacity))))
    }

    /// Insert or replace the pair for `key`. Binding wrappers on the key and
    /// value are dropped.
    pub fn insert(&self, key: Value, value: Value) -> EvalResult<()> {
        let key = key.unwrap_binding().clone();
        let value = value.unwrap_binding().clone();
        let hash = key.hash_key()?;
        self.0.borrow_mut().insert(hash, HashPair { key, value });
        Ok(())
    }

    pub fn get(&self, key: &Value) -> EvalResult<Option<Value>> {
        let hash = key.unwrap_binding().hash_key()?;
        Ok(self.0.borrow().get(&hash).map(|pair| pair.value.clone()))
    }

    pub fn contains(&self, key: &Value) -> EvalResult<bool> {
        let hash = key.unwrap_binding().hash_key()?;
        Ok(self.0.borrow().contains_key(&hash))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Pairs ordered by hash key (digest order for strings).
    pub fn pairs(&self) -> Vec<HashPair> {
        let map = self.0.borrow();
        let mut entries: Vec<(&HashKey, &HashPair)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, pair)| pair.clone()).collect()
    }

    /// The pair with the smallest key.
    pub fn first(&self) -> Option<HashPair> {
        self.0
            .borrow()
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, pair)| pair.clone())
    }

    pub fn keys(&self) -> Vec<Value> {
        self.pairs().into_iter().map(|pair| pair.key).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.pairs().into_iter().map(|pair| pair.value).collect()
    }

    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn clone_deep(&self) -> MapRef {
        let src = self.0.borrow();
        let mut copy = HashMap::with_capacity(src.len());
        for (hash, pair) in src.iter() {
            copy.insert(
                *hash,
                HashPair {
                    key: pair.key.clone_value(),
                    value: pair.value.clone_value(),
                },
            );
        }
        MapRef(Rc::new(RefCell::new(copy)))
    }

    fn deep_equals(&self, other: &MapRef) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (self.0.borrow(), other.0.borrow());
        a.len() == b.len()
            && a.iter().all(|(hash, pair)| {
                b.get(hash)
                    .is_some_and(|other| pair.value.deep_equals(&other.value))
            })
    }
}

impl FromIterator<(HashKey, HashPair)> for MapRef {
    fn from_iter<I: IntoIterator<Item = (HashKey, HashPair)>>(iter: I) -> Self {
        Self(Rc::new(RefCell::new(iter.into_iter().collect())))
    }
}
