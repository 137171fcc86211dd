//! Builtin functions and modules installed in the root scope.
//!
//! Builtins never fail through Rust errors: every failure is handed back to
//! the script as a [`Value::Error`].

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::{cast, BuiltinFn, Module, Value, ValueKind};

type BuiltinResult = Result<Value, String>;

/// Name/value pairs for the root scope.
pub fn table() -> Vec<(&'static str, Value)> {
    vec![
        ("len", native("len", size)),
        ("copy", native("copy", copy)),
        ("int", native("int", to_int)),
        ("float", native("float", to_float)),
        ("string", native("string", to_string)),
        ("bool", native("bool", to_bool)),
        ("typeOf", native("typeOf", type_of)),
        ("hashmap", hashmap_module()),
        ("math", math_module()),
    ]
}

fn native(name: &'static str, f: fn(&[Value]) -> BuiltinResult) -> Value {
    Value::BuiltinFunction(BuiltinFn::new(name, move |args: &[Value]| {
        f(args).unwrap_or_else(|msg| Value::error(msg))
    }))
}

fn arity(args: &[Value], want: usize) -> Result<(), String> {
    if args.len() == want {
        Ok(())
    } else {
        Err(format!(
            "wrong number of arguments. got={}, want={want}",
            args.len()
        ))
    }
}

// ── Free functions ────────────────────────────────────────────────────────────

fn size(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
        Value::Array(items) => Ok(Value::Integer(items.borrow().len() as i64)),
        other => Err(format!(
            "argument to `len` not supported, got {}",
            other.kind()
        )),
    }
}

fn copy(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    Ok(args[0].clone_value())
}

fn to_int(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        Value::Integer(i) => Ok(Value::Integer(i)),
        Value::Float(x) => Ok(Value::Integer(x as i64)),
        Value::String(s) => s
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| format!("cannot convert \"{s}\" to int: {e}")),
        other => Err(format!(
            "argument needs to be of type int, float or string, got {}",
            other.kind()
        )),
    }
}

fn to_float(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        Value::Float(x) => Ok(Value::Float(x)),
        Value::Integer(i) => Ok(Value::Float(i as f64)),
        Value::String(s) => s
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("cannot convert \"{s}\" to float: {e}")),
        other => Err(format!(
            "argument needs to be of type int, float or string, got {}",
            other.kind()
        )),
    }
}

fn to_string(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        Value::Integer(i) => Ok(Value::string(i.to_string())),
        Value::Float(x) => Ok(Value::string(x.to_string())),
        Value::Boolean(b) => Ok(Value::string(b.to_string())),
        s @ Value::String(_) => Ok(s),
        other => Err(format!("unsupported input type {}", other.kind())),
    }
}

fn to_bool(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        b @ Value::Boolean(_) => Ok(b),
        Value::String(s) => match s.as_str() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(Value::Boolean(true)),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(Value::Boolean(false)),
            _ => Err(format!("cannot convert \"{s}\" to bool")),
        },
        other => Err(format!(
            "argument needs to be of type bool or string, got {}",
            other.kind()
        )),
    }
}

fn type_of(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    Ok(Value::string(cast(&args[0]).0.kind().name()))
}

// ── hashmap module ────────────────────────────────────────────────────────────

fn module(name: &str, members: Vec<(&str, Value)>) -> Value {
    let members: BTreeMap<String, Value> = members
        .into_iter()
        .map(|(member, value)| (member.to_string(), value))
        .collect();
    Value::BuiltinModule(Rc::new(Module {
        name: name.to_string(),
        members,
    }))
}

fn hashmap_module() -> Value {
    module(
        "hashmap",
        vec![
            ("keys", native("keys", map_keys)),
            ("values", native("values", map_values)),
            ("insert", native("insert", map_insert)),
            ("get_value", native("get_value", map_get_value)),
            ("equals", native("equals", map_equals)),
        ],
    )
}

fn map_keys(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        Value::Map(map) => Ok(Value::array(map.keys())),
        _ => Err("args of keys functions needs to be a map".to_string()),
    }
}

fn map_values(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        Value::Map(map) => Ok(Value::array(map.values())),
        _ => Err("args of values functions needs to be a map".to_string()),
    }
}

/// `insert(m, k, v)`: `m` must be a mutable binding, and `k`/`v` must share
/// kinds with the pairs already present.
fn map_insert(args: &[Value]) -> BuiltinResult {
    arity(args, 3)?;
    let (target, is_mutable) = cast(&args[0]);
    if !is_mutable {
        return Err(format!(
            "can't mutate {}, probably defined as a const",
            args[0].inspect()
        ));
    }
    let Value::Map(map) = target else {
        return Err("first arg needs to be a map in insert function".to_string());
    };
    let (key, _) = cast(&args[1]);
    let (value, _) = cast(&args[2]);

    if let Some(existing) = map.first() {
        if existing.key.kind() != key.kind() {
            return Err(format!(
                "unusable as hash key: {}, doesn't match the current key(s) type(s): {}",
                key.kind(),
                existing.key.kind()
            ));
        }
        if existing.value.kind() != value.kind() {
            return Err(format!(
                "unusable as map value: {}, doesn't match the current value(s) type(s): {}",
                value.kind(),
                existing.value.kind()
            ));
        }
    }

    map.insert(key, value).map_err(|e| e.to_string())?;
    Ok(Value::Map(map))
}

fn map_get_value(args: &[Value]) -> BuiltinResult {
    arity(args, 2)?;
    let Value::Map(map) = cast(&args[0]).0 else {
        return Err("first arg needs to be a map in get_value function".to_string());
    };
    let (key, _) = cast(&args[1]);
    match map.get(&key).map_err(|e| e.to_string())? {
        Some(value) => Ok(value),
        None => Err(format!(
            "no value found with associated hash key: {}",
            key.inspect()
        )),
    }
}

fn map_equals(args: &[Value]) -> BuiltinResult {
    arity(args, 2)?;
    let (a, _) = cast(&args[0]);
    let (b, _) = cast(&args[1]);
    if a.kind() != ValueKind::Map || b.kind() != ValueKind::Map {
        return Err("both args need to be a map in equals function".to_string());
    }
    Ok(Value::Boolean(a.deep_equals(&b)))
}

// ── math module ───────────────────────────────────────────────────────────────

fn math_module() -> Value {
    module(
        "math",
        vec![
            ("PI", constant(Value::Float(std::f64::consts::PI))),
            ("e", constant(Value::Float(std::f64::consts::E))),
            ("abs", native("abs", math_abs)),
            ("pow", native("pow", math_pow)),
        ],
    )
}

fn constant(value: Value) -> Value {
    Value::BuiltinConstant(Box::new(value))
}

fn math_abs(args: &[Value]) -> BuiltinResult {
    arity(args, 1)?;
    match cast(&args[0]).0 {
        Value::Integer(i) => Ok(Value::Integer(i.saturating_abs())),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(format!(
            "wrong type, expected an integer or float, got {}",
            other.kind()
        )),
    }
}

/// `pow(x, p)` always yields a float.
fn math_pow(args: &[Value]) -> BuiltinResult {
    arity(args, 2)?;
    let power = match cast(&args[1]).0 {
        Value::Integer(p) => p as f64,
        Value::Float(p) => p,
        other => {
            return Err(format!(
                "wrong type, expected the pow to be an integer or float, got {}",
                other.kind()
            ))
        }
    };
    match cast(&args[0]).0 {
        Value::Integer(x) => Ok(Value::Float((x as f64).powf(power))),
        Value::Float(x) => Ok(Value::Float(x.powf(power))),
        other => Err(format!(
            "wrong type, expected an integer or float, got {}",
            other.kind()
        )),
    }
}
