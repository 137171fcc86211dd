//! Value model tests: shallow equality, deep copies, map keys and display.

use std::collections::BTreeMap;
use std::rc::Rc;

use blk_eval::{
    cast, Binding, BuiltinFn, Environment, EvalError, Function, FunctionBody, MapRef, Value,
    ValueKind,
};
use pretty_assertions::assert_eq;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn ints(xs: &[i64]) -> Value {
    Value::array(xs.iter().copied().map(Value::Integer).collect())
}

fn string_map(pairs: &[(&str, i64)]) -> Value {
    let map = MapRef::with_capacity(pairs.len());
    for (k, v) in pairs {
        map.insert(Value::string(*k), Value::Integer(*v)).unwrap();
    }
    Value::Map(map)
}

fn function() -> Value {
    Value::Function(Rc::new(Function {
        params: vec!["a".into(), "b".into()],
        body: FunctionBody::new(()),
        env: Environment::new(),
    }))
}

fn primitives() -> Vec<Value> {
    vec![
        Value::Integer(0),
        Value::Integer(-42),
        Value::Boolean(true),
        Value::Boolean(false),
        Value::Float(1.5),
        Value::Float(-0.25),
        Value::string(""),
        Value::string("héllo"),
    ]
}

// ─────────────────────────────────────────────────────────────────────
// equals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_equal_primitives_are_equal() {
    for v in primitives() {
        assert!(v.equals(&v.clone()), "{v:?}");
    }
}

#[test]
fn test_primitives_of_different_kind_are_unequal() {
    assert!(!Value::Integer(1).equals(&Value::Float(1.0)));
    assert!(!Value::Integer(1).equals(&Value::Boolean(true)));
    assert!(!Value::string("1").equals(&Value::Integer(1)));
}

#[test]
fn test_primitives_with_different_values_are_unequal() {
    assert!(!Value::Integer(1).equals(&Value::Integer(2)));
    assert!(!Value::string("a").equals(&Value::string("b")));
}

#[test]
fn test_containers_are_never_shallow_equal() {
    let arr = ints(&[1, 2]);
    assert!(!arr.equals(&ints(&[1, 2])));
    assert!(!arr.equals(&arr.clone()));

    let map = string_map(&[("a", 1)]);
    assert!(!map.equals(&map.clone()));

    let st = Value::structure(BTreeMap::new());
    assert!(!st.equals(&st.clone()));

    let f = function();
    assert!(!f.equals(&f.clone()));

    let e = Value::error("boom");
    assert!(!e.equals(&Value::error("boom")));

    let env = Environment::with_builtins();
    let module = env.resolve("hashmap").unwrap().value;
    assert!(!module.equals(&module.clone()));
}

#[test]
fn test_equals_sees_through_bindings() {
    let wrapped = Value::Binding(Box::new(Binding::immutable(Value::Integer(3))));
    assert!(wrapped.equals(&Value::Integer(3)));
    assert!(Value::Integer(3).equals(&wrapped));
}

// ─────────────────────────────────────────────────────────────────────
// deep_equals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_deep_equals_compares_structure() {
    assert!(ints(&[1, 2, 3]).deep_equals(&ints(&[1, 2, 3])));
    assert!(!ints(&[1, 2, 3]).deep_equals(&ints(&[1, 2])));
    assert!(!ints(&[1, 2, 3]).deep_equals(&ints(&[1, 2, 4])));

    let a = string_map(&[("a", 1), ("b", 2)]);
    let b = string_map(&[("b", 2), ("a", 1)]);
    assert!(a.deep_equals(&b));
    assert!(!a.deep_equals(&string_map(&[("a", 1)])));
    assert!(!a.deep_equals(&string_map(&[("a", 1), ("b", 3)])));
}

#[test]
fn test_deep_equals_nested_arrays() {
    let a = Value::array(vec![ints(&[1]), ints(&[2, 3])]);
    let b = Value::array(vec![ints(&[1]), ints(&[2, 3])]);
    assert!(a.deep_equals(&b));
}

#[test]
fn test_deep_equals_other_kinds_stay_unequal() {
    let f = function();
    assert!(!f.deep_equals(&f.clone()));
    assert!(Value::Float(2.0).deep_equals(&Value::Float(2.0)));
}

// ─────────────────────────────────────────────────────────────────────
// clone_value
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_clone_of_primitive_is_equal() {
    for v in primitives() {
        assert!(v.clone_value().equals(&v), "{v:?}");
    }
}

#[test]
fn test_clone_array_is_independent() {
    let original = ints(&[1, 2, 3]);
    let copy = original.clone_value();

    let (Value::Array(src), Value::Array(dst)) = (&original, &copy) else {
        panic!("expected arrays");
    };
    assert!(!Rc::ptr_eq(src, dst));
    assert_eq!(dst.borrow().len(), 3);
    for (a, b) in src.borrow().iter().zip(dst.borrow().iter()) {
        assert!(a.equals(b));
    }

    dst.borrow_mut()[0] = Value::Integer(99);
    dst.borrow_mut().push(Value::Integer(4));
    assert!(src.borrow()[0].equals(&Value::Integer(1)));
    assert_eq!(src.borrow().len(), 3);
}

#[test]
fn test_clone_nested_array_is_deep() {
    let inner = ints(&[1]);
    let outer = Value::array(vec![inner.clone()]);
    let copy = outer.clone_value();

    let Value::Array(copy_items) = &copy else {
        panic!("expected array");
    };
    let Value::Array(copied_inner) = &copy_items.borrow()[0] else {
        panic!("expected nested array");
    };
    copied_inner.borrow_mut().push(Value::Integer(2));

    let Value::Array(original_inner) = &inner else {
        panic!("expected array");
    };
    assert_eq!(original_inner.borrow().len(), 1);
}

#[test]
fn test_clone_map_is_independent() {
    let original = string_map(&[("a", 1), ("b", 2)]);
    let copy = original.clone_value();

    let (Value::Map(src), Value::Map(dst)) = (&original, &copy) else {
        panic!("expected maps");
    };
    assert!(!src.ptr_eq(dst));
    assert_eq!(dst.len(), 2);
    for (a, b) in src.pairs().iter().zip(dst.pairs().iter()) {
        assert!(a.key.equals(&b.key));
        assert!(a.value.equals(&b.value));
    }

    dst.insert(Value::string("c"), Value::Integer(3)).unwrap();
    dst.insert(Value::string("a"), Value::Integer(100)).unwrap();
    assert_eq!(src.len(), 2);
    assert!(src
        .get(&Value::string("a"))
        .unwrap()
        .unwrap()
        .equals(&Value::Integer(1)));
}

#[test]
fn test_clone_empty_containers() {
    let arr = ints(&[]).clone_value();
    assert!(arr.deep_equals(&ints(&[])));
    let map = Value::Map(MapRef::new()).clone_value();
    let Value::Map(map) = map else {
        panic!("expected map");
    };
    assert!(map.is_empty());
}

#[test]
fn test_clone_of_struct_and_function_aliases() {
    let st = Value::structure(BTreeMap::new());
    let copy = st.clone_value();
    let (Value::Struct(a), Value::Struct(b)) = (&st, &copy) else {
        panic!("expected structs");
    };
    assert!(Rc::ptr_eq(a, b));

    let f = function();
    let (Value::Function(a), Value::Function(b)) = (&f, &f.clone_value()) else {
        panic!("expected functions");
    };
    assert!(Rc::ptr_eq(a, b));
}

#[test]
fn test_clone_keeps_binding_flags() {
    let wrapped = Value::Binding(Box::new(Binding::mutable(ints(&[1]))));
    let Value::Binding(copy) = wrapped.clone_value() else {
        panic!("expected binding");
    };
    assert!(copy.is_mutable);
    assert!(!copy.is_builtin);
    assert!(copy.value.deep_equals(&ints(&[1])));
}

#[test]
fn test_plain_clone_aliases_containers() {
    let original = ints(&[1]);
    let alias = original.clone();
    if let Value::Array(items) = &alias {
        items.borrow_mut().push(Value::Integer(2));
    }
    let Value::Array(items) = &original else {
        panic!("expected array");
    };
    assert_eq!(items.borrow().len(), 2);
}

// ─────────────────────────────────────────────────────────────────────
// cast
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_cast_unwraps_binding() {
    let (v, mutable) = cast(&Value::Binding(Box::new(Binding::mutable(Value::Integer(7)))));
    assert!(mutable);
    assert!(v.equals(&Value::Integer(7)));

    let (v, mutable) = cast(&Value::Binding(Box::new(Binding::immutable(Value::Integer(7)))));
    assert!(!mutable);
    assert_eq!(v.kind(), ValueKind::Integer);
}

#[test]
fn test_cast_passes_other_values_through() {
    let (v, mutable) = cast(&Value::string("x"));
    assert!(!mutable);
    assert!(v.equals(&Value::string("x")));
}

// ─────────────────────────────────────────────────────────────────────
// Hash keys
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_hash_key_projections() {
    let k = Value::Integer(5).hash_key().unwrap();
    assert_eq!((k.kind, k.value), (ValueKind::Integer, 5.0));
    let k = Value::Boolean(true).hash_key().unwrap();
    assert_eq!((k.kind, k.value), (ValueKind::Boolean, 1.0));
    let k = Value::Boolean(false).hash_key().unwrap();
    assert_eq!(k.value, 0.0);
    let k = Value::Float(2.5).hash_key().unwrap();
    assert_eq!((k.kind, k.value), (ValueKind::Float, 2.5));
}

#[test]
fn test_hash_key_is_kind_scoped() {
    let int = Value::Integer(1).hash_key().unwrap();
    let float = Value::Float(1.0).hash_key().unwrap();
    let boolean = Value::Boolean(true).hash_key().unwrap();
    assert_ne!(int, float);
    assert_ne!(int, boolean);
}

#[test]
fn test_string_hash_key_is_fnv_digest_widened() {
    let k = Value::string("a").hash_key().unwrap();
    assert_eq!(k.kind, ValueKind::String);
    assert_eq!(k.value, 0xaf63dc4c8601ec8c_u64 as f64);
    assert_eq!(k, Value::string("a").hash_key().unwrap());
    assert_ne!(k, Value::string("b").hash_key().unwrap());
}

#[test]
fn test_string_hash_key_collisions_are_bounded() {
    // Digests above 2^53 share an f64 with their low-bit neighbours, so two
    // strings whose digests differ only there map to one key. The loss is
    // confined to the bits below the mantissa.
    let digest = 0xaf63dc4c8601ec8c_u64;
    assert_eq!(digest as f64, (digest ^ 1) as f64);
    assert_ne!(digest as f64, (digest ^ (1 << 20)) as f64);

    let map = MapRef::new();
    for i in 0..1000 {
        map.insert(Value::string(format!("key{i}")), Value::Integer(i))
            .unwrap();
    }
    assert_eq!(map.len(), 1000);
}

#[test]
fn test_unhashable_kinds_are_reported() {
    for v in [ints(&[1]), string_map(&[]), function(), Value::error("e")] {
        let kind = v.kind();
        assert_eq!(v.hash_key(), Err(EvalError::UnhashableKey { kind }));
    }
    let err = ints(&[]).hash_key().unwrap_err();
    assert_eq!(
        err.to_string(),
        "unusable as hash key: ARRAY, consider one of those types (boolean, integer, float, string)"
    );
}

#[test]
fn test_map_rejects_unhashable_key() {
    let map = MapRef::new();
    assert!(map.insert(ints(&[1]), Value::Integer(1)).is_err());
    assert!(map.get(&ints(&[1])).is_err());
    assert!(map.is_empty());
}

#[test]
fn test_map_iterates_in_key_order() {
    let map = MapRef::new();
    for i in [3, 1, 2] {
        map.insert(Value::Integer(i), Value::Integer(i * 10)).unwrap();
    }
    let keys: Vec<String> = map.keys().iter().map(Value::inspect).collect();
    let values: Vec<String> = map.values().iter().map(Value::inspect).collect();
    assert_eq!(keys, ["1", "2", "3"]);
    assert_eq!(values, ["10", "20", "30"]);
}

// ─────────────────────────────────────────────────────────────────────
// Display
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_inspect_forms() {
    assert_eq!(Value::Integer(-3).inspect(), "-3");
    assert_eq!(Value::Float(1.5).inspect(), "1.500000");
    assert_eq!(Value::Boolean(true).inspect(), "true");
    assert_eq!(Value::string("hi").inspect(), "hi");
    assert_eq!(ints(&[1, 2]).inspect(), "[1, 2]");
    assert_eq!(string_map(&[("a", 1)]).inspect(), "{a: 1}");
    assert_eq!(function().inspect(), "fn(a, b)");
    assert_eq!(Value::error("boom").inspect(), "ERROR: boom");
    assert_eq!(
        Value::BuiltinFunction(BuiltinFn::new("len", |_| Value::Integer(0))).inspect(),
        "builtin function len"
    );

    let mut fields = BTreeMap::new();
    fields.insert("x".to_string(), Value::Integer(1));
    assert_eq!(Value::structure(fields).inspect(), "struct{x: 1}");
}

#[test]
fn test_unwrap_return() {
    let v = Value::ReturnValue(Box::new(Value::Integer(4))).unwrap_return();
    assert_eq!(v.kind(), ValueKind::Integer);
    assert_eq!(Value::Integer(4).unwrap_return().kind(), ValueKind::Integer);
}
