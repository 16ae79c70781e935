//=============================================
// tests/marshal_roundtrip.rs
//=============================================
// Purpose: VM -> guest conversion, boundary objects and refcount accounting.
//=============================================

mod common;

use std::collections::HashSet;

use solvra_bridge::guest::SvBody;
use solvra_bridge::vm::VmObject;
use solvra_bridge::{
    Bridge, BridgeConfig, BridgeError, GuestInterpreter, StringPolicy, VmArray, VmHash, VmValue,
};

#[test]
fn wrapped_value_converts_back_to_the_same_handle() {
    let bridge = common::bridge();
    let interp = bridge.interpreter().clone();
    let sv = interp.new_int(7);

    let wrapped = bridge.wrap_sv(sv).expect("wrap");
    assert_eq!(interp.refcnt(sv).unwrap(), 2);

    let converted = bridge.marshal_arg(&wrapped).expect("convert");
    assert_eq!(converted, sv);
    assert_eq!(interp.refcnt(sv).unwrap(), 3);

    interp.refcnt_dec(converted).unwrap();
    assert_eq!(interp.refcnt(sv).unwrap(), 2);
    drop(wrapped);
    assert_eq!(interp.refcnt(sv).unwrap(), 1);
    interp.refcnt_dec(sv).unwrap();
    assert_eq!(interp.live_count(), 0);
}

#[test]
fn scalars_keep_their_exact_value() {
    let bridge = common::bridge();
    let interp = bridge.interpreter().clone();

    let min = bridge.marshal_arg(&VmValue::Integer(i64::MIN)).unwrap();
    let tiny = bridge.marshal_arg(&VmValue::Float(f64::MIN_POSITIVE)).unwrap();
    let text = bridge.marshal_arg(&VmValue::string("a\0b\u{263a}")).unwrap();

    assert!(matches!(interp.body(min).unwrap(), SvBody::Int(i64::MIN)));
    assert!(matches!(interp.body(tiny).unwrap(), SvBody::Num(n) if n == f64::MIN_POSITIVE));
    match interp.body(text).unwrap() {
        SvBody::Str(bytes) => assert_eq!(bytes, "a\0b\u{263a}".as_bytes()),
        other => panic!("expected a string, got {other:?}"),
    }
}

#[test]
fn truncating_policy_stops_at_the_first_nul() {
    let config = BridgeConfig::default().with_string_policy(StringPolicy::TruncateAtNul);
    let bridge = Bridge::with_config(GuestInterpreter::new(), config);
    let interp = bridge.interpreter().clone();

    let text = bridge.marshal_arg(&VmValue::string("key\0tail")).unwrap();
    assert!(matches!(interp.body(text).unwrap(), SvBody::Str(bytes) if bytes == b"key"));
}

#[test]
fn arrays_keep_element_order() {
    let bridge = common::bridge();
    let interp = bridge.interpreter().clone();
    let array = VmArray::from_values(vec![
        VmValue::Integer(1),
        VmValue::string("two"),
        VmValue::Float(3.5),
    ]);

    let rv = bridge.marshal_arg(&VmValue::Array(array.clone())).unwrap();
    let av = interp.deref(rv).unwrap();
    let SvBody::Array(items) = interp.body(av).unwrap() else {
        panic!("expected an array referent");
    };
    assert_eq!(items.len(), 3);
    assert!(matches!(interp.body(items[0]).unwrap(), SvBody::Int(1)));
    assert!(matches!(interp.body(items[1]).unwrap(), SvBody::Str(s) if s == b"two"));
    assert!(matches!(interp.body(items[2]).unwrap(), SvBody::Num(n) if n == 3.5));

    // Conversion reads the VM array without consuming it.
    assert_eq!(array.elements(), 3);
    interp.refcnt_dec(rv).unwrap();
    assert_eq!(interp.live_count(), 0);
}

#[test]
fn hashes_carry_every_key() {
    let bridge = common::bridge();
    let interp = bridge.interpreter().clone();
    let hash = VmHash::from_pairs([("alpha", 1i64), ("beta", 2i64), ("gamma", 3i64)]);

    let rv = bridge.marshal_arg(&VmValue::Hash(hash)).unwrap();
    let hv = interp.deref(rv).unwrap();
    let SvBody::Hash(entries) = interp.body(hv).unwrap() else {
        panic!("expected a hash referent");
    };
    let keys: HashSet<Vec<u8>> = entries.keys().cloned().collect();
    let expected: HashSet<Vec<u8>> = ["alpha", "beta", "gamma"]
        .iter()
        .map(|key| key.as_bytes().to_vec())
        .collect();
    assert_eq!(keys, expected);
    assert!(matches!(
        interp.body(entries[b"beta".as_slice()]).unwrap(),
        SvBody::Int(2)
    ));
}

#[test]
fn nested_aggregates_convert_recursively() {
    let bridge = common::bridge();
    let interp = bridge.interpreter().clone();
    let inner = VmHash::from_pairs([("depth", 2i64)]);
    let outer = VmArray::from_values(vec![VmValue::Hash(inner), VmValue::Integer(1)]);

    let rv = bridge.marshal_arg(&VmValue::Array(outer)).unwrap();
    let av = interp.deref(rv).unwrap();
    let SvBody::Array(items) = interp.body(av).unwrap() else {
        panic!("expected an array referent");
    };
    let hv = interp.deref(items[0]).unwrap();
    assert!(matches!(interp.body(hv).unwrap(), SvBody::Hash(entries) if entries.len() == 1));

    interp.refcnt_dec(rv).unwrap();
    assert_eq!(interp.live_count(), 0);
}

#[test]
fn unsupported_values_name_their_type_and_leak_nothing() {
    let bridge = common::bridge();
    let interp = bridge.interpreter().clone();

    let err = bridge
        .marshal_arg(&VmValue::Object(VmObject::new("Sub")))
        .unwrap_err();
    assert!(err.to_string().contains("Sub"), "{err}");

    let hash = VmHash::from_pairs([("ok", VmValue::Integer(1))]);
    hash.insert("bad", VmValue::Object(VmObject::new("FileHandle")));
    let err = bridge.marshal_arg(&VmValue::Hash(hash)).unwrap_err();
    assert_eq!(err, BridgeError::unsupported("FileHandle"));

    assert_eq!(interp.live_count(), 0);
    assert_eq!(bridge.telemetry().counters().failures, 2);
}

#[test]
fn boundary_objects_stay_with_their_interpreter() {
    let owner = common::bridge();
    let other = Bridge::new(GuestInterpreter::new());
    let sv = owner.interpreter().new_str("mine");
    let wrapped = owner.wrap_sv(sv).unwrap();

    let err = other.marshal_arg(&wrapped).unwrap_err();
    assert!(matches!(err, BridgeError::CrossInterpreter { .. }), "{err}");
    assert!(other.unwrap_scalar(&wrapped).is_err());
    assert_eq!(owner.interpreter().refcnt(sv).unwrap(), 2);
}

#[test]
fn wrapped_scalar_inside_an_array_is_shared_not_copied() {
    let bridge = common::bridge();
    let interp = bridge.interpreter().clone();
    let sv = interp.new_int(5);
    let wrapped = bridge.wrap_sv(sv).unwrap();
    interp.refcnt_dec(sv).unwrap();

    let rv = bridge
        .marshal_arg(&VmValue::Array(VmArray::from_values(vec![wrapped.clone()])))
        .unwrap();
    let av = interp.deref(rv).unwrap();
    let SvBody::Array(items) = interp.body(av).unwrap() else {
        panic!("expected an array referent");
    };
    assert_eq!(items, vec![sv]);
    assert_eq!(interp.refcnt(sv).unwrap(), 2);

    interp.refcnt_dec(rv).unwrap();
    assert_eq!(interp.refcnt(sv).unwrap(), 1);
    drop(wrapped);
    assert_eq!(interp.live_count(), 0);
}
