//=============================================
// tests/common/mod.rs
//=============================================
// Purpose: Shared guest fixtures for the bridge integration tests.
//=============================================

#![allow(dead_code)]

use std::sync::Arc;

use solvra_bridge::guest::{GuestError, GuestInterpreter, SvBody, SvHandle};
use solvra_bridge::{Bridge, VmArray, VmValue};

pub fn bridge() -> Bridge {
    solvra_bridge::logging::init("bridge-tests");
    Bridge::new(guest_with_fixtures())
}

/// Interpreter with a handful of packages the tests dispatch into.
pub fn guest_with_fixtures() -> Arc<GuestInterpreter> {
    let interp = GuestInterpreter::new();

    // Echo->all(@args) returns every argument after the invocant.
    interp.define_sub("Echo", "all", |interp, args| {
        args.iter()
            .skip(1)
            .map(|arg| interp.refcnt_inc(*arg).map(|_| *arg))
            .collect()
    });

    interp.define_sub("List", "three", |interp, _args| {
        Ok(vec![
            interp.new_str("r1"),
            interp.new_str("r2"),
            interp.new_str("r3"),
        ])
    });

    interp.define_sub("Shape", "area", |interp, args| {
        let width = int_at(interp, args, 1)?;
        Ok(vec![interp.new_int(width * width)])
    });
    interp.set_parents("Square", &["Shape"]);

    interp.define_sub("Math", "sum", |interp, args| {
        let total = (0..args.len())
            .map(|index| int_at(interp, args, index))
            .sum::<Result<i64, _>>()?;
        Ok(vec![interp.new_int(total)])
    });

    interp.define_sub("Fail", "now", |_interp, _args| {
        Err(GuestError::died("fixture failure at Fail.pm line 3"))
    });

    interp
}

pub fn int_at(interp: &GuestInterpreter, args: &[SvHandle], index: usize) -> Result<i64, GuestError> {
    let Some(sv) = args.get(index) else {
        return Err(GuestError::died(format!("missing argument {index}")));
    };
    match interp.body(*sv)? {
        SvBody::Int(value) => Ok(value),
        other => Err(GuestError::died(format!("expected an integer, got {}", other.kind()))),
    }
}

/// Positional list with the VM invocant slot in front.
pub fn method_args(values: Vec<VmValue>) -> VmArray {
    let mut slots = vec![VmValue::Undef];
    slots.extend(values);
    VmArray::from_values(slots)
}

/// Unwraps every result to a VM scalar.
pub fn unwrap_all(bridge: &Bridge, results: &VmArray) -> Vec<VmValue> {
    results
        .iter()
        .map(|value| bridge.unwrap_scalar(&value).expect("unwrap result"))
        .collect()
}
