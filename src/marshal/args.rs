//==================================================
// File: marshal/args.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: VM argument lists -> guest argument stack
// Objective: Drain positional then named arguments onto the guest stack in
//            source order, flattening named pairs to key/value slots
//==================================================

use crate::config::BridgeConfig;
use crate::error::BridgeResult;
use crate::guest::CallScope;
use crate::vm::{VmArray, VmHash};

use super::convert::marshal_arg;

/// Pushes `positional` followed by `named` onto the guest stack of `scope`
/// and returns the number of slots pushed (`positional + 2 * named`).
///
/// Both collections are drained. Each named entry becomes two slots, the key
/// as a guest string then the converted value. Pushed values are mortal, so
/// they are released when `scope` is left, including when conversion fails
/// part way through.
pub fn push_arguments(
    scope: &CallScope<'_>,
    config: &BridgeConfig,
    positional: VmArray,
    named: VmHash,
) -> BridgeResult<usize> {
    let interp = scope.interpreter();
    let mut pushed = 0;

    for arg in positional.drain() {
        let sv = marshal_arg(interp, config, &arg)?;
        interp.push_mortal(sv)?;
        pushed += 1;
    }

    for (name, value) in named.drain() {
        let key = interp.new_str(config.string_policy.apply(name.as_bytes()));
        interp.push_mortal(key)?;
        let sv = marshal_arg(interp, config, &value)?;
        interp.push_mortal(sv)?;
        pushed += 2;
    }

    Ok(pushed)
}


//==================================================
// End of file
//==================================================
