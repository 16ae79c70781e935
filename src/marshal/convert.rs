//==================================================
// File: marshal/convert.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: VM value -> guest scalar conversion
// Objective: Dispatch on the VM value's tag, round-trip boundary objects
//            untouched and build guest aggregates recursively
//==================================================

use tracing::trace;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::guest::{GuestInterpreter, SvHandle};
use crate::vm::{VmArray, VmHash, VmValue};

/// Converts `value` into a guest scalar owned by `interp`.
///
/// The returned handle carries one share owned by the caller. A boundary
/// object yields its own scalar with an extra share; the wrapper keeps its
/// share. Fails with [`BridgeError::UnsupportedConversion`] for values that
/// have no marshaling rule. A failed aggregate is released before the error
/// is returned, so no partial value escapes.
pub fn marshal_arg(
    interp: &GuestInterpreter,
    config: &BridgeConfig,
    value: &VmValue,
) -> BridgeResult<SvHandle> {
    convert(interp, config, value, 0)
}

fn convert(
    interp: &GuestInterpreter,
    config: &BridgeConfig,
    value: &VmValue,
    depth: usize,
) -> BridgeResult<SvHandle> {
    if depth > config.max_depth {
        return Err(BridgeError::NestingTooDeep {
            limit: config.max_depth,
        });
    }
    trace!(depth, type_name = value.type_name(), "marshal value");
    match value {
        VmValue::Guest(scalar) => scalar.share_with(interp),
        VmValue::Integer(number) => Ok(interp.new_int(*number)),
        VmValue::Float(number) => Ok(interp.new_num(*number)),
        VmValue::String(text) => Ok(interp.new_str(config.string_policy.apply(text.as_bytes()))),
        VmValue::Array(array) => convert_array(interp, config, array, depth),
        VmValue::Hash(hash) => convert_hash(interp, config, hash, depth),
        VmValue::Undef | VmValue::Object(_) => Err(BridgeError::unsupported(value.type_name())),
    }
}

fn convert_array(
    interp: &GuestInterpreter,
    config: &BridgeConfig,
    array: &VmArray,
    depth: usize,
) -> BridgeResult<SvHandle> {
    let av = interp.new_array(Vec::new());
    for item in array.iter() {
        let filled = convert(interp, config, &item, depth + 1)
            .and_then(|sv| interp.av_push(av, sv).map_err(BridgeError::from));
        if let Err(err) = filled {
            interp.refcnt_dec(av)?;
            return Err(err);
        }
    }
    Ok(interp.new_rv_noinc(av)?)
}

fn convert_hash(
    interp: &GuestInterpreter,
    config: &BridgeConfig,
    hash: &VmHash,
    depth: usize,
) -> BridgeResult<SvHandle> {
    let hv = interp.new_hash();
    let keys = hash.keys();
    for key in keys.iter().take(hash.elements()) {
        let Some(item) = hash.get_keyed_str(key) else {
            continue;
        };
        let stored = convert(interp, config, &item, depth + 1).and_then(|sv| {
            interp
                .hv_store(hv, config.string_policy.apply(key.as_bytes()), sv)
                .map_err(BridgeError::from)
        });
        if let Err(err) = stored {
            interp.refcnt_dec(hv)?;
            return Err(err);
        }
    }
    Ok(interp.new_rv_noinc(hv)?)
}


//==================================================
// End of file
//==================================================
