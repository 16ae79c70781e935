//==================================================
// File: marshal/call.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Cross-runtime call dispatch
// Objective: Build a guest call frame from VM arguments, invoke the guest
//            and box every result back into a VM result array
//==================================================

use std::sync::Arc;

use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::guest::{CallMode, CallScope, CallTarget, GuestInterpreter, SvHandle};
use crate::vm::{VmArray, VmHash, VmNamespace, VmValue};

use super::args::push_arguments;
use super::convert::marshal_arg;
use super::wrap::wrap_sv;

/// Receiver of a method call.
#[derive(Debug, Clone)]
pub enum Invocant {
    /// A guest scalar, usually a blessed reference.
    Scalar(SvHandle),
    /// A package name, for class-method calls.
    Namespace(VmNamespace),
}

/// Calls `method` on `invocant` in list context and returns the results in
/// logical order.
///
/// `positional[0]` is the VM's own invocant slot: VM method calls pass the
/// receiver as the first positional argument, and the guest receives it
/// through `invocant` instead, so the slot is dropped before marshaling. When
/// it is missing the call is rejected under `strict_invocant_slot`.
pub fn call_method(
    interp: &Arc<GuestInterpreter>,
    config: &BridgeConfig,
    method: &str,
    invocant: Invocant,
    positional: VmArray,
    named: VmHash,
) -> BridgeResult<VmArray> {
    let scope = interp.enter_scope();
    interp.push_mark();
    match invocant {
        Invocant::Scalar(sv) => {
            interp.refcnt_inc(sv)?;
            interp.push_mortal(sv)?;
        }
        Invocant::Namespace(namespace) => {
            let class = VmValue::string(namespace.ns_name());
            let sv = marshal_arg(interp, config, &class)?;
            interp.push_mortal(sv)?;
        }
    }

    if positional.shift().is_none() && config.strict_invocant_slot {
        return Err(BridgeError::MissingInvocantSlot);
    }
    let pushed = push_arguments(&scope, config, positional, named)?;
    debug!(method, argc = pushed + 1, depth = scope.depth(), "guest method call");

    let count = interp.call_method(method, CallMode::List)?;
    collect_results(&scope, count)
}

/// Calls a guest sub or code value in `mode`. No invocant slot is involved;
/// every positional argument is passed.
pub fn call_in(
    interp: &Arc<GuestInterpreter>,
    config: &BridgeConfig,
    target: &CallTarget,
    mode: CallMode,
    positional: VmArray,
    named: VmHash,
) -> BridgeResult<VmArray> {
    let scope = interp.enter_scope();
    interp.push_mark();
    let pushed = push_arguments(&scope, config, positional, named)?;
    debug!(?target, ?mode, argc = pushed, depth = scope.depth(), "guest sub call");

    let count = interp.call_sv(target, mode)?;
    collect_results(&scope, count)
}

/// Pops `count` results and wraps them into a fresh VM array.
///
/// The guest leaves results on its stack in logical order, so popping yields
/// them last-first. The popped list is reversed once, which puts the first
/// logical result at index 0. Wrapping happens while `scope` still holds the
/// mortal shares; afterwards the wrappers hold the only shares left.
fn collect_results(scope: &CallScope<'_>, count: usize) -> BridgeResult<VmArray> {
    let interp = scope.interpreter();
    let mut popped = Vec::with_capacity(count);
    for _ in 0..count {
        let sv = interp.pop()?;
        popped.push(wrap_sv(interp, sv)?);
    }
    popped.reverse();
    Ok(VmArray::from_values(popped))
}


//==================================================
// End of file
//==================================================
