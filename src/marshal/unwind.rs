//==================================================
// File: marshal/unwind.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Return path out of a cross-runtime invocation
// Objective: Collapse the stale VM frame left behind by a tail-called invoke
//==================================================

use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::vm::{OpAddress, PendingContinuation, VmCallContext};

/// Picks the address the VM resumes at once a guest invocation returns.
///
/// A tail-called invocation has already handed its result to the grandparent
/// frame, so the current context's caller continuation is invoked instead of
/// falling through to `next`. The `NeedContinuation` sentinel and non-tail
/// continuations return `next` untouched.
pub fn finish_invoke(ctx: &mut VmCallContext, next: OpAddress) -> BridgeResult<OpAddress> {
    let tail_call = match ctx.pending() {
        PendingContinuation::Ready(pending) => pending.is_tail_call(),
        PendingContinuation::None | PendingContinuation::NeedContinuation => false,
    };
    if !tail_call {
        return Ok(next);
    }

    let caller = ctx
        .caller_continuation()
        .ok_or(BridgeError::MissingCallerContinuation)?;
    let resume = caller.invoke(ctx, next);
    debug!(
        caller = caller.label(),
        %next,
        %resume,
        depth = ctx.depth(),
        "tail call collapsed"
    );
    Ok(resume)
}


//==================================================
// End of file
//==================================================
