//==================================================
// File: vm/continuation.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Continuation-passing call chain of the host VM
// Objective: Model resume addresses, tail-call flags and the context frames
//            that cross-runtime invocations return through
//==================================================

use std::fmt;
use std::sync::Arc;

/// Address the VM run loop resumes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpAddress(pub usize);

impl fmt::Display for OpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:#06x}", self.0)
    }
}

/// Resumption point of a VM call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    label: String,
    resume: Option<OpAddress>,
    tail_call: bool,
}

impl Continuation {
    pub fn new(label: impl Into<String>, resume: OpAddress) -> Self {
        Self {
            label: label.into(),
            resume: Some(resume),
            tail_call: false,
        }
    }

    /// Continuation back into the run loop without a fixed address.
    pub fn unbound(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            resume: None,
            tail_call: false,
        }
    }

    pub fn tail_called(mut self) -> Self {
        self.tail_call = true;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_tail_call(&self) -> bool {
        self.tail_call
    }

    pub fn resume_address(&self) -> Option<OpAddress> {
        self.resume
    }

    /// Returns through this continuation: the frame it belongs to is popped
    /// from `ctx` and the run loop resumes at its address, or at `next` for
    /// an unbound continuation.
    pub fn invoke(&self, ctx: &mut VmCallContext, next: OpAddress) -> OpAddress {
        ctx.leave();
        self.resume.unwrap_or(next)
    }
}

/// The interpreter's pending-continuation register.
#[derive(Debug, Clone, Default)]
pub enum PendingContinuation {
    #[default]
    None,
    /// Sentinel: a continuation will be created lazily if one is needed.
    NeedContinuation,
    Ready(Arc<Continuation>),
}

#[derive(Debug, Clone)]
struct ContextFrame {
    sub_name: String,
    caller: Arc<Continuation>,
}

/// Chain of active VM call contexts.
#[derive(Debug, Default)]
pub struct VmCallContext {
    frames: Vec<ContextFrame>,
    pending: PendingContinuation,
}

impl VmCallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a context for `sub_name`, returning through `caller`.
    pub fn enter(&mut self, sub_name: impl Into<String>, caller: Continuation) {
        self.frames.push(ContextFrame {
            sub_name: sub_name.into(),
            caller: Arc::new(caller),
        });
    }

    pub fn leave(&mut self) -> Option<String> {
        self.frames.pop().map(|frame| frame.sub_name)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_sub(&self) -> Option<&str> {
        self.frames.last().map(|frame| frame.sub_name.as_str())
    }

    /// Caller continuation of the current context.
    pub fn caller_continuation(&self) -> Option<Arc<Continuation>> {
        self.frames.last().map(|frame| Arc::clone(&frame.caller))
    }

    pub fn pending(&self) -> &PendingContinuation {
        &self.pending
    }

    pub fn set_pending(&mut self, pending: PendingContinuation) {
        self.pending = pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoking_a_continuation_pops_its_frame() {
        let mut ctx = VmCallContext::new();
        ctx.enter("outer", Continuation::new("main", OpAddress(4)));
        ctx.enter("inner", Continuation::new("outer", OpAddress(12)));
        let caller = ctx.caller_continuation().expect("caller");
        assert_eq!(caller.resume_address(), Some(OpAddress(12)));

        assert_eq!(caller.invoke(&mut ctx, OpAddress(99)), OpAddress(12));
        assert_eq!(ctx.current_sub(), Some("outer"));
    }

    #[test]
    fn unbound_continuation_resumes_at_next() {
        let mut ctx = VmCallContext::new();
        ctx.enter("entry", Continuation::unbound("runloop"));
        let caller = ctx.caller_continuation().expect("caller");
        assert_eq!(caller.resume_address(), None);
        assert_eq!(caller.invoke(&mut ctx, OpAddress(7)), OpAddress(7));
        assert_eq!(ctx.depth(), 0);
    }
}

//==================================================
// End of file
//==================================================
