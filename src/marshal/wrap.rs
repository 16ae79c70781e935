//==================================================
// File: marshal/wrap.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Boundary object carrying a guest scalar through the VM heap
// Objective: Hold exactly one guest share per wrapper and release it when
//            the VM drops the wrapper
//==================================================

use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::guest::{GuestInterpreter, SvHandle};
use crate::vm::VmValue;

/// VM-side object wrapping a guest scalar.
///
/// This is the only type that holds a guest handle from the VM heap. It owns
/// one share of the scalar and gives it back in `Drop`; the interpreter it
/// points at is always the one that owns the scalar.
pub struct GuestScalar {
    interp: Arc<GuestInterpreter>,
    sv: SvHandle,
}

impl GuestScalar {
    pub fn interpreter(&self) -> &Arc<GuestInterpreter> {
        &self.interp
    }

    pub fn handle(&self) -> SvHandle {
        self.sv
    }

    /// Hands out a new share of the wrapped scalar for use inside `target`.
    pub(crate) fn share_with(&self, target: &GuestInterpreter) -> BridgeResult<SvHandle> {
        if self.interp.id() != target.id() {
            return Err(BridgeError::CrossInterpreter {
                owner: self.interp.id(),
                target: target.id(),
            });
        }
        self.interp.refcnt_inc(self.sv)?;
        Ok(self.sv)
    }
}

impl Drop for GuestScalar {
    fn drop(&mut self) {
        match self.interp.refcnt_dec(self.sv) {
            Ok(remaining) => trace!(
                interpreter = self.interp.id(),
                slot = self.sv.index(),
                remaining,
                "guest scalar released"
            ),
            Err(err) => warn!(interpreter = self.interp.id(), %err, "guest scalar release failed"),
        }
    }
}

impl fmt::Debug for GuestScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GuestScalar(#{}:{}.{})",
            self.interp.id(),
            self.sv.index(),
            self.sv.generation()
        )
    }
}

/// Wraps `sv` in a boundary object, taking a new share of it.
pub fn wrap_sv(interp: &Arc<GuestInterpreter>, sv: SvHandle) -> BridgeResult<VmValue> {
    interp.refcnt_inc(sv)?;
    Ok(VmValue::Guest(Arc::new(GuestScalar {
        interp: Arc::clone(interp),
        sv,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_holds_one_share_until_dropped() {
        let interp = GuestInterpreter::new();
        let sv = interp.new_int(5);
        let wrapped = wrap_sv(&interp, sv).unwrap();
        assert_eq!(interp.refcnt(sv).unwrap(), 2);

        interp.refcnt_dec(sv).unwrap();
        assert!(interp.is_live(sv));
        drop(wrapped);
        assert!(!interp.is_live(sv));
    }

    #[test]
    fn clones_of_the_vm_value_share_one_wrapper() {
        let interp = GuestInterpreter::new();
        let sv = interp.new_str("shared");
        let wrapped = wrap_sv(&interp, sv).unwrap();
        let alias = wrapped.clone();
        assert_eq!(interp.refcnt(sv).unwrap(), 2);
        drop(wrapped);
        assert_eq!(interp.refcnt(sv).unwrap(), 2);
        drop(alias);
        assert_eq!(interp.refcnt(sv).unwrap(), 1);
    }

    #[test]
    fn sharing_with_another_interpreter_is_rejected() {
        let owner = GuestInterpreter::new();
        let other = GuestInterpreter::new();
        let sv = owner.new_int(1);
        let wrapped = wrap_sv(&owner, sv).unwrap();
        let scalar = wrapped.as_guest().expect("boundary object");

        let err = scalar.share_with(&other).unwrap_err();
        assert!(matches!(err, BridgeError::CrossInterpreter { .. }));
        assert_eq!(owner.refcnt(sv).unwrap(), 2);
    }
}

//==================================================
// End of file
//==================================================
