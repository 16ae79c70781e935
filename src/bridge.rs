//==================================================
// File: bridge.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Public entry points of the VM <-> guest bridge
// Objective: Bind one guest interpreter to a config and telemetry collector
//            and front the marshaling core with them
//==================================================

use std::sync::Arc;

use tracing::instrument;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::guest::{CallMode, CallScope, CallTarget, GuestInterpreter, SvBody, SvHandle};
use crate::marshal::{self, Invocant};
use crate::metrics::{BridgeEventKind, BridgeTelemetry};
use crate::vm::{OpAddress, PendingContinuation, VmArray, VmCallContext, VmHash, VmValue};

/// Marshaling bridge bound to one guest interpreter.
///
/// Cloning is cheap; clones share the interpreter and the telemetry buffer.
/// Guest code that calls back into the VM can build a bridge over the
/// interpreter it was handed and re-enter it, since every call opens its own
/// nested scope.
#[derive(Debug, Clone)]
pub struct Bridge {
    interp: Arc<GuestInterpreter>,
    config: BridgeConfig,
    telemetry: BridgeTelemetry,
}

impl Bridge {
    pub fn new(interp: Arc<GuestInterpreter>) -> Self {
        Self::with_config(interp, BridgeConfig::default())
    }

    pub fn with_config(interp: Arc<GuestInterpreter>, config: BridgeConfig) -> Self {
        Self {
            interp,
            config,
            telemetry: BridgeTelemetry::new(),
        }
    }

    /// Shares `telemetry` with another bridge or an embedder.
    pub fn with_telemetry(mut self, telemetry: BridgeTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn interpreter(&self) -> &Arc<GuestInterpreter> {
        &self.interp
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &BridgeTelemetry {
        &self.telemetry
    }

    //==================================================
    // Section 1.0 - Values
    //==================================================

    /// Converts a VM value to a guest scalar. The caller owns one share of
    /// the result and must release it (or hand it to the guest).
    pub fn marshal_arg(&self, value: &VmValue) -> BridgeResult<SvHandle> {
        let result = marshal::marshal_arg(&self.interp, &self.config, value);
        self.observe(BridgeEventKind::Convert, result, || {
            format!("convert {}", value.type_name())
        })
    }

    /// Wraps a guest scalar in a boundary object holding its own share.
    pub fn wrap_sv(&self, sv: SvHandle) -> BridgeResult<VmValue> {
        let result = marshal::wrap_sv(&self.interp, sv);
        self.observe(BridgeEventKind::Wrap, result, || {
            format!("wrap slot {}", sv.index())
        })
    }

    /// Reads a boundary object back as a plain VM scalar.
    ///
    /// Integers, numbers, strings and undef come back as VM natives;
    /// references and code values stay wrapped. Values that are not boundary
    /// objects are returned as they are.
    pub fn unwrap_scalar(&self, value: &VmValue) -> BridgeResult<VmValue> {
        let Some(scalar) = value.as_guest() else {
            return Ok(value.clone());
        };
        if scalar.interpreter().id() != self.interp.id() {
            return Err(BridgeError::CrossInterpreter {
                owner: scalar.interpreter().id(),
                target: self.interp.id(),
            });
        }
        let unwrapped = match self.interp.body(scalar.handle())? {
            SvBody::Undef => VmValue::Undef,
            SvBody::Int(number) => VmValue::Integer(number),
            SvBody::Num(number) => VmValue::Float(number),
            SvBody::Str(bytes) => VmValue::String(String::from_utf8_lossy(&bytes).into_owned()),
            SvBody::Ref(_) | SvBody::Array(_) | SvBody::Hash(_) | SvBody::Code(_) => value.clone(),
        };
        Ok(unwrapped)
    }

    //==================================================
    // Section 2.0 - Calls
    //==================================================

    /// Pushes VM arguments onto the guest stack inside `scope`; see
    /// [`marshal::push_arguments`].
    pub fn push_arguments(
        &self,
        scope: &CallScope<'_>,
        positional: VmArray,
        named: VmHash,
    ) -> BridgeResult<usize> {
        let result = marshal::push_arguments(scope, &self.config, positional, named);
        self.observe(BridgeEventKind::Push, result, || "push arguments".to_string())
    }

    /// Calls a guest method in list context and returns the wrapped results
    /// in logical order. `positional[0]` is the VM invocant slot and is not
    /// passed on.
    #[instrument(
        level = "debug",
        skip(self, invocant, positional, named),
        fields(interpreter = self.interp.id())
    )]
    pub fn call_method(
        &self,
        method: &str,
        invocant: Invocant,
        positional: VmArray,
        named: VmHash,
    ) -> BridgeResult<VmArray> {
        let result =
            marshal::call_method(&self.interp, &self.config, method, invocant, positional, named);
        self.observe(BridgeEventKind::Call, result, || format!("method {method}"))
    }

    /// Calls a guest sub or code value in the requested context.
    #[instrument(
        level = "debug",
        skip(self, positional, named),
        fields(interpreter = self.interp.id())
    )]
    pub fn call_in(
        &self,
        target: &CallTarget,
        mode: CallMode,
        positional: VmArray,
        named: VmHash,
    ) -> BridgeResult<VmArray> {
        let result =
            marshal::call_in(&self.interp, &self.config, target, mode, positional, named);
        self.observe(BridgeEventKind::Call, result, || format!("sub {target:?}"))
    }

    /// Resume address after a guest invocation; see [`marshal::finish_invoke`].
    pub fn finish_invoke(
        &self,
        ctx: &mut VmCallContext,
        next: OpAddress,
    ) -> BridgeResult<OpAddress> {
        let tail_call = matches!(
            ctx.pending(),
            PendingContinuation::Ready(pending) if pending.is_tail_call()
        );
        let result = marshal::finish_invoke(ctx, next);
        match &result {
            Ok(resume) if tail_call => {
                self.note(BridgeEventKind::TailCollapse, || format!("{next} -> {resume}"))
            }
            Ok(_) => {}
            Err(err) => self.note(BridgeEventKind::Failure, || err.to_string()),
        }
        result
    }

    //==================================================
    // Section 3.0 - Telemetry
    //==================================================

    fn observe<T>(
        &self,
        kind: BridgeEventKind,
        result: BridgeResult<T>,
        detail: impl FnOnce() -> String,
    ) -> BridgeResult<T> {
        match &result {
            Ok(_) => self.note(kind, detail),
            Err(err) => self.note(BridgeEventKind::Failure, || format!("{}: {err}", detail())),
        }
        result
    }

    fn note(&self, kind: BridgeEventKind, detail: impl FnOnce() -> String) {
        if self.config.trace_calls {
            self.telemetry.record(kind, Some(detail()));
        } else {
            self.telemetry.count(kind);
        }
    }
}


//==================================================
// End of file
//==================================================
