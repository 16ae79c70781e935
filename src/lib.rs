//==================================================
// File: lib.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Bridge between the host VM object model and an embedded guest runtime
// Objective: Marshal values and calls across two independently managed heaps
//==================================================

//! Value and call marshaling between a host VM and an embedded,
//! reference-counted guest runtime.
//!
//! [`Bridge`] is the entry point. VM values become guest scalars through
//! [`Bridge::marshal_arg`]; guest scalars come back as boundary objects
//! ([`marshal::GuestScalar`]) through [`Bridge::wrap_sv`]. Method and sub
//! calls go through [`Bridge::call_method`] and [`Bridge::call_in`], and
//! [`Bridge::finish_invoke`] fixes up the VM return path after a tail-called
//! invocation.

pub mod bridge;
pub mod config;
pub mod error;
pub mod guest;
pub mod logging;
pub mod marshal;
pub mod metrics;
pub mod vm;

pub use bridge::Bridge;
pub use config::{BridgeConfig, StringPolicy};
pub use error::{BridgeError, BridgeResult};
pub use guest::{CallMode, CallTarget, GuestError, GuestInterpreter, SvHandle};
pub use marshal::{GuestScalar, Invocant};
pub use metrics::{BridgeCounters, BridgeEventKind, BridgeTelemetry};
pub use vm::{OpAddress, VmArray, VmCallContext, VmHash, VmNamespace, VmValue};

//==================================================
// End of file
//==================================================
