pub mod continuation;
pub mod value;

pub use continuation::{Continuation, OpAddress, PendingContinuation, VmCallContext};
pub use value::{Capability, VmArray, VmHash, VmNamespace, VmObject, VmValue};
