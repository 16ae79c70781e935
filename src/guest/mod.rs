//! Embedded guest runtime: reference-counted scalars, the argument stack and
//! the call primitives the bridge marshals into.

pub mod errors;
pub mod heap;
pub mod interpreter;
pub mod stack;

pub use errors::{GuestError, GuestResult};
pub use heap::{GuestHeap, GuestSub, SvBody, SvHandle};
pub use interpreter::{CallMode, CallScope, CallTarget, GuestInterpreter};
pub use stack::GuestStack;
