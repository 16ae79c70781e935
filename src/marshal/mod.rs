//! VM <-> guest marshaling: value conversion, boundary wrapping, argument
//! stacks, call dispatch and the tail-call aware return path.

pub mod args;
pub mod call;
pub mod convert;
pub mod unwind;
pub mod wrap;

pub use args::push_arguments;
pub use call::{call_in, call_method, Invocant};
pub use convert::marshal_arg;
pub use unwind::finish_invoke;
pub use wrap::{wrap_sv, GuestScalar};
