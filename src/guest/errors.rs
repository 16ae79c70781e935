//==================================================
// File: guest/errors.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Failure modes of the embedded guest runtime
// Objective: Give guest-side failures their own type so the bridge can pass
//            them through without translating them
//==================================================

use thiserror::Error;

pub type GuestResult<T> = Result<T, GuestError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuestError {
    #[error("can't locate method \"{method}\" in package \"{package}\"")]
    MethodNotFound { method: String, package: String },
    #[error("undefined subroutine &{0} called")]
    SubNotFound(String),
    #[error("not a code reference")]
    NotCallable,
    #[error("can't call method \"{method}\" on {reason}")]
    InvalidInvocant { method: String, reason: String },
    #[error("attempt to use freed scalar (slot {index}, generation {generation})")]
    StaleHandle { index: u32, generation: u32 },
    #[error("guest stack underflow")]
    StackUnderflow,
    #[error("{0}")]
    Died(String),
}

impl GuestError {
    pub fn died(message: impl Into<String>) -> Self {
        GuestError::Died(message.into())
    }
}

//==================================================
// End of file
//==================================================
