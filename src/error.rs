//==================================================
// File: error.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Error taxonomy for the VM <-> guest bridge
// Objective: Surface conversion, invocation and boundary failures as typed
//            errors while passing guest failures through untranslated
//==================================================

use thiserror::Error;

use crate::guest::GuestError;

/// Result type used across the bridge.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    /// The VM value has no marshaling rule.
    #[error("cannot marshal VM value of type '{type_name}' to the guest runtime")]
    UnsupportedConversion { type_name: String },
    /// The guest call itself failed.
    #[error(transparent)]
    GuestInvocation(#[from] GuestError),
    #[error("guest scalar owned by interpreter #{owner} cannot be passed to interpreter #{target}")]
    CrossInterpreter { owner: u64, target: u64 },
    #[error("VM value nesting exceeds the marshaling limit of {limit}")]
    NestingTooDeep { limit: usize },
    #[error("method call is missing the positional invocant slot")]
    MissingInvocantSlot,
    #[error("tail-called invoke has no caller continuation to return through")]
    MissingCallerContinuation,
}

impl BridgeError {
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        BridgeError::UnsupportedConversion {
            type_name: type_name.into(),
        }
    }

    /// True when the failure originated inside the guest runtime.
    pub fn is_guest_failure(&self) -> bool {
        matches!(self, BridgeError::GuestInvocation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_names_the_type() {
        let err = BridgeError::unsupported("Sub");
        assert!(err.to_string().contains("'Sub'"), "{err}");
    }

    #[test]
    fn guest_errors_pass_through_untranslated() {
        let guest = GuestError::Died("boom".into());
        let err: BridgeError = guest.clone().into();
        assert!(err.is_guest_failure());
        assert_eq!(err.to_string(), guest.to_string());
    }
}

//==================================================
// End of file
//==================================================
