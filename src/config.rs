//==================================================
// File: config.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tunables for the marshaling bridge
// Objective: Load bridge limits and string policy from TOML with defaults
//            for every field
//==================================================

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How VM strings become guest byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringPolicy {
    /// Copy every byte, embedded NUL included.
    #[default]
    Preserve,
    /// Stop at the first NUL, as a C string would.
    TruncateAtNul,
}

impl StringPolicy {
    pub fn apply(self, bytes: &[u8]) -> &[u8] {
        match self {
            StringPolicy::Preserve => bytes,
            StringPolicy::TruncateAtNul => match bytes.iter().position(|byte| *byte == 0) {
                Some(end) => &bytes[..end],
                None => bytes,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Deepest aggregate nesting converted before giving up.
    pub max_depth: usize,
    pub string_policy: StringPolicy,
    /// Record one telemetry event per call in addition to the counters.
    pub trace_calls: bool,
    /// Reject method calls whose positional list lacks the invocant slot.
    pub strict_invocant_slot: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            string_policy: StringPolicy::Preserve,
            trace_calls: false,
            strict_invocant_slot: true,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_string_policy(mut self, policy: StringPolicy) -> Self {
        self.string_policy = policy;
        self
    }

    pub fn with_trace_calls(mut self, trace_calls: bool) -> Self {
        self.trace_calls = trace_calls;
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid bridge configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read bridge config {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("failed to parse bridge config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = BridgeConfig::from_toml_str("max_depth = 8\n").expect("parse");
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.string_policy, StringPolicy::Preserve);
        assert!(config.strict_invocant_slot);
    }

    #[test]
    fn string_policy_parses_snake_case() {
        let config =
            BridgeConfig::from_toml_str("string_policy = \"truncate_at_nul\"\n").expect("parse");
        assert_eq!(config.string_policy, StringPolicy::TruncateAtNul);
        assert_eq!(config.string_policy.apply(b"ab\0cd"), b"ab");
        assert_eq!(StringPolicy::Preserve.apply(b"ab\0cd"), b"ab\0cd");
    }

    #[test]
    fn builder_overrides_the_defaults() {
        let config = BridgeConfig::new()
            .with_max_depth(4)
            .with_string_policy(StringPolicy::TruncateAtNul)
            .with_trace_calls(true);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.string_policy, StringPolicy::TruncateAtNul);
        assert!(config.trace_calls);
        assert_eq!(BridgeConfig::new(), BridgeConfig::default());
    }

    #[test]
    fn unknown_policy_is_an_error() {
        assert!(BridgeConfig::from_toml_str("string_policy = \"latin1\"\n").is_err());
    }
}

//==================================================
// End of file
//==================================================
