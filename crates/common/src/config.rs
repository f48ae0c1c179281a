//! Common configuration types for the fuzz stub crates.
//!
//! `MutatorConfig` loads from a variable map so tests can drive it without
//! touching the process environment; `from_env` is a thin wrapper.

use crate::error::{Result, StubError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Tunables for the structural proto mutator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutatorConfig {
    /// Upper bound on structural mutations applied per call (at least 1)
    pub mutations_per_call: u32,
    /// Re-encode attempts before falling back when output exceeds `max_size`
    pub encode_attempts: u32,
    /// Maximum bytes a single string/bytes mutation may add
    pub max_string_growth: usize,
    /// Maximum elements a repeated field may grow to
    pub max_repeated: usize,
    /// Maximum nested message depth the mutator descends into
    pub max_depth: u32,
}

impl MutatorConfig {
    /// Defaults usable in `const`/`static` context
    pub const DEFAULT: Self = Self {
        mutations_per_call: 4,
        encode_attempts: 8,
        max_string_growth: 32,
        max_repeated: 16,
        max_depth: 8,
    };

    /// Largest value `from_vars` accepts for each tunable
    pub const LIMITS: Self = Self {
        mutations_per_call: 64,
        encode_attempts: 64,
        max_string_growth: 4096,
        max_repeated: 1024,
        max_depth: 64,
    };

    /// Bring every tunable into `1..=LIMITS` (counts) or `0..=LIMITS` (sizes)
    #[must_use]
    pub const fn clamped(self) -> Self {
        const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
            if value < min {
                min
            } else if value > max {
                max
            } else {
                value
            }
        }
        const fn cap_usize(value: usize, max: usize) -> usize {
            if value > max {
                max
            } else {
                value
            }
        }

        let limits = Self::LIMITS;
        Self {
            mutations_per_call: clamp_u32(self.mutations_per_call, 1, limits.mutations_per_call),
            encode_attempts: clamp_u32(self.encode_attempts, 1, limits.encode_attempts),
            max_string_growth: cap_usize(self.max_string_growth, limits.max_string_growth),
            max_repeated: cap_usize(self.max_repeated, limits.max_repeated),
            max_depth: clamp_u32(self.max_depth, 0, limits.max_depth),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `StubError::Configuration` if a variable is present but invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing)
    ///
    /// # Errors
    ///
    /// Returns `StubError::Configuration` if a variable is present but not a
    /// number, or outside the range between its minimum and `LIMITS`.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::DEFAULT;
        let limits = Self::LIMITS;

        Ok(Self {
            mutations_per_call: in_range(
                "PROTO_STUB_MUTATIONS_PER_CALL",
                parse_var(vars, "PROTO_STUB_MUTATIONS_PER_CALL", defaults.mutations_per_call)?,
                1,
                limits.mutations_per_call,
            )?,
            encode_attempts: in_range(
                "PROTO_STUB_ENCODE_ATTEMPTS",
                parse_var(vars, "PROTO_STUB_ENCODE_ATTEMPTS", defaults.encode_attempts)?,
                1,
                limits.encode_attempts,
            )?,
            max_string_growth: in_range(
                "PROTO_STUB_MAX_STRING_GROWTH",
                parse_var(vars, "PROTO_STUB_MAX_STRING_GROWTH", defaults.max_string_growth)?,
                0,
                limits.max_string_growth,
            )?,
            max_repeated: in_range(
                "PROTO_STUB_MAX_REPEATED",
                parse_var(vars, "PROTO_STUB_MAX_REPEATED", defaults.max_repeated)?,
                0,
                limits.max_repeated,
            )?,
            max_depth: in_range(
                "PROTO_STUB_MAX_DEPTH",
                parse_var(vars, "PROTO_STUB_MAX_DEPTH", defaults.max_depth)?,
                0,
                limits.max_depth,
            )?,
        })
    }
}

impl Default for MutatorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| StubError::Configuration(format!("Invalid {key}={raw:?}: {e}"))),
    }
}

fn in_range<T>(key: &str, value: T, min: T, max: T) -> Result<T>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(StubError::Configuration(format!(
            "{key} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(value)
}
