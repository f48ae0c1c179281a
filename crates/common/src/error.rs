//! Common error types for the fuzz stub crates.

use thiserror::Error;

/// Common errors that can occur across the fuzz stub crates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StubError {
    /// A gRPC method path did not have the `/<service>/<method>` shape
    #[error("Invalid method path: {0}")]
    InvalidMethodPath(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using `StubError`
pub type Result<T> = std::result::Result<T, StubError>;
