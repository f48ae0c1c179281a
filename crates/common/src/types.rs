//! Common data types for the fuzz stub crates.

use crate::error::{Result, StubError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fully qualified gRPC method path, e.g. `/helloworld.Greeter/SayHello`.
///
/// The service segment carries the proto package (when there is one) joined to
/// the service name with a dot. Neither segment may be empty or contain
/// whitespace, `/`, or NUL, so the path is always safe to expose through the C
/// ABI as a NUL-terminated string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodPath(String);

impl MethodPath {
    /// Build a path from its parts. An empty `package` yields `/<service>/<method>`.
    ///
    /// # Errors
    ///
    /// Returns `StubError::InvalidMethodPath` if any part contains characters
    /// that cannot appear in a method path.
    pub fn new(package: &str, service: &str, method: &str) -> Result<Self> {
        let qualified_service = if package.is_empty() {
            service.to_string()
        } else {
            format!("{package}.{service}")
        };
        Self::parse(&format!("/{qualified_service}/{method}"))
    }

    /// Validate an existing path string.
    ///
    /// # Errors
    ///
    /// Returns `StubError::InvalidMethodPath` if the string is not of the form
    /// `/<service>/<method>`.
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = || StubError::InvalidMethodPath(path.to_string());

        let rest = path.strip_prefix('/').ok_or_else(invalid)?;
        let (service, method) = rest.split_once('/').ok_or_else(invalid)?;

        for segment in [service, method] {
            if segment.is_empty() || !segment.chars().all(is_path_char) {
                return Err(invalid());
            }
        }
        if service.starts_with('.') || service.ends_with('.') || service.contains("..") {
            return Err(invalid());
        }

        Ok(Self(path.to_string()))
    }

    /// The path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Package-qualified service name (`helloworld.Greeter`)
    #[must_use]
    pub fn service(&self) -> &str {
        self.split().0
    }

    /// Method name (`SayHello`)
    #[must_use]
    pub fn method(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // Shape was checked in `parse`.
        let rest = self.0.strip_prefix('/').unwrap_or(&self.0);
        rest.split_once('/').unwrap_or((rest, ""))
    }
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

impl fmt::Display for MethodPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MethodPath {
    type Err = StubError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MethodPath {
    type Error = StubError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MethodPath> for String {
    fn from(value: MethodPath) -> Self {
        value.0
    }
}
