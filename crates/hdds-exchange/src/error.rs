// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the exchange core.
//!
//! Local contract violations (`Concurrency`, `InvalidValue`, `TypeMismatch`)
//! are kept apart from failures of the underlying machinery (`Core`) so callers
//! can tell "my usage was wrong" from "the middleware failed".

use thiserror::Error;

/// Errors returned by exchange operations.
///
/// # Example
///
/// ```rust
/// use hdds_exchange::Error;
///
/// let err = Error::Timeout;
/// assert!(err.is_recoverable());
/// assert!(!Error::Concurrency.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Wait outcomes
    // ========================================================================
    /// The wait bound elapsed before the awaited condition became true.
    #[error("Timeout expired")]
    Timeout,

    /// Another wait is already outstanding on the same endpoint.
    #[error("cannot concurrently wait on the same endpoint")]
    Concurrency,

    /// The owning endpoint or participant was closed while the wait was pending.
    #[error("Wait cancelled: entity closed")]
    Cancelled,

    // ========================================================================
    // Configuration
    // ========================================================================
    /// Unresolvable participant, endpoint, type or topic name, or a malformed document.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========================================================================
    // Data access
    // ========================================================================
    /// Bad field name, path syntax, or out-of-domain value.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Value of the wrong kind for a field, or payload shape not matching the type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// Operation on an entity that has already been closed.
    #[error("Entity closed: {0}")]
    Closed(String),

    // ========================================================================
    // Core
    // ========================================================================
    /// Failure of the underlying machinery, carrying its diagnostic.
    #[error("Core error: {0}")]
    Core(String),
}

impl Error {
    /// True for outcomes the caller may simply retry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Timeout)
    }

    /// True for misuse of the API (as opposed to middleware failures).
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::Concurrency | Error::InvalidValue(_) | Error::TypeMismatch(_) | Error::Closed(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Core(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Core(format!("JSON: {}", err))
    }
}

/// Convenient alias for results using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_message_is_stable() {
        assert_eq!(
            Error::Concurrency.to_string(),
            "cannot concurrently wait on the same endpoint"
        );
    }

    #[test]
    fn usage_errors_are_distinct_from_core_errors() {
        assert!(Error::TypeMismatch("x".into()).is_usage_error());
        assert!(Error::InvalidValue("x".into()).is_usage_error());
        assert!(!Error::Core("boom".into()).is_usage_error());
        assert!(!Error::Timeout.is_usage_error());
    }

    #[test]
    fn io_errors_become_core_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err: Error = io.into();
        assert!(matches!(err, Error::Core(ref msg) if msg.contains("disk on fire")));
    }
}
