// src/sanitize/error.rs

use thiserror::Error;

/// Errors raised by the sanitizer core.
///
/// Malformed markup is never an error: it is cleaned on a best-effort basis.
/// Only configuration problems surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// A policy name that is not registered in the policy table.
    #[error("unknown sanitize policy '{0}'")]
    UnknownPolicy(String),

    /// A policy whose whitelists contradict each other.
    #[error("invalid sanitize policy '{policy}': {reason}")]
    InvalidPolicy { policy: String, reason: String },
}
