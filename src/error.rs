//! Error types for the connection pipeline.
//!
//! This module defines all error types used throughout the crate, and the
//! classification that the protocol routing handler relies on to decide
//! whether a failed transport attempt may fall back to the next one.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devicelink::{Error, Result};
//!
//! async fn example(head: &HandlerRef) -> Result<()> {
//!     head.open(true).await?;
//!     head.close().await
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Retryable | [`Error::Timeout`], [`Error::Socket`] (connectivity kinds), [`Error::Communication`], [`Error::FallbackExhausted`] |
//! | Fatal | [`Error::InvalidOperation`], [`Error::Unsupported`], [`Error::Transport`], [`Error::ConnectionClosed`], [`Error::Disposed`] |
//! | Composite | [`Error::Aggregate`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a pipeline definition or context is malformed, e.g. an
    /// empty factory sequence or a missing transport settings list.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Retryable Transport Errors
    // ========================================================================
    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Socket-level failure.
    ///
    /// Retryable only for connectivity kinds such as refused, reset or
    /// timed-out connections; see [`Error::is_retryable`].
    #[error("Socket error: {0}")]
    Socket(#[from] IoError),

    /// Communication with the cloud endpoint failed.
    #[error("Communication error: {message}")]
    Communication {
        /// Description of the communication failure.
        message: String,
    },

    /// Every transport configuration was attempted and none opened.
    ///
    /// Classified as a communication failure, so an outer routing handler
    /// treats it as retryable.
    #[error("Communication error: all {attempts} transport configurations failed")]
    FallbackExhausted {
        /// Number of configurations attempted.
        attempts: usize,
        /// Error of the final attempt.
        #[source]
        last_error: Box<Error>,
    },

    // ========================================================================
    // Fatal Errors
    // ========================================================================
    /// Operation is not valid in the handler's current state.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the invalid operation.
        message: String,
    },

    /// Operation is not supported by the transport.
    #[error("Unsupported operation: {operation}")]
    Unsupported {
        /// Name of the unsupported operation.
        operation: String,
    },

    /// Transport rejected the request for a non-transient reason.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// Connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Handler was disposed and can no longer be used.
    #[error("Handler disposed")]
    Disposed,

    // ========================================================================
    // Composite Errors
    // ========================================================================
    /// Several errors raised together.
    #[error("{} errors occurred", .0.len())]
    Aggregate(Vec<Error>),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a communication error.
    #[inline]
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// Creates a fallback exhausted error.
    #[inline]
    pub fn fallback_exhausted(attempts: usize, last_error: Error) -> Self {
        Self::FallbackExhausted {
            attempts,
            last_error: Box::new(last_error),
        }
    }

    /// Creates an invalid operation error.
    #[inline]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error.
    #[inline]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an aggregate error.
    #[inline]
    pub fn aggregate(errors: impl IntoIterator<Item = Error>) -> Self {
        Self::Aggregate(errors.into_iter().collect())
    }
}

// ============================================================================
// Retry Policy
// ============================================================================

/// How composite errors are classified for transport fallback.
///
/// Non-composite errors classify the same way under both policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retryable only if every leaf cause is retryable.
    #[default]
    Strict,
    /// Retryable if any leaf cause is retryable, even alongside fatal ones.
    AnyLeaf,
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a connection-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Socket(_)
                | Self::Communication { .. }
                | Self::FallbackExhausted { .. }
                | Self::ConnectionClosed
        )
    }

    /// Returns `true` if this is a composite error.
    #[inline]
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }

    /// Returns the non-composite causes of this error.
    ///
    /// Aggregates are flattened recursively. Any other error is its own
    /// single leaf. An empty aggregate has no leaves.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Error> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    /// Returns `true` if a transport attempt failing with this error may fall
    /// back to the next configuration.
    ///
    /// Uses [`RetryPolicy::Strict`].
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_retryable_with(RetryPolicy::Strict)
    }

    /// Returns `true` if this error is retryable under `policy`.
    #[must_use]
    pub fn is_retryable_with(&self, policy: RetryPolicy) -> bool {
        let leaves = self.leaves();
        if leaves.is_empty() {
            return false;
        }

        match policy {
            RetryPolicy::Strict => leaves.iter().all(|leaf| leaf.is_retryable_leaf()),
            RetryPolicy::AnyLeaf => leaves.iter().any(|leaf| leaf.is_retryable_leaf()),
        }
    }

    fn is_retryable_leaf(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Communication { .. } | Self::FallbackExhausted { .. } => {
                true
            }
            Self::Socket(e) => is_connectivity_kind(e.kind()),
            _ => false,
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Error>) {
        match self {
            Self::Aggregate(inner) => {
                for error in inner {
                    error.collect_leaves(out);
                }
            }
            leaf => out.push(leaf),
        }
    }
}

/// I/O error kinds that indicate the network path, not the request, failed.
fn is_connectivity_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::TimedOut
            | ErrorKind::BrokenPipe
            | ErrorKind::AddrNotAvailable
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
            | ErrorKind::NetworkDown
            | ErrorKind::UnexpectedEof
    )
}

// ============================================================================
// Tests
// ============================================================================
