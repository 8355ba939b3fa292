//! Root key store error types and result alias.
//!
//! All backing implementations must map their internal errors to these
//! standardized error types.
//!
//! # Error Types
//!
//! - [`KeyStoreError::NotFound`] - No record for the id in any known schema
//! - [`KeyStoreError::Corrupt`] - A legacy record exists but cannot be decoded
//! - [`KeyStoreError::Unavailable`] - Backing I/O failed
//! - [`KeyStoreError::Conflict`] - An insert observed a duplicate id
//! - [`KeyStoreError::Timeout`] - Operation exceeded its ambient deadline
//!
//! # Example
//!
//! ```
//! use rootkeeper_storage::{KeyId, KeyStoreError, KeyStoreResult, RootKey};
//!
//! fn lookup(id: &KeyId) -> KeyStoreResult<RootKey> {
//!     Err(KeyStoreError::not_found(id))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::types::KeyId;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for root key store operations.
pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Errors that can occur during root key store operations.
///
/// This is the canonical taxonomy surfaced to token-issuing and
/// token-verifying callers. Backing implementations map their internal
/// error types to these variants; none are recovered internally except
/// the single intentional fallback "absent from the primary schema →
/// try the legacy bridge", which is modeled as `Ok(None)` rather than
/// an error so genuine I/O failures can never be masked.
///
/// Errors preserve their source chain via the `#[source]` attribute,
/// enabling debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added
/// in future minor releases without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyStoreError {
    /// No root key with the given id exists in any known schema.
    ///
    /// Callers treat the token as unverifiable, not as a system fault.
    #[error("root key not found: {id}")]
    NotFound {
        /// Hex rendering of the id that was not found.
        id: String,
    },

    /// A legacy record exists for the id but cannot be decoded.
    ///
    /// Distinct from [`NotFound`](Self::NotFound) so operators can
    /// diagnose data corruption separately from routine key expiry.
    #[error("corrupt legacy root key record: {message}")]
    Corrupt {
        /// Description of what failed to decode.
        message: String,
        /// The underlying decode error.
        #[source]
        source: Option<BoxError>,
    },

    /// The backing store could not be reached or the I/O failed.
    ///
    /// Always surfaced, never swallowed: minting must not proceed on a
    /// false assumption that no current key exists.
    #[error("backing store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: Option<BoxError>,
    },

    /// An insert observed a duplicate id.
    ///
    /// Fatal to the mint attempt; never retried with the same id.
    /// With random id generation this indicates a store-level problem,
    /// not a routine race.
    #[error("root key already exists: {id}")]
    Conflict {
        /// Hex rendering of the duplicate id.
        id: String,
    },

    /// The backing operation exceeded its ambient deadline.
    #[error("backing store operation timed out")]
    Timeout,
}

impl KeyStoreError {
    /// Creates a new `NotFound` error for the given id.
    #[must_use]
    pub fn not_found(id: &KeyId) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Creates a new `Corrupt` error with the given message.
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt { message: message.into(), source: None }
    }

    /// Creates a new `Corrupt` error with a message and source error.
    #[must_use]
    pub fn corrupt_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Corrupt { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Unavailable` error with the given message.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into(), source: None }
    }

    /// Creates a new `Unavailable` error with a message and source error.
    #[must_use]
    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unavailable { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Conflict` error for the given id.
    #[must_use]
    pub fn conflict(id: &KeyId) -> Self {
        Self::Conflict { id: id.to_string() }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Returns true for transient failures where a caller-level retry
    /// may succeed (the store itself never retries).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = KeyId::from(vec![0xab, 0xcd]);
        assert_eq!(KeyStoreError::not_found(&id).to_string(), "root key not found: abcd");
        assert_eq!(KeyStoreError::conflict(&id).to_string(), "root key already exists: abcd");
        assert_eq!(
            KeyStoreError::corrupt("bad payload").to_string(),
            "corrupt legacy root key record: bad payload"
        );
        assert_eq!(
            KeyStoreError::unavailable("connection refused").to_string(),
            "backing store unavailable: connection refused"
        );
        assert_eq!(KeyStoreError::timeout().to_string(), "backing store operation timed out");
    }

    #[test]
    fn test_is_transient() {
        let id = KeyId::from(vec![1]);
        assert!(KeyStoreError::unavailable("down").is_transient());
        assert!(KeyStoreError::timeout().is_transient());
        assert!(!KeyStoreError::not_found(&id).is_transient());
        assert!(!KeyStoreError::conflict(&id).is_transient());
        assert!(!KeyStoreError::corrupt("bad").is_transient());
    }

    #[test]
    fn test_source_chain_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = KeyStoreError::unavailable_with_source("dial failed", io);

        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("refused"));
    }
}
