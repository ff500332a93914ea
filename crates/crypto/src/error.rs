//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// Every variant names the offending field so callers can decide whether
/// to retry, redraft or abandon a bid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The secure random source could not be read. Never retried internally.
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameters { field: &'static str, reason: String },

    #[error("Encoded `{field}` is {got_bytes} bytes, must be at most {max_bytes}")]
    ValueTooLarge {
        field: &'static str,
        max_bytes: usize,
        got_bytes: usize,
    },

    #[error("Cannot encode `{field}`: {reason}")]
    EncodingError { field: &'static str, reason: String },

    /// The published commitment does not correspond to the claimed plaintext.
    #[error("Decrypted `{field}` does not match the published commitment")]
    DecryptionMismatch { field: &'static str },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
}

impl CryptoError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn encoding(field: &'static str, reason: impl Into<String>) -> Self {
        Self::EncodingError {
            field,
            reason: reason.into(),
        }
    }

    /// The offending field, when the error concerns one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidParameters { field, .. }
            | Self::ValueTooLarge { field, .. }
            | Self::EncodingError { field, .. }
            | Self::DecryptionMismatch { field } => Some(field),
            Self::EntropyUnavailable(_) | Self::KeyGeneration(_) => None,
        }
    }
}
