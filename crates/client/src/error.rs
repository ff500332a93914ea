//! Bid lifecycle error types.

use thiserror::Error;

use sealbid_crypto::CryptoError;
use sealbid_types::{BidPhase, Nonce, PayloadFormatError, Timestamp};

use crate::ledger::LedgerError;

/// Errors that can occur while drafting, encrypting, publishing or
/// revealing a bid.
///
/// None of these are retried internally. [`BidError::is_retryable`] and
/// [`BidError::rejects_bid`] tell the caller whether to wait, redraft or
/// abandon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Format(#[from] PayloadFormatError),

    /// Reveal attempted before the window closed; retry after close.
    #[error("Auction open until {close_timestamp}, now {now}")]
    AuctionStillOpen {
        close_timestamp: Timestamp,
        now: Timestamp,
    },

    #[error("Nonce already published: {0}")]
    DuplicateNonce(Nonce),

    #[error("Cannot {action} a bid in phase {phase:?}")]
    InvalidTransition {
        phase: BidPhase,
        action: &'static str,
    },

    #[error("Ledger refused bid: {0}")]
    Ledger(LedgerError),
}

impl BidError {
    /// Only the temporal guard clears by itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AuctionStillOpen { .. })
    }

    /// Whether this failure moves the bid to `Rejected`.
    ///
    /// Missing entropy, the temporal guard and out-of-order calls leave
    /// the bid where it was.
    pub fn rejects_bid(&self) -> bool {
        match self {
            Self::Crypto(e) => !matches!(
                e,
                CryptoError::EntropyUnavailable(_) | CryptoError::KeyGeneration(_)
            ),
            Self::Format(_) | Self::DuplicateNonce(_) | Self::Ledger(_) => true,
            Self::AuctionStillOpen { .. } | Self::InvalidTransition { .. } => false,
        }
    }

    /// The offending field, when the error concerns one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Crypto(e) => e.field(),
            Self::DuplicateNonce(_) => Some("nonce"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let open = BidError::AuctionStillOpen {
            close_timestamp: 10,
            now: 5,
        };
        assert!(open.is_retryable());
        assert!(!open.rejects_bid());

        let entropy = BidError::from(CryptoError::EntropyUnavailable("gone".into()));
        assert!(!entropy.is_retryable());
        assert!(!entropy.rejects_bid());

        let too_large = BidError::from(CryptoError::ValueTooLarge {
            field: "bidder",
            max_bytes: 54,
            got_bytes: 60,
        });
        assert!(too_large.rejects_bid());
        assert_eq!(too_large.field(), Some("bidder"));

        let dup = BidError::DuplicateNonce(Nonce("n".into()));
        assert!(dup.rejects_bid());
        assert_eq!(dup.field(), Some("nonce"));
    }
}
