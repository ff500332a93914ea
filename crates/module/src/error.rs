//! Auction window error types.

use thiserror::Error;

use sealbid_types::{Digest32, Nonce, PayloadFormatError, Timestamp, WindowPhase};

/// Errors that can occur in the auction house.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("Window not found for land {0}")]
    WindowNotFound(u64),

    #[error("Window already exists for land {0}")]
    WindowExists(u64),

    #[error("Invalid timing: open {open}, close {close}")]
    InvalidTiming { open: Timestamp, close: Timestamp },

    #[error("Duration {duration} ms outside [{min}, {max}]")]
    DurationOutOfRange { duration: u64, min: u64, max: u64 },

    #[error("Base price {got} below minimum {min}")]
    BasePriceTooLow { min: u128, got: u128 },

    #[error("Bidding not started")]
    BiddingNotStarted,

    #[error("Bidding ended")]
    BiddingEnded,

    #[error("Window open until {close_timestamp}, now {now}")]
    StillOpen {
        close_timestamp: Timestamp,
        now: Timestamp,
    },

    #[error("Invalid phase. Expected: {expected:?}, Got: {got:?}")]
    InvalidPhase {
        expected: WindowPhase,
        got: WindowPhase,
    },

    #[error(transparent)]
    InvalidPayload(#[from] PayloadFormatError),

    #[error("Commitment does not match payload fields")]
    CommitmentMismatch,

    #[error("Nonce already in window: {0}")]
    DuplicateNonce(Nonce),

    #[error("Commitment already in window: {}", .0.to_hex())]
    DuplicateCommitment(Digest32),

    #[error("Window full ({capacity} bids)")]
    WindowFull { capacity: usize },

    #[error("No revealed bid meets the base price")]
    NoValidBids,

    #[error("Already settled")]
    AlreadySettled,
}
