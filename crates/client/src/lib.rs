//! Client SDK for sealed bids.
//!
//! This crate provides a high-level API for:
//! - Drafting bids with fresh nonces
//! - Encrypting them into publish-ready payloads
//! - Publishing to a ledger and tracking each bid's phase
//! - Revealing after close and verifying reveals as an auditor

pub mod bid;
pub mod clock;
pub mod config;
pub mod error;
pub mod keystore;
pub mod ledger;
pub mod lifecycle;
pub mod nonce;

pub use bid::{
    audit_reveal, create_bid, encrypt_bid, reveal_bid, reveal_or_reuse, verify_reveal, BidBuilder,
    Reveal,
};
pub use clock::{ManualClock, SystemClock, TimeSource};
pub use config::{ClientConfig, ConfigError};
pub use error::BidError;
pub use ledger::{BidLedger, InMemoryLedger, LedgerError};
pub use lifecycle::{BidLifecycle, SealedBid};
