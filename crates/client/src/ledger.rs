//! Ledger submission interface.
//!
//! Publishing hands a payload to whatever ledger the caller is bidding on.
//! The lifecycle only needs to submit payloads and read them back.

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use sealbid_types::{Digest32, EncryptedPayload, Nonce, PayloadFormatError};

/// Reasons a ledger refuses a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Nonce already on ledger: {0}")]
    DuplicateNonce(Nonce),

    #[error("Commitment already on ledger: {}", .0.to_hex())]
    DuplicateCommitment(Digest32),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] PayloadFormatError),

    #[error("{0}")]
    Rejected(String),
}

/// Submission interface for published bids.
///
/// In production, this wraps the contract call that carries the ledger
/// byte-array bid argument.
pub trait BidLedger {
    /// Append a payload.
    fn submit(&self, payload: &EncryptedPayload) -> Result<(), LedgerError>;

    /// All payloads, in submission order.
    fn bids(&self) -> Vec<EncryptedPayload>;

    /// Check if a nonce is already on the ledger.
    fn contains_nonce(&self, nonce: &Nonce) -> bool {
        self.bids().iter().any(|p| &p.nonce == nonce)
    }
}

/// Ledger backed by a vector of encoded bid arguments.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RwLock<Vec<Vec<u8>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl BidLedger for InMemoryLedger {
    fn submit(&self, payload: &EncryptedPayload) -> Result<(), LedgerError> {
        let encoded = payload.to_ledger_bytes()?;

        let mut entries = self.entries.write();
        for existing in entries.iter() {
            let existing = EncryptedPayload::from_ledger_bytes(existing)?;
            if existing.nonce == payload.nonce {
                return Err(LedgerError::DuplicateNonce(payload.nonce.clone()));
            }
            if existing.commitment_hash == payload.commitment_hash {
                return Err(LedgerError::DuplicateCommitment(payload.commitment_hash));
            }
        }

        debug!(
            commitment = payload.commitment_hash.to_hex(),
            bytes = encoded.len(),
            "Submitted bid to ledger"
        );
        entries.push(encoded);
        Ok(())
    }

    fn bids(&self) -> Vec<EncryptedPayload> {
        // Entries were encoded by `submit`, so decoding cannot fail.
        self.entries
            .read()
            .iter()
            .filter_map(|bytes| EncryptedPayload::from_ledger_bytes(bytes).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbid_types::{Ciphertext, PAYLOAD_VERSION};

    fn payload(nonce: &str, commitment: u8) -> EncryptedPayload {
        EncryptedPayload {
            version: PAYLOAD_VERSION,
            encrypted_amount: Ciphertext(vec![1; 8]),
            encrypted_bidder: Ciphertext(vec![2; 8]),
            timestamp: 9,
            nonce: Nonce(nonce.into()),
            commitment_hash: Digest32([commitment; 32]),
            key_fingerprint: Digest32::default(),
            signature: Digest32::default(),
        }
    }

    #[test]
    fn test_submit_and_read_back() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.is_empty());

        ledger.submit(&payload("a", 1)).unwrap();
        ledger.submit(&payload("b", 2)).unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.bids(), vec![payload("a", 1), payload("b", 2)]);
        assert!(ledger.contains_nonce(&Nonce("b".into())));
    }

    #[test]
    fn test_duplicates_rejected() {
        let ledger = InMemoryLedger::new();
        ledger.submit(&payload("a", 1)).unwrap();

        assert_eq!(
            ledger.submit(&payload("a", 2)),
            Err(LedgerError::DuplicateNonce(Nonce("a".into())))
        );
        assert_eq!(
            ledger.submit(&payload("b", 1)),
            Err(LedgerError::DuplicateCommitment(Digest32([1; 32])))
        );
        assert_eq!(ledger.len(), 1);
    }
}
