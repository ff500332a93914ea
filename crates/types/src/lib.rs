//! Core type definitions for sealed-bid commitments.
//!
//! This crate provides the shared data structures used across the bidding
//! system: fixed-width byte containers, the plaintext bid record, the
//! versioned payload that is published before an auction closes, and the
//! reveal proof produced at close.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use thiserror::Error;

pub mod canonical;

/// Current version of the published payload layout.
pub const PAYLOAD_VERSION: u16 = 1;

/// Unix timestamp in milliseconds.
pub type Timestamp = u64;

// =========================
// BYTE CONTAINERS
// =========================

/// SHA-256 / HMAC-SHA256 output (32 bytes)
#[serde_as]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Digest32(#[serde_as(as = "Hex")] pub [u8; 32]);

impl Default for Digest32 {
    fn default() -> Self {
        Self([0u8; 32])
    }
}

impl Digest32 {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Big-endian integer produced by the transform, padded to the modulus width.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(#[serde_as(as = "Hex")] pub Vec<u8>);

impl AsRef<[u8]> for Ciphertext {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Per-bid uniqueness token: hex millisecond prefix, `-`, random hex suffix.
///
/// Uniqueness is probabilistic; windows reject repeats on append.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Nonce(pub String);

impl Nonce {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =========================
// KEYS
// =========================

/// Public half of a bidder's key material, as fixed-width big-endian bytes.
///
/// All three fields share the modulus width. The private exponent has no
/// wire representation.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PublicKeyBytes {
    #[serde_as(as = "Hex")]
    pub exponent: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub modulus: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub generator: Vec<u8>,
}

// =========================
// BIDS
// =========================

/// Plaintext bid, owned by the bidder until reveal.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BidRecord {
    /// Decimal amount in the smallest currency unit (e.g. wei)
    pub amount: String,
    /// Bidder identity (e.g. a wallet address)
    pub bidder: String,
    /// Creation time; informative only, not trusted for cross-bidder ordering
    pub timestamp: Timestamp,
    pub nonce: Nonce,
}

impl BidRecord {
    /// Length-prefixed encoding in fixed field order, used by the signature binder.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = canonical::CanonicalWriter::new(b"SEALBID_BID_V1");
        out.field(self.amount.as_bytes());
        out.field(self.bidder.as_bytes());
        out.u64(self.timestamp);
        out.field(self.nonce.as_str().as_bytes());
        out.finish()
    }

    /// Parse the amount as an integer for ranking at settlement.
    pub fn amount_value(&self) -> Option<u128> {
        self.amount.parse().ok()
    }
}

/// The publish-ready form of a bid.
///
/// Field order is part of the ledger format and must not change within a
/// version: `encrypted_amount, encrypted_bidder, timestamp, nonce,
/// commitment_hash` are what downstream commitment checks read.
/// `key_fingerprint` names the public key the fields were sealed under and
/// is covered by the commitment, so a reveal can only be checked against
/// that key.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptedPayload {
    pub version: u16,
    pub encrypted_amount: Ciphertext,
    pub encrypted_bidder: Ciphertext,
    pub timestamp: Timestamp,
    pub nonce: Nonce,
    pub commitment_hash: Digest32,
    pub key_fingerprint: Digest32,
    /// Shared-secret authenticity tag over the plaintext bid
    pub signature: Digest32,
}

impl EncryptedPayload {
    /// Reject payloads written by a different layout version.
    pub fn check_version(&self) -> Result<(), PayloadFormatError> {
        if self.version != PAYLOAD_VERSION {
            return Err(PayloadFormatError::UnsupportedVersion {
                found: self.version,
                expected: PAYLOAD_VERSION,
            });
        }
        Ok(())
    }

    /// Serialize to the ledger's byte-array bid argument.
    pub fn to_ledger_bytes(&self) -> Result<Vec<u8>, PayloadFormatError> {
        borsh::to_vec(self).map_err(|e| PayloadFormatError::Malformed(e.to_string()))
    }

    /// Parse the ledger's byte-array bid argument.
    pub fn from_ledger_bytes(bytes: &[u8]) -> Result<Self, PayloadFormatError> {
        // Peek at the version before attempting the full layout.
        let version = bytes
            .get(..2)
            .map(|v| u16::from_le_bytes([v[0], v[1]]))
            .ok_or_else(|| PayloadFormatError::Malformed("truncated payload".into()))?;
        if version != PAYLOAD_VERSION {
            return Err(PayloadFormatError::UnsupportedVersion {
                found: version,
                expected: PAYLOAD_VERSION,
            });
        }
        borsh::from_slice(bytes).map_err(|e| PayloadFormatError::Malformed(e.to_string()))
    }

    /// Serialize to the JSON shape published alongside the ledger entry.
    pub fn to_json(&self) -> Result<String, PayloadFormatError> {
        serde_json::to_string(self).map_err(|e| PayloadFormatError::Malformed(e.to_string()))
    }

    /// Parse the published JSON shape; unknown fields and other versions are rejected.
    pub fn from_json(json: &str) -> Result<Self, PayloadFormatError> {
        let payload: Self =
            serde_json::from_str(json).map_err(|e| PayloadFormatError::Malformed(e.to_string()))?;
        payload.check_version()?;
        Ok(payload)
    }
}

// =========================
// REVEAL
// =========================

/// Decrypted transform-domain integers for both encrypted fields.
///
/// These include the codec's marker and padding bytes so that anyone holding
/// the public key can re-encrypt them and compare with the payload.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DecryptedValue {
    #[serde_as(as = "Hex")]
    pub amount: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub bidder: Vec<u8>,
}

/// Evidence that a disclosed plaintext matches an earlier commitment.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RevealProof {
    pub proof_token: Digest32,
    pub decrypted_value: DecryptedValue,
    pub verification_hash: Digest32,
}

// =========================
// LIFECYCLE
// =========================

/// Protocol phase of a single bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum BidPhase {
    Drafted,
    Encrypted,
    /// Handed to the ledger; accumulates in a window until close
    Published,
    /// Terminal
    Revealed,
    /// Terminal; a validation step failed
    Rejected,
}

/// Auction window phase relative to a clock reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum WindowPhase {
    /// Before open_timestamp
    Pending,
    /// Accepting bids
    Open,
    /// Bid list frozen, reveals allowed
    Closed,
    /// Winner recorded
    Settled,
}

/// Settlement outcome of an auction window.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowResult {
    pub land_id: u64,
    pub winner: String,
    pub winning_amount: u128,
    pub winning_commitment: Digest32,
    pub num_valid_bids: u32,
    pub settlement_time: Timestamp,
}

// =========================
// ERRORS
// =========================

/// Errors from decoding published payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadFormatError {
    #[error("Unsupported payload version {found}, expected {expected}")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}
