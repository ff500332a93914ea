//! Bid creation, encryption and reveal.
//!
//! These are the four operations exposed to the marketplace and to the
//! contract-submission layer:
//!
//! - [`create_bid`]: draft a plaintext bid with a fresh nonce
//! - [`encrypt_bid`]: produce the publish-ready payload
//! - [`reveal_bid`]: after close, decrypt and prove
//! - [`reveal_or_reuse`]: [`reveal_bid`] that keeps an earlier verified reveal
//! - [`verify_reveal`]: check a reveal with only the public key

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sealbid_crypto::{
    commit, decode_bid, encode_bid, encrypt_to_ciphertext, prove, sealed_under, sign,
    signature::verify as verify_signature, transform::to_fixed_width, verify_payload_commitment,
    verify_proof, CryptoError, DerivationKey, KeyPair, PublicKey,
};
use sealbid_types::{
    BidRecord, Ciphertext, DecryptedValue, EncryptedPayload, Nonce, PublicKeyBytes, RevealProof,
    Timestamp, PAYLOAD_VERSION,
};

use crate::clock::TimeSource;
use crate::error::BidError;
use crate::nonce::generate_nonce;

/// Plaintext and proof returned by a successful reveal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Reveal {
    pub bid: BidRecord,
    pub proof: RevealProof,
}

/// Draft a bid stamped with the current time and a fresh nonce.
///
/// Field contents are not checked here; [`encrypt_bid`] rejects amounts and
/// identities it cannot encode.
pub fn create_bid<C: TimeSource + ?Sized, R: RngCore + CryptoRng>(
    amount: &str,
    bidder: &str,
    clock: &C,
    rng: &mut R,
) -> Result<BidRecord, BidError> {
    let timestamp = clock.now_ms();
    let nonce = generate_nonce(timestamp, rng)?;
    Ok(BidRecord {
        amount: amount.to_owned(),
        bidder: bidder.to_owned(),
        timestamp,
        nonce,
    })
}

/// Encrypt both secret fields, commit and tag.
///
/// All or nothing: any failure returns an error and no payload.
pub fn encrypt_bid<R: RngCore + CryptoRng>(
    bid: &BidRecord,
    keys: &KeyPair,
    rng: &mut R,
) -> Result<EncryptedPayload, BidError> {
    let public = keys.public_key();
    let encoded = encode_bid(bid, public, rng)?;

    let encrypted_amount = encrypt_to_ciphertext(&encoded.amount, public)?;
    let encrypted_bidder = encrypt_to_ciphertext(&encoded.bidder, public)?;
    let key_fingerprint = public.fingerprint();
    let commitment_hash = commit(
        &encrypted_amount,
        &encrypted_bidder,
        bid.timestamp,
        &bid.nonce,
        &key_fingerprint,
    );

    let derivation_key = DerivationKey::derive(keys.private_key(), &bid.nonce)?;
    let signature = sign(bid, &key_fingerprint, &derivation_key)?;

    info!(
        commitment = commitment_hash.to_hex(),
        nonce = %bid.nonce,
        "Encrypted bid"
    );

    Ok(EncryptedPayload {
        version: PAYLOAD_VERSION,
        encrypted_amount,
        encrypted_bidder,
        timestamp: bid.timestamp,
        nonce: bid.nonce.clone(),
        commitment_hash,
        key_fingerprint,
        signature,
    })
}

/// Open a published payload after its window has closed.
///
/// Before `close_timestamp` this fails with [`BidError::AuctionStillOpen`]
/// regardless of the payload. Afterwards it checks the payload version,
/// commitment and key fingerprint, decrypts both fields, checks the
/// authenticity tag and proves the disclosure.
pub fn reveal_bid<C: TimeSource + ?Sized, R: RngCore + CryptoRng>(
    payload: &EncryptedPayload,
    keys: &KeyPair,
    close_timestamp: Timestamp,
    clock: &C,
    rng: &mut R,
) -> Result<Reveal, BidError> {
    ensure_closed(close_timestamp, clock)?;

    payload.check_version()?;
    if !verify_payload_commitment(payload) {
        return Err(CryptoError::DecryptionMismatch {
            field: "commitment",
        }
        .into());
    }
    if !sealed_under(payload, keys.public_key()) {
        return Err(CryptoError::DecryptionMismatch {
            field: "key_fingerprint",
        }
        .into());
    }
    keys.check_consistency()?;

    let decrypted = DecryptedValue {
        amount: open_field("amount", &payload.encrypted_amount, keys)?,
        bidder: open_field("bidder", &payload.encrypted_bidder, keys)?,
    };

    let bid = decode_bid(payload, &decrypted).map_err(|e| match e {
        // Decryption under the wrong key lands on garbage that fails to decode.
        CryptoError::EncodingError { field, .. } => CryptoError::DecryptionMismatch { field },
        other => other,
    })?;

    let derivation_key = DerivationKey::derive(keys.private_key(), &payload.nonce)?;
    if !verify_signature(&bid, &payload.key_fingerprint, &payload.signature, &derivation_key) {
        return Err(CryptoError::DecryptionMismatch { field: "signature" }.into());
    }

    let proof = prove(payload, &decrypted, keys.public_key(), rng)?;

    debug!(
        commitment = payload.commitment_hash.to_hex(),
        "Revealed bid"
    );
    Ok(Reveal { bid, proof })
}

/// Reveal `payload`, handing back `previous` when it already is a verified
/// reveal of that payload under `keys`.
///
/// Each fresh proof carries a new token, so callers that persist reveals
/// pass the stored one here to keep repeated reveals identical. A `previous`
/// that does not verify is ignored and replaced. The close guard applies
/// either way.
pub fn reveal_or_reuse<C: TimeSource + ?Sized, R: RngCore + CryptoRng>(
    payload: &EncryptedPayload,
    keys: &KeyPair,
    close_timestamp: Timestamp,
    previous: Option<&Reveal>,
    clock: &C,
    rng: &mut R,
) -> Result<Reveal, BidError> {
    ensure_closed(close_timestamp, clock)?;

    if let Some(previous) = previous {
        let public = keys.public_key().to_bytes();
        if audit_reveal(payload, &previous.proof, &public).as_ref() == Some(&previous.bid) {
            debug!(
                commitment = payload.commitment_hash.to_hex(),
                "Reusing verified reveal"
            );
            return Ok(previous.clone());
        }
    }
    reveal_bid(payload, keys, close_timestamp, clock, rng)
}

/// Check a reveal proof against a published payload.
///
/// Needs only the bidder's public key, so any auditor can run it.
pub fn verify_reveal(
    payload: &EncryptedPayload,
    proof: &RevealProof,
    public_key: &PublicKeyBytes,
) -> bool {
    match PublicKey::from_bytes(public_key) {
        Ok(key) => verify_proof(payload, proof, &key),
        Err(_) => false,
    }
}

/// Verify a reveal and recover the plaintext bid it discloses.
pub fn audit_reveal(
    payload: &EncryptedPayload,
    proof: &RevealProof,
    public_key: &PublicKeyBytes,
) -> Option<BidRecord> {
    if !verify_reveal(payload, proof, public_key) {
        return None;
    }
    decode_bid(payload, &proof.decrypted_value).ok()
}

fn ensure_closed<C: TimeSource + ?Sized>(close_timestamp: Timestamp, clock: &C) -> Result<(), BidError> {
    let now = clock.now_ms();
    if now < close_timestamp {
        return Err(BidError::AuctionStillOpen {
            close_timestamp,
            now,
        });
    }
    Ok(())
}

fn open_field(
    field: &'static str,
    ciphertext: &Ciphertext,
    keys: &KeyPair,
) -> Result<Vec<u8>, CryptoError> {
    let public = keys.public_key();
    if ciphertext.0.len() != public.width() {
        return Err(CryptoError::InvalidParameters {
            field,
            reason: "ciphertext width differs from key".into(),
        });
    }
    let value = BigUint::from_bytes_be(&ciphertext.0);
    // A ciphertext outside this modulus was not produced under this key.
    let opened = sealbid_crypto::decrypt(&value, keys.private_key(), public.modulus())
        .map_err(|_| CryptoError::DecryptionMismatch { field })?;
    to_fixed_width(&opened, public.width())
}

/// Builder for drafting bids with explicit fields.
///
/// Unset timestamp and nonce are filled from the clock and a fresh draw.
pub struct BidBuilder {
    amount: String,
    bidder: String,
    timestamp: Option<Timestamp>,
    nonce: Option<Nonce>,
}

impl BidBuilder {
    /// Create a new bid builder.
    pub fn new(bidder: impl Into<String>) -> Self {
        Self {
            amount: String::from("0"),
            bidder: bidder.into(),
            timestamp: None,
            nonce: None,
        }
    }

    /// Set the bid amount, as a decimal string in the smallest unit.
    pub fn amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = amount.into();
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Reuse a nonce. Publishing two bids with the same nonce is rejected.
    pub fn nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Build the drafted bid.
    pub fn build<C: TimeSource + ?Sized, R: RngCore + CryptoRng>(
        self,
        clock: &C,
        rng: &mut R,
    ) -> Result<BidRecord, BidError> {
        let timestamp = self.timestamp.unwrap_or_else(|| clock.now_ms());
        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => generate_nonce(timestamp, rng)?,
        };
        Ok(BidRecord {
            amount: self.amount,
            bidder: self.bidder,
            timestamp,
            nonce,
        })
    }
}
