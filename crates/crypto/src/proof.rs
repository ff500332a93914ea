//! Reveal proofs.
//!
//! The bidder discloses the decrypted transform-domain values for both
//! fields. Because the transform is deterministic under the public key, any
//! auditor can re-encrypt them and compare with the published ciphertexts.
//! The verification hash binds the disclosure to the payload, the key and a
//! fresh proof token. A payload names its key by fingerprint, and no other
//! key is accepted for it.

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::debug;

use sealbid_types::{
    canonical::CanonicalWriter, sha256, BidRecord, Ciphertext, DecryptedValue, Digest32,
    EncryptedPayload, RevealProof,
};

use crate::codec::{decode_amount, decode_bidder};
use crate::commitment::verify_payload_commitment;
use crate::entropy::random_array;
use crate::error::CryptoError;
use crate::keys::PublicKey;
use crate::transform::{encrypt_to_ciphertext, from_be_bytes};

const VERIFICATION_DOMAIN: &[u8] = b"SEALBID_REVEAL_V1";

/// Prove that `decrypted` opens `payload` under `key`.
///
/// Fails with [`CryptoError::DecryptionMismatch`] when `key` is not the key
/// the payload was sealed under, or a disclosed value does not re-encrypt to
/// the published ciphertext. That is an integrity failure and is never
/// recoverable.
pub fn prove<R: RngCore + CryptoRng>(
    payload: &EncryptedPayload,
    decrypted: &DecryptedValue,
    key: &PublicKey,
    rng: &mut R,
) -> Result<RevealProof, CryptoError> {
    if !sealed_under(payload, key) {
        return Err(CryptoError::DecryptionMismatch {
            field: "key_fingerprint",
        });
    }
    check_width("amount", &decrypted.amount, key)?;
    check_width("bidder", &decrypted.bidder, key)?;

    if !reencrypts_to("amount", &decrypted.amount, &payload.encrypted_amount, key)? {
        return Err(CryptoError::DecryptionMismatch { field: "amount" });
    }
    if !reencrypts_to("bidder", &decrypted.bidder, &payload.encrypted_bidder, key)? {
        return Err(CryptoError::DecryptionMismatch { field: "bidder" });
    }

    let proof_token = Digest32(random_array(rng)?);
    let verification_hash = verification_hash(payload, decrypted, key, &proof_token);

    debug!(
        commitment = payload.commitment_hash.to_hex(),
        proof_token = proof_token.to_hex(),
        "Produced reveal proof"
    );

    Ok(RevealProof {
        proof_token,
        decrypted_value: decrypted.clone(),
        verification_hash,
    })
}

/// Check a reveal proof against a published payload.
///
/// True only when the payload is a supported version, its commitment
/// recomputes, it was sealed under `key`, the disclosed values re-encrypt to
/// its ciphertexts and the verification hash recomputes. Malformed input
/// yields `false`.
pub fn verify_proof(payload: &EncryptedPayload, proof: &RevealProof, key: &PublicKey) -> bool {
    if payload.check_version().is_err() || !verify_payload_commitment(payload) {
        return false;
    }
    if !sealed_under(payload, key) {
        return false;
    }

    let disclosed = &proof.decrypted_value;
    if check_width("amount", &disclosed.amount, key).is_err()
        || check_width("bidder", &disclosed.bidder, key).is_err()
    {
        return false;
    }

    let amount_ok = reencrypts_to("amount", &disclosed.amount, &payload.encrypted_amount, key);
    let bidder_ok = reencrypts_to("bidder", &disclosed.bidder, &payload.encrypted_bidder, key);
    if !matches!((amount_ok, bidder_ok), (Ok(true), Ok(true))) {
        return false;
    }

    let expected = verification_hash(payload, disclosed, key, &proof.proof_token);
    expected.0.ct_eq(&proof.verification_hash.0).into()
}

/// Recover the plaintext bid from a disclosure.
///
/// Only meaningful after [`verify_proof`] has accepted the disclosure.
pub fn decode_bid(payload: &EncryptedPayload, decrypted: &DecryptedValue) -> Result<BidRecord, CryptoError> {
    Ok(BidRecord {
        amount: decode_amount(&from_be_bytes(&decrypted.amount))?,
        bidder: decode_bidder(&from_be_bytes(&decrypted.bidder))?,
        timestamp: payload.timestamp,
        nonce: payload.nonce.clone(),
    })
}

/// Whether `payload` names `key` as the key it was sealed under.
pub fn sealed_under(payload: &EncryptedPayload, key: &PublicKey) -> bool {
    key.fingerprint().0.ct_eq(&payload.key_fingerprint.0).into()
}

fn check_width(field: &'static str, bytes: &[u8], key: &PublicKey) -> Result<(), CryptoError> {
    if bytes.len() != key.width() {
        return Err(CryptoError::invalid(
            field,
            format!("disclosed value is {} bytes, key width is {}", bytes.len(), key.width()),
        ));
    }
    Ok(())
}

fn reencrypts_to(
    field: &'static str,
    disclosed: &[u8],
    published: &Ciphertext,
    key: &PublicKey,
) -> Result<bool, CryptoError> {
    let value = from_be_bytes(disclosed);
    if &value >= key.modulus() {
        return Err(CryptoError::invalid(field, "disclosed value outside the key domain"));
    }
    let reencrypted = encrypt_to_ciphertext(&value, key)?;
    Ok(reencrypted.0.ct_eq(&published.0).into())
}

fn verification_hash(
    payload: &EncryptedPayload,
    decrypted: &DecryptedValue,
    key: &PublicKey,
    proof_token: &Digest32,
) -> Digest32 {
    let public = key.to_bytes();
    let mut w = CanonicalWriter::new(VERIFICATION_DOMAIN);
    w.field(payload.encrypted_amount.as_ref())
        .field(payload.encrypted_bidder.as_ref())
        .field(&decrypted.amount)
        .field(&decrypted.bidder)
        .field(&public.exponent)
        .field(&public.modulus)
        .field(&public.generator)
        .u64(payload.timestamp)
        .field(payload.nonce.as_str().as_bytes())
        .field(&proof_token.0);
    Digest32(sha256(&w.finish()))
}
