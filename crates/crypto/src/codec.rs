//! Mapping bid fields into the transform domain and back.
//!
//! Each field encodes as `0x01 ‖ padding ‖ utf8`, read as a big-endian
//! integer. The marker keeps the encoding injective when field bytes start
//! with zeros. The padding is fresh per encoding so equal amounts never
//! produce equal ciphertexts under the deterministic transform.

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

use sealbid_types::BidRecord;

use crate::entropy::fill_random;
use crate::error::CryptoError;
use crate::keys::PublicKey;

const MARKER: u8 = 0x01;

/// Random bytes between the marker and the field contents.
pub const PADDING_LEN: usize = 8;

/// Transform-domain encodings of the two secret fields of a bid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBid {
    pub amount: BigUint,
    pub bidder: BigUint,
}

/// Largest field, in bytes, that fits below a modulus of `width` bytes.
pub fn max_field_len(width: usize) -> usize {
    width.saturating_sub(1 + 1 + PADDING_LEN)
}

/// Encode both secret fields of `bid` for `key`.
pub fn encode_bid<R: RngCore + CryptoRng>(
    bid: &BidRecord,
    key: &PublicKey,
    rng: &mut R,
) -> Result<EncodedBid, CryptoError> {
    validate_amount(&bid.amount)?;
    validate_bidder(&bid.bidder)?;

    Ok(EncodedBid {
        amount: encode_field("amount", bid.amount.as_bytes(), key.width(), rng)?,
        bidder: encode_field("bidder", bid.bidder.as_bytes(), key.width(), rng)?,
    })
}

/// Encode one field. The result is always shorter than `width` bytes, so it
/// lies below any modulus of that width.
pub fn encode_field<R: RngCore + CryptoRng>(
    field: &'static str,
    bytes: &[u8],
    width: usize,
    rng: &mut R,
) -> Result<BigUint, CryptoError> {
    let max_bytes = max_field_len(width);
    if bytes.len() > max_bytes {
        return Err(CryptoError::ValueTooLarge {
            field,
            max_bytes,
            got_bytes: bytes.len(),
        });
    }

    let mut encoded = vec![0u8; 1 + PADDING_LEN + bytes.len()];
    encoded[0] = MARKER;
    fill_random(rng, &mut encoded[1..=PADDING_LEN])?;
    encoded[1 + PADDING_LEN..].copy_from_slice(bytes);
    Ok(BigUint::from_bytes_be(&encoded))
}

/// Strip marker and padding from a decrypted field.
pub fn decode_field(field: &'static str, value: &BigUint) -> Result<Vec<u8>, CryptoError> {
    let bytes = value.to_bytes_be();
    if bytes.len() < 1 + PADDING_LEN || bytes[0] != MARKER {
        return Err(CryptoError::encoding(field, "missing encoding marker"));
    }
    Ok(bytes[1 + PADDING_LEN..].to_vec())
}

/// Decode a decrypted amount back to its canonical decimal string.
pub fn decode_amount(value: &BigUint) -> Result<String, CryptoError> {
    let amount = decode_text("amount", value)?;
    validate_amount(&amount)?;
    Ok(amount)
}

/// Decode a decrypted bidder identity.
pub fn decode_bidder(value: &BigUint) -> Result<String, CryptoError> {
    let bidder = decode_text("bidder", value)?;
    validate_bidder(&bidder)?;
    Ok(bidder)
}

fn decode_text(field: &'static str, value: &BigUint) -> Result<String, CryptoError> {
    String::from_utf8(decode_field(field, value)?)
        .map_err(|_| CryptoError::encoding(field, "not valid UTF-8"))
}

/// Amounts are non-empty ASCII decimal without leading zeros, no larger
/// than `u128::MAX`, the range settlement ranks in.
pub fn validate_amount(amount: &str) -> Result<(), CryptoError> {
    if amount.is_empty() {
        return Err(CryptoError::encoding("amount", "must not be empty"));
    }
    if !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CryptoError::encoding("amount", "must be a decimal integer"));
    }
    if amount.len() > 1 && amount.starts_with('0') {
        return Err(CryptoError::encoding("amount", "must not have leading zeros"));
    }
    if amount.parse::<u128>().is_err() {
        return Err(CryptoError::encoding("amount", "exceeds the largest settleable amount"));
    }
    Ok(())
}

pub fn validate_bidder(bidder: &str) -> Result<(), CryptoError> {
    if bidder.is_empty() {
        return Err(CryptoError::encoding("bidder", "must not be empty"));
    }
    if bidder.chars().any(char::is_control) {
        return Err(CryptoError::encoding("bidder", "must not contain control characters"));
    }
    Ok(())
}
