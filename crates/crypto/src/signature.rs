//! Authenticity tag over the plaintext bid.
//!
//! This is a shared-secret MAC, not a public-key signature: anyone holding
//! the derivation key can produce a valid tag, and verifying one proves
//! nothing about possession of the private key to a third party. The key is
//! derived per bid from the private exponent and the bid's nonce, so only
//! the bidder can check it at reveal. The tag also covers the fingerprint of
//! the public key the bid was sealed under.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use sealbid_types::{BidRecord, Digest32, Nonce};

use crate::error::CryptoError;
use crate::keys::PrivateKey;

type HmacSha256 = Hmac<Sha256>;

const DERIVATION_INFO: &[u8] = b"sealbid/signature/v1";

/// Per-bid symmetric key for [`sign`] and [`verify`].
#[derive(Clone)]
pub struct DerivationKey(Zeroizing<[u8; 32]>);

impl std::fmt::Debug for DerivationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivationKey(<redacted>)")
    }
}

impl DerivationKey {
    /// HKDF-SHA256 with the private exponent as input key material and the
    /// nonce as salt.
    pub fn derive(private_key: &PrivateKey, nonce: &Nonce) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(nonce.as_str().as_bytes()), private_key.expose_bytes());
        let mut okm = Zeroizing::new([0u8; 32]);
        hk.expand(DERIVATION_INFO, &mut okm[..])
            .map_err(|_| CryptoError::invalid("derivation_key", "HKDF output length rejected"))?;
        Ok(Self(okm))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    fn mac(&self, bid: &BidRecord, key_fingerprint: &Digest32) -> Result<HmacSha256, CryptoError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.0[..])
            .map_err(|_| CryptoError::invalid("derivation_key", "invalid MAC key length"))?;
        mac.update(&bid.canonical_bytes());
        mac.update(&key_fingerprint.0);
        Ok(mac)
    }
}

/// Tag the canonical encoding of `bid` sealed under `key_fingerprint`.
pub fn sign(
    bid: &BidRecord,
    key_fingerprint: &Digest32,
    key: &DerivationKey,
) -> Result<Digest32, CryptoError> {
    let tag = key.mac(bid, key_fingerprint)?.finalize().into_bytes();
    Ok(Digest32(tag.into()))
}

/// Recompute the tag and compare in constant time.
pub fn verify(
    bid: &BidRecord,
    key_fingerprint: &Digest32,
    signature: &Digest32,
    key: &DerivationKey,
) -> bool {
    match key.mac(bid, key_fingerprint) {
        Ok(mac) => mac.verify_slice(&signature.0).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_key_pair, KeySizing};
    use rand::rngs::OsRng;

    const FINGERPRINT: Digest32 = Digest32([0x42; 32]);

    fn bid() -> BidRecord {
        BidRecord {
            amount: "3".into(),
            bidder: "0xABC".into(),
            timestamp: 1_700_000_000_000,
            nonce: Nonce("18bcfe56800-01".into()),
        }
    }

    #[test]
    fn test_sign_verify() {
        let key = DerivationKey::from_bytes([7u8; 32]);
        let tag = sign(&bid(), &FINGERPRINT, &key).unwrap();

        assert_eq!(tag, sign(&bid(), &FINGERPRINT, &key).unwrap());
        assert!(verify(&bid(), &FINGERPRINT, &tag, &key));
    }

    #[test]
    fn test_verify_rejects_changes() {
        let key = DerivationKey::from_bytes([7u8; 32]);
        let tag = sign(&bid(), &FINGERPRINT, &key).unwrap();

        let mut other = bid();
        other.amount = "4".into();
        assert!(!verify(&other, &FINGERPRINT, &tag, &key));

        let mut flipped = tag;
        flipped.0[31] ^= 1;
        assert!(!verify(&bid(), &FINGERPRINT, &flipped, &key));

        assert!(!verify(&bid(), &FINGERPRINT, &tag, &DerivationKey::from_bytes([8u8; 32])));
    }

    #[test]
    fn test_tag_is_bound_to_key_fingerprint() {
        let key = DerivationKey::from_bytes([7u8; 32]);
        let tag = sign(&bid(), &FINGERPRINT, &key).unwrap();
        assert!(!verify(&bid(), &Digest32([0x43; 32]), &tag, &key));
    }

    #[test]
    fn test_derivation_is_per_nonce() {
        let keys = generate_key_pair(KeySizing::new(512), &mut OsRng).unwrap();
        let record = bid();

        let a = DerivationKey::derive(keys.private_key(), &record.nonce).unwrap();
        let again = DerivationKey::derive(keys.private_key(), &record.nonce).unwrap();
        let b = DerivationKey::derive(keys.private_key(), &Nonce("18bcfe56800-02".into())).unwrap();

        let tag = sign(&record, &FINGERPRINT, &a).unwrap();
        assert!(verify(&record, &FINGERPRINT, &tag, &again));
        assert!(!verify(&record, &FINGERPRINT, &tag, &b));
    }

    #[test]
    fn test_debug_is_redacted() {
        let rendered = format!("{:?}", DerivationKey::from_bytes([0xAB; 32]));
        assert_eq!(rendered, "DerivationKey(<redacted>)");
    }
}
