//! Public commitment over an encrypted payload.
//!
//! `SHA-256(domain ‖ len‖encrypted_amount ‖ len‖encrypted_bidder ‖
//! timestamp ‖ len‖nonce ‖ len‖key_fingerprint)`. There is no inverse; the hash is only ever
//! recomputed and compared.

use subtle::ConstantTimeEq;

use sealbid_types::{canonical::CanonicalWriter, sha256, Ciphertext, Digest32, EncryptedPayload, Nonce, Timestamp};

const COMMITMENT_DOMAIN: &[u8] = b"SEALBID_COMMITMENT_V1";

/// Commit to the published fields of a bid.
pub fn commit(
    encrypted_amount: &Ciphertext,
    encrypted_bidder: &Ciphertext,
    timestamp: Timestamp,
    nonce: &Nonce,
    key_fingerprint: &Digest32,
) -> Digest32 {
    let mut w = CanonicalWriter::new(COMMITMENT_DOMAIN);
    w.field(encrypted_amount.as_ref())
        .field(encrypted_bidder.as_ref())
        .u64(timestamp)
        .field(nonce.as_str().as_bytes())
        .field(&key_fingerprint.0);
    Digest32(sha256(&w.finish()))
}

/// Recompute the payload's commitment and compare in constant time.
pub fn verify_payload_commitment(payload: &EncryptedPayload) -> bool {
    let expected = commit(
        &payload.encrypted_amount,
        &payload.encrypted_bidder,
        payload.timestamp,
        &payload.nonce,
        &payload.key_fingerprint,
    );
    expected.0.ct_eq(&payload.commitment_hash.0).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbid_types::PAYLOAD_VERSION;

    fn payload() -> EncryptedPayload {
        let encrypted_amount = Ciphertext(vec![0x11; 64]);
        let encrypted_bidder = Ciphertext(vec![0x22; 64]);
        let nonce = Nonce("18bcfe56800-0011".into());
        let key_fingerprint = Digest32([0x33; 32]);
        let commitment_hash =
            commit(&encrypted_amount, &encrypted_bidder, 42, &nonce, &key_fingerprint);
        EncryptedPayload {
            version: PAYLOAD_VERSION,
            encrypted_amount,
            encrypted_bidder,
            timestamp: 42,
            nonce,
            commitment_hash,
            key_fingerprint,
            signature: Digest32::default(),
        }
    }

    #[test]
    fn test_commit_is_deterministic() {
        let p = payload();
        let again = commit(
            &p.encrypted_amount,
            &p.encrypted_bidder,
            p.timestamp,
            &p.nonce,
            &p.key_fingerprint,
        );
        assert_eq!(p.commitment_hash, again);
        assert!(verify_payload_commitment(&p));
    }

    #[test]
    fn test_any_field_change_breaks_commitment() {
        let base = payload();

        let mut p = base.clone();
        p.encrypted_amount.0[63] ^= 1;
        assert!(!verify_payload_commitment(&p));

        let mut p = base.clone();
        p.encrypted_bidder.0[0] ^= 0x80;
        assert!(!verify_payload_commitment(&p));

        let mut p = base.clone();
        p.timestamp += 1;
        assert!(!verify_payload_commitment(&p));

        let mut p = base.clone();
        p.nonce = Nonce("18bcfe56800-0012".into());
        assert!(!verify_payload_commitment(&p));

        let mut p = base.clone();
        p.key_fingerprint.0[0] ^= 1;
        assert!(!verify_payload_commitment(&p));

        let mut p = base;
        p.commitment_hash.0[5] ^= 4;
        assert!(!verify_payload_commitment(&p));
    }

    #[test]
    fn test_fields_cannot_trade_bytes() {
        let nonce = Nonce("n".into());
        let key = Digest32::default();
        let a = commit(&Ciphertext(vec![1, 2]), &Ciphertext(vec![3]), 0, &nonce, &key);
        let b = commit(&Ciphertext(vec![1]), &Ciphertext(vec![2, 3]), 0, &nonce, &key);
        assert_ne!(a, b);
    }
}
