//! Winner determination.
//!
//! First-price: the highest verified reveal at or above the base price wins
//! and pays its bid. Ties go to the bid appended first.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::warn;

use sealbid_client::audit_reveal;
use sealbid_types::{Digest32, EncryptedPayload, PublicKeyBytes, RevealProof};

/// A reveal submitted for settlement, with the key needed to check it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedBid {
    pub payload: EncryptedPayload,
    pub proof: RevealProof,
    pub public_key: PublicKeyBytes,
}

/// Result of winner computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowWinner {
    /// Position of the winning bid in the window
    pub winner_index: usize,
    pub bidder: String,
    pub amount: u128,
    pub commitment: Digest32,
    /// Verified reveals at or above the base price
    pub num_valid_bids: u32,
}

/// Compute the winner among `reveals` for the frozen bid list `bids`.
///
/// Reveals that do not match a bid in the list or fail verification are left
/// out. Verification decodes the amount, so only amounts within `u128`
/// reach the ranking.
pub fn compute_winner(
    bids: &[EncryptedPayload],
    reveals: &[RevealedBid],
    base_price: u128,
) -> Option<WindowWinner> {
    let mut seen = vec![false; bids.len()];
    let mut valid: Vec<(usize, u128, String)> = Vec::new();

    for reveal in reveals {
        let commitment = reveal.payload.commitment_hash;
        let Some(index) = bids.iter().position(|b| b == &reveal.payload) else {
            warn!(commitment = commitment.to_hex(), "Reveal for unknown bid");
            continue;
        };
        if seen[index] {
            continue;
        }

        let Some(bid) = audit_reveal(&reveal.payload, &reveal.proof, &reveal.public_key) else {
            warn!(commitment = commitment.to_hex(), "Reveal failed verification");
            continue;
        };
        seen[index] = true;

        let Some(amount) = bid.amount_value() else {
            warn!(commitment = commitment.to_hex(), "Revealed amount out of range");
            continue;
        };
        if amount >= base_price {
            valid.push((index, amount, bid.bidder));
        }
    }

    // Highest amount; among equals, lowest index.
    let (winner_index, amount, bidder) = valid
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?
        .clone();

    Some(WindowWinner {
        winner_index,
        bidder,
        amount,
        commitment: bids[winner_index].commitment_hash,
        num_valid_bids: valid.len() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use sealbid_client::{create_bid, encrypt_bid, reveal_bid, verify_reveal, ManualClock};
    use sealbid_crypto::codec::encode_field;
    use sealbid_crypto::transform::to_fixed_width;
    use sealbid_crypto::{
        commit, encrypt_to_ciphertext, generate_key_pair, prove, KeyPair, KeySizing,
    };
    use sealbid_types::{DecryptedValue, Nonce, PAYLOAD_VERSION};

    fn keys() -> KeyPair {
        generate_key_pair(KeySizing::new(512), &mut OsRng).unwrap()
    }

    fn sealed(keys: &KeyPair, amount: &str, bidder: &str) -> RevealedBid {
        let clock = ManualClock::new(1_000);
        let bid = create_bid(amount, bidder, &clock, &mut OsRng).unwrap();
        let payload = encrypt_bid(&bid, keys, &mut OsRng).unwrap();
        let reveal = reveal_bid(&payload, keys, 1_000, &clock, &mut OsRng).unwrap();
        RevealedBid {
            payload,
            proof: reveal.proof,
            public_key: keys.public_key().to_bytes(),
        }
    }

    #[test]
    fn test_first_price_winner() {
        let k = keys();
        let reveals = vec![
            sealed(&k, "100", "0xA"),
            sealed(&k, "500", "0xB"),
            sealed(&k, "300", "0xC"),
        ];
        let bids: Vec<_> = reveals.iter().map(|r| r.payload.clone()).collect();

        let winner = compute_winner(&bids, &reveals, 0).unwrap();
        assert_eq!(winner.winner_index, 1);
        assert_eq!(winner.bidder, "0xB");
        assert_eq!(winner.amount, 500);
        assert_eq!(winner.commitment, bids[1].commitment_hash);
        assert_eq!(winner.num_valid_bids, 3);
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let k = keys();
        let reveals = vec![sealed(&k, "200", "0xA"), sealed(&k, "200", "0xB")];
        let bids: Vec<_> = reveals.iter().map(|r| r.payload.clone()).collect();

        // Reveal order does not matter, window order does.
        let reversed: Vec<_> = reveals.iter().rev().cloned().collect();
        let winner = compute_winner(&bids, &reversed, 0).unwrap();
        assert_eq!(winner.bidder, "0xA");
    }

    #[test]
    fn test_base_price_filtering() {
        let k = keys();
        let reveals = vec![sealed(&k, "50", "0xA"), sealed(&k, "150", "0xB")];
        let bids: Vec<_> = reveals.iter().map(|r| r.payload.clone()).collect();

        let winner = compute_winner(&bids, &reveals, 100).unwrap();
        assert_eq!(winner.bidder, "0xB");
        assert_eq!(winner.num_valid_bids, 1);

        assert!(compute_winner(&bids, &reveals, 1_000).is_none());
    }

    #[test]
    fn test_invalid_reveals_ignored() {
        let k = keys();
        let honest = sealed(&k, "100", "0xA");
        let mut forged = sealed(&k, "900", "0xB");
        let outsider = sealed(&k, "5000", "0xC");
        let bids = vec![honest.payload.clone(), forged.payload.clone()];

        forged.proof.verification_hash.0[0] ^= 1;
        let winner = compute_winner(&bids, &[honest, forged, outsider], 0).unwrap();
        assert_eq!(winner.bidder, "0xA");
        assert_eq!(winner.num_valid_bids, 1);
    }

    #[test]
    fn test_duplicate_reveals_counted_once() {
        let k = keys();
        let a = sealed(&k, "100", "0xA");
        let bids = vec![a.payload.clone()];

        let winner = compute_winner(&bids, &[a.clone(), a], 0).unwrap();
        assert_eq!(winner.num_valid_bids, 1);
    }

    #[test]
    fn test_unsettleable_amount_never_wins() {
        let k = keys();
        let public = k.public_key();
        let width = public.width();
        let honest = sealed(&k, "100", "0xA");

        // Sealed by hand, past the amount bound `encrypt_bid` enforces.
        let huge = b"340282366920938463463374607431768211456";
        let amount = encode_field("amount", huge, width, &mut OsRng).unwrap();
        let bidder = encode_field("bidder", b"0xB", width, &mut OsRng).unwrap();
        let encrypted_amount = encrypt_to_ciphertext(&amount, public).unwrap();
        let encrypted_bidder = encrypt_to_ciphertext(&bidder, public).unwrap();
        let nonce = Nonce("18bcfe56800-0b".into());
        let key_fingerprint = public.fingerprint();
        let commitment_hash =
            commit(&encrypted_amount, &encrypted_bidder, 1_000, &nonce, &key_fingerprint);
        let payload = EncryptedPayload {
            version: PAYLOAD_VERSION,
            encrypted_amount,
            encrypted_bidder,
            timestamp: 1_000,
            nonce,
            commitment_hash,
            key_fingerprint,
            signature: Digest32::default(),
        };
        let decrypted = DecryptedValue {
            amount: to_fixed_width(&amount, width).unwrap(),
            bidder: to_fixed_width(&bidder, width).unwrap(),
        };
        let proof = prove(&payload, &decrypted, public, &mut OsRng).unwrap();
        let oversized = RevealedBid {
            payload,
            proof,
            public_key: public.to_bytes(),
        };
        assert!(verify_reveal(&oversized.payload, &oversized.proof, &oversized.public_key));

        let bids = vec![honest.payload.clone(), oversized.payload.clone()];
        let winner = compute_winner(&bids, &[honest, oversized], 0).unwrap();
        assert_eq!(winner.bidder, "0xA");
        assert_eq!(winner.amount, 100);
        assert_eq!(winner.num_valid_bids, 1);
    }

    #[test]
    fn test_no_reveals() {
        assert!(compute_winner(&[], &[], 0).is_none());
    }
}
