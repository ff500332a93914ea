//! Per-bid nonces.
//!
//! `hex(creation ms) - hex(16 random bytes)`. The time prefix keeps nonces
//! roughly sortable; the random suffix makes collisions improbable but not
//! impossible, so publishing still checks for repeats.

use rand::{CryptoRng, RngCore};

use sealbid_crypto::entropy::random_array;
use sealbid_crypto::CryptoError;
use sealbid_types::{Nonce, Timestamp};

const SUFFIX_LEN: usize = 16;

pub fn generate_nonce<R: RngCore + CryptoRng>(
    now: Timestamp,
    rng: &mut R,
) -> Result<Nonce, CryptoError> {
    let suffix: [u8; SUFFIX_LEN] = random_array(rng)?;
    Ok(Nonce(format!("{:x}-{}", now, hex::encode(suffix))))
}
