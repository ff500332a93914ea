//! Fallible draws from the injected random source.
//!
//! All randomness in this crate goes through these helpers so a source that
//! cannot produce bytes surfaces as [`CryptoError::EntropyUnavailable`]
//! instead of panicking or degrading.

use rand::{CryptoRng, RngCore};

use crate::error::CryptoError;

/// Fill `buf` from `rng`.
pub fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> Result<(), CryptoError> {
    rng.try_fill_bytes(buf)
        .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))
}

/// Draw a fixed-size array from `rng`.
pub fn random_array<const N: usize, R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<[u8; N], CryptoError> {
    let mut out = [0u8; N];
    fill_random(rng, &mut out)?;
    Ok(out)
}

#[cfg(test)]
pub(crate) mod testing {
    use rand::{CryptoRng, RngCore};

    /// A random source that always fails.
    pub struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!("BrokenRng only supports try_fill_bytes")
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!("BrokenRng only supports try_fill_bytes")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("BrokenRng only supports try_fill_bytes")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("device not ready"))
        }
    }

    impl CryptoRng for BrokenRng {}
}
