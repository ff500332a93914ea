//! Bidder key material.
//!
//! A key pair is `(e, d, n, g)`:
//! - `n = p·q`, generated by the `rsa` crate at the configured size
//! - `e = 65537`, the only exponent any public key may carry
//! - `d` inverts `e`, so `(m^e)^d ≡ m (mod n)` for all `m < n`
//! - `g` is a random element of `[2, n−2]`, kept as a witness for
//!   [`KeyPair::check_consistency`]
//!
//! Every value is held at the modulus width in big-endian bytes. The private
//! exponent lives in a zeroizing buffer and has no serialized form.

use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use sealbid_types::{canonical::CanonicalWriter, sha256, Digest32, PublicKeyBytes};

use crate::entropy::random_array;
use crate::error::CryptoError;
use crate::transform::{mod_pow, to_fixed_width};

/// Public exponent shared by every key pair.
pub const PUBLIC_EXPONENT: u32 = 65_537;

/// Smallest accepted modulus.
pub const MIN_MODULUS_BITS: u64 = 256;

/// Largest accepted modulus.
pub const MAX_MODULUS_BITS: u64 = 8192;

/// Modulus size used when nothing else is configured.
pub const DEFAULT_MODULUS_BITS: u64 = 1024;

/// Size parameters for key generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeySizing {
    /// Modulus size; a multiple of 16 in
    /// [[`MIN_MODULUS_BITS`], [`MAX_MODULUS_BITS`]]
    pub modulus_bits: u64,
}

impl Default for KeySizing {
    fn default() -> Self {
        Self::new(DEFAULT_MODULUS_BITS)
    }
}

impl KeySizing {
    pub const fn new(modulus_bits: u64) -> Self {
        Self { modulus_bits }
    }

    pub fn validate(&self) -> Result<(), CryptoError> {
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&self.modulus_bits) {
            return Err(CryptoError::invalid(
                "modulus_bits",
                format!("must lie in [{}, {}]", MIN_MODULUS_BITS, MAX_MODULUS_BITS),
            ));
        }
        // Both prime halves must be whole bytes.
        if self.modulus_bits % 16 != 0 {
            return Err(CryptoError::invalid("modulus_bits", "must be a multiple of 16"));
        }
        Ok(())
    }

    /// Width in bytes of every key value.
    pub fn width(&self) -> usize {
        (self.modulus_bits / 8) as usize
    }
}

/// Public half of a key pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    exponent: BigUint,
    modulus: BigUint,
    generator: BigUint,
    bytes: PublicKeyBytes,
}

impl PublicKey {
    /// Validate and assemble a public key. Out-of-range values are rejected,
    /// never reduced.
    ///
    /// Only the exponent [`PUBLIC_EXPONENT`] and moduli within the
    /// [`KeySizing`] bounds are accepted, so a payload cannot be reopened
    /// under a hand-built key.
    pub fn new(exponent: BigUint, modulus: BigUint, generator: BigUint) -> Result<Self, CryptoError> {
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&modulus.bits()) {
            return Err(CryptoError::invalid(
                "modulus",
                format!("must have {} to {} bits", MIN_MODULUS_BITS, MAX_MODULUS_BITS),
            ));
        }
        if exponent != BigUint::from(PUBLIC_EXPONENT) {
            return Err(CryptoError::invalid(
                "public_key",
                format!("exponent must be {}", PUBLIC_EXPONENT),
            ));
        }
        if generator < BigUint::from(2u32) || generator >= modulus {
            return Err(CryptoError::invalid("generator", "must lie in [2, modulus)"));
        }
        let width = ((modulus.bits() + 7) / 8) as usize;
        let bytes = PublicKeyBytes {
            exponent: to_fixed_width(&exponent, width)?,
            modulus: to_fixed_width(&modulus, width)?,
            generator: to_fixed_width(&generator, width)?,
        };
        Ok(Self {
            exponent,
            modulus,
            generator,
            bytes,
        })
    }

    /// Parse the fixed-width wire form.
    pub fn from_bytes(bytes: &PublicKeyBytes) -> Result<Self, CryptoError> {
        let width = bytes.modulus.len();
        if width == 0 || bytes.modulus[0] == 0 {
            return Err(CryptoError::invalid("modulus", "must be non-empty without leading zeros"));
        }
        if bytes.exponent.len() != width {
            return Err(CryptoError::invalid("public_key", "width differs from modulus"));
        }
        if bytes.generator.len() != width {
            return Err(CryptoError::invalid("generator", "width differs from modulus"));
        }
        Self::new(
            BigUint::from_bytes_be(&bytes.exponent),
            BigUint::from_bytes_be(&bytes.modulus),
            BigUint::from_bytes_be(&bytes.generator),
        )
    }

    pub fn to_bytes(&self) -> PublicKeyBytes {
        self.bytes.clone()
    }

    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    /// Byte width of values in this key's domain.
    pub fn width(&self) -> usize {
        self.bytes.modulus.len()
    }

    /// Stable identifier, bound into every payload sealed under this key.
    pub fn fingerprint(&self) -> Digest32 {
        let mut w = CanonicalWriter::new(b"SEALBID_PUBLIC_KEY_V1");
        w.field(&self.bytes.exponent)
            .field(&self.bytes.modulus)
            .field(&self.bytes.generator);
        Digest32(sha256(&w.finish()))
    }
}

/// Private exponent, erased from memory on drop.
#[derive(Clone)]
pub struct PrivateKey {
    exponent: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl PrivateKey {
    /// Take ownership of a big-endian private exponent.
    pub fn from_bytes(bytes: Zeroizing<Vec<u8>>) -> Result<Self, CryptoError> {
        if bytes.iter().all(|b| *b == 0) {
            return Err(CryptoError::invalid("private_key", "must be non-zero"));
        }
        Ok(Self { exponent: bytes })
    }

    fn from_biguint(value: &BigUint, width: usize) -> Result<Self, CryptoError> {
        Self::from_bytes(Zeroizing::new(to_fixed_width(value, width)?))
    }

    /// Materialize the exponent for one computation.
    pub fn exponent(&self) -> BigUint {
        BigUint::from_bytes_be(&self.exponent)
    }

    /// Raw bytes, for the bidder's local key store only.
    pub fn expose_bytes(&self) -> &[u8] {
        &self.exponent
    }
}

/// A bidder's key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Assemble a key pair, refusing parts that do not invert each other.
    pub fn from_parts(public: PublicKey, private: PrivateKey) -> Result<Self, CryptoError> {
        if private.exponent.len() != public.width() {
            return Err(CryptoError::invalid("private_key", "width differs from modulus"));
        }
        let pair = Self { public, private };
        pair.check_consistency()?;
        Ok(pair)
    }

    /// Confirm `(g^e)^d ≡ g (mod n)` for the stored generator.
    pub fn check_consistency(&self) -> Result<(), CryptoError> {
        let modulus = self.public.modulus();
        let forward = mod_pow(self.public.generator(), self.public.exponent(), modulus)?;
        let back = mod_pow(&forward, &self.private.exponent(), modulus)?;
        if &back != self.public.generator() {
            return Err(CryptoError::invalid(
                "private_key",
                "does not invert the public exponent",
            ));
        }
        Ok(())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }
}


/// Generate a fresh key pair from a secure random source.
///
/// One seed is drawn from `rng`; prime search and the generator draw run on
/// a ChaCha stream expanded from it. Fails with
/// [`CryptoError::EntropyUnavailable`] if `rng` cannot produce bytes;
/// nothing falls back to a weaker source.
pub fn generate_key_pair<R: RngCore + CryptoRng>(
    sizing: KeySizing,
    rng: &mut R,
) -> Result<KeyPair, CryptoError> {
    sizing.validate()?;

    let seed = Zeroizing::new(random_array::<32, _>(rng)?);
    let mut stream = ChaCha20Rng::from_seed(*seed);

    let rsa_key = RsaPrivateKey::new(&mut stream, sizing.modulus_bits as usize)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    let modulus = BigUint::from_bytes_be(&rsa_key.n().to_bytes_be());
    let exponent = BigUint::from_bytes_be(&rsa_key.e().to_bytes_be());
    let private = Zeroizing::new(rsa_key.d().to_bytes_be());

    let generator = stream.gen_biguint_range(&BigUint::from(2u32), &(&modulus - 1u32));
    let public = PublicKey::new(exponent, modulus, generator)?;
    let private = PrivateKey::from_biguint(&BigUint::from_bytes_be(&private), public.width())?;
    let pair = KeyPair::from_parts(public, private)?;

    debug!(
        modulus_bits = sizing.modulus_bits,
        fingerprint = pair.public_key().fingerprint().to_hex(),
        "Generated key pair"
    );
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::testing::BrokenRng;
    use rand::rngs::OsRng;

    const TEST_SIZING: KeySizing = KeySizing::new(512);

    #[test]
    fn test_generate_key_pair() {
        let keys = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        let public = keys.public_key();

        assert_eq!(public.modulus().bits(), 512);
        assert_eq!(public.width(), 64);
        assert_eq!(public.exponent(), &BigUint::from(PUBLIC_EXPONENT));
        assert!(public.generator() >= &BigUint::from(2u32));
        assert!(public.generator() < &(public.modulus() - 1u32));
        assert!(keys.check_consistency().is_ok());

        let bytes = public.to_bytes();
        assert_eq!(bytes.exponent.len(), 64);
        assert_eq!(bytes.generator.len(), 64);
        assert_eq!(keys.private_key().expose_bytes().len(), 64);
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = generate_key_pair(TEST_SIZING, &mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let b = generate_key_pair(TEST_SIZING, &mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let c = generate_key_pair(TEST_SIZING, &mut ChaCha20Rng::seed_from_u64(8)).unwrap();

        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), c.public_key());
    }

    #[test]
    fn test_generation_without_entropy_fails() {
        let result = generate_key_pair(TEST_SIZING, &mut BrokenRng);
        assert!(matches!(result, Err(CryptoError::EntropyUnavailable(_))));
    }

    #[test]
    fn test_sizing_validation() {
        assert!(KeySizing::default().validate().is_ok());
        assert!(KeySizing::new(MIN_MODULUS_BITS).validate().is_ok());
        assert!(matches!(
            KeySizing::new(128).validate(),
            Err(CryptoError::InvalidParameters { field: "modulus_bits", .. })
        ));
        assert!(KeySizing::new(MAX_MODULUS_BITS + 16).validate().is_err());
        // Even but not a multiple of 16.
        assert!(KeySizing::new(264).validate().is_err());
        assert!(KeySizing::new(520).validate().is_err());
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let a = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        let b = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();

        let result = KeyPair::from_parts(a.public_key().clone(), b.private_key().clone());
        assert!(matches!(
            result,
            Err(CryptoError::InvalidParameters { field: "private_key", .. })
        ));
    }

    #[test]
    fn test_public_key_rejects_degenerate_values() {
        let keys = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        let public = keys.public_key();
        let e = || BigUint::from(PUBLIC_EXPONENT);

        assert!(matches!(
            PublicKey::new(e(), BigUint::from(35u32), BigUint::from(2u32)),
            Err(CryptoError::InvalidParameters { field: "modulus", .. })
        ));
        assert!(matches!(
            PublicKey::new(BigUint::from(3u32), public.modulus().clone(), public.generator().clone()),
            Err(CryptoError::InvalidParameters { field: "public_key", .. })
        ));
        assert!(matches!(
            PublicKey::new(e(), public.modulus().clone(), public.modulus().clone()),
            Err(CryptoError::InvalidParameters { field: "generator", .. })
        ));
    }

    #[test]
    fn test_public_key_bytes_require_fixed_width() {
        let keys = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        let mut bytes = keys.public_key().to_bytes();
        assert_eq!(&PublicKey::from_bytes(&bytes).unwrap(), keys.public_key());

        bytes.generator.remove(0);
        assert!(matches!(
            PublicKey::from_bytes(&bytes),
            Err(CryptoError::InvalidParameters { field: "generator", .. })
        ));
    }

    #[test]
    fn test_public_key_bytes_reject_foreign_exponent() {
        let keys = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        let mut bytes = keys.public_key().to_bytes();
        bytes.exponent = vec![0u8; bytes.modulus.len()];
        *bytes.exponent.last_mut().unwrap() = 3;

        assert!(matches!(
            PublicKey::from_bytes(&bytes),
            Err(CryptoError::InvalidParameters { field: "public_key", .. })
        ));
    }

    #[test]
    fn test_public_key_bytes_reject_oversized_modulus() {
        let width = (MAX_MODULUS_BITS / 8) as usize + 1;
        let mut exponent = vec![0u8; width];
        exponent[width - 3..].copy_from_slice(&[0x01, 0x00, 0x01]);
        let mut generator = vec![0u8; width];
        generator[width - 1] = 2;
        let bytes = PublicKeyBytes {
            exponent,
            modulus: vec![0xFF; width],
            generator,
        };

        assert!(matches!(
            PublicKey::from_bytes(&bytes),
            Err(CryptoError::InvalidParameters { field: "modulus", .. })
        ));
    }

    #[test]
    fn test_fingerprint_tracks_every_component() {
        let a = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        let b = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        assert_eq!(a.public_key().fingerprint(), a.public_key().clone().fingerprint());
        assert_ne!(a.public_key().fingerprint(), b.public_key().fingerprint());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let keys = generate_key_pair(TEST_SIZING, &mut OsRng).unwrap();
        let rendered = format!("{:?}", keys);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&hex::encode(keys.private_key().expose_bytes())));
    }
}
