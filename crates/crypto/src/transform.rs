//! Modular-exponentiation transform.
//!
//! `encrypt(m) = m^e mod n` and `decrypt(c) = c^d mod n`. They are inverses
//! because key generation picks `d = e⁻¹ mod λ(n)`; see [`crate::keys`].
//! Values are arbitrary-precision unsigned integers, so negative exponents
//! cannot be expressed and nothing overflows.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use sealbid_types::Ciphertext;

use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// Compute `base^exponent mod modulus` by square-and-multiply.
///
/// Takes O(log exponent) multiplications. A modulus of one is the
/// degenerate group and yields zero; a zero modulus is rejected.
pub fn mod_pow(
    base: &BigUint,
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<BigUint, CryptoError> {
    if modulus.is_zero() {
        return Err(CryptoError::invalid("modulus", "must be non-zero"));
    }
    if modulus.is_one() {
        return Ok(BigUint::zero());
    }
    Ok(base.modpow(exponent, modulus))
}

/// Encrypt a transform-domain value under a public key.
pub fn encrypt(value: &BigUint, key: &PublicKey) -> Result<BigUint, CryptoError> {
    check_in_domain("value", value, key.modulus())?;
    mod_pow(value, key.exponent(), key.modulus())
}

/// Decrypt a ciphertext integer with the private exponent.
pub fn decrypt(
    value: &BigUint,
    private_key: &PrivateKey,
    modulus: &BigUint,
) -> Result<BigUint, CryptoError> {
    check_in_domain("ciphertext", value, modulus)?;
    let exponent = private_key.exponent();
    mod_pow(value, &exponent, modulus)
}

/// Encrypt and render at the modulus width.
pub fn encrypt_to_ciphertext(value: &BigUint, key: &PublicKey) -> Result<Ciphertext, CryptoError> {
    let encrypted = encrypt(value, key)?;
    Ok(Ciphertext(to_fixed_width(&encrypted, key.width())?))
}

fn check_in_domain(
    field: &'static str,
    value: &BigUint,
    modulus: &BigUint,
) -> Result<(), CryptoError> {
    if modulus.is_zero() {
        return Err(CryptoError::invalid("modulus", "must be non-zero"));
    }
    if value >= modulus {
        return Err(CryptoError::invalid(field, "must be smaller than the modulus"));
    }
    Ok(())
}

/// Big-endian bytes left-padded with zeros to `width`.
pub fn to_fixed_width(value: &BigUint, width: usize) -> Result<Vec<u8>, CryptoError> {
    if value.is_zero() {
        return Ok(vec![0u8; width]);
    }
    let bytes = value.to_bytes_be();
    if bytes.len() > width {
        return Err(CryptoError::invalid(
            "value",
            format!("needs {} bytes, width is {}", bytes.len(), width),
        ));
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Read a big-endian integer.
pub fn from_be_bytes(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}
