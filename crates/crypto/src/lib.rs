//! Cryptographic primitives for sealed-bid commitments.
//!
//! This crate turns a plaintext bid into a value that can be published
//! before an auction closes and later opened with a verifiable proof.
//!
//! # Overview
//!
//! 1. **Key material**: each bidder generates a trapdoor key pair
//!    (modulus `n = p·q`, public exponent `e`, private exponent `d`,
//!    and a random generator used as a consistency witness).
//!
//! 2. **Encoding**: amount and bidder identity are each mapped into the
//!    integer domain below `n`, with random padding so equal plaintexts
//!    encode differently.
//!
//! 3. **Transform**: `encrypt(m) = m^e mod n`, `decrypt(c) = c^d mod n`.
//!
//! 4. **Commitment**: SHA-256 over both ciphertexts, timestamp and nonce,
//!    published with the payload for tamper detection.
//!
//! 5. **Authenticity tag**: HMAC over the plaintext bid with a per-bid key
//!    derived from the private exponent and nonce.
//!
//! 6. **Reveal proof**: after close, the bidder decrypts, proves the
//!    decrypted values re-encrypt to the published ciphertexts, and binds
//!    the disclosure with a verification hash any auditor can recompute.

pub mod codec;
pub mod commitment;
pub mod entropy;
pub mod error;
pub mod keys;
pub mod proof;
pub mod signature;
pub mod transform;

pub use codec::{decode_amount, decode_bidder, encode_bid, EncodedBid};
pub use commitment::{commit, verify_payload_commitment};
pub use error::CryptoError;
pub use keys::{generate_key_pair, KeyPair, KeySizing, PrivateKey, PublicKey};
pub use proof::{decode_bid, prove, sealed_under, verify_proof};
pub use signature::{sign, verify, DerivationKey};
pub use transform::{decrypt, encrypt, encrypt_to_ciphertext, mod_pow};
