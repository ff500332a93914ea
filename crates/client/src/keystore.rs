//! Local key file for the CLI.
//!
//! Holds the public key and the hex private exponent. This file stays on
//! the bidder's machine; nothing in it is ever part of a payload.

use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use sealbid_crypto::{CryptoError, KeyPair, PrivateKey, PublicKey};
use sealbid_types::PublicKeyBytes;

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeyFile {
    #[zeroize(skip)]
    pub public_key: PublicKeyBytes,
    private_exponent: String,
}

impl std::fmt::Debug for KeyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFile")
            .field("public_key", &self.public_key)
            .field("private_exponent", &"<redacted>")
            .finish()
    }
}

impl KeyFile {
    pub fn from_key_pair(keys: &KeyPair) -> Self {
        Self {
            public_key: keys.public_key().to_bytes(),
            private_exponent: hex::encode(keys.private_key().expose_bytes()),
        }
    }

    /// Rebuild the key pair, checking the halves still belong together.
    pub fn to_key_pair(&self) -> Result<KeyPair, KeyFileError> {
        let public = PublicKey::from_bytes(&self.public_key)?;
        let exponent = hex::decode(&self.private_exponent)
            .map(Zeroizing::new)
            .map_err(|_| KeyFileError::Malformed("private exponent is not hex".into()))?;
        let private = PrivateKey::from_bytes(exponent)?;
        Ok(KeyPair::from_parts(public, private)?)
    }

    pub fn load(path: &Path) -> Result<Self, KeyFileError> {
        let raw = Zeroizing::new(
            std::fs::read_to_string(path).map_err(|e| KeyFileError::Io(e.to_string()))?,
        );
        serde_json::from_str(&raw).map_err(|e| KeyFileError::Malformed(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), KeyFileError> {
        let raw = Zeroizing::new(
            serde_json::to_string_pretty(self)
                .map_err(|e| KeyFileError::Malformed(e.to_string()))?,
        );
        std::fs::write(path, raw.as_bytes()).map_err(|e| KeyFileError::Io(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error("Key file I/O failed: {0}")]
    Io(String),

    #[error("Malformed key file: {0}")]
    Malformed(String),

    #[error(transparent)]
    Key(#[from] CryptoError),
}
