//! Signing credentials for the remote boundaries.
//!
//! Two credentials are in play: the operator key that submits executions and
//! a dedicated key that is allowed to push secrets to the store. They must
//! never be the same key.

use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// A signing key. `Debug` shows only the key id.
#[derive(Clone)]
pub struct Credential {
    key: String,
}

impl Credential {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(Error::Configuration("credential key is empty".into()));
        }
        Ok(Self { key })
    }

    /// Short public identifier: first 8 bytes of SHA-256(key), hex.
    pub fn key_id(&self) -> String {
        hex::encode(&Sha256::digest(self.key.as_bytes())[..8])
    }

    /// HMAC-SHA256 of `payload`, hex encoded.
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .map_err(|e| Error::Configuration(format!("unusable signing key: {e}")))?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Whether two credentials hold the same key.
    pub fn same_key(&self, other: &Credential) -> bool {
        self.key.as_bytes().ct_eq(other.key.as_bytes()).into()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(id={})", self.key_id())
    }
}
