//! Secret store boundary.
//!
//! The store binds one secret per consumer identity and overwrites on push.
//! It keeps no history, so the fingerprint repository is the only record of
//! what was provisioned.

mod http;
mod memory;

pub use http::HttpSecretStore;
pub use memory::MemorySecretStore;

use crate::error::{Error, Result};
use crate::secrets::SecretValue;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("static regex"));

/// Pushes secret values to a remote store keyed by consumer identity.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Display name for logging.
    fn name(&self) -> &str;

    /// Bind `value` to `consumer`.
    ///
    /// Errors: `InvalidIdentity` for a malformed address,
    /// `AlreadyProvisioned` when the store refuses to overwrite,
    /// `StoreUnavailable` for anything else.
    async fn push(&self, consumer: &str, value: &SecretValue) -> Result<bool>;
}

/// Check that `consumer` is a `0x`-prefixed 20-byte hex address.
pub fn validate_address(consumer: &str) -> Result<()> {
    if ADDRESS_RE.is_match(consumer) {
        Ok(())
    } else {
        Err(Error::InvalidIdentity(consumer.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_addresses() {
        assert!(validate_address("0x5Aa1b2C3d4E5f60718293a4B5c6D7e8F90a1B2c3").is_ok());
        assert!(validate_address("0x0000000000000000000000000000000000000000").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "0x",
            "0xC0NSUMER",
            "5Aa1b2C3d4E5f60718293a4B5c6D7e8F90a1B2c3",
            "0x5Aa1b2C3d4E5f60718293a4B5c6D7e8F90a1B2c",
            "0x5Aa1b2C3d4E5f60718293a4B5c6D7e8F90a1B2c3ff",
        ] {
            assert!(
                matches!(validate_address(bad), Err(Error::InvalidIdentity(_))),
                "accepted {bad:?}"
            );
        }
    }
}
