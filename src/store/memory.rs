use super::{validate_address, SecretStore};
use crate::error::{Error, Result};
use crate::secrets::{Digest, SecretValue};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-process store. Keeps only digests of what was pushed.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, Digest>>,
    allow_overwrite: bool,
}

impl MemorySecretStore {
    pub fn new(allow_overwrite: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            allow_overwrite,
        }
    }

    /// Digest of the secret currently bound to `consumer`.
    pub fn digest_for(&self, consumer: &str) -> Option<Digest> {
        self.entries.read().get(&consumer.to_ascii_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn push(&self, consumer: &str, value: &SecretValue) -> Result<bool> {
        validate_address(consumer)?;
        let key = consumer.to_ascii_lowercase();
        let mut entries = self.entries.write();
        if entries.contains_key(&key) && !self.allow_overwrite {
            return Err(Error::AlreadyProvisioned {
                consumer: consumer.to_string(),
            });
        }
        entries.insert(key, Digest::of(value.expose().as_bytes()));
        Ok(true)
    }
}
