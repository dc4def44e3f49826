//! Persisted fingerprint records.
//!
//! A record remembers which digest was provisioned for which consumer, so a
//! re-run can skip provisioning. Access is read-then-write by a single
//! process; concurrent runs against the same record file race, and no lock is
//! taken.

mod file;
mod memory;

pub use file::FileFingerprintRepository;
pub use memory::MemoryFingerprintRepository;

use crate::error::Result;
use crate::secrets::Digest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{ consumerIdentity, digest, timestamp, reuseCount }` on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintRecord {
    pub consumer_identity: String,
    pub digest: Digest,
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub reuse_count: u32,
}

impl FingerprintRecord {
    pub fn new(consumer_identity: impl Into<String>, digest: Digest) -> Self {
        Self {
            consumer_identity: consumer_identity.into(),
            digest,
            recorded_at: Utc::now(),
            reuse_count: 0,
        }
    }

    /// Whether this record was written for `consumer`. Addresses compare
    /// case-insensitively.
    pub fn belongs_to(&self, consumer: &str) -> bool {
        self.consumer_identity.eq_ignore_ascii_case(consumer)
    }

    /// Copy with the reuse counter bumped.
    pub fn reused(&self) -> Self {
        Self {
            reuse_count: self.reuse_count.saturating_add(1),
            ..self.clone()
        }
    }
}

/// Storage for fingerprint records.
pub trait FingerprintRepository: Send + Sync {
    /// The record for `consumer`, if one exists. A record written for a
    /// different consumer is never returned. Unreadable state is reported as
    /// `None`, not as an error.
    fn load(&self, consumer: &str) -> Result<Option<FingerprintRecord>>;

    /// Persist `record`, replacing whatever was stored before.
    fn save(&self, record: &FingerprintRecord) -> Result<()>;

    /// Forget any stored record. Returns whether something was removed.
    fn clear(&self) -> Result<bool>;
}
