use super::{FingerprintRecord, FingerprintRepository};
use crate::error::Result;
use parking_lot::Mutex;

/// Holds at most one record, like the file repository.
#[derive(Default)]
pub struct MemoryFingerprintRepository {
    record: Mutex<Option<FingerprintRecord>>,
}

impl MemoryFingerprintRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: FingerprintRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    /// The stored record regardless of consumer.
    pub fn snapshot(&self) -> Option<FingerprintRecord> {
        self.record.lock().clone()
    }
}

impl FingerprintRepository for MemoryFingerprintRepository {
    fn load(&self, consumer: &str) -> Result<Option<FingerprintRecord>> {
        Ok(self
            .record
            .lock()
            .as_ref()
            .filter(|r| r.belongs_to(consumer))
            .cloned())
    }

    fn save(&self, record: &FingerprintRecord) -> Result<()> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        Ok(self.record.lock().take().is_some())
    }
}
