use super::{FingerprintRecord, FingerprintRepository};
use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Single JSON record file under the state directory.
pub struct FileFingerprintRepository {
    path: PathBuf,
}

impl FileFingerprintRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&self) -> Option<FingerprintRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(
                    "Cannot read fingerprint record '{}': {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<FingerprintRecord>(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    "Ignoring unparseable fingerprint record '{}': {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }
}

impl FingerprintRepository for FileFingerprintRepository {
    fn load(&self, consumer: &str) -> Result<Option<FingerprintRecord>> {
        match self.read_record() {
            Some(record) if record.belongs_to(consumer) => Ok(Some(record)),
            Some(record) => {
                info!(
                    "Stored fingerprint belongs to {}, not {}; it will be replaced",
                    record.consumer_identity, consumer
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Writes to a temporary file in the same directory, then renames it over
    /// the record so a crash never leaves a half-written record.
    fn save(&self, record: &FingerprintRecord) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Repository(format!("create {}: {e}", dir.display())))?;

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::Repository(format!("encode record: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::Repository(format!("temp file in {}: {e}", dir.display())))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::Repository(format!("write record: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Repository(format!("persist {}: {e}", self.path.display())))?;

        debug!("Fingerprint record saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Repository(format!(
                "remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
