//! Decoding of the structured result documents.
//!
//! Producer runs report `secretInfo.hash`. Consumer runs report
//! `hashes.sha256`; older consumers wrote `generatedSecret.sha256` instead,
//! which is still accepted as an explicit fallback.

use crate::secrets::Digest;
use serde_json::Value;

/// Digest at `pointer`, when it is a non-blank string. Other fields of the
/// document never affect the lookup.
fn reported_digest(document: &Value, pointer: &str) -> Option<Digest> {
    document
        .pointer(pointer)
        .and_then(Value::as_str)
        .and_then(Digest::from_reported)
}

/// Which field a consumer digest was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSource {
    /// `hashes.sha256`
    Current,
    /// `generatedSecret.sha256`
    Legacy,
}

/// What a consumer run reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerObservation {
    pub digest: Option<Digest>,
    pub source: Option<DigestSource>,
    pub preview: Option<String>,
}

/// Digest reported by the provisioning agent, if any.
pub fn producer_digest(document: &Value) -> Option<Digest> {
    reported_digest(document, "/secretInfo/hash")
}

/// Digest reported by a consumer run.
///
/// `hashes.sha256` wins when both fields are present; `generatedSecret.sha256`
/// is only consulted when the current field is absent or blank.
pub fn consumer_observation(document: &Value) -> ConsumerObservation {
    let current = reported_digest(document, "/hashes/sha256");
    let legacy = reported_digest(document, "/generatedSecret/sha256");

    let (digest, source) = match (current, legacy) {
        (Some(d), _) => (Some(d), Some(DigestSource::Current)),
        (None, Some(d)) => (Some(d), Some(DigestSource::Legacy)),
        (None, None) => (None, None),
    };

    ConsumerObservation {
        digest,
        source,
        preview: document
            .get("preview")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
