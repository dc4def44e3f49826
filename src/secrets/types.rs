//! Core types for generated secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::warn;

// ============================================================================
// Secret Type
// ============================================================================

/// The shape of a generated secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretType {
    /// `sk-` followed by 48 alphanumeric characters.
    ApiKey,
    /// 24 characters drawn from alphanumerics and symbols.
    Password,
    /// Three base64url segments shaped like a signed token (unsigned).
    Token,
    /// RFC 4122 version 4 identifier.
    Uuid,
    /// 32 random bytes, lowercase hex.
    Hex,
    /// 32 random bytes, `0x`-prefixed hex.
    PrivateKey,
    /// 32 random bytes, standard base64.
    #[default]
    Random,
}

impl SecretType {
    pub const ALL: [SecretType; 7] = [
        SecretType::ApiKey,
        SecretType::Password,
        SecretType::Token,
        SecretType::Uuid,
        SecretType::Hex,
        SecretType::PrivateKey,
        SecretType::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::ApiKey => "api-key",
            SecretType::Password => "password",
            SecretType::Token => "token",
            SecretType::Uuid => "uuid",
            SecretType::Hex => "hex",
            SecretType::PrivateKey => "private-key",
            SecretType::Random => "random",
        }
    }

    fn from_known(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing never fails: unrecognized input selects [`SecretType::Random`].
impl FromStr for SecretType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_known(s).unwrap_or_else(|| {
            warn!("Unknown secret type '{}', falling back to 'random'", s);
            SecretType::Random
        }))
    }
}

// ============================================================================
// Digest
// ============================================================================

/// A SHA-256 fingerprint, carried as lowercase hex when computed locally.
///
/// Digests read back from remote results are kept verbatim (trimmed), so
/// comparison is exact string equality.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Hash `bytes` with SHA-256.
    pub fn of(bytes: &[u8]) -> Self {
        Digest(hex::encode(Sha256::digest(bytes)))
    }

    /// Wrap a digest reported by a remote computation. Blank input yields
    /// `None`.
    pub fn from_reported(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Digest(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time equality on the textual form.
    pub fn matches(&self, other: &Digest) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.0)
    }
}

// ============================================================================
// Secret
// ============================================================================

/// The raw secret payload.
///
/// Deliberately has no `Display` or `Serialize`; `Debug` is redacted. The
/// only way to read it is [`SecretValue::expose`], which the store client
/// uses to push it.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub(crate) fn new(value: String) -> Self {
        SecretValue(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// Non-revealing description of a generated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    /// Encoding or alphabet, e.g. `alphanumeric`, `uuid-v4`, `hex-0x`.
    pub format: String,
    /// Length of the encoded value in characters.
    pub length: usize,
    /// Random bits that went into the value.
    pub entropy_bits: u32,
}

/// A freshly generated secret. Immutable after creation.
#[derive(Debug, Clone)]
pub struct Secret {
    value: SecretValue,
    kind: SecretType,
    digest: Digest,
    generated_at: DateTime<Utc>,
    metadata: SecretMetadata,
}

impl Secret {
    pub(crate) fn new(value: String, kind: SecretType, metadata: SecretMetadata) -> Self {
        let digest = Digest::of(value.as_bytes());
        Self {
            value: SecretValue::new(value),
            kind,
            digest,
            generated_at: Utc::now(),
            metadata,
        }
    }

    pub fn value(&self) -> &SecretValue {
        &self.value
    }

    pub fn kind(&self) -> SecretType {
        self.kind
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn metadata(&self) -> &SecretMetadata {
        &self.metadata
    }

    /// Everything about the secret except its value.
    pub fn summary(&self) -> SecretSummary {
        SecretSummary {
            kind: self.kind,
            digest: self.digest.clone(),
            generated_at: self.generated_at,
            metadata: self.metadata.clone(),
        }
    }
}

/// Serializable view of a [`Secret`] without the value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSummary {
    #[serde(rename = "type")]
    pub kind: SecretType,
    pub digest: Digest,
    pub generated_at: DateTime<Utc>,
    pub metadata: SecretMetadata,
}

/// Redact a free-form string for display (show first 2 and last 2 chars).
pub fn redact_preview(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_types() {
        assert_eq!("api-key".parse::<SecretType>().unwrap(), SecretType::ApiKey);
        assert_eq!("API_KEY".parse::<SecretType>().unwrap(), SecretType::ApiKey);
        assert_eq!(
            "private-key".parse::<SecretType>().unwrap(),
            SecretType::PrivateKey
        );
        assert_eq!(" uuid ".parse::<SecretType>().unwrap(), SecretType::Uuid);
    }

    #[test]
    fn unknown_type_falls_back_to_random() {
        assert_eq!("mnemonic".parse::<SecretType>().unwrap(), SecretType::Random);
        assert_eq!("".parse::<SecretType>().unwrap(), SecretType::Random);
    }

    #[test]
    fn type_names_round_trip() {
        for kind in SecretType::ALL {
            assert_eq!(kind.as_str().parse::<SecretType>().unwrap(), kind);
        }
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&SecretType::PrivateKey).unwrap();
        assert_eq!(json, "\"private-key\"");
    }

    #[test]
    fn digest_of_known_input() {
        assert_eq!(
            Digest::of(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn reported_digest_is_trimmed_and_blank_rejected() {
        assert_eq!(
            Digest::from_reported("  deadbeef\n").unwrap().as_str(),
            "deadbeef"
        );
        assert!(Digest::from_reported("   ").is_none());
    }

    #[test]
    fn digest_matches_is_exact() {
        let a = Digest::from_reported("abcd").unwrap();
        let b = Digest::from_reported("abcd").unwrap();
        let c = Digest::from_reported("ABCD").unwrap();
        let d = Digest::from_reported("abc").unwrap();
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert!(!a.matches(&d));
    }

    #[test]
    fn secret_value_debug_is_redacted() {
        let value = SecretValue::new("hunter2-super-secret".into());
        let rendered = format!("{value:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn summary_serialization_omits_value() {
        let secret = Secret::new(
            "value-that-must-not-leak".into(),
            SecretType::Random,
            SecretMetadata {
                format: "base64".into(),
                length: 24,
                entropy_bits: 144,
            },
        );
        let json = serde_json::to_string(&secret.summary()).unwrap();
        assert!(!json.contains("value-that-must-not-leak"));
        assert!(json.contains(secret.digest().as_str()));
        assert!(json.contains("\"type\":\"random\""));
    }

    #[test]
    fn redact_preview_short_and_long() {
        assert_eq!(redact_preview("abc"), "***");
        let redacted = redact_preview("sk-1234567890");
        assert!(redacted.starts_with("sk"));
        assert!(redacted.ends_with("90"));
    }
}
