//! Secret generation.
//!
//! Structure is fixed per [`SecretType`]; content comes from a
//! cryptographically secure RNG. The operating-system RNG is used unless a
//! caller supplies its own through [`generate_with_rng`].

use super::types::{Secret, SecretMetadata, SecretType};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ALPHANUMERIC_SYMBOLS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{}<>?";

const API_KEY_PREFIX: &str = "sk-";
const API_KEY_LENGTH: usize = 48;
const PASSWORD_LENGTH: usize = 24;
const RAW_BYTES: usize = 32;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Generate a secret of the given type from the OS RNG.
pub fn generate(kind: SecretType) -> Secret {
    generate_with_rng(kind, &mut OsRng)
}

/// Generate a secret of the given type from a caller-provided secure RNG.
pub fn generate_with_rng<R: RngCore + CryptoRng>(kind: SecretType, rng: &mut R) -> Secret {
    let (value, metadata) = match kind {
        SecretType::ApiKey => {
            let body = random_string(rng, ALPHANUMERIC, API_KEY_LENGTH);
            let value = format!("{API_KEY_PREFIX}{body}");
            let metadata = SecretMetadata {
                format: "alphanumeric".into(),
                length: value.len(),
                entropy_bits: entropy_bits(ALPHANUMERIC.len(), API_KEY_LENGTH),
            };
            (value, metadata)
        }
        SecretType::Password => {
            let value = random_string(rng, ALPHANUMERIC_SYMBOLS, PASSWORD_LENGTH);
            let metadata = SecretMetadata {
                format: "alphanumeric-symbols".into(),
                length: value.len(),
                entropy_bits: entropy_bits(ALPHANUMERIC_SYMBOLS.len(), PASSWORD_LENGTH),
            };
            (value, metadata)
        }
        SecretType::Token => token(rng),
        SecretType::Uuid => {
            let mut bytes = [0u8; 16];
            rng.fill_bytes(&mut bytes);
            let value = uuid::Builder::from_random_bytes(bytes)
                .into_uuid()
                .hyphenated()
                .to_string();
            let metadata = SecretMetadata {
                format: "uuid-v4".into(),
                length: value.len(),
                entropy_bits: 122,
            };
            (value, metadata)
        }
        SecretType::Hex => {
            let value = hex::encode(random_bytes(rng));
            let metadata = SecretMetadata {
                format: "hex".into(),
                length: value.len(),
                entropy_bits: (RAW_BYTES * 8) as u32,
            };
            (value, metadata)
        }
        SecretType::PrivateKey => {
            let value = format!("0x{}", hex::encode(random_bytes(rng)));
            let metadata = SecretMetadata {
                format: "hex-0x".into(),
                length: value.len(),
                entropy_bits: (RAW_BYTES * 8) as u32,
            };
            (value, metadata)
        }
        SecretType::Random => {
            let value = STANDARD.encode(random_bytes(rng));
            let metadata = SecretMetadata {
                format: "base64".into(),
                length: value.len(),
                entropy_bits: (RAW_BYTES * 8) as u32,
            };
            (value, metadata)
        }
    };

    Secret::new(value, kind, metadata)
}

fn random_bytes<R: RngCore>(rng: &mut R) -> [u8; RAW_BYTES] {
    let mut bytes = [0u8; RAW_BYTES];
    rng.fill_bytes(&mut bytes);
    bytes
}

fn random_string<R: Rng>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

fn entropy_bits(alphabet_len: usize, len: usize) -> u32 {
    ((alphabet_len as f64).log2() * len as f64).floor() as u32
}

/// `header.payload.signature`, each base64url without padding. The header is
/// fixed, the payload carries a random subject and nonce, and the signature
/// segment is 32 random bytes. Nothing is actually signed.
fn token<R: RngCore>(rng: &mut R) -> (String, SecretMetadata) {
    let mut subject = [0u8; 16];
    rng.fill_bytes(&mut subject);
    let mut nonce = [0u8; 16];
    rng.fill_bytes(&mut nonce);

    let payload = serde_json::json!({
        "sub": hex::encode(subject),
        "jti": hex::encode(nonce),
        "iat": chrono::Utc::now().timestamp(),
    });

    let value = format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
        URL_SAFE_NO_PAD.encode(payload.to_string()),
        URL_SAFE_NO_PAD.encode(random_bytes(rng)),
    );
    let metadata = SecretMetadata {
        format: "jwt-shaped".into(),
        length: value.len(),
        entropy_bits: (16 + 16 + RAW_BYTES as u32) * 8,
    };
    (value, metadata)
}
