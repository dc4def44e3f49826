//! Secret generation and the digest used as its only durable trace.

pub mod generator;
pub mod types;

pub use generator::{generate, generate_with_rng};
pub use types::{
    redact_preview, Digest, Secret, SecretMetadata, SecretSummary, SecretType, SecretValue,
};
