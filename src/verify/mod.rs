//! Digest comparison.
//!
//! Pure equality of the expected and observed digests. No cryptography
//! happens here; trust rests on provisioning and on the producer and
//! consumer not being able to forge each other's output.

use crate::secrets::Digest;
use serde::Serialize;
use std::fmt;

/// Why a verification did not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MismatchReason {
    MissingExpected,
    MissingObserved,
    Mismatch,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MismatchReason::MissingExpected => "no expected digest",
            MismatchReason::MissingObserved => "no observed digest",
            MismatchReason::Mismatch => "digests differ",
        };
        f.write_str(s)
    }
}

/// Outcome of [`verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub matched: bool,
    pub reason: Option<MismatchReason>,
}

pub fn verify(expected: Option<&Digest>, observed: Option<&Digest>) -> Verdict {
    let reason = match (expected, observed) {
        (None, _) => Some(MismatchReason::MissingExpected),
        (Some(_), None) => Some(MismatchReason::MissingObserved),
        (Some(e), Some(o)) if e.matches(o) => None,
        (Some(_), Some(_)) => Some(MismatchReason::Mismatch),
    };
    Verdict {
        matched: reason.is_none(),
        reason,
    }
}

/// Report for one full run. Lives only as long as the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub expected_digest: Option<Digest>,
    pub observed_digest: Option<Digest>,
    pub matched: bool,
    pub is_reuse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<MismatchReason>,
}

impl VerificationResult {
    pub fn new(expected: Option<Digest>, observed: Option<Digest>, is_reuse: bool) -> Self {
        let verdict = verify(expected.as_ref(), observed.as_ref());
        Self {
            expected_digest: expected,
            observed_digest: observed,
            matched: verdict.matched,
            is_reuse,
            reason: verdict.reason,
        }
    }
}
