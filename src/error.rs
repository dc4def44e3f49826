//! Error taxonomy for the provisioning and verification flow.

use crate::execution::TaskStatus;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing credential, endpoint or program identity. Raised before any
    /// remote call is attempted.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid consumer identity '{0}': expected a 0x-prefixed 20-byte hex address")]
    InvalidIdentity(String),

    /// The store already holds a secret for this consumer and the client
    /// policy forbids overwriting it.
    #[error("a secret is already provisioned for consumer {consumer}")]
    AlreadyProvisioned { consumer: String },

    #[error("secret store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("no compute offer available for tags [{tags}]")]
    NoOfferAvailable { tags: String },

    #[error("execution submission failed: {0}")]
    Submission(String),

    #[error("task {task_id} ended with status {status}")]
    ExecutionFailed { task_id: String, status: TaskStatus },

    #[error("task {task_id} reached no terminal status within {waited:?}")]
    WaitTimeout { task_id: String, waited: Duration },

    #[error("result unavailable: {0}")]
    ResultUnavailable(String),

    #[error("result malformed: {0}")]
    ResultMalformed(String),

    /// Provisioning did not yield a digest that can be durably recorded.
    #[error("provisioning incomplete: {0}")]
    ProvisioningIncomplete(String),

    #[error("fingerprint repository error: {0}")]
    Repository(String),
}

impl Error {
    /// Stable identifier for logs and exit reports.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration_error",
            Error::InvalidIdentity(_) => "invalid_identity",
            Error::AlreadyProvisioned { .. } => "already_provisioned",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::NoOfferAvailable { .. } => "no_offer_available",
            Error::Submission(_) => "submission_error",
            Error::ExecutionFailed { .. } => "execution_failed",
            Error::WaitTimeout { .. } => "wait_timeout",
            Error::ResultUnavailable(_) => "result_unavailable",
            Error::ResultMalformed(_) => "result_malformed",
            Error::ProvisioningIncomplete(_) => "provisioning_incomplete",
            Error::Repository(_) => "repository_error",
        }
    }

    /// Whether the error aborts the current run.
    ///
    /// `AlreadyProvisioned` is downgraded to a warning by the coordinator;
    /// every other variant is fatal to the branch that raised it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::AlreadyProvisioned { .. })
    }
}
