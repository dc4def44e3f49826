//! Provisioning coordinator.
//!
//! Decides between two states for a consumer:
//!
//! - `NEEDS_PROVISION`: generate a secret, push it, run the provisioning
//!   agent, and record the digest it reports.
//! - `REUSE`: a record for this consumer exists locally; skip all of the above
//!   and use the stored digest.
//!
//! The decision uses local state only. Nothing is persisted until a digest
//! has been confirmed, so any failure before that point leaves the next run
//! in `NEEDS_PROVISION`.

use crate::error::{Error, Result};
use crate::execution::{ExecutionRequest, ExecutionTemplate, TaskDriver};
use crate::fingerprint::{FingerprintRecord, FingerprintRepository};
use crate::results::{producer_digest, ResultFetcher};
use crate::secrets::{self, Digest, SecretType};
use crate::store::SecretStore;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Coordinator state for one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionState {
    NeedsProvision,
    Reuse(FingerprintRecord),
}

impl ProvisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionState::NeedsProvision => "NEEDS_PROVISION",
            ProvisionState::Reuse(_) => "REUSE",
        }
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `REUSE` iff a record exists and was written for `consumer`. Reads local
/// state only.
pub fn decide(repository: &dyn FingerprintRepository, consumer: &str) -> Result<ProvisionState> {
    let state = match repository.load(consumer)? {
        Some(record) if record.belongs_to(consumer) => ProvisionState::Reuse(record),
        _ => ProvisionState::NeedsProvision,
    };
    info!("Provisioning state for {}: {}", consumer, state);
    Ok(state)
}

/// What the producer run is asked to do.
#[derive(Debug, Clone)]
pub struct ProducerSpec {
    pub template: ExecutionTemplate,
    pub label: String,
    pub secret_type: SecretType,
}

/// Result of [`ProvisioningCoordinator::ensure_provisioned`].
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub record: FingerprintRecord,
    pub is_reuse: bool,
    /// Set when the store already held a secret and its digest could not be
    /// checked against one we generated.
    pub caveat: Option<String>,
}

impl ProvisionOutcome {
    pub fn digest(&self) -> &Digest {
        &self.record.digest
    }
}

pub struct ProvisioningCoordinator {
    repository: Arc<dyn FingerprintRepository>,
    store: Arc<dyn SecretStore>,
    driver: TaskDriver,
    fetcher: Arc<dyn ResultFetcher>,
    producer: ProducerSpec,
}

impl ProvisioningCoordinator {
    pub fn new(
        repository: Arc<dyn FingerprintRepository>,
        store: Arc<dyn SecretStore>,
        driver: TaskDriver,
        fetcher: Arc<dyn ResultFetcher>,
        producer: ProducerSpec,
    ) -> Self {
        Self {
            repository,
            store,
            driver,
            fetcher,
            producer,
        }
    }

    pub fn decide(&self, consumer: &str) -> Result<ProvisionState> {
        decide(self.repository.as_ref(), consumer)
    }

    /// Make sure a secret is provisioned for `consumer` and return the digest
    /// to expect from the consumer run.
    pub async fn ensure_provisioned(&self, consumer: &str) -> Result<ProvisionOutcome> {
        match self.decide(consumer)? {
            ProvisionState::Reuse(record) => Ok(self.reuse(record)),
            ProvisionState::NeedsProvision => self.provision(consumer).await,
        }
    }

    fn reuse(&self, record: FingerprintRecord) -> ProvisionOutcome {
        let record = record.reused();
        info!(
            "Reusing fingerprint {} for {} (recorded {}, reuse #{})",
            record.digest, record.consumer_identity, record.recorded_at, record.reuse_count
        );
        if let Err(e) = self.repository.save(&record) {
            warn!("Could not update reuse counter: {}", e);
        }
        ProvisionOutcome {
            record,
            is_reuse: true,
            caveat: None,
        }
    }

    async fn provision(&self, consumer: &str) -> Result<ProvisionOutcome> {
        let secret = secrets::generate(self.producer.secret_type);
        info!(
            "Generated {} secret ({} chars, digest {})",
            secret.kind(),
            secret.metadata().length,
            secret.digest()
        );

        let pushed = match self.store.push(consumer, secret.value()).await {
            Ok(true) => true,
            Ok(false) => {
                return Err(Error::StoreUnavailable(format!(
                    "store '{}' did not accept the secret for {consumer}",
                    self.store.name()
                )));
            }
            Err(Error::AlreadyProvisioned { .. }) => {
                warn!(
                    "Store already holds a secret for {}; continuing on the assumption that it \
                     is the intended one. This cannot be verified from here.",
                    consumer
                );
                false
            }
            Err(e) => return Err(e),
        };

        let request = self.producer.template.request(ExecutionRequest::producer_arguments(
            consumer,
            &self.producer.label,
            self.producer.secret_type.as_str(),
        ));
        let (handle, location) = self.driver.execute(&request).await?;

        let document = self.fetcher.fetch(&location).await.map_err(|e| {
            error!("Producer result for task {} unreadable: {}", handle.task_id, e);
            e
        })?;

        let produced = producer_digest(&document).ok_or_else(|| {
            Error::ProvisioningIncomplete(format!(
                "producer task {} reported no secretInfo.hash",
                handle.task_id
            ))
        })?;

        if pushed && !produced.matches(secret.digest()) {
            error!(
                "Producer task {} observed digest {} but {} was pushed",
                handle.task_id,
                produced,
                secret.digest()
            );
            return Err(Error::ProvisioningIncomplete(format!(
                "producer digest {produced} does not match the pushed secret"
            )));
        }

        let caveat = (!pushed).then(|| {
            format!(
                "secret for {consumer} was provisioned earlier; digest {produced} is taken from \
                 the producer run"
            )
        });

        let record = FingerprintRecord::new(consumer, produced);
        self.repository.save(&record)?;
        info!(
            "Provisioned {} for {} (task {})",
            record.digest, consumer, handle.task_id
        );

        Ok(ProvisionOutcome {
            record,
            is_reuse: false,
            caveat,
        })
    }
}
