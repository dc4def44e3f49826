//! End-to-end flow: provisioning, then the consumer run, then verification.
//!
//! The two stages run strictly one after the other. Errors in either stage
//! abort the run; a consumer result that cannot be read only skips the
//! comparison.

use crate::config::Config;
use crate::error::Result;
use crate::execution::{
    ExecutionHandle, ExecutionTemplate, HttpMarketplace, HttpStatusFeed, TaskDriver,
};
use crate::fingerprint::{FileFingerprintRepository, FingerprintRepository};
use crate::provisioning::{ProducerSpec, ProvisioningCoordinator};
use crate::results::{
    consumer_observation, fetch_indeterminate, ConsumerObservation, DigestSource,
    HttpResultFetcher, ResultFetcher,
};
use crate::secrets::redact_preview;
use crate::store::HttpSecretStore;
use crate::verify::VerificationResult;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// What one run established.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub consumer: String,
    #[serde(flatten)]
    pub verification: VerificationResult,
    pub consumer_task: ExecutionHandle,
    /// The consumer answered with `generatedSecret.sha256`.
    pub legacy_result_shape: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caveat: Option<String>,
}

pub struct ProofWorkflow {
    coordinator: ProvisioningCoordinator,
    driver: TaskDriver,
    fetcher: Arc<dyn ResultFetcher>,
    consumer: ExecutionTemplate,
    consumer_args: String,
}

impl ProofWorkflow {
    pub fn new(
        coordinator: ProvisioningCoordinator,
        driver: TaskDriver,
        fetcher: Arc<dyn ResultFetcher>,
        consumer: ExecutionTemplate,
        consumer_args: String,
    ) -> Self {
        Self {
            coordinator,
            driver,
            fetcher,
            consumer,
            consumer_args,
        }
    }

    /// Wire the HTTP-backed components described by `config`.
    ///
    /// Fails with `Configuration` before any remote call if credentials or
    /// endpoints are missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.require_credentials()?;
        let endpoints = config.require_endpoints()?;

        let repository: Arc<dyn FingerprintRepository> =
            Arc::new(FileFingerprintRepository::new(config.fingerprint_path()));
        let store = Arc::new(HttpSecretStore::new(
            endpoints.store_url,
            config.secret.label.clone(),
            credentials.store,
            config.secret.allow_overwrite,
        ));
        let marketplace = Arc::new(HttpMarketplace::new(
            endpoints.discovery_url.clone(),
            endpoints.rpc_url,
            config.network.chain_id,
            credentials.operator,
        ));
        let feed = Arc::new(HttpStatusFeed::new(endpoints.discovery_url));
        let fetcher: Arc<dyn ResultFetcher> = Arc::new(HttpResultFetcher::new(
            endpoints.result_gateway_url,
            config.execution.result_member.clone(),
        ));

        let driver = TaskDriver::new(marketplace, feed, config.execution.poll_policy());
        let producer = ProducerSpec {
            template: config.execution.producer_template()?,
            label: config.secret.label.clone(),
            secret_type: config.secret.secret_type,
        };
        let coordinator =
            ProvisioningCoordinator::new(repository, store, driver.clone(), fetcher.clone(), producer);

        Ok(Self::new(
            coordinator,
            driver,
            fetcher,
            config.execution.consumer_template()?,
            config.execution.consumer_args.clone(),
        ))
    }

    pub async fn run(&self, consumer: &str) -> Result<RunReport> {
        info!("Producer stage for consumer {}", consumer);
        let outcome = self.coordinator.ensure_provisioned(consumer).await?;
        if let Some(ref caveat) = outcome.caveat {
            warn!("Caveat: {}", caveat);
        }

        info!("Consumer stage for consumer {}", consumer);
        let request = self.consumer.request(self.consumer_args.clone());
        let (handle, location) = self.driver.execute(&request).await?;

        let observation = match fetch_indeterminate(self.fetcher.as_ref(), &location).await {
            Some(document) => consumer_observation(&document),
            None => {
                warn!("Consumer result unavailable; comparison skipped");
                ConsumerObservation {
                    digest: None,
                    source: None,
                    preview: None,
                }
            }
        };

        let legacy_result_shape = observation.source == Some(DigestSource::Legacy);
        if legacy_result_shape {
            info!("Consumer task {} used the legacy generatedSecret field", handle.task_id);
        }
        if let Some(ref preview) = observation.preview {
            info!("Consumer preview: {}", redact_preview(preview));
        }

        let verification = VerificationResult::new(
            Some(outcome.digest().clone()),
            observation.digest,
            outcome.is_reuse,
        );

        if verification.matched {
            info!(
                "Consumer {} received the provisioned secret (reuse: {})",
                consumer, verification.is_reuse
            );
        } else {
            warn!(
                "Verification failed for {}: {}",
                consumer,
                verification
                    .reason
                    .map(|r| r.to_string())
                    .unwrap_or_default()
            );
        }

        Ok(RunReport {
            consumer: consumer.to_string(),
            verification,
            consumer_task: handle,
            legacy_result_shape,
            caveat: outcome.caveat,
        })
    }
}
