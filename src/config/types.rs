use super::defaults::*;
use crate::error::{Error, Result};
use crate::execution::{ExecutionTemplate, PollPolicy};
use crate::infra::Credential;
use crate::secrets::SecretType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Submission endpoint.
    pub rpc_url: Option<String>,
    /// Secret store endpoint.
    pub sms_url: Option<String>,
    /// Offer and task status endpoint.
    pub discovery_url: Option<String>,
    pub result_gateway_url: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: None,
            sms_url: None,
            discovery_url: None,
            result_gateway_url: None,
        }
    }
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

/// The four endpoints, all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub rpc_url: String,
    pub store_url: String,
    pub discovery_url: String,
    pub result_gateway_url: String,
}

impl NetworkConfig {
    pub fn endpoints(&self) -> Result<Endpoints> {
        fn required(value: &Option<String>, path: &str) -> Result<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or_else(|| Error::Configuration(format!("{path} is not set")))
        }

        Ok(Endpoints {
            rpc_url: required(&self.rpc_url, "network.rpcUrl")?,
            store_url: required(&self.sms_url, "network.smsUrl")?,
            discovery_url: required(&self.discovery_url, "network.discoveryUrl")?,
            result_gateway_url: required(&self.result_gateway_url, "network.resultGatewayUrl")?,
        })
    }
}

// ============================================================================
// Execution
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionConfig {
    pub category: u32,
    pub price_ceiling: u64,
    pub tags: Vec<String>,
    /// Program that reads the secret from the store and reports its digest.
    pub producer_app: Option<String>,
    /// Program that receives the secret and reports what it saw.
    pub consumer_app: Option<String>,
    pub consumer_args: String,
    pub result_member: String,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_max_interval_ms: u64,
    pub backoff_factor: f64,
    pub max_wait_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY,
            price_ceiling: DEFAULT_PRICE_CEILING,
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            producer_app: None,
            consumer_app: None,
            consumer_args: DEFAULT_CONSUMER_ARGS.to_string(),
            result_member: RESULT_MEMBER.to_string(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_max_interval_ms: DEFAULT_POLL_MAX_INTERVAL_MS,
            backoff_factor: DEFAULT_POLL_BACKOFF_FACTOR,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
        }
    }
}

impl ExecutionConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            interval_seed: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.poll_max_interval_ms),
            backoff_factor: self.backoff_factor,
            max_wait: Duration::from_millis(self.max_wait_ms),
        }
    }

    /// Normalized tag set: trimmed, lowercased, blanks dropped.
    pub fn tag_set(&self) -> BTreeSet<String> {
        self.tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn producer_template(&self) -> Result<ExecutionTemplate> {
        self.template(self.producer_app.as_deref(), "execution.producerApp")
    }

    pub fn consumer_template(&self) -> Result<ExecutionTemplate> {
        self.template(self.consumer_app.as_deref(), "execution.consumerApp")
    }

    fn template(&self, program: Option<&str>, path: &str) -> Result<ExecutionTemplate> {
        let program = program
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Configuration(format!("{path} is not set")))?;
        Ok(ExecutionTemplate {
            program_identity: program.to_string(),
            category: self.category,
            price_ceiling: self.price_ceiling,
            tags: self.tag_set(),
        })
    }
}

// ============================================================================
// Secret
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretConfig {
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub label: String,
    /// Replace a secret that is already in the store instead of keeping it.
    pub allow_overwrite: bool,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            secret_type: SecretType::default(),
            label: DEFAULT_SECRET_LABEL.to_string(),
            allow_overwrite: false,
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Signing keys. Read from file or environment, never written back.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialsConfig {
    pub operator_key: Option<String>,
    /// Must differ from the operator key.
    pub store_key: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("CredentialsConfig")
            .field("operator_key", &shown(&self.operator_key))
            .field("store_key", &shown(&self.store_key))
            .finish()
    }
}

/// Both credentials, checked.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub operator: Credential,
    pub store: Credential,
}

impl CredentialsConfig {
    pub fn resolve(&self) -> Result<Credentials> {
        let operator = Credential::new(self.operator_key.clone().unwrap_or_default())
            .map_err(|_| Error::Configuration("credentials.operatorKey is not set".into()))?;
        let store = Credential::new(self.store_key.clone().unwrap_or_default())
            .map_err(|_| Error::Configuration("credentials.storeKey is not set".into()))?;
        if operator.same_key(&store) {
            return Err(Error::Configuration(
                "credentials.storeKey must differ from credentials.operatorKey".into(),
            ));
        }
        Ok(Credentials { operator, store })
    }
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub json: bool,
}
