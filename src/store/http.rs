use super::{validate_address, SecretStore};
use crate::error::{Error, Result};
use crate::infra::Credential;
use crate::secrets::{Digest, SecretValue};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

/// Secret store client speaking the `/requesters/{address}/secrets/{label}`
/// HTTP API.
pub struct HttpSecretStore {
    base_url: String,
    label: String,
    credential: Credential,
    allow_overwrite: bool,
    client: Client,
}

impl HttpSecretStore {
    pub fn new(
        base_url: String,
        label: String,
        credential: Credential,
        allow_overwrite: bool,
    ) -> Self {
        Self {
            base_url,
            label,
            credential,
            allow_overwrite,
            client: Client::new(),
        }
    }

    fn secret_url(&self, consumer: &str) -> String {
        format!(
            "{}/requesters/{}/secrets/{}",
            self.base_url.trim_end_matches('/'),
            consumer,
            self.label
        )
    }

    /// The store verifies `consumer:label:sha256(value)` signed with the
    /// dedicated store credential.
    fn authorization(&self, consumer: &str, value: &SecretValue) -> Result<String> {
        let digest = Digest::of(value.expose().as_bytes());
        let payload = format!("{}:{}:{}", consumer.to_ascii_lowercase(), self.label, digest);
        self.credential.sign(payload.as_bytes())
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn push(&self, consumer: &str, value: &SecretValue) -> Result<bool> {
        validate_address(consumer)?;

        let url = self.secret_url(consumer);
        let signature = self.authorization(consumer, value)?;

        let req = if self.allow_overwrite {
            self.client.put(&url)
        } else {
            self.client.post(&url)
        };

        debug!(
            "Pushing secret '{}' for {} with store key {}",
            self.label,
            consumer,
            self.credential.key_id()
        );

        let resp = req
            .header("Authorization", signature)
            .header("X-Key-Id", self.credential.key_id())
            .header("Content-Type", "text/plain")
            .body(value.expose().to_string())
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            info!("Secret '{}' pushed for consumer {}", self.label, consumer);
            return Ok(true);
        }

        let text = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::CONFLICT => {
                warn!(
                    "Store already holds secret '{}' for {} and overwrite is disabled",
                    self.label, consumer
                );
                Err(Error::AlreadyProvisioned {
                    consumer: consumer.to_string(),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                debug!("Store rejected identity {}: {}", consumer, text);
                Err(Error::InvalidIdentity(consumer.to_string()))
            }
            _ => Err(Error::StoreUnavailable(format!(
                "store returned {status}: {text}"
            ))),
        }
    }
}
