use super::types::{ExecutionHandle, ExecutionRequest, FeedError, ResultLocation, StatusEvent, TaskStatus};
use super::{ExecutionSubmitter, StatusFeed};
use crate::error::{Error, Result};
use crate::infra::Credential;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

// ============================================================================
// Wire Types
// ============================================================================

/// A compute-provider offer as listed by the discovery service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub offer_id: String,
    pub price: u64,
    pub category: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    offers: Vec<Offer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DealRequest<'a> {
    chain_id: u64,
    offer_id: &'a str,
    #[serde(flatten)]
    request: &'a ExecutionRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealResponse {
    deal_id: String,
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct TaskView {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Option<TaskResults>,
}

#[derive(Debug, Deserialize)]
struct TaskResults {
    #[serde(default)]
    location: Option<String>,
}

// ============================================================================
// Marketplace (submission boundary)
// ============================================================================

/// Finds an offer on the discovery service and creates a deal through the
/// RPC relay, signing the deal request with the operator credential.
pub struct HttpMarketplace {
    discovery_url: String,
    rpc_url: String,
    chain_id: u64,
    operator: Credential,
    client: Client,
}

impl HttpMarketplace {
    pub fn new(discovery_url: String, rpc_url: String, chain_id: u64, operator: Credential) -> Self {
        Self {
            discovery_url,
            rpc_url,
            chain_id,
            operator,
            client: Client::new(),
        }
    }

    async fn fetch_offers(&self, request: &ExecutionRequest) -> Result<Vec<Offer>> {
        let url = format!("{}/offers", self.discovery_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("chainId", self.chain_id.to_string()),
                ("category", request.category.to_string()),
                ("tags", request.tag_list()),
            ])
            .send()
            .await
            .map_err(|e| Error::Submission(format!("offer discovery failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Submission(format!(
                "offer discovery returned {status}: {text}"
            )));
        }

        let body: OffersResponse = resp
            .json()
            .await
            .map_err(|e| Error::Submission(format!("unreadable offer list: {e}")))?;
        Ok(body.offers)
    }
}

/// The cheapest offer that matches the category, covers every requested tag
/// and stays within the price ceiling.
pub(crate) fn select_offer<'a>(offers: &'a [Offer], request: &ExecutionRequest) -> Option<&'a Offer> {
    offers
        .iter()
        .filter(|o| o.category == request.category)
        .filter(|o| o.price <= request.price_ceiling)
        .filter(|o| {
            let offered: BTreeSet<String> = o.tags.iter().map(|t| normalize_tag(t)).collect();
            request.tags.iter().all(|t| offered.contains(&normalize_tag(t)))
        })
        .min_by_key(|o| o.price)
}

/// Tags compare trimmed and case-insensitively on both sides.
fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

#[async_trait]
impl ExecutionSubmitter for HttpMarketplace {
    async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionHandle> {
        let offers = self.fetch_offers(request).await?;
        let offer = select_offer(&offers, request).ok_or_else(|| Error::NoOfferAvailable {
            tags: request.tag_list(),
        })?;
        debug!(
            "Selected offer {} at price {} out of {} listed",
            offer.offer_id,
            offer.price,
            offers.len()
        );

        let body = serde_json::to_string(&DealRequest {
            chain_id: self.chain_id,
            offer_id: &offer.offer_id,
            request,
        })
        .map_err(|e| Error::Submission(format!("encode deal request: {e}")))?;
        let signature = self.operator.sign(body.as_bytes())?;

        let url = format!("{}/deals", self.rpc_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-Signature", signature)
            .header("X-Key-Id", self.operator.key_id())
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Submission(format!("deal request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Submission(format!("deal rejected ({status}): {text}")));
        }

        let deal: DealResponse = resp
            .json()
            .await
            .map_err(|e| Error::Submission(format!("unreadable deal response: {e}")))?;
        info!("Deal {} created on offer {}", deal.deal_id, offer.offer_id);

        Ok(ExecutionHandle {
            deal_id: deal.deal_id,
            task_id: deal.task_id,
        })
    }
}

// ============================================================================
// Status Feed
// ============================================================================

/// Polls `GET {discovery}/tasks/{taskId}`.
pub struct HttpStatusFeed {
    discovery_url: String,
    client: Client,
}

impl HttpStatusFeed {
    pub fn new(discovery_url: String) -> Self {
        Self {
            discovery_url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl StatusFeed for HttpStatusFeed {
    async fn next_event(
        &self,
        handle: &ExecutionHandle,
    ) -> std::result::Result<StatusEvent, FeedError> {
        let url = format!(
            "{}/tasks/{}",
            self.discovery_url.trim_end_matches('/'),
            handle.task_id
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Other(format!("status request failed: {e}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(FeedError::NotFound),
            s if !s.is_success() => {
                return Err(FeedError::Other(format!("status feed returned {s}")));
            }
            _ => {}
        }

        let view: TaskView = resp
            .json()
            .await
            .map_err(|e| FeedError::Other(format!("unreadable task status: {e}")))?;

        let status = TaskStatus::from_remote(&view.status)
            .ok_or_else(|| FeedError::Other(format!("unrecognized task status '{}'", view.status)))?;

        Ok(StatusEvent {
            message: view.message.unwrap_or_default(),
            status,
            result: view
                .results
                .and_then(|r| r.location)
                .filter(|l| !l.trim().is_empty())
                .map(ResultLocation),
        })
    }
}
