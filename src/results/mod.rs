//! Retrieval and decoding of task results.

mod fetcher;
pub mod report;

pub use fetcher::{extract_json_member, HttpResultFetcher};
pub use report::{consumer_observation, producer_digest, ConsumerObservation, DigestSource};

use crate::error::Result;
use crate::execution::ResultLocation;
use async_trait::async_trait;
use tracing::warn;

/// Retrieves the structured output of a completed execution.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    /// Errors: `ResultUnavailable` on transport failure, `ResultMalformed`
    /// when the archive or its JSON member cannot be read.
    async fn fetch(&self, location: &ResultLocation) -> Result<serde_json::Value>;
}

/// Fetch, degrading any failure to `None` ("result indeterminate"). The
/// caller decides whether that is fatal.
pub async fn fetch_indeterminate(
    fetcher: &dyn ResultFetcher,
    location: &ResultLocation,
) -> Option<serde_json::Value> {
    match fetcher.fetch(location).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Result at {} is indeterminate: {}", location, e);
            None
        }
    }
}
