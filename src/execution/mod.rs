//! Remote execution: submission, status polling, result location.

mod driver;
mod http;
mod types;

pub use driver::{PollPolicy, TaskDriver};
pub use http::{HttpMarketplace, HttpStatusFeed, Offer};
pub use types::{
    ExecutionHandle, ExecutionRequest, ExecutionTemplate, FeedError, PollOutcome, ResultLocation,
    StatusEvent, TaskStatus,
};

use crate::error::Result;
use async_trait::async_trait;

/// Matches a request with a compute offer and creates the deal.
#[async_trait]
pub trait ExecutionSubmitter: Send + Sync {
    /// Errors: `NoOfferAvailable` when no offer covers the request,
    /// `Submission` for anything else. Never retried.
    async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionHandle>;
}

/// Status source for submitted tasks.
#[async_trait]
pub trait StatusFeed: Send + Sync {
    /// The latest observation for `handle`.
    async fn next_event(
        &self,
        handle: &ExecutionHandle,
    ) -> std::result::Result<StatusEvent, FeedError>;
}
