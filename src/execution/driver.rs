//! Poll-loop driver for remote executions.
//!
//! `SUBMITTED → ACTIVE → {COMPLETED | FAILED | TIMEDOUT}`. Polling starts
//! after a settling delay, swallows feed errors, and ends only on a terminal
//! status or when the wait budget runs out. Submission is attempted once.

use super::types::{
    ExecutionHandle, ExecutionRequest, FeedError, PollOutcome, ResultLocation, TaskStatus,
};
use super::{ExecutionSubmitter, StatusFeed};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Timing for a single wait.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay between submission and the first poll.
    pub settle_delay: Duration,
    /// First interval between polls.
    pub interval_seed: Duration,
    /// Upper bound for the interval. Never below `interval_seed`.
    pub max_interval: Duration,
    /// Growth applied to the interval after each poll. Values below 1.0 are
    /// treated as 1.0.
    pub backoff_factor: f64,
    /// Total polling budget, measured after the settling delay.
    pub max_wait: Duration,
}

impl PollPolicy {
    /// Interval to sleep after `current`, grown by the backoff factor and
    /// kept within `[interval_seed, max_interval]`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let cap = self.max_interval.max(self.interval_seed);
        let grown = if self.backoff_factor > 1.0 {
            Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
                .unwrap_or(cap)
        } else {
            current
        };
        grown.clamp(self.interval_seed, cap)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        use crate::config::{
            DEFAULT_MAX_WAIT_MS, DEFAULT_POLL_BACKOFF_FACTOR, DEFAULT_POLL_INTERVAL_MS,
            DEFAULT_POLL_MAX_INTERVAL_MS, DEFAULT_SETTLE_DELAY_MS,
        };
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            interval_seed: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_interval: Duration::from_millis(DEFAULT_POLL_MAX_INTERVAL_MS),
            backoff_factor: DEFAULT_POLL_BACKOFF_FACTOR,
            max_wait: Duration::from_millis(DEFAULT_MAX_WAIT_MS),
        }
    }
}

/// Submits executions and waits for them to finish.
#[derive(Clone)]
pub struct TaskDriver {
    submitter: Arc<dyn ExecutionSubmitter>,
    feed: Arc<dyn StatusFeed>,
    policy: PollPolicy,
}

impl TaskDriver {
    pub fn new(
        submitter: Arc<dyn ExecutionSubmitter>,
        feed: Arc<dyn StatusFeed>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            submitter,
            feed,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit `request` once. Failure is surfaced immediately.
    pub async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionHandle> {
        info!(
            "Submitting execution of {} (category {}, tags [{}])",
            request.program_identity,
            request.category,
            request.tag_list()
        );
        match self.submitter.submit(request).await {
            Ok(handle) => {
                info!("Deal {} accepted, task {}", handle.deal_id, handle.task_id);
                Ok(handle)
            }
            Err(e) => {
                error!("Submission of {} failed: {}", request.program_identity, e);
                Err(e)
            }
        }
    }

    /// Wait for `handle` to reach a terminal status using the driver's policy.
    pub async fn wait(&self, handle: &ExecutionHandle) -> Result<ResultLocation> {
        self.wait_with(handle, &self.policy).await
    }

    /// Wait for `handle` to reach a terminal status.
    ///
    /// Returns the result location on `COMPLETED`; fails with
    /// `ExecutionFailed` on `FAILED`/`TIMEDOUT` and `WaitTimeout` when
    /// `policy.max_wait` elapses first.
    pub async fn wait_with(
        &self,
        handle: &ExecutionHandle,
        policy: &PollPolicy,
    ) -> Result<ResultLocation> {
        let task_id = handle.task_id.as_str();

        debug!(
            "Letting task {} settle for {:?} before polling",
            task_id, policy.settle_delay
        );
        tokio::time::sleep(policy.settle_delay).await;

        let started = Instant::now();
        let deadline = started + policy.max_wait;
        let mut current = TaskStatus::Submitted;
        let mut interval = policy.interval_seed;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(wait_timeout(task_id, started.elapsed()));
            }

            // A hanging feed call must not outlive the wait budget.
            let answer = match tokio::time::timeout(remaining, self.feed.next_event(handle)).await
            {
                Ok(answer) => answer,
                Err(_) => return Err(wait_timeout(task_id, started.elapsed())),
            };

            match PollOutcome::classify(answer) {
                PollOutcome::Pending(observed) => {
                    current = advance(task_id, current, observed);
                }
                PollOutcome::Terminal(TaskStatus::Completed, Some(location)) => {
                    info!("Task {} completed, result at {}", task_id, location);
                    return Ok(location);
                }
                PollOutcome::Terminal(TaskStatus::Completed, None) => {
                    return Err(Error::ResultUnavailable(format!(
                        "task {task_id} completed without a result location"
                    )));
                }
                PollOutcome::Terminal(status, _) => {
                    error!("Task {} ended with status {}", task_id, status);
                    return Err(Error::ExecutionFailed {
                        task_id: task_id.to_string(),
                        status,
                    });
                }
                PollOutcome::TransientError(FeedError::NotFound) => {
                    debug!("Task {} not visible on the status feed yet", task_id);
                }
                PollOutcome::TransientError(FeedError::Other(msg)) => {
                    warn!("Status feed error for task {}: {}", task_id, msg);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(wait_timeout(task_id, started.elapsed()));
            }
            tokio::time::sleep(interval.min(remaining)).await;
            interval = policy.next_interval(interval);
        }
    }

    /// Submit and wait with the driver's policy.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<(ExecutionHandle, ResultLocation)> {
        let handle = self.submit(request).await?;
        let location = self.wait(&handle).await?;
        Ok((handle, location))
    }
}

/// Apply an observed non-terminal status, ignoring regressions.
fn advance(task_id: &str, current: TaskStatus, observed: TaskStatus) -> TaskStatus {
    if current.can_advance_to(observed) {
        info!("Task {} is now {}", task_id, observed);
        observed
    } else {
        if observed != current {
            debug!(
                "Ignoring status {} for task {} (already {})",
                observed, task_id, current
            );
        }
        current
    }
}

fn wait_timeout(task_id: &str, waited: Duration) -> Error {
    warn!(
        "Gave up waiting for task {} after {:?}; the remote execution keeps running",
        task_id, waited
    );
    Error::WaitTimeout {
        task_id: task_id.to_string(),
        waited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::StatusEvent;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct FixedSubmitter(Result<ExecutionHandle>);

    #[async_trait]
    impl ExecutionSubmitter for FixedSubmitter {
        async fn submit(&self, _request: &ExecutionRequest) -> Result<ExecutionHandle> {
            match &self.0 {
                Ok(h) => Ok(h.clone()),
                Err(e) => Err(Error::Submission(e.to_string())),
            }
        }
    }

    /// Replays scripted answers, then repeats the fallback forever.
    struct ScriptFeed {
        script: Mutex<VecDeque<std::result::Result<StatusEvent, FeedError>>>,
        fallback: std::result::Result<StatusEvent, FeedError>,
        calls: Mutex<usize>,
    }

    impl ScriptFeed {
        fn new(
            script: Vec<std::result::Result<StatusEvent, FeedError>>,
            fallback: std::result::Result<StatusEvent, FeedError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusFeed for ScriptFeed {
        async fn next_event(
            &self,
            _handle: &ExecutionHandle,
        ) -> std::result::Result<StatusEvent, FeedError> {
            *self.calls.lock() += 1;
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    struct HangingFeed;

    #[async_trait]
    impl StatusFeed for HangingFeed {
        async fn next_event(
            &self,
            _handle: &ExecutionHandle,
        ) -> std::result::Result<StatusEvent, FeedError> {
            std::future::pending().await
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            settle_delay: Duration::from_millis(1),
            interval_seed: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            backoff_factor: 2.0,
            max_wait: Duration::from_millis(200),
        }
    }

    fn handle() -> ExecutionHandle {
        ExecutionHandle {
            deal_id: "0xdeal".into(),
            task_id: "0xtask".into(),
        }
    }

    fn driver(feed: Arc<dyn StatusFeed>) -> TaskDriver {
        TaskDriver::new(
            Arc::new(FixedSubmitter(Ok(handle()))),
            feed,
            fast_policy(),
        )
    }

    #[tokio::test]
    async fn active_then_completed_returns_location() {
        let feed = Arc::new(ScriptFeed::new(
            vec![
                Err(FeedError::NotFound),
                Ok(StatusEvent::new(TaskStatus::Active, "running")),
                Ok(StatusEvent::completed("/ipfs/QmResult")),
            ],
            Err(FeedError::Other("unreachable".into())),
        ));
        let location = driver(feed.clone()).wait(&handle()).await.unwrap();
        assert_eq!(location.as_str(), "/ipfs/QmResult");
        assert_eq!(*feed.calls.lock(), 3);
    }

    #[tokio::test]
    async fn failed_status_raises_execution_failed() {
        let feed = Arc::new(ScriptFeed::new(
            vec![Ok(StatusEvent::new(TaskStatus::Active, "running"))],
            Ok(StatusEvent::new(TaskStatus::Failed, "app crashed")),
        ));
        let err = driver(feed).wait(&handle()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ExecutionFailed {
                status: TaskStatus::Failed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn timedout_status_raises_execution_failed() {
        let feed = Arc::new(ScriptFeed::new(
            vec![],
            Ok(StatusEvent::new(TaskStatus::TimedOut, "deadline reached")),
        ));
        let err = driver(feed).wait(&handle()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ExecutionFailed {
                status: TaskStatus::TimedOut,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn silent_feed_times_out() {
        let feed = Arc::new(ScriptFeed::new(vec![], Err(FeedError::NotFound)));
        let err = driver(feed.clone()).wait(&handle()).await.unwrap_err();
        assert!(matches!(err, Error::WaitTimeout { .. }));
        assert!(*feed.calls.lock() > 1);
    }

    #[tokio::test]
    async fn hanging_feed_is_bounded_by_max_wait() {
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            driver(Arc::new(HangingFeed)).wait(&handle()),
        )
        .await
        .expect("driver must give up on its own");
        assert!(matches!(result, Err(Error::WaitTimeout { .. })));
    }

    #[tokio::test]
    async fn feed_errors_do_not_abort_polling() {
        let feed = Arc::new(ScriptFeed::new(
            vec![
                Err(FeedError::Other("502 bad gateway".into())),
                Err(FeedError::Other("connection reset".into())),
                Ok(StatusEvent::completed("/ipfs/QmOk")),
            ],
            Err(FeedError::NotFound),
        ));
        assert!(driver(feed).wait(&handle()).await.is_ok());
    }

    #[tokio::test]
    async fn completed_without_location_is_result_unavailable() {
        let feed = Arc::new(ScriptFeed::new(
            vec![],
            Ok(StatusEvent::new(TaskStatus::Completed, "done")),
        ));
        let err = driver(feed).wait(&handle()).await.unwrap_err();
        assert!(matches!(err, Error::ResultUnavailable(_)));
    }

    #[tokio::test]
    async fn submission_failure_is_surfaced() {
        let driver = TaskDriver::new(
            Arc::new(FixedSubmitter(Err(Error::Submission("rejected".into())))),
            Arc::new(ScriptFeed::new(vec![], Err(FeedError::NotFound))),
            fast_policy(),
        );
        let request = ExecutionRequest {
            program_identity: "0xapp".into(),
            argument_string: String::new(),
            category: 0,
            price_ceiling: 0,
            tags: Default::default(),
        };
        assert!(matches!(
            driver.execute(&request).await,
            Err(Error::Submission(_))
        ));
    }

    #[test]
    fn regressions_are_ignored() {
        assert_eq!(
            advance("t", TaskStatus::Active, TaskStatus::Submitted),
            TaskStatus::Active
        );
        assert_eq!(
            advance("t", TaskStatus::Submitted, TaskStatus::Active),
            TaskStatus::Active
        );
    }

    #[test]
    fn interval_grows_to_cap() {
        let policy = fast_policy();
        let mut interval = policy.interval_seed;
        for _ in 0..10 {
            interval = policy.next_interval(interval);
        }
        assert_eq!(interval, policy.max_interval);

        let flat = PollPolicy {
            backoff_factor: 0.5,
            ..fast_policy()
        };
        assert_eq!(
            flat.next_interval(Duration::from_millis(2)),
            Duration::from_millis(2)
        );
    }

    #[test]
    fn huge_backoff_saturates_at_cap() {
        let policy = PollPolicy {
            max_interval: Duration::from_secs(30),
            backoff_factor: 1e30,
            ..fast_policy()
        };
        assert_eq!(
            policy.next_interval(Duration::from_secs(30)),
            Duration::from_secs(30)
        );
        let infinite = PollPolicy {
            backoff_factor: f64::INFINITY,
            ..policy
        };
        assert_eq!(
            infinite.next_interval(Duration::from_secs(1)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn interval_never_drops_below_seed() {
        let policy = PollPolicy {
            interval_seed: Duration::from_millis(5),
            max_interval: Duration::ZERO,
            ..fast_policy()
        };
        assert_eq!(
            policy.next_interval(Duration::from_millis(5)),
            Duration::from_millis(5)
        );
        assert_eq!(policy.next_interval(Duration::ZERO), Duration::from_millis(5));
    }

    #[tokio::test]
    async fn zero_cap_does_not_spin_the_feed() {
        let feed = Arc::new(ScriptFeed::new(vec![], Err(FeedError::NotFound)));
        let policy = PollPolicy {
            settle_delay: Duration::from_millis(1),
            interval_seed: Duration::from_millis(20),
            max_interval: Duration::ZERO,
            backoff_factor: 2.0,
            max_wait: Duration::from_millis(200),
        };
        let driver = TaskDriver::new(Arc::new(FixedSubmitter(Ok(handle()))), feed.clone(), policy);
        let err = driver.wait(&handle()).await.unwrap_err();
        assert!(matches!(err, Error::WaitTimeout { .. }));
        // One call per 20 ms interval at most, plus the first poll.
        assert!(*feed.calls.lock() <= 12, "feed called {} times", *feed.calls.lock());
    }
}
