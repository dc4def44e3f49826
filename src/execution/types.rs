//! Execution request, handle and status types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Request / Handle
// ============================================================================

/// One unit of remote work. Built per run and consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub program_identity: String,
    pub argument_string: String,
    pub category: u32,
    pub price_ceiling: u64,
    /// Capability requirements, e.g. the trusted-execution tag.
    pub tags: BTreeSet<String>,
}

impl ExecutionRequest {
    /// `consumer,label,type` as understood by the provisioning agent.
    pub fn producer_arguments(consumer: &str, label: &str, secret_type: &str) -> String {
        format!("{consumer},{label},{secret_type}")
    }

    pub fn tag_list(&self) -> String {
        self.tags.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// The fixed part of an execution request; arguments vary per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTemplate {
    pub program_identity: String,
    pub category: u32,
    pub price_ceiling: u64,
    pub tags: BTreeSet<String>,
}

impl ExecutionTemplate {
    pub fn request(&self, argument_string: impl Into<String>) -> ExecutionRequest {
        ExecutionRequest {
            program_identity: self.program_identity.clone(),
            argument_string: argument_string.into(),
            category: self.category,
            price_ceiling: self.price_ceiling,
            tags: self.tags.clone(),
        }
    }
}

/// Returned by the substrate once a request was matched and accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHandle {
    pub deal_id: String,
    pub task_id: String,
}

/// Where a completed task's result archive can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultLocation(pub String);

impl ResultLocation {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Task Status
// ============================================================================

/// Lifecycle of a remote task. Progression is monotone and the last three
/// variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Submitted,
    Active,
    Completed,
    Failed,
    #[serde(rename = "TIMEDOUT")]
    TimedOut,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::TimedOut
        )
    }

    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Submitted => 0,
            TaskStatus::Active => 1,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::TimedOut => 2,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    /// Map a status name reported by the substrate.
    pub fn from_remote(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "UNSET" | "SUBMITTED" | "PENDING" => Some(TaskStatus::Submitted),
            "ACTIVE" | "REVEALING" | "RUNNING" => Some(TaskStatus::Active),
            "COMPLETED" => Some(TaskStatus::Completed),
            // FAILLED is how some substrates spell it.
            "FAILED" | "FAILLED" => Some(TaskStatus::Failed),
            "TIMEOUT" | "TIMEDOUT" | "TIMED_OUT" => Some(TaskStatus::TimedOut),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Active => "ACTIVE",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::TimedOut => "TIMEDOUT",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Status Feed Types
// ============================================================================

/// One observation from the status feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub message: String,
    pub status: TaskStatus,
    /// Present once the task completed.
    pub result: Option<ResultLocation>,
}

impl StatusEvent {
    pub fn new(status: TaskStatus, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            result: None,
        }
    }

    pub fn completed(location: impl Into<String>) -> Self {
        Self {
            message: "task completed".into(),
            status: TaskStatus::Completed,
            result: Some(ResultLocation(location.into())),
        }
    }
}

/// Failure of a single feed query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// The task is not yet known to the feed.
    #[error("task not found yet")]
    NotFound,
    #[error("{0}")]
    Other(String),
}

/// Result of one poll iteration, after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Pending(TaskStatus),
    Terminal(TaskStatus, Option<ResultLocation>),
    TransientError(FeedError),
}

impl PollOutcome {
    /// The transition table for a single feed answer.
    ///
    /// | feed answer              | outcome             |
    /// |--------------------------|---------------------|
    /// | event, non-terminal      | `Pending`           |
    /// | event, terminal          | `Terminal`          |
    /// | any feed error           | `TransientError`    |
    ///
    /// No feed error ends the wait; only a terminal status or the wait
    /// budget does.
    pub fn classify(answer: Result<StatusEvent, FeedError>) -> Self {
        match answer {
            Ok(event) if event.status.is_terminal() => {
                PollOutcome::Terminal(event.status, event.result)
            }
            Ok(event) => PollOutcome::Pending(event.status),
            Err(err) => PollOutcome::TransientError(err),
        }
    }
}
