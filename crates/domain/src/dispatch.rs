use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use permset_core::{AppError, AppResult, PhysicalResourceId};
use serde::{Deserialize, Serialize};

use crate::operation::AssignmentOperation;

/// Upper bound on concurrently running workflow executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcurrencyLimit(u32);

impl ConcurrencyLimit {
    /// Creates a validated limit of at least one execution.
    pub fn new(value: u32) -> AppResult<Self> {
        if value == 0 {
            return Err(AppError::Validation(
                "concurrency limit must be at least 1".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the raw limit.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self(1)
    }
}

/// Inclusive window of seconds a failed message waits before redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequeueDelayWindow {
    min_seconds: u32,
    max_seconds: u32,
}

impl RequeueDelayWindow {
    /// Returns the window as a range.
    #[must_use]
    pub fn range(&self) -> RangeInclusive<u32> {
        self.min_seconds..=self.max_seconds
    }

    /// Returns whether a delay lies inside the window.
    #[must_use]
    pub fn contains(&self, seconds: u32) -> bool {
        self.range().contains(&seconds)
    }
}

impl Default for RequeueDelayWindow {
    fn default() -> Self {
        Self {
            min_seconds: 15,
            max_seconds: 120,
        }
    }
}

/// Work item carried through the FIFO queue and into the workflow executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    /// Operations the workflow executes.
    pub inputs: Vec<AssignmentOperation>,
    /// Custom resource the operations belong to.
    pub physical_resource_id: PhysicalResourceId,
    /// CloudFormation request that produced the operations.
    pub request_id: String,
}

impl QueueMessage {
    /// Parses a queue message body.
    pub fn from_body(body: &str) -> AppResult<Self> {
        serde_json::from_str(body)
            .map_err(|error| AppError::Validation(format!("invalid queue message body: {error}")))
    }

    /// Serializes the message to a queue body.
    pub fn to_body(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|error| {
            AppError::Internal(format!("failed to serialize queue message: {error}"))
        })
    }
}

/// Workflow execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Execution is in progress.
    Running,
    /// Execution finished successfully.
    Succeeded,
    /// Execution failed.
    Failed,
    /// Execution exceeded its timeout.
    TimedOut,
    /// Execution was stopped.
    Aborted,
    /// Execution is waiting to be redriven.
    PendingRedrive,
}

impl ExecutionStatus {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Aborted => "ABORTED",
            Self::PendingRedrive => "PENDING_REDRIVE",
        }
    }

    /// Parses a wire value into an execution status.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "RUNNING" => Ok(Self::Running),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "FAILED" => Ok(Self::Failed),
            "TIMED_OUT" => Ok(Self::TimedOut),
            "ABORTED" => Ok(Self::Aborted),
            "PENDING_REDRIVE" => Ok(Self::PendingRedrive),
            _ => Err(AppError::Validation(format!(
                "unknown execution status '{value}'"
            ))),
        }
    }

    /// Returns whether the execution finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Aborted
        )
    }

    /// Returns whether the execution finished successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl Display for ExecutionStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Status change detail published when an execution reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotification {
    /// Execution that changed state.
    pub execution_arn: String,
    /// New execution status.
    pub status: ExecutionStatus,
    /// JSON input the execution was started with.
    #[serde(default)]
    pub input: Option<String>,
    /// Error name for failed executions.
    #[serde(default)]
    pub error: Option<String>,
    /// Error cause for failed executions.
    #[serde(default)]
    pub cause: Option<String>,
}

impl CompletionNotification {
    /// Parses a notification message body.
    pub fn from_message(message: &str) -> AppResult<Self> {
        serde_json::from_str(message).map_err(|error| {
            AppError::Validation(format!("invalid completion notification: {error}"))
        })
    }

    /// Returns the queue message the execution was started with.
    pub fn original_message(&self) -> AppResult<QueueMessage> {
        let input = self.input.as_deref().ok_or_else(|| {
            AppError::Validation(format!(
                "execution '{}' notification carries no input",
                self.execution_arn
            ))
        })?;

        QueueMessage::from_body(input)
    }
}

/// Current state of a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionDescription {
    /// Execution status.
    pub status: ExecutionStatus,
    /// Error name when failed.
    pub error: Option<String>,
    /// Error cause when failed.
    pub cause: Option<String>,
}

/// Mapping from a custom resource to the execution its latest request started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    /// Custom resource identity.
    pub physical_resource_id: PhysicalResourceId,
    /// Started execution.
    pub execution_arn: String,
    /// Request that enqueued the work.
    pub request_id: String,
    /// Time the execution was recorded.
    pub recorded_at: DateTime<Utc>,
}
