use std::sync::Arc;

use chrono::Utc;
use permset_core::{AppError, AppResult};
use permset_domain::{
    CompletionNotification, ConcurrencyLimit, ExecutionRecord, QueueMessage, RequeueDelayWindow,
};
use rand::Rng;
use tracing::{error, info, warn};

use crate::dispatch_ports::{
    ConcurrencyCounterStore, ExecutionRecordStore, WorkQueue, WorkflowExecutor,
};

mod admit;
mod release;

/// Settings for one gated workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Workflow identifier, also used as the counter key.
    pub workflow_id: String,
    /// Maximum concurrently running executions.
    pub limit: ConcurrencyLimit,
    /// Sends failed work back to the work queue instead of the dead-letter queue.
    pub requeue_on_failure: bool,
    /// Delay window used when requeueing.
    pub requeue_delay: RequeueDelayWindow,
}

impl DispatcherConfig {
    /// Creates a config with a limit of one and failures dead-lettered.
    #[must_use]
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            limit: ConcurrencyLimit::default(),
            requeue_on_failure: false,
            requeue_delay: RequeueDelayWindow::default(),
        }
    }
}

/// One message received from the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Queue-assigned message id.
    pub message_id: String,
    /// Raw message body.
    pub body: String,
}

/// Result of admitting one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// A slot was reserved and the execution started.
    Started {
        /// Started execution.
        execution_arn: String,
    },
    /// Every slot is taken; the message must be redelivered later.
    AtCapacity,
}

/// Result of admitting a batch of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmitBatchReport {
    /// Executions started in this batch.
    pub started_execution_arns: Vec<String>,
    /// Message ids the queue must redeliver.
    pub failed_message_ids: Vec<String>,
}

/// Result of handling one completion notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Slot released after a successful execution.
    Released,
    /// Slot released and the work sent back to the work queue.
    Requeued {
        /// Delivery delay in seconds.
        delay_seconds: u32,
    },
    /// Slot released and the work sent to the dead-letter queue.
    DeadLettered,
    /// Slot released but the work could not be rerouted.
    RerouteFailed {
        /// Failure description.
        reason: String,
    },
    /// Counter already at zero; nothing released or rerouted.
    AlreadyReleased,
}

/// Admits queued work into a workflow executor under a shared concurrency limit.
#[derive(Clone)]
pub struct ConcurrencyDispatcher {
    config: DispatcherConfig,
    counter_store: Arc<dyn ConcurrencyCounterStore>,
    executor: Arc<dyn WorkflowExecutor>,
    record_store: Arc<dyn ExecutionRecordStore>,
    work_queue: Arc<dyn WorkQueue>,
    dead_letter_queue: Arc<dyn WorkQueue>,
}

impl ConcurrencyDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        config: DispatcherConfig,
        counter_store: Arc<dyn ConcurrencyCounterStore>,
        executor: Arc<dyn WorkflowExecutor>,
        record_store: Arc<dyn ExecutionRecordStore>,
        work_queue: Arc<dyn WorkQueue>,
        dead_letter_queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            config,
            counter_store,
            executor,
            record_store,
            work_queue,
            dead_letter_queue,
        }
    }

    fn counter_key(&self) -> &str {
        self.config.workflow_id.as_str()
    }
}
