use async_trait::async_trait;
use permset_core::AppResult;
use permset_domain::QueueMessage;

/// Outbound message queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Sends one message and returns the queue-assigned message id.
    async fn send_message(&self, message: &QueueMessage, delay_seconds: u32)
    -> AppResult<String>;
}
