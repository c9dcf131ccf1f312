use std::collections::VecDeque;

use async_trait::async_trait;
use permset_application::WorkQueue;
use permset_core::AppResult;
use permset_domain::QueueMessage;
use tokio::sync::Mutex;

/// Message accepted by the in-memory queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Generated message id.
    pub message_id: String,
    /// Serialized message body.
    pub body: String,
    /// Requested delivery delay.
    pub delay_seconds: u32,
}

/// In-memory FIFO queue adapter for tests and local runs.
#[derive(Default)]
pub struct InMemoryWorkQueue {
    messages: Mutex<VecDeque<QueuedMessage>>,
}

impl InMemoryWorkQueue {
    /// Creates an empty in-memory queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued message in send order.
    pub async fn drain(&self) -> Vec<QueuedMessage> {
        self.messages.lock().await.drain(..).collect()
    }

    /// Returns the number of queued messages.
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// Returns whether no message is queued.
    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn send_message(
        &self,
        message: &QueueMessage,
        delay_seconds: u32,
    ) -> AppResult<String> {
        let queued = QueuedMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            body: message.to_body()?,
            delay_seconds,
        };
        let message_id = queued.message_id.clone();
        self.messages.lock().await.push_back(queued);

        Ok(message_id)
    }
}
