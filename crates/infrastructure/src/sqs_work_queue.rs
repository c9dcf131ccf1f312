use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use permset_application::WorkQueue;
use permset_core::{AppError, AppResult};
use permset_domain::QueueMessage;

/// SQS implementation of the work queue.
///
/// FIFO queues, detected by the `.fifo` URL suffix, receive a message group id
/// and a unique deduplication id. They reject per-message delays, so a delayed
/// send to a FIFO queue waits locally before the message is sent.
#[derive(Clone)]
pub struct SqsWorkQueue {
    client: Client,
    queue_url: String,
    message_group_id: String,
}

impl SqsWorkQueue {
    /// Creates one queue adapter.
    #[must_use]
    pub fn new(
        client: Client,
        queue_url: impl Into<String>,
        message_group_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            message_group_id: message_group_id.into(),
        }
    }

    /// Returns whether the queue is a FIFO queue.
    #[must_use]
    pub fn is_fifo(&self) -> bool {
        is_fifo_queue_url(self.queue_url.as_str())
    }
}

fn is_fifo_queue_url(queue_url: &str) -> bool {
    queue_url.ends_with(".fifo")
}

const MAX_DELAY_SECONDS: u32 = 900;

/// How a requested delivery delay is applied to one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryDelay {
    /// Sent as the `DelaySeconds` request attribute.
    Attribute(i32),
    /// Waited out before sending.
    Wait(Duration),
}

fn delivery_delay(fifo: bool, delay_seconds: u32) -> AppResult<DeliveryDelay> {
    if delay_seconds > MAX_DELAY_SECONDS {
        return Err(AppError::Validation(format!(
            "delay_seconds {delay_seconds} exceeds the SQS maximum of {MAX_DELAY_SECONDS}"
        )));
    }

    if fifo {
        return Ok(DeliveryDelay::Wait(Duration::from_secs(u64::from(
            delay_seconds,
        ))));
    }

    i32::try_from(delay_seconds)
        .map(DeliveryDelay::Attribute)
        .map_err(|error| {
            AppError::Validation(format!("invalid delay_seconds {delay_seconds}: {error}"))
        })
}

#[async_trait]
impl WorkQueue for SqsWorkQueue {
    async fn send_message(
        &self,
        message: &QueueMessage,
        delay_seconds: u32,
    ) -> AppResult<String> {
        let body = message.to_body()?;
        let mut request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body);

        match delivery_delay(self.is_fifo(), delay_seconds)? {
            DeliveryDelay::Attribute(delay_seconds) => {
                request = request.delay_seconds(delay_seconds);
            }
            DeliveryDelay::Wait(wait) => {
                if !wait.is_zero() {
                    tracing::debug!(
                        queue_url = %self.queue_url,
                        delay_seconds,
                        "delaying fifo send"
                    );
                    tokio::time::sleep(wait).await;
                }
                request = request
                    .message_group_id(&self.message_group_id)
                    .message_deduplication_id(uuid::Uuid::new_v4().to_string());
            }
        }

        let output = request.send().await.map_err(|error| {
            AppError::Dependency(format!(
                "SQS SendMessage to '{}' failed: {error}",
                self.queue_url
            ))
        })?;

        Ok(output.message_id().unwrap_or_default().to_owned())
    }
}
