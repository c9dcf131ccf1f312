use permset_application::InboundMessage;
use serde::{Deserialize, Serialize};

/// Batch of work queue messages delivered by the SQS event source.
#[derive(Debug, Default, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    pub message_id: String,
    #[serde(default)]
    pub body: String,
}

impl From<SqsRecord> for InboundMessage {
    fn from(record: SqsRecord) -> Self {
        Self {
            message_id: record.message_id,
            body: record.body,
        }
    }
}

/// Partial batch response naming the messages SQS must redeliver.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsBatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

impl SqsBatchResponse {
    pub fn from_failed_ids(message_ids: Vec<String>) -> Self {
        Self {
            batch_item_failures: message_ids
                .into_iter()
                .map(|item_identifier| BatchItemFailure { item_identifier })
                .collect(),
        }
    }
}

/// Completion notifications delivered by the SNS subscription.
#[derive(Debug, Default, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SnsRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
pub struct SnsMessage {
    #[serde(rename = "MessageId", default)]
    pub message_id: String,
    #[serde(rename = "Message")]
    pub message: String,
}
