use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use permset_application::ExecutionRecordStore;
use permset_core::{AppError, AppResult, PhysicalResourceId};
use permset_domain::ExecutionRecord;

const ATTR_PK: &str = "pk";
const ATTR_EXECUTION_ARN: &str = "executionArn";
const ATTR_REQUEST_ID: &str = "requestId";
const ATTR_RECORDED_AT: &str = "recordedAt";

/// DynamoDB implementation of execution records keyed by physical resource id.
#[derive(Clone)]
pub struct DynamoDbExecutionRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoDbExecutionRecordStore {
    /// Creates one record store over an existing client.
    #[must_use]
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl ExecutionRecordStore for DynamoDbExecutionRecordStore {
    async fn put_record(&self, record: ExecutionRecord) -> AppResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(
                ATTR_PK,
                AttributeValue::S(record.physical_resource_id.as_str().to_owned()),
            )
            .item(ATTR_EXECUTION_ARN, AttributeValue::S(record.execution_arn))
            .item(ATTR_REQUEST_ID, AttributeValue::S(record.request_id))
            .item(
                ATTR_RECORDED_AT,
                AttributeValue::S(record.recorded_at.to_rfc3339()),
            )
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!(
                    "DynamoDB PutItem for execution record '{}' failed: {error}",
                    record.physical_resource_id
                ))
            })?;

        Ok(())
    }

    async fn find_record(
        &self,
        physical_resource_id: &PhysicalResourceId,
    ) -> AppResult<Option<ExecutionRecord>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                ATTR_PK,
                AttributeValue::S(physical_resource_id.as_str().to_owned()),
            )
            .consistent_read(true)
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!(
                    "DynamoDB GetItem for execution record '{physical_resource_id}' failed: {error}"
                ))
            })?;

        response
            .item()
            .map(|item| item_to_record(physical_resource_id, item))
            .transpose()
    }

    async fn delete_record(&self, physical_resource_id: &PhysicalResourceId) -> AppResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(
                ATTR_PK,
                AttributeValue::S(physical_resource_id.as_str().to_owned()),
            )
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!(
                    "DynamoDB DeleteItem for execution record '{physical_resource_id}' failed: {error}"
                ))
            })?;

        Ok(())
    }
}

fn item_to_record(
    physical_resource_id: &PhysicalResourceId,
    item: &HashMap<String, AttributeValue>,
) -> AppResult<ExecutionRecord> {
    let string_attribute = |name: &str| -> AppResult<String> {
        item.get(name)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "execution record '{physical_resource_id}' is missing '{name}'"
                ))
            })
    };

    let recorded_at = match item
        .get(ATTR_RECORDED_AT)
        .and_then(|value| value.as_s().ok())
    {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map_err(|error| {
                AppError::Internal(format!(
                    "invalid recordedAt '{value}' on execution record '{physical_resource_id}': {error}"
                ))
            })?
            .with_timezone(&Utc),
        None => DateTime::<Utc>::UNIX_EPOCH,
    };

    Ok(ExecutionRecord {
        physical_resource_id: physical_resource_id.clone(),
        execution_arn: string_attribute(ATTR_EXECUTION_ARN)?,
        request_id: string_attribute(ATTR_REQUEST_ID)?,
        recorded_at,
    })
}
