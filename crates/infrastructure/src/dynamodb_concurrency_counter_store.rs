//! DynamoDB-backed concurrency counter for the dispatcher.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use permset_application::ConcurrencyCounterStore;
use permset_core::{AppError, AppResult};
use permset_domain::ConcurrencyLimit;

const ATTR_PK: &str = "pk";
const ATTR_COUNTER: &str = "counter";

/// DynamoDB implementation of the bounded execution counter.
///
/// One item per workflow, keyed by `pk`, holds the number of running
/// executions in `counter`.
#[derive(Clone)]
pub struct DynamoDbConcurrencyCounterStore {
    client: Client,
    table_name: String,
}

impl DynamoDbConcurrencyCounterStore {
    /// Creates one counter adapter over an existing client.
    #[must_use]
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    async fn conditional_add(
        &self,
        key: &str,
        delta: i64,
        condition: &str,
        bound: u32,
    ) -> AppResult<bool> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(key.to_owned()))
            .update_expression("ADD #c :delta")
            .condition_expression(condition)
            .expression_attribute_names("#c", ATTR_COUNTER)
            .expression_attribute_values(":delta", AttributeValue::N(delta.to_string()))
            .expression_attribute_values(":bound", AttributeValue::N(bound.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(error) if is_update_conditional_check_failed(&error) => Ok(false),
            Err(error) => Err(AppError::Dependency(format!(
                "DynamoDB UpdateItem on counter '{key}' failed: {error}"
            ))),
        }
    }
}

#[async_trait]
impl ConcurrencyCounterStore for DynamoDbConcurrencyCounterStore {
    async fn ensure_counter(&self, key: &str) -> AppResult<()> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item(ATTR_PK, AttributeValue::S(key.to_owned()))
            .item(ATTR_COUNTER, AttributeValue::N("0".to_owned()))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", ATTR_PK)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(counter = %key, "concurrency counter initialized");
                Ok(())
            }
            Err(error) if is_put_conditional_check_failed(&error) => Ok(()),
            Err(error) => Err(AppError::Dependency(format!(
                "DynamoDB PutItem on counter '{key}' failed: {error}"
            ))),
        }
    }

    async fn try_increment(&self, key: &str, limit: ConcurrencyLimit) -> AppResult<bool> {
        self.conditional_add(key, 1, "#c < :bound", limit.value())
            .await
    }

    async fn try_decrement(&self, key: &str) -> AppResult<bool> {
        self.conditional_add(key, -1, "#c >= :bound", 1).await
    }

    async fn current_count(&self, key: &str) -> AppResult<u32> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(key.to_owned()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!(
                    "DynamoDB GetItem on counter '{key}' failed: {error}"
                ))
            })?;

        let Some(value) = response
            .item()
            .and_then(|item| item.get(ATTR_COUNTER))
            .and_then(|value| value.as_n().ok())
        else {
            return Ok(0);
        };

        value.parse::<u32>().map_err(|error| {
            AppError::Internal(format!("invalid counter value '{value}' for '{key}': {error}"))
        })
    }
}

fn is_update_conditional_check_failed(error: &SdkError<UpdateItemError>) -> bool {
    match error {
        SdkError::ServiceError(service_error) => matches!(
            service_error.err(),
            UpdateItemError::ConditionalCheckFailedException(_)
        ),
        _ => false,
    }
}

fn is_put_conditional_check_failed(error: &SdkError<PutItemError>) -> bool {
    match error {
        SdkError::ServiceError(service_error) => matches!(
            service_error.err(),
            PutItemError::ConditionalCheckFailedException(_)
        ),
        _ => false,
    }
}
