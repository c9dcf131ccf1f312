//! DynamoDB-backed stack-to-target associations.
//!
//! One item per organization node or account keyed by `pk`, with the string
//! set `stackIds` naming every stack whose assignments touch the target.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes, TransactWriteItem, Update};
use permset_application::TargetAssociationStore;
use permset_core::{AppError, AppResult};
use permset_domain::{OperationKind, TargetAssociation, TargetOperation};

const ATTR_PK: &str = "pk";
const ATTR_STACK_IDS: &str = "stackIds";
const ATTR_TARGET_ARN: &str = "target_arn";
const ATTR_TARGET_NAME: &str = "target_name";

const MAX_TRANSACTION_ITEMS: usize = 100;
const MAX_BATCH_GET_KEYS: usize = 100;
const MAX_BATCH_GET_ATTEMPTS: u32 = 5;
const BATCH_GET_BACKOFF_MILLIS: u64 = 50;

/// DynamoDB implementation of stack associations per target.
#[derive(Clone)]
pub struct DynamoDbTargetAssociationStore {
    client: Client,
    table_name: String,
}

impl DynamoDbTargetAssociationStore {
    /// Creates one association store over an existing client.
    #[must_use]
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Reads one key batch, re-requesting unprocessed keys with backoff.
    async fn batch_get_associations(
        &self,
        request: KeysAndAttributes,
    ) -> AppResult<Vec<TargetAssociation>> {
        let mut associations = Vec::new();
        let mut pending = Some(request);
        let mut attempt = 0;

        while let Some(request) = pending.take() {
            if attempt == MAX_BATCH_GET_ATTEMPTS {
                return Err(AppError::Dependency(format!(
                    "DynamoDB BatchGetItem for target associations left {} keys unprocessed \
                     after {MAX_BATCH_GET_ATTEMPTS} attempts",
                    request.keys().len()
                )));
            }
            if attempt > 0 {
                tracing::warn!(
                    attempt,
                    unprocessed = request.keys().len(),
                    "retrying unprocessed target association keys"
                );
                tokio::time::sleep(Duration::from_millis(
                    BATCH_GET_BACKOFF_MILLIS << attempt,
                ))
                .await;
            }
            attempt += 1;

            let response = self
                .client
                .batch_get_item()
                .request_items(&self.table_name, request)
                .send()
                .await
                .map_err(|error| {
                    AppError::Dependency(format!(
                        "DynamoDB BatchGetItem for target associations failed: {error}"
                    ))
                })?;

            let items = response
                .responses()
                .and_then(|responses| responses.get(&self.table_name))
                .map(Vec::as_slice)
                .unwrap_or_default();
            associations.extend(items.iter().filter_map(item_to_association));
            pending = remaining_keys(response.unprocessed_keys(), self.table_name.as_str());
        }

        Ok(associations)
    }

    fn transact_item(
        &self,
        stack_id: &str,
        operation: &TargetOperation,
    ) -> AppResult<TransactWriteItem> {
        let set_action = match operation.kind {
            OperationKind::Create => "ADD",
            OperationKind::Delete => "DELETE",
        };

        let update = Update::builder()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(operation.target.id.clone()))
            .update_expression(format!(
                "{set_action} #stacks :stack SET #arn = :arn, #name = :name"
            ))
            .expression_attribute_names("#stacks", ATTR_STACK_IDS)
            .expression_attribute_names("#arn", ATTR_TARGET_ARN)
            .expression_attribute_names("#name", ATTR_TARGET_NAME)
            .expression_attribute_values(
                ":stack",
                AttributeValue::Ss(vec![stack_id.to_owned()]),
            )
            .expression_attribute_values(
                ":arn",
                AttributeValue::S(operation.target.arn.clone()),
            )
            .expression_attribute_values(
                ":name",
                AttributeValue::S(operation.target.name.clone()),
            )
            .build()
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to build association update for '{}': {error}",
                    operation.target.id
                ))
            })?;

        Ok(TransactWriteItem::builder().update(update).build())
    }
}

#[async_trait]
impl TargetAssociationStore for DynamoDbTargetAssociationStore {
    async fn associate_targets(
        &self,
        stack_id: &str,
        operations: &[TargetOperation],
    ) -> AppResult<()> {
        for chunk in operations.chunks(MAX_TRANSACTION_ITEMS) {
            let items = chunk
                .iter()
                .map(|operation| self.transact_item(stack_id, operation))
                .collect::<AppResult<Vec<_>>>()?;

            self.client
                .transact_write_items()
                .set_transact_items(Some(items))
                .send()
                .await
                .map_err(|error| {
                    AppError::Dependency(format!(
                        "DynamoDB TransactWriteItems for stack '{stack_id}' failed: {error}"
                    ))
                })?;
        }

        tracing::info!(
            stack_id = %stack_id,
            target_count = operations.len(),
            "stack target associations recorded"
        );

        Ok(())
    }

    async fn find_associations(
        &self,
        target_ids: &[String],
    ) -> AppResult<Vec<TargetAssociation>> {
        let mut unique_ids: Vec<&String> = Vec::with_capacity(target_ids.len());
        for target_id in target_ids {
            if !unique_ids.contains(&target_id) {
                unique_ids.push(target_id);
            }
        }

        let mut associations = Vec::new();
        for chunk in unique_ids.chunks(MAX_BATCH_GET_KEYS) {
            let keys = chunk
                .iter()
                .map(|target_id| {
                    HashMap::from([(ATTR_PK.to_owned(), AttributeValue::S((*target_id).clone()))])
                })
                .collect::<Vec<_>>();
            let request = KeysAndAttributes::builder()
                .set_keys(Some(keys))
                .consistent_read(true)
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build association lookup: {error}"))
                })?;

            associations.extend(self.batch_get_associations(request).await?);
        }

        Ok(associations)
    }
}

fn remaining_keys(
    unprocessed: Option<&HashMap<String, KeysAndAttributes>>,
    table_name: &str,
) -> Option<KeysAndAttributes> {
    unprocessed?
        .get(table_name)
        .filter(|request| !request.keys().is_empty())
        .cloned()
}

fn item_to_association(item: &HashMap<String, AttributeValue>) -> Option<TargetAssociation> {
    let string_attribute = |name: &str| {
        item.get(name)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .unwrap_or_default()
    };

    let target_id = item.get(ATTR_PK)?.as_s().ok()?.clone();
    let stack_ids = item
        .get(ATTR_STACK_IDS)
        .and_then(|value| value.as_ss().ok())
        .cloned()
        .unwrap_or_default();

    Some(TargetAssociation {
        target_id,
        target_arn: string_attribute(ATTR_TARGET_ARN),
        target_name: string_attribute(ATTR_TARGET_NAME),
        stack_ids,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes};

    use super::{item_to_association, remaining_keys};

    fn lookup(target_ids: &[&str]) -> KeysAndAttributes {
        KeysAndAttributes::builder()
            .set_keys(Some(
                target_ids
                    .iter()
                    .map(|target_id| {
                        HashMap::from([(
                            "pk".to_owned(),
                            AttributeValue::S((*target_id).to_owned()),
                        )])
                    })
                    .collect(),
            ))
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn unprocessed_keys_for_table_are_requested_again() {
        let unprocessed = HashMap::from([(
            "provider".to_owned(),
            lookup(&["ou-sand-00000001", "r-root"]),
        )]);

        let retry = remaining_keys(Some(&unprocessed), "provider")
            .unwrap_or_else(|| unreachable!());

        assert_eq!(retry.keys().len(), 2);
        assert_eq!(
            retry.keys()[1].get("pk"),
            Some(&AttributeValue::S("r-root".to_owned()))
        );
    }

    #[test]
    fn fully_processed_lookup_needs_no_retry() {
        let unprocessed = HashMap::from([("provider".to_owned(), lookup(&[]))]);

        assert!(remaining_keys(None, "provider").is_none());
        assert!(remaining_keys(Some(&HashMap::new()), "provider").is_none());
        assert!(remaining_keys(Some(&unprocessed), "provider").is_none());
    }

    #[test]
    fn item_without_stack_set_maps_to_empty_association() {
        let item = HashMap::from([
            ("pk".to_owned(), AttributeValue::S("ou-sand-00000001".to_owned())),
            ("target_name".to_owned(), AttributeValue::S("Sandbox".to_owned())),
        ]);

        let association = item_to_association(&item).unwrap_or_else(|| unreachable!());

        assert_eq!(association.target_id, "ou-sand-00000001");
        assert_eq!(association.target_name, "Sandbox");
        assert!(association.stack_ids.is_empty());
    }

    #[test]
    fn item_with_stack_set_lists_stack_ids() {
        let item = HashMap::from([
            ("pk".to_owned(), AttributeValue::S("r-root".to_owned())),
            (
                "stackIds".to_owned(),
                AttributeValue::Ss(vec!["stack-a".to_owned(), "stack-b".to_owned()]),
            ),
        ]);

        let association = item_to_association(&item).unwrap_or_else(|| unreachable!());

        assert_eq!(association.stack_ids, ["stack-a", "stack-b"]);
    }

    #[test]
    fn item_without_key_is_ignored() {
        assert!(item_to_association(&HashMap::new()).is_none());
    }
}
