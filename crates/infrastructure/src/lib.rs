//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod cloudformation_stack_updater;
mod dynamodb_concurrency_counter_store;
mod dynamodb_execution_record_store;
mod dynamodb_target_association_store;
mod identity_center_directory;
mod in_memory_concurrency_counter_store;
mod in_memory_execution_record_store;
mod in_memory_work_queue;
mod organizations_directory;
mod redis_concurrency_counter_store;
mod sqs_work_queue;
mod step_functions_workflow_executor;

pub use cloudformation_stack_updater::CloudFormationStackUpdater;
pub use dynamodb_concurrency_counter_store::DynamoDbConcurrencyCounterStore;
pub use dynamodb_execution_record_store::DynamoDbExecutionRecordStore;
pub use dynamodb_target_association_store::DynamoDbTargetAssociationStore;
pub use identity_center_directory::SsoIdentityDirectory;
pub use in_memory_concurrency_counter_store::InMemoryConcurrencyCounterStore;
pub use in_memory_execution_record_store::InMemoryExecutionRecordStore;
pub use in_memory_work_queue::{InMemoryWorkQueue, QueuedMessage};
pub use organizations_directory::AwsOrganizationDirectory;
pub use redis_concurrency_counter_store::RedisConcurrencyCounterStore;
pub use sqs_work_queue::SqsWorkQueue;
pub use step_functions_workflow_executor::StepFunctionsWorkflowExecutor;
