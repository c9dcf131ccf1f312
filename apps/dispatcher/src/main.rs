//! Concurrency-gated dispatcher runtime.

#![forbid(unsafe_code)]

mod dispatcher_config;
mod dto;

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, service_fn};
use permset_application::{
    ConcurrencyCounterStore, ConcurrencyDispatcher, DispatcherConfig, InboundMessage,
};
use permset_core::{AppError, AppResult};
use permset_domain::CompletionNotification;
use permset_infrastructure::{
    DynamoDbConcurrencyCounterStore, DynamoDbExecutionRecordStore, RedisConcurrencyCounterStore,
    SqsWorkQueue, StepFunctionsWorkflowExecutor,
};
use tracing::{error, info, warn};

use crate::dispatcher_config::{
    CounterBackend, DispatcherAppConfig, DispatcherStep, init_tracing,
};
use crate::dto::{SnsEvent, SqsBatchResponse, SqsEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = DispatcherAppConfig::load()?;
    let sdk_config = aws_config::load_from_env().await;
    let dispatcher = build_dispatcher(&config, &sdk_config)?;

    info!(
        step = %config.step.as_str(),
        workflow_id = %config.state_machine_arn,
        max_concurrency = config.max_concurrency.value(),
        requeue_on_failure = config.requeue_on_failure,
        "permset-dispatcher started"
    );

    let dispatcher = &dispatcher;
    match config.step {
        DispatcherStep::Admit => {
            lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| async move {
                Ok::<_, Error>(admit(dispatcher, event.payload).await)
            }))
            .await
        }
        DispatcherStep::Release => {
            lambda_runtime::run(service_fn(move |event: LambdaEvent<SnsEvent>| async move {
                release(dispatcher, event.payload).await?;
                Ok::<_, Error>(())
            }))
            .await
        }
    }
}

fn build_dispatcher(
    config: &DispatcherAppConfig,
    sdk_config: &aws_config::SdkConfig,
) -> AppResult<ConcurrencyDispatcher> {
    let dynamodb = aws_sdk_dynamodb::Client::new(sdk_config);
    let sqs = aws_sdk_sqs::Client::new(sdk_config);

    let counter_store: Arc<dyn ConcurrencyCounterStore> = match &config.counter_backend {
        CounterBackend::DynamoDb { table_name } => Arc::new(
            DynamoDbConcurrencyCounterStore::new(dynamodb.clone(), table_name.as_str()),
        ),
        CounterBackend::Redis { url, key_prefix } => {
            let client = redis::Client::open(url.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL: {error}"))
            })?;
            Arc::new(RedisConcurrencyCounterStore::new(client, key_prefix.as_str()))
        }
    };

    let mut dispatcher_config = DispatcherConfig::new(config.state_machine_arn.as_str());
    dispatcher_config.limit = config.max_concurrency;
    dispatcher_config.requeue_on_failure = config.requeue_on_failure;

    Ok(ConcurrencyDispatcher::new(
        dispatcher_config,
        counter_store,
        Arc::new(StepFunctionsWorkflowExecutor::new(aws_sdk_sfn::Client::new(
            sdk_config,
        ))),
        Arc::new(DynamoDbExecutionRecordStore::new(
            dynamodb,
            config.provider_table_name.as_str(),
        )),
        Arc::new(SqsWorkQueue::new(
            sqs.clone(),
            config.queue_url.as_str(),
            config.message_group_id.as_str(),
        )),
        Arc::new(SqsWorkQueue::new(
            sqs,
            config.dlq_url.as_str(),
            config.message_group_id.as_str(),
        )),
    ))
}

async fn admit(dispatcher: &ConcurrencyDispatcher, event: SqsEvent) -> SqsBatchResponse {
    let messages: Vec<InboundMessage> = event.records.into_iter().map(Into::into).collect();
    let report = dispatcher.admit_batch(&messages).await;

    info!(
        received = messages.len(),
        started = report.started_execution_arns.len(),
        failed = report.failed_message_ids.len(),
        "admission batch handled"
    );

    SqsBatchResponse::from_failed_ids(report.failed_message_ids)
}

/// Releases one slot per notification; transient failures fail the invocation
/// so the subscription redelivers it.
async fn release(dispatcher: &ConcurrencyDispatcher, event: SnsEvent) -> AppResult<()> {
    let mut transient_failure: Option<AppError> = None;

    for record in event.records {
        let notification = match CompletionNotification::from_message(&record.sns.message) {
            Ok(notification) => notification,
            Err(parse_error) => {
                warn!(
                    notification_id = %record.sns.message_id,
                    error = %parse_error,
                    "dropping malformed completion notification"
                );
                continue;
            }
        };

        match dispatcher.release(&notification).await {
            Ok(outcome) => info!(
                execution_arn = %notification.execution_arn,
                outcome = ?outcome,
                "completion handled"
            ),
            Err(release_error) if release_error.is_transient() => {
                error!(
                    execution_arn = %notification.execution_arn,
                    error = %release_error,
                    "completion handling failed, requesting redelivery"
                );
                transient_failure = Some(release_error);
            }
            Err(release_error) => warn!(
                execution_arn = %notification.execution_arn,
                error = %release_error,
                "dropping completion notification"
            ),
        }
    }

    match transient_failure {
        Some(release_error) => Err(release_error),
        None => Ok(()),
    }
}
