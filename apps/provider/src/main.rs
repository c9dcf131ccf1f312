//! Permission set assignment custom resource provider runtime.

#![forbid(unsafe_code)]

mod dto;
mod provider_config;

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, service_fn};
use permset_application::{
    AssignmentResolver, CustomResourceRequest, CustomResourceService, LifecycleEventService,
};
use permset_core::{AppError, AppResult};
use permset_infrastructure::{
    AwsOrganizationDirectory, CloudFormationStackUpdater, DynamoDbExecutionRecordStore,
    DynamoDbTargetAssociationStore, SqsWorkQueue, SsoIdentityDirectory,
    StepFunctionsWorkflowExecutor,
};
use tracing::{error, info, warn};

use crate::dto::{CustomResourceEvent, IsCompleteResponseDto, LifecycleEvent, OnEventResponseDto};
use crate::provider_config::{ProviderAppConfig, ProviderHandler, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ProviderAppConfig::load()?;
    let sdk_config = aws_config::load_from_env().await;

    info!(handler = %config.handler.as_str(), "permset-provider started");

    match config.handler {
        ProviderHandler::OnEvent => {
            let service = &build_custom_resource_service(&config, &sdk_config)?;
            lambda_runtime::run(service_fn(
                move |event: LambdaEvent<CustomResourceEvent>| async move {
                    let payload = event.payload;
                    let request = match CustomResourceRequest::try_from(payload.clone()) {
                        Ok(request) => request,
                        Err(failure) => {
                            error!(
                                request_id = %payload.request_id,
                                request_type = %payload.request_type,
                                error = %failure,
                                "custom resource event rejected"
                            );
                            return Ok::<_, Error>(payload.rejected(&failure));
                        }
                    };
                    info!(
                        request_id = %request.request_id,
                        request_type = %request.request_type.as_str(),
                        stack_id = %request.stack_id,
                        "custom resource event received"
                    );
                    Ok::<_, Error>(OnEventResponseDto::from(service.on_event(&request).await))
                },
            ))
            .await
        }
        ProviderHandler::IsComplete => {
            let service = &build_custom_resource_service(&config, &sdk_config)?;
            lambda_runtime::run(service_fn(
                move |event: LambdaEvent<CustomResourceEvent>| async move {
                    let request = CustomResourceRequest::try_from(event.payload)?;
                    let response = service.is_complete(&request).await?;
                    info!(
                        request_id = %request.request_id,
                        is_complete = response.is_complete,
                        "completion polled"
                    );
                    Ok::<_, Error>(IsCompleteResponseDto::from(response))
                },
            ))
            .await
        }
        ProviderHandler::Lifecycle => {
            let service = &build_lifecycle_service(&config, &sdk_config);
            lambda_runtime::run(service_fn(move |event: LambdaEvent<LifecycleEvent>| async move {
                Ok::<_, Error>(on_lifecycle_event(service, &event.payload).await?)
            }))
            .await
        }
    }
}

fn build_resolver(sdk_config: &aws_config::SdkConfig) -> AssignmentResolver {
    AssignmentResolver::new(
        Arc::new(AwsOrganizationDirectory::new(
            aws_sdk_organizations::Client::new(sdk_config),
        )),
        Arc::new(SsoIdentityDirectory::new(
            aws_sdk_ssoadmin::Client::new(sdk_config),
            aws_sdk_identitystore::Client::new(sdk_config),
        )),
    )
}

fn build_custom_resource_service(
    config: &ProviderAppConfig,
    sdk_config: &aws_config::SdkConfig,
) -> AppResult<CustomResourceService> {
    let queue_url = config
        .queue_url
        .as_deref()
        .ok_or_else(|| AppError::Validation("QUEUE_URL is required".to_owned()))?;
    let dynamodb = aws_sdk_dynamodb::Client::new(sdk_config);

    Ok(CustomResourceService::new(
        build_resolver(sdk_config),
        Arc::new(SqsWorkQueue::new(
            aws_sdk_sqs::Client::new(sdk_config),
            queue_url,
            config.message_group_id.as_str(),
        )),
        Arc::new(DynamoDbTargetAssociationStore::new(
            dynamodb.clone(),
            config.provider_table_name.as_str(),
        )),
        Arc::new(DynamoDbExecutionRecordStore::new(
            dynamodb,
            config.provider_table_name.as_str(),
        )),
        Arc::new(StepFunctionsWorkflowExecutor::new(aws_sdk_sfn::Client::new(
            sdk_config,
        ))),
    ))
}

fn build_lifecycle_service(
    config: &ProviderAppConfig,
    sdk_config: &aws_config::SdkConfig,
) -> LifecycleEventService {
    LifecycleEventService::new(
        Arc::new(AwsOrganizationDirectory::new(
            aws_sdk_organizations::Client::new(sdk_config),
        )),
        Arc::new(DynamoDbTargetAssociationStore::new(
            aws_sdk_dynamodb::Client::new(sdk_config),
            config.provider_table_name.as_str(),
        )),
        Arc::new(CloudFormationStackUpdater::new(
            aws_sdk_cloudformation::Client::new(sdk_config),
        )),
    )
}

async fn on_lifecycle_event(
    service: &LifecycleEventService,
    event: &LifecycleEvent,
) -> AppResult<Vec<String>> {
    let status = event.status()?;
    if !status.succeeded() {
        warn!(
            event_name = %event.detail.event_name,
            account_id = %status.account.account_id,
            state = status.state.as_deref().unwrap_or_default(),
            "ignoring unfinished managed account event"
        );
        return Ok(Vec::new());
    }

    service.on_managed_account_event(&status.to_event()).await
}
