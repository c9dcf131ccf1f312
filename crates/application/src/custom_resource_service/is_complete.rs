use super::*;

impl CustomResourceService {
    /// Reports whether the execution started for a request has finished.
    ///
    /// Failed, timed out and aborted executions are reported complete after
    /// logging their error so the stack operation does not hang.
    pub async fn is_complete(
        &self,
        request: &CustomResourceRequest,
    ) -> AppResult<IsCompleteResponse> {
        let Some(physical_resource_id) = &request.physical_resource_id else {
            warn!(
                request_id = %request.request_id,
                "completion poll carries no physical resource id"
            );
            return Ok(IsCompleteResponse::complete());
        };

        let Some(record) = self.record_store.find_record(physical_resource_id).await? else {
            info!(
                request_id = %request.request_id,
                physical_resource_id = %physical_resource_id,
                "execution not started yet"
            );
            return Ok(IsCompleteResponse::pending());
        };

        if record.request_id != request.request_id {
            info!(
                request_id = %request.request_id,
                recorded_request_id = %record.request_id,
                physical_resource_id = %physical_resource_id,
                "execution for this request not started yet"
            );
            return Ok(IsCompleteResponse::pending());
        }

        let description = self
            .executor
            .describe_execution(record.execution_arn.as_str())
            .await?;
        info!(
            physical_resource_id = %physical_resource_id,
            execution_arn = %record.execution_arn,
            status = %description.status,
            "execution status"
        );

        match description.status {
            ExecutionStatus::Succeeded => {
                if request.request_type == CustomResourceRequestType::Delete {
                    self.record_store.delete_record(physical_resource_id).await?;
                }
                Ok(IsCompleteResponse::complete())
            }
            ExecutionStatus::Failed | ExecutionStatus::TimedOut | ExecutionStatus::Aborted => {
                error!(
                    physical_resource_id = %physical_resource_id,
                    execution_arn = %record.execution_arn,
                    status = %description.status,
                    error = description.error.as_deref().unwrap_or_default(),
                    cause = description.cause.as_deref().unwrap_or_default(),
                    "assignment execution did not succeed"
                );
                Ok(IsCompleteResponse::complete())
            }
            ExecutionStatus::Running | ExecutionStatus::PendingRedrive => {
                Ok(IsCompleteResponse::pending())
            }
        }
    }
}
