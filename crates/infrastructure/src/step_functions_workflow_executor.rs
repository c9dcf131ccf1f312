use async_trait::async_trait;
use aws_sdk_sfn::Client;
use permset_application::WorkflowExecutor;
use permset_core::{AppError, AppResult};
use permset_domain::{ExecutionDescription, ExecutionStatus};

/// Step Functions implementation of the workflow executor.
#[derive(Clone)]
pub struct StepFunctionsWorkflowExecutor {
    client: Client,
}

impl StepFunctionsWorkflowExecutor {
    /// Creates one executor adapter.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkflowExecutor for StepFunctionsWorkflowExecutor {
    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &str,
        trace_header: &str,
    ) -> AppResult<String> {
        let output = self
            .client
            .start_execution()
            .state_machine_arn(workflow_id)
            .input(input)
            .trace_header(trace_header)
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!(
                    "StartExecution on '{workflow_id}' failed: {error}"
                ))
            })?;

        Ok(output.execution_arn().to_owned())
    }

    async fn describe_execution(&self, execution_arn: &str) -> AppResult<ExecutionDescription> {
        let output = self
            .client
            .describe_execution()
            .execution_arn(execution_arn)
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!(
                    "DescribeExecution on '{execution_arn}' failed: {error}"
                ))
            })?;

        Ok(ExecutionDescription {
            status: ExecutionStatus::parse(output.status().as_str())?,
            error: output.error().map(str::to_owned),
            cause: output.cause().map(str::to_owned),
        })
    }
}
