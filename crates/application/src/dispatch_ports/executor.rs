use async_trait::async_trait;
use permset_core::AppResult;
use permset_domain::ExecutionDescription;

/// Port for the downstream workflow engine.
#[async_trait]
pub trait WorkflowExecutor: Send + Sync {
    /// Starts one execution and returns its ARN.
    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &str,
        trace_header: &str,
    ) -> AppResult<String>;

    /// Returns the current status of one execution.
    async fn describe_execution(&self, execution_arn: &str) -> AppResult<ExecutionDescription>;
}
