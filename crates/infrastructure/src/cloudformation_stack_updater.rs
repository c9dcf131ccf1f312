use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::types::{Capability, Parameter};
use permset_application::StackUpdater;
use permset_core::{AppError, AppResult};

const FORCE_UPDATE_PARAMETER: &str = "ForceUpdate";

/// CloudFormation implementation of forced stack updates.
///
/// The stack keeps its template and every parameter value except
/// `ForceUpdate`, which receives a fresh random value so the custom resource
/// sees an update.
#[derive(Clone)]
pub struct CloudFormationStackUpdater {
    client: Client,
}

impl CloudFormationStackUpdater {
    /// Creates one updater adapter.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StackUpdater for CloudFormationStackUpdater {
    async fn force_update(&self, stack_id: &str) -> AppResult<String> {
        let described = self
            .client
            .describe_stacks()
            .stack_name(stack_id)
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!("DescribeStacks on '{stack_id}' failed: {error}"))
            })?;

        let stack = described
            .stacks()
            .first()
            .ok_or_else(|| AppError::NotFound(format!("stack '{stack_id}' does not exist")))?;

        let parameter_keys: Vec<&str> = stack
            .parameters()
            .iter()
            .filter_map(Parameter::parameter_key)
            .collect();

        let capabilities: Vec<Capability> = stack.capabilities().to_vec();

        let output = self
            .client
            .update_stack()
            .stack_name(stack_id)
            .use_previous_template(true)
            .set_parameters(Some(forced_parameters(&parameter_keys)))
            .set_capabilities((!capabilities.is_empty()).then_some(capabilities))
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!("UpdateStack on '{stack_id}' failed: {error}"))
            })?;

        Ok(output.stack_id().unwrap_or(stack_id).to_owned())
    }
}

fn forced_parameters(parameter_keys: &[&str]) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = parameter_keys
        .iter()
        .filter(|key| **key != FORCE_UPDATE_PARAMETER)
        .map(|key| {
            Parameter::builder()
                .parameter_key(*key)
                .use_previous_value(true)
                .build()
        })
        .collect();

    parameters.push(
        Parameter::builder()
            .parameter_key(FORCE_UPDATE_PARAMETER)
            .parameter_value(uuid::Uuid::new_v4().to_string())
            .build(),
    );

    parameters
}
