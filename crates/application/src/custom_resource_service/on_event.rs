use super::*;

impl CustomResourceService {
    /// Plans and enqueues the assignments a lifecycle request implies.
    ///
    /// Every failure is folded into a failed response so CloudFormation
    /// receives the error message instead of a provider crash.
    pub async fn on_event(&self, request: &CustomResourceRequest) -> OnEventResponse {
        let physical_resource_id = match request.request_type {
            CustomResourceRequestType::Create => PhysicalResourceId::generate(),
            CustomResourceRequestType::Update | CustomResourceRequestType::Delete => {
                match &request.physical_resource_id {
                    Some(physical_resource_id) => physical_resource_id.clone(),
                    None => {
                        return failed_response(
                            request,
                            PhysicalResourceId::generate(),
                            AppError::Validation(format!(
                                "{} request carries no physical resource id",
                                request.request_type.as_str()
                            )),
                        );
                    }
                }
            }
        };

        match self.dispatch(request, &physical_resource_id).await {
            Ok(is_complete) => OnEventResponse {
                physical_resource_id,
                is_complete,
                failed: false,
                error: None,
            },
            Err(dispatch_error) => failed_response(request, physical_resource_id, dispatch_error),
        }
    }

    /// Returns the operations and targets a request implies.
    ///
    /// Updates apply the per-field diff: added fragments are created and
    /// removed fragments deleted. An update without changes re-applies the
    /// full desired state.
    pub async fn plan_request(
        &self,
        request: &CustomResourceRequest,
    ) -> AppResult<AssignmentPlan> {
        match request.request_type {
            CustomResourceRequestType::Create => {
                self.resolver
                    .plan(OperationKind::Create, &request.properties)
                    .await
            }
            CustomResourceRequestType::Delete => {
                self.resolver
                    .plan(OperationKind::Delete, &request.properties)
                    .await
            }
            CustomResourceRequestType::Update => {
                let old_properties = request.old_properties.as_ref().ok_or_else(|| {
                    AppError::Validation("update request carries no old properties".to_owned())
                })?;
                let changes = diff(&request.properties, old_properties);
                if changes.is_empty() {
                    info!(
                        request_id = %request.request_id,
                        "properties unchanged, re-applying desired assignments"
                    );
                    return self
                        .resolver
                        .plan(OperationKind::Create, &request.properties)
                        .await;
                }

                let mut plan = AssignmentPlan::default();
                for fragment in &changes.adds {
                    plan.extend(self.resolver.plan(OperationKind::Create, fragment).await?);
                }
                for fragment in &changes.removes {
                    plan.extend(self.resolver.plan(OperationKind::Delete, fragment).await?);
                }

                Ok(plan)
            }
        }
    }

    async fn dispatch(
        &self,
        request: &CustomResourceRequest,
        physical_resource_id: &PhysicalResourceId,
    ) -> AppResult<bool> {
        let plan = self.plan_request(request).await?;
        let targets = plan.net_targets();
        if plan.is_empty() {
            self.association_store
                .associate_targets(request.stack_id.as_str(), &targets)
                .await?;
            info!(
                request_id = %request.request_id,
                physical_resource_id = %physical_resource_id,
                "no assignment operations, completing immediately"
            );
            return Ok(true);
        }

        let operation_count = plan.operations.len();
        let message = QueueMessage {
            inputs: plan.operations,
            physical_resource_id: physical_resource_id.clone(),
            request_id: request.request_id.clone(),
        };
        let message_id = self.work_queue.send_message(&message, 0).await?;
        info!(
            request_id = %request.request_id,
            physical_resource_id = %physical_resource_id,
            message_id = %message_id,
            operation_count,
            "assignment operations enqueued"
        );

        self.association_store
            .associate_targets(request.stack_id.as_str(), &targets)
            .await?;

        Ok(false)
    }
}

fn failed_response(
    request: &CustomResourceRequest,
    physical_resource_id: PhysicalResourceId,
    failure: AppError,
) -> OnEventResponse {
    error!(
        request_id = %request.request_id,
        request_type = %request.request_type.as_str(),
        physical_resource_id = %physical_resource_id,
        error = %failure,
        "custom resource request failed"
    );

    OnEventResponse {
        physical_resource_id,
        is_complete: true,
        failed: true,
        error: Some(failure.to_string()),
    }
}
