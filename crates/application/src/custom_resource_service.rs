use std::sync::Arc;

use permset_core::{AppError, AppResult, PhysicalResourceId};
use permset_domain::{AssignmentSpec, ExecutionStatus, OperationKind, QueueMessage, diff};
use tracing::{error, info, warn};

use crate::assignment_resolver::{AssignmentPlan, AssignmentResolver};
use crate::dispatch_ports::{ExecutionRecordStore, WorkQueue, WorkflowExecutor};
use crate::stack_ports::TargetAssociationStore;

mod is_complete;
mod on_event;

/// Lifecycle request type sent by CloudFormation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomResourceRequestType {
    /// Resource created.
    Create,
    /// Resource properties changed.
    Update,
    /// Resource deleted.
    Delete,
}

impl CustomResourceRequestType {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }

    /// Parses a wire value into a request type.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "Create" => Ok(Self::Create),
            "Update" => Ok(Self::Update),
            "Delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown custom resource request type '{value}'"
            ))),
        }
    }
}

/// One custom resource lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomResourceRequest {
    /// Request type.
    pub request_type: CustomResourceRequestType,
    /// Unique request id.
    pub request_id: String,
    /// Stack owning the resource.
    pub stack_id: String,
    /// Existing physical id, absent on create.
    pub physical_resource_id: Option<PhysicalResourceId>,
    /// Desired assignment state.
    pub properties: AssignmentSpec,
    /// Previous assignment state on update.
    pub old_properties: Option<AssignmentSpec>,
}

/// Reply to a lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnEventResponse {
    /// Physical id CloudFormation should track.
    pub physical_resource_id: PhysicalResourceId,
    /// Whether no completion polling is needed.
    pub is_complete: bool,
    /// Whether the request failed.
    pub failed: bool,
    /// Failure description.
    pub error: Option<String>,
}

/// Reply to a completion poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsCompleteResponse {
    /// Whether the resource reached its final state.
    pub is_complete: bool,
}

impl IsCompleteResponse {
    fn complete() -> Self {
        Self { is_complete: true }
    }

    fn pending() -> Self {
        Self { is_complete: false }
    }
}

/// Handles custom resource lifecycle requests for permission set assignments.
#[derive(Clone)]
pub struct CustomResourceService {
    resolver: AssignmentResolver,
    work_queue: Arc<dyn WorkQueue>,
    association_store: Arc<dyn TargetAssociationStore>,
    record_store: Arc<dyn ExecutionRecordStore>,
    executor: Arc<dyn WorkflowExecutor>,
}

impl CustomResourceService {
    /// Creates a custom resource service.
    #[must_use]
    pub fn new(
        resolver: AssignmentResolver,
        work_queue: Arc<dyn WorkQueue>,
        association_store: Arc<dyn TargetAssociationStore>,
        record_store: Arc<dyn ExecutionRecordStore>,
        executor: Arc<dyn WorkflowExecutor>,
    ) -> Self {
        Self {
            resolver,
            work_queue,
            association_store,
            record_store,
            executor,
        }
    }
}
