//! Application services and ports.

#![forbid(unsafe_code)]

mod assignment_resolver;
mod concurrency_dispatcher;
mod custom_resource_service;
mod directory_ports;
mod dispatch_ports;
mod lifecycle_event_service;
mod stack_ports;

#[cfg(test)]
mod test_fakes;

pub use assignment_resolver::{AssignmentPlan, AssignmentResolver};
pub use concurrency_dispatcher::{
    AdmitBatchReport, AdmitOutcome, ConcurrencyDispatcher, DispatcherConfig, InboundMessage,
    ReleaseOutcome,
};
pub use custom_resource_service::{
    CustomResourceRequest, CustomResourceRequestType, CustomResourceService, IsCompleteResponse,
    OnEventResponse,
};
pub use directory_ports::{IdentityDirectory, OrganizationDirectory};
pub use dispatch_ports::{
    ConcurrencyCounterStore, ExecutionRecordStore, WorkQueue, WorkflowExecutor,
};
pub use lifecycle_event_service::LifecycleEventService;
pub use stack_ports::{StackUpdater, TargetAssociationStore};
