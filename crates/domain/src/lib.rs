//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod diff;
mod dispatch;
mod operation;
mod organization;

pub use assignment::{AssignmentField, AssignmentSpec, FieldValues};
pub use diff::{DiffResult, diff};
pub use dispatch::{
    CompletionNotification, ConcurrencyLimit, ExecutionDescription, ExecutionRecord,
    ExecutionStatus, QueueMessage, RequeueDelayWindow,
};
pub use operation::{
    AccountAssignmentInput, AssignmentGrid, AssignmentOperation, OperationKind, PrincipalType,
    TargetType,
};
pub use organization::{
    AssignmentTarget, ManagedAccountEvent, OrganizationalUnitPath, OrganizationalUnitSegment,
    TargetAssociation, TargetKind, TargetOperation,
};
