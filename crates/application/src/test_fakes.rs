use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use permset_core::{AppError, AppResult, PhysicalResourceId};
use permset_domain::{
    AssignmentTarget, ConcurrencyLimit, ExecutionDescription, ExecutionRecord, ExecutionStatus,
    OperationKind, QueueMessage, TargetAssociation, TargetKind, TargetOperation,
};

use crate::directory_ports::{IdentityDirectory, OrganizationDirectory};
use crate::dispatch_ports::{
    ConcurrencyCounterStore, ExecutionRecordStore, WorkQueue, WorkflowExecutor,
};
use crate::stack_ports::{StackUpdater, TargetAssociationStore};

pub const ROOT_ID: &str = "r-root";
pub const MANAGEMENT_ACCOUNT_ID: &str = "000000000000";

pub fn root_target() -> AssignmentTarget {
    AssignmentTarget {
        kind: TargetKind::Root,
        id: ROOT_ID.to_owned(),
        arn: format!("arn:aws:organizations::{MANAGEMENT_ACCOUNT_ID}:root/o-1/{ROOT_ID}"),
        name: "Root".to_owned(),
    }
}

pub fn account(id: &str) -> AssignmentTarget {
    AssignmentTarget {
        kind: TargetKind::Account,
        id: id.to_owned(),
        arn: format!("arn:aws:organizations::{MANAGEMENT_ACCOUNT_ID}:account/o-1/{id}"),
        name: format!("account-{id}"),
    }
}

pub fn organizational_unit(id: &str, name: &str) -> AssignmentTarget {
    AssignmentTarget {
        kind: TargetKind::OrganizationalUnit,
        id: id.to_owned(),
        arn: format!("arn:aws:organizations::{MANAGEMENT_ACCOUNT_ID}:ou/o-1/{id}"),
        name: name.to_owned(),
    }
}

/// Organization with a root, nested units and accounts per parent.
pub struct FakeOrganizationDirectory {
    units: Vec<(String, AssignmentTarget)>,
    accounts: Vec<(String, AssignmentTarget)>,
}

impl FakeOrganizationDirectory {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            accounts: vec![(ROOT_ID.to_owned(), account(MANAGEMENT_ACCOUNT_ID))],
        }
    }

    pub fn with_unit(mut self, parent_id: &str, id: &str, name: &str) -> Self {
        self.units
            .push((parent_id.to_owned(), organizational_unit(id, name)));
        self
    }

    pub fn with_account(mut self, parent_id: &str, id: &str) -> Self {
        self.accounts.push((parent_id.to_owned(), account(id)));
        self
    }
}

#[async_trait]
impl OrganizationDirectory for FakeOrganizationDirectory {
    async fn root(&self) -> AppResult<AssignmentTarget> {
        Ok(root_target())
    }

    async fn management_account_id(&self) -> AppResult<String> {
        Ok(MANAGEMENT_ACCOUNT_ID.to_owned())
    }

    async fn describe_organizational_unit(
        &self,
        organizational_unit_id: &str,
    ) -> AppResult<Option<AssignmentTarget>> {
        Ok(self
            .units
            .iter()
            .find(|(_, unit)| unit.id == organizational_unit_id)
            .map(|(_, unit)| unit.clone()))
    }

    async fn find_child_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> AppResult<Option<AssignmentTarget>> {
        Ok(self
            .units
            .iter()
            .find(|(parent, unit)| parent == parent_id && unit.name == name)
            .map(|(_, unit)| unit.clone()))
    }

    async fn list_member_accounts(
        &self,
        parent: &AssignmentTarget,
    ) -> AppResult<Vec<AssignmentTarget>> {
        Ok(self
            .accounts
            .iter()
            .filter(|(parent_id, _)| parent.kind == TargetKind::Root || *parent_id == parent.id)
            .map(|(_, account)| account.clone())
            .collect())
    }

    async fn describe_account(&self, account_id: &str) -> AppResult<Option<AssignmentTarget>> {
        Ok(self
            .accounts
            .iter()
            .find(|(_, account)| account.id == account_id)
            .map(|(_, account)| account.clone()))
    }
}

/// Identity store where every known name maps to `<prefix>-<name>`.
#[derive(Default)]
pub struct FakeIdentityDirectory {
    groups: Vec<String>,
    users: Vec<String>,
    permission_sets: Vec<String>,
}

impl FakeIdentityDirectory {
    pub fn new(groups: &[&str], users: &[&str], permission_sets: &[&str]) -> Self {
        let owned = |names: &[&str]| names.iter().map(|name| (*name).to_owned()).collect();
        Self {
            groups: owned(groups),
            users: owned(users),
            permission_sets: owned(permission_sets),
        }
    }

    fn lookup(known: &[String], names: &[String], prefix: &str) -> Vec<String> {
        names
            .iter()
            .filter(|name| known.contains(*name))
            .map(|name| format!("{prefix}-{name}"))
            .collect()
    }
}

#[async_trait]
impl IdentityDirectory for FakeIdentityDirectory {
    async fn instance_arn(&self) -> AppResult<String> {
        Ok("arn:aws:sso:::instance/ssoins-test".to_owned())
    }

    async fn find_group_ids(&self, display_names: &[String]) -> AppResult<Vec<String>> {
        Ok(Self::lookup(&self.groups, display_names, "group"))
    }

    async fn find_user_ids(&self, user_names: &[String]) -> AppResult<Vec<String>> {
        Ok(Self::lookup(&self.users, user_names, "user"))
    }

    async fn find_permission_set_arns(&self, names: &[String]) -> AppResult<Vec<String>> {
        Ok(Self::lookup(&self.permission_sets, names, "ps"))
    }
}

#[derive(Default)]
pub struct FakeCounterStore {
    pub counters: Mutex<HashMap<String, u32>>,
}

impl FakeCounterStore {
    pub async fn value(&self, key: &str) -> u32 {
        self.counters.lock().await.get(key).copied().unwrap_or(0)
    }

    pub async fn set(&self, key: &str, value: u32) {
        self.counters.lock().await.insert(key.to_owned(), value);
    }
}

#[async_trait]
impl ConcurrencyCounterStore for FakeCounterStore {
    async fn ensure_counter(&self, key: &str) -> AppResult<()> {
        self.counters
            .lock()
            .await
            .entry(key.to_owned())
            .or_insert(0);
        Ok(())
    }

    async fn try_increment(&self, key: &str, limit: ConcurrencyLimit) -> AppResult<bool> {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(key.to_owned()).or_insert(0);
        if *counter >= limit.value() {
            return Ok(false);
        }

        *counter += 1;
        Ok(true)
    }

    async fn try_decrement(&self, key: &str) -> AppResult<bool> {
        let mut counters = self.counters.lock().await;
        match counters.get_mut(key) {
            Some(counter) if *counter >= 1 => {
                *counter -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn current_count(&self, key: &str) -> AppResult<u32> {
        Ok(self.value(key).await)
    }
}

#[derive(Default)]
pub struct FakeWorkQueue {
    pub sent: Mutex<Vec<(QueueMessage, u32)>>,
    pub fail_sends: AtomicBool,
}

impl FakeWorkQueue {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl WorkQueue for FakeWorkQueue {
    async fn send_message(
        &self,
        message: &QueueMessage,
        delay_seconds: u32,
    ) -> AppResult<String> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::Dependency("queue unavailable".to_owned()));
        }

        let mut sent = self.sent.lock().await;
        sent.push((message.clone(), delay_seconds));
        Ok(format!("message-{}", sent.len()))
    }
}

#[derive(Default)]
pub struct FakeWorkflowExecutor {
    pub started: Mutex<Vec<(String, String, String)>>,
    pub statuses: Mutex<HashMap<String, ExecutionDescription>>,
    pub fail_starts: AtomicBool,
}

impl FakeWorkflowExecutor {
    pub async fn set_status(&self, execution_arn: &str, status: ExecutionStatus) {
        self.statuses.lock().await.insert(
            execution_arn.to_owned(),
            ExecutionDescription {
                status,
                error: (!status.is_success()).then(|| "States.TaskFailed".to_owned()),
                cause: None,
            },
        );
    }
}

#[async_trait]
impl WorkflowExecutor for FakeWorkflowExecutor {
    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &str,
        trace_header: &str,
    ) -> AppResult<String> {
        if self.fail_starts.load(Ordering::SeqCst) {
            return Err(AppError::Dependency("execution limit exceeded".to_owned()));
        }

        let mut started = self.started.lock().await;
        started.push((
            workflow_id.to_owned(),
            input.to_owned(),
            trace_header.to_owned(),
        ));
        Ok(format!("{workflow_id}:execution-{}", started.len()))
    }

    async fn describe_execution(&self, execution_arn: &str) -> AppResult<ExecutionDescription> {
        self.statuses
            .lock()
            .await
            .get(execution_arn)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("execution '{execution_arn}'")))
    }
}

#[derive(Default)]
pub struct FakeExecutionRecordStore {
    pub records: Mutex<HashMap<PhysicalResourceId, ExecutionRecord>>,
    pub fail_puts: AtomicBool,
}

#[async_trait]
impl ExecutionRecordStore for FakeExecutionRecordStore {
    async fn put_record(&self, record: ExecutionRecord) -> AppResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Dependency("table unavailable".to_owned()));
        }

        self.records
            .lock()
            .await
            .insert(record.physical_resource_id.clone(), record);
        Ok(())
    }

    async fn find_record(
        &self,
        physical_resource_id: &PhysicalResourceId,
    ) -> AppResult<Option<ExecutionRecord>> {
        Ok(self.records.lock().await.get(physical_resource_id).cloned())
    }

    async fn delete_record(&self, physical_resource_id: &PhysicalResourceId) -> AppResult<()> {
        self.records.lock().await.remove(physical_resource_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTargetAssociationStore {
    pub associations: Mutex<HashMap<String, TargetAssociation>>,
}

impl FakeTargetAssociationStore {
    pub async fn stack_ids(&self, target_id: &str) -> Vec<String> {
        self.associations
            .lock()
            .await
            .get(target_id)
            .map(|association| association.stack_ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TargetAssociationStore for FakeTargetAssociationStore {
    async fn associate_targets(
        &self,
        stack_id: &str,
        operations: &[TargetOperation],
    ) -> AppResult<()> {
        let mut associations = self.associations.lock().await;
        for operation in operations {
            let association = associations
                .entry(operation.target.id.clone())
                .or_insert_with(|| TargetAssociation {
                    target_id: operation.target.id.clone(),
                    target_arn: String::new(),
                    target_name: String::new(),
                    stack_ids: Vec::new(),
                });
            association.target_arn = operation.target.arn.clone();
            association.target_name = operation.target.name.clone();
            match operation.kind {
                OperationKind::Create => {
                    if !association.stack_ids.iter().any(|id| id == stack_id) {
                        association.stack_ids.push(stack_id.to_owned());
                    }
                }
                OperationKind::Delete => association.stack_ids.retain(|id| id != stack_id),
            }
        }
        Ok(())
    }

    async fn find_associations(
        &self,
        target_ids: &[String],
    ) -> AppResult<Vec<TargetAssociation>> {
        let associations = self.associations.lock().await;
        Ok(target_ids
            .iter()
            .filter_map(|target_id| associations.get(target_id).cloned())
            .collect())
    }
}

#[derive(Default)]
pub struct FakeStackUpdater {
    pub updated: Mutex<Vec<String>>,
    pub failing_stack_ids: Vec<String>,
}

#[async_trait]
impl StackUpdater for FakeStackUpdater {
    async fn force_update(&self, stack_id: &str) -> AppResult<String> {
        if self.failing_stack_ids.iter().any(|id| id == stack_id) {
            return Err(AppError::Dependency(format!(
                "stack '{stack_id}' is in UPDATE_IN_PROGRESS state"
            )));
        }

        self.updated.lock().await.push(stack_id.to_owned());
        Ok(stack_id.to_owned())
    }
}
