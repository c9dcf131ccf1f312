use std::sync::Arc;

use permset_core::AppResult;
use permset_domain::ManagedAccountEvent;
use tracing::{error, info};

use crate::directory_ports::OrganizationDirectory;
use crate::stack_ports::{StackUpdater, TargetAssociationStore};

/// Re-runs assignment stacks when the landing zone enrolls or moves an account.
#[derive(Clone)]
pub struct LifecycleEventService {
    organization: Arc<dyn OrganizationDirectory>,
    association_store: Arc<dyn TargetAssociationStore>,
    stack_updater: Arc<dyn StackUpdater>,
}

impl LifecycleEventService {
    /// Creates a lifecycle event service.
    #[must_use]
    pub fn new(
        organization: Arc<dyn OrganizationDirectory>,
        association_store: Arc<dyn TargetAssociationStore>,
        stack_updater: Arc<dyn StackUpdater>,
    ) -> Self {
        Self {
            organization,
            association_store,
            stack_updater,
        }
    }

    /// Forces an update of every stack associated with the account, its unit
    /// or the organization root, and returns the updated stack ids.
    pub async fn on_managed_account_event(
        &self,
        event: &ManagedAccountEvent,
    ) -> AppResult<Vec<String>> {
        let root = self.organization.root().await?;
        let target_ids = [
            event.organizational_unit_id.clone(),
            event.account_id.clone(),
            root.id,
        ];
        let associations = self.association_store.find_associations(&target_ids).await?;
        info!(
            account_id = %event.account_id,
            account_name = %event.account_name,
            organizational_unit_id = %event.organizational_unit_id,
            organizational_unit_name = %event.organizational_unit_name,
            association_count = associations.len(),
            "managed account event"
        );

        let mut stack_ids: Vec<String> = Vec::new();
        for association in associations {
            for stack_id in association.stack_ids {
                if !stack_ids.contains(&stack_id) {
                    stack_ids.push(stack_id);
                }
            }
        }

        let mut updated = Vec::with_capacity(stack_ids.len());
        for stack_id in stack_ids {
            match self.stack_updater.force_update(stack_id.as_str()).await {
                Ok(updated_stack_id) => {
                    info!(stack_id = %updated_stack_id, "assignment stack update started");
                    updated.push(updated_stack_id);
                }
                Err(update_error) => error!(
                    stack_id = %stack_id,
                    error = %update_error,
                    "failed to update assignment stack"
                ),
            }
        }

        Ok(updated)
    }
}
