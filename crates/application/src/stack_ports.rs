use async_trait::async_trait;
use permset_core::AppResult;
use permset_domain::{TargetAssociation, TargetOperation};

/// Persistence port for stack-to-target associations.
#[async_trait]
pub trait TargetAssociationStore: Send + Sync {
    /// Adds the stack to created targets and removes it from deleted ones.
    async fn associate_targets(
        &self,
        stack_id: &str,
        operations: &[TargetOperation],
    ) -> AppResult<()>;

    /// Returns associations that exist for the given target ids.
    async fn find_associations(&self, target_ids: &[String])
    -> AppResult<Vec<TargetAssociation>>;
}

/// Port for re-running stacks that own assignments.
#[async_trait]
pub trait StackUpdater: Send + Sync {
    /// Forces an update of one stack with its previous template and parameters.
    async fn force_update(&self, stack_id: &str) -> AppResult<String>;
}
