use async_trait::async_trait;
use permset_core::AppResult;
use permset_domain::AssignmentTarget;

/// Read-only view of the account hierarchy.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Returns the organization root.
    async fn root(&self) -> AppResult<AssignmentTarget>;

    /// Returns the id of the organization management account.
    async fn management_account_id(&self) -> AppResult<String>;

    /// Describes one organizational unit by id.
    async fn describe_organizational_unit(
        &self,
        organizational_unit_id: &str,
    ) -> AppResult<Option<AssignmentTarget>>;

    /// Finds a direct child organizational unit by name.
    async fn find_child_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> AppResult<Option<AssignmentTarget>>;

    /// Lists member accounts of a node; the root lists every account.
    async fn list_member_accounts(
        &self,
        parent: &AssignmentTarget,
    ) -> AppResult<Vec<AssignmentTarget>>;

    /// Describes one account by id.
    async fn describe_account(&self, account_id: &str) -> AppResult<Option<AssignmentTarget>>;
}
