use async_trait::async_trait;
use permset_core::AppResult;

/// Lookup port for the identity store and permission sets of the SSO instance.
///
/// Lookups return only the entries that exist; names without a match are
/// silently dropped.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Returns the ARN of the SSO instance.
    async fn instance_arn(&self) -> AppResult<String>;

    /// Returns group ids for matching display names.
    async fn find_group_ids(&self, display_names: &[String]) -> AppResult<Vec<String>>;

    /// Returns user ids for matching user names.
    async fn find_user_ids(&self, user_names: &[String]) -> AppResult<Vec<String>>;

    /// Returns permission set ARNs for matching names.
    async fn find_permission_set_arns(&self, names: &[String]) -> AppResult<Vec<String>>;
}
