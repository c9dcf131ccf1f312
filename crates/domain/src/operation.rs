use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identity store principal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalType {
    /// Identity store group.
    Group,
    /// Identity store user.
    User,
}

impl PrincipalType {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "GROUP",
            Self::User => "USER",
        }
    }
}

/// Assignment target kind accepted by the account assignment API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// Member account of the organization.
    #[default]
    #[serde(rename = "AWS_ACCOUNT")]
    AwsAccount,
}

impl TargetType {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwsAccount => "AWS_ACCOUNT",
        }
    }
}

/// Whether an assignment is created or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Create the account assignment.
    Create,
    /// Delete the account assignment.
    Delete,
}

impl OperationKind {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Delete => "Delete",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Parameters of one account assignment call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountAssignmentInput {
    /// SSO instance ARN.
    pub instance_arn: String,
    /// Permission set ARN.
    pub permission_set_arn: String,
    /// Identity store principal id.
    pub principal_id: String,
    /// Principal kind.
    pub principal_type: PrincipalType,
    /// Target account id.
    pub target_id: String,
    /// Target kind.
    #[serde(default)]
    pub target_type: TargetType,
}

/// One assignment the workflow executor must create or delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentOperation {
    /// Assignment call parameters.
    pub input: AccountAssignmentInput,
    /// Create or delete.
    #[serde(rename = "type")]
    pub kind: OperationKind,
}

/// Resolved identifiers whose Cartesian product yields assignment operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentGrid {
    /// SSO instance ARN shared by every operation.
    pub instance_arn: String,
    /// Group principal ids.
    pub group_ids: Vec<String>,
    /// User principal ids.
    pub user_ids: Vec<String>,
    /// Permission set ARNs.
    pub permission_set_arns: Vec<String>,
    /// Target account ids.
    pub account_ids: Vec<String>,
}

impl AssignmentGrid {
    /// Returns whether any principal is present.
    #[must_use]
    pub fn has_principals(&self) -> bool {
        !self.group_ids.is_empty() || !self.user_ids.is_empty()
    }

    /// Expands groups then users across every permission set and account.
    #[must_use]
    pub fn expand(&self, kind: OperationKind) -> Vec<AssignmentOperation> {
        let principals = self
            .group_ids
            .iter()
            .map(|id| (id, PrincipalType::Group))
            .chain(self.user_ids.iter().map(|id| (id, PrincipalType::User)));

        let mut operations = Vec::new();
        for (principal_id, principal_type) in principals {
            for permission_set_arn in &self.permission_set_arns {
                for account_id in &self.account_ids {
                    operations.push(AssignmentOperation {
                        input: AccountAssignmentInput {
                            instance_arn: self.instance_arn.clone(),
                            permission_set_arn: permission_set_arn.clone(),
                            principal_id: principal_id.clone(),
                            principal_type,
                            target_id: account_id.clone(),
                            target_type: TargetType::AwsAccount,
                        },
                        kind,
                    });
                }
            }
        }

        operations
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AssignmentGrid, OperationKind, PrincipalType};

    fn grid() -> AssignmentGrid {
        AssignmentGrid {
            instance_arn: "arn:aws:sso:::instance/ssoins-1".to_owned(),
            group_ids: vec!["g-1".to_owned(), "g-2".to_owned()],
            user_ids: vec!["u-1".to_owned()],
            permission_set_arns: vec!["ps-1".to_owned(), "ps-2".to_owned()],
            account_ids: vec!["111111111111".to_owned()],
        }
    }

    #[test]
    fn expansion_orders_groups_before_users() {
        let operations = grid().expand(OperationKind::Create);

        assert_eq!(operations.len(), 6);
        assert_eq!(operations[0].input.principal_id, "g-1");
        assert_eq!(operations[0].input.permission_set_arn, "ps-1");
        assert_eq!(operations[1].input.permission_set_arn, "ps-2");
        assert_eq!(operations[4].input.principal_type, PrincipalType::User);
        assert!(
            operations
                .iter()
                .all(|operation| operation.kind == OperationKind::Create)
        );
    }

    #[test]
    fn missing_accounts_expand_to_nothing() {
        let mut grid = grid();
        grid.account_ids.clear();

        assert!(grid.expand(OperationKind::Delete).is_empty());
        assert!(grid.has_principals());
    }

    #[test]
    fn operation_uses_state_machine_wire_form() {
        let operations = grid().expand(OperationKind::Delete);
        let value = serde_json::to_value(&operations[0]).unwrap_or_default();

        assert_eq!(
            value,
            json!({
                "input": {
                    "InstanceArn": "arn:aws:sso:::instance/ssoins-1",
                    "PermissionSetArn": "ps-1",
                    "PrincipalId": "g-1",
                    "PrincipalType": "GROUP",
                    "TargetId": "111111111111",
                    "TargetType": "AWS_ACCOUNT"
                },
                "type": "Delete"
            })
        );
    }
}
