use std::sync::Arc;

use permset_core::{AppError, AppResult};
use permset_domain::{
    AssignmentGrid, AssignmentOperation, AssignmentSpec, AssignmentTarget, OperationKind,
    OrganizationalUnitPath, OrganizationalUnitSegment, TargetOperation,
};
use tracing::{info, warn};

use crate::directory_ports::{IdentityDirectory, OrganizationDirectory};

/// Operations and touched targets for one spec fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPlan {
    /// Assignment operations in expansion order.
    pub operations: Vec<AssignmentOperation>,
    /// Organization nodes and accounts the operations apply to.
    pub targets: Vec<TargetOperation>,
}

impl AssignmentPlan {
    /// Appends another plan.
    pub fn extend(&mut self, other: Self) {
        self.operations.extend(other.operations);
        self.targets.extend(other.targets);
    }

    /// Returns whether the plan contains no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns one operation per target; a create wins over a delete.
    #[must_use]
    pub fn net_targets(&self) -> Vec<TargetOperation> {
        let mut net: Vec<TargetOperation> = Vec::new();
        for operation in &self.targets {
            match net
                .iter_mut()
                .find(|existing| existing.target.id == operation.target.id)
            {
                Some(existing) => {
                    if operation.kind == OperationKind::Create {
                        existing.kind = OperationKind::Create;
                    }
                }
                None => net.push(operation.clone()),
            }
        }

        net
    }
}

/// Resolves names in an assignment spec into provider ids and operations.
#[derive(Clone)]
pub struct AssignmentResolver {
    organization: Arc<dyn OrganizationDirectory>,
    identity: Arc<dyn IdentityDirectory>,
}

impl AssignmentResolver {
    /// Creates a resolver over directory ports.
    #[must_use]
    pub fn new(
        organization: Arc<dyn OrganizationDirectory>,
        identity: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            organization,
            identity,
        }
    }

    /// Expands one spec into create or delete operations.
    ///
    /// The management account is never targeted. Unknown accounts and
    /// organizational units are skipped with a warning, while a spec without
    /// principals or permission sets is rejected.
    pub async fn plan(
        &self,
        kind: OperationKind,
        spec: &AssignmentSpec,
    ) -> AppResult<AssignmentPlan> {
        let management_account_id = self.organization.management_account_id().await?;
        let mut account_ids = Vec::new();
        let mut targets = Vec::new();

        for account_id in spec.target_account_ids.values() {
            match self.organization.describe_account(account_id).await? {
                Some(account) if account.id == management_account_id => {
                    info!(account_id = %account.id, "skipping management account target");
                }
                Some(account) => {
                    push_unique(&mut account_ids, account.id.clone());
                    push_target(&mut targets, account);
                }
                None => warn!(account_id = %account_id, "target account not found"),
            }
        }

        for name in spec.target_organizational_unit_names.values() {
            let path = OrganizationalUnitPath::parse(name)?;
            let Some(node) = self.resolve_organizational_unit(&path).await? else {
                warn!(organizational_unit = %path.as_str(), "organizational unit not found");
                continue;
            };

            for account in self.organization.list_member_accounts(&node).await? {
                if account.id != management_account_id {
                    push_unique(&mut account_ids, account.id);
                }
            }
            push_target(&mut targets, node);
        }

        let group_ids = self.lookup_group_ids(spec).await?;
        let user_ids = self.lookup_user_ids(spec).await?;
        let permission_set_arns = self.lookup_permission_set_arns(spec).await?;

        let mut grid = AssignmentGrid {
            instance_arn: String::new(),
            group_ids,
            user_ids,
            permission_set_arns,
            account_ids,
        };

        if !grid.has_principals() {
            return Err(AppError::Validation("no principal ids resolved".to_owned()));
        }

        if grid.permission_set_arns.is_empty() {
            return Err(AppError::Validation("no permission sets resolved".to_owned()));
        }

        if grid.account_ids.is_empty() {
            warn!(operation = %kind, "no target accounts resolved");
        }

        grid.instance_arn = self.identity.instance_arn().await?;

        Ok(AssignmentPlan {
            operations: grid.expand(kind),
            targets: targets
                .into_iter()
                .map(|target| TargetOperation { target, kind })
                .collect(),
        })
    }

    /// Walks a dot-notated path from the root and returns the final node.
    pub async fn resolve_organizational_unit(
        &self,
        path: &OrganizationalUnitPath,
    ) -> AppResult<Option<AssignmentTarget>> {
        let mut current: Option<AssignmentTarget> = None;
        for segment in path.segments() {
            let next = match segment {
                OrganizationalUnitSegment::Root => Some(self.organization.root().await?),
                OrganizationalUnitSegment::Id(id) => {
                    self.organization.describe_organizational_unit(id).await?
                }
                OrganizationalUnitSegment::Name(name) => {
                    let parent_id = match &current {
                        Some(parent) => parent.id.clone(),
                        None => self.organization.root().await?.id,
                    };
                    self.organization
                        .find_child_organizational_unit(parent_id.as_str(), name)
                        .await?
                }
            };

            match next {
                Some(node) => current = Some(node),
                None => return Ok(None),
            }
        }

        Ok(current)
    }

    async fn lookup_group_ids(&self, spec: &AssignmentSpec) -> AppResult<Vec<String>> {
        let names = spec.group_names.values();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        Ok(unique(self.identity.find_group_ids(names).await?))
    }

    async fn lookup_user_ids(&self, spec: &AssignmentSpec) -> AppResult<Vec<String>> {
        let names = spec.user_names.values();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        Ok(unique(self.identity.find_user_ids(names).await?))
    }

    async fn lookup_permission_set_arns(&self, spec: &AssignmentSpec) -> AppResult<Vec<String>> {
        let names = spec.permission_set_names.values();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        Ok(unique(self.identity.find_permission_set_arns(names).await?))
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn push_target(targets: &mut Vec<AssignmentTarget>, target: AssignmentTarget) {
    if !targets.iter().any(|existing| existing.id == target.id) {
        targets.push(target);
    }
}

fn unique(values: Vec<String>) -> Vec<String> {
    let mut result = Vec::with_capacity(values.len());
    for value in values {
        push_unique(&mut result, value);
    }

    result
}

#[cfg(test)]
mod tests;
