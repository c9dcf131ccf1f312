//! AWS Organizations adapter for the account hierarchy.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_organizations::Client;
use aws_sdk_organizations::error::SdkError;
use aws_sdk_organizations::operation::describe_account::DescribeAccountError;
use aws_sdk_organizations::operation::describe_organizational_unit::DescribeOrganizationalUnitError;
use aws_sdk_organizations::types::{Account, OrganizationalUnit};
use permset_application::OrganizationDirectory;
use permset_core::{AppError, AppResult};
use permset_domain::{AssignmentTarget, TargetKind};
use tokio::sync::{OnceCell, RwLock};

/// Organizations implementation of the directory port.
///
/// The root, the management account and per-parent listings are cached for
/// the lifetime of the adapter.
pub struct AwsOrganizationDirectory {
    client: Client,
    root: OnceCell<AssignmentTarget>,
    management_account_id: OnceCell<String>,
    child_units: RwLock<HashMap<String, Vec<AssignmentTarget>>>,
    member_accounts: RwLock<HashMap<String, Vec<AssignmentTarget>>>,
}

impl AwsOrganizationDirectory {
    /// Creates one directory adapter.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            root: OnceCell::new(),
            management_account_id: OnceCell::new(),
            child_units: RwLock::new(HashMap::new()),
            member_accounts: RwLock::new(HashMap::new()),
        }
    }

    async fn load_root(&self) -> AppResult<AssignmentTarget> {
        let output = self.client.list_roots().send().await.map_err(|error| {
            AppError::Dependency(format!("Organizations ListRoots failed: {error}"))
        })?;

        let root = output
            .roots()
            .first()
            .ok_or_else(|| AppError::NotFound("organization has no root".to_owned()))?;

        Ok(AssignmentTarget {
            kind: TargetKind::Root,
            id: root.id().unwrap_or_default().to_owned(),
            arn: root.arn().unwrap_or_default().to_owned(),
            name: root.name().unwrap_or_default().to_owned(),
        })
    }

    async fn load_management_account_id(&self) -> AppResult<String> {
        let output = self
            .client
            .describe_organization()
            .send()
            .await
            .map_err(|error| {
                AppError::Dependency(format!("Organizations DescribeOrganization failed: {error}"))
            })?;

        output
            .organization()
            .and_then(|organization| organization.master_account_id())
            .map(str::to_owned)
            .ok_or_else(|| {
                AppError::NotFound("organization has no management account".to_owned())
            })
    }

    async fn child_units(&self, parent_id: &str) -> AppResult<Vec<AssignmentTarget>> {
        if let Some(units) = self.child_units.read().await.get(parent_id) {
            return Ok(units.clone());
        }

        let units: Vec<AssignmentTarget> = self
            .client
            .list_organizational_units_for_parent()
            .parent_id(parent_id)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|error| {
                AppError::Dependency(format!(
                    "Organizations ListOrganizationalUnitsForParent on '{parent_id}' failed: {error}"
                ))
            })?
            .iter()
            .map(unit_to_target)
            .collect();

        self.child_units
            .write()
            .await
            .insert(parent_id.to_owned(), units.clone());

        Ok(units)
    }
}

#[async_trait]
impl OrganizationDirectory for AwsOrganizationDirectory {
    async fn root(&self) -> AppResult<AssignmentTarget> {
        self.root
            .get_or_try_init(|| self.load_root())
            .await
            .cloned()
    }

    async fn management_account_id(&self) -> AppResult<String> {
        self.management_account_id
            .get_or_try_init(|| self.load_management_account_id())
            .await
            .cloned()
    }

    async fn describe_organizational_unit(
        &self,
        organizational_unit_id: &str,
    ) -> AppResult<Option<AssignmentTarget>> {
        let result = self
            .client
            .describe_organizational_unit()
            .organizational_unit_id(organizational_unit_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.organizational_unit().map(unit_to_target)),
            Err(SdkError::ServiceError(service_error))
                if matches!(
                    service_error.err(),
                    DescribeOrganizationalUnitError::OrganizationalUnitNotFoundException(_)
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(AppError::Dependency(format!(
                "Organizations DescribeOrganizationalUnit on '{organizational_unit_id}' failed: {error}"
            ))),
        }
    }

    async fn find_child_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> AppResult<Option<AssignmentTarget>> {
        Ok(self
            .child_units(parent_id)
            .await?
            .into_iter()
            .find(|unit| unit.name == name))
    }

    async fn list_member_accounts(
        &self,
        parent: &AssignmentTarget,
    ) -> AppResult<Vec<AssignmentTarget>> {
        if let Some(accounts) = self.member_accounts.read().await.get(&parent.id) {
            return Ok(accounts.clone());
        }

        let accounts: Vec<Account> = match parent.kind {
            TargetKind::Root => self
                .client
                .list_accounts()
                .into_paginator()
                .items()
                .send()
                .try_collect()
                .await
                .map_err(|error| {
                    AppError::Dependency(format!("Organizations ListAccounts failed: {error}"))
                })?,
            TargetKind::OrganizationalUnit => self
                .client
                .list_accounts_for_parent()
                .parent_id(&parent.id)
                .into_paginator()
                .items()
                .send()
                .try_collect()
                .await
                .map_err(|error| {
                    AppError::Dependency(format!(
                        "Organizations ListAccountsForParent on '{}' failed: {error}",
                        parent.id
                    ))
                })?,
            TargetKind::Account => {
                return Err(AppError::Validation(format!(
                    "account '{}' has no member accounts",
                    parent.id
                )));
            }
        };

        let accounts: Vec<AssignmentTarget> = accounts.iter().map(account_to_target).collect();
        self.member_accounts
            .write()
            .await
            .insert(parent.id.clone(), accounts.clone());

        Ok(accounts)
    }

    async fn describe_account(&self, account_id: &str) -> AppResult<Option<AssignmentTarget>> {
        let result = self
            .client
            .describe_account()
            .account_id(account_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.account().map(account_to_target)),
            Err(SdkError::ServiceError(service_error))
                if matches!(
                    service_error.err(),
                    DescribeAccountError::AccountNotFoundException(_)
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(AppError::Dependency(format!(
                "Organizations DescribeAccount on '{account_id}' failed: {error}"
            ))),
        }
    }
}

fn unit_to_target(unit: &OrganizationalUnit) -> AssignmentTarget {
    AssignmentTarget {
        kind: TargetKind::OrganizationalUnit,
        id: unit.id().unwrap_or_default().to_owned(),
        arn: unit.arn().unwrap_or_default().to_owned(),
        name: unit.name().unwrap_or_default().to_owned(),
    }
}

fn account_to_target(account: &Account) -> AssignmentTarget {
    AssignmentTarget {
        kind: TargetKind::Account,
        id: account.id().unwrap_or_default().to_owned(),
        arn: account.arn().unwrap_or_default().to_owned(),
        name: account.name().unwrap_or_default().to_owned(),
    }
}
