//! IAM Identity Center adapter for principals and permission sets.

use async_trait::async_trait;
use permset_application::IdentityDirectory;
use permset_core::{AppError, AppResult};
use tokio::sync::OnceCell;

#[derive(Debug, Clone)]
struct SsoInstance {
    instance_arn: String,
    identity_store_id: String,
}

#[derive(Debug, Clone)]
struct NamedId {
    name: String,
    id: String,
}

/// Identity Center implementation of the identity directory.
///
/// The first SSO instance of the account is used. Groups, users and permission
/// sets are listed once and filtered by name on every lookup.
pub struct SsoIdentityDirectory {
    sso_admin: aws_sdk_ssoadmin::Client,
    identity_store: aws_sdk_identitystore::Client,
    instance: OnceCell<SsoInstance>,
    groups: OnceCell<Vec<NamedId>>,
    users: OnceCell<Vec<NamedId>>,
    permission_sets: OnceCell<Vec<NamedId>>,
}

impl SsoIdentityDirectory {
    /// Creates one directory adapter.
    #[must_use]
    pub fn new(
        sso_admin: aws_sdk_ssoadmin::Client,
        identity_store: aws_sdk_identitystore::Client,
    ) -> Self {
        Self {
            sso_admin,
            identity_store,
            instance: OnceCell::new(),
            groups: OnceCell::new(),
            users: OnceCell::new(),
            permission_sets: OnceCell::new(),
        }
    }

    async fn instance(&self) -> AppResult<&SsoInstance> {
        self.instance
            .get_or_try_init(|| async {
                let output = self.sso_admin.list_instances().send().await.map_err(|error| {
                    AppError::Dependency(format!("SSO ListInstances failed: {error}"))
                })?;
                let instance = output
                    .instances()
                    .first()
                    .ok_or_else(|| AppError::NotFound("no SSO instance found".to_owned()))?;

                Ok::<_, AppError>(SsoInstance {
                    instance_arn: instance.instance_arn().unwrap_or_default().to_owned(),
                    identity_store_id: instance.identity_store_id().unwrap_or_default().to_owned(),
                })
            })
            .await
    }

    async fn groups(&self) -> AppResult<&[NamedId]> {
        let groups = self
            .groups
            .get_or_try_init(|| async {
                let identity_store_id = self.instance().await?.identity_store_id.clone();
                let groups = self
                    .identity_store
                    .list_groups()
                    .identity_store_id(identity_store_id)
                    .into_paginator()
                    .items()
                    .send()
                    .try_collect()
                    .await
                    .map_err(|error| {
                        AppError::Dependency(format!("IdentityStore ListGroups failed: {error}"))
                    })?;

                Ok::<_, AppError>(
                    groups
                        .iter()
                        .filter_map(|group| {
                            Some(NamedId {
                                name: group.display_name()?.to_owned(),
                                id: group.group_id().to_owned(),
                            })
                        })
                        .collect(),
                )
            })
            .await?;

        Ok(groups.as_slice())
    }

    async fn users(&self) -> AppResult<&[NamedId]> {
        let users = self
            .users
            .get_or_try_init(|| async {
                let identity_store_id = self.instance().await?.identity_store_id.clone();
                let users = self
                    .identity_store
                    .list_users()
                    .identity_store_id(identity_store_id)
                    .into_paginator()
                    .items()
                    .send()
                    .try_collect()
                    .await
                    .map_err(|error| {
                        AppError::Dependency(format!("IdentityStore ListUsers failed: {error}"))
                    })?;

                Ok::<_, AppError>(
                    users
                        .iter()
                        .filter_map(|user| {
                            Some(NamedId {
                                name: user.user_name()?.to_owned(),
                                id: user.user_id().to_owned(),
                            })
                        })
                        .collect(),
                )
            })
            .await?;

        Ok(users.as_slice())
    }

    async fn permission_sets(&self) -> AppResult<&[NamedId]> {
        let permission_sets = self
            .permission_sets
            .get_or_try_init(|| async {
                let instance_arn = self.instance().await?.instance_arn.clone();
                let arns: Vec<String> = self
                    .sso_admin
                    .list_permission_sets()
                    .instance_arn(&instance_arn)
                    .into_paginator()
                    .items()
                    .send()
                    .try_collect()
                    .await
                    .map_err(|error| {
                        AppError::Dependency(format!("SSO ListPermissionSets failed: {error}"))
                    })?;

                let mut permission_sets = Vec::with_capacity(arns.len());
                for arn in arns {
                    let output = self
                        .sso_admin
                        .describe_permission_set()
                        .instance_arn(&instance_arn)
                        .permission_set_arn(&arn)
                        .send()
                        .await
                        .map_err(|error| {
                            AppError::Dependency(format!(
                                "SSO DescribePermissionSet on '{arn}' failed: {error}"
                            ))
                        })?;

                    if let Some(name) = output.permission_set().and_then(|set| set.name()) {
                        permission_sets.push(NamedId {
                            name: name.to_owned(),
                            id: arn,
                        });
                    }
                }

                Ok::<_, AppError>(permission_sets)
            })
            .await?;

        Ok(permission_sets.as_slice())
    }
}

#[async_trait]
impl IdentityDirectory for SsoIdentityDirectory {
    async fn instance_arn(&self) -> AppResult<String> {
        Ok(self.instance().await?.instance_arn.clone())
    }

    async fn find_group_ids(&self, display_names: &[String]) -> AppResult<Vec<String>> {
        Ok(ids_for_names(self.groups().await?, display_names))
    }

    async fn find_user_ids(&self, user_names: &[String]) -> AppResult<Vec<String>> {
        Ok(ids_for_names(self.users().await?, user_names))
    }

    async fn find_permission_set_arns(&self, names: &[String]) -> AppResult<Vec<String>> {
        Ok(ids_for_names(self.permission_sets().await?, names))
    }
}

fn ids_for_names(entries: &[NamedId], names: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| names.contains(&entry.name))
        .map(|entry| entry.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{NamedId, ids_for_names};

    fn entry(name: &str, id: &str) -> NamedId {
        NamedId {
            name: name.to_owned(),
            id: id.to_owned(),
        }
    }

    #[test]
    fn names_filter_listing_in_listing_order() {
        let entries = [
            entry("Developers", "g-1"),
            entry("HelpDesk", "g-2"),
            entry("Admins", "g-3"),
        ];

        let ids = ids_for_names(&entries, &["Admins".to_owned(), "Developers".to_owned()]);

        assert_eq!(ids, ["g-1", "g-3"]);
    }

    #[test]
    fn unknown_names_are_dropped() {
        let entries = [entry("Developers", "g-1")];

        assert!(ids_for_names(&entries, &["developers".to_owned()]).is_empty());
    }
}
