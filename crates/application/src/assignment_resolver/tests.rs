use std::sync::Arc;

use permset_core::AppError;
use permset_domain::{
    AssignmentSpec, FieldValues, OperationKind, OrganizationalUnitPath, PrincipalType, TargetKind,
    TargetOperation,
};

use crate::test_fakes::{
    FakeIdentityDirectory, FakeOrganizationDirectory, MANAGEMENT_ACCOUNT_ID, ROOT_ID, account,
    organizational_unit,
};

use super::{AssignmentPlan, AssignmentResolver};

fn resolver() -> AssignmentResolver {
    let organization = FakeOrganizationDirectory::new()
        .with_unit(ROOT_ID, "ou-sand-00000001", "Sandbox")
        .with_unit(ROOT_ID, "ou-work-00000001", "Workloads")
        .with_unit("ou-work-00000001", "ou-prod-00000001", "Prod")
        .with_account("ou-sand-00000001", "111111111111")
        .with_account("ou-sand-00000001", "222222222222")
        .with_account("ou-prod-00000001", "333333333333");
    let identity = FakeIdentityDirectory::new(
        &["Developers", "HelpDesk"],
        &["alice"],
        &["S3ReadOnlyPerson", "Admin"],
    );

    AssignmentResolver::new(Arc::new(organization), Arc::new(identity))
}

fn spec() -> AssignmentSpec {
    AssignmentSpec {
        target_organizational_unit_names: FieldValues::present(["Sandbox"]),
        permission_set_names: FieldValues::present(["S3ReadOnlyPerson"]),
        group_names: FieldValues::present(["Developers"]),
        user_names: FieldValues::Absent,
        target_account_ids: FieldValues::Absent,
    }
}

#[tokio::test]
async fn organizational_unit_expands_to_member_accounts() {
    let plan = resolver()
        .plan(OperationKind::Create, &spec())
        .await
        .unwrap_or_else(|_| unreachable!());

    let target_ids: Vec<&str> = plan
        .operations
        .iter()
        .map(|operation| operation.input.target_id.as_str())
        .collect();
    assert_eq!(target_ids, ["111111111111", "222222222222"]);
    assert!(
        plan.operations
            .iter()
            .all(|operation| operation.input.principal_id == "group-Developers"
                && operation.input.principal_type == PrincipalType::Group
                && operation.input.permission_set_arn == "ps-S3ReadOnlyPerson")
    );
    assert_eq!(plan.targets.len(), 1);
    assert_eq!(plan.targets[0].target.id, "ou-sand-00000001");
    assert_eq!(plan.targets[0].kind, OperationKind::Create);
}

#[tokio::test]
async fn root_targets_every_account_except_management() {
    let mut spec = spec();
    spec.target_organizational_unit_names = FieldValues::present(["root"]);

    let plan = resolver()
        .plan(OperationKind::Delete, &spec)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(plan.operations.len(), 3);
    assert!(
        plan.operations
            .iter()
            .all(|operation| operation.input.target_id != MANAGEMENT_ACCOUNT_ID
                && operation.kind == OperationKind::Delete)
    );
    assert_eq!(plan.targets[0].target.kind, TargetKind::Root);
}

#[tokio::test]
async fn explicit_management_account_and_unknown_accounts_are_skipped() {
    let mut spec = spec();
    spec.target_organizational_unit_names = FieldValues::Absent;
    spec.target_account_ids =
        FieldValues::present([MANAGEMENT_ACCOUNT_ID, "999999999999", "333333333333"]);

    let plan = resolver()
        .plan(OperationKind::Create, &spec)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(plan.operations.len(), 1);
    assert_eq!(plan.operations[0].input.target_id, "333333333333");
    assert_eq!(plan.targets.len(), 1);
    assert_eq!(plan.targets[0].target.kind, TargetKind::Account);
}

#[tokio::test]
async fn dotted_path_resolves_nested_unit() {
    let node = resolver()
        .resolve_organizational_unit(
            &OrganizationalUnitPath::parse("Workloads.Prod").unwrap_or_else(|_| unreachable!()),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(node.map(|node| node.id), Some("ou-prod-00000001".to_owned()));
}

#[tokio::test]
async fn unit_id_segment_anchors_following_names() {
    let node = resolver()
        .resolve_organizational_unit(
            &OrganizationalUnitPath::parse("ou-work-00000001.Prod")
                .unwrap_or_else(|_| unreachable!()),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(node.map(|node| node.name), Some("Prod".to_owned()));
}

#[tokio::test]
async fn name_is_looked_up_under_parent_only() {
    let node = resolver()
        .resolve_organizational_unit(
            &OrganizationalUnitPath::parse("Sandbox.Prod").unwrap_or_else(|_| unreachable!()),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(node.is_none());
}

#[tokio::test]
async fn unknown_units_are_skipped_with_zero_targets() {
    let mut spec = spec();
    spec.target_organizational_unit_names = FieldValues::present(["Missing"]);

    let plan = resolver()
        .plan(OperationKind::Create, &spec)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(plan.is_empty());
    assert!(plan.targets.is_empty());
}

#[tokio::test]
async fn missing_principals_are_rejected() {
    let mut spec = spec();
    spec.group_names = FieldValues::present(["Nobody"]);

    let result = resolver().plan(OperationKind::Create, &spec).await;

    assert!(matches!(
        result,
        Err(AppError::Validation(message)) if message == "no principal ids resolved"
    ));
}

#[tokio::test]
async fn missing_permission_sets_are_rejected() {
    let mut spec = spec();
    spec.permission_set_names = FieldValues::empty();

    let result = resolver().plan(OperationKind::Create, &spec).await;

    assert!(matches!(
        result,
        Err(AppError::Validation(message)) if message == "no permission sets resolved"
    ));
}

#[tokio::test]
async fn groups_expand_before_users() {
    let mut spec = spec();
    spec.user_names = FieldValues::present(["alice"]);
    spec.group_names = FieldValues::present(["Developers", "HelpDesk"]);
    spec.target_organizational_unit_names = FieldValues::present(["Workloads.Prod"]);

    let plan = resolver()
        .plan(OperationKind::Create, &spec)
        .await
        .unwrap_or_else(|_| unreachable!());

    let principals: Vec<&str> = plan
        .operations
        .iter()
        .map(|operation| operation.input.principal_id.as_str())
        .collect();
    assert_eq!(
        principals,
        ["group-Developers", "group-HelpDesk", "user-alice"]
    );
}

#[test]
fn net_targets_prefer_create_per_target() {
    let sandbox = organizational_unit("ou-sand-00000001", "Sandbox");
    let plan = AssignmentPlan {
        operations: Vec::new(),
        targets: vec![
            TargetOperation {
                target: sandbox.clone(),
                kind: OperationKind::Delete,
            },
            TargetOperation {
                target: account("111111111111"),
                kind: OperationKind::Delete,
            },
            TargetOperation {
                target: sandbox,
                kind: OperationKind::Create,
            },
        ],
    };

    let net = plan.net_targets();

    assert_eq!(net.len(), 2);
    assert_eq!(net[0].target.id, "ou-sand-00000001");
    assert_eq!(net[0].kind, OperationKind::Create);
    assert_eq!(net[1].kind, OperationKind::Delete);
}
