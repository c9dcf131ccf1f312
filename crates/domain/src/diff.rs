use crate::assignment::{AssignmentField, AssignmentSpec, FieldValues};

/// Fragments that must be created and deleted to move between two specs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Fragments describing assignments to create.
    pub adds: Vec<AssignmentSpec>,
    /// Fragments describing assignments to delete.
    pub removes: Vec<AssignmentSpec>,
}

impl DiffResult {
    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }
}

/// Computes per-field add and remove fragments between two versions of a spec.
///
/// Removed values produce fragments built from `old`, added values produce
/// fragments built from `new`. A field that appears or disappears as a whole
/// produces a single fragment carrying every value of that field.
#[must_use]
pub fn diff(new: &AssignmentSpec, old: &AssignmentSpec) -> DiffResult {
    let mut result = DiffResult::default();
    for field in AssignmentField::DIFF_ORDER {
        diff_field(field, new, old, &mut result);
    }

    result
}

fn diff_field(
    field: AssignmentField,
    new: &AssignmentSpec,
    old: &AssignmentSpec,
    result: &mut DiffResult,
) {
    match (old.field(field), new.field(field)) {
        (FieldValues::Present(old_values), FieldValues::Present(new_values)) => {
            for value in old_values.iter().filter(|value| !new_values.contains(value)) {
                result
                    .removes
                    .push(fragment(field, vec![value.clone()], old));
            }
            for value in new_values.iter().filter(|value| !old_values.contains(value)) {
                result.adds.push(fragment(field, vec![value.clone()], new));
            }
        }
        (FieldValues::Present(old_values), FieldValues::Absent) => {
            result.removes.push(fragment(field, old_values.clone(), old));
        }
        (FieldValues::Absent, FieldValues::Present(new_values)) => {
            result.adds.push(fragment(field, new_values.clone(), new));
        }
        (FieldValues::Absent, FieldValues::Absent) => {}
    }
}

/// Builds one fragment for a changed field.
///
/// Target fields exclude each other and principal fields exclude each other,
/// so a fragment never combines the changed value with a sibling scope that
/// did not change.
fn fragment(
    field: AssignmentField,
    values: Vec<String>,
    context: &AssignmentSpec,
) -> AssignmentSpec {
    let changed = FieldValues::Present(values);
    match field {
        AssignmentField::TargetOrganizationalUnitNames => AssignmentSpec {
            target_organizational_unit_names: changed,
            target_account_ids: FieldValues::empty(),
            ..context.clone()
        },
        AssignmentField::PermissionSetNames => AssignmentSpec {
            permission_set_names: changed,
            ..context.clone()
        },
        AssignmentField::GroupNames => AssignmentSpec {
            group_names: changed,
            user_names: FieldValues::empty(),
            ..context.clone()
        },
        AssignmentField::UserNames => AssignmentSpec {
            user_names: changed,
            group_names: FieldValues::empty(),
            ..context.clone()
        },
        AssignmentField::TargetAccountIds => AssignmentSpec {
            target_account_ids: changed,
            target_organizational_unit_names: FieldValues::empty(),
            ..context.clone()
        },
    }
}
