use serde::{Deserialize, Serialize};

/// Values of one assignment property.
///
/// `Absent` means the property is not part of this version of the resource
/// state, while `Present(vec![])` means it was explicitly set to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Option<Vec<String>>")]
pub enum FieldValues {
    /// Property missing from the resource properties.
    #[default]
    Absent,
    /// Property present with de-duplicated values in declaration order.
    Present(Vec<String>),
}

impl FieldValues {
    /// Creates present values, dropping repeated entries.
    #[must_use]
    pub fn present<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !unique.contains(&value) {
                unique.push(value);
            }
        }

        Self::Present(unique)
    }

    /// Creates present values with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::Present(Vec::new())
    }

    /// Returns whether the property is missing.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns present values, or an empty slice when absent.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            Self::Absent => &[],
            Self::Present(values) => values.as_slice(),
        }
    }

    /// Returns present values, or `None` when absent.
    #[must_use]
    pub fn as_present(&self) -> Option<&[String]> {
        match self {
            Self::Absent => None,
            Self::Present(values) => Some(values.as_slice()),
        }
    }
}

impl From<Option<Vec<String>>> for FieldValues {
    fn from(value: Option<Vec<String>>) -> Self {
        match value {
            Some(values) => Self::present(values),
            None => Self::Absent,
        }
    }
}

impl From<FieldValues> for Option<Vec<String>> {
    fn from(value: FieldValues) -> Self {
        match value {
            FieldValues::Absent => None,
            FieldValues::Present(values) => Some(values),
        }
    }
}

/// One of the five assignment properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentField {
    /// Organizational unit names or paths whose member accounts are targeted.
    TargetOrganizationalUnitNames,
    /// Permission set names to assign.
    PermissionSetNames,
    /// Identity store group display names.
    GroupNames,
    /// Identity store user names.
    UserNames,
    /// Explicit target account ids.
    TargetAccountIds,
}

impl AssignmentField {
    /// Fields in the order the diff engine visits them.
    pub const DIFF_ORDER: [Self; 5] = [
        Self::TargetOrganizationalUnitNames,
        Self::PermissionSetNames,
        Self::GroupNames,
        Self::UserNames,
        Self::TargetAccountIds,
    ];

    /// Returns the CloudFormation property name.
    #[must_use]
    pub fn property_name(&self) -> &'static str {
        match self {
            Self::TargetOrganizationalUnitNames => "TargetOrganizationalUnitNames",
            Self::PermissionSetNames => "PermissionSetNames",
            Self::GroupNames => "GroupNames",
            Self::UserNames => "UserNames",
            Self::TargetAccountIds => "TargetAccountIds",
        }
    }
}

/// Declarative permission set assignment carried by one custom resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssignmentSpec {
    /// Organizational unit names, dot paths, or ids.
    #[serde(default, skip_serializing_if = "FieldValues::is_absent")]
    pub target_organizational_unit_names: FieldValues,
    /// Permission set names.
    #[serde(default, skip_serializing_if = "FieldValues::is_absent")]
    pub permission_set_names: FieldValues,
    /// Group display names.
    #[serde(default, skip_serializing_if = "FieldValues::is_absent")]
    pub group_names: FieldValues,
    /// User names.
    #[serde(default, skip_serializing_if = "FieldValues::is_absent")]
    pub user_names: FieldValues,
    /// Account ids.
    #[serde(default, skip_serializing_if = "FieldValues::is_absent")]
    pub target_account_ids: FieldValues,
}

impl AssignmentSpec {
    /// Returns the values held by one field.
    #[must_use]
    pub fn field(&self, field: AssignmentField) -> &FieldValues {
        match field {
            AssignmentField::TargetOrganizationalUnitNames => {
                &self.target_organizational_unit_names
            }
            AssignmentField::PermissionSetNames => &self.permission_set_names,
            AssignmentField::GroupNames => &self.group_names,
            AssignmentField::UserNames => &self.user_names,
            AssignmentField::TargetAccountIds => &self.target_account_ids,
        }
    }

    /// Returns a copy with one field replaced.
    #[must_use]
    pub fn with_field(mut self, field: AssignmentField, values: FieldValues) -> Self {
        match field {
            AssignmentField::TargetOrganizationalUnitNames => {
                self.target_organizational_unit_names = values;
            }
            AssignmentField::PermissionSetNames => self.permission_set_names = values,
            AssignmentField::GroupNames => self.group_names = values,
            AssignmentField::UserNames => self.user_names = values,
            AssignmentField::TargetAccountIds => self.target_account_ids = values,
        }

        self
    }
}
