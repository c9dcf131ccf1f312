use permset_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::operation::OperationKind;

/// One segment of a dot-notated organizational unit path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrganizationalUnitSegment {
    /// The organization root, written `root` or as an `r-` id.
    Root,
    /// A direct organizational unit id such as `ou-abcd-12345678`.
    Id(String),
    /// A child unit name looked up under the previous segment.
    Name(String),
}

impl OrganizationalUnitSegment {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("root") || value.starts_with("r-") {
            Self::Root
        } else if value.starts_with("ou-") {
            Self::Id(value.to_owned())
        } else {
            Self::Name(value.to_owned())
        }
    }
}

/// Organizational unit reference such as `Workloads.Prod` or `ou-abcd-12345678`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrganizationalUnitPath {
    raw: String,
    segments: Vec<OrganizationalUnitSegment>,
}

impl OrganizationalUnitPath {
    /// Parses a dot-notated path, resolved left to right starting at the root.
    pub fn parse(value: &str) -> AppResult<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "organizational unit name must not be empty".to_owned(),
            ));
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(AppError::Validation(format!(
                    "organizational unit path '{trimmed}' contains an empty segment"
                )));
            }
            segments.push(OrganizationalUnitSegment::parse(segment));
        }

        Ok(Self {
            raw: trimmed.to_owned(),
            segments,
        })
    }

    /// Returns the path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Returns parsed segments in resolution order.
    #[must_use]
    pub fn segments(&self) -> &[OrganizationalUnitSegment] {
        self.segments.as_slice()
    }
}

/// Kind of organization node an assignment touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Organization root.
    Root,
    /// Organizational unit.
    OrganizationalUnit,
    /// Member account.
    Account,
}

/// Resolved organization node or account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentTarget {
    /// Node kind.
    pub kind: TargetKind,
    /// Node id (`r-`, `ou-` or account id).
    pub id: String,
    /// Node ARN.
    pub arn: String,
    /// Display name.
    pub name: String,
}

/// Target touched by one create or delete plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOperation {
    /// Target node.
    pub target: AssignmentTarget,
    /// Whether assignments were added or removed.
    pub kind: OperationKind,
}

/// Stacks that hold assignments on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAssociation {
    /// Target node id.
    pub target_id: String,
    /// Target node ARN.
    pub target_arn: String,
    /// Target display name.
    pub target_name: String,
    /// Stack ids with assignments on the target.
    pub stack_ids: Vec<String>,
}

/// Account enrolled or updated by the landing zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedAccountEvent {
    /// Organizational unit the account was placed in.
    pub organizational_unit_id: String,
    /// Organizational unit name.
    pub organizational_unit_name: String,
    /// Account id.
    pub account_id: String,
    /// Account name.
    pub account_name: String,
}
