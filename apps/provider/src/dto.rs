use permset_application::{
    CustomResourceRequest, CustomResourceRequestType, IsCompleteResponse, OnEventResponse,
};
use permset_core::{AppError, AppResult, PhysicalResourceId};
use permset_domain::{AssignmentSpec, ManagedAccountEvent};
use serde::{Deserialize, Serialize};

/// Lifecycle event forwarded by the custom resource provider framework.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: String,
    pub request_id: String,
    pub stack_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: AssignmentSpec,
    #[serde(default)]
    pub old_resource_properties: Option<AssignmentSpec>,
}

impl CustomResourceEvent {
    /// Builds the failed reply for an event that cannot become a request.
    ///
    /// The incoming physical id is echoed back when present so CloudFormation
    /// does not treat the failure as a replacement.
    pub fn rejected(&self, failure: &AppError) -> OnEventResponseDto {
        let physical_resource_id = self
            .physical_resource_id
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| PhysicalResourceId::generate().to_string());

        OnEventResponseDto {
            physical_resource_id,
            is_complete: true,
            data: Some(ErrorData {
                error: failure.to_string(),
            }),
            failed: true,
        }
    }
}

impl TryFrom<CustomResourceEvent> for CustomResourceRequest {
    type Error = AppError;

    fn try_from(event: CustomResourceEvent) -> AppResult<Self> {
        let physical_resource_id = event
            .physical_resource_id
            .filter(|value| !value.trim().is_empty())
            .map(PhysicalResourceId::parse)
            .transpose()?;

        Ok(Self {
            request_type: CustomResourceRequestType::parse(event.request_type.as_str())?,
            request_id: event.request_id,
            stack_id: event.stack_id,
            physical_resource_id,
            properties: event.resource_properties,
            old_properties: event.old_resource_properties,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OnEventResponseDto {
    pub physical_resource_id: String,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorData {
    pub error: String,
}

impl From<OnEventResponse> for OnEventResponseDto {
    fn from(response: OnEventResponse) -> Self {
        Self {
            physical_resource_id: response.physical_resource_id.as_str().to_owned(),
            is_complete: response.is_complete,
            data: response.error.map(|error| ErrorData { error }),
            failed: response.failed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IsCompleteResponseDto {
    pub is_complete: bool,
}

impl From<IsCompleteResponse> for IsCompleteResponseDto {
    fn from(response: IsCompleteResponse) -> Self {
        Self {
            is_complete: response.is_complete,
        }
    }
}

/// Control Tower lifecycle event delivered through EventBridge.
#[derive(Debug, Deserialize)]
pub struct LifecycleEvent {
    pub detail: LifecycleEventDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEventDetail {
    #[serde(default)]
    pub event_name: String,
    pub service_event_details: ServiceEventDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEventDetails {
    #[serde(default)]
    pub create_managed_account_status: Option<ManagedAccountStatus>,
    #[serde(default)]
    pub update_managed_account_status: Option<ManagedAccountStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAccountStatus {
    #[serde(default)]
    pub state: Option<String>,
    pub organizational_unit: OrganizationalUnitRef,
    pub account: AccountRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnitRef {
    pub organizational_unit_id: String,
    #[serde(default)]
    pub organizational_unit_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    pub account_id: String,
    #[serde(default)]
    pub account_name: String,
}

impl LifecycleEvent {
    /// Returns the managed account status carried by the event.
    pub fn status(&self) -> AppResult<&ManagedAccountStatus> {
        let details = &self.detail.service_event_details;
        details
            .create_managed_account_status
            .as_ref()
            .or(details.update_managed_account_status.as_ref())
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "lifecycle event '{}' carries no managed account status",
                    self.detail.event_name
                ))
            })
    }
}

impl ManagedAccountStatus {
    /// Returns whether Control Tower reported the account operation as finished.
    pub fn succeeded(&self) -> bool {
        self.state.as_deref().is_none_or(|state| state == "SUCCEEDED")
    }

    pub fn to_event(&self) -> ManagedAccountEvent {
        ManagedAccountEvent {
            organizational_unit_id: self.organizational_unit.organizational_unit_id.clone(),
            organizational_unit_name: self.organizational_unit.organizational_unit_name.clone(),
            account_id: self.account.account_id.clone(),
            account_name: self.account.account_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use permset_application::{CustomResourceRequest, CustomResourceRequestType, OnEventResponse};
    use permset_core::{AppError, PhysicalResourceId};
    use permset_domain::FieldValues;

    use super::{CustomResourceEvent, LifecycleEvent, OnEventResponseDto};

    #[test]
    fn update_event_maps_properties_and_old_properties() {
        let event: CustomResourceEvent = serde_json::from_str(
            r#"{
                "RequestType": "Update",
                "RequestId": "req-1",
                "StackId": "arn:aws:cloudformation:us-east-1:000000000000:stack/assignments/1",
                "PhysicalResourceId": "0b6a4a4e-6f0e-4f4b-9f57-64f1a2e0b7c1",
                "ResourceProperties": {
                    "ServiceToken": "arn:aws:lambda:us-east-1:000000000000:function:provider",
                    "GroupNames": ["Developers"],
                    "PermissionSetNames": ["S3ReadOnlyPerson"],
                    "TargetOrganizationalUnitNames": ["Sandbox"]
                },
                "OldResourceProperties": {
                    "GroupNames": ["Developers", "HelpDesk"],
                    "PermissionSetNames": ["S3ReadOnlyPerson"],
                    "TargetOrganizationalUnitNames": ["Sandbox"]
                }
            }"#,
        )
        .unwrap_or_else(|_| unreachable!());

        let request = CustomResourceRequest::try_from(event).unwrap_or_else(|_| unreachable!());

        assert_eq!(request.request_type, CustomResourceRequestType::Update);
        assert_eq!(request.properties.group_names, FieldValues::present(["Developers"]));
        assert_eq!(request.properties.user_names, FieldValues::Absent);
        assert_eq!(
            request
                .old_properties
                .map(|properties| properties.group_names),
            Some(FieldValues::present(["Developers", "HelpDesk"]))
        );
    }

    #[test]
    fn unknown_request_type_is_rejected() {
        let event: CustomResourceEvent = serde_json::from_str(
            r#"{"RequestType": "Replace", "RequestId": "r", "StackId": "s"}"#,
        )
        .unwrap_or_else(|_| unreachable!());

        assert!(matches!(
            CustomResourceRequest::try_from(event),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unconvertible_event_is_rejected_with_its_physical_id() {
        let event: CustomResourceEvent = serde_json::from_str(
            r#"{"RequestType": "Replace", "RequestId": "r", "StackId": "s", "PhysicalResourceId": "pr-9"}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let failure =
            AppError::Validation("unknown custom resource request type 'Replace'".to_owned());

        let json =
            serde_json::to_value(event.rejected(&failure)).unwrap_or_else(|_| unreachable!());

        assert_eq!(
            json,
            serde_json::json!({
                "PhysicalResourceId": "pr-9",
                "IsComplete": true,
                "Data": {"error": "validation error: unknown custom resource request type 'Replace'"},
                "Failed": true
            })
        );
    }

    #[test]
    fn rejected_event_without_physical_id_gets_a_generated_one() {
        let event: CustomResourceEvent = serde_json::from_str(
            r#"{"RequestType": "Replace", "RequestId": "r", "StackId": "s", "PhysicalResourceId": " "}"#,
        )
        .unwrap_or_else(|_| unreachable!());

        let response = event.rejected(&AppError::Validation("bad".to_owned()));

        assert_eq!(response.physical_resource_id.len(), 36);
        assert!(response.failed);
        assert!(response.is_complete);
    }

    #[test]
    fn failed_response_carries_error_data() {
        let response = OnEventResponseDto::from(OnEventResponse {
            physical_resource_id: PhysicalResourceId::parse("pr-1")
                .unwrap_or_else(|_| unreachable!()),
            is_complete: true,
            failed: true,
            error: Some("validation error: no principal ids resolved".to_owned()),
        });

        let json = serde_json::to_value(&response).unwrap_or_else(|_| unreachable!());

        assert_eq!(
            json,
            serde_json::json!({
                "PhysicalResourceId": "pr-1",
                "IsComplete": true,
                "Data": {"error": "validation error: no principal ids resolved"},
                "Failed": true
            })
        );
    }

    #[test]
    fn pending_response_omits_failure_fields() {
        let response = OnEventResponseDto::from(OnEventResponse {
            physical_resource_id: PhysicalResourceId::parse("pr-2")
                .unwrap_or_else(|_| unreachable!()),
            is_complete: false,
            failed: false,
            error: None,
        });

        let json = serde_json::to_value(&response).unwrap_or_else(|_| unreachable!());

        assert_eq!(
            json,
            serde_json::json!({"PhysicalResourceId": "pr-2", "IsComplete": false})
        );
    }

    #[test]
    fn create_managed_account_event_maps_to_domain_event() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{
                "source": "aws.controltower",
                "detail": {
                    "eventName": "CreateManagedAccount",
                    "serviceEventDetails": {
                        "createManagedAccountStatus": {
                            "state": "SUCCEEDED",
                            "organizationalUnit": {
                                "organizationalUnitName": "Sandbox",
                                "organizationalUnitId": "ou-sand-00000001"
                            },
                            "account": {
                                "accountName": "new-sandbox",
                                "accountId": "444444444444"
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap_or_else(|_| unreachable!());

        let status = event.status().unwrap_or_else(|_| unreachable!());
        let domain_event = status.to_event();

        assert!(status.succeeded());
        assert_eq!(domain_event.organizational_unit_id, "ou-sand-00000001");
        assert_eq!(domain_event.account_id, "444444444444");
        assert_eq!(domain_event.account_name, "new-sandbox");
    }

    #[test]
    fn update_managed_account_event_is_read_from_update_status() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{
                "detail": {
                    "eventName": "UpdateManagedAccount",
                    "serviceEventDetails": {
                        "updateManagedAccountStatus": {
                            "state": "FAILED",
                            "organizationalUnit": {"organizationalUnitId": "ou-work-00000001"},
                            "account": {"accountId": "555555555555"}
                        }
                    }
                }
            }"#,
        )
        .unwrap_or_else(|_| unreachable!());

        let status = event.status().unwrap_or_else(|_| unreachable!());

        assert!(!status.succeeded());
        assert_eq!(status.to_event().organizational_unit_id, "ou-work-00000001");
    }

    #[test]
    fn event_without_status_is_rejected() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{"detail": {"eventName": "SetupLandingZone", "serviceEventDetails": {}}}"#,
        )
        .unwrap_or_else(|_| unreachable!());

        assert!(matches!(event.status(), Err(AppError::Validation(_))));
    }
}
