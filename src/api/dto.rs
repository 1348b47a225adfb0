//! Request bodies and query parameters of the workflow endpoints.
//!
//! Field names follow the camelCase wire format. Conversions into service
//! payloads validate enum strings so malformed values surface as validation
//! errors rather than deserialisation failures.

use crate::workflow::{
    domain::{
        ActorId, ApprovalRequestId, AuditOperation, AuditTarget, AuditTargetType, ColumnSpec,
        Role, Scope, StatusName, Styling, TemplateId, TemplatePatch, TemplateType, TodoId,
    },
    services::{
        ApprovalRequestCommand, AuditQuery, CreateTemplate, NewStatus, StatusOverride,
        TemplateQuery, TransitionCommand, WorkflowError, WorkflowResult,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET /workflows/templates` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListParams {
    /// Template type filter.
    #[serde(default, rename = "type")]
    pub template_type: Option<String>,
    /// Activity filter.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// One-based page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl TryFrom<TemplateListParams> for TemplateQuery {
    type Error = WorkflowError;

    fn try_from(params: TemplateListParams) -> WorkflowResult<Self> {
        let template_type = params
            .template_type
            .as_deref()
            .map(TemplateType::try_from)
            .transpose()
            .map_err(|err| WorkflowError::validation(err.to_string()))?;
        Ok(Self {
            template_type,
            is_active: params.is_active,
            page: params.page,
            limit: params.limit,
        })
    }
}

/// `POST /workflows/templates` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateBody {
    /// Template name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Template type.
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    /// Owning scope tier; personal when absent.
    #[serde(default)]
    pub scope: Option<Scope>,
    /// Columns.
    pub columns: Vec<ColumnSpec>,
    /// Approver roles; configured defaults when absent.
    #[serde(default)]
    pub approver_roles: Option<Vec<Role>>,
}

impl From<CreateTemplateBody> for CreateTemplate {
    fn from(body: CreateTemplateBody) -> Self {
        let mut payload = Self::new(body.name, body.template_type, body.columns)
            .in_scope(body.scope.unwrap_or(Scope::Personal));
        if let Some(description) = body.description {
            payload = payload.with_description(description);
        }
        if let Some(roles) = body.approver_roles {
            payload = payload.with_approver_roles(roles);
        }
        payload
    }
}

/// `PUT /workflows/templates/{id}` body. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateBody {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New type.
    #[serde(default, rename = "type")]
    pub template_type: Option<TemplateType>,
    /// Replacement columns.
    #[serde(default)]
    pub columns: Option<Vec<ColumnSpec>>,
    /// Replacement approver roles.
    #[serde(default)]
    pub approver_roles: Option<Vec<Role>>,
    /// Reactivates or deactivates the template.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<UpdateTemplateBody> for TemplatePatch {
    fn from(body: UpdateTemplateBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            template_type: body.template_type,
            columns: body.columns,
            approver_roles: body.approver_roles.map(|roles| roles.into_iter().collect()),
            is_active: body.is_active,
        }
    }
}

/// `POST /workflows/statuses` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatusBody {
    /// Owning scope tier.
    pub scope: Scope,
    /// Stable name.
    pub name: StatusName,
    /// Label; defaults to the name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Presentation.
    #[serde(default)]
    pub styling: Styling,
}

impl From<CreateStatusBody> for NewStatus {
    fn from(body: CreateStatusBody) -> Self {
        let display_name = body
            .display_name
            .unwrap_or_else(|| body.name.as_str().to_owned());
        Self {
            scope: body.scope,
            name: body.name,
            display_name,
            styling: body.styling,
        }
    }
}

/// `PUT /workflows/statuses/{name}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideStatusBody {
    /// Scope tier owning the override.
    pub scope: Scope,
    /// New label.
    #[serde(default)]
    pub display_name: Option<String>,
    /// New presentation.
    #[serde(default)]
    pub styling: Option<Styling>,
}

impl OverrideStatusBody {
    /// Combines the body with the status named in the path.
    #[must_use]
    pub fn into_override(self, name: StatusName) -> StatusOverride {
        StatusOverride {
            scope: self.scope,
            name,
            display_name: self.display_name,
            styling: self.styling,
        }
    }
}

/// `POST /workflows/approvals/request` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestApprovalBody {
    /// Template whose approver roles apply.
    pub workflow_id: TemplateId,
    /// Task to move.
    pub todo_id: TodoId,
    /// Requested status.
    pub to_status: StatusName,
    /// Justification.
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<RequestApprovalBody> for ApprovalRequestCommand {
    fn from(body: RequestApprovalBody) -> Self {
        Self {
            workflow_id: body.workflow_id,
            todo_id: body.todo_id,
            to: body.to_status,
            reason: body.reason,
        }
    }
}

/// `POST /workflows/approvals/approve` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody {
    /// Request to approve.
    pub approval_id: ApprovalRequestId,
    /// Approver's remarks.
    #[serde(default)]
    pub comments: Option<String>,
}

/// `POST /workflows/approvals/reject` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectBody {
    /// Request to reject.
    pub approval_id: ApprovalRequestId,
    /// Mandatory reason.
    #[serde(default)]
    pub reason: String,
}

/// `POST /workflows/approvals/cancel` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    /// Request to withdraw.
    pub approval_id: ApprovalRequestId,
    /// Optional reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST /workflows/apply` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTransitionBody {
    /// Task to move.
    pub todo_id: TodoId,
    /// Status the caller last saw.
    pub from_status: StatusName,
    /// Requested status.
    pub to_status: StatusName,
    /// Optional reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Version the caller last saw.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl From<ApplyTransitionBody> for TransitionCommand {
    fn from(body: ApplyTransitionBody) -> Self {
        Self {
            todo_id: body.todo_id,
            from: body.from_status,
            to: body.to_status,
            reason: body.reason,
            expected_version: body.expected_version,
        }
    }
}

/// `GET /workflows/audit` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogParams {
    /// Acting user filter.
    #[serde(default)]
    pub user_id: Option<ActorId>,
    /// Operation filter, e.g. `TRANSITION_EXECUTED`.
    #[serde(default)]
    pub operation: Option<String>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Target kind; only used together with `target_id`.
    #[serde(default)]
    pub target_type: Option<AuditTargetType>,
    /// Target identifier.
    #[serde(default)]
    pub target_id: Option<String>,
    /// One-based page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl TryFrom<AuditLogParams> for AuditQuery {
    type Error = WorkflowError;

    fn try_from(params: AuditLogParams) -> WorkflowResult<Self> {
        let operation = params
            .operation
            .as_deref()
            .map(AuditOperation::try_from)
            .transpose()
            .map_err(|err| WorkflowError::validation(err.to_string()))?;
        let target = match (params.target_type, params.target_id) {
            (Some(target_type), Some(id)) => Some(AuditTarget::new(target_type, id)),
            (None, None) => None,
            _ => {
                return Err(WorkflowError::validation(
                    "targetType and targetId must be given together",
                ));
            }
        };
        Ok(Self {
            actor_id: params.user_id,
            operation,
            target,
            from: params.start_date,
            to: params.end_date,
            page: params.page,
            limit: params.limit,
        })
    }
}

/// `PUT /workflows/templates/{id}/system-default` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSystemDefaultBody {
    /// Template type whose default moves.
    #[serde(rename = "type")]
    pub template_type: TemplateType,
}
