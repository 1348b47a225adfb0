//! Approval requests spawned by gated transitions.

use super::{
    ActorId, ApprovalRequestId, CompanyId, ParseWorkflowEnumError, Role, StatusName, TemplateId,
    TodoId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle state of an approval request.
///
/// `Pending` moves to exactly one terminal state and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved; the transition was executed.
    Approved,
    /// Rejected; the task was left untouched.
    Rejected,
    /// Withdrawn before a decision.
    Cancelled,
}

impl ApprovalStatus {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns `true` for final states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ApprovalStatus {
    type Error = ParseWorkflowEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseWorkflowEnumError::new("approval status", value)),
        }
    }
}

/// A decision recorded on a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Terminal state to enter.
    pub outcome: ApprovalStatus,
    /// Deciding actor.
    pub resolved_by: ActorId,
    /// Rejection reason or approval comments.
    pub note: Option<String>,
    /// Decision time.
    pub at: DateTime<Utc>,
}

/// Data needed to open a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalDraft {
    /// Task whose transition is gated.
    pub todo_id: TodoId,
    /// Template that gated it.
    pub template_id: TemplateId,
    /// Tenant.
    pub company_id: CompanyId,
    /// Status before the transition.
    pub from: StatusName,
    /// Task version the request holds while pending.
    pub todo_version: u64,
    /// Requested status.
    pub to: StatusName,
    /// Requesting actor.
    pub requested_by: ActorId,
    /// Roles allowed to decide.
    pub required_approver_roles: BTreeSet<Role>,
    /// Requester's justification.
    pub request_reason: Option<String>,
}

/// A stored approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    id: ApprovalRequestId,
    todo_id: TodoId,
    template_id: TemplateId,
    company_id: CompanyId,
    from_status: StatusName,
    todo_version: u64,
    to_status: StatusName,
    requested_by: ActorId,
    required_approver_roles: BTreeSet<Role>,
    status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comments: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolved_by: Option<ActorId>,
}

impl ApprovalRequest {
    /// Opens a pending request.
    #[must_use]
    pub fn new(draft: ApprovalDraft, clock: &impl Clock) -> Self {
        Self {
            id: ApprovalRequestId::new(),
            todo_id: draft.todo_id,
            template_id: draft.template_id,
            company_id: draft.company_id,
            from_status: draft.from,
            todo_version: draft.todo_version,
            to_status: draft.to,
            requested_by: draft.requested_by,
            required_approver_roles: draft.required_approver_roles,
            status: ApprovalStatus::Pending,
            request_reason: draft.request_reason,
            reason: None,
            comments: None,
            created_at: clock.utc(),
            resolved_at: None,
            resolved_by: None,
        }
    }

    /// Returns the request identifier.
    #[must_use]
    pub const fn id(&self) -> ApprovalRequestId {
        self.id
    }

    /// Returns the gated task.
    #[must_use]
    pub const fn todo_id(&self) -> TodoId {
        self.todo_id
    }

    /// Returns the template that gated the transition.
    #[must_use]
    pub const fn template_id(&self) -> TemplateId {
        self.template_id
    }

    /// Returns the tenant.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the status before the transition.
    #[must_use]
    pub const fn from_status(&self) -> &StatusName {
        &self.from_status
    }

    /// Returns the task version reserved when the request was opened.
    #[must_use]
    pub const fn todo_version(&self) -> u64 {
        self.todo_version
    }

    /// Returns the requested status.
    #[must_use]
    pub const fn to_status(&self) -> &StatusName {
        &self.to_status
    }

    /// Returns the requester.
    #[must_use]
    pub const fn requested_by(&self) -> ActorId {
        self.requested_by
    }

    /// Returns roles allowed to decide.
    #[must_use]
    pub const fn required_approver_roles(&self) -> &BTreeSet<Role> {
        &self.required_approver_roles
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn status(&self) -> ApprovalStatus {
        self.status
    }

    /// Returns the requester's justification.
    #[must_use]
    pub fn request_reason(&self) -> Option<&str> {
        self.request_reason.as_deref()
    }

    /// Returns the rejection or cancellation reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns approval comments.
    #[must_use]
    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the decision time.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Returns the deciding actor.
    #[must_use]
    pub const fn resolved_by(&self) -> Option<ActorId> {
        self.resolved_by
    }

    /// Returns `true` while awaiting a decision.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, ApprovalStatus::Pending)
    }

    /// Moves the request into a terminal state.
    ///
    /// # Errors
    ///
    /// Returns the current status when the request is not pending or when
    /// `resolution.outcome` is not terminal.
    pub fn resolve(&mut self, resolution: Resolution) -> Result<(), ApprovalStatus> {
        if !self.is_pending() || !resolution.outcome.is_terminal() {
            return Err(self.status);
        }
        self.status = resolution.outcome;
        match resolution.outcome {
            ApprovalStatus::Approved => self.comments = resolution.note,
            _ => self.reason = resolution.note,
        }
        self.resolved_at = Some(resolution.at);
        self.resolved_by = Some(resolution.resolved_by);
        Ok(())
    }

    /// Restores the pending state after a failed follow-up of a resolution.
    pub fn reopen(&mut self) {
        self.status = ApprovalStatus::Pending;
        self.reason = None;
        self.comments = None;
        self.resolved_at = None;
        self.resolved_by = None;
    }
}
