//! Events handed to the notification collaborator.

use super::{ActorId, ApprovalRequestId, ApprovalStatus, CompanyId, StatusName, TodoId};
use serde::{Deserialize, Serialize};

/// A committed workflow change worth telling someone about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowEvent {
    /// A task changed status.
    #[serde(rename_all = "camelCase")]
    TransitionExecuted {
        /// Tenant.
        company_id: CompanyId,
        /// Task.
        todo_id: TodoId,
        /// Previous status.
        from: StatusName,
        /// New status.
        to: StatusName,
        /// Actor that triggered the change.
        actor_id: ActorId,
    },
    /// A gated transition awaits approval.
    #[serde(rename_all = "camelCase")]
    ApprovalRequested {
        /// Tenant.
        company_id: CompanyId,
        /// Request.
        request_id: ApprovalRequestId,
        /// Task.
        todo_id: TodoId,
        /// Requested status.
        to: StatusName,
        /// Requester.
        requested_by: ActorId,
    },
    /// An approval request reached a terminal state.
    #[serde(rename_all = "camelCase")]
    ApprovalResolved {
        /// Tenant.
        company_id: CompanyId,
        /// Request.
        request_id: ApprovalRequestId,
        /// Task.
        todo_id: TodoId,
        /// Terminal state.
        status: ApprovalStatus,
        /// Deciding actor.
        resolved_by: ActorId,
    },
}

impl WorkflowEvent {
    /// Tenant the event belongs to.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        match self {
            Self::TransitionExecuted { company_id, .. }
            | Self::ApprovalRequested { company_id, .. }
            | Self::ApprovalResolved { company_id, .. } => *company_id,
        }
    }

    /// Short event name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TransitionExecuted { .. } => "transition_executed",
            Self::ApprovalRequested { .. } => "approval_requested",
            Self::ApprovalResolved { .. } => "approval_resolved",
        }
    }
}
