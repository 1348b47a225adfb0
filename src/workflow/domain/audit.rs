//! Audit records of workflow mutations.

use super::{ActorId, AuditEntryId, CompanyId, PageRequest, ParseWorkflowEnumError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of audited mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOperation {
    /// A settings row changed.
    SettingsUpdated,
    /// A template was created or installed.
    TemplateCreated,
    /// A template was edited.
    TemplateUpdated,
    /// A template was soft-disabled.
    TemplateDeactivated,
    /// The system default of a template type moved.
    SystemDefaultChanged,
    /// A custom status was defined.
    StatusCreated,
    /// A status presentation was overridden.
    StatusOverridden,
    /// A custom status was soft-disabled.
    StatusDeactivated,
    /// A task changed status.
    TransitionExecuted,
    /// A gated transition opened an approval request.
    ApprovalRequested,
    /// An approval request was approved and executed.
    ApprovalApproved,
    /// An approval request was rejected.
    ApprovalRejected,
    /// An approval request was withdrawn.
    ApprovalCancelled,
}

impl AuditOperation {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SettingsUpdated => "SETTINGS_UPDATED",
            Self::TemplateCreated => "TEMPLATE_CREATED",
            Self::TemplateUpdated => "TEMPLATE_UPDATED",
            Self::TemplateDeactivated => "TEMPLATE_DEACTIVATED",
            Self::SystemDefaultChanged => "SYSTEM_DEFAULT_CHANGED",
            Self::StatusCreated => "STATUS_CREATED",
            Self::StatusOverridden => "STATUS_OVERRIDDEN",
            Self::StatusDeactivated => "STATUS_DEACTIVATED",
            Self::TransitionExecuted => "TRANSITION_EXECUTED",
            Self::ApprovalRequested => "APPROVAL_REQUESTED",
            Self::ApprovalApproved => "APPROVAL_APPROVED",
            Self::ApprovalRejected => "APPROVAL_REJECTED",
            Self::ApprovalCancelled => "APPROVAL_CANCELLED",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AuditOperation {
    type Error = ParseWorkflowEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let upper = value.trim().to_ascii_uppercase();
        [
            Self::SettingsUpdated,
            Self::TemplateCreated,
            Self::TemplateUpdated,
            Self::TemplateDeactivated,
            Self::SystemDefaultChanged,
            Self::StatusCreated,
            Self::StatusOverridden,
            Self::StatusDeactivated,
            Self::TransitionExecuted,
            Self::ApprovalRequested,
            Self::ApprovalApproved,
            Self::ApprovalRejected,
            Self::ApprovalCancelled,
        ]
        .into_iter()
        .find(|operation| operation.as_str() == upper)
        .ok_or_else(|| ParseWorkflowEnumError::new("audit operation", value))
    }
}

/// Kind of audited entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditTargetType {
    /// A workflow template.
    Template,
    /// A status record.
    Status,
    /// A settings row.
    Settings,
    /// A task.
    Todo,
    /// An approval request.
    ApprovalRequest,
}

/// The entity an audit entry refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTarget {
    /// Entity kind.
    #[serde(rename = "type")]
    pub target_type: AuditTargetType,
    /// Entity identifier in its textual form.
    pub id: String,
}

impl AuditTarget {
    /// Creates a target reference.
    #[must_use]
    pub fn new(target_type: AuditTargetType, id: impl fmt::Display) -> Self {
        Self {
            target_type,
            id: id.to_string(),
        }
    }
}

/// An audit record before the sink assigns identity and sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    /// Mutation kind.
    pub operation: AuditOperation,
    /// Acting user; `None` for start-up installation.
    pub actor_id: Option<ActorId>,
    /// Tenant; `None` for system-wide changes.
    pub company_id: Option<CompanyId>,
    /// Affected entity.
    pub target: AuditTarget,
    /// Snapshot before the mutation.
    pub before: Option<serde_json::Value>,
    /// Snapshot after the mutation.
    pub after: Option<serde_json::Value>,
    /// Free-text reason supplied by the actor.
    pub reason: Option<String>,
    /// Related identifiers that are not the target.
    pub metadata: Option<serde_json::Value>,
    /// Mutation time.
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Creates a record without snapshots.
    #[must_use]
    pub const fn new(
        operation: AuditOperation,
        target: AuditTarget,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            operation,
            actor_id: None,
            company_id: None,
            target,
            before: None,
            after: None,
            reason: None,
            metadata: None,
            recorded_at,
        }
    }

    /// Sets the acting user.
    #[must_use]
    pub const fn with_actor(mut self, actor_id: ActorId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Sets the tenant.
    #[must_use]
    pub const fn with_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    /// Sets the before snapshot.
    #[must_use]
    pub fn with_before(mut self, before: serde_json::Value) -> Self {
        self.before = Some(before);
        self
    }

    /// Sets the after snapshot.
    #[must_use]
    pub fn with_after(mut self, after: serde_json::Value) -> Self {
        self.after = Some(after);
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Sets related identifiers.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// An immutable, sequenced audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: AuditEntryId,
    /// Global, strictly increasing sequence number.
    pub sequence: u64,
    /// Mutation kind.
    pub operation: AuditOperation,
    /// Acting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
    /// Tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    /// Affected entity.
    pub target: AuditTarget,
    /// Snapshot before the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    /// Snapshot after the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
    /// Free-text reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Related identifiers that are not the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Mutation time.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Seals a record with its identity and sequence.
    #[must_use]
    pub fn from_record(record: AuditRecord, sequence: u64) -> Self {
        Self {
            id: AuditEntryId::new(),
            sequence,
            operation: record.operation,
            actor_id: record.actor_id,
            company_id: record.company_id,
            target: record.target,
            before: record.before,
            after: record.after,
            reason: record.reason,
            metadata: record.metadata,
            recorded_at: record.recorded_at,
        }
    }
}

/// Filters for audit queries. Unset fields match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFilter {
    /// Tenant; always set by the query service.
    pub company_id: CompanyId,
    /// Also match tenant-less entries written by start-up system changes.
    pub include_system: bool,
    /// Acting user.
    pub actor_id: Option<ActorId>,
    /// Mutation kind.
    pub operation: Option<AuditOperation>,
    /// Affected entity.
    pub target: Option<AuditTarget>,
    /// Inclusive lower time bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper time bound.
    pub to: Option<DateTime<Utc>>,
    /// Requested page.
    pub page: PageRequest,
}

impl AuditFilter {
    /// Creates a filter for one tenant with no further restrictions.
    #[must_use]
    pub const fn for_company(company_id: CompanyId, page: PageRequest) -> Self {
        Self {
            company_id,
            include_system: false,
            actor_id: None,
            operation: None,
            target: None,
            from: None,
            to: None,
            page,
        }
    }

    /// Returns `true` when `entry` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        let tenant = match entry.company_id {
            Some(company_id) => company_id == self.company_id,
            None => self.include_system,
        };
        tenant
            && self.actor_id.is_none_or(|id| entry.actor_id == Some(id))
            && self.operation.is_none_or(|op| entry.operation == op)
            && self
                .target
                .as_ref()
                .is_none_or(|target| entry.target == *target)
            && self.from.is_none_or(|from| entry.recorded_at >= from)
            && self.to.is_none_or(|to| entry.recorded_at <= to)
    }
}
