//! Domain model for the workflow engine.
//!
//! Everything here is pure: the status catalog merge, the settings fallback
//! merge, template validation and the transition decision take their inputs
//! as values and never touch storage.

mod access;
mod approval;
mod audit;
mod error;
mod event;
mod ids;
mod page;
mod settings;
mod status;
mod template;
mod todo;
mod transition;

pub use access::{Actor, Audience, Role, Scope, ScopeRef};
pub use approval::{ApprovalDraft, ApprovalRequest, ApprovalStatus, Resolution};
pub use audit::{
    AuditEntry, AuditFilter, AuditOperation, AuditRecord, AuditTarget, AuditTargetType,
};
pub use error::{ParseWorkflowEnumError, WorkflowDomainError};
pub use event::WorkflowEvent;
pub use ids::{
    ActorId, ApprovalRequestId, AuditEntryId, ColumnId, CompanyId, TeamId, TemplateId, TodoId,
};
pub use page::{Page, PageRequest};
pub use settings::{
    DEFAULT_ALLOW_CUSTOM_STATUS, DEFAULT_AUTO_TRANSITION, DEFAULT_NOTIFICATION_ENABLED,
    ResolvedSettings, SettingsPatch, SettingsSources, WorkflowSettings, merge_settings,
};
pub use status::{
    HexColor, NameMatching, ResolvedStatus, Status, StatusCatalog, StatusKind, StatusName,
    Styling,
};
pub use template::{
    Column, ColumnSpec, MAX_DESCRIPTION_LEN, TemplateDraft, TemplateName, TemplateOwnership,
    TemplatePatch, TemplateType, WorkflowTemplate, build_columns,
};
pub use todo::TodoRecord;
pub use transition::{
    ApprovalTrigger, DenyReason, TransitionContext, TransitionDecision, decide,
};
