//! Port contracts for the workflow engine.
//!
//! Every collaborator is injected once at start-up through
//! [`WorkflowPorts`]; services never choose between implementations at call
//! sites.

pub mod approval;
pub mod audit;
pub mod directory;
pub mod notification;
pub mod settings;
pub mod status;
pub mod template;
pub mod todo;

pub use approval::{ApprovalRepository, ApprovalRepositoryError, ApprovalRepositoryResult};
pub use audit::{AuditSink, AuditSinkError, AuditSinkResult};
pub use directory::{ActorDirectory, ActorDirectoryError};
pub use notification::{NotificationError, NotificationSink};
pub use settings::{SettingsRepository, SettingsRepositoryError, SettingsRepositoryResult};
pub use status::{StatusRepository, StatusRepositoryError, StatusRepositoryResult};
pub use template::{
    SystemDefaultSwap, TemplateRepository, TemplateRepositoryError, TemplateRepositoryResult,
};
pub use todo::{TodoRepository, TodoRepositoryError, TodoRepositoryResult};

use std::sync::Arc;

/// The collaborators a workflow engine runs against.
#[derive(Clone)]
pub struct WorkflowPorts {
    /// Template storage.
    pub templates: Arc<dyn TemplateRepository>,
    /// Status storage.
    pub statuses: Arc<dyn StatusRepository>,
    /// Settings storage.
    pub settings: Arc<dyn SettingsRepository>,
    /// Approval request storage.
    pub approvals: Arc<dyn ApprovalRepository>,
    /// Task status storage.
    pub todos: Arc<dyn TodoRepository>,
    /// Audit log.
    pub audit: Arc<dyn AuditSink>,
    /// Notification dispatch.
    pub notifications: Arc<dyn NotificationSink>,
    /// Actor lookup.
    pub directory: Arc<dyn ActorDirectory>,
}

impl WorkflowPorts {
    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the task status store.
    #[must_use]
    pub fn with_todos(mut self, todos: Arc<dyn TodoRepository>) -> Self {
        self.todos = todos;
        self
    }

    /// Replaces the notification sink.
    #[must_use]
    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationSink>) -> Self {
        self.notifications = notifications;
        self
    }
}
