//! In-memory adapters for every workflow port.

mod approval;
mod audit;
mod directory;
mod settings;
mod status;
mod template;
mod todo;

pub use approval::InMemoryApprovalRepository;
pub use audit::InMemoryAuditLog;
pub use directory::InMemoryActorDirectory;
pub use settings::InMemorySettingsRepository;
pub use status::InMemoryStatusRepository;
pub use template::InMemoryTemplateRepository;
pub use todo::InMemoryTodoRepository;

use super::TracingNotificationSink;
use crate::workflow::ports::WorkflowPorts;
use std::sync::Arc;

fn lock_error(err: &impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(err.to_string())
}

/// Concrete in-memory stores, kept so tests and embedders can seed tasks and
/// actors and inspect the audit log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowStores {
    /// Templates.
    pub templates: InMemoryTemplateRepository,
    /// Statuses.
    pub statuses: InMemoryStatusRepository,
    /// Settings.
    pub settings: InMemorySettingsRepository,
    /// Approval requests.
    pub approvals: InMemoryApprovalRepository,
    /// Task statuses.
    pub todos: InMemoryTodoRepository,
    /// Audit log.
    pub audit: InMemoryAuditLog,
    /// Actor directory.
    pub directory: InMemoryActorDirectory,
}

impl InMemoryWorkflowStores {
    /// Creates empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundles the stores as ports, notifying through `tracing`.
    #[must_use]
    pub fn ports(&self) -> WorkflowPorts {
        WorkflowPorts {
            templates: Arc::new(self.templates.clone()),
            statuses: Arc::new(self.statuses.clone()),
            settings: Arc::new(self.settings.clone()),
            approvals: Arc::new(self.approvals.clone()),
            todos: Arc::new(self.todos.clone()),
            audit: Arc::new(self.audit.clone()),
            notifications: Arc::new(TracingNotificationSink),
            directory: Arc::new(self.directory.clone()),
        }
    }
}
