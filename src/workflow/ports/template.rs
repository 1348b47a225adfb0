//! Repository port for workflow templates.

use crate::workflow::domain::{ScopeRef, TemplateId, TemplateName, TemplateType, WorkflowTemplate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for template repository operations.
pub type TemplateRepositoryResult<T> = Result<T, TemplateRepositoryError>;

/// Outcome of a system-default swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDefaultSwap {
    /// Template that held the flag before, if any and if different.
    pub previous: Option<WorkflowTemplate>,
    /// Template now holding the flag.
    pub current: WorkflowTemplate,
    /// `false` when the target already was the default.
    pub changed: bool,
}

/// Template persistence contract.
///
/// Names are unique per owning scope among active templates, compared
/// case-insensitively.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Stores a new template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateRepositoryError::DuplicateName`] when an active
    /// template of the same owner already uses the name.
    async fn insert(&self, template: &WorkflowTemplate) -> TemplateRepositoryResult<()>;

    /// Replaces a stored template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateRepositoryError::NotFound`] for unknown templates and
    /// [`TemplateRepositoryError::DuplicateName`] on a name clash.
    async fn update(&self, template: &WorkflowTemplate) -> TemplateRepositoryResult<()>;

    /// Deletes a template. Used only to undo an insert whose audit entry
    /// could not be written.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateRepositoryError::NotFound`] for unknown templates.
    async fn remove(&self, id: TemplateId) -> TemplateRepositoryResult<()>;

    /// Finds a template by identifier.
    async fn find(&self, id: TemplateId) -> TemplateRepositoryResult<Option<WorkflowTemplate>>;

    /// Finds an active template by owner and name.
    async fn find_by_name(
        &self,
        owner: &ScopeRef,
        name: &TemplateName,
    ) -> TemplateRepositoryResult<Option<WorkflowTemplate>>;

    /// Returns every template owned by one of `owners`, oldest first.
    async fn list_owned_by(
        &self,
        owners: &[ScopeRef],
    ) -> TemplateRepositoryResult<Vec<WorkflowTemplate>>;

    /// Returns the system default of `template_type`, if one is set.
    async fn system_default(
        &self,
        template_type: TemplateType,
    ) -> TemplateRepositoryResult<Option<WorkflowTemplate>>;

    /// Moves the system-default flag of `template_type` to `id` in one step.
    ///
    /// No reader ever observes two defaults for a type. Calling this for the
    /// current default changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateRepositoryError::NotFound`] for unknown templates and
    /// [`TemplateRepositoryError::NotEligible`] unless the template is an
    /// active system template of `template_type`.
    async fn swap_system_default(
        &self,
        id: TemplateId,
        template_type: TemplateType,
        at: DateTime<Utc>,
    ) -> TemplateRepositoryResult<SystemDefaultSwap>;
}

/// Errors returned by template repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TemplateRepositoryError {
    /// The owner already has an active template with this name.
    #[error("template name '{name}' already exists in scope {owner}")]
    DuplicateName {
        /// Owning scope.
        owner: ScopeRef,
        /// Clashing name.
        name: String,
    },

    /// The template was not found.
    #[error("template not found: {0}")]
    NotFound(TemplateId),

    /// The template cannot become the system default.
    #[error("template {id} cannot be the system default: {reason}")]
    NotEligible {
        /// Rejected template.
        id: TemplateId,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TemplateRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
