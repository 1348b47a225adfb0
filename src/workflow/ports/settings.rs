//! Repository port for settings rows.

use crate::workflow::domain::{ScopeRef, WorkflowSettings};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for settings repository operations.
pub type SettingsRepositoryResult<T> = Result<T, SettingsRepositoryError>;

/// Settings persistence contract: one row per scope owner.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Finds the row of `owner`.
    async fn find(&self, owner: &ScopeRef) -> SettingsRepositoryResult<Option<WorkflowSettings>>;

    /// Returns the stored rows of `owners`, preserving the given order and
    /// skipping owners without a row.
    async fn find_chain(
        &self,
        owners: &[ScopeRef],
    ) -> SettingsRepositoryResult<Vec<WorkflowSettings>>;

    /// Inserts or replaces the row of `settings.owner`.
    async fn save(&self, settings: &WorkflowSettings) -> SettingsRepositoryResult<()>;
}

/// Errors returned by settings repository implementations.
#[derive(Debug, Clone, Error)]
pub enum SettingsRepositoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SettingsRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
