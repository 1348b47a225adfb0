//! Storage port for the status of tasks.

use crate::workflow::domain::{TodoId, TodoRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for todo repository operations.
pub type TodoRepositoryResult<T> = Result<T, TodoRepositoryError>;

/// Read-modify-write access to task status.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Finds a task by identifier.
    async fn find(&self, id: TodoId) -> TodoRepositoryResult<Option<TodoRecord>>;

    /// Replaces the task with `record` if its stored version still equals
    /// `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`TodoRepositoryError::VersionConflict`] when the stored
    /// version has advanced and [`TodoRepositoryError::NotFound`] for unknown
    /// tasks.
    async fn compare_and_set(
        &self,
        record: &TodoRecord,
        expected_version: u64,
    ) -> TodoRepositoryResult<()>;
}

/// Errors returned by todo repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TodoRepositoryError {
    /// The task was not found.
    #[error("todo not found: {0}")]
    NotFound(TodoId),

    /// The stored version differs from the expected one.
    #[error("todo {id} is at version {actual}, expected {expected}")]
    VersionConflict {
        /// Task.
        id: TodoId,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TodoRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
