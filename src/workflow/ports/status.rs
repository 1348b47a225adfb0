//! Repository port for status records.

use crate::workflow::domain::{NameMatching, ScopeRef, Status, StatusName};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for status repository operations.
pub type StatusRepositoryResult<T> = Result<T, StatusRepositoryError>;

/// Status persistence contract. Records are keyed by owner and name.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StatusRepositoryError::DuplicateName`] when the owner already
    /// has a record whose name matches under `matching`.
    async fn insert(&self, status: &Status, matching: NameMatching) -> StatusRepositoryResult<()>;

    /// Replaces the record with the same owner and exact name.
    ///
    /// # Errors
    ///
    /// Returns [`StatusRepositoryError::NotFound`] when no such record exists.
    async fn update(&self, status: &Status) -> StatusRepositoryResult<()>;

    /// Finds the owner's record matching `name`.
    async fn find(
        &self,
        owner: &ScopeRef,
        name: &StatusName,
        matching: NameMatching,
    ) -> StatusRepositoryResult<Option<Status>>;

    /// Deletes the record with the given owner and exact name. Used only to
    /// undo an insert whose audit entry could not be written.
    ///
    /// # Errors
    ///
    /// Returns [`StatusRepositoryError::NotFound`] when no such record exists.
    async fn remove(&self, owner: &ScopeRef, name: &StatusName) -> StatusRepositoryResult<()>;

    /// Returns every record owned by one of `owners`.
    async fn list_owned_by(&self, owners: &[ScopeRef]) -> StatusRepositoryResult<Vec<Status>>;
}

/// Errors returned by status repository implementations.
#[derive(Debug, Clone, Error)]
pub enum StatusRepositoryError {
    /// The owner already defines this name.
    #[error("status '{name}' already exists in scope {owner}")]
    DuplicateName {
        /// Owning scope.
        owner: ScopeRef,
        /// Clashing name.
        name: StatusName,
    },

    /// No record for this owner and name.
    #[error("status '{name}' not found in scope {owner}")]
    NotFound {
        /// Owning scope.
        owner: ScopeRef,
        /// Requested name.
        name: StatusName,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StatusRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
