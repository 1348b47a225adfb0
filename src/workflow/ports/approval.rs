//! Repository port for approval requests.

use crate::workflow::domain::{
    ApprovalRequest, ApprovalRequestId, ApprovalStatus, CompanyId, Resolution, TodoId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for approval repository operations.
pub type ApprovalRepositoryResult<T> = Result<T, ApprovalRepositoryError>;

/// Approval request persistence contract.
///
/// Implementations enforce both lifecycle invariants atomically: at most one
/// pending request per task, and a single winner for each resolution.
#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    /// Stores a new pending request.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalRepositoryError::PendingExists`] when the task
    /// already has a pending request.
    async fn insert_pending(&self, request: &ApprovalRequest) -> ApprovalRepositoryResult<()>;

    /// Finds a request by identifier.
    async fn find(
        &self,
        id: ApprovalRequestId,
    ) -> ApprovalRepositoryResult<Option<ApprovalRequest>>;

    /// Returns the pending request of `todo_id`, if any.
    async fn pending_for_todo(
        &self,
        todo_id: TodoId,
    ) -> ApprovalRepositoryResult<Option<ApprovalRequest>>;

    /// Returns the pending requests of a tenant, oldest first.
    async fn list_pending(
        &self,
        company_id: CompanyId,
    ) -> ApprovalRepositoryResult<Vec<ApprovalRequest>>;

    /// Claims a pending request for a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalRepositoryError::NotPending`] when another writer
    /// resolved it first and [`ApprovalRepositoryError::NotFound`] for unknown
    /// requests.
    async fn resolve(
        &self,
        id: ApprovalRequestId,
        resolution: Resolution,
    ) -> ApprovalRepositoryResult<ApprovalRequest>;

    /// Returns a claimed request to pending after its follow-up failed.
    async fn reopen(&self, id: ApprovalRequestId) -> ApprovalRepositoryResult<ApprovalRequest>;

    /// Removes a pending request whose creation could not be audited.
    async fn discard(&self, id: ApprovalRequestId) -> ApprovalRepositoryResult<()>;
}

/// Errors returned by approval repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ApprovalRepositoryError {
    /// The task already has a pending request.
    #[error("todo {todo_id} already has pending approval request {existing}")]
    PendingExists {
        /// Task.
        todo_id: TodoId,
        /// The pending request.
        existing: ApprovalRequestId,
    },

    /// The request was not found.
    #[error("approval request not found: {0}")]
    NotFound(ApprovalRequestId),

    /// The request already left the pending state.
    #[error("approval request {id} is already {status}")]
    NotPending {
        /// Request.
        id: ApprovalRequestId,
        /// Current state.
        status: ApprovalStatus,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ApprovalRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
