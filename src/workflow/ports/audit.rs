//! Append-only audit sink port.

use crate::workflow::domain::{AuditEntry, AuditFilter, AuditRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for audit sink operations.
pub type AuditSinkResult<T> = Result<T, AuditSinkError>;

/// Durable, append-only audit log.
///
/// An append that returns `Ok` is the durability boundary of a mutation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends a record, assigning the next sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`AuditSinkError::Persistence`] when the entry could not be
    /// stored.
    async fn append(&self, record: AuditRecord) -> AuditSinkResult<AuditEntry>;

    /// Returns every entry matching `filter`, ordered by sequence. The
    /// filter's page is ignored.
    async fn query(&self, filter: &AuditFilter) -> AuditSinkResult<Vec<AuditEntry>>;
}

/// Errors returned by audit sink implementations.
#[derive(Debug, Clone, Error)]
pub enum AuditSinkError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AuditSinkError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
