//! Service-level error taxonomy.

use crate::workflow::{
    domain::{ApprovalRequestId, ApprovalStatus, ScopeRef, StatusName, WorkflowDomainError},
    ports::{
        ActorDirectoryError, ApprovalRepositoryError, AuditSinkError, SettingsRepositoryError,
        StatusRepositoryError, TemplateRepositoryError, TodoRepositoryError,
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-facing classification of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed payload or unknown reference; fix the request.
    Validation,
    /// Scope or role violation.
    Forbidden,
    /// Concurrent mutation, duplicate or already resolved; re-fetch first.
    Conflict,
    /// Missing entity.
    NotFound,
    /// Source and target status are the same.
    NoOpTransition,
    /// Storage or serialisation failure.
    Internal,
}

impl ErrorKind {
    /// Stable error code used on the wire.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::NoOpTransition => "NO_OP_TRANSITION",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code an HTTP binding should answer with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Validation | Self::NoOpTransition => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// Errors returned by workflow services.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A value failed domain validation.
    #[error(transparent)]
    Domain(#[from] WorkflowDomainError),

    /// A request is malformed or references something unusable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The actor lacks the privilege for the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A status name collides with one the caller cannot shadow.
    #[error("status '{name}' already exists in scope {scope}")]
    DuplicateName {
        /// Clashing name.
        name: StatusName,
        /// Scope holding the existing status.
        scope: ScopeRef,
    },

    /// A concurrent or duplicate mutation was detected.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The approval request already left the pending state.
    #[error("approval request {id} is already {status}")]
    AlreadyResolved {
        /// Request.
        id: ApprovalRequestId,
        /// Terminal state.
        status: ApprovalStatus,
    },

    /// The entity does not exist or is not visible.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// Source and target status are the same.
    #[error("transition from '{status}' to itself is a no-op")]
    NoOpTransition {
        /// The repeated status.
        status: StatusName,
    },

    /// Template storage failed.
    #[error(transparent)]
    Templates(#[from] TemplateRepositoryError),

    /// Status storage failed.
    #[error(transparent)]
    Statuses(#[from] StatusRepositoryError),

    /// Settings storage failed.
    #[error(transparent)]
    Settings(#[from] SettingsRepositoryError),

    /// Approval storage failed.
    #[error(transparent)]
    Approvals(#[from] ApprovalRepositoryError),

    /// Task storage failed.
    #[error(transparent)]
    Todos(#[from] TodoRepositoryError),

    /// The audit write failed; the mutation was rolled back.
    #[error(transparent)]
    Audit(#[from] AuditSinkError),

    /// Actor lookup failed.
    #[error(transparent)]
    Directory(#[from] ActorDirectoryError),

    /// An audit snapshot could not be serialised.
    #[error("snapshot serialisation failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Creates a [`WorkflowError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a [`WorkflowError::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates a [`WorkflowError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a [`WorkflowError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Classifies the error for callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::DuplicateName { .. } | Self::Conflict(_) | Self::AlreadyResolved { .. } => {
                ErrorKind::Conflict
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NoOpTransition { .. } => ErrorKind::NoOpTransition,
            Self::Templates(err) => match err {
                TemplateRepositoryError::DuplicateName { .. }
                | TemplateRepositoryError::NotEligible { .. } => ErrorKind::Validation,
                TemplateRepositoryError::NotFound(_) => ErrorKind::NotFound,
                TemplateRepositoryError::Persistence(_) => ErrorKind::Internal,
            },
            Self::Statuses(err) => match err {
                StatusRepositoryError::DuplicateName { .. } => ErrorKind::Conflict,
                StatusRepositoryError::NotFound { .. } => ErrorKind::NotFound,
                StatusRepositoryError::Persistence(_) => ErrorKind::Internal,
            },
            Self::Approvals(err) => match err {
                ApprovalRepositoryError::PendingExists { .. }
                | ApprovalRepositoryError::NotPending { .. } => ErrorKind::Conflict,
                ApprovalRepositoryError::NotFound(_) => ErrorKind::NotFound,
                ApprovalRepositoryError::Persistence(_) => ErrorKind::Internal,
            },
            Self::Todos(err) => match err {
                TodoRepositoryError::VersionConflict { .. } => ErrorKind::Conflict,
                TodoRepositoryError::NotFound(_) => ErrorKind::NotFound,
                TodoRepositoryError::Persistence(_) => ErrorKind::Internal,
            },
            Self::Settings(_) | Self::Audit(_) | Self::Directory(_) | Self::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result type for workflow services.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
