//! Fire-and-forget notification port.

use crate::workflow::domain::WorkflowEvent;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Receives committed workflow events. Failures are logged by the caller
/// and never affect the outcome of the mutation.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers `event`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when delivery failed.
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotificationError>;
}

/// Delivery failure.
#[derive(Debug, Clone, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(Arc<dyn std::error::Error + Send + Sync>);

impl NotificationError {
    /// Wraps a delivery error.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}
