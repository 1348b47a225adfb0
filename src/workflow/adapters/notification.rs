//! Notification sinks.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::workflow::{
    domain::WorkflowEvent,
    ports::{NotificationError, NotificationSink},
};

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotificationError> {
        tracing::info!(
            event = event.name(),
            company_id = %event.company_id(),
            payload = ?event,
            "workflow notification"
        );
        Ok(())
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationSink;

#[async_trait]
impl NotificationSink for NoopNotificationSink {
    async fn notify(&self, _event: &WorkflowEvent) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// Keeps every event in memory for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationSink {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl RecordingNotificationSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotificationError> {
        let mut events = self
            .events
            .lock()
            .map_err(|err| NotificationError::new(std::io::Error::other(err.to_string())))?;
        events.push(event.clone());
        Ok(())
    }
}
