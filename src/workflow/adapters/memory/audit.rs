//! In-memory audit log.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::workflow::{
    domain::{AuditEntry, AuditFilter, AuditRecord},
    ports::{AuditSink, AuditSinkError, AuditSinkResult},
};

/// Thread-safe append-only audit log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    state: Arc<RwLock<InMemoryAuditState>>,
}

#[derive(Debug, Default)]
struct InMemoryAuditState {
    entries: Vec<AuditEntry>,
    next_sequence: u64,
}

impl InMemoryAuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every entry, ordered by sequence.
    ///
    /// # Errors
    ///
    /// Returns [`AuditSinkError::Persistence`] when the lock is poisoned.
    pub fn entries(&self) -> AuditSinkResult<Vec<AuditEntry>> {
        let state = self
            .state
            .read()
            .map_err(|err| AuditSinkError::persistence(lock_error(&err)))?;
        Ok(state.entries.clone())
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn append(&self, record: AuditRecord) -> AuditSinkResult<AuditEntry> {
        let mut state = self
            .state
            .write()
            .map_err(|err| AuditSinkError::persistence(lock_error(&err)))?;
        state.next_sequence += 1;
        let entry = AuditEntry::from_record(record, state.next_sequence);
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn query(&self, filter: &AuditFilter) -> AuditSinkResult<Vec<AuditEntry>> {
        let state = self
            .state
            .read()
            .map_err(|err| AuditSinkError::persistence(lock_error(&err)))?;
        Ok(state
            .entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }
}
