//! In-memory settings repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::workflow::{
    domain::{ScopeRef, WorkflowSettings},
    ports::{SettingsRepository, SettingsRepositoryError, SettingsRepositoryResult},
};

/// Thread-safe in-memory settings repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsRepository {
    state: Arc<RwLock<HashMap<ScopeRef, WorkflowSettings>>>,
}

impl InMemorySettingsRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn find(&self, owner: &ScopeRef) -> SettingsRepositoryResult<Option<WorkflowSettings>> {
        let rows = self
            .state
            .read()
            .map_err(|err| SettingsRepositoryError::persistence(lock_error(&err)))?;
        Ok(rows.get(owner).cloned())
    }

    async fn find_chain(
        &self,
        owners: &[ScopeRef],
    ) -> SettingsRepositoryResult<Vec<WorkflowSettings>> {
        let rows = self
            .state
            .read()
            .map_err(|err| SettingsRepositoryError::persistence(lock_error(&err)))?;
        Ok(owners
            .iter()
            .filter_map(|owner| rows.get(owner).cloned())
            .collect())
    }

    async fn save(&self, settings: &WorkflowSettings) -> SettingsRepositoryResult<()> {
        let mut rows = self
            .state
            .write()
            .map_err(|err| SettingsRepositoryError::persistence(lock_error(&err)))?;
        rows.insert(settings.owner, settings.clone());
        Ok(())
    }
}
