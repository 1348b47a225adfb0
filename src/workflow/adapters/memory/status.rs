//! In-memory status repository.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::workflow::{
    domain::{NameMatching, ScopeRef, Status, StatusName},
    ports::{StatusRepository, StatusRepositoryError, StatusRepositoryResult},
};

/// Thread-safe in-memory status repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatusRepository {
    state: Arc<RwLock<Vec<Status>>>,
}

impl InMemoryStatusRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusRepository for InMemoryStatusRepository {
    async fn insert(&self, status: &Status, matching: NameMatching) -> StatusRepositoryResult<()> {
        let mut records = self
            .state
            .write()
            .map_err(|err| StatusRepositoryError::persistence(lock_error(&err)))?;
        let clash = records.iter().any(|existing| {
            existing.owner == status.owner && matching.same(&existing.name, &status.name)
        });
        if clash {
            return Err(StatusRepositoryError::DuplicateName {
                owner: status.owner,
                name: status.name.clone(),
            });
        }
        records.push(status.clone());
        Ok(())
    }

    async fn update(&self, status: &Status) -> StatusRepositoryResult<()> {
        let mut records = self
            .state
            .write()
            .map_err(|err| StatusRepositoryError::persistence(lock_error(&err)))?;
        let existing = records
            .iter_mut()
            .find(|existing| existing.owner == status.owner && existing.name == status.name)
            .ok_or_else(|| StatusRepositoryError::NotFound {
                owner: status.owner,
                name: status.name.clone(),
            })?;
        *existing = status.clone();
        Ok(())
    }

    async fn find(
        &self,
        owner: &ScopeRef,
        name: &StatusName,
        matching: NameMatching,
    ) -> StatusRepositoryResult<Option<Status>> {
        let records = self
            .state
            .read()
            .map_err(|err| StatusRepositoryError::persistence(lock_error(&err)))?;
        Ok(records
            .iter()
            .find(|status| status.owner == *owner && matching.same(&status.name, name))
            .cloned())
    }

    async fn remove(&self, owner: &ScopeRef, name: &StatusName) -> StatusRepositoryResult<()> {
        let mut records = self
            .state
            .write()
            .map_err(|err| StatusRepositoryError::persistence(lock_error(&err)))?;
        let before = records.len();
        records.retain(|status| !(status.owner == *owner && status.name == *name));
        if records.len() == before {
            return Err(StatusRepositoryError::NotFound {
                owner: *owner,
                name: name.clone(),
            });
        }
        Ok(())
    }

    async fn list_owned_by(&self, owners: &[ScopeRef]) -> StatusRepositoryResult<Vec<Status>> {
        let records = self
            .state
            .read()
            .map_err(|err| StatusRepositoryError::persistence(lock_error(&err)))?;
        Ok(records
            .iter()
            .filter(|status| owners.contains(&status.owner))
            .cloned()
            .collect())
    }
}
