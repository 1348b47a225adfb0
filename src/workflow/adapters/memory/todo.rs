//! In-memory task status store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::workflow::{
    domain::{TodoId, TodoRecord},
    ports::{TodoRepository, TodoRepositoryError, TodoRepositoryResult},
};

/// Thread-safe in-memory task status store.
///
/// Tasks are created by the surrounding application; [`Self::insert`] seeds
/// them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTodoRepository {
    state: Arc<RwLock<HashMap<TodoId, TodoRecord>>>,
}

impl InMemoryTodoRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces a task record.
    ///
    /// # Errors
    ///
    /// Returns [`TodoRepositoryError::Persistence`] when the lock is poisoned.
    pub fn insert(&self, record: TodoRecord) -> TodoRepositoryResult<()> {
        let mut todos = self
            .state
            .write()
            .map_err(|err| TodoRepositoryError::persistence(lock_error(&err)))?;
        todos.insert(record.id, record);
        Ok(())
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn find(&self, id: TodoId) -> TodoRepositoryResult<Option<TodoRecord>> {
        let todos = self
            .state
            .read()
            .map_err(|err| TodoRepositoryError::persistence(lock_error(&err)))?;
        Ok(todos.get(&id).cloned())
    }

    async fn compare_and_set(
        &self,
        record: &TodoRecord,
        expected_version: u64,
    ) -> TodoRepositoryResult<()> {
        let mut todos = self
            .state
            .write()
            .map_err(|err| TodoRepositoryError::persistence(lock_error(&err)))?;
        let stored = todos
            .get_mut(&record.id)
            .ok_or(TodoRepositoryError::NotFound(record.id))?;
        if stored.version != expected_version {
            return Err(TodoRepositoryError::VersionConflict {
                id: record.id,
                expected: expected_version,
                actual: stored.version,
            });
        }
        *stored = record.clone();
        Ok(())
    }
}
