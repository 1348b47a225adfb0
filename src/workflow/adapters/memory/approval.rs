//! In-memory approval request repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::workflow::{
    domain::{ApprovalRequest, ApprovalRequestId, CompanyId, Resolution, TodoId},
    ports::{ApprovalRepository, ApprovalRepositoryError, ApprovalRepositoryResult},
};

/// Thread-safe in-memory approval repository.
///
/// The pending index and the request map live under one lock so the
/// at-most-one-pending check and the insert are a single step.
#[derive(Debug, Clone, Default)]
pub struct InMemoryApprovalRepository {
    state: Arc<RwLock<InMemoryApprovalState>>,
}

#[derive(Debug, Default)]
struct InMemoryApprovalState {
    requests: HashMap<ApprovalRequestId, ApprovalRequest>,
    insertion_order: Vec<ApprovalRequestId>,
    pending_index: HashMap<TodoId, ApprovalRequestId>,
}

impl InMemoryApprovalRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn insert_pending(&self, request: &ApprovalRequest) -> ApprovalRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ApprovalRepositoryError::persistence(lock_error(&err)))?;
        if let Some(existing) = state.pending_index.get(&request.todo_id()) {
            return Err(ApprovalRepositoryError::PendingExists {
                todo_id: request.todo_id(),
                existing: *existing,
            });
        }
        state.pending_index.insert(request.todo_id(), request.id());
        state.insertion_order.push(request.id());
        state.requests.insert(request.id(), request.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: ApprovalRequestId,
    ) -> ApprovalRepositoryResult<Option<ApprovalRequest>> {
        let state = self
            .state
            .read()
            .map_err(|err| ApprovalRepositoryError::persistence(lock_error(&err)))?;
        Ok(state.requests.get(&id).cloned())
    }

    async fn pending_for_todo(
        &self,
        todo_id: TodoId,
    ) -> ApprovalRepositoryResult<Option<ApprovalRequest>> {
        let state = self
            .state
            .read()
            .map_err(|err| ApprovalRepositoryError::persistence(lock_error(&err)))?;
        Ok(state
            .pending_index
            .get(&todo_id)
            .and_then(|id| state.requests.get(id))
            .cloned())
    }

    async fn list_pending(
        &self,
        company_id: CompanyId,
    ) -> ApprovalRepositoryResult<Vec<ApprovalRequest>> {
        let state = self
            .state
            .read()
            .map_err(|err| ApprovalRepositoryError::persistence(lock_error(&err)))?;
        Ok(state
            .insertion_order
            .iter()
            .filter_map(|id| state.requests.get(id))
            .filter(|request| request.is_pending() && request.company_id() == company_id)
            .cloned()
            .collect())
    }

    async fn resolve(
        &self,
        id: ApprovalRequestId,
        resolution: Resolution,
    ) -> ApprovalRepositoryResult<ApprovalRequest> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ApprovalRepositoryError::persistence(lock_error(&err)))?;
        let request = state
            .requests
            .get_mut(&id)
            .ok_or(ApprovalRepositoryError::NotFound(id))?;
        request
            .resolve(resolution)
            .map_err(|status| ApprovalRepositoryError::NotPending { id, status })?;
        let resolved = request.clone();
        state.pending_index.remove(&resolved.todo_id());
        Ok(resolved)
    }

    async fn reopen(&self, id: ApprovalRequestId) -> ApprovalRepositoryResult<ApprovalRequest> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ApprovalRepositoryError::persistence(lock_error(&err)))?;
        let request = state
            .requests
            .get_mut(&id)
            .ok_or(ApprovalRepositoryError::NotFound(id))?;
        request.reopen();
        let reopened = request.clone();
        state.pending_index.insert(reopened.todo_id(), id);
        Ok(reopened)
    }

    async fn discard(&self, id: ApprovalRequestId) -> ApprovalRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ApprovalRepositoryError::persistence(lock_error(&err)))?;
        let request = state
            .requests
            .remove(&id)
            .ok_or(ApprovalRepositoryError::NotFound(id))?;
        state.insertion_order.retain(|existing| *existing != id);
        if state.pending_index.get(&request.todo_id()) == Some(&id) {
            state.pending_index.remove(&request.todo_id());
        }
        Ok(())
    }
}
