//! In-memory template repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::workflow::{
    domain::{ScopeRef, TemplateId, TemplateName, TemplateType, WorkflowTemplate},
    ports::{
        SystemDefaultSwap, TemplateRepository, TemplateRepositoryError, TemplateRepositoryResult,
    },
};

/// Thread-safe in-memory template repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateRepository {
    state: Arc<RwLock<InMemoryTemplateState>>,
}

#[derive(Debug, Default)]
struct InMemoryTemplateState {
    templates: HashMap<TemplateId, WorkflowTemplate>,
    insertion_order: Vec<TemplateId>,
    system_defaults: HashMap<TemplateType, TemplateId>,
}

impl InMemoryTemplateRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_name(left: &TemplateName, right: &TemplateName) -> bool {
    left.as_str().to_lowercase() == right.as_str().to_lowercase()
}

fn name_taken(state: &InMemoryTemplateState, template: &WorkflowTemplate) -> bool {
    template.is_active()
        && state.templates.values().any(|existing| {
            existing.id() != template.id()
                && existing.is_active()
                && existing.owner() == template.owner()
                && same_name(existing.name(), template.name())
        })
}

fn duplicate(template: &WorkflowTemplate) -> TemplateRepositoryError {
    TemplateRepositoryError::DuplicateName {
        owner: *template.owner(),
        name: template.name().to_string(),
    }
}

fn ineligible(id: TemplateId, reason: &'static str) -> TemplateRepositoryError {
    TemplateRepositoryError::NotEligible { id, reason }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn insert(&self, template: &WorkflowTemplate) -> TemplateRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        if name_taken(&state, template) {
            return Err(duplicate(template));
        }
        state.insertion_order.push(template.id());
        state.templates.insert(template.id(), template.clone());
        Ok(())
    }

    async fn update(&self, template: &WorkflowTemplate) -> TemplateRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        if !state.templates.contains_key(&template.id()) {
            return Err(TemplateRepositoryError::NotFound(template.id()));
        }
        if name_taken(&state, template) {
            return Err(duplicate(template));
        }
        state.templates.insert(template.id(), template.clone());
        Ok(())
    }

    async fn remove(&self, id: TemplateId) -> TemplateRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        if state.templates.remove(&id).is_none() {
            return Err(TemplateRepositoryError::NotFound(id));
        }
        state.insertion_order.retain(|existing| *existing != id);
        state.system_defaults.retain(|_, default_id| *default_id != id);
        Ok(())
    }

    async fn find(&self, id: TemplateId) -> TemplateRepositoryResult<Option<WorkflowTemplate>> {
        let state = self
            .state
            .read()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        Ok(state.templates.get(&id).cloned())
    }

    async fn find_by_name(
        &self,
        owner: &ScopeRef,
        name: &TemplateName,
    ) -> TemplateRepositoryResult<Option<WorkflowTemplate>> {
        let state = self
            .state
            .read()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        Ok(state
            .templates
            .values()
            .find(|template| {
                template.is_active()
                    && template.owner() == owner
                    && same_name(template.name(), name)
            })
            .cloned())
    }

    async fn list_owned_by(
        &self,
        owners: &[ScopeRef],
    ) -> TemplateRepositoryResult<Vec<WorkflowTemplate>> {
        let state = self
            .state
            .read()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        Ok(state
            .insertion_order
            .iter()
            .filter_map(|id| state.templates.get(id))
            .filter(|template| owners.contains(template.owner()))
            .cloned()
            .collect())
    }

    async fn system_default(
        &self,
        template_type: TemplateType,
    ) -> TemplateRepositoryResult<Option<WorkflowTemplate>> {
        let state = self
            .state
            .read()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        Ok(state
            .system_defaults
            .get(&template_type)
            .and_then(|id| state.templates.get(id))
            .cloned())
    }

    async fn swap_system_default(
        &self,
        id: TemplateId,
        template_type: TemplateType,
        at: DateTime<Utc>,
    ) -> TemplateRepositoryResult<SystemDefaultSwap> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TemplateRepositoryError::persistence(lock_error(&err)))?;
        let target = state
            .templates
            .get(&id)
            .ok_or(TemplateRepositoryError::NotFound(id))?;
        if !matches!(target.owner(), ScopeRef::System) {
            return Err(ineligible(id, "only system templates can be the default"));
        }
        if !target.is_active() {
            return Err(ineligible(id, "template is inactive"));
        }
        if target.template_type() != template_type {
            return Err(ineligible(id, "template type does not match"));
        }

        let previous_id = state.system_defaults.get(&template_type).copied();
        if previous_id == Some(id) {
            let current = target.clone();
            return Ok(SystemDefaultSwap {
                previous: None,
                current,
                changed: false,
            });
        }

        let previous = match previous_id.and_then(|prev| state.templates.get_mut(&prev)) {
            Some(prev) => {
                prev.set_system_default_flag(false, at);
                Some(prev.clone())
            }
            None => None,
        };
        let current = match state.templates.get_mut(&id) {
            Some(template) => {
                template.set_system_default_flag(true, at);
                template.clone()
            }
            None => return Err(TemplateRepositoryError::NotFound(id)),
        };
        state.system_defaults.insert(template_type, id);
        Ok(SystemDefaultSwap {
            previous,
            current,
            changed: true,
        })
    }
}
