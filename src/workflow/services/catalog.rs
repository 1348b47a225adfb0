//! Status catalog resolution and custom status management.

use super::{SettingsResolver, WorkflowError, WorkflowResult, snapshot};
use crate::workflow::{
    domain::{
        Actor, Audience, AuditOperation, AuditRecord, AuditTarget, AuditTargetType, NameMatching,
        ResolvedStatus, Scope, ScopeRef, Status, StatusCatalog, StatusKind, StatusName, Styling,
        WorkflowDomainError,
    },
    ports::{StatusRepositoryError, WorkflowPorts},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Payload of a new custom status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatus {
    /// Target scope tier; the owner is derived from the actor.
    pub scope: Scope,
    /// Stable name.
    pub name: StatusName,
    /// Human-readable label.
    pub display_name: String,
    /// Presentation attributes.
    pub styling: Styling,
}

/// Presentation change of a visible status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOverride {
    /// Scope tier that will own the override.
    pub scope: Scope,
    /// Status to restyle.
    pub name: StatusName,
    /// New label.
    pub display_name: Option<String>,
    /// New presentation attributes.
    pub styling: Option<Styling>,
}

/// Resolves visible statuses and manages custom ones.
pub struct StatusCatalogService<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkflowPorts,
    settings: Arc<SettingsResolver<C>>,
    clock: Arc<C>,
    matching: NameMatching,
}

impl<C> StatusCatalogService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a catalog service.
    #[must_use]
    pub const fn new(
        ports: WorkflowPorts,
        settings: Arc<SettingsResolver<C>>,
        clock: Arc<C>,
        matching: NameMatching,
    ) -> Self {
        Self {
            ports,
            settings,
            clock,
            matching,
        }
    }

    /// Name comparison rule in force.
    #[must_use]
    pub const fn matching(&self) -> NameMatching {
        self.matching
    }

    /// Statuses visible to `actor`: system, company, team and personal, with
    /// narrower scopes overriding presentation only.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn resolve_visible(&self, actor: &Actor) -> WorkflowResult<StatusCatalog> {
        self.catalog_for(&Audience::of_actor(actor)).await
    }

    /// Statuses visible to an arbitrary audience.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn catalog_for(&self, audience: &Audience) -> WorkflowResult<StatusCatalog> {
        let records = self.ports.statuses.list_owned_by(&audience.owners()).await?;
        let catalog = StatusCatalog::resolve(&records, audience, self.matching);
        debug!(company = %audience.company_id(), visible = catalog.len(), "status catalog resolved");
        Ok(catalog)
    }

    /// Lists the statuses visible to `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn list(&self, actor: &Actor) -> WorkflowResult<Vec<ResolvedStatus>> {
        Ok(self.resolve_visible(actor).await?.into_statuses())
    }

    /// Seeds built-in statuses that are not stored yet. Returns how many were
    /// added.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when a name is invalid or storage fails.
    pub async fn seed_system_statuses(&self, names: &[String]) -> WorkflowResult<usize> {
        let mut added = 0;
        for raw in names {
            let name = StatusName::new(raw.as_str())?;
            let existing = self
                .ports
                .statuses
                .find(&ScopeRef::System, &name, self.matching)
                .await?;
            if existing.is_some() {
                continue;
            }
            let status = Status::system(name.clone(), display_name_for(&name), &*self.clock);
            self.ports.statuses.insert(&status, self.matching).await?;
            added += 1;
        }
        if added > 0 {
            info!(added, "system statuses seeded");
        }
        Ok(added)
    }

    /// Defines a custom status in the actor's own scope of tier
    /// `payload.scope`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] when the scope exceeds the
    /// actor's privilege or custom statuses are disabled there, and
    /// [`WorkflowError::DuplicateName`] when the name collides with a system
    /// status or one of the same owner.
    #[instrument(skip_all, fields(actor_id = %actor.id, scope = %payload.scope, name = %payload.name))]
    pub async fn create_custom_status(
        &self,
        actor: &Actor,
        payload: NewStatus,
    ) -> WorkflowResult<Status> {
        let owner = self.authorize_scope(actor, payload.scope).await?;
        if payload.display_name.trim().is_empty() {
            return Err(WorkflowDomainError::EmptyDisplayName.into());
        }

        let audience = Audience::of_owner(&owner, actor);
        let records = self.ports.statuses.list_owned_by(&audience.owners()).await?;
        let clash = records.iter().find(|record| {
            self.matching.same(&record.name, &payload.name)
                && (record.is_system() || record.owner == owner)
        });
        if let Some(existing) = clash {
            warn!(existing_scope = %existing.owner, "custom status name collision");
            return Err(WorkflowError::DuplicateName {
                name: existing.name.clone(),
                scope: existing.owner,
            });
        }

        let status = Status {
            name: payload.name,
            display_name: payload.display_name.trim().to_owned(),
            owner,
            company_id: Some(actor.company_id),
            kind: StatusKind::Definition,
            styling: payload.styling,
            is_active: true,
            created_by: Some(actor.id),
            created_at: self.clock.utc(),
        };
        self.ports
            .statuses
            .insert(&status, self.matching)
            .await
            .map_err(duplicate_from_repository)?;

        let record = self
            .audit_record(actor, AuditOperation::StatusCreated, &status)
            .with_after(snapshot(&status)?);
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(error = %err, "status audit failed, removing status");
            if let Err(undo) = self.ports.statuses.remove(&status.owner, &status.name).await {
                tracing::error!(error = %undo, "failed to remove unaudited status");
            }
            return Err(err.into());
        }
        info!(owner = %status.owner, "custom status created");
        Ok(status)
    }

    /// Overrides display name or styling of a status visible to the owning
    /// scope without changing its identity.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] under the same rules as
    /// [`Self::create_custom_status`] and [`WorkflowError::NotFound`] when
    /// the status is not visible.
    #[instrument(skip_all, fields(actor_id = %actor.id, scope = %payload.scope, name = %payload.name))]
    pub async fn override_presentation(
        &self,
        actor: &Actor,
        payload: StatusOverride,
    ) -> WorkflowResult<Status> {
        if payload.display_name.is_none() && payload.styling.is_none() {
            return Err(WorkflowError::validation(
                "override must set a display name or styling",
            ));
        }
        if payload
            .display_name
            .as_ref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(WorkflowDomainError::EmptyDisplayName.into());
        }
        let owner = self.authorize_scope(actor, payload.scope).await?;
        let catalog = self.catalog_for(&Audience::of_owner(&owner, actor)).await?;
        let visible = catalog
            .find(&payload.name)
            .ok_or_else(|| WorkflowError::not_found("status", &payload.name))?
            .clone();

        let existing = self
            .ports
            .statuses
            .find(&owner, &visible.name, self.matching)
            .await?;
        let now = self.clock.utc();
        let (status, before) = match existing {
            Some(current) => {
                let mut updated = current.clone();
                if let Some(display_name) = &payload.display_name {
                    display_name.trim().clone_into(&mut updated.display_name);
                }
                if let Some(styling) = payload.styling {
                    updated.styling = styling;
                }
                updated.is_active = true;
                self.ports.statuses.update(&updated).await?;
                (updated, Some(current))
            }
            None => {
                let created = Status {
                    name: visible.name.clone(),
                    display_name: payload
                        .display_name
                        .map_or_else(|| visible.display_name.clone(), |name| name.trim().to_owned()),
                    owner,
                    company_id: Some(actor.company_id),
                    kind: StatusKind::PresentationOverride,
                    styling: payload.styling.unwrap_or_default(),
                    is_active: true,
                    created_by: Some(actor.id),
                    created_at: now,
                };
                self.ports.statuses.insert(&created, self.matching).await?;
                (created, None)
            }
        };

        let mut record = self
            .audit_record(actor, AuditOperation::StatusOverridden, &status)
            .with_after(snapshot(&status)?);
        if let Some(previous) = &before {
            record = record.with_before(snapshot(previous)?);
        }
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(error = %err, "status override audit failed, reverting");
            let undo = match &before {
                Some(previous) => self.ports.statuses.update(previous).await,
                None => self.ports.statuses.remove(&status.owner, &status.name).await,
            };
            if let Err(undo_err) = undo {
                tracing::error!(error = %undo_err, "failed to revert status override");
            }
            return Err(err.into());
        }
        info!(owner = %status.owner, "status presentation overridden");
        Ok(status)
    }

    /// Soft-disables a custom status of the actor's own scope.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] for system statuses or scopes
    /// beyond the actor's privilege and [`WorkflowError::NotFound`] when the
    /// scope has no such status.
    #[instrument(skip_all, fields(actor_id = %actor.id, scope = %scope, name = %name))]
    pub async fn deactivate_status(
        &self,
        actor: &Actor,
        scope: Scope,
        name: &StatusName,
    ) -> WorkflowResult<Status> {
        if scope == Scope::System {
            warn!("attempt to deactivate a system status");
            return Err(WorkflowError::forbidden("system statuses cannot be deactivated"));
        }
        let owner = actor
            .own_scope(scope)
            .filter(|owner| actor.can_manage(owner))
            .ok_or_else(|| {
                WorkflowError::forbidden(format!("actor cannot manage {scope} statuses"))
            })?;
        let current = self
            .ports
            .statuses
            .find(&owner, name, self.matching)
            .await?
            .ok_or_else(|| WorkflowError::not_found("status", name))?;
        if !current.is_active {
            return Ok(current);
        }
        let mut updated = current.clone();
        updated.is_active = false;
        self.ports.statuses.update(&updated).await?;

        let record = self
            .audit_record(actor, AuditOperation::StatusDeactivated, &updated)
            .with_before(snapshot(&current)?)
            .with_after(snapshot(&updated)?);
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(error = %err, "status deactivation audit failed, reverting");
            if let Err(undo) = self.ports.statuses.update(&current).await {
                tracing::error!(error = %undo, "failed to reactivate status");
            }
            return Err(err.into());
        }
        info!(owner = %owner, "custom status deactivated");
        Ok(updated)
    }

    async fn authorize_scope(&self, actor: &Actor, scope: Scope) -> WorkflowResult<ScopeRef> {
        let Some(owner) = actor.own_scope(scope) else {
            warn!(%scope, "scope unavailable to actor");
            return Err(WorkflowError::forbidden(format!(
                "actor cannot own {scope} statuses"
            )));
        };
        if !actor.can_manage(&owner) {
            warn!(%scope, role = %actor.role, "scope exceeds actor privilege");
            return Err(WorkflowError::forbidden(format!(
                "role {} cannot manage {scope} statuses",
                actor.role
            )));
        }
        let settings = self.settings.resolve_scope(actor, &owner).await?;
        if !settings.allow_custom_status {
            warn!(%scope, "custom statuses disabled by settings");
            return Err(WorkflowError::forbidden(format!(
                "custom statuses are disabled for {scope} scope"
            )));
        }
        Ok(owner)
    }

    fn audit_record(&self, actor: &Actor, operation: AuditOperation, status: &Status) -> AuditRecord {
        AuditRecord::new(
            operation,
            AuditTarget::new(
                AuditTargetType::Status,
                format!("{}/{}", status.owner, status.name),
            ),
            self.clock.utc(),
        )
        .with_actor(actor.id)
        .with_company(actor.company_id)
    }
}

fn duplicate_from_repository(err: StatusRepositoryError) -> WorkflowError {
    match err {
        StatusRepositoryError::DuplicateName { owner, name } => {
            WorkflowError::DuplicateName { name, scope: owner }
        }
        other => other.into(),
    }
}

/// `IN_PROGRESS` becomes `In Progress`.
fn display_name_for(name: &StatusName) -> String {
    name.as_str()
        .split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
