//! Settings resolution and privileged settings updates.

use super::{WorkflowError, WorkflowResult};
use crate::workflow::{
    domain::{
        Actor, ActorId, Audience, AuditOperation, AuditRecord, AuditTarget, AuditTargetType,
        CompanyId, ResolvedSettings, Role, ScopeRef, SettingsPatch, TeamId, TemplateId,
        TemplateType, WorkflowSettings, merge_settings,
    },
    ports::WorkflowPorts,
};
use mockable::Clock;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Whose settings an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTarget {
    /// The caller's personal row.
    Own,
    /// Another user's personal row.
    User(ActorId),
    /// A team row.
    Team(TeamId),
    /// A company row.
    Company(CompanyId),
}

/// Stored row and effective values of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    /// Owning scope.
    pub owner: ScopeRef,
    /// Values stored at this scope.
    pub stored: Option<WorkflowSettings>,
    /// Values after falling back through broader scopes.
    pub resolved: ResolvedSettings,
}

/// A settings scope after authorisation.
struct ResolvedTarget {
    owner: ScopeRef,
    chain: Vec<ScopeRef>,
    audience: Audience,
}

/// Resolves effective settings through the scope fallback chain.
pub struct SettingsResolver<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkflowPorts,
    clock: Arc<C>,
}

impl<C> SettingsResolver<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a resolver over the given ports.
    #[must_use]
    pub const fn new(ports: WorkflowPorts, clock: Arc<C>) -> Self {
        Self { ports, clock }
    }

    /// Effective settings of `actor`: personal, then team, then company,
    /// then built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn resolve(&self, actor: &Actor) -> WorkflowResult<ResolvedSettings> {
        self.merge(&actor.scope_chain(), Audience::of_actor(actor))
            .await
    }

    /// Effective settings at `owner` as seen from inside `actor`'s tenant.
    ///
    /// Personal scopes of other actors resolve like the company scope.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn resolve_scope(
        &self,
        actor: &Actor,
        owner: &ScopeRef,
    ) -> WorkflowResult<ResolvedSettings> {
        let company = actor.company_scope();
        match owner {
            ScopeRef::Personal(id) if *id == actor.id => self.resolve(actor).await,
            ScopeRef::Team(team_id) => {
                self.merge(
                    &[*owner, company],
                    Audience::of_team(actor.company_id, *team_id),
                )
                .await
            }
            ScopeRef::System => self.merge(&[], Audience::of_company(actor.company_id)).await,
            ScopeRef::Company(_) | ScopeRef::Personal(_) => {
                self.merge(&[company], Audience::of_company(actor.company_id))
                    .await
            }
        }
    }

    /// Returns stored and effective settings of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] when the caller may not address
    /// `target` and [`WorkflowError::NotFound`] for unknown users.
    #[instrument(skip_all, fields(actor_id = %actor.id, target = ?target))]
    pub async fn get(&self, actor: &Actor, target: SettingsTarget) -> WorkflowResult<SettingsView> {
        let resolved_target = self.authorize(actor, target).await?;
        self.view(resolved_target).await
    }

    /// Applies `patch` to the row of `target` and records one audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] when the caller may not address
    /// `target`, [`WorkflowError::Validation`] when the patch is empty or
    /// activates an inactive or invisible template, and storage errors.
    #[instrument(skip_all, fields(actor_id = %actor.id, target = ?target))]
    pub async fn update(
        &self,
        actor: &Actor,
        target: SettingsTarget,
        patch: SettingsPatch,
    ) -> WorkflowResult<SettingsView> {
        if patch.is_empty() {
            return Err(WorkflowError::validation("settings patch sets no field"));
        }
        let resolved_target = self.authorize(actor, target).await?;
        if let Some(template_id) = patch.active_template_id {
            self.ensure_template_usable(template_id, &resolved_target.audience)
                .await?;
        }

        let now = self.clock.utc();
        let before = self.ports.settings.find(&resolved_target.owner).await?;
        let mut row = before.clone().unwrap_or_else(|| {
            WorkflowSettings::empty(resolved_target.owner, actor.company_id, actor.id, now)
        });
        row.apply(&patch, actor.id, now);
        self.ports.settings.save(&row).await?;

        let mut record = AuditRecord::new(
            AuditOperation::SettingsUpdated,
            AuditTarget::new(AuditTargetType::Settings, resolved_target.owner),
            now,
        )
        .with_actor(actor.id)
        .with_company(actor.company_id)
        .with_after(serde_json::to_value(&row)?);
        if let Some(previous) = &before {
            record = record.with_before(serde_json::to_value(previous)?);
        }
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(owner = %resolved_target.owner, error = %err, "settings audit failed, restoring row");
            self.restore(&resolved_target.owner, before, actor, now).await;
            return Err(err.into());
        }

        info!(owner = %resolved_target.owner, "workflow settings updated");
        self.view(resolved_target).await
    }

    async fn restore(
        &self,
        owner: &ScopeRef,
        before: Option<WorkflowSettings>,
        actor: &Actor,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        let previous =
            before.unwrap_or_else(|| WorkflowSettings::empty(*owner, actor.company_id, actor.id, now));
        if let Err(err) = self.ports.settings.save(&previous).await {
            tracing::error!(owner = %owner, error = %err, "failed to restore settings row");
        }
    }

    async fn view(&self, target: ResolvedTarget) -> WorkflowResult<SettingsView> {
        let stored = self.ports.settings.find(&target.owner).await?;
        let resolved = self.merge(&target.chain, target.audience).await?;
        Ok(SettingsView {
            owner: target.owner,
            stored,
            resolved,
        })
    }

    async fn authorize(
        &self,
        actor: &Actor,
        target: SettingsTarget,
    ) -> WorkflowResult<ResolvedTarget> {
        match target {
            SettingsTarget::Own => Ok(Self::personal_target(actor)),
            SettingsTarget::User(user_id) if user_id == actor.id => {
                Ok(Self::personal_target(actor))
            }
            SettingsTarget::User(user_id) => {
                let subject = self
                    .ports
                    .directory
                    .find(user_id)
                    .await?
                    .filter(|subject| subject.company_id == actor.company_id)
                    .ok_or_else(|| WorkflowError::not_found("user", user_id))?;
                let allowed = actor.role.dominates(Role::Manager)
                    || (actor.role.dominates(Role::TeamLeader)
                        && actor.team_id.is_some()
                        && subject.team_id == actor.team_id);
                if !allowed {
                    warn!(subject = %user_id, role = %actor.role, "user settings access denied");
                    return Err(WorkflowError::forbidden(
                        "user settings require a team leader of the user's team or a manager",
                    ));
                }
                Ok(Self::personal_target(&subject))
            }
            SettingsTarget::Team(team_id) => {
                let owner = ScopeRef::Team(team_id);
                let team_company = self
                    .ports
                    .directory
                    .team_company(team_id)
                    .await?
                    .filter(|company| *company == actor.company_id)
                    .ok_or_else(|| {
                        warn!(team = %team_id, "team unknown to the actor's company");
                        WorkflowError::not_found("team", team_id)
                    })?;
                if !actor.can_manage_team(team_id, team_company) {
                    warn!(team = %team_id, role = %actor.role, "team settings access denied");
                    return Err(WorkflowError::forbidden(
                        "team settings require the team's leader or a manager",
                    ));
                }
                Ok(ResolvedTarget {
                    owner,
                    chain: vec![owner, actor.company_scope()],
                    audience: Audience::of_team(actor.company_id, team_id),
                })
            }
            SettingsTarget::Company(company_id) => {
                let owner = ScopeRef::Company(company_id);
                if !actor.can_manage(&owner) {
                    warn!(company = %company_id, role = %actor.role, "company settings access denied");
                    return Err(WorkflowError::forbidden(
                        "company settings require a manager of that company",
                    ));
                }
                Ok(ResolvedTarget {
                    owner,
                    chain: vec![owner],
                    audience: Audience::of_company(company_id),
                })
            }
        }
    }

    fn personal_target(actor: &Actor) -> ResolvedTarget {
        ResolvedTarget {
            owner: actor.personal_scope(),
            chain: actor.scope_chain(),
            audience: Audience::of_actor(actor),
        }
    }

    async fn ensure_template_usable(
        &self,
        template_id: TemplateId,
        audience: &Audience,
    ) -> WorkflowResult<()> {
        let template = self
            .ports
            .templates
            .find(template_id)
            .await?
            .filter(|template| audience.can_see(template.owner()))
            .ok_or_else(|| WorkflowError::not_found("template", template_id))?;
        if !template.is_active() {
            return Err(WorkflowError::validation(format!(
                "template {template_id} is inactive"
            )));
        }
        Ok(())
    }

    async fn merge(
        &self,
        chain: &[ScopeRef],
        audience: Audience,
    ) -> WorkflowResult<ResolvedSettings> {
        let rows = self.ports.settings.find_chain(chain).await?;
        let mut usable = HashSet::new();
        for template_id in rows.iter().filter_map(|row| row.values.active_template_id) {
            let visible = self
                .ports
                .templates
                .find(template_id)
                .await?
                .is_some_and(|template| template.is_active() && audience.can_see(template.owner()));
            if visible {
                usable.insert(template_id);
            }
        }
        let default_template = self
            .ports
            .templates
            .system_default(TemplateType::Standard)
            .await?
            .filter(|template| template.is_active())
            .map(|template| template.id());
        Ok(merge_settings(
            &rows,
            |id| usable.contains(&id),
            default_template,
        ))
    }
}
