//! Workflow template store.

use super::{StatusCatalogService, WorkflowError, WorkflowResult, snapshot};
use crate::config::PaginationConfig;
use crate::workflow::{
    domain::{
        Actor, Audience, AuditOperation, AuditRecord, AuditTarget, AuditTargetType, ColumnSpec,
        CompanyId, Page, PageRequest, Role, Scope, ScopeRef, StatusCatalog, TemplateDraft, TemplateId,
        TemplateName, TemplateOwnership, TemplatePatch, TemplateType, WorkflowTemplate,
    },
    ports::WorkflowPorts,
};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Payload of a new template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTemplate {
    /// Scope tier that will own the template.
    pub scope: Scope,
    /// Template name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Behavioural family.
    pub template_type: TemplateType,
    /// Column specifications.
    pub columns: Vec<ColumnSpec>,
    /// Approver roles; configured defaults apply when absent.
    pub approver_roles: Option<BTreeSet<Role>>,
}

impl CreateTemplate {
    /// Creates a personal template payload.
    #[must_use]
    pub fn new(name: impl Into<String>, template_type: TemplateType, columns: Vec<ColumnSpec>) -> Self {
        Self {
            scope: Scope::Personal,
            name: name.into(),
            description: None,
            template_type,
            columns,
            approver_roles: None,
        }
    }

    /// Sets the owning scope tier.
    #[must_use]
    pub const fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the approver roles.
    #[must_use]
    pub fn with_approver_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.approver_roles = Some(roles.into_iter().collect());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Filters of a template listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateQuery {
    /// Only this family.
    pub template_type: Option<TemplateType>,
    /// Only active or only inactive templates.
    pub is_active: Option<bool>,
    /// One-based page; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to the configured default.
    pub limit: Option<u32>,
}

/// Owns workflow templates and the system default of each type.
pub struct TemplateStore<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkflowPorts,
    catalog: Arc<StatusCatalogService<C>>,
    clock: Arc<C>,
    default_approver_roles: BTreeSet<Role>,
    pagination: PaginationConfig,
    operator_company: Option<CompanyId>,
}

impl<C> TemplateStore<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a template store.
    #[must_use]
    pub const fn new(
        ports: WorkflowPorts,
        catalog: Arc<StatusCatalogService<C>>,
        clock: Arc<C>,
        default_approver_roles: BTreeSet<Role>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            ports,
            catalog,
            clock,
            default_approver_roles,
            pagination,
            operator_company: None,
        }
    }

    /// Lets leaders of `company` change the system defaults.
    #[must_use]
    pub const fn operated_by(mut self, company: Option<CompanyId>) -> Self {
        self.operator_company = company;
        self
    }

    /// Creates a template owned by the actor's scope of tier
    /// `payload.scope`.
    ///
    /// Every column status must be visible to the owning scope.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] when the scope exceeds the
    /// actor's privilege and a validation error for malformed payloads,
    /// unknown statuses or a name already used in the scope.
    #[instrument(skip_all, fields(actor_id = %actor.id, scope = %payload.scope, name = %payload.name))]
    pub async fn create(
        &self,
        actor: &Actor,
        payload: CreateTemplate,
    ) -> WorkflowResult<WorkflowTemplate> {
        let owner = actor
            .own_scope(payload.scope)
            .filter(|owner| actor.can_manage(owner))
            .ok_or_else(|| {
                warn!(role = %actor.role, "template scope exceeds actor privilege");
                WorkflowError::forbidden(format!(
                    "role {} cannot create {} templates",
                    actor.role, payload.scope
                ))
            })?;
        let catalog = self
            .catalog
            .catalog_for(&Audience::of_owner(&owner, actor))
            .await?;
        let draft = self.draft_from(payload);
        let ownership = TemplateOwnership {
            owner,
            company_id: Some(actor.company_id),
            created_by: Some(actor.id),
        };
        let template = WorkflowTemplate::new(draft, ownership, &catalog, &*self.clock)?;
        self.ports.templates.insert(&template).await?;

        let record = self
            .audit_record(Some(actor), AuditOperation::TemplateCreated, template.id())
            .with_after(snapshot(&template)?);
        self.append_or_remove(record, template.id()).await?;
        info!(template_id = %template.id(), "workflow template created");
        Ok(template)
    }

    /// Installs a system-owned template. The first installed template of a
    /// type becomes its system default.
    ///
    /// `operator` is `None` during start-up; otherwise it must be allowed to
    /// administer system templates and is recorded in the audit log.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] for an operator outside the
    /// operating company and a validation error when a column references a
    /// status that is not built in.
    #[instrument(skip_all, fields(name = %draft.name, template_type = %draft.template_type))]
    pub async fn install_system_template(
        &self,
        operator: Option<&Actor>,
        draft: TemplateDraft,
    ) -> WorkflowResult<WorkflowTemplate> {
        self.authorize_operator(operator)?;
        let records = self
            .ports
            .statuses
            .list_owned_by(&[ScopeRef::System])
            .await?;
        let catalog = StatusCatalog::system_only(&records, self.catalog.matching());
        let ownership = TemplateOwnership {
            owner: ScopeRef::System,
            company_id: None,
            created_by: None,
        };
        let template_type = draft.template_type;
        let template = WorkflowTemplate::new(draft, ownership, &catalog, &*self.clock)?;
        self.ports.templates.insert(&template).await?;
        let record = self
            .audit_record(operator, AuditOperation::TemplateCreated, template.id())
            .with_after(snapshot(&template)?);
        self.append_or_remove(record, template.id()).await?;
        info!(template_id = %template.id(), "system template installed");

        if self
            .ports
            .templates
            .system_default(template_type)
            .await?
            .is_none()
        {
            return self
                .set_system_default(operator, template.id(), template_type)
                .await;
        }
        Ok(template)
    }

    /// Returns a template visible to `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the template does not exist or
    /// belongs to a scope the actor cannot see.
    pub async fn get(&self, actor: &Actor, id: TemplateId) -> WorkflowResult<WorkflowTemplate> {
        let audience = Audience::of_actor(actor);
        self.ports
            .templates
            .find(id)
            .await?
            .filter(|template| audience.can_see(template.owner()))
            .ok_or_else(|| WorkflowError::not_found("template", id))
    }

    /// Lists templates visible to `actor`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a validation error for page zero or a limit outside
    /// `1..=max_limit`.
    pub async fn list(
        &self,
        actor: &Actor,
        query: TemplateQuery,
    ) -> WorkflowResult<Page<WorkflowTemplate>> {
        let page = PageRequest::new(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(self.pagination.default_limit),
            self.pagination.max_limit,
        )?;
        let audience = Audience::of_actor(actor);
        let templates: Vec<WorkflowTemplate> = self
            .ports
            .templates
            .list_owned_by(&audience.owners())
            .await?
            .into_iter()
            .filter(|template| {
                query
                    .template_type
                    .is_none_or(|wanted| template.template_type() == wanted)
                    && query
                        .is_active
                        .is_none_or(|wanted| template.is_active() == wanted)
            })
            .collect();
        Ok(Page::paginate(templates, page))
    }

    /// Applies a partial update, re-validating columns against the owning
    /// scope's catalog.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] for system defaults and templates
    /// the actor cannot manage, and validation errors for invalid patches.
    #[instrument(skip_all, fields(actor_id = %actor.id, template_id = %id))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: TemplateId,
        patch: TemplatePatch,
    ) -> WorkflowResult<WorkflowTemplate> {
        if patch.is_empty() {
            return Err(WorkflowError::validation("template patch sets no field"));
        }
        let before = self.editable(actor, id).await?;
        let catalog = self
            .catalog
            .catalog_for(&Audience::of_owner(before.owner(), actor))
            .await?;
        let mut template = before.clone();
        template.apply_patch(patch, &catalog, &*self.clock)?;
        self.ports.templates.update(&template).await?;

        let record = self
            .audit_record(Some(actor), AuditOperation::TemplateUpdated, id)
            .with_before(snapshot(&before)?)
            .with_after(snapshot(&template)?);
        self.append_or_restore(record, &before).await?;
        info!("workflow template updated");
        Ok(template)
    }

    /// Soft-disables a template. Settings that reference it fall back to
    /// broader scopes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] for system defaults and templates
    /// the actor cannot manage.
    #[instrument(skip_all, fields(actor_id = %actor.id, template_id = %id))]
    pub async fn deactivate(
        &self,
        actor: &Actor,
        id: TemplateId,
    ) -> WorkflowResult<WorkflowTemplate> {
        let before = self.editable(actor, id).await?;
        if !before.is_active() {
            return Ok(before);
        }
        let mut template = before.clone();
        template.deactivate(&*self.clock);
        self.ports.templates.update(&template).await?;

        let record = self
            .audit_record(Some(actor), AuditOperation::TemplateDeactivated, id)
            .with_before(snapshot(&before)?)
            .with_after(snapshot(&template)?);
        self.append_or_restore(record, &before).await?;
        info!("workflow template deactivated");
        Ok(template)
    }

    /// Makes `id` the system default of `template_type`, clearing the
    /// previous default in the same step. Repeating the call is a no-op.
    ///
    /// The default is shared by every tenant, so only a company leader of the
    /// configured operating company may change it. `operator` is `None` for
    /// start-up installation and is otherwise recorded in the audit log.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] for any other operator,
    /// [`WorkflowError::NotFound`] for unknown templates and a validation
    /// error unless the template is an active system template of
    /// `template_type`.
    #[instrument(skip(self, operator), fields(operator = ?operator.map(|actor| actor.id)))]
    pub async fn set_system_default(
        &self,
        operator: Option<&Actor>,
        id: TemplateId,
        template_type: TemplateType,
    ) -> WorkflowResult<WorkflowTemplate> {
        self.authorize_operator(operator)?;
        let now = self.clock.utc();
        let swap = self
            .ports
            .templates
            .swap_system_default(id, template_type, now)
            .await?;
        if !swap.changed {
            return Ok(swap.current);
        }

        let mut record = self
            .audit_record(operator, AuditOperation::SystemDefaultChanged, id)
            .with_after(snapshot(&swap.current)?);
        if let Some(previous) = &swap.previous {
            record = record.with_before(snapshot(previous)?);
        }
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(error = %err, "system default audit failed, restoring previous default");
            if let Some(previous) = &swap.previous {
                if let Err(undo) = self
                    .ports
                    .templates
                    .swap_system_default(previous.id(), template_type, now)
                    .await
                {
                    tracing::error!(error = %undo, "failed to restore previous system default");
                }
            }
            return Err(err.into());
        }
        info!(previous = ?swap.previous.as_ref().map(WorkflowTemplate::id), "system default changed");
        Ok(swap.current)
    }

    /// Finds an active system-owned template by name.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn find_system(&self, name: &TemplateName) -> WorkflowResult<Option<WorkflowTemplate>> {
        Ok(self
            .ports
            .templates
            .find_by_name(&ScopeRef::System, name)
            .await?)
    }

    /// Returns the template governing `actor` given the resolved active
    /// template identifier.
    ///
    /// # Errors
    ///
    /// Returns a validation error when no template is configured and no
    /// system default exists.
    pub async fn governing(
        &self,
        actor: &Actor,
        active_template_id: Option<TemplateId>,
    ) -> WorkflowResult<WorkflowTemplate> {
        let id = active_template_id.ok_or_else(|| {
            WorkflowError::validation("no active workflow template is configured")
        })?;
        self.get(actor, id).await
    }

    async fn editable(&self, actor: &Actor, id: TemplateId) -> WorkflowResult<WorkflowTemplate> {
        let template = self.get(actor, id).await?;
        if template.is_system_default() {
            warn!(template_id = %id, "attempt to modify the system default template");
            return Err(WorkflowError::forbidden(
                "the system default template cannot be modified",
            ));
        }
        if !actor.can_manage(template.owner()) {
            warn!(template_id = %id, role = %actor.role, "template edit denied");
            return Err(WorkflowError::forbidden(format!(
                "actor cannot manage templates owned by {}",
                template.owner()
            )));
        }
        Ok(template)
    }

    fn draft_from(&self, payload: CreateTemplate) -> TemplateDraft {
        let roles = payload
            .approver_roles
            .unwrap_or_else(|| self.default_approver_roles.clone());
        let mut draft = TemplateDraft::new(payload.name, payload.template_type, payload.columns, roles);
        draft.description = payload.description;
        draft
    }

    fn authorize_operator(&self, operator: Option<&Actor>) -> WorkflowResult<()> {
        let Some(actor) = operator else {
            return Ok(());
        };
        if actor.role == Role::CompanyLeader && self.operator_company == Some(actor.company_id) {
            return Ok(());
        }
        warn!(
            actor_id = %actor.id,
            company_id = %actor.company_id,
            role = %actor.role,
            "system template administration denied"
        );
        Err(WorkflowError::forbidden(
            "system templates are administered by company leaders of the operating company",
        ))
    }

    fn audit_record(
        &self,
        actor: Option<&Actor>,
        operation: AuditOperation,
        id: TemplateId,
    ) -> AuditRecord {
        let record = AuditRecord::new(
            operation,
            AuditTarget::new(AuditTargetType::Template, id),
            self.clock.utc(),
        );
        match actor {
            Some(actor) => record.with_actor(actor.id).with_company(actor.company_id),
            None => record,
        }
    }

    async fn append_or_remove(&self, record: AuditRecord, id: TemplateId) -> WorkflowResult<()> {
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(template_id = %id, error = %err, "template audit failed, removing template");
            if let Err(undo) = self.ports.templates.remove(id).await {
                tracing::error!(error = %undo, "failed to remove unaudited template");
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn append_or_restore(
        &self,
        record: AuditRecord,
        before: &WorkflowTemplate,
    ) -> WorkflowResult<()> {
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(template_id = %before.id(), error = %err, "template audit failed, restoring");
            if let Err(undo) = self.ports.templates.update(before).await {
                tracing::error!(error = %undo, "failed to restore template");
            }
            return Err(err.into());
        }
        Ok(())
    }
}
