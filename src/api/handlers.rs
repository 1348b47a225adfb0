//! Endpoint handlers.

use super::dto::{
    ApplyTransitionBody, ApproveBody, AuditLogParams, CancelBody, CreateStatusBody,
    CreateTemplateBody, OverrideStatusBody, RejectBody, RequestApprovalBody,
    SetSystemDefaultBody, TemplateListParams, UpdateTemplateBody,
};
use super::ApiResponse;
use crate::workflow::{
    domain::{
        Actor, ActorId, ApprovalRequest, AuditEntry, CompanyId, Page, ResolvedStatus, Scope,
        SettingsPatch, Status, StatusName, TeamId, TemplateId, WorkflowTemplate,
    },
    services::{
        ApprovalOutcome, SettingsTarget, SettingsView, TemplateQuery, TransitionOutcome,
        WorkflowEngine, WorkflowResult,
    },
};
use mockable::Clock;
use std::sync::Arc;
use tracing::instrument;

/// Framework-agnostic handlers for the workflow endpoints.
///
/// Each method takes the authenticated actor and the decoded request and
/// always answers with an [`ApiResponse`]; errors never escape as panics.
pub struct WorkflowApi<C>
where
    C: Clock + Send + Sync,
{
    engine: Arc<WorkflowEngine<C>>,
}

impl<C> WorkflowApi<C>
where
    C: Clock + Send + Sync,
{
    /// Creates the handlers over a bootstrapped engine.
    #[must_use]
    pub const fn new(engine: Arc<WorkflowEngine<C>>) -> Self {
        Self { engine }
    }

    /// The engine behind the handlers.
    #[must_use]
    pub fn engine(&self) -> &WorkflowEngine<C> {
        &self.engine
    }

    /// `GET /workflows/templates`
    pub async fn list_templates(
        &self,
        actor: &Actor,
        params: TemplateListParams,
    ) -> ApiResponse<Page<WorkflowTemplate>> {
        let result: WorkflowResult<_> = async {
            let query = TemplateQuery::try_from(params)?;
            self.engine.templates().list(actor, query).await
        }
        .await;
        result.into()
    }

    /// `POST /workflows/templates`
    pub async fn create_template(
        &self,
        actor: &Actor,
        body: CreateTemplateBody,
    ) -> ApiResponse<WorkflowTemplate> {
        self.engine
            .templates()
            .create(actor, body.into())
            .await
            .into()
    }

    /// `GET /workflows/templates/{id}`
    pub async fn get_template(&self, actor: &Actor, id: TemplateId) -> ApiResponse<WorkflowTemplate> {
        self.engine.templates().get(actor, id).await.into()
    }

    /// `PUT /workflows/templates/{id}`
    pub async fn update_template(
        &self,
        actor: &Actor,
        id: TemplateId,
        body: UpdateTemplateBody,
    ) -> ApiResponse<WorkflowTemplate> {
        self.engine
            .templates()
            .update(actor, id, body.into())
            .await
            .into()
    }

    /// `DELETE /workflows/templates/{id}`; a soft disable.
    pub async fn delete_template(
        &self,
        actor: &Actor,
        id: TemplateId,
    ) -> ApiResponse<WorkflowTemplate> {
        self.engine.templates().deactivate(actor, id).await.into()
    }

    /// `PUT /workflows/templates/{id}/system-default`; company leaders of the
    /// operating company only, since the default applies to every tenant.
    #[instrument(skip_all, fields(actor_id = %actor.id, template_id = %id))]
    pub async fn set_system_default(
        &self,
        actor: &Actor,
        id: TemplateId,
        body: SetSystemDefaultBody,
    ) -> ApiResponse<WorkflowTemplate> {
        self.engine
            .templates()
            .set_system_default(Some(actor), id, body.template_type)
            .await
            .into()
    }

    /// `GET /workflows/settings`
    pub async fn get_settings(&self, actor: &Actor) -> ApiResponse<SettingsView> {
        self.settings_get(actor, SettingsTarget::Own).await
    }

    /// `PUT /workflows/settings`
    pub async fn update_settings(
        &self,
        actor: &Actor,
        body: SettingsPatch,
    ) -> ApiResponse<SettingsView> {
        self.settings_put(actor, SettingsTarget::Own, body).await
    }

    /// `GET /workflows/settings/user/{id}`
    pub async fn get_user_settings(&self, actor: &Actor, user: ActorId) -> ApiResponse<SettingsView> {
        self.settings_get(actor, SettingsTarget::User(user)).await
    }

    /// `PUT /workflows/settings/user/{id}`
    pub async fn update_user_settings(
        &self,
        actor: &Actor,
        user: ActorId,
        body: SettingsPatch,
    ) -> ApiResponse<SettingsView> {
        self.settings_put(actor, SettingsTarget::User(user), body).await
    }

    /// `GET /workflows/settings/team/{id}`
    pub async fn get_team_settings(&self, actor: &Actor, team: TeamId) -> ApiResponse<SettingsView> {
        self.settings_get(actor, SettingsTarget::Team(team)).await
    }

    /// `PUT /workflows/settings/team/{id}`
    pub async fn update_team_settings(
        &self,
        actor: &Actor,
        team: TeamId,
        body: SettingsPatch,
    ) -> ApiResponse<SettingsView> {
        self.settings_put(actor, SettingsTarget::Team(team), body).await
    }

    /// `GET /workflows/settings/company/{id}`
    pub async fn get_company_settings(
        &self,
        actor: &Actor,
        company: CompanyId,
    ) -> ApiResponse<SettingsView> {
        self.settings_get(actor, SettingsTarget::Company(company)).await
    }

    /// `PUT /workflows/settings/company/{id}`
    pub async fn update_company_settings(
        &self,
        actor: &Actor,
        company: CompanyId,
        body: SettingsPatch,
    ) -> ApiResponse<SettingsView> {
        self.settings_put(actor, SettingsTarget::Company(company), body)
            .await
    }

    /// `GET /workflows/statuses`
    pub async fn list_statuses(&self, actor: &Actor) -> ApiResponse<Vec<ResolvedStatus>> {
        self.engine.catalog().list(actor).await.into()
    }

    /// `POST /workflows/statuses`
    pub async fn create_status(&self, actor: &Actor, body: CreateStatusBody) -> ApiResponse<Status> {
        self.engine
            .catalog()
            .create_custom_status(actor, body.into())
            .await
            .into()
    }

    /// `PUT /workflows/statuses/{name}`
    pub async fn override_status(
        &self,
        actor: &Actor,
        name: StatusName,
        body: OverrideStatusBody,
    ) -> ApiResponse<Status> {
        self.engine
            .catalog()
            .override_presentation(actor, body.into_override(name))
            .await
            .into()
    }

    /// `DELETE /workflows/statuses/{name}?scope=`
    pub async fn deactivate_status(
        &self,
        actor: &Actor,
        scope: Scope,
        name: StatusName,
    ) -> ApiResponse<Status> {
        self.engine
            .catalog()
            .deactivate_status(actor, scope, &name)
            .await
            .into()
    }

    /// `POST /workflows/approvals/request`
    pub async fn request_approval(
        &self,
        actor: &Actor,
        body: RequestApprovalBody,
    ) -> ApiResponse<ApprovalRequest> {
        self.engine
            .approvals()
            .request(actor, body.into())
            .await
            .into()
    }

    /// `POST /workflows/approvals/approve`
    pub async fn approve(&self, actor: &Actor, body: ApproveBody) -> ApiResponse<ApprovalOutcome> {
        self.engine
            .approvals()
            .approve(body.approval_id, actor, body.comments)
            .await
            .into()
    }

    /// `POST /workflows/approvals/reject`
    pub async fn reject(&self, actor: &Actor, body: RejectBody) -> ApiResponse<ApprovalOutcome> {
        self.engine
            .approvals()
            .reject(body.approval_id, actor, &body.reason)
            .await
            .into()
    }

    /// `POST /workflows/approvals/cancel`
    pub async fn cancel_approval(
        &self,
        actor: &Actor,
        body: CancelBody,
    ) -> ApiResponse<ApprovalOutcome> {
        self.engine
            .approvals()
            .cancel(body.approval_id, actor, body.reason)
            .await
            .into()
    }

    /// `GET /workflows/approvals/pending`
    pub async fn pending_approvals(&self, actor: &Actor) -> ApiResponse<Vec<ApprovalRequest>> {
        self.engine.approvals().list_pending(actor).await.into()
    }

    /// `POST /workflows/apply`
    pub async fn apply(
        &self,
        actor: &Actor,
        body: ApplyTransitionBody,
    ) -> ApiResponse<TransitionOutcome> {
        self.engine
            .executor()
            .apply_transition(body.into(), actor)
            .await
            .into()
    }

    /// `GET /workflows/audit`
    pub async fn audit_logs(
        &self,
        actor: &Actor,
        params: AuditLogParams,
    ) -> ApiResponse<Page<AuditEntry>> {
        let result: WorkflowResult<_> = async {
            let query = params.try_into()?;
            self.engine.audit().query(actor, query).await
        }
        .await;
        result.into()
    }

    async fn settings_get(&self, actor: &Actor, target: SettingsTarget) -> ApiResponse<SettingsView> {
        self.engine.settings().get(actor, target).await.into()
    }

    async fn settings_put(
        &self,
        actor: &Actor,
        target: SettingsTarget,
        patch: SettingsPatch,
    ) -> ApiResponse<SettingsView> {
        self.engine
            .settings()
            .update(actor, target, patch)
            .await
            .into()
    }
}
