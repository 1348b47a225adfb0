//! Approval request lifecycle.
//!
//! A request moves from `PENDING` to exactly one terminal state. The
//! repository claims the terminal state atomically, so of two racing
//! decisions the second always fails with
//! [`WorkflowError::AlreadyResolved`]. Follow-up work that fails after the
//! claim reopens the request.
//!
//! Opening a request reserves the task by advancing its version, so a
//! concurrent status change read at the old version loses its
//! compare-and-set. A request whose task moved anyway is cancelled when
//! someone tries to approve it.

use super::executor::{CommitAudit, TransitionCommitter};
use super::{
    SettingsResolver, StatusCatalogService, TemplateStore, WorkflowError, WorkflowResult, snapshot,
};
use crate::workflow::{
    domain::{
        Actor, ApprovalDraft, ApprovalRequest, ApprovalRequestId, ApprovalStatus, AuditOperation,
        AuditRecord, AuditTarget, AuditTargetType, DenyReason, Resolution, Role, StatusName,
        TemplateId, TodoId, TodoRecord, TransitionContext, TransitionDecision, WorkflowEvent,
        WorkflowTemplate, decide,
    },
    ports::{ApprovalRepositoryError, WorkflowPorts},
};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Explicit request for approval of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequestCommand {
    /// Template whose approver roles apply.
    pub workflow_id: TemplateId,
    /// Task to move.
    pub todo_id: TodoId,
    /// Requested status.
    pub to: StatusName,
    /// Requester's justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of an approval decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
    /// The resolved request.
    pub request: ApprovalRequest,
    /// Task state after an approval; `None` for rejections and cancellations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<TodoRecord>,
}

/// A transition that must wait for approval.
pub(crate) struct GatedTransition<'a> {
    pub todo: &'a TodoRecord,
    pub template: &'a WorkflowTemplate,
    pub to: StatusName,
    pub approver_roles: BTreeSet<Role>,
    pub reason: Option<String>,
}

/// Owns approval requests from creation to their terminal state.
pub struct ApprovalFlowManager<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkflowPorts,
    clock: Arc<C>,
    settings: Arc<SettingsResolver<C>>,
    catalog: Arc<StatusCatalogService<C>>,
    templates: Arc<TemplateStore<C>>,
    committer: Arc<TransitionCommitter<C>>,
}

impl<C> ApprovalFlowManager<C>
where
    C: Clock + Send + Sync,
{
    pub(crate) const fn new(
        ports: WorkflowPorts,
        clock: Arc<C>,
        settings: Arc<SettingsResolver<C>>,
        catalog: Arc<StatusCatalogService<C>>,
        templates: Arc<TemplateStore<C>>,
        committer: Arc<TransitionCommitter<C>>,
    ) -> Self {
        Self {
            ports,
            clock,
            settings,
            catalog,
            templates,
            committer,
        }
    }

    /// Opens an approval request for a transition under the named template,
    /// whether or not the template would gate it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Conflict`] when the task already has a pending
    /// request, [`WorkflowError::NoOpTransition`] when the task is already in
    /// the target status, [`WorkflowError::NotFound`] for unknown tasks or
    /// templates, and a validation error when the template refuses the
    /// target.
    #[instrument(skip_all, fields(actor_id = %actor.id, todo_id = %command.todo_id, to = %command.to))]
    pub async fn request(
        &self,
        actor: &Actor,
        command: ApprovalRequestCommand,
    ) -> WorkflowResult<ApprovalRequest> {
        let todo = self
            .ports
            .todos
            .find(command.todo_id)
            .await?
            .filter(|todo| todo.company_id == actor.company_id)
            .ok_or_else(|| WorkflowError::not_found("todo", command.todo_id))?;
        let template = self.templates.get(actor, command.workflow_id).await?;
        let settings = self.settings.resolve(actor).await?;
        let catalog = self.catalog.resolve_visible(actor).await?;
        let context = TransitionContext {
            template: &template,
            catalog: &catalog,
            auto_transition: settings.auto_transition,
        };
        match decide(context, &todo.status, &command.to) {
            TransitionDecision::Denied(DenyReason::NoOp) => {
                return Err(WorkflowError::NoOpTransition { status: command.to });
            }
            TransitionDecision::Denied(reason) => {
                warn!(%reason, "approval request refused by template");
                return Err(WorkflowError::validation(reason.describe()));
            }
            TransitionDecision::Allowed | TransitionDecision::AllowedWithApproval { .. } => {}
        }
        let to = template
            .column_for(&command.to, catalog.matching())
            .map_or_else(|| command.to.clone(), |column| column.status_value.clone());
        let approver_roles = template.approver_roles().clone();
        self.open(
            actor,
            GatedTransition {
                todo: &todo,
                template: &template,
                to,
                approver_roles,
                reason: command.reason,
            },
            settings.notification_enabled,
        )
        .await
        .map(|(request, _)| request)
    }

    /// Stores a pending request, reserves its task and writes the single
    /// audit entry. Returns the request and the reserved task.
    pub(crate) async fn open(
        &self,
        actor: &Actor,
        gated: GatedTransition<'_>,
        notify: bool,
    ) -> WorkflowResult<(ApprovalRequest, TodoRecord)> {
        let reserved = gated.todo.reserved(self.clock.utc());
        let request = ApprovalRequest::new(
            ApprovalDraft {
                todo_id: gated.todo.id,
                template_id: gated.template.id(),
                company_id: actor.company_id,
                from: gated.todo.status.clone(),
                todo_version: reserved.version,
                to: gated.to,
                requested_by: actor.id,
                required_approver_roles: gated.approver_roles,
                request_reason: gated.reason,
            },
            &*self.clock,
        );
        self.ports
            .approvals
            .insert_pending(&request)
            .await
            .map_err(|err| match err {
                ApprovalRepositoryError::PendingExists { todo_id, existing } => {
                    warn!(%existing, "approval already pending");
                    WorkflowError::conflict(format!(
                        "todo {todo_id} has pending approval request {existing}"
                    ))
                }
                other => other.into(),
            })?;
        if let Err(err) = self
            .ports
            .todos
            .compare_and_set(&reserved, gated.todo.version)
            .await
        {
            warn!(error = %err, "todo changed while its approval request was opened");
            self.discard(request.id()).await;
            return Err(err.into());
        }

        let record = self
            .audit_record(actor, AuditOperation::ApprovalRequested, request.id())
            .with_after(snapshot(&request)?)
            .with_reason(request.request_reason().map(str::to_owned));
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(request_id = %request.id(), error = %err, "approval audit failed, discarding request");
            self.discard(request.id()).await;
            if let Err(undo) = self
                .ports
                .todos
                .compare_and_set(gated.todo, reserved.version)
                .await
            {
                tracing::error!(error = %undo, "failed to release todo reservation");
            }
            return Err(err.into());
        }

        info!(request_id = %request.id(), "approval requested");
        if notify {
            self.committer
                .notify(WorkflowEvent::ApprovalRequested {
                    company_id: actor.company_id,
                    request_id: request.id(),
                    todo_id: request.todo_id(),
                    to: request.to_status().clone(),
                    requested_by: actor.id,
                })
                .await;
        }
        Ok((request, reserved))
    }

    /// Approves a pending request and executes its transition.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::AlreadyResolved`] when the request is no
    /// longer pending, [`WorkflowError::Forbidden`] when the approver holds
    /// none of the required roles, and [`WorkflowError::Conflict`] when the
    /// task moved since the request was opened; such a request is cancelled.
    /// On any other failure after the claim the request returns to pending.
    #[instrument(skip_all, fields(approver_id = %approver.id, request_id = %id))]
    pub async fn approve(
        &self,
        id: ApprovalRequestId,
        approver: &Actor,
        comments: Option<String>,
    ) -> WorkflowResult<ApprovalOutcome> {
        let pending = self.decidable(id, approver).await?;
        let todo = self
            .ports
            .todos
            .find(pending.todo_id())
            .await?
            .ok_or_else(|| WorkflowError::not_found("todo", pending.todo_id()))?;
        if !self.still_reserved(&pending, &todo) {
            return Err(self.retire_stale(&pending, approver, &todo).await);
        }
        let claimed = self
            .claim(id, ApprovalStatus::Approved, approver, comments.clone())
            .await?;

        let executed = self
            .committer
            .commit(
                &todo,
                pending.to_status().clone(),
                approver,
                CommitAudit {
                    operation: AuditOperation::ApprovalApproved,
                    reason: comments,
                    approval: Some(&pending),
                },
            )
            .await;
        match executed {
            Ok(updated) => {
                info!(version = updated.version, "approval granted and executed");
                self.notify_resolved(&claimed, approver).await;
                Ok(ApprovalOutcome {
                    request: claimed,
                    todo: Some(updated),
                })
            }
            Err(err) => {
                self.reopen(id).await;
                Err(err)
            }
        }
    }

    /// Rejects a pending request, leaving the task untouched.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `reason` is blank, and the same
    /// errors as [`Self::approve`] otherwise.
    #[instrument(skip_all, fields(approver_id = %approver.id, request_id = %id))]
    pub async fn reject(
        &self,
        id: ApprovalRequestId,
        approver: &Actor,
        reason: &str,
    ) -> WorkflowResult<ApprovalOutcome> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::validation("a rejection reason is required"));
        }
        let pending = self.decidable(id, approver).await?;
        let claimed = self
            .claim(id, ApprovalStatus::Rejected, approver, Some(reason.to_owned()))
            .await?;
        self.audit_resolution(approver, AuditOperation::ApprovalRejected, &pending, &claimed)
            .await?;
        info!("approval rejected");
        self.notify_resolved(&claimed, approver).await;
        Ok(ApprovalOutcome {
            request: claimed,
            todo: None,
        })
    }

    /// Withdraws a pending request. Allowed for the requester and for
    /// managers of the request's company.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] for other actors and
    /// [`WorkflowError::AlreadyResolved`] when the request is not pending.
    #[instrument(skip_all, fields(actor_id = %actor.id, request_id = %id))]
    pub async fn cancel(
        &self,
        id: ApprovalRequestId,
        actor: &Actor,
        reason: Option<String>,
    ) -> WorkflowResult<ApprovalOutcome> {
        let pending = self.find(actor, id).await?;
        ensure_pending(&pending)?;
        if pending.requested_by() != actor.id && !actor.role.dominates(Role::Manager) {
            warn!("approval cancellation denied");
            return Err(WorkflowError::forbidden(
                "only the requester or a manager can cancel an approval request",
            ));
        }
        let claimed = self
            .claim(id, ApprovalStatus::Cancelled, actor, reason)
            .await?;
        self.audit_resolution(actor, AuditOperation::ApprovalCancelled, &pending, &claimed)
            .await?;
        info!("approval cancelled");
        self.notify_resolved(&claimed, actor).await;
        Ok(ApprovalOutcome {
            request: claimed,
            todo: None,
        })
    }

    /// Returns a request of the actor's company.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for unknown requests and requests
    /// of other companies.
    pub async fn find(&self, actor: &Actor, id: ApprovalRequestId) -> WorkflowResult<ApprovalRequest> {
        self.ports
            .approvals
            .find(id)
            .await?
            .filter(|request| request.company_id() == actor.company_id)
            .ok_or_else(|| WorkflowError::not_found("approval request", id))
    }

    /// Returns the pending request of a task, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn pending_for_todo(
        &self,
        actor: &Actor,
        todo_id: TodoId,
    ) -> WorkflowResult<Option<ApprovalRequest>> {
        Ok(self
            .ports
            .approvals
            .pending_for_todo(todo_id)
            .await?
            .filter(|request| request.company_id() == actor.company_id))
    }

    /// Lists pending requests of the actor's company, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when storage fails.
    pub async fn list_pending(&self, actor: &Actor) -> WorkflowResult<Vec<ApprovalRequest>> {
        Ok(self.ports.approvals.list_pending(actor.company_id).await?)
    }

    async fn decidable(&self, id: ApprovalRequestId, approver: &Actor) -> WorkflowResult<ApprovalRequest> {
        let request = self.find(approver, id).await?;
        ensure_pending(&request)?;
        if !request.required_approver_roles().contains(&approver.role) {
            warn!(role = %approver.role, "approver role not permitted");
            return Err(WorkflowError::forbidden(format!(
                "role {} may not decide this request",
                approver.role
            )));
        }
        Ok(request)
    }

    async fn claim(
        &self,
        id: ApprovalRequestId,
        outcome: ApprovalStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> WorkflowResult<ApprovalRequest> {
        let resolution = Resolution {
            outcome,
            resolved_by: actor.id,
            note,
            at: self.clock.utc(),
        };
        self.ports
            .approvals
            .resolve(id, resolution)
            .await
            .map_err(|err| match err {
                ApprovalRepositoryError::NotPending { id, status } => {
                    warn!(%status, "approval lost the resolution race");
                    WorkflowError::AlreadyResolved { id, status }
                }
                other => other.into(),
            })
    }

    fn still_reserved(&self, request: &ApprovalRequest, todo: &TodoRecord) -> bool {
        todo.version == request.todo_version()
            && self.catalog.matching().same(&todo.status, request.from_status())
    }

    /// Cancels a request whose task moved underneath it and returns the
    /// conflict to report to the approver.
    async fn retire_stale(
        &self,
        pending: &ApprovalRequest,
        approver: &Actor,
        todo: &TodoRecord,
    ) -> WorkflowError {
        warn!(current = %todo.status, version = todo.version, "todo moved while approval was pending");
        let note = format!("task moved to '{}' while awaiting approval", todo.status);
        let claimed = match self
            .claim(pending.id(), ApprovalStatus::Cancelled, approver, Some(note))
            .await
        {
            Ok(claimed) => claimed,
            Err(err) => return err,
        };
        if let Err(err) = self
            .audit_resolution(approver, AuditOperation::ApprovalCancelled, pending, &claimed)
            .await
        {
            return err;
        }
        self.notify_resolved(&claimed, approver).await;
        WorkflowError::conflict(format!(
            "todo {} is in status '{}' at version {}, not '{}' at version {}; approval request {} was cancelled",
            todo.id,
            todo.status,
            todo.version,
            pending.from_status(),
            pending.todo_version(),
            pending.id()
        ))
    }

    async fn audit_resolution(
        &self,
        actor: &Actor,
        operation: AuditOperation,
        before: &ApprovalRequest,
        after: &ApprovalRequest,
    ) -> WorkflowResult<()> {
        let record = self
            .audit_record(actor, operation, after.id())
            .with_before(snapshot(before)?)
            .with_after(snapshot(after)?)
            .with_reason(after.reason().map(str::to_owned));
        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(request_id = %after.id(), error = %err, "resolution audit failed, reopening request");
            self.reopen(after.id()).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn discard(&self, id: ApprovalRequestId) {
        if let Err(err) = self.ports.approvals.discard(id).await {
            tracing::error!(request_id = %id, error = %err, "failed to discard approval request");
        }
    }

    async fn reopen(&self, id: ApprovalRequestId) {
        if let Err(err) = self.ports.approvals.reopen(id).await {
            tracing::error!(request_id = %id, error = %err, "failed to reopen approval request");
        }
    }

    async fn notify_resolved(&self, request: &ApprovalRequest, actor: &Actor) {
        let enabled = match self.settings.resolve(actor).await {
            Ok(settings) => settings.notification_enabled,
            Err(err) => {
                warn!(error = %err, "settings lookup for notification failed");
                false
            }
        };
        if enabled {
            self.committer
                .notify(WorkflowEvent::ApprovalResolved {
                    company_id: request.company_id(),
                    request_id: request.id(),
                    todo_id: request.todo_id(),
                    status: request.status(),
                    resolved_by: actor.id,
                })
                .await;
        }
    }

    fn audit_record(
        &self,
        actor: &Actor,
        operation: AuditOperation,
        id: ApprovalRequestId,
    ) -> AuditRecord {
        AuditRecord::new(
            operation,
            AuditTarget::new(AuditTargetType::ApprovalRequest, id),
            self.clock.utc(),
        )
        .with_actor(actor.id)
        .with_company(actor.company_id)
    }
}

fn ensure_pending(request: &ApprovalRequest) -> WorkflowResult<()> {
    if request.is_pending() {
        Ok(())
    } else {
        Err(WorkflowError::AlreadyResolved {
            id: request.id(),
            status: request.status(),
        })
    }
}
