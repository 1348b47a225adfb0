//! The workflow executor: the only entry point that changes task status.

use super::approvals::GatedTransition;
use super::{
    ApprovalFlowManager, SettingsResolver, StatusCatalogService, TemplateStore, WorkflowError,
    WorkflowResult, snapshot,
};
use crate::workflow::{
    domain::{
        Actor, ApprovalRequest, ApprovalRequestId, AuditOperation, AuditRecord, AuditTarget,
        AuditTargetType, DenyReason, StatusName, TodoId, TodoRecord, TransitionContext,
        TransitionDecision, WorkflowEvent, decide,
    },
    ports::WorkflowPorts,
};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCommand {
    /// Task to move.
    pub todo_id: TodoId,
    /// Status the caller believes the task is in.
    pub from: StatusName,
    /// Requested status.
    pub to: StatusName,
    /// Free-text reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Task version the caller read, if it tracks versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl TransitionCommand {
    /// Creates a command without reason or version guard.
    #[must_use]
    pub const fn new(todo_id: TodoId, from: StatusName, to: StatusName) -> Self {
        Self {
            todo_id,
            from,
            to,
            reason: None,
            expected_version: None,
        }
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Guards the change with the version the caller read.
    #[must_use]
    pub const fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Result of [`WorkflowExecutor::apply_transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    /// `true` when the task status changed.
    pub executed: bool,
    /// Request opened instead of changing the status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_request_id: Option<ApprovalRequestId>,
    /// Task state after the call.
    pub todo: TodoRecord,
}

/// What the committer should record alongside the status change.
pub(crate) struct CommitAudit<'a> {
    pub operation: AuditOperation,
    pub reason: Option<String>,
    pub approval: Option<&'a ApprovalRequest>,
}

/// Performs the compare-and-set mutation and its single audit entry, undoing
/// the mutation when the audit write fails.
pub(crate) struct TransitionCommitter<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkflowPorts,
    clock: Arc<C>,
}

impl<C> TransitionCommitter<C>
where
    C: Clock + Send + Sync,
{
    pub(crate) const fn new(ports: WorkflowPorts, clock: Arc<C>) -> Self {
        Self { ports, clock }
    }

    pub(crate) async fn commit(
        &self,
        todo: &TodoRecord,
        to: StatusName,
        actor: &Actor,
        audit: CommitAudit<'_>,
    ) -> WorkflowResult<TodoRecord> {
        let now = self.clock.utc();
        let updated = todo.advanced(to, now);
        self.ports
            .todos
            .compare_and_set(&updated, todo.version)
            .await?;

        let mut record = AuditRecord::new(
            audit.operation,
            AuditTarget::new(AuditTargetType::Todo, todo.id),
            now,
        )
        .with_actor(actor.id)
        .with_company(actor.company_id)
        .with_before(snapshot(todo)?)
        .with_after(snapshot(&updated)?)
        .with_reason(audit.reason);
        if let Some(request) = audit.approval {
            record = record.with_metadata(serde_json::json!({
                "approvalRequestId": request.id(),
                "requestedBy": request.requested_by(),
            }));
        }

        if let Err(err) = self.ports.audit.append(record).await {
            tracing::error!(todo_id = %todo.id, error = %err, "transition audit failed, rolling back");
            if let Err(undo) = self
                .ports
                .todos
                .compare_and_set(todo, updated.version)
                .await
            {
                tracing::error!(todo_id = %todo.id, error = %undo, "transition rollback failed");
            }
            return Err(err.into());
        }
        Ok(updated)
    }

    pub(crate) async fn notify(&self, event: WorkflowEvent) {
        if let Err(err) = self.ports.notifications.notify(&event).await {
            warn!(event = event.name(), error = %err, "workflow notification failed");
        }
    }
}

/// Orchestrates validation, execution or approval, and auditing of status
/// changes.
pub struct WorkflowExecutor<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkflowPorts,
    settings: Arc<SettingsResolver<C>>,
    catalog: Arc<StatusCatalogService<C>>,
    templates: Arc<TemplateStore<C>>,
    approvals: Arc<ApprovalFlowManager<C>>,
    committer: Arc<TransitionCommitter<C>>,
}

impl<C> WorkflowExecutor<C>
where
    C: Clock + Send + Sync,
{
    pub(crate) const fn new(
        ports: WorkflowPorts,
        settings: Arc<SettingsResolver<C>>,
        catalog: Arc<StatusCatalogService<C>>,
        templates: Arc<TemplateStore<C>>,
        approvals: Arc<ApprovalFlowManager<C>>,
        committer: Arc<TransitionCommitter<C>>,
    ) -> Self {
        Self {
            ports,
            settings,
            catalog,
            templates,
            approvals,
            committer,
        }
    }

    /// Applies `command` under the actor's active template.
    ///
    /// Writes exactly one audit entry on success: the executed change or the
    /// opened approval request.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::NoOpTransition`] when `from` and `to` are the same.
    /// - [`WorkflowError::NotFound`] when the task is unknown to the actor's
    ///   company.
    /// - [`WorkflowError::Conflict`] when the task is not in `from`, its
    ///   version moved, or an approval is pending.
    /// - A validation error when the template refuses the target.
    #[instrument(skip_all, fields(actor_id = %actor.id, todo_id = %command.todo_id, from = %command.from, to = %command.to))]
    pub async fn apply_transition(
        &self,
        command: TransitionCommand,
        actor: &Actor,
    ) -> WorkflowResult<TransitionOutcome> {
        let matching = self.catalog.matching();
        if matching.same(&command.from, &command.to) {
            warn!("no-op transition rejected");
            return Err(WorkflowError::NoOpTransition {
                status: command.from,
            });
        }

        let todo = self
            .ports
            .todos
            .find(command.todo_id)
            .await?
            .filter(|todo| todo.company_id == actor.company_id)
            .ok_or_else(|| WorkflowError::not_found("todo", command.todo_id))?;
        if !matching.same(&todo.status, &command.from) {
            warn!(current = %todo.status, "stale source status");
            return Err(WorkflowError::conflict(format!(
                "todo {} is in status '{}', not '{}'",
                todo.id, todo.status, command.from
            )));
        }
        if let Some(expected) = command.expected_version {
            if expected != todo.version {
                warn!(expected, actual = todo.version, "stale todo version");
                return Err(WorkflowError::conflict(format!(
                    "todo {} is at version {}, expected {expected}",
                    todo.id, todo.version
                )));
            }
        }
        if let Some(pending) = self.ports.approvals.pending_for_todo(todo.id).await? {
            warn!(request_id = %pending.id(), "approval already pending");
            return Err(WorkflowError::conflict(format!(
                "todo {} has pending approval request {}",
                todo.id,
                pending.id()
            )));
        }

        let settings = self.settings.resolve(actor).await?;
        let template = self
            .templates
            .governing(actor, settings.active_template_id)
            .await?;
        let catalog = self.catalog.resolve_visible(actor).await?;
        let context = TransitionContext {
            template: &template,
            catalog: &catalog,
            auto_transition: settings.auto_transition,
        };
        let target = template
            .column_for(&command.to, matching)
            .map_or_else(|| command.to.clone(), |column| column.status_value.clone());

        match decide(context, &todo.status, &command.to) {
            TransitionDecision::Denied(DenyReason::NoOp) => Err(WorkflowError::NoOpTransition {
                status: command.from,
            }),
            TransitionDecision::Denied(reason) => {
                warn!(%reason, template_id = %template.id(), "transition denied");
                Err(WorkflowError::validation(reason.describe()))
            }
            TransitionDecision::Allowed => {
                let from = todo.status.clone();
                let updated = self
                    .committer
                    .commit(
                        &todo,
                        target.clone(),
                        actor,
                        CommitAudit {
                            operation: AuditOperation::TransitionExecuted,
                            reason: command.reason,
                            approval: None,
                        },
                    )
                    .await?;
                info!(version = updated.version, "transition executed");
                if settings.notification_enabled {
                    self.committer
                        .notify(WorkflowEvent::TransitionExecuted {
                            company_id: actor.company_id,
                            todo_id: todo.id,
                            from,
                            to: target,
                            actor_id: actor.id,
                        })
                        .await;
                }
                Ok(TransitionOutcome {
                    executed: true,
                    approval_request_id: None,
                    todo: updated,
                })
            }
            TransitionDecision::AllowedWithApproval {
                approver_roles,
                trigger,
            } => {
                let (request, reserved) = self
                    .approvals
                    .open(
                        actor,
                        GatedTransition {
                            todo: &todo,
                            template: &template,
                            to: target,
                            approver_roles,
                            reason: command.reason,
                        },
                        settings.notification_enabled,
                    )
                    .await?;
                info!(request_id = %request.id(), ?trigger, "transition awaits approval");
                Ok(TransitionOutcome {
                    executed: false,
                    approval_request_id: Some(request.id()),
                    todo: reserved,
                })
            }
        }
    }
}
