//! Approval lifecycle tests: decisions, cancellation, races and events.

use super::helpers::{Scene, scene, status};
use eyre::{OptionExt, ensure};
use rstest::rstest;
use std::sync::Arc;
use taskflow::config::EngineConfig;
use taskflow::workflow::{
    adapters::{RecordingNotificationSink, memory::InMemoryWorkflowStores},
    domain::{
        ApprovalRequestId, ApprovalStatus, AuditOperation, SettingsPatch, TodoRecord,
        WorkflowEvent,
    },
    ports::TodoRepository,
    services::{
        ApprovalRequestCommand, ErrorKind, SettingsTarget, TransitionCommand, WorkflowError,
    },
};

/// Opens a CONTACTED -> WON request for a fresh task.
async fn open_request(scene: &Scene) -> eyre::Result<(TodoRecord, ApprovalRequestId)> {
    let todo = scene.seed_todo("CONTACTED")?;
    let outcome = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("CONTACTED"), status("WON"))
                .with_reason("contract signed"),
            &scene.member,
        )
        .await?;
    let request_id = outcome
        .approval_request_id
        .ok_or_eyre("gated move opens a request")?;
    Ok((todo, request_id))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejection_needs_a_reason_and_leaves_the_task(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let (todo, request_id) = open_request(&scene).await?;

    let blank = scene
        .engine
        .approvals()
        .reject(request_id, &scene.manager, "   ")
        .await;
    ensure!(
        blank.as_ref().err().map(WorkflowError::kind) == Some(ErrorKind::Validation),
        "blank reason refused: {blank:?}"
    );

    let rejected = scene
        .engine
        .approvals()
        .reject(request_id, &scene.manager, "price too low")
        .await?;

    ensure!(rejected.request.status() == ApprovalStatus::Rejected, "rejected");
    ensure!(rejected.request.reason() == Some("price too low"), "reason kept");
    ensure!(rejected.todo.is_none(), "no task change");
    let stored = scene
        .stores
        .todos
        .find(todo.id)
        .await?
        .ok_or_eyre("task stored")?;
    ensure!(stored == todo, "task untouched");
    let last = scene.audit()?.pop().ok_or_eyre("audit written")?;
    ensure!(last.operation == AuditOperation::ApprovalRejected, "operation");
    ensure!(last.before.is_some() && last.after.is_some(), "snapshots");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resolved_requests_cannot_be_decided_again(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let (_, request_id) = open_request(&scene).await?;
    scene
        .engine
        .approvals()
        .approve(request_id, &scene.manager, None)
        .await?;

    let again = scene
        .engine
        .approvals()
        .reject(request_id, &scene.company_leader, "changed my mind")
        .await;

    ensure!(
        matches!(
            again,
            Err(WorkflowError::AlreadyResolved {
                status: ApprovalStatus::Approved,
                ..
            })
        ),
        "got {again:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_decisions_resolve_exactly_once(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let (_, request_id) = open_request(&scene).await?;
    let before = scene.audit()?.len();

    let approving = {
        let engine = Arc::clone(&scene.engine);
        let approver = scene.manager;
        tokio::spawn(async move {
            engine
                .approvals()
                .approve(request_id, &approver, None)
                .await
                .map(|outcome| outcome.request.status())
        })
    };
    let rejecting = {
        let engine = Arc::clone(&scene.engine);
        let approver = scene.company_leader;
        tokio::spawn(async move {
            engine
                .approvals()
                .reject(request_id, &approver, "no")
                .await
                .map(|outcome| outcome.request.status())
        })
    };
    let results = [approving.await?, rejecting.await?];

    let winners = results.iter().filter(|result| result.is_ok()).count();
    let losers = results
        .iter()
        .filter(|result| matches!(result, Err(WorkflowError::AlreadyResolved { .. })))
        .count();
    ensure!(winners == 1 && losers == 1, "got {results:?}");
    ensure!(
        scene.audit()?.len() == before + 1,
        "only the winner is audited"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_task_cancels_the_request(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let (todo, request_id) = open_request(&scene).await?;
    let reserved = scene
        .stores
        .todos
        .find(todo.id)
        .await?
        .ok_or_eyre("task stored")?;
    scene
        .stores
        .todos
        .insert(reserved.advanced(status("LOST"), chrono::Utc::now()))?;

    let result = scene
        .engine
        .approvals()
        .approve(request_id, &scene.manager, None)
        .await;

    ensure!(
        result.as_ref().err().map(WorkflowError::kind) == Some(ErrorKind::Conflict),
        "stale task conflicts: {result:?}"
    );
    let request = scene
        .engine
        .approvals()
        .find(&scene.manager, request_id)
        .await?;
    ensure!(
        request.status() == ApprovalStatus::Cancelled,
        "stale request retired, got {}",
        request.status()
    );
    ensure!(request.reason().is_some(), "cancellation explains itself");
    let last = scene.audit()?.pop().ok_or_eyre("audit written")?;
    ensure!(last.operation == AuditOperation::ApprovalCancelled, "cancellation audited");

    let next = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("LOST"), status("NEW")),
            &scene.member,
        )
        .await?;
    ensure!(next.executed, "task is no longer blocked");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn requester_or_manager_may_cancel(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let (_, first) = open_request(&scene).await?;
    let (_, second) = open_request(&scene).await?;

    let by_stranger = scene
        .engine
        .approvals()
        .cancel(first, &scene.team_leader, None)
        .await;
    let by_requester = scene
        .engine
        .approvals()
        .cancel(first, &scene.member, Some("duplicate".to_owned()))
        .await?;
    let by_manager = scene
        .engine
        .approvals()
        .cancel(second, &scene.manager, None)
        .await?;

    ensure!(
        matches!(by_stranger, Err(WorkflowError::Forbidden(_))),
        "got {by_stranger:?}"
    );
    ensure!(
        by_requester.request.status() == ApprovalStatus::Cancelled,
        "requester cancelled"
    );
    ensure!(by_requester.request.reason() == Some("duplicate"), "reason");
    ensure!(
        by_manager.request.status() == ApprovalStatus::Cancelled,
        "manager cancelled"
    );
    ensure!(
        scene
            .engine
            .approvals()
            .list_pending(&scene.manager)
            .await?
            .is_empty(),
        "nothing pending"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_request_always_opens_a_request(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let template = scene.install_sales_template().await?;
    let todo = scene.seed_todo("NEW")?;

    let request = scene
        .engine
        .approvals()
        .request(
            &scene.member,
            ApprovalRequestCommand {
                workflow_id: template.id(),
                todo_id: todo.id,
                to: status("contacted"),
                reason: Some("please check".to_owned()),
            },
        )
        .await?;
    let refused = scene
        .engine
        .approvals()
        .request(
            &scene.member,
            ApprovalRequestCommand {
                workflow_id: template.id(),
                todo_id: scene.seed_todo("NEW")?.id,
                to: status("COMPLETED"),
                reason: None,
            },
        )
        .await;

    ensure!(request.is_pending(), "opened");
    ensure!(request.to_status().as_str() == "CONTACTED", "canonical target");
    ensure!(request.request_reason() == Some("please check"), "reason");
    ensure!(
        request.required_approver_roles() == template.approver_roles(),
        "template approvers"
    );
    ensure!(
        refused.as_ref().err().map(WorkflowError::kind) == Some(ErrorKind::Validation),
        "target outside the template: {refused:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn events_follow_the_notification_setting() -> eyre::Result<()> {
    let stores = InMemoryWorkflowStores::new();
    let sink = RecordingNotificationSink::new();
    let ports = stores
        .ports()
        .with_notifications(Arc::new(sink.clone()));
    let scene = Scene::over(stores, ports, EngineConfig::default());
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;

    let (_, request_id) = open_request(&scene).await?;
    scene
        .engine
        .approvals()
        .approve(request_id, &scene.manager, None)
        .await?;
    let events = sink.events();
    ensure!(
        matches!(
            events.as_slice(),
            [
                WorkflowEvent::ApprovalRequested { .. },
                WorkflowEvent::ApprovalResolved {
                    status: ApprovalStatus::Approved,
                    ..
                }
            ]
        ),
        "got {events:?}"
    );

    scene
        .engine
        .settings()
        .update(
            &scene.manager,
            SettingsTarget::Company(scene.company),
            SettingsPatch::default().with_notification_enabled(false),
        )
        .await?;
    open_request(&scene).await?;
    ensure!(sink.events().len() == 2, "muted company emits nothing");
    Ok(())
}
