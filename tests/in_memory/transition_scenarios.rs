//! End-to-end transition scenarios over the in-memory engine.

use super::helpers::{Scene, scene, status};
use eyre::{OptionExt, ensure};
use rstest::rstest;
use taskflow::config::EngineConfig;
use taskflow::workflow::{
    domain::{
        Actor, ActorId, AuditOperation, ColumnSpec, CompanyId, Role, Scope, SettingsPatch,
        Styling, TemplateType,
    },
    ports::TodoRepository,
    services::{
        CreateTemplate, ErrorKind, NewStatus, SettingsTarget, TransitionCommand, WorkflowError,
    },
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn ungated_move_executes_with_one_audit_entry(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    scene.set_auto_transition(&scene.member, true).await?;
    let todo = scene.seed_todo("NEW")?;
    let before = scene.audit()?.len();

    let outcome = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("NEW"), status("CONTACTED")),
            &scene.member,
        )
        .await?;

    ensure!(outcome.executed, "ungated move executes");
    ensure!(outcome.approval_request_id.is_none(), "no request opened");
    let entries = scene.audit()?;
    ensure!(entries.len() == before + 1, "exactly one audit entry");
    let last = entries.last().ok_or_eyre("audit entry written")?;
    ensure!(last.operation == AuditOperation::TransitionExecuted, "operation");
    ensure!(last.actor_id == Some(scene.member.id), "actor recorded");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn gated_move_opens_a_request_and_blocks_the_task(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    scene.set_auto_transition(&scene.member, true).await?;
    let todo = scene.seed_todo("CONTACTED")?;
    let command = TransitionCommand::new(todo.id, status("CONTACTED"), status("WON"));

    let outcome = scene
        .engine
        .executor()
        .apply_transition(command.clone(), &scene.member)
        .await?;
    let second = scene
        .engine
        .executor()
        .apply_transition(command, &scene.member)
        .await;

    ensure!(!outcome.executed, "gated move waits for approval");
    let request_id = outcome
        .approval_request_id
        .ok_or_eyre("approval request id returned")?;
    ensure!(outcome.todo.status.as_str() == "CONTACTED", "task untouched");
    ensure!(
        second.as_ref().err().map(WorkflowError::kind) == Some(ErrorKind::Conflict),
        "second request conflicts: {second:?}"
    );
    let pending = scene
        .engine
        .approvals()
        .pending_for_todo(&scene.member, todo.id)
        .await?
        .ok_or_eyre("request pending")?;
    ensure!(pending.id() == request_id, "same request");
    let stored = scene
        .stores
        .todos
        .find(todo.id)
        .await?
        .ok_or_eyre("task stored")?;
    ensure!(stored.status.as_str() == "CONTACTED", "store untouched");
    ensure!(stored.version == todo.version + 1, "request reserves the task");
    ensure!(outcome.todo == stored, "outcome reports the reserved task");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_listed_roles_may_approve(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let todo = scene.seed_todo("CONTACTED")?;
    let outcome = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("CONTACTED"), status("WON")),
            &scene.member,
        )
        .await?;
    let request_id = outcome
        .approval_request_id
        .ok_or_eyre("approval request id returned")?;
    let before = scene.audit()?.len();

    let denied = scene
        .engine
        .approvals()
        .approve(request_id, &scene.team_leader, None)
        .await;
    ensure!(
        matches!(denied, Err(WorkflowError::Forbidden(_))),
        "team leader is not an approver: {denied:?}"
    );
    ensure!(scene.audit()?.len() == before, "denial writes nothing");

    let approved = scene
        .engine
        .approvals()
        .approve(request_id, &scene.manager, Some("good deal".to_owned()))
        .await?;

    let moved = approved.todo.ok_or_eyre("approval executes the move")?;
    ensure!(moved.status.as_str() == "WON", "task moved to WON");
    ensure!(moved.version == todo.version + 1, "version bumped once");
    ensure!(approved.request.comments() == Some("good deal"), "comments kept");
    let entries = scene.audit()?;
    ensure!(entries.len() == before + 1, "exactly one additional audit entry");
    let last = entries.last().ok_or_eyre("audit entry written")?;
    ensure!(last.operation == AuditOperation::ApprovalApproved, "operation");
    Ok(())
}

fn personal_contacted() -> NewStatus {
    NewStatus {
        scope: Scope::Personal,
        name: status("contacted"),
        display_name: "Contacted".to_owned(),
        styling: Styling::default(),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn personal_lowercase_twin_is_a_duplicate_by_default(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.allow_custom_statuses().await?;

    let result = scene
        .engine
        .catalog()
        .create_custom_status(&scene.member, personal_contacted())
        .await;

    let err = result.err().ok_or_eyre("collision must fail")?;
    ensure!(
        matches!(err, WorkflowError::DuplicateName { .. }),
        "got {err}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn personal_lowercase_twin_is_distinct_when_case_sensitive() -> eyre::Result<()> {
    let scene = Scene::with_config(EngineConfig::case_sensitive());
    scene.engine.bootstrap().await?;
    scene.allow_custom_statuses().await?;

    let created = scene
        .engine
        .catalog()
        .create_custom_status(&scene.member, personal_contacted())
        .await?;

    ensure!(created.name.as_str() == "contacted", "stored verbatim");
    ensure!(created.owner == scene.member.personal_scope(), "personal owner");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn custom_statuses_stay_forbidden_without_the_setting(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;

    let result = scene
        .engine
        .catalog()
        .create_custom_status(&scene.member, personal_contacted())
        .await;

    ensure!(
        matches!(result, Err(WorkflowError::Forbidden(_))),
        "got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_columns_need_approval_only_without_auto_transition(
    scene: Scene,
) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let template = scene
        .engine
        .templates()
        .create(
            &scene.member,
            CreateTemplate::new(
                "My Review Board",
                TemplateType::Standard,
                vec![
                    ColumnSpec::new("To Do", status("TODO"), 1),
                    ColumnSpec::new("Review", status("IN_REVIEW"), 2)
                        .requires_review(),
                ],
            ),
        )
        .await?;
    scene
        .engine
        .settings()
        .update(
            &scene.member,
            SettingsTarget::Own,
            SettingsPatch::default()
                .with_active_template(template.id())
                .with_auto_transition(false),
        )
        .await?;
    let gated = scene.seed_todo("TODO")?;
    let free = scene.seed_todo("TODO")?;

    let waiting = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(gated.id, status("TODO"), status("IN_REVIEW")),
            &scene.member,
        )
        .await?;
    scene.set_auto_transition(&scene.member, true).await?;
    let executed = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(free.id, status("TODO"), status("IN_REVIEW")),
            &scene.member,
        )
        .await?;

    ensure!(!waiting.executed, "review boundary needs approval");
    ensure!(executed.executed, "auto transition skips the review");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_of_other_companies_are_not_found(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let todo = scene.seed_todo("TODO")?;
    let stranger = Actor::new(
        ActorId::new(),
        CompanyId::new(),
        Role::CompanyLeader,
    );

    let result = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("TODO"), status("IN_PROGRESS")),
            &stranger,
        )
        .await;

    ensure!(
        result.err().map(|err| err.kind()) == Some(ErrorKind::NotFound),
        "foreign tasks are invisible"
    );
    Ok(())
}
