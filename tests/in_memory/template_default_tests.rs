//! System default template invariants.

use super::helpers::{Scene, scene, status};
use eyre::{OptionExt, ensure};
use rstest::rstest;
use std::collections::BTreeSet;
use taskflow::workflow::{
    domain::{
        Actor, ActorId, AuditOperation, AuditTarget, AuditTargetType, ColumnSpec, CompanyId, Role,
        TemplateDraft, TemplateName, TemplateType, WorkflowTemplate,
    },
    ports::TemplateRepository,
    services::{AuditQuery, ErrorKind, STANDARD_TEMPLATE_NAME, TemplateQuery},
};

fn kanban_draft() -> TemplateDraft {
    TemplateDraft::new(
        "Kanban",
        TemplateType::Standard,
        vec![
            ColumnSpec::new("Backlog", status("TODO"), 1),
            ColumnSpec::new("Doing", status("IN_PROGRESS"), 2),
            ColumnSpec::new("Done", status("COMPLETED"), 3),
        ],
        BTreeSet::from([Role::Manager]),
    )
}

async fn defaults_of(scene: &Scene, template_type: TemplateType) -> eyre::Result<usize> {
    let page = scene
        .engine
        .templates()
        .list(
            &scene.member,
            TemplateQuery {
                template_type: Some(template_type),
                limit: Some(100),
                ..TemplateQuery::default()
            },
        )
        .await?;
    Ok(page
        .items
        .iter()
        .filter(|template| template.is_system_default())
        .count())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn switching_the_default_keeps_exactly_one(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let standard = scene
        .engine
        .templates()
        .find_system(&TemplateName::new(STANDARD_TEMPLATE_NAME)?)
        .await?
        .ok_or_eyre("standard installed")?;
    let kanban = scene
        .engine
        .templates()
        .install_system_template(None, kanban_draft())
        .await?;
    ensure!(!kanban.is_system_default(), "existing default is kept");

    let promoted = scene
        .engine
        .templates()
        .set_system_default(None, kanban.id(), TemplateType::Standard)
        .await?;

    ensure!(promoted.is_system_default(), "kanban promoted");
    ensure!(defaults_of(&scene, TemplateType::Standard).await? == 1, "one default");
    let demoted = scene
        .stores
        .templates
        .find(standard.id())
        .await?
        .ok_or_eyre("standard still stored")?;
    ensure!(!demoted.is_system_default(), "previous default cleared");
    let last = scene.audit()?.pop().ok_or_eyre("audit written")?;
    ensure!(last.operation == AuditOperation::SystemDefaultChanged, "operation");
    ensure!(last.actor_id.is_none(), "start-up change has no actor");
    ensure!(last.before.is_some(), "previous default recorded");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeating_the_switch_is_a_no_op(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let kanban = scene
        .engine
        .templates()
        .install_system_template(None, kanban_draft())
        .await?;
    scene
        .engine
        .templates()
        .set_system_default(None, kanban.id(), TemplateType::Standard)
        .await?;
    let entries = scene.audit()?.len();

    scene
        .engine
        .templates()
        .set_system_default(None, kanban.id(), TemplateType::Standard)
        .await?;

    ensure!(scene.audit()?.len() == entries, "nothing recorded twice");
    ensure!(defaults_of(&scene, TemplateType::Standard).await? == 1, "one default");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tenant_templates_cannot_become_the_default(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let sales = scene.install_sales_template().await?;

    let wrong_type = scene
        .engine
        .templates()
        .set_system_default(None, sales.id(), TemplateType::Standard)
        .await;
    let tenant_owned = scene
        .engine
        .templates()
        .set_system_default(None, sales.id(), TemplateType::ApprovalProcess)
        .await;

    for result in [wrong_type, tenant_owned] {
        ensure!(
            result.as_ref().err().map(|err| err.kind()) == Some(ErrorKind::Validation),
            "got {result:?}"
        );
    }
    ensure!(defaults_of(&scene, TemplateType::Standard).await? == 1, "default intact");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deactivated_templates_fall_back_to_the_default(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let sales = scene.install_sales_template().await?;
    let before = scene.engine.settings().resolve(&scene.member).await?;
    ensure!(before.active_template_id == Some(sales.id()), "company template active");

    scene
        .engine
        .templates()
        .deactivate(&scene.manager, sales.id())
        .await?;
    let after = scene.engine.settings().resolve(&scene.member).await?;

    let standard = scene
        .engine
        .templates()
        .find_system(&TemplateName::new(STANDARD_TEMPLATE_NAME)?)
        .await?
        .ok_or_eyre("standard installed")?;
    ensure!(
        after.active_template_id == Some(standard.id()),
        "falls back to the system default"
    );
    Ok(())
}

async fn standard_of(scene: &Scene) -> eyre::Result<WorkflowTemplate> {
    scene
        .engine
        .templates()
        .find_system(&TemplateName::new(STANDARD_TEMPLATE_NAME)?)
        .await?
        .ok_or_eyre("standard installed")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operator_default_changes_are_attributed_and_queryable() -> eyre::Result<()> {
    let scene = Scene::operating();
    scene.engine.bootstrap().await?;
    let kanban = scene
        .engine
        .templates()
        .install_system_template(Some(&scene.company_leader), kanban_draft())
        .await?;

    scene
        .engine
        .templates()
        .set_system_default(Some(&scene.company_leader), kanban.id(), TemplateType::Standard)
        .await?;

    let page = scene
        .engine
        .audit()
        .query(
            &scene.manager,
            AuditQuery {
                target: Some(AuditTarget::new(AuditTargetType::Template, kanban.id())),
                ..AuditQuery::default()
            },
        )
        .await?;
    let operations: Vec<_> = page.items.iter().map(|entry| entry.operation).collect();
    ensure!(
        operations
            == [
                AuditOperation::TemplateCreated,
                AuditOperation::SystemDefaultChanged
            ],
        "got {operations:?}"
    );
    ensure!(
        page.items.iter().all(|entry| {
            entry.actor_id == Some(scene.company_leader.id)
                && entry.company_id == Some(scene.company)
        }),
        "operator recorded on every entry"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn start_up_entries_are_readable_by_managers(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let standard = standard_of(&scene).await?;

    let page = scene
        .engine
        .audit()
        .query(
            &scene.manager,
            AuditQuery {
                operation: Some(AuditOperation::SystemDefaultChanged),
                ..AuditQuery::default()
            },
        )
        .await?;

    let entry = page.items.first().ok_or_eyre("start-up default visible")?;
    ensure!(entry.target.id == standard.id().to_string(), "standard promoted");
    ensure!(entry.actor_id.is_none() && entry.company_id.is_none(), "system entry");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tenant_leaders_cannot_change_the_shared_default() -> eyre::Result<()> {
    let scene = Scene::operating();
    scene.engine.bootstrap().await?;
    let standard = standard_of(&scene).await?;
    let kanban = scene
        .engine
        .templates()
        .install_system_template(None, kanban_draft())
        .await?;
    let tenant_leader = Actor::new(ActorId::new(), CompanyId::new(), Role::CompanyLeader);
    let entries = scene.audit()?.len();

    let foreign = scene
        .engine
        .templates()
        .set_system_default(Some(&tenant_leader), kanban.id(), TemplateType::Standard)
        .await;
    let manager = scene
        .engine
        .templates()
        .set_system_default(Some(&scene.manager), kanban.id(), TemplateType::Standard)
        .await;
    let install = scene
        .engine
        .templates()
        .install_system_template(Some(&tenant_leader), kanban_draft())
        .await;

    for result in [foreign, manager, install] {
        ensure!(
            result.as_ref().err().map(|err| err.kind()) == Some(ErrorKind::Forbidden),
            "got {result:?}"
        );
    }
    ensure!(scene.audit()?.len() == entries, "nothing recorded");
    ensure!(
        standard_of(&scene).await?.is_system_default(),
        "standard stays the default"
    );
    Ok(())
}
