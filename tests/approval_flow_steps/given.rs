//! Given steps for approval flow BDD scenarios.

use super::world::{ApprovalWorld, run_async};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use taskflow::workflow::{
    domain::{ColumnSpec, Role, Scope, SettingsPatch, StatusName, TemplateType, TodoId, TodoRecord},
    services::{CreateTemplate, SettingsTarget},
};

#[given(r#"a company using the "{name}" approval workflow"#)]
fn company_with_approval_workflow(
    world: &mut ApprovalWorld,
    name: String,
) -> Result<(), eyre::Report> {
    run_async(world.engine.bootstrap()).wrap_err("bootstrap engine")?;
    let manager = world.actor(Role::Manager)?;
    let template = run_async(
        world.engine.templates().create(
            &manager,
            CreateTemplate::new(
                name,
                TemplateType::ApprovalProcess,
                vec![
                    ColumnSpec::new("New", StatusName::new("NEW")?, 1),
                    ColumnSpec::new("Contacted", StatusName::new("CONTACTED")?, 2),
                    ColumnSpec::new("Won", StatusName::new("WON")?, 3).gated(),
                ],
            )
            .in_scope(Scope::Company)
            .with_approver_roles([Role::Manager, Role::CompanyLeader]),
        ),
    )
    .wrap_err("create approval template")?;
    run_async(world.engine.settings().update(
        &manager,
        SettingsTarget::Company(world.company),
        SettingsPatch::default().with_active_template(template.id()),
    ))
    .wrap_err("activate approval template")?;
    world.member = Some(world.actor(Role::Member)?);
    Ok(())
}

#[given(r#"a task in status "{status}""#)]
fn task_in_status(world: &mut ApprovalWorld, status: String) -> Result<(), eyre::Report> {
    let record = TodoRecord::new(
        TodoId::new(),
        world.company,
        StatusName::new(status)?,
        &DefaultClock,
    );
    world.stores.todos.insert(record.clone())?;
    world.todo = Some(record);
    Ok(())
}

#[given("the member has auto transition enabled")]
fn member_auto_transition(world: &mut ApprovalWorld) -> Result<(), eyre::Report> {
    let member = *world.member()?;
    run_async(world.engine.settings().update(
        &member,
        SettingsTarget::Own,
        SettingsPatch::default().with_auto_transition(true),
    ))
    .wrap_err("enable auto transition")?;
    Ok(())
}
