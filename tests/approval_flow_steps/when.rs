//! When steps for approval flow BDD scenarios.

use super::world::{ApprovalWorld, run_async};
use rstest_bdd_macros::when;
use taskflow::workflow::{
    domain::{Role, StatusName},
    services::TransitionCommand,
};

fn role(raw: &str) -> Result<Role, eyre::Report> {
    Role::try_from(raw).map_err(|err| eyre::eyre!("invalid role in scenario: {err}"))
}

#[when(r#"the member moves the task from "{from}" to "{to}""#)]
fn member_moves_task(
    world: &mut ApprovalWorld,
    from: String,
    to: String,
) -> Result<(), eyre::Report> {
    let member = *world.member()?;
    let command = TransitionCommand::new(
        world.todo()?.id,
        StatusName::new(from)?,
        StatusName::new(to)?,
    );

    match run_async(world.engine.executor().apply_transition(command, &member)) {
        Ok(outcome) => {
            if let Some(id) = outcome.approval_request_id {
                world.request = Some(run_async(world.engine.approvals().find(&member, id))?);
            }
            world.last_executed = Some(outcome.executed);
            world.todo = Some(outcome.todo);
            world.last_error = None;
        }
        Err(err) => world.last_error = Some(err),
    }
    Ok(())
}

#[when(r#"the "{approver}" approves the request"#)]
fn approves_request(world: &mut ApprovalWorld, approver: String) -> Result<(), eyre::Report> {
    let actor = world.actor(role(&approver)?)?;
    let id = world.request()?.id();

    match run_async(world.engine.approvals().approve(id, &actor, None)) {
        Ok(outcome) => {
            world.request = Some(outcome.request);
            if let Some(todo) = outcome.todo {
                world.todo = Some(todo);
            }
            world.last_error = None;
        }
        Err(err) => world.last_error = Some(err),
    }
    Ok(())
}

#[when(r#"the "{approver}" rejects the request with reason "{reason}""#)]
fn rejects_request(
    world: &mut ApprovalWorld,
    approver: String,
    reason: String,
) -> Result<(), eyre::Report> {
    let actor = world.actor(role(&approver)?)?;
    let id = world.request()?.id();

    match run_async(world.engine.approvals().reject(id, &actor, &reason)) {
        Ok(outcome) => {
            world.request = Some(outcome.request);
            world.last_error = None;
        }
        Err(err) => world.last_error = Some(err),
    }
    Ok(())
}
