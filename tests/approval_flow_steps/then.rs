//! Then steps for approval flow BDD scenarios.

use super::world::{ApprovalWorld, run_async};
use rstest_bdd_macros::then;
use taskflow::workflow::{domain::ApprovalStatus, ports::TodoRepository};

#[then("the transition is executed")]
fn transition_executed(world: &ApprovalWorld) -> Result<(), eyre::Report> {
    if let Some(err) = &world.last_error {
        return Err(eyre::eyre!("expected success, got {err}"));
    }
    eyre::ensure!(
        world.last_executed == Some(true),
        "expected an executed transition, got {:?}",
        world.last_executed
    );
    Ok(())
}

#[then("an approval request is pending")]
fn approval_pending(world: &ApprovalWorld) -> Result<(), eyre::Report> {
    let member = world.member()?;
    let pending = run_async(
        world
            .engine
            .approvals()
            .pending_for_todo(member, world.todo()?.id),
    )?;
    let request = pending.ok_or_else(|| eyre::eyre!("no pending request"))?;
    eyre::ensure!(
        request.id() == world.request()?.id(),
        "pending request differs from the one opened"
    );
    Ok(())
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &ApprovalWorld, status: String) -> Result<(), eyre::Report> {
    let stored = run_async(world.stores.todos.find(world.todo()?.id))?
        .ok_or_else(|| eyre::eyre!("task missing from store"))?;
    eyre::ensure!(
        stored.status.as_str() == status,
        "expected status {status}, found {}",
        stored.status
    );
    Ok(())
}

#[then(r#"the request is "{status}""#)]
fn request_is(world: &ApprovalWorld, status: String) -> Result<(), eyre::Report> {
    let expected = ApprovalStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let actual = world.request()?.status();
    eyre::ensure!(actual == expected, "expected {expected}, found {actual}");
    Ok(())
}

#[then(r#"the last call fails with "{code}""#)]
fn last_call_fails(world: &ApprovalWorld, code: String) -> Result<(), eyre::Report> {
    let err = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected a failure, the last call succeeded"))?;
    eyre::ensure!(
        err.kind().code() == code,
        "expected {code}, got {} ({err})",
        err.kind().code()
    );
    Ok(())
}
