//! Handler envelopes over the in-memory engine.

use super::helpers::{Scene, scene};
use eyre::{OptionExt, ensure};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use taskflow::api::{
    ApiResponse, WorkflowApi,
    dto::{
        ApplyTransitionBody, AuditLogParams, CreateTemplateBody, RejectBody, SetSystemDefaultBody,
        TemplateListParams,
    },
};
use taskflow::workflow::{
    domain::{Actor, ActorId, CompanyId, Role},
    ports::AuditSinkError,
    services::{ErrorKind, WorkflowError, WorkflowResult},
};

fn api(scene: &Scene) -> WorkflowApi<mockable::DefaultClock> {
    WorkflowApi::new(Arc::clone(&scene.engine))
}

#[rstest]
fn envelope_serializes_camel_case() -> eyre::Result<()> {
    let ok = ApiResponse::from(WorkflowResult::Ok(7_u32));
    let failed = ApiResponse::from(WorkflowResult::<u32>::Err(WorkflowError::conflict("busy")));

    ensure!(serde_json::to_value(&ok)? == json!({"success": true, "data": 7}), "ok shape");
    ensure!(
        serde_json::to_value(&failed)?
            == json!({"success": false, "error": {"code": "CONFLICT", "message": "conflict: busy"}}),
        "failure shape"
    );
    ensure!(ok.http_status() == 200 && failed.http_status() == 409, "status codes");
    Ok(())
}

#[rstest]
#[case::validation(WorkflowError::validation("bad"), ErrorKind::Validation, 400)]
#[case::forbidden(WorkflowError::forbidden("no"), ErrorKind::Forbidden, 403)]
#[case::not_found(WorkflowError::not_found("todo", "x"), ErrorKind::NotFound, 404)]
#[case::conflict(WorkflowError::conflict("busy"), ErrorKind::Conflict, 409)]
fn error_kinds_map_to_http_statuses(
    #[case] err: WorkflowError,
    #[case] kind: ErrorKind,
    #[case] http: u16,
) {
    let response = ApiResponse::from(WorkflowResult::<()>::Err(err));

    assert_eq!(
        response.error.as_ref().map(|error| error.code.as_str()),
        Some(kind.code())
    );
    assert_eq!(response.http_status(), http);
}

#[rstest]
fn internal_errors_are_masked() {
    let err = WorkflowError::Audit(AuditSinkError::persistence(
        std::io::Error::other("disk on fire"),
    ));
    let response = ApiResponse::from(WorkflowResult::<()>::Err(err));

    let error = response.error.expect("failure carries an error");
    assert_eq!(error.code, "INTERNAL_ERROR");
    assert_eq!(error.message, "internal error");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn apply_and_reject_round_trip_through_json(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let api = api(&scene);
    let todo = scene.seed_todo("CONTACTED")?;

    let body: ApplyTransitionBody = serde_json::from_value(json!({
        "todoId": todo.id,
        "fromStatus": "CONTACTED",
        "toStatus": "WON",
        "reason": "signed"
    }))?;
    let applied = api.apply(&scene.member, body).await;
    let outcome = applied.data.ok_or_eyre("apply succeeds")?;
    let request_id = outcome
        .approval_request_id
        .ok_or_eyre("gated move opens a request")?;

    let missing_reason: RejectBody = serde_json::from_value(json!({ "approvalId": request_id }))?;
    let refused = api.reject(&scene.manager, missing_reason).await;
    ensure!(refused.http_status() == 400, "reason required");

    let body: RejectBody = serde_json::from_value(json!({
        "approvalId": request_id,
        "reason": "not yet"
    }))?;
    let rejected = api.reject(&scene.manager, body).await;
    ensure!(rejected.success, "rejected: {:?}", rejected.error);
    let json = serde_json::to_value(&rejected)?;
    ensure!(json["data"]["request"]["status"] == "REJECTED", "wire status {json}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn template_endpoints_validate_payloads(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let api = api(&scene);

    let unknown_type = api
        .list_templates(
            &scene.member,
            TemplateListParams {
                template_type: Some("EFFORT".to_owned()),
                ..TemplateListParams::default()
            },
        )
        .await;
    let listed = api
        .list_templates(&scene.member, TemplateListParams::default())
        .await;
    let body: CreateTemplateBody = serde_json::from_value(json!({
        "name": "Broken",
        "type": "STANDARD",
        "columns": [{ "displayName": "Mystery", "statusValue": "MYSTERY", "order": 1 }]
    }))?;
    let invalid = api.create_template(&scene.member, body).await;

    ensure!(unknown_type.http_status() == 400, "unknown type");
    let page = listed.data.ok_or_eyre("listing succeeds")?;
    ensure!(page.total == 1, "only the standard template is visible");
    ensure!(invalid.http_status() == 400, "unknown column status");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn system_default_endpoint_requires_an_operating_company_leader() -> eyre::Result<()> {
    let scene = Scene::operating();
    scene.engine.bootstrap().await?;
    let tenant_leader = Actor::new(ActorId::new(), CompanyId::new(), Role::CompanyLeader);
    let api = api(&scene);
    let standard = api
        .list_templates(&scene.member, TemplateListParams::default())
        .await
        .data
        .and_then(|page| page.items.into_iter().next())
        .ok_or_eyre("standard template listed")?;
    let body: SetSystemDefaultBody = serde_json::from_value(json!({ "type": "STANDARD" }))?;

    let denied = api.set_system_default(&scene.manager, standard.id(), body).await;
    let foreign = api
        .set_system_default(&tenant_leader, standard.id(), body)
        .await;
    let allowed = api
        .set_system_default(&scene.company_leader, standard.id(), body)
        .await;

    ensure!(denied.http_status() == 403, "manager denied");
    ensure!(foreign.http_status() == 403, "other tenants' leaders denied");
    ensure!(allowed.success, "operator allowed: {:?}", allowed.error);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn audit_endpoint_checks_target_pairs(scene: Scene) -> eyre::Result<()> {
    scene.engine.bootstrap().await?;
    let api = api(&scene);

    let half_target: AuditLogParams =
        serde_json::from_value(json!({ "targetType": "TODO" }))?;
    let half = api.audit_logs(&scene.manager, half_target).await;
    let member = api.audit_logs(&scene.member, AuditLogParams::default()).await;
    let manager = api
        .audit_logs(&scene.manager, AuditLogParams::default())
        .await;

    ensure!(half.http_status() == 400, "target type alone is invalid");
    ensure!(member.http_status() == 403, "members cannot read the audit log");
    ensure!(manager.success, "managers can: {:?}", manager.error);
    Ok(())
}
