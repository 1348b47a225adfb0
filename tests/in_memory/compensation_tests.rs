//! Audit failures roll back the mutation they were meant to record.

use super::helpers::{Scene, status};
use async_trait::async_trait;
use eyre::{OptionExt, ensure};
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use taskflow::config::EngineConfig;
use taskflow::workflow::{
    adapters::memory::{InMemoryAuditLog, InMemoryWorkflowStores},
    domain::{AuditEntry, AuditFilter, AuditRecord, SettingsPatch},
    ports::{
        ApprovalRepository, AuditSink, AuditSinkError, AuditSinkResult, SettingsRepository,
        TodoRepository,
    },
    services::{ErrorKind, SettingsTarget, TransitionCommand},
};

/// Audit sink that fails every append while armed.
#[derive(Clone, Default)]
struct FlakyAudit {
    inner: InMemoryAuditLog,
    failing: Arc<AtomicBool>,
}

impl FlakyAudit {
    fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditSink for FlakyAudit {
    async fn append(&self, record: AuditRecord) -> AuditSinkResult<AuditEntry> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditSinkError::persistence(std::io::Error::other(
                "audit store offline",
            )));
        }
        self.inner.append(record).await
    }

    async fn query(&self, filter: &AuditFilter) -> AuditSinkResult<Vec<AuditEntry>> {
        self.inner.query(filter).await
    }
}

struct FlakyScene {
    scene: Scene,
    audit: FlakyAudit,
}

#[fixture]
fn flaky() -> FlakyScene {
    let stores = InMemoryWorkflowStores::new();
    let audit = FlakyAudit {
        inner: stores.audit.clone(),
        failing: Arc::default(),
    };
    let ports = stores.ports().with_audit(Arc::new(audit.clone()));
    FlakyScene {
        scene: Scene::over(stores, ports, EngineConfig::default()),
        audit,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_audit_reverts_an_executed_transition(flaky: FlakyScene) -> eyre::Result<()> {
    let FlakyScene { scene, audit } = flaky;
    scene.engine.bootstrap().await?;
    let todo = scene.seed_todo("TODO")?;
    audit.fail();

    let result = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("TODO"), status("IN_PROGRESS")),
            &scene.member,
        )
        .await;

    ensure!(
        result.as_ref().err().map(|err| err.kind()) == Some(ErrorKind::Internal),
        "audit failure surfaces: {result:?}"
    );
    let stored = scene
        .stores
        .todos
        .find(todo.id)
        .await?
        .ok_or_eyre("task stored")?;
    ensure!(stored.status.as_str() == "TODO", "status restored");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_audit_discards_a_new_request(flaky: FlakyScene) -> eyre::Result<()> {
    let FlakyScene { scene, audit } = flaky;
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let todo = scene.seed_todo("CONTACTED")?;
    audit.fail();

    let result = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("CONTACTED"), status("WON")),
            &scene.member,
        )
        .await;

    ensure!(result.is_err(), "audit failure surfaces");
    ensure!(
        scene.stores.approvals.pending_for_todo(todo.id).await?.is_none(),
        "unaudited request discarded"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_audit_reopens_an_approved_request(flaky: FlakyScene) -> eyre::Result<()> {
    let FlakyScene { scene, audit } = flaky;
    scene.engine.bootstrap().await?;
    scene.install_sales_template().await?;
    let todo = scene.seed_todo("CONTACTED")?;
    let request_id = scene
        .engine
        .executor()
        .apply_transition(
            TransitionCommand::new(todo.id, status("CONTACTED"), status("WON")),
            &scene.member,
        )
        .await?
        .approval_request_id
        .ok_or_eyre("request opened")?;
    audit.fail();

    let result = scene
        .engine
        .approvals()
        .approve(request_id, &scene.manager, None)
        .await;

    ensure!(result.is_err(), "audit failure surfaces");
    let request = scene
        .stores
        .approvals
        .find(request_id)
        .await?
        .ok_or_eyre("request stored")?;
    ensure!(request.is_pending(), "claim reverted");
    let stored = scene
        .stores
        .todos
        .find(todo.id)
        .await?
        .ok_or_eyre("task stored")?;
    ensure!(stored.status.as_str() == "CONTACTED", "task restored");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_audit_restores_settings(flaky: FlakyScene) -> eyre::Result<()> {
    let FlakyScene { scene, audit } = flaky;
    scene
        .engine
        .settings()
        .update(
            &scene.member,
            SettingsTarget::Own,
            SettingsPatch::default().with_auto_transition(true),
        )
        .await?;
    audit.fail();

    let result = scene
        .engine
        .settings()
        .update(
            &scene.member,
            SettingsTarget::Own,
            SettingsPatch::default().with_auto_transition(false),
        )
        .await;

    ensure!(result.is_err(), "audit failure surfaces");
    let row = scene
        .stores
        .settings
        .find(&scene.member.personal_scope())
        .await?
        .ok_or_eyre("row kept")?;
    ensure!(row.values.auto_transition == Some(true), "previous value restored");
    Ok(())
}
