//! Shared test helpers for in-memory engine integration tests.

use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use taskflow::config::EngineConfig;
use taskflow::workflow::{
    adapters::memory::InMemoryWorkflowStores,
    domain::{
        Actor, ActorId, AuditEntry, ColumnSpec, CompanyId, Role, Scope, SettingsPatch, StatusName,
        TeamId, TemplateType, TodoId, TodoRecord, WorkflowTemplate,
    },
    ports::WorkflowPorts,
    services::{CreateTemplate, SettingsTarget, WorkflowEngine},
};

/// Engine type used across the integration tests.
pub type TestEngine = WorkflowEngine<DefaultClock>;

/// A company with one team, its people and a bootstrapped engine.
pub struct Scene {
    pub stores: InMemoryWorkflowStores,
    pub engine: Arc<TestEngine>,
    pub company: CompanyId,
    pub team: TeamId,
    pub member: Actor,
    pub team_leader: Actor,
    pub manager: Actor,
    pub company_leader: Actor,
}

impl Scene {
    /// Builds the scene over the given ports without bootstrapping.
    ///
    /// # Panics
    ///
    /// Panics if the actor directory rejects an actor.
    #[must_use]
    pub fn over(stores: InMemoryWorkflowStores, ports: WorkflowPorts, config: EngineConfig) -> Self {
        Self::of_company(CompanyId::new(), stores, ports, config)
    }

    /// Builds a scene whose company operates the shared system templates.
    #[must_use]
    pub fn operating() -> Self {
        let company = CompanyId::new();
        let mut config = EngineConfig::default();
        config.templates.operator_company = Some(company);
        let stores = InMemoryWorkflowStores::new();
        let ports = stores.ports();
        Self::of_company(company, stores, ports, config)
    }

    fn of_company(
        company: CompanyId,
        stores: InMemoryWorkflowStores,
        ports: WorkflowPorts,
        config: EngineConfig,
    ) -> Self {
        let team = TeamId::new();
        let person = |role| Actor::new(ActorId::new(), company, role).with_team(team);
        let member = person(Role::Member);
        let team_leader = person(Role::TeamLeader);
        let manager = person(Role::Manager);
        let company_leader = person(Role::CompanyLeader);
        for actor in [&member, &team_leader, &manager, &company_leader] {
            stores
                .directory
                .register(*actor)
                .expect("directory accepts actor");
        }
        Self {
            engine: Arc::new(WorkflowEngine::new(ports, config, Arc::new(DefaultClock))),
            stores,
            company,
            team,
            member,
            team_leader,
            manager,
            company_leader,
        }
    }

    /// Builds a scene over plain in-memory ports.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let stores = InMemoryWorkflowStores::new();
        let ports = stores.ports();
        Self::over(stores, ports, config)
    }

    /// Seeds a task of this company in `status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the status name is invalid or the store fails.
    pub fn seed_todo(&self, status: &str) -> eyre::Result<TodoRecord> {
        let record = TodoRecord::new(
            TodoId::new(),
            self.company,
            StatusName::new(status)?,
            &DefaultClock,
        );
        self.stores.todos.insert(record.clone())?;
        Ok(record)
    }

    /// Returns the audit log in sequence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit store lock is poisoned.
    pub fn audit(&self) -> eyre::Result<Vec<AuditEntry>> {
        Ok(self.stores.audit.entries()?)
    }

    /// Creates the company-wide "Standard Sales" approval template
    /// (NEW, CONTACTED, WON gated) and makes it the company's active
    /// template.
    ///
    /// # Errors
    ///
    /// Returns an error if template creation or the settings update fails.
    pub async fn install_sales_template(&self) -> eyre::Result<WorkflowTemplate> {
        let template = self
            .engine
            .templates()
            .create(
                &self.manager,
                CreateTemplate::new(
                    "Standard Sales",
                    TemplateType::ApprovalProcess,
                    vec![
                        ColumnSpec::new("New", StatusName::new("NEW")?, 1),
                        ColumnSpec::new("Contacted", StatusName::new("CONTACTED")?, 2),
                        ColumnSpec::new("Won", StatusName::new("WON")?, 3).gated(),
                    ],
                )
                .in_scope(Scope::Company)
                .with_approver_roles([Role::Manager, Role::CompanyLeader]),
            )
            .await?;
        self.engine
            .settings()
            .update(
                &self.manager,
                SettingsTarget::Company(self.company),
                SettingsPatch::default().with_active_template(template.id()),
            )
            .await?;
        Ok(template)
    }

    /// Sets `actor`'s personal auto-transition flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings update fails.
    pub async fn set_auto_transition(&self, actor: &Actor, enabled: bool) -> eyre::Result<()> {
        self.engine
            .settings()
            .update(
                actor,
                SettingsTarget::Own,
                SettingsPatch::default().with_auto_transition(enabled),
            )
            .await?;
        Ok(())
    }

    /// Allows custom statuses company-wide.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings update fails.
    pub async fn allow_custom_statuses(&self) -> eyre::Result<()> {
        self.engine
            .settings()
            .update(
                &self.manager,
                SettingsTarget::Company(self.company),
                SettingsPatch::default().with_allow_custom_status(true),
            )
            .await?;
        Ok(())
    }
}

/// Provides a fresh scene with default configuration. Call
/// `scene.engine.bootstrap()` before use.
#[fixture]
pub fn scene() -> Scene {
    Scene::with_config(EngineConfig::default())
}

/// Parses a status name in test code.
///
/// # Panics
///
/// Panics on invalid names.
#[must_use]
pub fn status(name: &str) -> StatusName {
    StatusName::new(name).expect("valid status name")
}
