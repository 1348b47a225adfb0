//! Shared world state for approval flow BDD scenarios.

use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use taskflow::config::EngineConfig;
use taskflow::workflow::{
    adapters::memory::InMemoryWorkflowStores,
    domain::{Actor, ActorId, ApprovalRequest, CompanyId, Role, TeamId, TodoRecord},
    services::{WorkflowEngine, WorkflowError},
};

/// Engine type used by the BDD world.
pub type TestEngine = WorkflowEngine<DefaultClock>;

/// Scenario world for approval flow behaviour tests.
pub struct ApprovalWorld {
    pub stores: InMemoryWorkflowStores,
    pub engine: TestEngine,
    pub company: CompanyId,
    pub team: TeamId,
    pub member: Option<Actor>,
    pub todo: Option<TodoRecord>,
    pub request: Option<ApprovalRequest>,
    pub last_executed: Option<bool>,
    pub last_error: Option<WorkflowError>,
}

impl ApprovalWorld {
    /// Creates a world over empty in-memory stores.
    #[must_use]
    pub fn new() -> Self {
        let stores = InMemoryWorkflowStores::new();
        let engine = WorkflowEngine::new(
            stores.ports(),
            EngineConfig::default(),
            Arc::new(DefaultClock),
        );
        Self {
            stores,
            engine,
            company: CompanyId::new(),
            team: TeamId::new(),
            member: None,
            todo: None,
            request: None,
            last_executed: None,
            last_error: None,
        }
    }

    /// Returns a registered actor of this company holding `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory rejects the actor.
    pub fn actor(&self, role: Role) -> Result<Actor, eyre::Report> {
        let actor = Actor::new(ActorId::new(), self.company, role).with_team(self.team);
        self.stores.directory.register(actor)?;
        Ok(actor)
    }

    /// The member every scenario acts as.
    ///
    /// # Errors
    ///
    /// Returns an error if the background step has not run.
    pub fn member(&self) -> Result<&Actor, eyre::Report> {
        self.member
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing member in scenario world"))
    }

    /// The task under test.
    ///
    /// # Errors
    ///
    /// Returns an error if no task was seeded.
    pub fn todo(&self) -> Result<&TodoRecord, eyre::Report> {
        self.todo
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// The approval request opened by the last move.
    ///
    /// # Errors
    ///
    /// Returns an error if no request was opened.
    pub fn request(&self) -> Result<&ApprovalRequest, eyre::Report> {
        self.request
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing approval request in scenario world"))
    }
}

impl Default for ApprovalWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ApprovalWorld {
    ApprovalWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
