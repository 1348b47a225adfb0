//! Application services orchestrating the workflow engine.
//!
//! [`WorkflowEngine`] wires every service over one [`WorkflowPorts`] bundle
//! selected at start-up.

mod approvals;
mod audit_log;
mod catalog;
mod error;
mod executor;
mod settings;
mod templates;

pub use approvals::{ApprovalFlowManager, ApprovalOutcome, ApprovalRequestCommand};
pub use audit_log::{AuditLogService, AuditQuery};
pub use catalog::{NewStatus, StatusCatalogService, StatusOverride};
pub use error::{ErrorKind, WorkflowError, WorkflowResult};
pub use executor::{TransitionCommand, TransitionOutcome, WorkflowExecutor};
pub use settings::{SettingsResolver, SettingsTarget, SettingsView};
pub use templates::{CreateTemplate, TemplateQuery, TemplateStore};

use crate::config::EngineConfig;
use crate::workflow::{
    domain::{ColumnSpec, StatusName, TemplateDraft, TemplateName, TemplateType},
    ports::WorkflowPorts,
};
use executor::TransitionCommitter;
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the STANDARD template installed at start-up.
pub const STANDARD_TEMPLATE_NAME: &str = "Standard";

const STANDARD_COLUMNS: [(&str, &str); 4] = [
    ("To Do", "TODO"),
    ("In Progress", "IN_PROGRESS"),
    ("In Review", "IN_REVIEW"),
    ("Completed", "COMPLETED"),
];

pub(crate) fn snapshot<T: Serialize>(value: &T) -> WorkflowResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Every workflow service, built once over shared ports.
pub struct WorkflowEngine<C>
where
    C: Clock + Send + Sync,
{
    config: EngineConfig,
    settings: Arc<SettingsResolver<C>>,
    catalog: Arc<StatusCatalogService<C>>,
    templates: Arc<TemplateStore<C>>,
    approvals: Arc<ApprovalFlowManager<C>>,
    executor: Arc<WorkflowExecutor<C>>,
    audit: Arc<AuditLogService>,
}

impl<C> WorkflowEngine<C>
where
    C: Clock + Send + Sync,
{
    /// Builds the services. Call [`Self::bootstrap`] before serving requests.
    #[must_use]
    pub fn new(ports: WorkflowPorts, config: EngineConfig, clock: Arc<C>) -> Self {
        let settings = Arc::new(SettingsResolver::new(ports.clone(), Arc::clone(&clock)));
        let catalog = Arc::new(StatusCatalogService::new(
            ports.clone(),
            Arc::clone(&settings),
            Arc::clone(&clock),
            config.name_matching(),
        ));
        let templates = Arc::new(TemplateStore::new(
            ports.clone(),
            Arc::clone(&catalog),
            Arc::clone(&clock),
            config.approvals.default_approver_roles.iter().copied().collect(),
            config.pagination,
        )
        .operated_by(config.templates.operator_company));
        let committer = Arc::new(TransitionCommitter::new(ports.clone(), Arc::clone(&clock)));
        let approvals = Arc::new(ApprovalFlowManager::new(
            ports.clone(),
            Arc::clone(&clock),
            Arc::clone(&settings),
            Arc::clone(&catalog),
            Arc::clone(&templates),
            Arc::clone(&committer),
        ));
        let executor = Arc::new(WorkflowExecutor::new(
            ports.clone(),
            Arc::clone(&settings),
            Arc::clone(&catalog),
            Arc::clone(&templates),
            Arc::clone(&approvals),
            committer,
        ));
        let audit = Arc::new(AuditLogService::new(ports, config.pagination));
        Self {
            config,
            settings,
            catalog,
            templates,
            approvals,
            executor,
            audit,
        }
    }

    /// Seeds the configured system statuses and installs the STANDARD
    /// system template when it is missing. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when a configured status name is invalid or
    /// storage fails.
    pub async fn bootstrap(&self) -> WorkflowResult<()> {
        self.catalog
            .seed_system_statuses(&self.config.statuses.system)
            .await?;

        let name = TemplateName::new(STANDARD_TEMPLATE_NAME)?;
        if self.templates.find_system(&name).await?.is_some() {
            return Ok(());
        }
        let matching = self.config.name_matching();
        let mut columns = Vec::new();
        for (display_name, status) in STANDARD_COLUMNS {
            let status = StatusName::new(status)?;
            let seeded = self
                .config
                .statuses
                .system
                .iter()
                .filter_map(|raw| StatusName::new(raw.as_str()).ok())
                .any(|configured| matching.same(&configured, &status));
            if seeded {
                let order = u32::try_from(columns.len() + 1).unwrap_or(u32::MAX);
                columns.push(ColumnSpec::new(display_name, status, order));
            }
        }
        if columns.is_empty() {
            warn!("no standard statuses are configured, skipping the standard template");
            return Ok(());
        }
        let draft = TemplateDraft::new(
            STANDARD_TEMPLATE_NAME,
            TemplateType::Standard,
            columns,
            self.config
                .approvals
                .default_approver_roles
                .iter()
                .copied()
                .collect(),
        )
        .with_description("Built-in task board");
        let template = self.templates.install_system_template(None, draft).await?;
        info!(template_id = %template.id(), "workflow engine bootstrapped");
        Ok(())
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Settings resolution and updates.
    #[must_use]
    pub fn settings(&self) -> &SettingsResolver<C> {
        &self.settings
    }

    /// Status catalog.
    #[must_use]
    pub fn catalog(&self) -> &StatusCatalogService<C> {
        &self.catalog
    }

    /// Template store.
    #[must_use]
    pub fn templates(&self) -> &TemplateStore<C> {
        &self.templates
    }

    /// Approval lifecycle.
    #[must_use]
    pub fn approvals(&self) -> &ApprovalFlowManager<C> {
        &self.approvals
    }

    /// Transition entry point.
    #[must_use]
    pub fn executor(&self) -> &WorkflowExecutor<C> {
        &self.executor
    }

    /// Audit log queries.
    #[must_use]
    pub fn audit(&self) -> &AuditLogService {
        &self.audit
    }
}
