//! Read access to the audit log.

use super::{WorkflowError, WorkflowResult};
use crate::config::PaginationConfig;
use crate::workflow::{
    domain::{
        Actor, ActorId, AuditEntry, AuditFilter, AuditOperation, AuditTarget, Page, PageRequest,
        Role,
    },
    ports::WorkflowPorts,
};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

/// Audit log query parameters. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// Only entries written by this actor.
    pub actor_id: Option<ActorId>,
    /// Only this operation.
    pub operation: Option<AuditOperation>,
    /// Only this entity.
    pub target: Option<AuditTarget>,
    /// Inclusive lower time bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper time bound.
    pub to: Option<DateTime<Utc>>,
    /// One-based page; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to the configured default.
    pub limit: Option<u32>,
}

/// Privileged, read-only view of the audit log of one company and of the
/// shared system changes.
pub struct AuditLogService {
    ports: WorkflowPorts,
    pagination: PaginationConfig,
}

impl AuditLogService {
    /// Creates the service.
    #[must_use]
    pub const fn new(ports: WorkflowPorts, pagination: PaginationConfig) -> Self {
        Self { ports, pagination }
    }

    /// Returns entries of the actor's company, plus the tenant-less entries
    /// of start-up system changes, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] below `MANAGER` and a validation
    /// error for an invalid page, limit or date range.
    #[instrument(skip_all, fields(actor_id = %actor.id))]
    pub async fn query(&self, actor: &Actor, query: AuditQuery) -> WorkflowResult<Page<AuditEntry>> {
        if !actor.role.dominates(Role::Manager) {
            warn!(role = %actor.role, "audit log access denied");
            return Err(WorkflowError::forbidden(
                "reading the audit log requires manager or above",
            ));
        }
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(WorkflowError::validation(
                    "the start of the date range is after its end",
                ));
            }
        }
        let page = PageRequest::new(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(self.pagination.default_limit),
            self.pagination.max_limit,
        )?;
        let filter = AuditFilter {
            company_id: actor.company_id,
            include_system: true,
            actor_id: query.actor_id,
            operation: query.operation,
            target: query.target,
            from: query.from,
            to: query.to,
            page,
        };
        let entries = self.ports.audit.query(&filter).await?;
        debug!(matched = entries.len(), "audit log queried");
        Ok(Page::paginate(entries, page))
    }
}
