//! The slice of a task the workflow engine reads and mutates.

use super::{CompanyId, StatusName, TodoId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Status and version of a task.
///
/// The version increases by one on every status change and guards
/// compare-and-set updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    /// Task identifier.
    pub id: TodoId,
    /// Tenant.
    pub company_id: CompanyId,
    /// Current status.
    pub status: StatusName,
    /// Optimistic concurrency version.
    pub version: u64,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl TodoRecord {
    /// Creates a record at version 1.
    #[must_use]
    pub fn new(id: TodoId, company_id: CompanyId, status: StatusName, clock: &impl Clock) -> Self {
        Self {
            id,
            company_id,
            status,
            version: 1,
            updated_at: clock.utc(),
        }
    }

    /// Returns the record moved to `status` at the next version.
    #[must_use]
    pub fn advanced(&self, status: StatusName, at: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            company_id: self.company_id,
            status,
            version: self.version + 1,
            updated_at: at,
        }
    }

    /// Returns the record at the next version with its status unchanged.
    ///
    /// Opening an approval request reserves the task this way, so a
    /// concurrent change read at the same version loses its compare-and-set.
    #[must_use]
    pub fn reserved(&self, at: DateTime<Utc>) -> Self {
        self.advanced(self.status.clone(), at)
    }
}
