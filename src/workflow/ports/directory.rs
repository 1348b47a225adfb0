//! Lookup of actors other than the caller.

use crate::workflow::domain::{Actor, ActorId, CompanyId, TeamId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Resolves actor identity and team membership for privileged calls that
/// address someone other than the caller.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// Finds an actor by identifier.
    async fn find(&self, id: ActorId) -> Result<Option<Actor>, ActorDirectoryError>;

    /// Returns the company a team belongs to, or `None` for unknown teams.
    async fn team_company(&self, team: TeamId) -> Result<Option<CompanyId>, ActorDirectoryError>;
}

/// Errors returned by actor directory implementations.
#[derive(Debug, Clone, Error)]
pub enum ActorDirectoryError {
    /// A team was registered under a second company.
    #[error("team {team} belongs to company {company}")]
    ForeignTeam {
        /// Team.
        team: TeamId,
        /// Company that owns it.
        company: CompanyId,
    },

    /// Lookup failure.
    #[error("actor directory error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ActorDirectoryError {
    /// Wraps a lookup error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
