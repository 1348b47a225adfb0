//! In-memory actor directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::workflow::{
    domain::{Actor, ActorId, CompanyId, TeamId},
    ports::{ActorDirectory, ActorDirectoryError},
};

/// Thread-safe in-memory actor directory.
///
/// Teams are learned from the actors registered into them; a team belongs to
/// exactly one company.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActorDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    actors: HashMap<ActorId, Actor>,
    teams: HashMap<TeamId, CompanyId>,
}

impl InMemoryActorDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces an actor, recording its team's company.
    ///
    /// # Errors
    ///
    /// Returns [`ActorDirectoryError::ForeignTeam`] when the actor's team
    /// already belongs to another company, and
    /// [`ActorDirectoryError::Persistence`] when the lock is poisoned.
    pub fn register(&self, actor: Actor) -> Result<(), ActorDirectoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ActorDirectoryError::persistence(lock_error(&err)))?;
        if let Some(team) = actor.team_id {
            Self::claim_team(&mut state, team, actor.company_id)?;
        }
        state.actors.insert(actor.id, actor);
        Ok(())
    }

    /// Records a team that has no registered members yet.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::register`].
    pub fn register_team(&self, team: TeamId, company: CompanyId) -> Result<(), ActorDirectoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ActorDirectoryError::persistence(lock_error(&err)))?;
        Self::claim_team(&mut state, team, company)
    }

    fn claim_team(
        state: &mut DirectoryState,
        team: TeamId,
        company: CompanyId,
    ) -> Result<(), ActorDirectoryError> {
        let owner = *state.teams.entry(team).or_insert(company);
        if owner == company {
            Ok(())
        } else {
            Err(ActorDirectoryError::ForeignTeam {
                team,
                company: owner,
            })
        }
    }
}

#[async_trait]
impl ActorDirectory for InMemoryActorDirectory {
    async fn find(&self, id: ActorId) -> Result<Option<Actor>, ActorDirectoryError> {
        let state = self
            .state
            .read()
            .map_err(|err| ActorDirectoryError::persistence(lock_error(&err)))?;
        Ok(state.actors.get(&id).copied())
    }

    async fn team_company(&self, team: TeamId) -> Result<Option<CompanyId>, ActorDirectoryError> {
        let state = self
            .state
            .read()
            .map_err(|err| ActorDirectoryError::persistence(lock_error(&err)))?;
        Ok(state.teams.get(&team).copied())
    }
}
