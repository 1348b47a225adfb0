//! Roles, scopes and visibility rules shared by every workflow component.
//!
//! Scopes form the tiers `System > Company > Team > Personal`. Objects are
//! owned by a [`ScopeRef`] and are visible to an [`Audience`] when the
//! audience belongs to the owning tier.

use super::{ActorId, CompanyId, ParseWorkflowEnumError, TeamId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Organisational role of an actor, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user.
    Member,
    /// Leader of a single team.
    TeamLeader,
    /// Manager with company-wide configuration rights.
    Manager,
    /// Highest tenant privilege.
    CompanyLeader,
}

impl Role {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::TeamLeader => "team_leader",
            Self::Manager => "manager",
            Self::CompanyLeader => "company_leader",
        }
    }

    /// Returns `true` when this role is at least as privileged as `other`.
    #[must_use]
    pub fn dominates(self, other: Self) -> bool {
        self >= other
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseWorkflowEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "member" | "user" => Ok(Self::Member),
            "team_leader" => Ok(Self::TeamLeader),
            "manager" => Ok(Self::Manager),
            "company_leader" => Ok(Self::CompanyLeader),
            _ => Err(ParseWorkflowEnumError::new("role", value)),
        }
    }
}

/// Visibility and ownership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Built into the engine; visible to everyone.
    System,
    /// Owned by a company.
    Company,
    /// Owned by a team.
    Team,
    /// Owned by a single actor.
    Personal,
}

impl Scope {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::Company => "COMPANY",
            Self::Team => "TEAM",
            Self::Personal => "PERSONAL",
        }
    }

    /// Presentation precedence; narrower scopes win.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::System => 0,
            Self::Company => 1,
            Self::Team => 2,
            Self::Personal => 3,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Scope {
    type Error = ParseWorkflowEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SYSTEM" => Ok(Self::System),
            "COMPANY" => Ok(Self::Company),
            "TEAM" => Ok(Self::Team),
            "PERSONAL" => Ok(Self::Personal),
            _ => Err(ParseWorkflowEnumError::new("scope", value)),
        }
    }
}

/// A scope tier together with the identifier of its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "ownerId", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeRef {
    /// Engine-owned.
    System,
    /// Owned by the given company.
    Company(CompanyId),
    /// Owned by the given team.
    Team(TeamId),
    /// Owned by the given actor.
    Personal(ActorId),
}

impl ScopeRef {
    /// Returns the scope tier.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        match self {
            Self::System => Scope::System,
            Self::Company(_) => Scope::Company,
            Self::Team(_) => Scope::Team,
            Self::Personal(_) => Scope::Personal,
        }
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("SYSTEM"),
            Self::Company(id) => write!(f, "COMPANY:{id}"),
            Self::Team(id) => write!(f, "TEAM:{id}"),
            Self::Personal(id) => write!(f, "PERSONAL:{id}"),
        }
    }
}

/// Authenticated caller as resolved by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Actor identifier.
    pub id: ActorId,
    /// Tenant the actor belongs to.
    pub company_id: CompanyId,
    /// Team membership, if any.
    pub team_id: Option<TeamId>,
    /// Organisational role.
    pub role: Role,
}

impl Actor {
    /// Creates an actor without team membership.
    #[must_use]
    pub const fn new(id: ActorId, company_id: CompanyId, role: Role) -> Self {
        Self {
            id,
            company_id,
            team_id: None,
            role,
        }
    }

    /// Sets the team membership.
    #[must_use]
    pub const fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Returns the actor's personal scope.
    #[must_use]
    pub const fn personal_scope(&self) -> ScopeRef {
        ScopeRef::Personal(self.id)
    }

    /// Returns the actor's company scope.
    #[must_use]
    pub const fn company_scope(&self) -> ScopeRef {
        ScopeRef::Company(self.company_id)
    }

    /// Returns the scope that the actor would own at the requested tier.
    ///
    /// Returns `None` for [`Scope::System`] and for [`Scope::Team`] when the
    /// actor has no team.
    #[must_use]
    pub fn own_scope(&self, scope: Scope) -> Option<ScopeRef> {
        match scope {
            Scope::System => None,
            Scope::Company => Some(self.company_scope()),
            Scope::Team => self.team_id.map(ScopeRef::Team),
            Scope::Personal => Some(self.personal_scope()),
        }
    }

    /// Scopes consulted for this actor, narrowest first.
    #[must_use]
    pub fn scope_chain(&self) -> Vec<ScopeRef> {
        let mut chain = vec![self.personal_scope()];
        if let Some(team_id) = self.team_id {
            chain.push(ScopeRef::Team(team_id));
        }
        chain.push(self.company_scope());
        chain
    }

    /// Returns `true` when the actor may create or edit objects owned by
    /// `target`.
    ///
    /// System scope is never manageable. A bare team reference carries no
    /// company, so only the actor's own team qualifies here; use
    /// [`Self::can_manage_team`] once the team's company is known.
    #[must_use]
    pub fn can_manage(&self, target: &ScopeRef) -> bool {
        match target {
            ScopeRef::System => false,
            ScopeRef::Company(company_id) => {
                *company_id == self.company_id && self.role.dominates(Role::Manager)
            }
            ScopeRef::Team(team_id) => {
                self.role.dominates(Role::TeamLeader) && self.team_id == Some(*team_id)
            }
            ScopeRef::Personal(actor_id) => *actor_id == self.id,
        }
    }

    /// Returns `true` when the actor may manage `team`, which belongs to
    /// `team_company`.
    ///
    /// Managers may manage any team of their own company; team leaders only
    /// their own team.
    #[must_use]
    pub fn can_manage_team(&self, team: TeamId, team_company: CompanyId) -> bool {
        team_company == self.company_id
            && (self.role.dominates(Role::Manager) || self.can_manage(&ScopeRef::Team(team)))
    }
}

/// The set of owners whose objects are visible to some viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Audience {
    company_id: CompanyId,
    team_id: Option<TeamId>,
    actor_id: Option<ActorId>,
}

impl Audience {
    /// Audience of a single actor: system, company, team and personal.
    #[must_use]
    pub const fn of_actor(actor: &Actor) -> Self {
        Self {
            company_id: actor.company_id,
            team_id: actor.team_id,
            actor_id: Some(actor.id),
        }
    }

    /// Audience of a team-owned object: system, company and team.
    #[must_use]
    pub const fn of_team(company_id: CompanyId, team_id: TeamId) -> Self {
        Self {
            company_id,
            team_id: Some(team_id),
            actor_id: None,
        }
    }

    /// Audience of a company-owned object: system and company.
    #[must_use]
    pub const fn of_company(company_id: CompanyId) -> Self {
        Self {
            company_id,
            team_id: None,
            actor_id: None,
        }
    }

    /// Audience of an object owned by `owner`, evaluated inside the tenant
    /// of `actor`.
    #[must_use]
    pub const fn of_owner(owner: &ScopeRef, actor: &Actor) -> Self {
        match owner {
            ScopeRef::System | ScopeRef::Company(_) => Self::of_company(actor.company_id),
            ScopeRef::Team(team_id) => Self::of_team(actor.company_id, *team_id),
            ScopeRef::Personal(_) => Self::of_actor(actor),
        }
    }

    /// Tenant of this audience.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns `true` when objects owned by `owner` are visible.
    #[must_use]
    pub fn can_see(&self, owner: &ScopeRef) -> bool {
        match owner {
            ScopeRef::System => true,
            ScopeRef::Company(company_id) => *company_id == self.company_id,
            ScopeRef::Team(team_id) => self.team_id == Some(*team_id),
            ScopeRef::Personal(actor_id) => self.actor_id == Some(*actor_id),
        }
    }

    /// Owners visible to this audience, broadest first.
    #[must_use]
    pub fn owners(&self) -> Vec<ScopeRef> {
        let mut owners = vec![ScopeRef::System, ScopeRef::Company(self.company_id)];
        if let Some(team_id) = self.team_id {
            owners.push(ScopeRef::Team(team_id));
        }
        if let Some(actor_id) = self.actor_id {
            owners.push(ScopeRef::Personal(actor_id));
        }
        owners
    }
}
