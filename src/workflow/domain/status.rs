//! Status definitions and the scope-precedence merge that builds the status
//! catalog visible to an audience.

use super::{ActorId, Audience, CompanyId, Scope, ScopeRef, WorkflowDomainError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier of a status, e.g. `IN_PROGRESS`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusName(String);

impl StatusName {
    /// Longest accepted status name.
    pub const MAX_LEN: usize = 100;

    /// Creates a validated status name.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError`] when the trimmed value is empty, longer
    /// than [`Self::MAX_LEN`] characters or contains control characters.
    pub fn new(value: impl Into<String>) -> Result<Self, WorkflowDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WorkflowDomainError::EmptyStatusName);
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(WorkflowDomainError::StatusNameTooLong {
                name: trimmed.to_owned(),
                max: Self::MAX_LEN,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(WorkflowDomainError::InvalidStatusName(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StatusName {
    type Error = WorkflowDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatusName> for String {
    fn from(value: StatusName) -> Self {
        value.0
    }
}

impl AsRef<str> for StatusName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StatusName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How status names are compared when detecting collisions and resolving
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatching {
    /// `contacted` and `CONTACTED` are different names.
    CaseSensitive,
    /// `contacted` and `CONTACTED` are the same name.
    #[default]
    CaseInsensitive,
}

impl NameMatching {
    /// Returns the comparison key for `name`.
    #[must_use]
    pub fn key(self, name: &StatusName) -> String {
        match self {
            Self::CaseSensitive => name.as_str().to_owned(),
            Self::CaseInsensitive => name.as_str().to_lowercase(),
        }
    }

    /// Returns `true` when both names denote the same status.
    #[must_use]
    pub fn same(self, left: &StatusName, right: &StatusName) -> bool {
        match self {
            Self::CaseSensitive => left == right,
            Self::CaseInsensitive => left.as_str().to_lowercase() == right.as_str().to_lowercase(),
        }
    }
}

/// A `#RRGGBB` colour code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Creates a validated colour code.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidColor`] unless the value is `#`
    /// followed by exactly six hexadecimal digits.
    pub fn new(value: impl Into<String>) -> Result<Self, WorkflowDomainError> {
        let raw = value.into();
        let valid = raw.len() == 7
            && raw.starts_with('#')
            && raw.chars().skip(1).all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(WorkflowDomainError::InvalidColor(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the colour code as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = WorkflowDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

/// Presentation attributes of a status or column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styling {
    /// Background colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<HexColor>,
    /// Foreground colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<HexColor>,
    /// Icon identifier understood by the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Styling {
    /// Returns a copy of `base` with every field set in `self` replaced.
    #[must_use]
    pub fn layered_over(&self, base: &Self) -> Self {
        Self {
            color: self.color.clone().or_else(|| base.color.clone()),
            text_color: self.text_color.clone().or_else(|| base.text_color.clone()),
            icon: self.icon.clone().or_else(|| base.icon.clone()),
        }
    }
}

/// Whether a stored status record defines a status or only restyles one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Introduces a status name in its scope.
    Definition,
    /// Changes display name or styling of a status defined elsewhere.
    PresentationOverride,
}

/// A stored status record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Stable name.
    pub name: StatusName,
    /// Human-readable label.
    pub display_name: String,
    /// Owning scope.
    pub owner: ScopeRef,
    /// Tenant of the owner; `None` for system statuses.
    pub company_id: Option<CompanyId>,
    /// Definition or presentation override.
    pub kind: StatusKind,
    /// Presentation attributes.
    pub styling: Styling,
    /// Inactive records are ignored during resolution.
    pub is_active: bool,
    /// Creator; `None` for system statuses.
    pub created_by: Option<ActorId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Status {
    /// Creates a built-in system status.
    #[must_use]
    pub fn system(name: StatusName, display_name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            name,
            display_name: display_name.into(),
            owner: ScopeRef::System,
            company_id: None,
            kind: StatusKind::Definition,
            styling: Styling::default(),
            is_active: true,
            created_by: None,
            created_at: clock.utc(),
        }
    }

    /// Returns `true` for built-in statuses.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self.owner, ScopeRef::System)
    }
}

/// A status as seen by one audience after scope precedence is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStatus {
    /// Identity name from the broadest defining scope.
    pub name: StatusName,
    /// Display name from the narrowest scope that set one.
    pub display_name: String,
    /// Styling layered from broad to narrow.
    pub styling: Styling,
    /// Scope that owns the status's meaning.
    pub identity_scope: Scope,
    /// Scope that supplied the presentation.
    pub presentation_scope: Scope,
}

/// The statuses visible to one audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCatalog {
    statuses: Vec<ResolvedStatus>,
    matching: NameMatching,
}

impl StatusCatalog {
    /// Merges stored status records into the catalog visible to `audience`.
    ///
    /// Records are applied broadest scope first, then by creation time. The
    /// first record for a name fixes its identity; later records for the same
    /// name only replace display name and styling.
    #[must_use]
    pub fn resolve(records: &[Status], audience: &Audience, matching: NameMatching) -> Self {
        let visible = records
            .iter()
            .filter(|status| status.is_active && audience.can_see(&status.owner))
            .collect();
        Self::merge(visible, matching)
    }

    /// Builds the catalog of built-in statuses only.
    #[must_use]
    pub fn system_only(records: &[Status], matching: NameMatching) -> Self {
        let visible = records
            .iter()
            .filter(|status| status.is_active && status.is_system())
            .collect();
        Self::merge(visible, matching)
    }

    fn merge(mut visible: Vec<&Status>, matching: NameMatching) -> Self {
        visible.sort_by_key(|status| (status.owner.scope().precedence(), status.created_at));

        let mut statuses: Vec<ResolvedStatus> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for record in visible {
            let key = matching.key(&record.name);
            if let Some(resolved) = positions.get(&key).and_then(|pos| statuses.get_mut(*pos)) {
                resolved.display_name.clone_from(&record.display_name);
                resolved.styling = record.styling.layered_over(&resolved.styling);
                resolved.presentation_scope = record.owner.scope();
                continue;
            }
            if record.kind == StatusKind::PresentationOverride {
                continue;
            }
            positions.insert(key, statuses.len());
            statuses.push(ResolvedStatus {
                name: record.name.clone(),
                display_name: record.display_name.clone(),
                styling: record.styling.clone(),
                identity_scope: record.owner.scope(),
                presentation_scope: record.owner.scope(),
            });
        }

        Self { statuses, matching }
    }

    /// Looks up a status by name using the catalog's matching rule.
    #[must_use]
    pub fn find(&self, name: &StatusName) -> Option<&ResolvedStatus> {
        self.statuses
            .iter()
            .find(|status| self.matching.same(&status.name, name))
    }

    /// Returns `true` when `name` resolves in this catalog.
    #[must_use]
    pub fn contains(&self, name: &StatusName) -> bool {
        self.find(name).is_some()
    }

    /// Returns the name matching rule.
    #[must_use]
    pub const fn matching(&self) -> NameMatching {
        self.matching
    }

    /// Returns the resolved statuses in catalog order.
    #[must_use]
    pub fn statuses(&self) -> &[ResolvedStatus] {
        &self.statuses
    }

    /// Consumes the catalog, returning its statuses.
    #[must_use]
    pub fn into_statuses(self) -> Vec<ResolvedStatus> {
        self.statuses
    }

    /// Number of visible statuses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns `true` when nothing is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
