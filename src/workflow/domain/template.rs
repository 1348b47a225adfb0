//! Workflow templates: named, ordered sets of status-to-column mappings.

use super::{
    ActorId, ColumnId, CompanyId, NameMatching, ParseWorkflowEnumError, Role, ScopeRef,
    StatusCatalog, StatusName, Styling, TemplateId, WorkflowDomainError,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Behavioural family of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    /// General task flow.
    Standard,
    /// Flow whose gated columns need an approval.
    ApprovalProcess,
    /// Client-facing communication flow.
    ClientCommunication,
    /// Anything else.
    Custom,
}

impl TemplateType {
    /// Every template type, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Standard,
        Self::ApprovalProcess,
        Self::ClientCommunication,
        Self::Custom,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::ApprovalProcess => "APPROVAL_PROCESS",
            Self::ClientCommunication => "CLIENT_COMMUNICATION",
            Self::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemplateType {
    type Error = ParseWorkflowEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(Self::Standard),
            "APPROVAL_PROCESS" | "APPROVAL" => Ok(Self::ApprovalProcess),
            "CLIENT_COMMUNICATION" | "CLIENT" => Ok(Self::ClientCommunication),
            "CUSTOM" => Ok(Self::Custom),
            _ => Err(ParseWorkflowEnumError::new("template type", value)),
        }
    }
}

/// Validated template name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateName(String);

impl TemplateName {
    /// Longest accepted template name.
    pub const MAX_LEN: usize = 255;

    /// Creates a validated template name.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyTemplateName`] or
    /// [`WorkflowDomainError::TemplateNameTooLong`].
    pub fn new(value: impl Into<String>) -> Result<Self, WorkflowDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WorkflowDomainError::EmptyTemplateName);
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(WorkflowDomainError::TemplateNameTooLong { max: Self::MAX_LEN });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TemplateName {
    type Error = WorkflowDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TemplateName> for String {
    fn from(value: TemplateName) -> Self {
        value.0
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column definition as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Existing column identifier to keep on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ColumnId>,
    /// Column label.
    pub display_name: String,
    /// Status represented by the column.
    pub status_value: StatusName,
    /// Position; unique within the template.
    pub order: u32,
    /// Presentation attributes.
    #[serde(default)]
    pub styling: Styling,
    /// Entering this column needs an approval in approval processes.
    #[serde(default)]
    pub gated: bool,
    /// Crossing into or out of this column needs review when automatic
    /// transitions are off.
    #[serde(default)]
    pub requires_review: bool,
}

impl ColumnSpec {
    /// Creates a plain column specification.
    #[must_use]
    pub fn new(display_name: impl Into<String>, status_value: StatusName, order: u32) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            status_value,
            order,
            styling: Styling::default(),
            gated: false,
            requires_review: false,
        }
    }

    /// Marks the column as gated.
    #[must_use]
    pub const fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    /// Marks the column as requiring review.
    #[must_use]
    pub const fn requires_review(mut self) -> Self {
        self.requires_review = true;
        self
    }

    /// Sets the column styling.
    #[must_use]
    pub fn with_styling(mut self, styling: Styling) -> Self {
        self.styling = styling;
        self
    }
}

/// A column of a stored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column identifier.
    pub id: ColumnId,
    /// Column label.
    pub display_name: String,
    /// Status represented by the column.
    pub status_value: StatusName,
    /// Position; unique within the template.
    pub order: u32,
    /// Presentation attributes.
    pub styling: Styling,
    /// Entering this column needs an approval in approval processes.
    pub gated: bool,
    /// Crossing this column boundary needs review when automatic
    /// transitions are off.
    pub requires_review: bool,
}

impl Column {
    fn from_spec(spec: ColumnSpec) -> Self {
        Self {
            id: spec.id.unwrap_or_default(),
            display_name: spec.display_name,
            status_value: spec.status_value,
            order: spec.order,
            styling: spec.styling,
            gated: spec.gated,
            requires_review: spec.requires_review,
        }
    }
}

/// Validates column specifications against a status catalog and returns the
/// columns sorted by order.
///
/// # Errors
///
/// Returns [`WorkflowDomainError`] when the list is empty, an order or status
/// repeats, a display name is blank, or a status is not in `catalog`.
pub fn build_columns(
    specs: Vec<ColumnSpec>,
    catalog: &StatusCatalog,
) -> Result<Vec<Column>, WorkflowDomainError> {
    if specs.is_empty() {
        return Err(WorkflowDomainError::EmptyColumns);
    }
    let mut orders = HashSet::new();
    let mut statuses = HashSet::new();
    for spec in &specs {
        if spec.display_name.trim().is_empty() {
            return Err(WorkflowDomainError::EmptyDisplayName);
        }
        if !orders.insert(spec.order) {
            return Err(WorkflowDomainError::DuplicateColumnOrder(spec.order));
        }
        if !statuses.insert(catalog.matching().key(&spec.status_value)) {
            return Err(WorkflowDomainError::DuplicateColumnStatus(
                spec.status_value.clone(),
            ));
        }
        if !catalog.contains(&spec.status_value) {
            return Err(WorkflowDomainError::UnknownColumnStatus(
                spec.status_value.clone(),
            ));
        }
    }
    let mut columns: Vec<Column> = specs.into_iter().map(Column::from_spec).collect();
    columns.sort_by_key(|column| column.order);
    Ok(columns)
}

/// Caller-supplied template content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    /// Template name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Behavioural family.
    pub template_type: TemplateType,
    /// Column specifications.
    pub columns: Vec<ColumnSpec>,
    /// Roles allowed to approve gated transitions.
    pub approver_roles: BTreeSet<Role>,
}

impl TemplateDraft {
    /// Creates a draft with the given approver roles.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        template_type: TemplateType,
        columns: Vec<ColumnSpec>,
        approver_roles: BTreeSet<Role>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            template_type,
            columns,
            approver_roles,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatePatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New behavioural family.
    pub template_type: Option<TemplateType>,
    /// Replacement columns.
    pub columns: Option<Vec<ColumnSpec>>,
    /// Replacement approver roles.
    pub approver_roles: Option<BTreeSet<Role>>,
    /// New activity flag.
    pub is_active: Option<bool>,
}

impl TemplatePatch {
    /// Returns `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.template_type.is_none()
            && self.columns.is_none()
            && self.approver_roles.is_none()
            && self.is_active.is_none()
    }
}

/// Ownership data for a new template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateOwnership {
    /// Owning scope.
    pub owner: ScopeRef,
    /// Tenant; `None` for system templates.
    pub company_id: Option<CompanyId>,
    /// Creator; `None` for system templates.
    pub created_by: Option<ActorId>,
}

/// Longest accepted template description.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// A stored workflow template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    id: TemplateId,
    owner: ScopeRef,
    company_id: Option<CompanyId>,
    name: TemplateName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "type")]
    template_type: TemplateType,
    columns: Vec<Column>,
    approver_roles: BTreeSet<Role>,
    is_active: bool,
    is_system_default: bool,
    created_by: Option<ActorId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowTemplate {
    /// Creates a template whose columns are validated against `catalog`, the
    /// status catalog visible to the owning scope.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError`] when the name, description, columns or
    /// approver roles are invalid.
    pub fn new(
        draft: TemplateDraft,
        ownership: TemplateOwnership,
        catalog: &StatusCatalog,
        clock: &impl Clock,
    ) -> Result<Self, WorkflowDomainError> {
        let name = TemplateName::new(draft.name)?;
        let description = validate_description(draft.description)?;
        if draft.approver_roles.is_empty() {
            return Err(WorkflowDomainError::EmptyApproverRoles);
        }
        let columns = build_columns(draft.columns, catalog)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: TemplateId::new(),
            owner: ownership.owner,
            company_id: ownership.company_id,
            name,
            description,
            template_type: draft.template_type,
            columns,
            approver_roles: draft.approver_roles,
            is_active: true,
            is_system_default: false,
            created_by: ownership.created_by,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Returns the template identifier.
    #[must_use]
    pub const fn id(&self) -> TemplateId {
        self.id
    }

    /// Returns the owning scope.
    #[must_use]
    pub const fn owner(&self) -> &ScopeRef {
        &self.owner
    }

    /// Returns the tenant, if any.
    #[must_use]
    pub const fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    /// Returns the template name.
    #[must_use]
    pub const fn name(&self) -> &TemplateName {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the template type.
    #[must_use]
    pub const fn template_type(&self) -> TemplateType {
        self.template_type
    }

    /// Returns the columns sorted by order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns roles allowed to approve gated transitions.
    #[must_use]
    pub const fn approver_roles(&self) -> &BTreeSet<Role> {
        &self.approver_roles
    }

    /// Returns `true` unless the template was soft-disabled.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns `true` for the protected default of its type.
    #[must_use]
    pub const fn is_system_default(&self) -> bool {
        self.is_system_default
    }

    /// Returns the creator, if any.
    #[must_use]
    pub const fn created_by(&self) -> Option<ActorId> {
        self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Finds the column representing `status`.
    #[must_use]
    pub fn column_for(&self, status: &StatusName, matching: NameMatching) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| matching.same(&column.status_value, status))
    }

    /// Applies a partial update. Replacement columns are validated against
    /// `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError`] when any supplied field is invalid; the
    /// template is left unchanged in that case.
    pub fn apply_patch(
        &mut self,
        patch: TemplatePatch,
        catalog: &StatusCatalog,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        let name = patch.name.map(TemplateName::new).transpose()?;
        let description = validate_description(patch.description)?;
        if patch
            .approver_roles
            .as_ref()
            .is_some_and(BTreeSet::is_empty)
        {
            return Err(WorkflowDomainError::EmptyApproverRoles);
        }
        let columns = patch
            .columns
            .map(|specs| build_columns(specs, catalog))
            .transpose()?;

        if let Some(value) = name {
            self.name = value;
        }
        if description.is_some() {
            self.description = description;
        }
        if let Some(value) = patch.template_type {
            self.template_type = value;
        }
        if let Some(value) = columns {
            self.columns = value;
        }
        if let Some(value) = patch.approver_roles {
            self.approver_roles = value;
        }
        if let Some(value) = patch.is_active {
            self.is_active = value;
        }
        self.touch(clock);
        Ok(())
    }

    /// Soft-disables the template.
    pub fn deactivate(&mut self, clock: &impl Clock) {
        self.is_active = false;
        self.touch(clock);
    }

    /// Sets or clears the system-default flag.
    ///
    /// Only the template repository calls this, inside its atomic swap.
    pub fn set_system_default_flag(&mut self, value: bool, at: DateTime<Utc>) {
        self.is_system_default = value;
        self.updated_at = at;
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

fn validate_description(
    description: Option<String>,
) -> Result<Option<String>, WorkflowDomainError> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => {
            Err(WorkflowDomainError::DescriptionTooLong {
                max: MAX_DESCRIPTION_LEN,
            })
        }
        other => Ok(other),
    }
}
