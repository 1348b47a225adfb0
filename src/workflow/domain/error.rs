//! Error types for workflow domain validation and parsing.

use super::StatusName;
use thiserror::Error;

/// Errors returned while constructing workflow domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// The status name is empty after trimming.
    #[error("status name must not be empty")]
    EmptyStatusName,

    /// The status name exceeds the storage limit.
    #[error("status name exceeds {max} characters: {name}")]
    StatusNameTooLong {
        /// The rejected name.
        name: String,
        /// Maximum number of characters.
        max: usize,
    },

    /// The status name contains control characters.
    #[error("status name '{0}' contains control characters")]
    InvalidStatusName(String),

    /// The status display name is empty after trimming.
    #[error("display name must not be empty")]
    EmptyDisplayName,

    /// A colour value is not a `#RRGGBB` hex code.
    #[error("invalid colour code '{0}', expected #RRGGBB")]
    InvalidColor(String),

    /// The template name is empty after trimming.
    #[error("template name must not be empty")]
    EmptyTemplateName,

    /// The template name exceeds the storage limit.
    #[error("template name exceeds {max} characters")]
    TemplateNameTooLong {
        /// Maximum number of characters.
        max: usize,
    },

    /// The template description exceeds the storage limit.
    #[error("template description exceeds {max} characters")]
    DescriptionTooLong {
        /// Maximum number of characters.
        max: usize,
    },

    /// A template must define at least one column.
    #[error("template must define at least one column")]
    EmptyColumns,

    /// Two columns share the same order value.
    #[error("column order {0} is used more than once")]
    DuplicateColumnOrder(u32),

    /// Two columns map the same status.
    #[error("status '{0}' is mapped by more than one column")]
    DuplicateColumnStatus(StatusName),

    /// A column references a status not visible to the template owner.
    #[error("column status '{0}' is not in the visible status catalog")]
    UnknownColumnStatus(StatusName),

    /// An approval process needs at least one approver role.
    #[error("approver roles must not be empty")]
    EmptyApproverRoles,

    /// Page numbers start at one.
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),

    /// Page size is outside the accepted range.
    #[error("limit must be between 1 and {max}, got {limit}")]
    InvalidLimit {
        /// Requested page size.
        limit: u32,
        /// Largest accepted page size.
        max: u32,
    },
}

/// Error returned while parsing a workflow enum from its wire form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseWorkflowEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}

impl ParseWorkflowEnumError {
    /// Creates a parse error for the given enum kind.
    #[must_use]
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
