//! The transition decision function.
//!
//! The state machine is not global: its states are the columns of the
//! actor's active template, filtered by the statuses the actor can see.

use super::{NameMatching, Role, StatusCatalog, StatusName, TemplateType, WorkflowTemplate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    /// Source and target are the same status.
    NoOp,
    /// The governing template is soft-disabled.
    TemplateInactive,
    /// The target status has no column in the template.
    TargetNotInTemplate,
    /// The target status is not visible to the actor.
    StatusNotVisible,
}

impl DenyReason {
    /// Human-readable explanation.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::NoOp => "source and target status are identical",
            Self::TemplateInactive => "the active workflow template is disabled",
            Self::TargetNotInTemplate => "target status is not a column of the active template",
            Self::StatusNotVisible => "target status is not visible to the actor",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Why a transition needs an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalTrigger {
    /// The target column is gated in an approval process.
    GatedColumn,
    /// Automatic transitions are off and a review column is crossed.
    ReviewBoundary,
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Execute immediately.
    Allowed,
    /// Open an approval request instead of mutating.
    AllowedWithApproval {
        /// Roles that may approve.
        approver_roles: BTreeSet<Role>,
        /// What made the approval necessary.
        trigger: ApprovalTrigger,
    },
    /// Refuse.
    Denied(DenyReason),
}

/// Inputs resolved for the acting audience.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    /// The actor's active template.
    pub template: &'a WorkflowTemplate,
    /// Statuses visible to the actor.
    pub catalog: &'a StatusCatalog,
    /// Resolved `autoTransition` flag.
    pub auto_transition: bool,
}

impl TransitionContext<'_> {
    const fn matching(&self) -> NameMatching {
        self.catalog.matching()
    }
}

/// Decides whether `from -> to` may run under `context`.
///
/// A `from` status outside the template is tolerated so tasks can enter a
/// workflow from any state.
#[must_use]
pub fn decide(context: TransitionContext<'_>, from: &StatusName, to: &StatusName) -> TransitionDecision {
    let matching = context.matching();
    if matching.same(from, to) {
        return TransitionDecision::Denied(DenyReason::NoOp);
    }
    let template = context.template;
    if !template.is_active() {
        return TransitionDecision::Denied(DenyReason::TemplateInactive);
    }
    let Some(target) = template.column_for(to, matching) else {
        return TransitionDecision::Denied(DenyReason::TargetNotInTemplate);
    };
    if !context.catalog.contains(&target.status_value) {
        return TransitionDecision::Denied(DenyReason::StatusNotVisible);
    }

    if template.template_type() == TemplateType::ApprovalProcess && target.gated {
        return TransitionDecision::AllowedWithApproval {
            approver_roles: template.approver_roles().clone(),
            trigger: ApprovalTrigger::GatedColumn,
        };
    }
    let source_review = template
        .column_for(from, matching)
        .is_some_and(|column| column.requires_review);
    if !context.auto_transition && (source_review || target.requires_review) {
        return TransitionDecision::AllowedWithApproval {
            approver_roles: template.approver_roles().clone(),
            trigger: ApprovalTrigger::ReviewBoundary,
        };
    }
    TransitionDecision::Allowed
}
