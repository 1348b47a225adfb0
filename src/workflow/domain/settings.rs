//! Workflow settings rows and the scope fallback merge.
//!
//! Each scope stores a partial row. Resolution walks the actor's scope chain
//! from narrowest to broadest and takes the first value set for each field,
//! finishing with hard-coded defaults. Nothing is materialised, so changing a
//! company row immediately affects every actor without a narrower override.

use super::{ActorId, CompanyId, Scope, ScopeRef, TemplateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of `autoTransition` when no scope sets it.
pub const DEFAULT_AUTO_TRANSITION: bool = false;
/// Value of `notificationEnabled` when no scope sets it.
pub const DEFAULT_NOTIFICATION_ENABLED: bool = true;
/// Value of `allowCustomStatus` when no scope sets it.
pub const DEFAULT_ALLOW_CUSTOM_STATUS: bool = false;

/// Partial update of a settings row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    /// Template to activate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_template_id: Option<TemplateId>,
    /// Execute non-gated transitions without review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_transition: Option<bool>,
    /// Dispatch workflow notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_enabled: Option<bool>,
    /// Permit custom status definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_custom_status: Option<bool>,
}

impl SettingsPatch {
    /// Returns `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.active_template_id.is_none()
            && self.auto_transition.is_none()
            && self.notification_enabled.is_none()
            && self.allow_custom_status.is_none()
    }

    /// Sets the active template.
    #[must_use]
    pub const fn with_active_template(mut self, template_id: TemplateId) -> Self {
        self.active_template_id = Some(template_id);
        self
    }

    /// Sets `autoTransition`.
    #[must_use]
    pub const fn with_auto_transition(mut self, value: bool) -> Self {
        self.auto_transition = Some(value);
        self
    }

    /// Sets `notificationEnabled`.
    #[must_use]
    pub const fn with_notification_enabled(mut self, value: bool) -> Self {
        self.notification_enabled = Some(value);
        self
    }

    /// Sets `allowCustomStatus`.
    #[must_use]
    pub const fn with_allow_custom_status(mut self, value: bool) -> Self {
        self.allow_custom_status = Some(value);
        self
    }
}

/// Stored settings of one scope owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
    /// Owning scope.
    pub owner: ScopeRef,
    /// Tenant of the owner.
    pub company_id: CompanyId,
    /// Fields set at this scope.
    #[serde(flatten)]
    pub values: SettingsPatch,
    /// Last writer.
    pub updated_by: ActorId,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowSettings {
    /// Creates an empty row for `owner`.
    #[must_use]
    pub fn empty(
        owner: ScopeRef,
        company_id: CompanyId,
        updated_by: ActorId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            owner,
            company_id,
            values: SettingsPatch::default(),
            updated_by,
            updated_at: at,
        }
    }

    /// Overwrites every field set in `patch`.
    pub fn apply(&mut self, patch: &SettingsPatch, updated_by: ActorId, at: DateTime<Utc>) {
        if let Some(template_id) = patch.active_template_id {
            self.values.active_template_id = Some(template_id);
        }
        if let Some(value) = patch.auto_transition {
            self.values.auto_transition = Some(value);
        }
        if let Some(value) = patch.notification_enabled {
            self.values.notification_enabled = Some(value);
        }
        if let Some(value) = patch.allow_custom_status {
            self.values.allow_custom_status = Some(value);
        }
        self.updated_by = updated_by;
        self.updated_at = at;
    }
}

/// Scope that supplied each resolved field; [`Scope::System`] marks the
/// built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSources {
    /// Source of `activeTemplateId`.
    pub active_template: Scope,
    /// Source of `autoTransition`.
    pub auto_transition: Scope,
    /// Source of `notificationEnabled`.
    pub notification_enabled: Scope,
    /// Source of `allowCustomStatus`.
    pub allow_custom_status: Scope,
}

/// Effective settings for one actor or scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSettings {
    /// Template governing transitions; `None` only when no system default
    /// template is installed.
    pub active_template_id: Option<TemplateId>,
    /// Execute non-gated transitions without review.
    pub auto_transition: bool,
    /// Dispatch workflow notifications.
    pub notification_enabled: bool,
    /// Permit custom status definitions.
    pub allow_custom_status: bool,
    /// Where each value came from.
    pub sources: SettingsSources,
}

/// Merges stored rows, ordered narrowest scope first, into effective
/// settings.
///
/// `template_usable` decides whether a referenced template is active and
/// visible to the resolving audience; unusable references are skipped and the
/// chain continues. `default_template` is the fallback template.
#[must_use]
pub fn merge_settings(
    rows: &[WorkflowSettings],
    template_usable: impl Fn(TemplateId) -> bool,
    default_template: Option<TemplateId>,
) -> ResolvedSettings {
    let (active_template_id, active_template) = rows
        .iter()
        .find_map(|row| {
            row.values
                .active_template_id
                .filter(|id| template_usable(*id))
                .map(|id| (Some(id), row.owner.scope()))
        })
        .unwrap_or((default_template, Scope::System));
    let (auto_transition, auto_source) =
        first_flag(rows, |v| v.auto_transition, DEFAULT_AUTO_TRANSITION);
    let (notification_enabled, notification_source) = first_flag(
        rows,
        |v| v.notification_enabled,
        DEFAULT_NOTIFICATION_ENABLED,
    );
    let (allow_custom_status, custom_source) = first_flag(
        rows,
        |v| v.allow_custom_status,
        DEFAULT_ALLOW_CUSTOM_STATUS,
    );

    ResolvedSettings {
        active_template_id,
        auto_transition,
        notification_enabled,
        allow_custom_status,
        sources: SettingsSources {
            active_template,
            auto_transition: auto_source,
            notification_enabled: notification_source,
            allow_custom_status: custom_source,
        },
    }
}

fn first_flag(
    rows: &[WorkflowSettings],
    field: impl Fn(&SettingsPatch) -> Option<bool>,
    default: bool,
) -> (bool, Scope) {
    rows.iter()
        .find_map(|row| field(&row.values).map(|value| (value, row.owner.scope())))
        .unwrap_or((default, Scope::System))
}
