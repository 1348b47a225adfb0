//! Engine configuration.
//!
//! Values are layered from built-in defaults, an optional TOML file and
//! `TASKFLOW__`-prefixed environment variables, with later layers winning.
//! Nested keys use a double underscore, e.g.
//! `TASKFLOW__STATUSES__CASE_SENSITIVE_NAMES=true`.
//!
//! # Example
//!
//! ```
//! use taskflow::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert!(!config.statuses.case_sensitive_names);
//! assert_eq!(config.pagination.max_limit, 100);
//!
//! let strict = EngineConfig::case_sensitive();
//! assert!(strict.statuses.case_sensitive_names);
//! ```

use crate::workflow::domain::{CompanyId, NameMatching, Role};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "TASKFLOW";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialised.
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    /// The values were read but are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Status catalog behaviour.
    pub statuses: StatusConfig,
    /// Approval defaults.
    pub approvals: ApprovalConfig,
    /// Template administration.
    pub templates: TemplateConfig,
    /// List paging.
    pub pagination: PaginationConfig,
    /// Log output.
    pub telemetry: TelemetryConfig,
}

/// Status catalog behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Treat `contacted` and `CONTACTED` as different names.
    pub case_sensitive_names: bool,
    /// Built-in statuses seeded at start-up.
    pub system: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            case_sensitive_names: false,
            system: [
                "TODO",
                "IN_PROGRESS",
                "IN_REVIEW",
                "COMPLETED",
                "CANCELLED",
                "NEW",
                "CONTACTED",
                "WON",
                "LOST",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

/// Approval defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Approver roles of templates created without explicit roles.
    pub default_approver_roles: Vec<Role>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            default_approver_roles: vec![Role::Manager, Role::CompanyLeader],
        }
    }
}

/// Template administration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Company whose leaders may change the system default templates. The
    /// defaults are shared by every tenant; when unset, only start-up
    /// installation changes them.
    pub operator_company: Option<CompanyId>,
}

/// List paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size when the caller gives none.
    pub default_limit: u32,
    /// Largest accepted page size.
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_owned(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with case-sensitive status names.
    #[must_use]
    pub fn case_sensitive() -> Self {
        Self {
            statuses: StatusConfig {
                case_sensitive_names: true,
                ..StatusConfig::default()
            },
            ..Self::default()
        }
    }

    /// Loads defaults, then `path` when given, then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when the file cannot be read or a value
    /// has the wrong type, and [`ConfigError::Invalid`] when the paging
    /// limits are inconsistent or no approver role is configured.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = path {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let paging = self.pagination;
        if paging.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "pagination.max_limit must be positive".to_owned(),
            ));
        }
        if paging.default_limit == 0 || paging.default_limit > paging.max_limit {
            return Err(ConfigError::Invalid(format!(
                "pagination.default_limit must be between 1 and {}",
                paging.max_limit
            )));
        }
        if self.approvals.default_approver_roles.is_empty() {
            return Err(ConfigError::Invalid(
                "approvals.default_approver_roles must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Name comparison rule for statuses.
    #[must_use]
    pub const fn name_matching(&self) -> NameMatching {
        if self.statuses.case_sensitive_names {
            NameMatching::CaseSensitive
        } else {
            NameMatching::CaseInsensitive
        }
    }
}
