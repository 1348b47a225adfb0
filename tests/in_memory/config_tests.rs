//! Layered configuration loading.

use eyre::ensure;
use rstest::rstest;
use std::io::Write;
use taskflow::config::{ConfigError, EngineConfig};
use taskflow::workflow::domain::{CompanyId, NameMatching, Role};
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> eyre::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[rstest]
fn missing_file_path_yields_defaults() -> eyre::Result<()> {
    let config = EngineConfig::load(None)?;

    ensure!(config == EngineConfig::default(), "got {config:?}");
    ensure!(
        config.name_matching() == NameMatching::CaseInsensitive,
        "case-insensitive by default"
    );
    Ok(())
}

#[rstest]
fn file_values_override_defaults() -> eyre::Result<()> {
    let file = toml_file(
        r#"
[statuses]
case_sensitive_names = true
system = ["BACKLOG", "DONE"]

[approvals]
default_approver_roles = ["company_leader"]

[pagination]
default_limit = 5
"#,
    )?;

    let config = EngineConfig::load(Some(file.path()))?;

    ensure!(config.name_matching() == NameMatching::CaseSensitive, "policy");
    ensure!(config.statuses.system == ["BACKLOG", "DONE"], "statuses");
    ensure!(
        config.approvals.default_approver_roles == [Role::CompanyLeader],
        "approvers"
    );
    ensure!(config.pagination.default_limit == 5, "default limit");
    ensure!(config.pagination.max_limit == 100, "untouched keys keep defaults");
    ensure!(config.telemetry.log_filter == "info", "telemetry default");
    Ok(())
}

#[rstest]
fn operator_company_is_read_from_the_file() -> eyre::Result<()> {
    let operator = CompanyId::new();
    let file = toml_file(&format!("[templates]\noperator_company = \"{operator}\"\n"))?;

    let config = EngineConfig::load(Some(file.path()))?;

    ensure!(config.templates.operator_company == Some(operator), "got {config:?}");
    ensure!(
        EngineConfig::default().templates.operator_company.is_none(),
        "no operator by default"
    );
    Ok(())
}

#[rstest]
#[case::limit_above_max("[pagination]\ndefault_limit = 500\n")]
#[case::zero_max("[pagination]\nmax_limit = 0\n")]
#[case::no_approvers("[approvals]\ndefault_approver_roles = []\n")]
fn inconsistent_values_are_rejected(#[case] contents: &str) -> eyre::Result<()> {
    let file = toml_file(contents)?;

    let result = EngineConfig::load(Some(file.path()));

    ensure!(
        matches!(result, Err(ConfigError::Invalid(_))),
        "got {result:?}"
    );
    Ok(())
}

#[rstest]
fn mistyped_values_fail_to_load() -> eyre::Result<()> {
    let file = toml_file("[statuses]\ncase_sensitive_names = \"sometimes\"\n")?;

    let result = EngineConfig::load(Some(file.path()));

    ensure!(matches!(result, Err(ConfigError::Load(_))), "got {result:?}");
    Ok(())
}
