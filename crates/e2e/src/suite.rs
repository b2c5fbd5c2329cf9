//! Built-in login flow scenarios
//!
//! The YAML files under `scenarios/login/` are compiled into the binary so the
//! suite runs without a checkout.

use crate::error::{E2eError, E2eResult};
use crate::scenario::Scenario;

/// Hosted deployment the suite targets by default
pub const DEFAULT_BASE_URL: &str = "https://programsko-inzenjerstvo-csfw.onrender.com";

/// Tag carried by scenarios outside the default run
pub const EXTENDED_TAG: &str = "extended";

const LOGIN_SCENARIOS: &[(&str, &str)] = &[
    (
        "tc01_successful_login.yaml",
        include_str!("../scenarios/login/tc01_successful_login.yaml"),
    ),
    (
        "tc02_empty_fields.yaml",
        include_str!("../scenarios/login/tc02_empty_fields.yaml"),
    ),
    (
        "tc03_wrong_password.yaml",
        include_str!("../scenarios/login/tc03_wrong_password.yaml"),
    ),
    (
        "tc04_redirect_not_logged_in.yaml",
        include_str!("../scenarios/login/tc04_redirect_not_logged_in.yaml"),
    ),
    (
        "tc05_unknown_email.yaml",
        include_str!("../scenarios/login/tc05_unknown_email.yaml"),
    ),
];

/// The four login checks, in order
pub fn login_suite() -> E2eResult<Vec<Scenario>> {
    Ok(extended_login_suite()?
        .into_iter()
        .filter(|s| !s.tags.iter().any(|t| t == EXTENDED_TAG))
        .collect())
}

/// The login checks plus the extended ones
pub fn extended_login_suite() -> E2eResult<Vec<Scenario>> {
    let scenarios = LOGIN_SCENARIOS
        .iter()
        .map(|(file, yaml)| {
            Scenario::from_yaml(yaml).map_err(|e| E2eError::ScenarioParse(format!("{}: {}", file, e)))
        })
        .collect::<E2eResult<Vec<_>>>()?;
    Scenario::ensure_unique(&scenarios)?;
    Ok(scenarios)
}
