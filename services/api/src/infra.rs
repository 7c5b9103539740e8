use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use xpendit::config::AppConfig;
use xpendit::error::AppError;
use xpendit::workflows::expenses::{PolicyConfig, PolicyEngine};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: PolicyEngine,
}

/// Policy from `POLICY_PATH` when configured, otherwise the built-in standard policy.
pub(crate) fn load_policy(config: &AppConfig) -> Result<PolicyConfig, AppError> {
    match &config.policy_path {
        Some(path) => {
            let policy = PolicyConfig::from_path(path)?;
            info!(path = %path.display(), base_currency = %policy.base_currency, "loaded policy file");
            Ok(policy)
        }
        None => Ok(PolicyConfig::standard()),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
