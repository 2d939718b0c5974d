use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const ATTEMPTS_STARTED: &str = "quiz_attempts_started_total";
pub(crate) const ATTEMPTS_SUBMITTED: &str = "quiz_attempts_submitted_total";
pub(crate) const STATUS_SWEEPS: &str = "quiz_status_sweeps_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(ATTEMPTS_STARTED, "Quiz attempts created");
    metrics::describe_counter!(ATTEMPTS_SUBMITTED, "Quiz attempts graded and submitted");
    metrics::describe_counter!(STATUS_SWEEPS, "Quizzes auto-completed after their end time");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
