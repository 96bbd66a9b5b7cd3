use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Counts committed domain mutations, labelled by action.
pub(crate) fn record_mutation(action: &'static str) {
    metrics::counter!("exambank_mutations_total", "action" => action).increment(1);
}

/// Counts rows removed by the tag and subject sweeps.
pub(crate) fn record_sweep(registry: &'static str, removed: u64) {
    if removed > 0 {
        metrics::counter!("exambank_registry_swept_total", "registry" => registry)
            .increment(removed);
    }
}
