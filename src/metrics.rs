// src/metrics.rs
use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series carry descriptions once scraped).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_jobs_submitted_total",
            Unit::Count,
            "Search jobs accepted by the backend."
        );
        describe_counter!(
            "source_job_submit_failures_total",
            Unit::Count,
            "Submissions the backend rejected or never answered."
        );
        describe_counter!(
            "source_job_polls_total",
            Unit::Count,
            "Status checks for active jobs."
        );
        describe_counter!(
            "source_job_status_failures_total",
            Unit::Count,
            "Status checks that reported an error or an unusable status."
        );
        describe_counter!(
            "source_items_fetched_total",
            Unit::Count,
            "Items returned from completed jobs."
        );
        describe_counter!(
            "source_search_validation_failures_total",
            Unit::Count,
            "Searches rejected by a platform option schema."
        );
    });
}

/// Install a global Prometheus recorder. Exposing `handle.render()` is up to the caller.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    ensure_metrics_described();
    Ok(handle)
}
