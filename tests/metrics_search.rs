// tests/metrics_search.rs
#![cfg(feature = "strict-metrics")]
mod common;

use std::sync::Arc;

use common::{tweet, MockBackend};
use masa_source::metrics::install_prometheus;
use masa_source::{JobBackend, Registry, SearchOptions, SourceConnector};
use serde_json::json;

#[tokio::test]
async fn counters_exposed_after_search_cycle() {
    let handle = install_prometheus().expect("recorder");

    let mock = Arc::new(
        MockBackend::new()
            .push_submit(Some("j1"))
            .push_status(Some("done"))
            .push_results(Some(vec![tweet("1"), tweet("2")]))
            .push_submit(None)
            .push_status(Some("error")),
    );
    let backend: Arc<dyn JobBackend> = mock.clone();
    let c = SourceConnector::with_backend(backend, &Registry::default())
        .await
        .unwrap();
    let opts = SearchOptions::new("twitter-scraper").with_query("rust");

    // submit, poll+fetch, failed submit
    let mut state = None;
    for _ in 0..3 {
        state = c.search(state.as_ref(), &opts).await.unwrap().next_last_processed_state;
    }
    // a job that the backend reports as failed
    let s = c.search(None, &opts).await.unwrap().next_last_processed_state;
    let _ = c.search(s.as_ref(), &opts).await.unwrap();
    // rejected options
    let bad = opts.clone().with_platform_args(json!({"minLikes": -1}));
    assert!(c.search(None, &bad).await.is_err());

    let out = handle.render();
    for needle in [
        "source_jobs_submitted_total",
        "source_job_submit_failures_total",
        "source_job_polls_total",
        "source_job_status_failures_total",
        "source_items_fetched_total",
        "source_search_validation_failures_total",
        "platform=\"twitter-scraper\"",
    ] {
        assert!(out.contains(needle), "missing {needle} in:\n{out}");
    }
}
