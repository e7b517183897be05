// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use masa_source::{BackendRecord, JobBackend};
use parking_lot::Mutex;

/// Scripted backend. Each queue is consumed in order; once empty the
/// defaults apply: submit -> `job-N`, status -> `pending`, results -> `[]`.
#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    submits: VecDeque<Option<String>>,
    statuses: VecDeque<Option<String>>,
    results: VecDeque<Option<Vec<BackendRecord>>>,
    submitted: Vec<(String, u32)>,
    polled: Vec<String>,
    submit_calls: usize,
    status_calls: usize,
    result_calls: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_submit(self, job_id: Option<&str>) -> Self {
        self.inner.lock().submits.push_back(job_id.map(String::from));
        self
    }

    pub fn push_status(self, status: Option<&str>) -> Self {
        self.inner.lock().statuses.push_back(status.map(String::from));
        self
    }

    pub fn push_results(self, records: Option<Vec<serde_json::Value>>) -> Self {
        let parsed = records.map(|v| {
            v.into_iter()
                .map(|r| serde_json::from_value(r).expect("valid record"))
                .collect()
        });
        self.inner.lock().results.push_back(parsed);
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.inner.lock().submit_calls
    }

    pub fn status_calls(&self) -> usize {
        self.inner.lock().status_calls
    }

    pub fn result_calls(&self) -> usize {
        self.inner.lock().result_calls
    }

    pub fn total_calls(&self) -> usize {
        let g = self.inner.lock();
        g.submit_calls + g.status_calls + g.result_calls
    }

    /// `(query, max_results)` per submission, in order.
    pub fn submitted(&self) -> Vec<(String, u32)> {
        self.inner.lock().submitted.clone()
    }

    pub fn polled_job_ids(&self) -> Vec<String> {
        self.inner.lock().polled.clone()
    }
}

#[async_trait]
impl JobBackend for MockBackend {
    async fn submit_job(&self, _search_type: &str, query: &str, max_results: u32) -> Option<String> {
        let mut g = self.inner.lock();
        g.submit_calls += 1;
        g.submitted.push((query.to_string(), max_results));
        let n = g.submit_calls;
        g.submits
            .pop_front()
            .unwrap_or_else(|| Some(format!("job-{n}")))
    }

    async fn check_job_status(&self, _search_type: &str, job_id: &str) -> Option<String> {
        let mut g = self.inner.lock();
        g.status_calls += 1;
        g.polled.push(job_id.to_string());
        g.statuses
            .pop_front()
            .unwrap_or_else(|| Some("pending".to_string()))
    }

    async fn get_job_results(&self, _search_type: &str, _job_id: &str) -> Option<Vec<BackendRecord>> {
        let mut g = self.inner.lock();
        g.result_calls += 1;
        g.results.pop_front().unwrap_or_else(|| Some(Vec::new()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Minimal tweet-like record with the given external id.
pub fn tweet(external_id: &str) -> serde_json::Value {
    serde_json::json!({
        "ID": format!("masa-{external_id}"),
        "ExternalID": external_id,
        "Content": format!("tweet {external_id}"),
        "Metadata": { "username": "ferris" }
    })
}
