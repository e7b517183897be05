// src/backend/mod.rs
pub mod masa;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

pub use masa::MasaClient;

/// Async-job search backend: submit, poll, fetch.
///
/// Every method answers `None` on any failure (transport, HTTP status,
/// undecodable body). Implementations log the cause; callers turn `None`
/// into job state, never into an error.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Returns the new job id.
    async fn submit_job(&self, search_type: &str, query: &str, max_results: u32)
        -> Option<String>;

    /// Returns the raw status string reported by the backend.
    async fn check_job_status(&self, search_type: &str, job_id: &str) -> Option<String>;

    async fn get_job_results(&self, search_type: &str, job_id: &str)
        -> Option<Vec<BackendRecord>>;

    fn name(&self) -> &'static str;
}

/// One result record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRecord {
    #[serde(
        rename = "ID",
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        rename = "ExternalID",
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<String>,
    #[serde(rename = "Content", default)]
    pub content: String,
    #[serde(rename = "Metadata", default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "Score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl BackendRecord {
    /// External (platform) identifier first, backend identifier second.
    pub fn canonical_id(&self) -> Option<&str> {
        non_empty(self.external_id.as_deref()).or_else(|| non_empty(self.id.as_deref()))
    }

    /// First metadata value under any of `keys` that reads as a string.
    pub fn meta_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| match self.metadata.get(*k)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn meta_bool(&self, keys: &[&str]) -> Option<bool> {
        keys.iter()
            .find_map(|k| self.metadata.get(*k).and_then(serde_json::Value::as_bool))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

fn opt_string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        N(serde_json::Number),
    }
    Ok(match Option::<Raw>::deserialize(d)? {
        Some(Raw::S(s)) => Some(s),
        Some(Raw::N(n)) => Some(n.to_string()),
        None => None,
    })
}
