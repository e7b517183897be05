// src/state.rs
//! Resumable state carried between `search` calls.
//!
//! The persisted JSON shape is
//! `{ "data": { "latestProcessedId"?: <cursor>, "currentAsyncJob"?: { ... } } }`.
//! Field order and optional-field omission are fixed, and timestamps are
//! written as `YYYY-MM-DDTHH:MM:SS.mmmZ`, so a decoded state serializes back
//! to the same bytes.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Open-ended per-platform fields kept alongside the typed state.
pub type StateExtras = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Pending,
    Processing,
    Done,
    Error,
    Timeout,
}

impl JobStatus {
    /// `done`, `error` and `timeout` end a job; a new one may be submitted after.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Timeout)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Map a raw backend status string. `None` means the status is unusable.
    pub fn from_backend(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        match s.as_str() {
            "submitted" => Some(JobStatus::Submitted),
            "pending" | "queued" => Some(JobStatus::Pending),
            "processing" | "in progress" | "in_progress" | "running" => {
                Some(JobStatus::Processing)
            }
            "done" | "completed" => Some(JobStatus::Done),
            "timeout" | "timed out" => Some(JobStatus::Timeout),
            // "error(fetching_status)" and friends
            _ if s.starts_with("error") => Some(JobStatus::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Timeout => "timeout",
        }
    }
}

/// Persisted statuses go through the backend vocabulary, so raw strings such
/// as `"in progress"` stored by older writers still load. Anything unknown
/// loads as `error`, which makes the next call submit a fresh job.
impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(JobStatus::from_backend(&raw).unwrap_or(JobStatus::Error))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job submitted to the async search backend.
///
/// Updates produce a new value (`with_status`, `failed`), the previous one is
/// dropped by the caller. A terminal job is replaced on the next submission,
/// never moved back to an active status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncJobProgress {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(with = "millis")]
    pub submitted_at: DateTime<Utc>,
    #[serde(
        default,
        with = "millis::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Current time at the precision the state is persisted with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 timestamps with exactly three fractional digits and a `Z` suffix.
mod millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(d)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(t: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => super::serialize(t, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(d)
        }
    }
}

impl AsyncJobProgress {
    pub fn submitted(job_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Submitted,
            submitted_at: now,
            last_checked_at: None,
            error_message: None,
        }
    }

    /// Placeholder job recorded when the backend refused a submission.
    pub fn submission_failed(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            job_id: format!("submission_failed_{}", now.timestamp_millis()),
            status: JobStatus::Error,
            submitted_at: now,
            last_checked_at: None,
            error_message: Some(message.into()),
        }
    }

    pub fn with_status(&self, status: JobStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            last_checked_at: Some(now),
            ..self.clone()
        }
    }

    pub fn failed(&self, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Error,
            last_checked_at: Some(now),
            error_message: Some(message.into()),
            ..self.clone()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Resumption cursor: the identifier of the newest item already delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cursor {
    Number(serde_json::Number),
    Text(String),
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl Cursor {
    /// Scalar form usable as a query bound. Structured cursors have none.
    pub fn as_bound(&self) -> Option<String> {
        match self {
            Cursor::Number(n) => Some(n.to_string()),
            Cursor::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Cursor::Text(_) | Cursor::Structured(_) => None,
        }
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Cursor::Text(s.to_string())
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Cursor::Text(s)
    }
}

impl From<u64> for Cursor {
    fn from(n: u64) -> Self {
        Cursor::Number(n.into())
    }
}

/// Ordering used to pick the newest item identifier.
///
/// Both sides parse as unsigned integers: numeric order. Otherwise plain
/// lexicographic order on the strings.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u128>(), b.parse::<u128>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Largest identifier in `ids` per [`compare_ids`]. Ties keep the earlier one.
pub fn newest_id<'a, I>(ids: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    ids.into_iter().fold(None, |best, id| match best {
        Some(b) if compare_ids(id, b) != Ordering::Greater => Some(b),
        _ => Some(id),
    })
}

/// Platform cursor plus the job in flight. `X` carries platform-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformState<X = StateExtras> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_processed_id: Option<Cursor>,
    #[serde(
        default,
        alias = "currentMasaJob",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_async_job: Option<AsyncJobProgress>,
    #[serde(flatten)]
    pub extension: X,
}

impl<X: Default> Default for PlatformState<X> {
    fn default() -> Self {
        Self {
            latest_processed_id: None,
            current_async_job: None,
            extension: X::default(),
        }
    }
}

impl<X> PlatformState<X> {
    /// The job that must be polled rather than replaced, if any.
    pub fn active_job(&self) -> Option<&AsyncJobProgress> {
        self.current_async_job.as_ref().filter(|j| j.is_active())
    }
}

/// Generic envelope persisted by the caller between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastProcessedState<T = PlatformState> {
    pub data: T,
}

impl<T> LastProcessedState<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
