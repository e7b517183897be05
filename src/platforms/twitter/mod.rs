// src/platforms/twitter/mod.rs
//! Twitter search over the async-job backend.

pub mod options;
pub mod query;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::backend::{BackendRecord, JobBackend};
use crate::error::BackendFailure;
use crate::item::{ItemAuthor, ItemMetadata, SourceItem};
use crate::platforms::{PlatformDefinition, PlatformSearchService, SearchOutcome};
use crate::state::{self, newest_id, AsyncJobProgress, Cursor, JobStatus, PlatformState, StateExtras};

pub use options::{TwitterQueryOptions, DEFAULT_PAGE_SIZE};
pub use query::build_twitter_query;

pub const PLATFORM_TYPE: &str = "twitter-scraper";

const SOURCE_PLUGIN: &str = "masa-source";

/// Twitter-specific fields persisted next to the cursor and job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterStateExtension {
    /// Query string submitted for the current job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_query: Option<String>,
    /// Fields written by other producers; carried through untouched.
    #[serde(flatten)]
    pub other: StateExtras,
}

pub type TwitterPlatformState = PlatformState<TwitterStateExtension>;

/// Registry entry for `twitter-scraper`.
pub fn definition() -> PlatformDefinition<TwitterSearchService> {
    PlatformDefinition {
        platform_type: PLATFORM_TYPE,
        factory: TwitterSearchService::new,
        schema: options::validate,
        mapper: options::prepare_args,
    }
}

pub struct TwitterSearchService {
    backend: Arc<dyn JobBackend>,
}

impl TwitterSearchService {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    /// Branch A: poll the active job, fetch results once it is done.
    async fn poll(
        &self,
        job: &AsyncJobProgress,
        current: &TwitterPlatformState,
    ) -> SearchOutcome<TwitterStateExtension> {
        debug!(job_id = %job.job_id, "checking status for existing job");
        counter!("source_job_polls_total", "platform" => PLATFORM_TYPE).increment(1);

        let raw_status = self
            .backend
            .check_job_status(PLATFORM_TYPE, &job.job_id)
            .await;
        let status = raw_status.as_deref().and_then(JobStatus::from_backend);
        let now = state::now();

        match status {
            Some(JobStatus::Done) => {
                let records = match self.backend.get_job_results(PLATFORM_TYPE, &job.job_id).await {
                    Some(r) => r,
                    None => {
                        warn!(
                            job_id = %job.job_id,
                            failure = %BackendFailure::ResultFetch,
                            "treating missing results as empty"
                        );
                        Vec::new()
                    }
                };
                let items: Vec<SourceItem> = records.iter().filter_map(to_source_item).collect();

                let latest_processed_id = newest_id(items.iter().map(|i| i.external_id.as_str()))
                    .map(Cursor::from)
                    .or_else(|| current.latest_processed_id.clone());

                counter!("source_items_fetched_total", "platform" => PLATFORM_TYPE)
                    .increment(items.len() as u64);
                info!(
                    job_id = %job.job_id,
                    items = items.len(),
                    cursor = ?latest_processed_id,
                    "job done, results fetched"
                );

                SearchOutcome {
                    items,
                    next_state: Some(TwitterPlatformState {
                        latest_processed_id,
                        current_async_job: Some(job.with_status(JobStatus::Done, now)),
                        extension: current.extension.clone(),
                    }),
                }
            }
            Some(JobStatus::Error) | None => {
                let failure = BackendFailure::JobStatus { status: raw_status };
                error!(job_id = %job.job_id, %failure, "job failed or status check error");
                counter!("source_job_status_failures_total", "platform" => PLATFORM_TYPE)
                    .increment(1);
                SearchOutcome::pending(TwitterPlatformState {
                    current_async_job: Some(job.failed(failure.to_string(), now)),
                    ..current.clone()
                })
            }
            Some(other) => {
                debug!(job_id = %job.job_id, status = %other, "job still running");
                SearchOutcome::pending(TwitterPlatformState {
                    current_async_job: Some(job.with_status(other, now)),
                    ..current.clone()
                })
            }
        }
    }

    /// Branch B: no active job, submit a new one bounded by the cursor.
    async fn submit(
        &self,
        options: &TwitterQueryOptions,
        current: TwitterPlatformState,
    ) -> SearchOutcome<TwitterStateExtension> {
        let cursor = current.latest_processed_id.as_ref().and_then(Cursor::as_bound);
        if current.latest_processed_id.is_some() && cursor.is_none() {
            warn!(cursor = ?current.latest_processed_id, "cursor has no scalar form; not bounding query");
        }
        let query = build_twitter_query(options, cursor.as_deref());
        let max_results = options.page_size_or_default();
        let now = state::now();

        info!(%query, max_results, "submitting new search job");
        match self.backend.submit_job(PLATFORM_TYPE, &query, max_results).await {
            Some(job_id) => {
                info!(%job_id, "new job submitted");
                counter!("source_jobs_submitted_total", "platform" => PLATFORM_TYPE).increment(1);
                SearchOutcome::pending(TwitterPlatformState {
                    current_async_job: Some(AsyncJobProgress::submitted(job_id, now)),
                    extension: TwitterStateExtension {
                        last_query: Some(query),
                        ..current.extension
                    },
                    ..current
                })
            }
            None => {
                let failure = BackendFailure::JobSubmission;
                error!(%failure, "failed to submit new search job");
                counter!("source_job_submit_failures_total", "platform" => PLATFORM_TYPE)
                    .increment(1);
                SearchOutcome::pending(TwitterPlatformState {
                    current_async_job: Some(AsyncJobProgress::submission_failed(
                        failure.to_string(),
                        now,
                    )),
                    ..current
                })
            }
        }
    }
}

#[async_trait]
impl PlatformSearchService for TwitterSearchService {
    type Options = TwitterQueryOptions;
    type Extension = TwitterStateExtension;

    async fn initialize(&self) -> anyhow::Result<()> {
        debug!(backend = self.backend.name(), "twitter search service initialized");
        Ok(())
    }

    async fn search(
        &self,
        options: &TwitterQueryOptions,
        state: Option<&TwitterPlatformState>,
    ) -> SearchOutcome<TwitterStateExtension> {
        if let Some(s) = state {
            if let Some(job) = s.active_job() {
                return self.poll(job, s).await;
            }
        }
        self.submit(options, state.cloned().unwrap_or_default()).await
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        debug!("twitter search service shut down");
        Ok(())
    }
}

/// Normalize one backend record. Records without any identifier are dropped.
fn to_source_item(rec: &BackendRecord) -> Option<SourceItem> {
    let Some(canonical) = rec.canonical_id() else {
        warn!(content_len = rec.content.len(), "dropping result without identifier");
        return None;
    };
    let id = rec.id.clone().filter(|s| !s.trim().is_empty());
    let external_id = rec
        .external_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| canonical.to_string());

    let author = ItemAuthor {
        id: rec.meta_str(&["user_id", "author_id", "UserID"]),
        username: rec.meta_str(&["username", "Username", "author"]),
        display_name: rec.meta_str(&["name", "display_name", "Name"]),
    };

    let mut metadata = ItemMetadata::new(SOURCE_PLUGIN, PLATFORM_TYPE);
    metadata.url = rec.meta_str(&["url", "permanent_url", "PermanentURL"]).or_else(|| {
        author
            .username
            .as_ref()
            .map(|u| format!("https://x.com/{u}/status/{external_id}"))
    });
    metadata.language = rec.meta_str(&["lang", "language"]);
    metadata.is_reply = rec.meta_bool(&["is_reply", "IsReply"]);
    metadata.in_reply_to_id = rec.meta_str(&["in_reply_to_status_id", "InReplyToStatusID"]);
    metadata.conversation_id = rec.meta_str(&["conversation_id", "ConversationID"]);

    Some(SourceItem {
        id: id.unwrap_or_else(|| external_id.clone()),
        external_id,
        content: rec.content.clone(),
        created_at: rec.meta_str(&["created_at", "CreatedAt", "timestamp"]),
        author: (!author.is_empty()).then_some(author),
        metadata: Some(metadata),
        raw: serde_json::to_value(rec).ok(),
    })
}
