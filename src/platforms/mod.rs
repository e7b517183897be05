// src/platforms/mod.rs
//! Per-platform search services and the table that dispatches to them.

pub mod registry;
pub mod schema;
pub mod twitter;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::item::SourceItem;
use crate::state::PlatformState;

pub use registry::{PlatformDefinition, PlatformHandle, Registry};

/// Loosely typed platform arguments, before a schema has narrowed them.
pub type RawPlatformArgs = serde_json::Map<String, serde_json::Value>;

/// Generic options for one `search` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Registry key, e.g. `twitter-scraper`.
    #[serde(rename = "type")]
    pub platform_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_args: Option<RawPlatformArgs>,
}

impl SearchOptions {
    pub fn new(platform_type: impl Into<String>) -> Self {
        Self {
            platform_type: platform_type.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_page_size(mut self, n: u32) -> Self {
        self.page_size = Some(n);
        self
    }

    pub fn with_platform_args(mut self, args: serde_json::Value) -> Self {
        self.platform_args = match args {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        self
    }
}

/// Items plus the next platform state. `next_state: None` means the service
/// has no resumable state to hand back.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<X> {
    pub items: Vec<SourceItem>,
    pub next_state: Option<PlatformState<X>>,
}

impl<X> SearchOutcome<X> {
    pub fn pending(next_state: PlatformState<X>) -> Self {
        Self {
            items: Vec::new(),
            next_state: Some(next_state),
        }
    }
}

/// One platform's job state machine.
///
/// Each call performs at most one backend phase (poll, fetch or submit).
/// Backend failures are folded into the returned state, never returned as
/// errors. Calls for the same state must be serialized by the caller.
#[async_trait]
pub trait PlatformSearchService: Send + Sync + 'static {
    /// Options after schema validation.
    type Options: Send + Sync;
    /// Platform-specific state fields stored next to the cursor and job.
    type Extension: Serialize + DeserializeOwned + Default + Clone + Send + Sync;

    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        options: &Self::Options,
        state: Option<&PlatformState<Self::Extension>>,
    ) -> SearchOutcome<Self::Extension>;

    /// Best-effort release of per-service resources.
    async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
