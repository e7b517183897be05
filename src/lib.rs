// src/lib.rs
//! Resumable, job-polling source connector for the Masa search API.
//!
//! Each [`SourceConnector::search`] call advances one platform's job state
//! machine by a single phase (submit, poll, or fetch) and returns the items
//! found together with the state to pass into the next call.
//!
//! ```ignore
//! let connector = SourceConnector::initialize(ConnectorConfig::from_env()?).await?;
//! let opts = SearchOptions::new("twitter-scraper").with_query("rust");
//! let mut state = None;
//! loop {
//!     let out = connector.search(state.as_ref(), &opts).await?;
//!     handle(out.items);
//!     state = out.next_last_processed_state;
//!     tokio::time::sleep(POLL_INTERVAL).await;
//! }
//! ```

pub mod backend;
pub mod config;
pub mod connector;
pub mod error;
pub mod item;
pub mod metrics;
pub mod platforms;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::backend::{BackendRecord, JobBackend, MasaClient};
pub use crate::config::ConnectorConfig;
pub use crate::connector::{SearchResults, ShutdownFailure, SourceConnector};
pub use crate::error::{BackendFailure, FieldIssue, SourceError, ValidationError};
pub use crate::item::{ItemAuthor, ItemMetadata, SourceItem};
pub use crate::platforms::{
    PlatformDefinition, PlatformSearchService, RawPlatformArgs, Registry, SearchOptions,
    SearchOutcome,
};
pub use crate::state::{
    AsyncJobProgress, Cursor, JobStatus, LastProcessedState, PlatformState, StateExtras,
};
