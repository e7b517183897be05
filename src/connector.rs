// src/connector.rs
//! Source connector facade: validates configuration, owns one service per
//! registered platform, and dispatches `search` by `options.type`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::backend::{JobBackend, MasaClient};
use crate::config::ConnectorConfig;
use crate::error::SourceError;
use crate::item::SourceItem;
use crate::metrics::ensure_metrics_described;
use crate::platforms::{PlatformHandle, Registry, SearchOptions};
use crate::state::LastProcessedState;

/// Result of one `search` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub items: Vec<SourceItem>,
    /// Envelope to pass back into the next call. `None` only if the platform
    /// reported no resumable state.
    pub next_last_processed_state: Option<LastProcessedState>,
}

/// A platform service that failed to shut down cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownFailure {
    pub platform: String,
    pub message: String,
}

pub struct SourceConnector {
    services: BTreeMap<&'static str, Box<dyn PlatformHandle>>,
}

impl SourceConnector {
    pub const NAME: &'static str = "masa-source";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub const DESCRIPTION: &'static str =
        "Fetches social media data using the Masa API with service-based architecture.";

    /// Validate `config`, build the Masa client and one service per built-in platform.
    pub async fn initialize(config: ConnectorConfig) -> Result<Self, SourceError> {
        config.validate()?;
        info!(
            base_url = config.base_url(),
            key_len = config.api_key.len(),
            "initializing source connector"
        );
        let client = MasaClient::new(&config)?;
        Self::with_backend(Arc::new(client), &Registry::default()).await
    }

    /// Build against an arbitrary backend and registry.
    pub async fn with_backend(
        backend: Arc<dyn JobBackend>,
        registry: &Registry,
    ) -> Result<Self, SourceError> {
        ensure_metrics_described();
        let services = registry.instantiate(backend)?;
        for (ty, svc) in &services {
            svc.initialize()
                .await
                .map_err(|e| SourceError::Config(format!("initializing {ty}: {e:#}")))?;
        }
        info!(
            platforms = ?services.keys().collect::<Vec<_>>(),
            "source connector initialized with registered services"
        );
        Ok(Self { services })
    }

    pub fn registered_platforms(&self) -> Vec<&'static str> {
        self.services.keys().copied().collect()
    }

    fn service(&self, platform_type: &str) -> Result<&dyn PlatformHandle, SourceError> {
        self.services
            .get(platform_type)
            .map(|s| s.as_ref())
            .ok_or_else(|| SourceError::PlatformNotRegistered(platform_type.to_string()))
    }

    /// Validate `options` for their platform without running a search.
    pub fn validate_options(&self, options: &SearchOptions) -> Result<(), SourceError> {
        Ok(self.service(&options.platform_type)?.validate(options)?)
    }

    /// Run one step of the platform's job state machine.
    ///
    /// Errors only for an unknown platform or invalid options/state; neither
    /// contacts the backend. Backend failures come back as job state.
    pub async fn search(
        &self,
        last_processed_state: Option<&LastProcessedState>,
        options: &SearchOptions,
    ) -> Result<SearchResults, SourceError> {
        let platform = options.platform_type.as_str();
        debug!(
            platform,
            query = ?options.query,
            page_size = ?options.page_size,
            has_state = last_processed_state.is_some(),
            "search dispatching"
        );

        let service = self.service(platform)?;
        let outcome = service
            .search(last_processed_state.map(|s| &s.data), options)
            .await?;

        let next = outcome.next_state.map(LastProcessedState::new);
        info!(platform, items = outcome.items.len(), "search returned");
        if let Some(n) = &next {
            debug!(
                platform,
                job = ?n.data.current_async_job.as_ref().map(|j| (&j.job_id, j.status)),
                cursor = ?n.data.latest_processed_id,
                "next last-processed state"
            );
        }

        Ok(SearchResults {
            items: outcome.items,
            next_last_processed_state: next,
        })
    }

    /// Shut every platform service down. Failures are collected, never raised,
    /// so one broken service cannot block the others.
    pub async fn shutdown(&self) -> Vec<ShutdownFailure> {
        info!("source connector shutting down");
        let mut failures = Vec::new();
        for (ty, svc) in &self.services {
            if let Err(e) = svc.shutdown().await {
                error!(platform = *ty, error = ?e, "error shutting down service");
                failures.push(ShutdownFailure {
                    platform: ty.to_string(),
                    message: format!("{e:#}"),
                });
            }
        }
        info!(failed = failures.len(), "source connector shutdown complete");
        failures
    }
}
