// src/platforms/registry.rs
//! Platform registry: platform-type string -> {service factory, option schema, argument mapper}.
//!
//! The table is resolved once when the connector is built. Adding a platform
//! means adding a [`PlatformDefinition`] here, the dispatcher never changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{twitter, PlatformSearchService, RawPlatformArgs, SearchOptions, SearchOutcome};
use crate::backend::JobBackend;
use crate::error::{FieldIssue, SourceError, ValidationError};
use crate::state::{PlatformState, StateExtras};

/// Static description of one platform.
pub struct PlatformDefinition<S: PlatformSearchService> {
    pub platform_type: &'static str,
    pub factory: fn(Arc<dyn JobBackend>) -> S,
    pub schema: fn(&RawPlatformArgs) -> Result<S::Options, ValidationError>,
    pub mapper: fn(&SearchOptions) -> RawPlatformArgs,
}

/// Object-safe view of a [`PlatformDefinition`], so one table can hold all platforms.
pub trait RegistryEntry: Send + Sync {
    fn platform_type(&self) -> &'static str;
    fn instantiate(&self, backend: Arc<dyn JobBackend>) -> Box<dyn PlatformHandle>;
}

impl<S: PlatformSearchService> RegistryEntry for PlatformDefinition<S> {
    fn platform_type(&self) -> &'static str {
        self.platform_type
    }

    fn instantiate(&self, backend: Arc<dyn JobBackend>) -> Box<dyn PlatformHandle> {
        Box::new(Registered {
            platform_type: self.platform_type,
            service: (self.factory)(backend),
            schema: self.schema,
            mapper: self.mapper,
        })
    }
}

/// A live platform service together with its schema and mapper.
///
/// Works on the generic state envelope; the typed state only exists inside.
#[async_trait]
pub trait PlatformHandle: Send + Sync {
    fn platform_type(&self) -> &'static str;

    /// Map and validate generic options. No network access.
    fn validate(&self, options: &SearchOptions) -> Result<(), ValidationError>;

    async fn initialize(&self) -> anyhow::Result<()>;

    async fn search(
        &self,
        state: Option<&PlatformState>,
        options: &SearchOptions,
    ) -> Result<SearchOutcome<StateExtras>, SourceError>;

    async fn shutdown(&self) -> anyhow::Result<()>;
}

struct Registered<S: PlatformSearchService> {
    platform_type: &'static str,
    service: S,
    schema: fn(&RawPlatformArgs) -> Result<S::Options, ValidationError>,
    mapper: fn(&SearchOptions) -> RawPlatformArgs,
}

impl<S: PlatformSearchService> Registered<S> {
    fn narrow(&self, options: &SearchOptions) -> Result<S::Options, ValidationError> {
        let raw = (self.mapper)(options);
        (self.schema)(&raw).inspect_err(|e| {
            counter!("source_search_validation_failures_total", "platform" => self.platform_type)
                .increment(1);
            warn!(platform = self.platform_type, error = %e, "options validation failed");
        })
    }
}

/// Generic envelope data -> platform-typed state.
fn decode_state<X: DeserializeOwned>(
    platform: &str,
    state: &PlatformState,
) -> Result<PlatformState<X>, ValidationError> {
    serde_json::to_value(state)
        .and_then(serde_json::from_value)
        .map_err(|e| {
            ValidationError::new(
                platform,
                vec![FieldIssue::new("lastProcessedState.data", e.to_string())],
            )
        })
}

/// Platform-typed state -> generic envelope data.
fn encode_state<X: Serialize>(state: &PlatformState<X>) -> Result<PlatformState, SourceError> {
    Ok(serde_json::to_value(state).and_then(serde_json::from_value)?)
}

#[async_trait]
impl<S: PlatformSearchService> PlatformHandle for Registered<S> {
    fn platform_type(&self) -> &'static str {
        self.platform_type
    }

    fn validate(&self, options: &SearchOptions) -> Result<(), ValidationError> {
        self.narrow(options).map(|_| ())
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        self.service.initialize().await
    }

    async fn search(
        &self,
        state: Option<&PlatformState>,
        options: &SearchOptions,
    ) -> Result<SearchOutcome<StateExtras>, SourceError> {
        let typed_options = self.narrow(options)?;
        let typed_state = state
            .map(|s| decode_state::<S::Extension>(self.platform_type, s))
            .transpose()?;

        let outcome = self.service.search(&typed_options, typed_state.as_ref()).await;

        let next_state = outcome.next_state.as_ref().map(encode_state).transpose()?;
        Ok(SearchOutcome {
            items: outcome.items,
            next_state,
        })
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        self.service.shutdown().await
    }
}

/// Ordered table of platform definitions.
pub struct Registry {
    entries: Vec<Box<dyn RegistryEntry>>,
}

impl Registry {
    /// Empty table; see [`Registry::default`] for the built-in platforms.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with<S: PlatformSearchService>(mut self, definition: PlatformDefinition<S>) -> Self {
        self.entries.push(Box::new(definition));
        self
    }

    pub fn platform_types(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.platform_type()).collect()
    }

    /// One service per entry, all sharing `backend`. Duplicate types are rejected.
    pub(crate) fn instantiate(
        &self,
        backend: Arc<dyn JobBackend>,
    ) -> Result<BTreeMap<&'static str, Box<dyn PlatformHandle>>, SourceError> {
        let mut out = BTreeMap::new();
        for entry in &self.entries {
            let ty = entry.platform_type();
            if out.contains_key(ty) {
                return Err(SourceError::Config(format!(
                    "platform type \"{ty}\" registered twice"
                )));
            }
            debug!(platform = ty, "instantiating platform service");
            out.insert(ty, entry.instantiate(Arc::clone(&backend)));
        }
        Ok(out)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new().with(twitter::definition())
    }
}
