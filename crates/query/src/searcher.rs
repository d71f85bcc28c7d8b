//! The entry point that binds a search client to query builders.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::client::{InstanceMapper, SearchClient};
use crate::config::SearcherConfig;
use crate::error::QueryError;
use crate::params::WireParams;
use crate::query::SearchQuery;
use crate::results::RawResult;

/// Creates [`SearchQuery`] builders against one search client.
///
/// Cloning is cheap; clones share the client, configuration and mapper.
#[derive(Clone)]
pub struct Searcher {
    client: Arc<dyn SearchClient>,
    config: Arc<SearcherConfig>,
    instance_mapper: Option<Arc<dyn InstanceMapper>>,
}

impl Searcher {
    pub fn new(client: impl SearchClient + 'static) -> Self {
        Self::with_config(client, SearcherConfig::default())
    }

    pub fn with_config(client: impl SearchClient + 'static, config: SearcherConfig) -> Self {
        Self {
            client: Arc::new(client),
            config: Arc::new(config),
            instance_mapper: None,
        }
    }

    /// Sets the mapper used to attach instances to returned documents.
    pub fn with_instance_mapper(mut self, mapper: impl InstanceMapper + 'static) -> Self {
        self.instance_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn config(&self) -> &SearcherConfig {
        &self.config
    }

    pub fn instance_mapper(&self) -> Option<&Arc<dyn InstanceMapper>> {
        self.instance_mapper.as_ref()
    }

    /// Starts a query for `q`.
    pub fn search(&self, q: impl Into<String>) -> SearchQuery {
        SearchQuery::new(self.clone(), q.into())
    }

    /// Starts a query matching every document.
    pub fn search_all(&self) -> SearchQuery {
        self.search("*:*")
    }

    /// Sends one request through the client.
    pub fn select(&self, q: &str, params: &WireParams) -> Result<RawResult, QueryError> {
        debug!(q = %q, params = params.len(), "Dispatching select request");
        self.client.select(q, params).map_err(QueryError::Transport)
    }
}

impl fmt::Debug for Searcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Searcher")
            .field("config", &self.config)
            .field("instance_mapper", &self.instance_mapper.is_some())
            .finish()
    }
}
